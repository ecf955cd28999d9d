/*!
 * Error types for the modelstore crate.
 *
 * Configuration loading, the session store and the model manager each get
 * their own error types, defined with the thiserror crate. Model manager
 * operations return a per-operation failure union so that the type of each
 * operation states exactly which failures it can produce.
 */

use std::num::ParseIntError;

use thiserror::Error;

/// Errors that can occur while building a database configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A required key is absent from the property set
    #[error("key '{0}' is missing")]
    MissingKey(&'static str),

    /// A required field was never supplied to the builder
    #[error("value of '{0}' is missing")]
    MissingField(&'static str),

    /// The PORT value is not an integer in 0..=65535
    #[error("invalid port '{value}': {source}")]
    InvalidPort {
        /// Raw value as found in the source
        value: String,
        /// Parse failure
        #[source]
        source: ParseIntError,
    },

    /// Malformed line in a text property file
    #[error("malformed property file at line {line}: {message}")]
    Properties {
        /// One-based line number
        line: usize,
        /// What went wrong
        message: String,
    },

    /// Malformed XML property list
    #[error("malformed XML property list: {0}")]
    Xml(String),

    /// Malformed JSON configuration
    #[error("malformed JSON configuration: {0}")]
    Json(#[from] serde_json::Error),

    /// Error from a file or stream operation
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<quick_xml::Error> for ConfigError {
    fn from(error: quick_xml::Error) -> Self {
        Self::Xml(error.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for ConfigError {
    fn from(error: quick_xml::events::attributes::AttrError) -> Self {
        Self::Xml(error.to_string())
    }
}

/// Errors raised by the session store
#[derive(Error, Debug)]
pub enum StoreError {
    /// A uniqueness, primary key, foreign key or check constraint was violated
    #[error("constraint violated: {0}")]
    ConstraintViolation(#[source] rusqlite::Error),

    /// A NOT NULL column received no value
    #[error("required property missing: {0}")]
    MissingProperty(#[source] rusqlite::Error),

    /// Any other database failure
    #[error("database error: {0}")]
    Database(#[source] rusqlite::Error),

    /// The configured dialect has no backend
    #[error("no support for dialect '{0}'")]
    UnsupportedDialect(String),

    /// The configured driver has no backend
    #[error("no support for driver class '{0}'")]
    UnsupportedDriver(String),

    /// The database could not be opened
    #[error("failed to open database '{target}': {source}")]
    Open {
        /// Path or `:memory:`
        target: String,
        /// Underlying failure
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The database was written by a newer schema than this build knows
    #[error("database schema v{found} is newer than supported v{supported}")]
    UnsupportedSchema {
        /// Version recorded in the database
        found: i32,
        /// Version this build writes
        supported: i32,
    },

    /// A record without a key was passed where a row must be addressed
    #[error("record of table '{0}' has no key")]
    MissingKey(&'static str),

    /// A generated key could not be decoded into the record's key type
    #[error("generated key cannot be converted: {0}")]
    KeyConversion(#[source] rusqlite::types::FromSqlError),

    /// A blocking store task panicked or was cancelled
    #[error("store task failed: {0}")]
    TaskFailed(#[from] tokio::task::JoinError),
}

impl From<rusqlite::Error> for StoreError {
    fn from(error: rusqlite::Error) -> Self {
        use rusqlite::ffi;

        match error.sqlite_error() {
            Some(e) if e.extended_code == ffi::SQLITE_CONSTRAINT_NOTNULL => {
                Self::MissingProperty(error)
            }
            Some(e) if e.code == rusqlite::ErrorCode::ConstraintViolation => {
                Self::ConstraintViolation(error)
            }
            _ => Self::Database(error),
        }
    }
}

/// A lookup by identifier found nothing
#[derive(Error, Debug)]
#[error("no entity found with identifier {id:?}")]
pub struct EntityNotFound<Id> {
    /// Identifier that was looked up
    pub id: Id,
}

/// The store rejected a write because of a constraint
#[derive(Error, Debug)]
#[error("constraint violated while writing {entity:?}")]
pub struct ConstraintViolation<E> {
    /// Entity whose write was rejected
    pub entity: E,
    /// Store failure
    #[source]
    pub cause: StoreError,
}

/// The store rejected a write because a required property was absent
#[derive(Error, Debug)]
#[error("required property missing on {entity:?}")]
pub struct MissingRequiredProperty<E> {
    /// Entity whose write was rejected
    pub entity: E,
    /// Store failure
    #[source]
    pub cause: StoreError,
}

/// The entity carries no identifier, so it was never added
#[derive(Error, Debug)]
#[error("entity {entity:?} has not been added")]
pub struct EntityNotAdded<E> {
    /// Entity passed by the caller
    pub entity: E,
}

/// Failures of `ModelManager::get`
#[derive(Error, Debug)]
pub enum GetError<Id> {
    #[error(transparent)]
    NotFound(#[from] EntityNotFound<Id>),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Failures of `ModelManager::add`
#[derive(Error, Debug)]
pub enum AddError<E> {
    #[error(transparent)]
    ConstraintViolation(#[from] ConstraintViolation<E>),

    #[error(transparent)]
    MissingProperty(#[from] MissingRequiredProperty<E>),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Failures of `ModelManager::update`
#[derive(Error, Debug)]
pub enum UpdateError<E, Id> {
    #[error(transparent)]
    NotAdded(#[from] EntityNotAdded<E>),

    #[error(transparent)]
    NotFound(#[from] EntityNotFound<Id>),

    #[error(transparent)]
    ConstraintViolation(#[from] ConstraintViolation<E>),

    #[error(transparent)]
    MissingProperty(#[from] MissingRequiredProperty<E>),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Failures of `ModelManager::delete`
#[derive(Error, Debug)]
pub enum DeleteError<E, Id> {
    #[error(transparent)]
    NotAdded(#[from] EntityNotAdded<E>),

    #[error(transparent)]
    NotFound(#[from] EntityNotFound<Id>),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Outcome of classifying a store failure raised by a write
pub(crate) enum WriteFailure<E> {
    ConstraintViolation(ConstraintViolation<E>),
    MissingProperty(MissingRequiredProperty<E>),
    Fatal(StoreError),
}

impl<E> WriteFailure<E> {
    /// Attach the rejected entity to a recognized write failure
    pub(crate) fn classify(error: StoreError, entity: E) -> Self {
        match error {
            cause @ StoreError::ConstraintViolation(_) => {
                Self::ConstraintViolation(ConstraintViolation { entity, cause })
            }
            cause @ StoreError::MissingProperty(_) => {
                Self::MissingProperty(MissingRequiredProperty { entity, cause })
            }
            other => Self::Fatal(other),
        }
    }

    pub(crate) fn into_add_error(self) -> AddError<E> {
        match self {
            Self::ConstraintViolation(e) => AddError::ConstraintViolation(e),
            Self::MissingProperty(e) => AddError::MissingProperty(e),
            Self::Fatal(e) => AddError::Store(e),
        }
    }

    pub(crate) fn into_update_error<Id>(self) -> UpdateError<E, Id> {
        match self {
            Self::ConstraintViolation(e) => UpdateError::ConstraintViolation(e),
            Self::MissingProperty(e) => UpdateError::MissingProperty(e),
            Self::Fatal(e) => UpdateError::Store(e),
        }
    }
}

impl<Id> GetError<Id> {
    /// True when the lookup found nothing
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl<E, Id> UpdateError<E, Id> {
    /// True when no row exists for the entity's identifier
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl<E, Id> DeleteError<E, Id> {
    /// True when no row exists for the entity's identifier
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
