/*!
 * # modelstore
 *
 * A generic persistence helper: database connection configuration plus a
 * transactional CRUD manager over an embedded relational store.
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `configuration`: Connection parameters, loaded from property, XML or JSON files
 * - `properties`: Text and XML property-list codec
 * - `entity`: Entity contract and identity-based equality
 * - `database`: Session factory, native records, mappings and the model manager:
 *   - `database::connection`: Sessions and transactions
 *   - `database::schema`: Schema bookkeeping and table registration
 *   - `database::record`: Native record contract
 *   - `database::mapping`: Entity/record conversions
 *   - `database::manager`: Transactional CRUD operations
 * - `errors`: Configuration, store and business failure types
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod configuration;
pub mod properties;
pub mod entity;
pub mod database;
pub mod errors;

// Re-export main types for easier usage
pub use configuration::DatabaseConfiguration;
pub use properties::Properties;
pub use entity::Entity;
pub use database::{ModelManager, ModelMapping, Record, SessionFactory, Table};
pub use errors::{
    AddError, ConfigError, ConstraintViolation, DeleteError, EntityNotAdded, EntityNotFound,
    GetError, MissingRequiredProperty, StoreError, UpdateError,
};
