/*!
 * Transactional CRUD manager.
 *
 * Each operation runs in its own session and transaction: it commits on
 * success and rolls back before returning any failure. Business failures come
 * back as typed per-operation errors; everything else is a `StoreError`.
 * The `_async` variants run the same operations on tokio's blocking pool.
 */

use log::{debug, error, warn};
use std::sync::Arc;

use super::connection::{SessionFactory, Transaction};
use super::mapping::ModelMapping;
use super::record::Record;
use crate::entity::Entity;
use crate::errors::{
    AddError, DeleteError, EntityNotAdded, EntityNotFound, GetError, StoreError, UpdateError,
    WriteFailure,
};

/// CRUD operations for one entity type over one mapped table
pub struct ModelManager<E: Entity, R: Record> {
    factory: SessionFactory,
    mapping: Arc<ModelMapping<E, R>>,
}

impl<E: Entity, R: Record> Clone for ModelManager<E, R> {
    fn clone(&self) -> Self {
        Self {
            factory: self.factory.clone(),
            mapping: self.mapping.clone(),
        }
    }
}

impl<E, R> ModelManager<E, R>
where
    E: Entity + Clone,
    R: Record,
{
    /// Create a manager; the record's table must be registered with the factory
    pub fn new(factory: SessionFactory, mapping: ModelMapping<E, R>) -> Self {
        Self {
            factory,
            mapping: Arc::new(mapping),
        }
    }

    pub fn factory(&self) -> &SessionFactory {
        &self.factory
    }

    pub fn mapping(&self) -> &ModelMapping<E, R> {
        &self.mapping
    }

    /// A blank entity, not yet added
    pub fn create_entity(&self) -> E {
        self.mapping.create_entity()
    }

    /// Every stored entity, ordered by identifier
    pub fn list_all(&self) -> Result<Vec<E>, StoreError> {
        self.in_transaction("list_all", |tx| -> Result<Vec<E>, StoreError> {
            let records = tx.list::<R>()?;
            Ok(records
                .into_iter()
                .map(|record| self.mapping.from_record(record))
                .collect())
        })
    }

    /// The entity with the given identifier
    pub fn get(&self, id: &E::Id) -> Result<E, GetError<E::Id>> {
        let key = self.mapping.native_from_id(id);

        self.in_transaction("get", |tx| -> Result<E, GetError<E::Id>> {
            match tx.get::<R>(&key)? {
                Some(record) => Ok(self.mapping.from_record(record)),
                None => Err(EntityNotFound { id: id.clone() }.into()),
            }
        })
    }

    /// Insert the entity and return its identifier.
    ///
    /// With a generated-field hook on the mapping, the new row is read back in
    /// a second transaction and its generated fields are copied onto `entity`.
    pub fn add(&self, entity: &mut E) -> Result<E::Id, AddError<E>> {
        let record = self.mapping.to_record(entity);
        let snapshot: &E = entity;

        let classify =
            |error: StoreError| WriteFailure::classify(error, snapshot.clone()).into_add_error();

        let key = self.in_write_transaction(
            "add",
            |tx| tx.save(&record).map_err(&classify),
            &classify,
        )?;

        if self.mapping.copies_generated_fields() {
            match self.in_transaction("add (read back)", |tx| tx.get::<R>(&key))? {
                Some(stored) => self.mapping.copy_generated(entity, &stored),
                None => error!(
                    "Row {:?} of '{}' vanished before its generated fields were read",
                    key,
                    R::table().name
                ),
            }
        }

        Ok(self.mapping.id_from_native(key))
    }

    /// Write the entity's mutable fields onto its stored row
    pub fn update(&self, entity: &E) -> Result<(), UpdateError<E, E::Id>> {
        let id = entity
            .id()
            .ok_or_else(|| EntityNotAdded {
                entity: entity.clone(),
            })?
            .clone();
        let key = self.mapping.native_from_id(&id);

        let classify = |error: StoreError| -> UpdateError<E, E::Id> {
            WriteFailure::classify(error, entity.clone()).into_update_error()
        };

        self.in_write_transaction(
            "update",
            |tx| -> Result<(), UpdateError<E, E::Id>> {
                let mut record = tx
                    .get::<R>(&key)?
                    .ok_or_else(|| EntityNotFound { id: id.clone() })?;

                self.mapping.update_fields(&mut record, entity);

                tx.update(&record).map(|_| ()).map_err(&classify)
            },
            &classify,
        )
    }

    /// Remove the entity's stored row
    pub fn delete(&self, entity: &E) -> Result<(), DeleteError<E, E::Id>> {
        let id = entity
            .id()
            .ok_or_else(|| EntityNotAdded {
                entity: entity.clone(),
            })?
            .clone();
        let key = self.mapping.native_from_id(&id);

        self.in_transaction("delete", |tx| -> Result<(), DeleteError<E, E::Id>> {
            if tx.get::<R>(&key)?.is_none() {
                return Err(EntityNotFound { id: id.clone() }.into());
            }
            tx.delete::<R>(&key)?;
            Ok(())
        })
    }

    /// Run `work` in a fresh session and transaction; commit on success, roll
    /// back on failure. The session is released on every path.
    fn in_transaction<T, F>(
        &self,
        operation: &str,
        work: impl FnOnce(&Transaction<'_>) -> Result<T, F>,
    ) -> Result<T, F>
    where
        F: From<StoreError>,
    {
        self.in_write_transaction(operation, work, F::from)
    }

    /// `in_transaction` for writes: constraints the store only checks at
    /// commit (deferred foreign keys) go through `on_commit_failure`
    fn in_write_transaction<T, F>(
        &self,
        operation: &str,
        work: impl FnOnce(&Transaction<'_>) -> Result<T, F>,
        on_commit_failure: impl FnOnce(StoreError) -> F,
    ) -> Result<T, F>
    where
        F: From<StoreError>,
    {
        let mut session = self.factory.open_session();
        let tx = session.begin_transaction()?;

        match work(&tx) {
            Ok(value) => match tx.commit() {
                Ok(()) => {
                    debug!("{} on '{}' committed", operation, R::table().name);
                    Ok(value)
                }
                Err(error) => {
                    warn!("{} on '{}' failed at commit, rolled back", operation, R::table().name);
                    Err(on_commit_failure(error))
                }
            },
            Err(failure) => {
                match tx.rollback() {
                    Ok(()) => warn!("{} on '{}' failed, rolled back", operation, R::table().name),
                    Err(e) => warn!(
                        "{} on '{}' failed and could not be rolled back: {}",
                        operation,
                        R::table().name,
                        e
                    ),
                }
                Err(failure)
            }
        }
    }
}

impl<E, R> ModelManager<E, R>
where
    E: Entity + Clone + Send + 'static,
    E::Id: Send + 'static,
    R: Record + 'static,
{
    pub async fn list_all_async(&self) -> Result<Vec<E>, StoreError> {
        self.spawn_blocking(|manager| manager.list_all()).await
    }

    pub async fn get_async(&self, id: E::Id) -> Result<E, GetError<E::Id>> {
        self.spawn_blocking(move |manager| manager.get(&id)).await
    }

    /// Add the entity; returns it (with generated fields copied) and its
    /// identifier
    pub async fn add_async(&self, mut entity: E) -> Result<(E, E::Id), AddError<E>> {
        self.spawn_blocking(move |manager| {
            let id = manager.add(&mut entity)?;
            Ok((entity, id))
        })
        .await
    }

    pub async fn update_async(&self, entity: E) -> Result<(), UpdateError<E, E::Id>> {
        self.spawn_blocking(move |manager| manager.update(&entity)).await
    }

    pub async fn delete_async(&self, entity: E) -> Result<(), DeleteError<E, E::Id>> {
        self.spawn_blocking(move |manager| manager.delete(&entity)).await
    }

    /// Run a synchronous operation on the blocking pool
    async fn spawn_blocking<T, F>(
        &self,
        work: impl FnOnce(Self) -> Result<T, F> + Send + 'static,
    ) -> Result<T, F>
    where
        T: Send + 'static,
        F: From<StoreError> + Send + 'static,
    {
        let manager = self.clone();

        tokio::task::spawn_blocking(move || work(manager))
            .await
            .map_err(|e| F::from(StoreError::TaskFailed(e)))?
    }
}

impl<E: Entity, R: Record> std::fmt::Debug for ModelManager<E, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelManager")
            .field("factory", &self.factory)
            .field("mapping", &self.mapping)
            .finish()
    }
}
