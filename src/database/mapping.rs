/*!
 * Entity/record mapping.
 *
 * A `ModelMapping` bundles the conversions a manager needs between the
 * caller-facing entity and its native record: building blank entities,
 * converting in both directions, bridging identifier types, copying mutable
 * fields on update and, optionally, copying store-generated fields after add.
 */

use crate::database::record::Record;
use crate::entity::Entity;

type Factory<E> = Box<dyn Fn() -> E + Send + Sync>;
type ToRecord<E, R> = Box<dyn Fn(&E) -> R + Send + Sync>;
type FromRecord<E, R> = Box<dyn Fn(R) -> E + Send + Sync>;
type IdFromNative<E, R> = Box<dyn Fn(<R as Record>::Key) -> <E as Entity>::Id + Send + Sync>;
type NativeFromId<E, R> = Box<dyn Fn(&<E as Entity>::Id) -> <R as Record>::Key + Send + Sync>;
type CopyFields<E, R> = Box<dyn Fn(&mut R, &E) + Send + Sync>;
type CopyGenerated<E, R> = Box<dyn Fn(&mut E, &R) + Send + Sync>;

/// Conversion callbacks between an entity and its native record
pub struct ModelMapping<E: Entity, R: Record> {
    create_entity: Factory<E>,
    to_record: ToRecord<E, R>,
    from_record: FromRecord<E, R>,
    id_from_native: IdFromNative<E, R>,
    native_from_id: NativeFromId<E, R>,
    update_fields: CopyFields<E, R>,
    copy_generated: Option<CopyGenerated<E, R>>,
}

impl<E: Entity, R: Record> ModelMapping<E, R> {
    /// Create a mapping from its required callbacks.
    ///
    /// `update_fields` receives the stored record and the caller's entity and
    /// must only write columns the caller may change.
    pub fn new(
        create_entity: impl Fn() -> E + Send + Sync + 'static,
        to_record: impl Fn(&E) -> R + Send + Sync + 'static,
        from_record: impl Fn(R) -> E + Send + Sync + 'static,
        id_from_native: impl Fn(R::Key) -> E::Id + Send + Sync + 'static,
        native_from_id: impl Fn(&E::Id) -> R::Key + Send + Sync + 'static,
        update_fields: impl Fn(&mut R, &E) + Send + Sync + 'static,
    ) -> Self {
        Self {
            create_entity: Box::new(create_entity),
            to_record: Box::new(to_record),
            from_record: Box::new(from_record),
            id_from_native: Box::new(id_from_native),
            native_from_id: Box::new(native_from_id),
            update_fields: Box::new(update_fields),
            copy_generated: None,
        }
    }

    /// Copy store-generated fields onto the entity after it is added.
    ///
    /// With this hook installed `add` re-reads the new row in a second
    /// transaction.
    pub fn with_generated_fields(mut self, copy: impl Fn(&mut E, &R) + Send + Sync + 'static) -> Self {
        self.copy_generated = Some(Box::new(copy));
        self
    }

    pub fn create_entity(&self) -> E {
        (self.create_entity)()
    }

    pub fn to_record(&self, entity: &E) -> R {
        (self.to_record)(entity)
    }

    pub fn from_record(&self, record: R) -> E {
        (self.from_record)(record)
    }

    pub fn id_from_native(&self, key: R::Key) -> E::Id {
        (self.id_from_native)(key)
    }

    pub fn native_from_id(&self, id: &E::Id) -> R::Key {
        (self.native_from_id)(id)
    }

    pub fn update_fields(&self, record: &mut R, entity: &E) {
        (self.update_fields)(record, entity)
    }

    /// True when a generated-field hook is installed
    pub fn copies_generated_fields(&self) -> bool {
        self.copy_generated.is_some()
    }

    /// Run the generated-field hook, if any
    pub fn copy_generated(&self, entity: &mut E, record: &R) {
        if let Some(copy) = &self.copy_generated {
            copy(entity, record);
        }
    }
}

impl<E: Entity, R: Record> std::fmt::Debug for ModelMapping<E, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelMapping")
            .field("table", &R::table().name)
            .field("copies_generated_fields", &self.copies_generated_fields())
            .finish()
    }
}
