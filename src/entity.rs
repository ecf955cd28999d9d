/*!
 * The entity contract and identity helpers.
 *
 * An entity exposes one identifier. Equality, hashing and the short string
 * form of an entity derive from that identifier alone; two entities that have
 * not been assigned an identifier are only equal when they are the same value
 * in memory.
 */

use std::fmt;
use std::hash::{Hash, Hasher};

/// A domain object with a stable identifier
pub trait Entity {
    /// Strongly-typed identifier
    type Id: Clone + Eq + Hash + fmt::Debug;

    /// The identifier, or `None` while the entity has not been added yet
    fn id(&self) -> Option<&Self::Id>;
}

/// Identity equality: equal present identifiers, or the same instance
pub fn identity_eq<E: Entity>(a: &E, b: &E) -> bool {
    match (a.id(), b.id()) {
        (Some(x), Some(y)) => x == y,
        (None, None) => std::ptr::eq(a, b),
        _ => false,
    }
}

/// Hash an entity by its identifier; entities without one hash alike
pub fn identity_hash<E: Entity, H: Hasher>(entity: &E, state: &mut H) {
    entity.id().hash(state);
}

/// Write the `Name{id=..}` form of an entity
pub fn identity_fmt<E: Entity>(
    entity: &E,
    name: &str,
    f: &mut fmt::Formatter<'_>,
) -> fmt::Result {
    match entity.id() {
        Some(id) => write!(f, "{}{{id={:?}}}", name, id),
        None => write!(f, "{}{{id=none}}", name),
    }
}

/// Implement `PartialEq`, `Eq`, `Hash` and `Display` for an entity type from
/// its identifier.
///
/// ```ignore
/// modelstore::entity_identity!(Student);
/// ```
#[macro_export]
macro_rules! entity_identity {
    ($ty:ty) => {
        impl ::std::cmp::PartialEq for $ty {
            fn eq(&self, other: &Self) -> bool {
                $crate::entity::identity_eq(self, other)
            }
        }

        impl ::std::cmp::Eq for $ty {}

        impl ::std::hash::Hash for $ty {
            fn hash<H: ::std::hash::Hasher>(&self, state: &mut H) {
                $crate::entity::identity_hash(self, state)
            }
        }

        impl ::std::fmt::Display for $ty {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                $crate::entity::identity_fmt(self, stringify!($ty), f)
            }
        }
    };
}
