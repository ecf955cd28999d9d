/*!
 * Database layer: sessions over an embedded SQLite store, the native record
 * contract, entity/record mappings and the transactional model manager.
 *
 * Typical setup:
 * - build a `SessionFactory` from a `DatabaseConfiguration`, registering each
 *   record type so its table exists
 * - describe the conversions of an entity in a `ModelMapping`
 * - wrap both in a `ModelManager`
 */

pub mod schema;
pub mod connection;
pub mod record;
pub mod mapping;
pub mod manager;

// Re-export main types
pub use connection::{Session, SessionFactory, SessionFactoryBuilder, SessionStats, Transaction};
pub use manager::ModelManager;
pub use mapping::ModelMapping;
pub use record::{Record, Table};
