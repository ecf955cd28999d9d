/*!
 * Native record contract.
 *
 * A record is the store-side shape of an entity: one row of one mapped table.
 * Its table descriptor tells the session which columns it may write and which
 * the store fills in by itself.
 */

use rusqlite::Row;
use rusqlite::types::{FromSql, ToSql, Value};
use std::fmt::Debug;

/// Descriptor of a mapped table
#[derive(Debug, Clone, Copy)]
pub struct Table {
    /// Table name
    pub name: &'static str,
    /// Identifier column
    pub id_column: &'static str,
    /// Columns written on insert and update, in `Record::values` order
    pub columns: &'static [&'static str],
    /// Columns the store fills in (defaults, triggers); read, never written
    pub generated: &'static [&'static str],
    /// Idempotent DDL run when the table is registered
    pub ddl: &'static str,
}

impl Table {
    /// Comma-separated list of every column, identifier first
    pub fn select_list(&self) -> String {
        std::iter::once(self.id_column)
            .chain(self.columns.iter().copied())
            .chain(self.generated.iter().copied())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Store-side representation of an entity
pub trait Record: Sized {
    /// Native key type of the identifier column
    type Key: ToSql + FromSql + Clone + Debug;

    /// Descriptor of the mapped table
    fn table() -> &'static Table;

    /// The key, or `None` when the store should generate it
    fn key(&self) -> Option<&Self::Key>;

    /// Decode a row selected with `Table::select_list`
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;

    /// Values of `Table::columns`, in the same order
    fn values(&self) -> Vec<Value>;
}
