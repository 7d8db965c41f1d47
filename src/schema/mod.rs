//! Physical schema: column mapping and DDL.

pub mod mapper;
mod migrator;

pub use mapper::{ColumnDefault, ColumnSpec, StorageType, column_spec};
pub use migrator::{AlterOperation, ColumnInfo, SchemaMigrator};
pub(crate) use migrator::{alter_in, drop_tables_in};

/// Columns every provisioned table carries, in table order.
pub const SYSTEM_COLUMNS: [&str; 6] = ["id", "uuid", "created", "updated", "tenant_id", "project_id"];

/// Quotes an SQL identifier.
#[must_use]
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
