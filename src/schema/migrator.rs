use std::collections::HashSet;
use std::sync::Arc;

use rusqlite::{Connection, params};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::mapper::{ColumnSpec, column_spec};
use super::{SYSTEM_COLUMNS, quote_ident};
use crate::error::{Error, Result};
use crate::identifier::IdentifierGenerator;
use crate::store::{SqliteStore, Store};
use crate::types::FieldDefinition;

/// Definitions for [`SYSTEM_COLUMNS`], same order.
const SYSTEM_COLUMN_DEFINITIONS: [&str; 6] = [
    "\"id\" INTEGER PRIMARY KEY AUTOINCREMENT",
    "\"uuid\" VARCHAR(128) NOT NULL UNIQUE",
    "\"created\" TEXT NOT NULL DEFAULT (datetime('now'))",
    "\"updated\" TEXT NOT NULL DEFAULT (datetime('now'))",
    "\"tenant_id\" TEXT NOT NULL",
    "\"project_id\" TEXT NOT NULL",
];

const REBUILD_SUFFIX: &str = "__rebuild";

#[derive(Debug, Clone)]
pub enum AlterOperation {
    Add,
    /// `previous` is the field as stored before the update.
    Update { previous: FieldDefinition },
    Remove,
}

/// One row of `PRAGMA table_info`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnInfo {
    pub name: String,
    pub declared_type: String,
    pub not_null: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    pub primary_key: bool,
}

/// Issues DDL for template tables.
///
/// The migrator reads template metadata through the store, then takes the
/// store's connection for the DDL itself. Every operation is also available as
/// a `*_in` function over a plain `&Connection` so it can run inside a caller's
/// transaction.
pub struct SchemaMigrator {
    store: Arc<SqliteStore>,
    ids: IdentifierGenerator,
}

impl SchemaMigrator {
    pub fn new(store: Arc<SqliteStore>, ids: IdentifierGenerator) -> Self {
        Self { store, ids }
    }

    /// Creates the table for a template from its current fields.
    /// Returns `false` when a table with the computed name already exists.
    pub fn create_table(&self, tenant: &str, project: &str, template_id: i64) -> Result<bool> {
        let table = self.resolve_table(tenant, project, template_id)?;
        let fields = self.store.list_fields(template_id)?;
        let conn = self.store.connection();
        create_table_in(&conn, &table, &fields)
    }

    /// Applies one field change. Returns `false` when nothing was issued.
    pub fn alter_table(
        &self,
        tenant: &str,
        project: &str,
        template_id: i64,
        field: &FieldDefinition,
        op: &AlterOperation,
    ) -> Result<bool> {
        let table = self.resolve_table(tenant, project, template_id)?;
        let fields = self.store.list_fields(template_id)?;
        let conn = self.store.connection();
        alter_in(&conn, &table, &fields, field, op)
    }

    /// Drops the current and the legacy table for an entity, skipping any
    /// name another template still maps to. `owner` is the template the
    /// tables belong to, if its row still exists. Returns the names that
    /// existed and were dropped.
    pub fn drop_table(
        &self,
        tenant: &str,
        project: &str,
        entity: &str,
        owner: Option<i64>,
    ) -> Result<Vec<String>> {
        let names = self.owned_table_names(tenant, project, entity, owner)?;
        let conn = self.store.connection();
        drop_tables_in(&conn, &names)
    }

    /// [`table_names`](Self::table_names) minus the names that a template
    /// other than `owner` maps to, through either naming scheme.
    pub fn owned_table_names(
        &self,
        tenant: &str,
        project: &str,
        entity: &str,
        owner: Option<i64>,
    ) -> Result<Vec<String>> {
        let mut claimed = HashSet::new();
        for template in self.store.list_all_templates()? {
            if Some(template.id) == owner {
                continue;
            }
            let (t, p, e) = (&template.tenant_id, &template.project_id, &template.name);
            claimed.insert(self.ids.table_name(t, p, e));
            claimed.insert(self.ids.legacy_table_name(t, p, e));
        }

        Ok(self
            .table_names(tenant, project, entity)
            .into_iter()
            .filter(|name| {
                let free = !claimed.contains(name);
                if !free {
                    warn!("Table {} belongs to another template, not dropping it", name);
                }
                free
            })
            .collect())
    }

    /// Every table name an entity may have been provisioned under.
    #[must_use]
    pub fn table_names(&self, tenant: &str, project: &str, entity: &str) -> Vec<String> {
        let current = self.ids.table_name(tenant, project, entity);
        let legacy = self.ids.legacy_table_name(tenant, project, entity);
        if legacy == current {
            vec![current]
        } else {
            vec![current, legacy]
        }
    }

    pub fn table_exists(&self, table: &str) -> Result<bool> {
        table_exists_in(&self.store.connection(), table)
    }

    pub fn table_columns(&self, table: &str) -> Result<Vec<ColumnInfo>> {
        table_columns_in(&self.store.connection(), table)
    }

    pub fn row_count(&self, table: &str) -> Result<i64> {
        row_count_in(&self.store.connection(), table)
    }

    fn resolve_table(&self, tenant: &str, project: &str, template_id: i64) -> Result<String> {
        let template = self
            .store
            .get_template(template_id)?
            .ok_or_else(|| Error::NotFound(format!("template {template_id}")))?;
        Ok(self.ids.table_name(tenant, project, &template.name))
    }
}

fn unique_index_name(table: &str, column: &str) -> String {
    format!("ux_{table}_{column}")
}

fn field_spec(field: &FieldDefinition) -> ColumnSpec {
    column_spec(&field.field_type, &field.settings, field.required)
}

fn create_table_sql(table: &str, fields: &[FieldDefinition]) -> String {
    let columns: Vec<String> = SYSTEM_COLUMN_DEFINITIONS
        .iter()
        .map(|def| (*def).to_string())
        .chain(fields.iter().map(|f| field_spec(f).definition(&f.name)))
        .map(|def| format!("    {def}"))
        .collect();

    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n{}\n)",
        quote_ident(table),
        columns.join(",\n")
    )
}

/// Runs `f` under an SQL savepoint so a multi-statement change is all or
/// nothing, whether or not the connection is already inside a transaction.
fn in_savepoint<T>(conn: &Connection, table: &str, f: impl FnOnce() -> Result<T>) -> Result<T> {
    conn.execute_batch("SAVEPOINT schema_change")
        .map_err(|e| Error::migration(table, e))?;

    match f() {
        Ok(value) => {
            conn.execute_batch("RELEASE schema_change")
                .map_err(|e| Error::migration(table, e))?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback) =
                conn.execute_batch("ROLLBACK TO schema_change; RELEASE schema_change")
            {
                warn!("Failed to roll back schema change on {}: {}", table, rollback);
            }
            Err(err)
        }
    }
}

fn create_unique_index_in(conn: &Connection, table: &str, column: &str) -> Result<()> {
    conn.execute_batch(&format!(
        "CREATE UNIQUE INDEX IF NOT EXISTS {} ON {} ({})",
        quote_ident(&unique_index_name(table, column)),
        quote_ident(table),
        quote_ident(column)
    ))
    .map_err(|e| Error::migration(table, e))
}

pub(crate) fn table_exists_in(conn: &Connection, table: &str) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
        params![table],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

pub(crate) fn table_columns_in(conn: &Connection, table: &str) -> Result<Vec<ColumnInfo>> {
    let mut stmt = conn.prepare(
        "SELECT name, type, \"notnull\", dflt_value, pk FROM pragma_table_info(?1) ORDER BY cid",
    )?;

    let rows = stmt.query_map(params![table], |row| {
        Ok(ColumnInfo {
            name: row.get(0)?,
            declared_type: row.get(1)?,
            not_null: row.get(2)?,
            default: row.get(3)?,
            primary_key: row.get::<_, i64>(4)? > 0,
        })
    })?;

    rows.collect::<std::result::Result<Vec<_>, _>>()
        .map_err(Error::from)
}

fn column_exists_in(conn: &Connection, table: &str, column: &str) -> Result<bool> {
    Ok(table_columns_in(conn, table)?
        .iter()
        .any(|c| c.name == column))
}

pub(crate) fn row_count_in(conn: &Connection, table: &str) -> Result<i64> {
    let count: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM {}", quote_ident(table)),
        [],
        |row| row.get(0),
    )?;
    Ok(count)
}

pub(crate) fn create_table_in(
    conn: &Connection,
    table: &str,
    fields: &[FieldDefinition],
) -> Result<bool> {
    if table_exists_in(conn, table)? {
        warn!("Table {} already exists, leaving it unchanged", table);
        return Ok(false);
    }

    in_savepoint(conn, table, || {
        conn.execute_batch(&create_table_sql(table, fields))
            .map_err(|e| Error::migration(table, e))?;
        for field in fields.iter().filter(|f| f.settings.unique) {
            create_unique_index_in(conn, table, &field.name)?;
        }
        Ok(())
    })?;

    info!("Created table {} with {} field column(s)", table, fields.len());
    Ok(true)
}

pub(crate) fn add_column_in(conn: &Connection, table: &str, field: &FieldDefinition) -> Result<bool> {
    if !table_exists_in(conn, table)? {
        return Err(Error::migration(table, "table does not exist"));
    }
    if column_exists_in(conn, table, &field.name)? {
        warn!("Column '{}' already exists on {}, skipping add", field.name, table);
        return Ok(false);
    }

    let spec = field_spec(field);
    let sql = format!(
        "ALTER TABLE {} ADD COLUMN {}",
        quote_ident(table),
        spec.add_column_definition(&field.name)
    );

    in_savepoint(conn, table, || {
        conn.execute_batch(&sql)
            .map_err(|e| Error::migration(table, e))?;
        if spec.unique {
            create_unique_index_in(conn, table, &field.name)?;
        }
        Ok(())
    })?;

    if spec.requires_native() {
        info!(
            "Added {} column '{}' to {} using native statement",
            spec.sql_type(),
            field.name,
            table
        );
    } else {
        info!("Added {} column '{}' to {}", spec.sql_type(), field.name, table);
    }
    Ok(true)
}

/// Applies `op` for `field` to `table`. `fields` is the template's field list
/// after the change and is only consulted for updates.
pub(crate) fn alter_in(
    conn: &Connection,
    table: &str,
    fields: &[FieldDefinition],
    field: &FieldDefinition,
    op: &AlterOperation,
) -> Result<bool> {
    match op {
        AlterOperation::Add => add_column_in(conn, table, field),
        AlterOperation::Update { previous } => update_column_in(conn, table, fields, field, previous),
        AlterOperation::Remove => remove_column_in(conn, table, &field.name),
    }
}

pub(crate) fn update_column_in(
    conn: &Connection,
    table: &str,
    fields: &[FieldDefinition],
    field: &FieldDefinition,
    previous: &FieldDefinition,
) -> Result<bool> {
    // TODO: rebuild document columns once stored documents can be converted between types.
    if field.field_type.is_document() || previous.field_type.is_document() {
        let renamed = previous.name != field.name;
        if renamed {
            rename_column_in(conn, table, &previous.name, &field.name, field.settings.unique)?;
        }
        if field.field_type != previous.field_type || field_spec(previous) != field_spec(field) {
            warn!(
                "Document column '{}' on {} is not altered in place, type change skipped",
                field.name, table
            );
        }
        return Ok(renamed);
    }

    let before = field_spec(previous);
    let after = field_spec(field);
    if previous.name == field.name && before == after {
        debug!("Column '{}' on {} unchanged", field.name, table);
        return Ok(false);
    }

    if !table_exists_in(conn, table)? {
        return Err(Error::migration(table, "table does not exist"));
    }

    rebuild_table_in(conn, table, fields, field.id, &previous.name)?;

    info!(
        "Changed column '{}' to '{}' {} on {}",
        previous.name,
        field.name,
        after.sql_type(),
        table
    );
    Ok(true)
}

/// Recreates `table` from `fields`, copying rows across. SQLite has no
/// `ALTER COLUMN`, so type, nullability and name changes all go through here.
/// The column of `changed_field_id` is read from `previous_name`.
fn rebuild_table_in(
    conn: &Connection,
    table: &str,
    fields: &[FieldDefinition],
    changed_field_id: i64,
    previous_name: &str,
) -> Result<()> {
    let existing: HashSet<String> = table_columns_in(conn, table)?
        .into_iter()
        .map(|c| c.name)
        .collect();

    let mut targets: Vec<String> = SYSTEM_COLUMNS.iter().map(|c| quote_ident(c)).collect();
    let mut sources = targets.clone();

    for f in fields {
        let spec = field_spec(f);
        let source = if f.id == changed_field_id {
            previous_name
        } else {
            f.name.as_str()
        };

        let fallback = spec
            .default
            .clone()
            .or_else(|| (!spec.nullable).then(|| spec.fill_default()))
            .map_or_else(|| "NULL".to_string(), |d| d.sql_literal());

        let expr = if !existing.contains(source) {
            fallback
        } else if spec.nullable {
            quote_ident(source)
        } else {
            format!("COALESCE({}, {fallback})", quote_ident(source))
        };

        targets.push(quote_ident(&f.name));
        sources.push(expr);
    }

    let temp = format!("{table}{REBUILD_SUFFIX}");

    in_savepoint(conn, table, || {
        conn.execute_batch(&format!(
            "DROP TABLE IF EXISTS {};\n{};",
            quote_ident(&temp),
            create_table_sql(&temp, fields)
        ))
        .map_err(|e| Error::migration(table, e))?;

        conn.execute(
            &format!(
                "INSERT INTO {} ({}) SELECT {} FROM {}",
                quote_ident(&temp),
                targets.join(", "),
                sources.join(", "),
                quote_ident(table)
            ),
            [],
        )
        .map_err(|e| Error::migration(table, e))?;

        conn.execute_batch(&format!(
            "DROP TABLE {table_q};\nALTER TABLE {temp_q} RENAME TO {table_q};",
            table_q = quote_ident(table),
            temp_q = quote_ident(&temp)
        ))
        .map_err(|e| Error::migration(table, e))?;

        for f in fields.iter().filter(|f| f.settings.unique) {
            create_unique_index_in(conn, table, &f.name)?;
        }
        Ok(())
    })
}

/// Renames a column in place and moves its unique index along with it.
fn rename_column_in(
    conn: &Connection,
    table: &str,
    from: &str,
    to: &str,
    unique: bool,
) -> Result<()> {
    if !column_exists_in(conn, table, from)? {
        return Err(Error::migration(
            table,
            format!("column '{from}' does not exist"),
        ));
    }

    in_savepoint(conn, table, || {
        conn.execute_batch(&format!(
            "DROP INDEX IF EXISTS {};\nALTER TABLE {} RENAME COLUMN {} TO {};",
            quote_ident(&unique_index_name(table, from)),
            quote_ident(table),
            quote_ident(from),
            quote_ident(to)
        ))
        .map_err(|e| Error::migration(table, e))?;
        if unique {
            create_unique_index_in(conn, table, to)?;
        }
        Ok(())
    })?;

    info!("Renamed column '{}' to '{}' on {}", from, to, table);
    Ok(())
}

pub(crate) fn remove_column_in(conn: &Connection, table: &str, column: &str) -> Result<bool> {
    if !table_exists_in(conn, table)? {
        debug!("Table {} does not exist, no column to drop", table);
        return Ok(false);
    }
    if !column_exists_in(conn, table, column)? {
        info!("Column '{}' already absent from {}, nothing to drop", column, table);
        return Ok(false);
    }

    in_savepoint(conn, table, || {
        conn.execute_batch(&format!(
            "DROP INDEX IF EXISTS {};\nALTER TABLE {} DROP COLUMN {};",
            quote_ident(&unique_index_name(table, column)),
            quote_ident(table),
            quote_ident(column)
        ))
        .map_err(|e| Error::migration(table, e))
    })?;

    info!("Dropped column '{}' from {}", column, table);
    Ok(true)
}

pub(crate) fn drop_tables_in(conn: &Connection, names: &[String]) -> Result<Vec<String>> {
    let mut dropped = Vec::new();
    for name in names {
        if !table_exists_in(conn, name)? {
            debug!("Table {} not present, nothing to drop", name);
            continue;
        }
        conn.execute_batch(&format!("DROP TABLE IF EXISTS {}", quote_ident(name)))
            .map_err(|e| Error::migration(name, e))?;
        info!("Dropped table {}", name);
        dropped.push(name.clone());
    }
    Ok(dropped)
}
