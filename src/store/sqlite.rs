use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, Transaction, params};

use super::Store;
use super::schema::SCHEMA;
use crate::error::{Error, Result};
use crate::types::*;

const TEMPLATE_COLUMNS: &str =
    "id, tenant_id, project_id, name, label, description, status, created, updated";
const FIELD_COLUMNS: &str =
    "id, template_id, name, label, type, required, multiple, settings, weight, created, updated";
const INTENT_COLUMNS: &str =
    "id, template_id, tenant_id, project_id, entity_name, operation, status, detail, created, updated";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Returns a guard to the underlying database connection.
    /// Physical tables are managed through this connection.
    pub fn connection(&self) -> MutexGuard<'_, Connection> {
        self.conn()
    }

    /// Runs `f` inside a single transaction. Commits when `f` returns `Ok`,
    /// rolls back otherwise. `f` must not call back into this store.
    pub fn transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T>,
    {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // Handle SQLite's default datetime format: "YYYY-MM-DD HH:MM:SS"
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            tracing::error!("Invalid datetime in database: '{}' - {}", s, e);
            Utc::now()
        })
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

fn template_from_row(row: &Row<'_>) -> rusqlite::Result<EntityTemplate> {
    Ok(EntityTemplate {
        id: row.get(0)?,
        tenant_id: row.get(1)?,
        project_id: row.get(2)?,
        name: row.get(3)?,
        label: row.get(4)?,
        description: row.get(5)?,
        status: TemplateStatus::from_i64(row.get(6)?),
        created: parse_datetime(&row.get::<_, String>(7)?),
        updated: parse_datetime(&row.get::<_, String>(8)?),
    })
}

fn field_from_row(row: &Row<'_>) -> rusqlite::Result<FieldDefinition> {
    let raw_settings: String = row.get(7)?;
    let settings = serde_json::from_str(&raw_settings)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(7, Type::Text, Box::new(e)))?;

    Ok(FieldDefinition {
        id: row.get(0)?,
        template_id: row.get(1)?,
        name: row.get(2)?,
        label: row.get(3)?,
        field_type: FieldType::from(row.get::<_, String>(4)?),
        required: row.get(5)?,
        multiple: row.get(6)?,
        settings,
        weight: row.get(8)?,
        created: parse_datetime(&row.get::<_, String>(9)?),
        updated: parse_datetime(&row.get::<_, String>(10)?),
    })
}

fn intent_from_row(row: &Row<'_>) -> rusqlite::Result<ProvisionIntent> {
    let operation: String = row.get(5)?;
    let status: String = row.get(6)?;
    Ok(ProvisionIntent {
        id: row.get(0)?,
        template_id: row.get(1)?,
        tenant_id: row.get(2)?,
        project_id: row.get(3)?,
        entity_name: row.get(4)?,
        operation: IntentOperation::parse(&operation).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(5, Type::Text, operation.into())
        })?,
        status: IntentStatus::parse(&status).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(6, Type::Text, status.into())
        })?,
        detail: row.get(7)?,
        created: parse_datetime(&row.get::<_, String>(8)?),
        updated: parse_datetime(&row.get::<_, String>(9)?),
    })
}

/// Maps a unique-constraint failure to a validation error; other errors pass through.
fn unique_violation(err: rusqlite::Error, message: impl FnOnce() -> String) -> Error {
    match err {
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            Error::Validation(message())
        }
        e => Error::from(e),
    }
}

pub(crate) fn insert_template_in(conn: &Connection, template: &EntityTemplate) -> Result<i64> {
    conn.execute(
        "INSERT INTO entity_templates (tenant_id, project_id, name, label, description, status, created, updated)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            template.tenant_id,
            template.project_id,
            template.name,
            template.label,
            template.description,
            template.status.as_i64(),
            format_datetime(&template.created),
            format_datetime(&template.updated),
        ],
    )
    .map_err(|e| {
        unique_violation(e, || {
            format!(
                "template name '{}' is already in use in this project",
                template.name
            )
        })
    })?;
    Ok(conn.last_insert_rowid())
}

/// Records a pending intent for `template`, which must already carry its id.
pub(crate) fn insert_intent_in(
    conn: &Connection,
    template: &EntityTemplate,
    operation: IntentOperation,
) -> Result<i64> {
    let now = format_datetime(&Utc::now());
    conn.execute(
        "INSERT INTO provision_intents
            (template_id, tenant_id, project_id, entity_name, operation, status, created, updated)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
        params![
            template.id,
            template.tenant_id,
            template.project_id,
            template.name,
            operation.as_str(),
            IntentStatus::Pending.as_str(),
            now
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub(crate) fn insert_field_in(conn: &Connection, field: &FieldDefinition) -> Result<i64> {
    let settings = serde_json::to_string(&field.settings)?;
    conn.execute(
        "INSERT INTO field_definitions
            (template_id, name, label, type, required, multiple, settings, weight, created, updated)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            field.template_id,
            field.name,
            field.label,
            field.field_type.as_str(),
            field.required,
            field.multiple,
            settings,
            field.weight,
            format_datetime(&field.created),
            format_datetime(&field.updated),
        ],
    )
    .map_err(|e| {
        unique_violation(e, || {
            format!("field name '{}' is already used in this template", field.name)
        })
    })?;
    Ok(conn.last_insert_rowid())
}

pub(crate) fn list_fields_in(conn: &Connection, template_id: i64) -> Result<Vec<FieldDefinition>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {FIELD_COLUMNS} FROM field_definitions
         WHERE template_id = ?1 ORDER BY weight, id"
    ))?;

    let rows = stmt.query_map(params![template_id], field_from_row)?;

    rows.collect::<std::result::Result<Vec<_>, _>>()
        .map_err(Error::from)
}

pub(crate) fn update_field_in(conn: &Connection, field: &FieldDefinition) -> Result<()> {
    let settings = serde_json::to_string(&field.settings)?;
    let rows = conn
        .execute(
            "UPDATE field_definitions
             SET name = ?1, label = ?2, type = ?3, required = ?4, multiple = ?5,
                 settings = ?6, weight = ?7, updated = ?8
             WHERE id = ?9",
            params![
                field.name,
                field.label,
                field.field_type.as_str(),
                field.required,
                field.multiple,
                settings,
                field.weight,
                format_datetime(&field.updated),
                field.id,
            ],
        )
        .map_err(|e| {
            unique_violation(e, || {
                format!("field name '{}' is already used in this template", field.name)
            })
        })?;

    if rows == 0 {
        return Err(Error::NotFound(format!("field {}", field.id)));
    }
    Ok(())
}

pub(crate) fn delete_field_in(conn: &Connection, id: i64) -> Result<bool> {
    let rows = conn.execute("DELETE FROM field_definitions WHERE id = ?1", params![id])?;
    Ok(rows > 0)
}

pub(crate) fn delete_template_fields_in(conn: &Connection, template_id: i64) -> Result<usize> {
    let rows = conn.execute(
        "DELETE FROM field_definitions WHERE template_id = ?1",
        params![template_id],
    )?;
    Ok(rows)
}

pub(crate) fn delete_artifacts_in(conn: &Connection, type_id: &str) -> Result<usize> {
    let rows = conn.execute(
        "DELETE FROM artifact_paths WHERE type_id = ?1",
        params![type_id],
    )?;
    Ok(rows)
}

/// Closes the pending intents of a template that is being removed.
pub(crate) fn abandon_intents_in(conn: &Connection, template_id: i64, detail: &str) -> Result<usize> {
    let rows = conn.execute(
        "UPDATE provision_intents SET status = ?1, detail = ?2, updated = ?3
         WHERE template_id = ?4 AND status = ?5",
        params![
            IntentStatus::Abandoned.as_str(),
            detail,
            format_datetime(&Utc::now()),
            template_id,
            IntentStatus::Pending.as_str()
        ],
    )?;
    Ok(rows)
}

pub(crate) fn delete_template_in(conn: &Connection, id: i64) -> Result<bool> {
    let rows = conn.execute("DELETE FROM entity_templates WHERE id = ?1", params![id])?;
    Ok(rows > 0)
}

impl Store for SqliteStore {
    fn initialize(&self) -> Result<()> {
        self.conn().execute_batch(SCHEMA)?;
        Ok(())
    }

    // Template operations

    fn create_template(&self, template: &EntityTemplate) -> Result<i64> {
        insert_template_in(&self.conn(), template)
    }

    fn get_template(&self, id: i64) -> Result<Option<EntityTemplate>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {TEMPLATE_COLUMNS} FROM entity_templates WHERE id = ?1"),
            params![id],
            template_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_templates(&self, tenant_id: &str, project_id: &str) -> Result<Vec<EntityTemplate>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {TEMPLATE_COLUMNS} FROM entity_templates
             WHERE tenant_id = ?1 AND project_id = ?2 ORDER BY name, id"
        ))?;

        let rows = stmt.query_map(params![tenant_id, project_id], template_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn list_all_templates(&self) -> Result<Vec<EntityTemplate>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {TEMPLATE_COLUMNS} FROM entity_templates ORDER BY id"
        ))?;

        let rows = stmt.query_map([], template_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn update_template(&self, template: &EntityTemplate) -> Result<()> {
        let rows = self
            .conn()
            .execute(
                "UPDATE entity_templates SET label = ?1, description = ?2, status = ?3, updated = ?4
                 WHERE id = ?5",
                params![
                    template.label,
                    template.description,
                    template.status.as_i64(),
                    format_datetime(&template.updated),
                    template.id,
                ],
            )
            .map_err(|e| {
                unique_violation(e, || {
                    format!(
                        "template name '{}' is already in use in this project",
                        template.name
                    )
                })
            })?;

        if rows == 0 {
            return Err(Error::NotFound(format!("template {}", template.id)));
        }
        Ok(())
    }

    fn delete_template(&self, id: i64) -> Result<bool> {
        delete_template_in(&self.conn(), id)
    }

    // Field operations

    fn create_field(&self, field: &FieldDefinition) -> Result<i64> {
        insert_field_in(&self.conn(), field)
    }

    fn get_field(&self, id: i64) -> Result<Option<FieldDefinition>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {FIELD_COLUMNS} FROM field_definitions WHERE id = ?1"),
            params![id],
            field_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_field_by_name(&self, template_id: i64, name: &str) -> Result<Option<FieldDefinition>> {
        let conn = self.conn();
        conn.query_row(
            &format!(
                "SELECT {FIELD_COLUMNS} FROM field_definitions WHERE template_id = ?1 AND name = ?2"
            ),
            params![template_id, name],
            field_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_fields(&self, template_id: i64) -> Result<Vec<FieldDefinition>> {
        list_fields_in(&self.conn(), template_id)
    }

    fn update_field(&self, field: &FieldDefinition) -> Result<()> {
        update_field_in(&self.conn(), field)
    }

    fn delete_field(&self, id: i64) -> Result<bool> {
        delete_field_in(&self.conn(), id)
    }

    fn count_fields(&self, template_id: i64) -> Result<i64> {
        let conn = self.conn();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM field_definitions WHERE template_id = ?1",
            params![template_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    // Artifact tracking operations

    fn track_artifact(&self, type_id: &str, path: &str) -> Result<()> {
        self.conn().execute(
            "INSERT OR IGNORE INTO artifact_paths (type_id, path, created) VALUES (?1, ?2, ?3)",
            params![type_id, path, format_datetime(&Utc::now())],
        )?;
        Ok(())
    }

    fn list_artifacts(&self, type_id: &str) -> Result<Vec<ArtifactRecord>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, type_id, path, created FROM artifact_paths WHERE type_id = ?1 ORDER BY id",
        )?;

        let rows = stmt.query_map(params![type_id], |row| {
            Ok(ArtifactRecord {
                id: row.get(0)?,
                type_id: row.get(1)?,
                path: row.get(2)?,
                created: parse_datetime(&row.get::<_, String>(3)?),
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn untrack_artifact(&self, type_id: &str, path: &str) -> Result<bool> {
        let rows = self.conn().execute(
            "DELETE FROM artifact_paths WHERE type_id = ?1 AND path = ?2",
            params![type_id, path],
        )?;
        Ok(rows > 0)
    }

    // Provision intent operations

    fn create_intent(&self, template: &EntityTemplate, operation: IntentOperation) -> Result<i64> {
        insert_intent_in(&self.conn(), template, operation)
    }

    fn set_intent_status(
        &self,
        id: i64,
        status: IntentStatus,
        detail: Option<&str>,
    ) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE provision_intents SET status = ?1, detail = ?2, updated = ?3 WHERE id = ?4",
            params![status.as_str(), detail, format_datetime(&Utc::now()), id],
        )?;

        if rows == 0 {
            return Err(Error::NotFound(format!("intent {id}")));
        }
        Ok(())
    }

    fn list_intents(&self, status: IntentStatus) -> Result<Vec<ProvisionIntent>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {INTENT_COLUMNS} FROM provision_intents WHERE status = ?1 ORDER BY id"
        ))?;

        let rows = stmt.query_map(params![status.as_str()], intent_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn close(&self) -> Result<()> {
        Ok(())
    }
}
