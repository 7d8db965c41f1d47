//! Field type to column mapping.
//!
//! This is the only place a field type is translated into storage. Adding a
//! field type means adding a row to [`column_spec`].

use serde::Serialize;
use serde_json::Value;

use super::quote_ident;
use crate::types::{FieldSettings, FieldType};

pub const DEFAULT_VARCHAR_LENGTH: u32 = 255;
pub const DEFAULT_PRECISION: u32 = 10;
pub const DEFAULT_SCALE: u32 = 2;
pub const DATETIME_LENGTH: u32 = 20;
pub const EMAIL_LENGTH: u32 = 254;
pub const URL_LENGTH: u32 = 2048;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageType {
    Varchar,
    Text,
    Integer,
    Numeric,
    Boolean,
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ColumnDefault {
    Integer(i64),
    /// Decimal literal, kept as text to avoid float rounding.
    Number(String),
    Text(String),
}

impl ColumnDefault {
    #[must_use]
    pub fn sql_literal(&self) -> String {
        match self {
            Self::Integer(v) => v.to_string(),
            Self::Number(v) => v.clone(),
            Self::Text(v) => format!("'{}'", v.replace('\'', "''")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSpec {
    pub storage_type: StorageType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub precision: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale: Option<u32>,
    pub nullable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<ColumnDefault>,
    pub unique: bool,
}

impl ColumnSpec {
    fn new(storage_type: StorageType, required: bool) -> Self {
        Self {
            storage_type,
            length: None,
            precision: None,
            scale: None,
            nullable: !required,
            default: None,
            unique: false,
        }
    }

    fn varchar(length: u32, required: bool) -> Self {
        Self {
            length: Some(length),
            ..Self::new(StorageType::Varchar, required)
        }
    }

    /// Declared SQL type as it appears in `PRAGMA table_info`.
    #[must_use]
    pub fn sql_type(&self) -> String {
        match self.storage_type {
            StorageType::Varchar => format!(
                "VARCHAR({})",
                self.length.unwrap_or(DEFAULT_VARCHAR_LENGTH)
            ),
            StorageType::Text => "TEXT".to_string(),
            StorageType::Integer => "INTEGER".to_string(),
            StorageType::Numeric => format!(
                "NUMERIC({},{})",
                self.precision.unwrap_or(DEFAULT_PRECISION),
                self.scale.unwrap_or(DEFAULT_SCALE)
            ),
            StorageType::Boolean => "BOOLEAN".to_string(),
            StorageType::Json => "JSONB".to_string(),
        }
    }

    /// Boolean and document columns need engine-specific constraints that the
    /// generic definition cannot express.
    #[must_use]
    pub fn requires_native(&self) -> bool {
        matches!(self.storage_type, StorageType::Boolean | StorageType::Json)
    }

    /// Portable column definition: name, type, nullability, default.
    #[must_use]
    pub fn column_definition(&self, name: &str) -> String {
        self.render(name, self.default.as_ref())
    }

    /// SQLite-specific definition for boolean and document columns.
    #[must_use]
    pub fn native_definition(&self, name: &str) -> String {
        let base = self.column_definition(name);
        let col = quote_ident(name);
        match self.storage_type {
            StorageType::Boolean => format!("{base} CHECK ({col} IN (0, 1))"),
            StorageType::Json => format!("{base} CHECK ({col} IS NULL OR json_valid({col}))"),
            _ => base,
        }
    }

    #[must_use]
    pub fn definition(&self, name: &str) -> String {
        if self.requires_native() {
            self.native_definition(name)
        } else {
            self.column_definition(name)
        }
    }

    /// Definition usable with `ALTER TABLE .. ADD COLUMN`: SQLite refuses a
    /// NOT NULL column without a default on a table that may hold rows.
    #[must_use]
    pub fn add_column_definition(&self, name: &str) -> String {
        if self.nullable || self.default.is_some() {
            return self.definition(name);
        }
        let filled = Self {
            default: Some(self.fill_default()),
            ..self.clone()
        };
        filled.definition(name)
    }

    /// Value used for existing rows when a NOT NULL column appears.
    #[must_use]
    pub fn fill_default(&self) -> ColumnDefault {
        match self.storage_type {
            StorageType::Varchar | StorageType::Text => ColumnDefault::Text(String::new()),
            StorageType::Integer | StorageType::Boolean => ColumnDefault::Integer(0),
            StorageType::Numeric => ColumnDefault::Number("0".to_string()),
            StorageType::Json => ColumnDefault::Text("{}".to_string()),
        }
    }

    fn render(&self, name: &str, default: Option<&ColumnDefault>) -> String {
        let mut def = format!("{} {}", quote_ident(name), self.sql_type());
        if !self.nullable {
            def.push_str(" NOT NULL");
        }
        if let Some(default) = default {
            def.push_str(" DEFAULT ");
            def.push_str(&default.sql_literal());
        }
        def
    }
}

/// Maps a field type and its settings to a column specification.
#[must_use]
pub fn column_spec(field_type: &FieldType, settings: &FieldSettings, required: bool) -> ColumnSpec {
    let mut spec = match field_type {
        FieldType::String => ColumnSpec::varchar(
            settings.max_length.unwrap_or(DEFAULT_VARCHAR_LENGTH),
            required,
        ),
        FieldType::Text => ColumnSpec::new(StorageType::Text, required),
        FieldType::Integer | FieldType::Reference => ColumnSpec::new(StorageType::Integer, required),
        FieldType::Decimal => ColumnSpec {
            precision: Some(settings.precision.unwrap_or(DEFAULT_PRECISION)),
            scale: Some(settings.scale.unwrap_or(DEFAULT_SCALE)),
            ..ColumnSpec::new(StorageType::Numeric, required)
        },
        FieldType::Boolean => ColumnSpec::new(StorageType::Boolean, true),
        FieldType::Datetime => ColumnSpec::varchar(DATETIME_LENGTH, required),
        FieldType::Email => ColumnSpec::varchar(EMAIL_LENGTH, required),
        FieldType::Url => ColumnSpec::varchar(URL_LENGTH, required),
        FieldType::Json => ColumnSpec::new(StorageType::Json, required),
        FieldType::Unknown(_) => ColumnSpec::varchar(DEFAULT_VARCHAR_LENGTH, required),
    };

    spec.default = settings
        .default_value
        .as_ref()
        .and_then(|value| coerce_default(spec.storage_type, value));
    if spec.storage_type == StorageType::Boolean && spec.default.is_none() {
        spec.default = Some(ColumnDefault::Integer(0));
    }
    spec.unique = settings.unique;
    spec
}

/// Converts a settings default into a literal of the given storage type.
/// Returns `None` for `null` and for values that do not fit the type.
#[must_use]
pub fn coerce_default(storage: StorageType, value: &Value) -> Option<ColumnDefault> {
    match (storage, value) {
        (_, Value::Null) => None,
        (StorageType::Json, v) => Some(ColumnDefault::Text(v.to_string())),
        (StorageType::Varchar | StorageType::Text, Value::String(s)) => {
            Some(ColumnDefault::Text(s.clone()))
        }
        (StorageType::Varchar | StorageType::Text, Value::Number(n)) => {
            Some(ColumnDefault::Text(n.to_string()))
        }
        (StorageType::Varchar | StorageType::Text, Value::Bool(b)) => {
            Some(ColumnDefault::Text(b.to_string()))
        }
        (StorageType::Integer, Value::Number(n)) => n.as_i64().map(ColumnDefault::Integer),
        (StorageType::Integer, Value::String(s)) => {
            s.trim().parse::<i64>().ok().map(ColumnDefault::Integer)
        }
        (StorageType::Integer | StorageType::Boolean, Value::Bool(b)) => {
            Some(ColumnDefault::Integer(i64::from(*b)))
        }
        (StorageType::Numeric, Value::Number(n)) => Some(ColumnDefault::Number(n.to_string())),
        (StorageType::Numeric, Value::String(s)) => {
            let s = s.trim();
            s.parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .map(|_| ColumnDefault::Number(s.to_string()))
        }
        (StorageType::Boolean, Value::Number(n)) => match n.as_i64() {
            Some(v @ (0 | 1)) => Some(ColumnDefault::Integer(v)),
            _ => None,
        },
        (StorageType::Boolean, Value::String(s)) => match s.trim() {
            "1" | "true" => Some(ColumnDefault::Integer(1)),
            "0" | "false" => Some(ColumnDefault::Integer(0)),
            _ => None,
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn spec(t: FieldType, settings: FieldSettings, required: bool) -> ColumnSpec {
        column_spec(&t, &settings, required)
    }

    #[test]
    fn test_type_table() {
        let none = FieldSettings::default;
        assert_eq!(spec(FieldType::String, none(), false).sql_type(), "VARCHAR(255)");
        assert_eq!(spec(FieldType::Text, none(), false).sql_type(), "TEXT");
        assert_eq!(spec(FieldType::Integer, none(), false).sql_type(), "INTEGER");
        assert_eq!(spec(FieldType::Decimal, none(), false).sql_type(), "NUMERIC(10,2)");
        assert_eq!(spec(FieldType::Boolean, none(), false).sql_type(), "BOOLEAN");
        assert_eq!(spec(FieldType::Datetime, none(), false).sql_type(), "VARCHAR(20)");
        assert_eq!(spec(FieldType::Email, none(), false).sql_type(), "VARCHAR(254)");
        assert_eq!(spec(FieldType::Url, none(), false).sql_type(), "VARCHAR(2048)");
        assert_eq!(spec(FieldType::Json, none(), false).sql_type(), "JSONB");
        assert_eq!(spec(FieldType::Reference, none(), false).sql_type(), "INTEGER");
        assert_eq!(
            spec(FieldType::Unknown("geo".into()), none(), false).sql_type(),
            "VARCHAR(255)"
        );
    }

    #[test]
    fn test_settings_override_defaults() {
        let s = spec(
            FieldType::String,
            FieldSettings {
                max_length: Some(64),
                ..Default::default()
            },
            true,
        );
        assert_eq!(s.length, Some(64));
        assert!(!s.nullable);

        let d = spec(
            FieldType::Decimal,
            FieldSettings {
                precision: Some(12),
                scale: Some(4),
                ..Default::default()
            },
            false,
        );
        assert_eq!(d.sql_type(), "NUMERIC(12,4)");
        assert!(d.nullable);
    }

    #[test]
    fn test_boolean_default() {
        let off = spec(FieldType::Boolean, FieldSettings::default(), false);
        assert!(!off.nullable);
        assert_eq!(off.default, Some(ColumnDefault::Integer(0)));

        let on = spec(
            FieldType::Boolean,
            FieldSettings {
                default_value: Some(json!(true)),
                ..Default::default()
            },
            false,
        );
        assert_eq!(on.default, Some(ColumnDefault::Integer(1)));
        assert_eq!(
            on.definition("active"),
            "\"active\" BOOLEAN NOT NULL DEFAULT 1 CHECK (\"active\" IN (0, 1))"
        );
    }

    #[test]
    fn test_native_definitions() {
        let j = spec(FieldType::Json, FieldSettings::default(), false);
        assert!(j.requires_native());
        assert_eq!(
            j.definition("meta"),
            "\"meta\" JSONB CHECK (\"meta\" IS NULL OR json_valid(\"meta\"))"
        );

        let s = spec(FieldType::String, FieldSettings::default(), false);
        assert!(!s.requires_native());
        assert_eq!(s.definition("title"), "\"title\" VARCHAR(255)");
    }

    #[test]
    fn test_add_column_fills_required_default() {
        let total = spec(
            FieldType::Decimal,
            FieldSettings {
                precision: Some(10),
                scale: Some(2),
                ..Default::default()
            },
            true,
        );
        assert_eq!(total.column_definition("total"), "\"total\" NUMERIC(10,2) NOT NULL");
        assert_eq!(
            total.add_column_definition("total"),
            "\"total\" NUMERIC(10,2) NOT NULL DEFAULT 0"
        );

        let title = spec(FieldType::String, FieldSettings::default(), true);
        assert_eq!(
            title.add_column_definition("title"),
            "\"title\" VARCHAR(255) NOT NULL DEFAULT ''"
        );
    }

    #[test]
    fn test_coerce_default() {
        assert_eq!(
            coerce_default(StorageType::Text, &json!("it's")).unwrap().sql_literal(),
            "'it''s'"
        );
        assert_eq!(
            coerce_default(StorageType::Integer, &json!("42")),
            Some(ColumnDefault::Integer(42))
        );
        assert_eq!(coerce_default(StorageType::Integer, &json!("forty")), None);
        assert_eq!(
            coerce_default(StorageType::Numeric, &json!("12.50")),
            Some(ColumnDefault::Number("12.50".into()))
        );
        assert_eq!(coerce_default(StorageType::Numeric, &json!("1; DROP TABLE x")), None);
        assert_eq!(coerce_default(StorageType::Boolean, &json!(2)), None);
        assert_eq!(coerce_default(StorageType::Integer, &Value::Null), None);
        assert_eq!(
            coerce_default(StorageType::Json, &json!({"a": 1})),
            Some(ColumnDefault::Text("{\"a\":1}".into()))
        );
    }
}
