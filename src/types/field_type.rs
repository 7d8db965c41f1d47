use std::fmt;

use serde::{Deserialize, Serialize};

/// Abstract field type of a template field.
///
/// Types this build does not know (for example rows written by a newer
/// release) are kept as `Unknown` so metadata still loads; the schema mapper
/// gives them its fallback column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FieldType {
    String,
    Text,
    Integer,
    Decimal,
    Boolean,
    Datetime,
    Email,
    Url,
    Json,
    Reference,
    Unknown(String),
}

impl FieldType {
    pub const ALL: [FieldType; 10] = [
        FieldType::String,
        FieldType::Text,
        FieldType::Integer,
        FieldType::Decimal,
        FieldType::Boolean,
        FieldType::Datetime,
        FieldType::Email,
        FieldType::Url,
        FieldType::Json,
        FieldType::Reference,
    ];

    /// Strict parse used when accepting user input.
    pub fn parse(s: &str) -> Option<FieldType> {
        match s {
            "string" => Some(Self::String),
            "text" => Some(Self::Text),
            "integer" => Some(Self::Integer),
            "decimal" => Some(Self::Decimal),
            "boolean" => Some(Self::Boolean),
            "datetime" => Some(Self::Datetime),
            "email" => Some(Self::Email),
            "url" => Some(Self::Url),
            "json" => Some(Self::Json),
            "reference" => Some(Self::Reference),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::String => "string",
            Self::Text => "text",
            Self::Integer => "integer",
            Self::Decimal => "decimal",
            Self::Boolean => "boolean",
            Self::Datetime => "datetime",
            Self::Email => "email",
            Self::Url => "url",
            Self::Json => "json",
            Self::Reference => "reference",
            Self::Unknown(name) => name,
        }
    }

    /// Document columns cannot be altered in place.
    #[must_use]
    pub fn is_document(&self) -> bool {
        matches!(self, Self::Json)
    }

    #[must_use]
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown(_))
    }

    /// Comma-separated list of accepted type names, for error messages.
    #[must_use]
    pub fn accepted_names() -> String {
        Self::ALL
            .iter()
            .map(FieldType::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl From<String> for FieldType {
    fn from(s: String) -> Self {
        Self::parse(&s).unwrap_or(Self::Unknown(s))
    }
}

impl From<FieldType> for String {
    fn from(t: FieldType) -> Self {
        t.as_str().to_string()
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
