use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::FieldType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateStatus {
    Disabled,
    #[default]
    Active,
}

impl TemplateStatus {
    #[must_use]
    pub const fn as_i64(self) -> i64 {
        match self {
            Self::Disabled => 0,
            Self::Active => 1,
        }
    }

    #[must_use]
    pub const fn from_i64(value: i64) -> Self {
        if value == 1 {
            Self::Active
        } else {
            Self::Disabled
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityTemplate {
    pub id: i64,
    pub tenant_id: String,
    pub project_id: String,
    pub name: String,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub status: TemplateStatus,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

/// Type-specific field parameters, stored as JSON on the field row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precision: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub unique: bool,
    /// Entity name a reference field points at.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub id: i64,
    pub template_id: i64,
    pub name: String,
    pub label: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub required: bool,
    pub multiple: bool,
    pub settings: FieldSettings,
    pub weight: i32,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

/// A generated artifact file tracked against a logical type id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactRecord {
    pub id: i64,
    pub type_id: String,
    pub path: String,
    pub created: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentOperation {
    CreateTemplate,
}

impl IntentOperation {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CreateTemplate => "create_template",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "create_template" => Some(Self::CreateTemplate),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentStatus {
    Pending,
    Complete,
    Abandoned,
}

impl IntentStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Complete => "complete",
            Self::Abandoned => "abandoned",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "complete" => Some(Self::Complete),
            "abandoned" => Some(Self::Abandoned),
            _ => None,
        }
    }
}

/// Compensating-action log entry for multi-step operations that cannot share
/// one transaction (metadata insert, DDL, artifact files).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisionIntent {
    pub id: i64,
    pub template_id: i64,
    pub tenant_id: String,
    pub project_id: String,
    pub entity_name: String,
    pub operation: IntentOperation,
    pub status: IntentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

/// Caller-supplied template attributes for create and update.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TemplateValues {
    pub tenant_id: String,
    pub project_id: String,
    pub name: String,
    pub label: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<TemplateStatus>,
}

/// Caller-supplied field attributes for create and update.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FieldValues {
    pub template_id: i64,
    pub name: String,
    pub label: String,
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub multiple: bool,
    #[serde(default)]
    pub settings: FieldSettings,
    #[serde(default)]
    pub weight: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_from_json() {
        let settings: FieldSettings =
            serde_json::from_str(r#"{"precision": 10, "scale": 2, "color": "red"}"#).unwrap();
        assert_eq!(settings.precision, Some(10));
        assert_eq!(settings.scale, Some(2));
        assert!(!settings.unique);
        assert_eq!(serde_json::to_string(&settings).unwrap(), r#"{"precision":10,"scale":2}"#);
    }

    #[test]
    fn test_status_round_trip() {
        assert_eq!(TemplateStatus::from_i64(TemplateStatus::Active.as_i64()), TemplateStatus::Active);
        assert_eq!(TemplateStatus::from_i64(0), TemplateStatus::Disabled);
        assert_eq!(TemplateStatus::from_i64(7), TemplateStatus::Disabled);
    }
}
