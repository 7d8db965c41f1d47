use serde::Serialize;
use serde_json::{Map, Value, json};

use crate::identifier::IdentifierGenerator;
use crate::schema::{ColumnSpec, column_spec};
use crate::types::{EntityTemplate, FieldDefinition, FieldType};

/// Everything a type-binding generator needs to know about one template.
/// Always recomputed from metadata, never stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BindingDescriptor {
    pub type_id: String,
    pub table_name: String,
    pub template_id: i64,
    pub tenant_id: String,
    pub project_id: String,
    pub entity_name: String,
    pub label: String,
    pub class_name: String,
    pub fields: Vec<FieldDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldDescriptor {
    pub name: String,
    pub label: String,
    pub field_type: FieldType,
    pub required: bool,
    pub multiple: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_type: Option<String>,
    pub column: ColumnSpec,
}

impl BindingDescriptor {
    /// Builds the descriptor for `template`. `fields` are expected in
    /// storage order.
    pub fn build(
        ids: &IdentifierGenerator,
        template: &EntityTemplate,
        fields: &[FieldDefinition],
    ) -> Self {
        let (tenant, project) = (&template.tenant_id, &template.project_id);
        Self {
            type_id: ids.type_id(tenant, project, &template.name),
            table_name: ids.table_name(tenant, project, &template.name),
            template_id: template.id,
            tenant_id: tenant.clone(),
            project_id: project.clone(),
            entity_name: template.name.clone(),
            label: template.label.clone(),
            class_name: IdentifierGenerator::class_name(&template.name),
            fields: fields
                .iter()
                .map(|f| FieldDescriptor {
                    name: f.name.clone(),
                    label: f.label.clone(),
                    field_type: f.field_type.clone(),
                    required: f.required,
                    multiple: f.multiple,
                    target_type: f.settings.target_type.clone(),
                    column: column_spec(&f.field_type, &f.settings, f.required),
                })
                .collect(),
        }
    }

    /// JSON Schema (draft 2020-12) of one record of this type.
    #[must_use]
    pub fn json_schema(&self) -> Value {
        let mut properties = Map::new();
        properties.insert("id".to_string(), json!({ "type": "integer" }));
        properties.insert("uuid".to_string(), json!({ "type": "string", "format": "uuid" }));
        properties.insert("created".to_string(), json!({ "type": "string" }));
        properties.insert("updated".to_string(), json!({ "type": "string" }));

        for field in &self.fields {
            properties.insert(field.name.clone(), field.json_schema());
        }

        let required: Vec<&str> = self
            .fields
            .iter()
            .filter(|f| f.required)
            .map(|f| f.name.as_str())
            .collect();

        json!({
            "$schema": "https://json-schema.org/draft/2020-12/schema",
            "$id": self.type_id,
            "title": self.class_name,
            "description": self.label,
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

impl FieldDescriptor {
    fn json_schema(&self) -> Value {
        let mut schema = match &self.field_type {
            FieldType::Integer => json!({ "type": "integer" }),
            FieldType::Reference => match &self.target_type {
                Some(target) => json!({ "type": "integer", "x-target-type": target }),
                None => json!({ "type": "integer" }),
            },
            FieldType::Decimal => json!({ "type": "number" }),
            FieldType::Boolean => json!({ "type": "boolean" }),
            FieldType::Json => json!({ "type": ["object", "array"] }),
            FieldType::Text => json!({ "type": "string" }),
            FieldType::Email => json!({ "type": "string", "format": "email" }),
            FieldType::Url => json!({ "type": "string", "format": "uri" }),
            FieldType::Datetime => json!({ "type": "string", "format": "date-time" }),
            FieldType::String | FieldType::Unknown(_) => json!({ "type": "string" }),
        };

        if let (Some(obj), Some(length)) = (schema.as_object_mut(), self.column.length) {
            if self.field_type == FieldType::String {
                obj.insert("maxLength".to_string(), json!(length));
            }
        }
        if let Some(obj) = schema.as_object_mut() {
            obj.insert("title".to_string(), json!(self.label));
        }

        if self.multiple {
            json!({ "type": "array", "items": schema })
        } else {
            schema
        }
    }
}
