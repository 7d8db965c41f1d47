use std::sync::Arc;

use crate::error::{Error, Result};
use crate::identifier::IdentifierGenerator;
use crate::schema::{SYSTEM_COLUMNS, column_spec, mapper::coerce_default};
use crate::store::{SqliteStore, Store};
use crate::types::{EntityTemplate, FieldSettings, FieldType, FieldValues, TemplateValues};

const MIN_TEMPLATE_NAME_LEN: usize = 2;
const MAX_FIELD_NAME_LEN: usize = 64;
const MAX_LABEL_LEN: usize = 255;
const MAX_DESCRIPTION_LEN: usize = 4096;
const MAX_VARCHAR_LENGTH: u32 = 65_535;
const MAX_PRECISION: u32 = 65;

/// Words refused as field names even though they match the name pattern.
const SQL_KEYWORDS: &[&str] = &[
    "add", "all", "alter", "and", "any", "as", "asc", "between", "by", "case", "check",
    "column", "commit", "constraint", "create", "cross", "default", "delete", "desc",
    "distinct", "drop", "else", "end", "exists", "foreign", "from", "group", "having", "in",
    "index", "inner", "insert", "into", "is", "join", "key", "left", "like", "limit", "not",
    "null", "offset", "on", "or", "order", "primary", "references", "right", "rollback",
    "select", "set", "table", "then", "transaction", "union", "unique", "update", "using",
    "values", "when", "where",
];

fn is_valid_name_char(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_'
}

fn required_text(value: &str, attribute: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::validation(format!("{attribute} is required")));
    }
    Ok(())
}

fn validate_name(name: &str, entity: &str, min_len: usize, max_len: usize) -> Result<()> {
    if name.len() < min_len || name.len() > max_len {
        return Err(Error::validation(format!(
            "{entity} name must be between {min_len} and {max_len} characters"
        )));
    }
    if !name.chars().all(is_valid_name_char) {
        return Err(Error::validation(format!(
            "{entity} name can only contain lowercase letters, digits, and underscores"
        )));
    }
    Ok(())
}

fn validate_label(label: &str, entity: &str) -> Result<()> {
    required_text(label, &format!("{entity} label"))?;
    if label.chars().count() > MAX_LABEL_LEN {
        return Err(Error::validation(format!(
            "{entity} label cannot exceed {MAX_LABEL_LEN} characters"
        )));
    }
    Ok(())
}

fn validate_settings(field_type: &FieldType, settings: &FieldSettings, required: bool) -> Result<()> {
    if settings
        .max_length
        .is_some_and(|len| !(1..=MAX_VARCHAR_LENGTH).contains(&len))
    {
        return Err(Error::validation(format!(
            "max_length must be between 1 and {MAX_VARCHAR_LENGTH}"
        )));
    }

    if settings
        .precision
        .is_some_and(|p| !(1..=MAX_PRECISION).contains(&p))
    {
        return Err(Error::validation(format!(
            "precision must be between 1 and {MAX_PRECISION}"
        )));
    }

    let spec = column_spec(field_type, settings, required);
    if let (Some(precision), Some(scale)) = (spec.precision, spec.scale) {
        if scale > precision {
            return Err(Error::validation(format!(
                "scale ({scale}) cannot exceed precision ({precision})"
            )));
        }
    }

    if let Some(value) = &settings.default_value {
        if !value.is_null() && coerce_default(spec.storage_type, value).is_none() {
            return Err(Error::validation(format!(
                "default_value {value} is not compatible with type '{field_type}'"
            )));
        }
    }

    match (&settings.target_type, field_type) {
        (Some(_), t) if *t != FieldType::Reference => Err(Error::validation(
            "target_type is only allowed on reference fields",
        )),
        (Some(target), _) if target.is_empty() || !target.chars().all(is_valid_name_char) => {
            Err(Error::validation(format!(
                "target_type '{target}' is not a valid entity name"
            )))
        }
        _ => Ok(()),
    }
}

/// Checks template and field input before anything is written.
pub struct TemplateValidator {
    store: Arc<SqliteStore>,
    ids: IdentifierGenerator,
}

impl TemplateValidator {
    pub fn new(store: Arc<SqliteStore>, ids: IdentifierGenerator) -> Self {
        Self { store, ids }
    }

    /// Validates template attributes. `existing_id` is set on update.
    pub fn validate_template(&self, values: &TemplateValues, existing_id: Option<i64>) -> Result<()> {
        required_text(&values.tenant_id, "tenant_id")?;
        required_text(&values.project_id, "project_id")?;
        required_text(&values.name, "template name")?;

        let max_len = self
            .ids
            .max_entity_name_length(&values.tenant_id, &values.project_id);
        validate_name(&values.name, "Template", MIN_TEMPLATE_NAME_LEN, max_len)?;
        validate_label(&values.label, "Template")?;

        if values
            .description
            .as_ref()
            .is_some_and(|d| d.chars().count() > MAX_DESCRIPTION_LEN)
        {
            return Err(Error::validation(format!(
                "description cannot exceed {MAX_DESCRIPTION_LEN} characters"
            )));
        }

        if let Some(id) = existing_id {
            let stored = self
                .store
                .get_template(id)?
                .ok_or_else(|| Error::NotFound(format!("template {id}")))?;
            if stored.name != values.name {
                return Err(Error::validation(format!(
                    "template name cannot change (stored '{}', got '{}')",
                    stored.name, values.name
                )));
            }
            if stored.tenant_id != values.tenant_id || stored.project_id != values.project_id {
                return Err(Error::validation("template cannot move to another tenant or project"));
            }
        }

        // Disabled templates keep their table and artifacts, so they hold
        // their name and class name too.
        let class_name = IdentifierGenerator::class_name(&values.name);
        for other in self
            .store
            .list_templates(&values.tenant_id, &values.project_id)?
            .into_iter()
            .filter(|t| Some(t.id) != existing_id)
        {
            if other.name == values.name {
                return Err(Error::validation(format!(
                    "template name '{}' is already in use in this project",
                    values.name
                )));
            }
            if IdentifierGenerator::class_name(&other.name) == class_name {
                return Err(Error::validation(format!(
                    "template name '{}' maps to class {class_name}, already used by '{}'",
                    values.name, other.name
                )));
            }
        }

        Ok(())
    }

    /// Validates field attributes against `template`. `existing_field_id` is
    /// set on update. Returns the parsed field type.
    pub fn validate_field(
        &self,
        values: &FieldValues,
        template: &EntityTemplate,
        existing_field_id: Option<i64>,
    ) -> Result<FieldType> {
        required_text(&values.name, "field name")?;
        required_text(&values.field_type, "field type")?;
        validate_name(&values.name, "Field", 1, MAX_FIELD_NAME_LEN)?;
        validate_label(&values.label, "Field")?;

        if SYSTEM_COLUMNS.contains(&values.name.as_str()) {
            return Err(Error::validation(format!(
                "field name '{}' is reserved for a system column",
                values.name
            )));
        }
        if SQL_KEYWORDS.contains(&values.name.as_str()) {
            return Err(Error::validation(format!(
                "field name '{}' is a reserved SQL keyword",
                values.name
            )));
        }

        let field_type = FieldType::parse(&values.field_type).ok_or_else(|| {
            Error::validation(format!(
                "unknown field type '{}', expected one of: {}",
                values.field_type,
                FieldType::accepted_names()
            ))
        })?;

        validate_settings(&field_type, &values.settings, values.required)?;

        let existing = self.store.get_field_by_name(template.id, &values.name)?;
        if existing.is_some_and(|f| Some(f.id) != existing_field_id) {
            return Err(Error::validation(format!(
                "field name '{}' is already used in this template",
                values.name
            )));
        }

        Ok(field_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TemplateStatus;
    use chrono::Utc;
    use serde_json::json;

    fn setup() -> (Arc<SqliteStore>, TemplateValidator) {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        store.initialize().unwrap();
        let validator = TemplateValidator::new(store.clone(), IdentifierGenerator::default());
        (store, validator)
    }

    fn template_values(name: &str) -> TemplateValues {
        TemplateValues {
            tenant_id: "t1".to_string(),
            project_id: "p1".to_string(),
            name: name.to_string(),
            label: "Orders".to_string(),
            ..Default::default()
        }
    }

    fn field_values(name: &str, field_type: &str) -> FieldValues {
        FieldValues {
            template_id: 1,
            name: name.to_string(),
            label: name.to_string(),
            field_type: field_type.to_string(),
            ..Default::default()
        }
    }

    fn stored_template(store: &SqliteStore, name: &str) -> EntityTemplate {
        let mut template = EntityTemplate {
            id: 0,
            tenant_id: "t1".to_string(),
            project_id: "p1".to_string(),
            name: name.to_string(),
            label: "Orders".to_string(),
            description: None,
            status: TemplateStatus::Active,
            created: Utc::now(),
            updated: Utc::now(),
        };
        template.id = store.create_template(&template).unwrap();
        template
    }

    #[test]
    fn test_template_name_rules() {
        let (_store, validator) = setup();

        assert!(validator.validate_template(&template_values("orders"), None).is_ok());
        assert!(validator.validate_template(&template_values("sales_2024"), None).is_ok());

        for bad in ["My-Entity", "Orders", "o", "with space", "x".repeat(24).as_str()] {
            let result = validator.validate_template(&template_values(bad), None);
            assert!(matches!(result, Err(Error::Validation(_))), "{bad} accepted");
        }

        assert!(validator.validate_template(&template_values(&"x".repeat(23)), None).is_ok());
    }

    #[test]
    fn test_template_required_attributes() {
        let (_store, validator) = setup();

        let mut values = template_values("orders");
        values.label = "   ".to_string();
        assert!(validator.validate_template(&values, None).is_err());

        let mut values = template_values("orders");
        values.tenant_id = String::new();
        assert!(validator.validate_template(&values, None).is_err());

        let mut values = template_values("orders");
        values.description = Some("d".repeat(MAX_DESCRIPTION_LEN + 1));
        assert!(validator.validate_template(&values, None).is_err());
    }

    #[test]
    fn test_template_name_unique_in_project() {
        let (store, validator) = setup();
        let existing = stored_template(&store, "orders");

        let err = validator
            .validate_template(&template_values("orders"), None)
            .unwrap_err();
        assert!(err.to_string().contains("already in use"));

        // Updating the same template keeps its own name.
        assert!(validator
            .validate_template(&template_values("orders"), Some(existing.id))
            .is_ok());

        // A disabled duplicate would share the physical table.
        let mut disabled = template_values("orders");
        disabled.status = Some(TemplateStatus::Disabled);
        assert!(matches!(
            validator.validate_template(&disabled, None),
            Err(Error::Validation(_))
        ));

        let mut elsewhere = template_values("orders");
        elsewhere.project_id = "p2".to_string();
        assert!(validator.validate_template(&elsewhere, None).is_ok());
    }

    #[test]
    fn test_disabled_template_still_holds_its_name() {
        let (store, validator) = setup();
        let mut disabled = template_values("orders");
        disabled.status = Some(TemplateStatus::Disabled);
        let mut template = stored_template(&store, "orders");
        template.status = TemplateStatus::Disabled;
        store.update_template(&template).unwrap();

        let err = validator
            .validate_template(&template_values("orders"), None)
            .unwrap_err();
        assert!(err.to_string().contains("already in use"));

        // Re-enabling the same template is fine.
        assert!(validator
            .validate_template(&template_values("orders"), Some(template.id))
            .is_ok());
        assert!(validator.validate_template(&disabled, Some(template.id)).is_ok());
    }

    #[test]
    fn test_template_class_name_must_not_collide() {
        let (store, validator) = setup();
        stored_template(&store, "order_2");
        stored_template(&store, "a_b");

        for clash in ["order2", "a__b", "_a_b"] {
            let err = validator
                .validate_template(&template_values(clash), None)
                .unwrap_err();
            assert!(err.to_string().contains("maps to class"), "{clash}: {err}");
        }
        assert!(validator.validate_template(&template_values("order_3"), None).is_ok());
    }

    #[test]
    fn test_template_name_immutable_on_update() {
        let (store, validator) = setup();
        let existing = stored_template(&store, "orders");

        let result = validator.validate_template(&template_values("invoices"), Some(existing.id));
        assert!(matches!(result, Err(Error::Validation(_))));

        let missing = validator.validate_template(&template_values("orders"), Some(999));
        assert!(matches!(missing, Err(Error::NotFound(_))));
    }

    #[test]
    fn test_field_name_rules() {
        let (store, validator) = setup();
        let template = stored_template(&store, "orders");

        assert_eq!(
            validator
                .validate_field(&field_values("total", "decimal"), &template, None)
                .unwrap(),
            FieldType::Decimal
        );

        for bad in ["id", "uuid", "tenant_id", "select", "Total", "", "a-b"] {
            let result = validator.validate_field(&field_values(bad, "string"), &template, None);
            assert!(matches!(result, Err(Error::Validation(_))), "{bad:?} accepted");
        }

        let long = "f".repeat(MAX_FIELD_NAME_LEN + 1);
        assert!(validator
            .validate_field(&field_values(&long, "string"), &template, None)
            .is_err());
    }

    #[test]
    fn test_field_type_must_parse() {
        let (store, validator) = setup();
        let template = stored_template(&store, "orders");

        let err = validator
            .validate_field(&field_values("amount", "money"), &template, None)
            .unwrap_err();
        assert!(err.to_string().contains("unknown field type 'money'"));
    }

    #[test]
    fn test_field_duplicate_name() {
        let (store, validator) = setup();
        let template = stored_template(&store, "orders");
        let id = store
            .create_field(&crate::types::FieldDefinition {
                id: 0,
                template_id: template.id,
                name: "total".to_string(),
                label: "Total".to_string(),
                field_type: FieldType::Decimal,
                required: false,
                multiple: false,
                settings: FieldSettings::default(),
                weight: 0,
                created: Utc::now(),
                updated: Utc::now(),
            })
            .unwrap();

        assert!(validator
            .validate_field(&field_values("total", "decimal"), &template, None)
            .is_err());
        assert!(validator
            .validate_field(&field_values("total", "decimal"), &template, Some(id))
            .is_ok());
    }

    #[test]
    fn test_field_settings_coherence() {
        let (store, validator) = setup();
        let template = stored_template(&store, "orders");

        let mut values = field_values("total", "decimal");
        values.settings.precision = Some(4);
        values.settings.scale = Some(6);
        assert!(validator.validate_field(&values, &template, None).is_err());

        let mut values = field_values("title", "string");
        values.settings.max_length = Some(0);
        assert!(validator.validate_field(&values, &template, None).is_err());

        let mut values = field_values("qty", "integer");
        values.settings.default_value = Some(json!("many"));
        assert!(validator.validate_field(&values, &template, None).is_err());

        let mut values = field_values("qty", "integer");
        values.settings.default_value = Some(json!(5));
        assert!(validator.validate_field(&values, &template, None).is_ok());

        let mut values = field_values("title", "string");
        values.settings.target_type = Some("customers".to_string());
        assert!(validator.validate_field(&values, &template, None).is_err());

        let mut values = field_values("customer", "reference");
        values.settings.target_type = Some("customers".to_string());
        assert!(validator.validate_field(&values, &template, None).is_ok());
    }
}
