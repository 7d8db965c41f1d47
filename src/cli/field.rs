use crate::store::Store;
use crate::types::{FieldSettings, FieldValues};

use super::pickers::{confirm_action, describe_field, finish};
use super::{DataArgs, init_manager};

fn parse_settings(raw: Option<String>) -> anyhow::Result<Option<FieldSettings>> {
    raw.map(|s| {
        serde_json::from_str(&s).map_err(|e| anyhow::anyhow!("Invalid --settings JSON: {}", e))
    })
    .transpose()
}

#[allow(clippy::too_many_arguments)]
pub fn run_field_add(
    data: DataArgs,
    template_id: i64,
    name: String,
    label: Option<String>,
    field_type: String,
    required: bool,
    multiple: bool,
    settings: Option<String>,
    weight: i32,
) -> anyhow::Result<()> {
    let settings = parse_settings(settings)?.unwrap_or_default();
    let manager = init_manager(&data)?;

    let values = FieldValues {
        template_id,
        label: label.unwrap_or_else(|| name.clone()),
        name,
        field_type,
        required,
        multiple,
        settings,
        weight,
    };

    let outcome = manager.create_field(&values);
    finish(&outcome, outcome.success, &outcome.errors)
}

#[allow(clippy::too_many_arguments)]
pub fn run_field_update(
    data: DataArgs,
    field_id: i64,
    name: Option<String>,
    label: Option<String>,
    field_type: Option<String>,
    required: Option<bool>,
    multiple: Option<bool>,
    settings: Option<String>,
    weight: Option<i32>,
) -> anyhow::Result<()> {
    let settings = parse_settings(settings)?;
    let manager = init_manager(&data)?;

    let field = manager
        .store()
        .get_field(field_id)?
        .ok_or_else(|| anyhow::anyhow!("Field not found: {}", field_id))?;

    let values = FieldValues {
        template_id: field.template_id,
        name: name.unwrap_or(field.name),
        label: label.unwrap_or(field.label),
        field_type: field_type.unwrap_or_else(|| field.field_type.to_string()),
        required: required.unwrap_or(field.required),
        multiple: multiple.unwrap_or(field.multiple),
        settings: settings.unwrap_or(field.settings),
        weight: weight.unwrap_or(field.weight),
    };

    let outcome = manager.update_field(field_id, &values);
    finish(&outcome, outcome.success, &outcome.errors)
}

pub fn run_field_remove(
    data: DataArgs,
    field_id: i64,
    non_interactive: bool,
    yes: bool,
) -> anyhow::Result<()> {
    let manager = init_manager(&data)?;

    let field = manager
        .store()
        .get_field(field_id)?
        .ok_or_else(|| anyhow::anyhow!("Field not found: {}", field_id))?;

    let confirmed = confirm_action(
        &format!(
            "Remove field {}? Its column and data are dropped.",
            describe_field(&field)
        ),
        yes,
        non_interactive,
    )?;

    if !confirmed {
        println!("Cancelled.");
        return Ok(());
    }

    let outcome = manager.delete_field(field_id);
    finish(&outcome, outcome.success, &outcome.errors)
}
