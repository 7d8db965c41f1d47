use serde::Serialize;

use crate::artifacts::BindingDescriptor;
use crate::schema::ColumnInfo;
use crate::store::Store;
use crate::types::{EntityTemplate, TemplateStatus, TemplateValues};

use super::pickers::{confirm_action, describe_template, finish, print_json};
use super::{DataArgs, init_manager};

#[derive(Serialize)]
struct TemplateDetails {
    template: EntityTemplate,
    descriptor: BindingDescriptor,
    columns: Vec<ColumnInfo>,
}

fn parse_status(status: &str) -> anyhow::Result<TemplateStatus> {
    match status {
        "active" => Ok(TemplateStatus::Active),
        "disabled" => Ok(TemplateStatus::Disabled),
        other => anyhow::bail!("Unknown status '{}', expected active or disabled", other),
    }
}

pub fn run_template_create(
    data: DataArgs,
    tenant: String,
    project: String,
    name: String,
    label: Option<String>,
    description: Option<String>,
    disabled: bool,
) -> anyhow::Result<()> {
    let manager = init_manager(&data)?;

    let values = TemplateValues {
        tenant_id: tenant,
        project_id: project,
        label: label.unwrap_or_else(|| name.clone()),
        name,
        description,
        status: Some(if disabled {
            TemplateStatus::Disabled
        } else {
            TemplateStatus::Active
        }),
    };

    let outcome = manager.create_template(&values);
    finish(&outcome, outcome.success, &outcome.errors)
}

pub fn run_template_update(
    data: DataArgs,
    id: i64,
    label: Option<String>,
    description: Option<String>,
    status: Option<String>,
) -> anyhow::Result<()> {
    let manager = init_manager(&data)?;

    let template = manager
        .store()
        .get_template(id)?
        .ok_or_else(|| anyhow::anyhow!("Template not found: {}", id))?;

    let values = TemplateValues {
        tenant_id: template.tenant_id,
        project_id: template.project_id,
        name: template.name,
        label: label.unwrap_or(template.label),
        description: description.or(template.description),
        status: Some(match status {
            Some(s) => parse_status(&s)?,
            None => template.status,
        }),
    };

    let outcome = manager.update_template(id, &values);
    finish(&outcome, outcome.success, &outcome.errors)
}

pub fn run_template_delete(
    data: DataArgs,
    id: i64,
    non_interactive: bool,
    yes: bool,
) -> anyhow::Result<()> {
    let manager = init_manager(&data)?;

    let template = manager
        .store()
        .get_template(id)?
        .ok_or_else(|| anyhow::anyhow!("Template not found: {}", id))?;
    let preview = manager.preview_cleanup(id)?;

    let confirmed = confirm_action(
        &format!(
            "Delete template {}? This drops {} table(s), {} field(s) and {} file(s).",
            describe_template(&template),
            preview.table_names.len(),
            preview.field_count,
            preview.file_paths.len()
        ),
        yes,
        non_interactive,
    )?;

    if !confirmed {
        println!("Cancelled.");
        return Ok(());
    }

    let outcome = manager.delete_template(id);
    finish(&outcome, outcome.success, &outcome.errors)
}

pub fn run_template_preview(data: DataArgs, id: i64) -> anyhow::Result<()> {
    let manager = init_manager(&data)?;
    print_json(&manager.preview_cleanup(id)?)
}

pub fn run_template_show(data: DataArgs, id: i64) -> anyhow::Result<()> {
    let manager = init_manager(&data)?;

    let template = manager
        .store()
        .get_template(id)?
        .ok_or_else(|| anyhow::anyhow!("Template not found: {}", id))?;
    let descriptor = manager.describe(id)?;
    let columns = manager.migrator().table_columns(&descriptor.table_name)?;

    print_json(&TemplateDetails {
        template,
        descriptor,
        columns,
    })
}

pub fn run_template_list(data: DataArgs, tenant: String, project: String) -> anyhow::Result<()> {
    let manager = init_manager(&data)?;
    print_json(&manager.store().list_templates(&tenant, &project)?)
}
