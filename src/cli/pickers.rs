use serde::Serialize;

use crate::types::{EntityTemplate, FieldDefinition};

pub fn confirm_action(message: &str, yes: bool, non_interactive: bool) -> anyhow::Result<bool> {
    if yes {
        Ok(true)
    } else if non_interactive {
        anyhow::bail!("--yes is required for destructive operations in non-interactive mode");
    } else {
        Ok(inquire::Confirm::new(message)
            .with_default(false)
            .prompt()?)
    }
}

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Prints an outcome and turns a failed one into an error exit.
pub fn finish<T: Serialize>(outcome: &T, success: bool, errors: &[String]) -> anyhow::Result<()> {
    print_json(outcome)?;
    if !success {
        anyhow::bail!("{}", errors.join("; "));
    }
    Ok(())
}

pub fn describe_template(template: &EntityTemplate) -> String {
    format!(
        "{} ({}/{}, id {})",
        template.name, template.tenant_id, template.project_id, template.id
    )
}

pub fn describe_field(field: &FieldDefinition) -> String {
    format!("{} ({}, id {})", field.name, field.field_type, field.id)
}
