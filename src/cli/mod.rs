mod commands;
mod field;
pub mod pickers;
mod reconcile;
mod template;

pub use commands::{DataArgs, FieldCommands, TemplateCommands};
pub use field::{run_field_add, run_field_remove, run_field_update};
pub use reconcile::run_reconcile;
pub use template::{
    run_template_create, run_template_delete, run_template_list, run_template_preview,
    run_template_show, run_template_update,
};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::ProvisionConfig;
use crate::lifecycle::TemplateLifecycleManager;
use crate::registry::LoggingRegistry;
use crate::store::SqliteStore;

pub const CONFIG_FILE_NAME: &str = "tablesmith.toml";

/// Resolves the config: `--config`, then `<data-dir>/tablesmith.toml`, then defaults.
pub fn load_config(args: &DataArgs) -> anyhow::Result<ProvisionConfig> {
    if let Some(path) = &args.config {
        return Ok(ProvisionConfig::from_file(path)?);
    }

    let default_path = Path::new(&args.data_dir).join(CONFIG_FILE_NAME);
    if default_path.exists() {
        return Ok(ProvisionConfig::from_file(&default_path)?);
    }

    Ok(ProvisionConfig::with_data_dir(PathBuf::from(&args.data_dir)))
}

/// Opens the store of an initialized data directory.
pub fn init_store(config: &ProvisionConfig) -> anyhow::Result<SqliteStore> {
    let db_path = config.db_path();

    if !db_path.exists() {
        anyhow::bail!(
            "Database not found at {}. Run 'tablesmith init' first.",
            db_path.display()
        );
    }

    SqliteStore::new(&db_path).map_err(Into::into)
}

pub fn init_manager(args: &DataArgs) -> anyhow::Result<TemplateLifecycleManager> {
    let config = load_config(args)?;
    let store = init_store(&config)?;
    Ok(TemplateLifecycleManager::new(Arc::new(store), &config)
        .with_registry(Arc::new(LoggingRegistry)))
}
