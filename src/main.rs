use std::fs;
use std::path::Path;

use anyhow::bail;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use tablesmith::cli::{
    CONFIG_FILE_NAME, DataArgs, FieldCommands, TemplateCommands, load_config, run_field_add,
    run_field_remove, run_field_update, run_reconcile, run_template_create, run_template_delete,
    run_template_list, run_template_preview, run_template_show, run_template_update,
};
use tablesmith::config::ProvisionConfig;
use tablesmith::store::{SqliteStore, Store};

#[derive(Parser)]
#[command(name = "tablesmith")]
#[command(about = "Provision physical tables from tenant entity templates", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the data directory and metadata database
    Init {
        #[command(flatten)]
        data: DataArgs,

        /// Also write a config file with the effective settings
        #[arg(long)]
        write_config: bool,
    },

    /// Manage entity templates
    Template {
        #[command(subcommand)]
        command: TemplateCommands,
    },

    /// Manage template fields
    Field {
        #[command(subcommand)]
        command: FieldCommands,
    },

    /// Finish or abandon interrupted template creations
    Reconcile {
        #[command(flatten)]
        data: DataArgs,

        /// Only list pending intents
        #[arg(long)]
        dry_run: bool,
    },
}

fn write_config_file(config: &ProvisionConfig, path: &Path) -> anyhow::Result<()> {
    if path.exists() {
        bail!("Config file already exists at {}", path.display());
    }
    fs::write(path, toml::to_string_pretty(config)?)?;
    Ok(())
}

fn run_init(data: DataArgs, write_config: bool) -> anyhow::Result<()> {
    let config = load_config(&data)?;
    fs::create_dir_all(&config.data_dir)?;
    fs::create_dir_all(config.artifacts_path())?;

    let store = SqliteStore::new(config.db_path())?;
    store.initialize()?;

    if write_config {
        let path = config.data_dir.join(CONFIG_FILE_NAME);
        write_config_file(&config, &path)?;
        info!("Wrote config to {}", path.display());
    }

    println!();
    println!("Initialized tablesmith at {}", config.data_dir.display());
    println!("  database:  {}", config.db_path().display());
    println!("  artifacts: {}", config.artifacts_path().display());
    println!();

    Ok(())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env().add_directive("tablesmith=info".parse()?))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { data, write_config } => run_init(data, write_config)?,
        Commands::Template { command } => match command {
            TemplateCommands::Create {
                data,
                tenant,
                project,
                name,
                label,
                description,
                disabled,
            } => run_template_create(data, tenant, project, name, label, description, disabled)?,
            TemplateCommands::Update {
                data,
                id,
                label,
                description,
                status,
            } => run_template_update(data, id, label, description, status)?,
            TemplateCommands::Delete {
                data,
                id,
                non_interactive,
                yes,
            } => run_template_delete(data, id, non_interactive, yes)?,
            TemplateCommands::Preview { data, id } => run_template_preview(data, id)?,
            TemplateCommands::Show { data, id } => run_template_show(data, id)?,
            TemplateCommands::List {
                data,
                tenant,
                project,
            } => run_template_list(data, tenant, project)?,
        },
        Commands::Field { command } => match command {
            FieldCommands::Add {
                data,
                template_id,
                name,
                label,
                field_type,
                required,
                multiple,
                settings,
                weight,
            } => run_field_add(
                data,
                template_id,
                name,
                label,
                field_type,
                required,
                multiple,
                settings,
                weight,
            )?,
            FieldCommands::Update {
                data,
                field_id,
                name,
                label,
                field_type,
                required,
                multiple,
                settings,
                weight,
            } => run_field_update(
                data, field_id, name, label, field_type, required, multiple, settings, weight,
            )?,
            FieldCommands::Remove {
                data,
                field_id,
                non_interactive,
                yes,
            } => run_field_remove(data, field_id, non_interactive, yes)?,
        },
        Commands::Reconcile { data, dry_run } => run_reconcile(data, dry_run)?,
    }

    Ok(())
}
