use clap::{Args, Subcommand};

#[derive(Args, Debug, Clone)]
pub struct DataArgs {
    /// Data directory for the database and generated artifacts
    #[arg(long, default_value = "./data")]
    pub data_dir: String,

    /// Config file (defaults to <data-dir>/tablesmith.toml when present)
    #[arg(long)]
    pub config: Option<String>,
}

#[derive(Subcommand)]
pub enum TemplateCommands {
    /// Create a template and provision its table
    Create {
        #[command(flatten)]
        data: DataArgs,

        /// Owning tenant
        #[arg(long)]
        tenant: String,

        /// Owning project
        #[arg(long)]
        project: String,

        /// Machine name (lowercase letters, digits, underscores)
        #[arg(long)]
        name: String,

        /// Human-readable label (defaults to the name)
        #[arg(long)]
        label: Option<String>,

        #[arg(long)]
        description: Option<String>,

        /// Create the template disabled
        #[arg(long)]
        disabled: bool,
    },

    /// Update a template's label, description or status
    Update {
        #[command(flatten)]
        data: DataArgs,

        /// Template ID
        #[arg(long)]
        id: i64,

        #[arg(long)]
        label: Option<String>,

        #[arg(long)]
        description: Option<String>,

        /// New status: active or disabled
        #[arg(long)]
        status: Option<String>,
    },

    /// Delete a template with its table, fields and artifacts
    Delete {
        #[command(flatten)]
        data: DataArgs,

        /// Template ID
        #[arg(long)]
        id: i64,

        /// Skip interactive prompts (requires --yes)
        #[arg(long)]
        non_interactive: bool,

        /// Skip confirmation prompt
        #[arg(long, short = 'y')]
        yes: bool,
    },

    /// Show what deleting a template would remove
    Preview {
        #[command(flatten)]
        data: DataArgs,

        /// Template ID
        #[arg(long)]
        id: i64,
    },

    /// Show a template's binding descriptor and physical columns
    Show {
        #[command(flatten)]
        data: DataArgs,

        /// Template ID
        #[arg(long)]
        id: i64,
    },

    /// List templates of a project
    List {
        #[command(flatten)]
        data: DataArgs,

        #[arg(long)]
        tenant: String,

        #[arg(long)]
        project: String,
    },
}

#[derive(Subcommand)]
pub enum FieldCommands {
    /// Add a field and its column
    Add {
        #[command(flatten)]
        data: DataArgs,

        /// Template ID
        #[arg(long)]
        template_id: i64,

        #[arg(long)]
        name: String,

        /// Human-readable label (defaults to the name)
        #[arg(long)]
        label: Option<String>,

        /// Field type (string, text, integer, decimal, boolean, datetime, email, url, json, reference)
        #[arg(long = "type")]
        field_type: String,

        #[arg(long)]
        required: bool,

        #[arg(long)]
        multiple: bool,

        /// Settings as JSON, e.g. '{"precision": 10, "scale": 2}'
        #[arg(long)]
        settings: Option<String>,

        #[arg(long, default_value_t = 0)]
        weight: i32,
    },

    /// Change a field; omitted options keep their stored value
    Update {
        #[command(flatten)]
        data: DataArgs,

        /// Field ID
        #[arg(long)]
        field_id: i64,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        label: Option<String>,

        #[arg(long = "type")]
        field_type: Option<String>,

        #[arg(long)]
        required: Option<bool>,

        #[arg(long)]
        multiple: Option<bool>,

        /// Settings as JSON, replacing the stored settings
        #[arg(long)]
        settings: Option<String>,

        #[arg(long)]
        weight: Option<i32>,
    },

    /// Remove a field and drop its column
    Remove {
        #[command(flatten)]
        data: DataArgs,

        /// Field ID
        #[arg(long)]
        field_id: i64,

        /// Skip interactive prompts (requires --yes)
        #[arg(long)]
        non_interactive: bool,

        /// Skip confirmation prompt
        #[arg(long, short = 'y')]
        yes: bool,
    },
}
