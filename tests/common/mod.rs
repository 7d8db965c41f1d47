//! Shared harness for library-level integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use serde_json::Value;
use tablesmith::config::ProvisionConfig;
use tablesmith::hooks::HookRegistry;
use tablesmith::lifecycle::TemplateLifecycleManager;
use tablesmith::registry::RecordingRegistry;
use tablesmith::store::{SqliteStore, Store};
use tablesmith::types::{FieldSettings, FieldValues, TemplateValues};
use tempfile::TempDir;

pub struct Harness {
    pub temp: TempDir,
    pub config: ProvisionConfig,
    pub manager: TemplateLifecycleManager,
    pub registry: Arc<RecordingRegistry>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_hooks(HookRegistry::new())
    }

    pub fn with_hooks(hooks: HookRegistry) -> Self {
        let temp = TempDir::new().expect("failed to create temp dir");
        let config = ProvisionConfig::with_data_dir(temp.path());
        Self::build(temp, config, hooks)
    }

    pub fn with_config(temp: TempDir, config: ProvisionConfig) -> Self {
        Self::build(temp, config, HookRegistry::new())
    }

    fn build(temp: TempDir, config: ProvisionConfig, hooks: HookRegistry) -> Self {
        let store = SqliteStore::new(config.db_path()).expect("failed to open store");
        store.initialize().expect("failed to initialize store");
        let registry = Arc::new(RecordingRegistry::new());
        let manager = TemplateLifecycleManager::new(Arc::new(store), &config)
            .with_hooks(hooks)
            .with_registry(registry.clone());
        Self {
            temp,
            config,
            manager,
            registry,
        }
    }

    pub fn store(&self) -> &SqliteStore {
        self.manager.store()
    }

    pub fn template_values(tenant: &str, project: &str, name: &str) -> TemplateValues {
        TemplateValues {
            tenant_id: tenant.to_string(),
            project_id: project.to_string(),
            name: name.to_string(),
            label: name.to_string(),
            ..Default::default()
        }
    }

    pub fn create_template(&self, tenant: &str, project: &str, name: &str) -> i64 {
        let outcome = self
            .manager
            .create_template(&Self::template_values(tenant, project, name));
        assert!(outcome.success, "template create failed: {:?}", outcome.errors);
        outcome.template_id.expect("template id")
    }

    pub fn field_values(template_id: i64, name: &str, field_type: &str) -> FieldValues {
        FieldValues {
            template_id,
            name: name.to_string(),
            label: name.to_string(),
            field_type: field_type.to_string(),
            ..Default::default()
        }
    }

    pub fn add_field(
        &self,
        template_id: i64,
        name: &str,
        field_type: &str,
        required: bool,
        settings: Value,
    ) -> i64 {
        let mut values = Self::field_values(template_id, name, field_type);
        values.required = required;
        values.settings = serde_json::from_value::<FieldSettings>(settings).expect("settings");
        let outcome = self.manager.create_field(&values);
        assert!(outcome.success, "field create failed: {:?}", outcome.errors);
        outcome.field_id.expect("field id")
    }

    /// `(name, declared type, not null)` for every column of `table`.
    pub fn columns(&self, table: &str) -> Vec<(String, String, bool)> {
        self.manager
            .migrator()
            .table_columns(table)
            .expect("table_info")
            .into_iter()
            .map(|c| (c.name, c.declared_type, c.not_null))
            .collect()
    }

    pub fn column_names(&self, table: &str) -> Vec<String> {
        self.columns(table).into_iter().map(|c| c.0).collect()
    }

    pub fn execute(&self, sql: &str) {
        self.store()
            .connection()
            .execute_batch(sql)
            .expect("sql failed");
    }
}
