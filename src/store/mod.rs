mod schema;
mod sqlite;

pub use sqlite::SqliteStore;
pub(crate) use sqlite::{
    abandon_intents_in, delete_artifacts_in, delete_field_in, delete_template_fields_in,
    delete_template_in, insert_field_in, insert_intent_in, insert_template_in, list_fields_in,
    update_field_in,
};

use crate::error::Result;
use crate::types::*;

/// Store defines the metadata interface.
///
/// Physical tables are not reached through this trait; see
/// [`crate::schema::SchemaMigrator`].
pub trait Store: Send + Sync {
    fn initialize(&self) -> Result<()>;

    // Template operations
    fn create_template(&self, template: &EntityTemplate) -> Result<i64>;
    fn get_template(&self, id: i64) -> Result<Option<EntityTemplate>>;
    fn list_templates(&self, tenant_id: &str, project_id: &str) -> Result<Vec<EntityTemplate>>;
    fn list_all_templates(&self) -> Result<Vec<EntityTemplate>>;
    fn update_template(&self, template: &EntityTemplate) -> Result<()>;
    fn delete_template(&self, id: i64) -> Result<bool>;

    // Field operations
    fn create_field(&self, field: &FieldDefinition) -> Result<i64>;
    fn get_field(&self, id: i64) -> Result<Option<FieldDefinition>>;
    fn get_field_by_name(&self, template_id: i64, name: &str) -> Result<Option<FieldDefinition>>;
    fn list_fields(&self, template_id: i64) -> Result<Vec<FieldDefinition>>;
    fn update_field(&self, field: &FieldDefinition) -> Result<()>;
    fn delete_field(&self, id: i64) -> Result<bool>;
    fn count_fields(&self, template_id: i64) -> Result<i64>;

    // Artifact tracking operations
    fn track_artifact(&self, type_id: &str, path: &str) -> Result<()>;
    fn list_artifacts(&self, type_id: &str) -> Result<Vec<ArtifactRecord>>;
    fn untrack_artifact(&self, type_id: &str, path: &str) -> Result<bool>;

    // Provision intent operations
    fn create_intent(&self, template: &EntityTemplate, operation: IntentOperation) -> Result<i64>;
    fn set_intent_status(&self, id: i64, status: IntentStatus, detail: Option<&str>)
    -> Result<()>;
    fn list_intents(&self, status: IntentStatus) -> Result<Vec<ProvisionIntent>>;

    fn close(&self) -> Result<()>;
}
