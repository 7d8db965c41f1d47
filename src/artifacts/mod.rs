//! Binding descriptors and the artifact files generated from them.

mod descriptor;
mod storage;

pub use descriptor::{BindingDescriptor, FieldDescriptor};
pub use storage::{ArtifactStorage, ArtifactStorageError};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::error::Result;
use crate::identifier::IdentifierGenerator;
use crate::store::{SqliteStore, Store};

/// File names generated for a class: the descriptor and its JSON Schema.
#[must_use]
pub fn artifact_file_names(class_name: &str) -> [String; 2] {
    [
        format!("{class_name}.json"),
        format!("{class_name}.schema.json"),
    ]
}

/// Writes artifact files for descriptors and records them in the tracking table.
pub struct ArtifactGenerator {
    store: Arc<SqliteStore>,
    storage: ArtifactStorage,
}

impl ArtifactGenerator {
    pub fn new(store: Arc<SqliteStore>, root: &Path) -> Self {
        Self {
            store,
            storage: ArtifactStorage::new(root),
        }
    }

    #[must_use]
    pub fn storage(&self) -> &ArtifactStorage {
        &self.storage
    }

    /// Paths an entity's artifacts live at, whether or not they were tracked.
    #[must_use]
    pub fn expected_paths(&self, tenant: &str, project: &str, entity: &str) -> Vec<PathBuf> {
        let dir = self
            .storage
            .scope_dir(&IdentifierGenerator::scope_digest(tenant, project));
        artifact_file_names(&IdentifierGenerator::class_name(entity))
            .into_iter()
            .map(|name| dir.join(name))
            .collect()
    }

    /// Writes (or overwrites) the artifacts for `descriptor`.
    pub fn generate(&self, descriptor: &BindingDescriptor) -> Result<Vec<PathBuf>> {
        let paths = self.expected_paths(
            &descriptor.tenant_id,
            &descriptor.project_id,
            &descriptor.entity_name,
        );
        let contents = [
            serde_json::to_vec_pretty(descriptor)?,
            serde_json::to_vec_pretty(&descriptor.json_schema())?,
        ];

        for (path, data) in paths.iter().zip(contents) {
            self.storage.put(path, &data)?;
            self.store
                .track_artifact(&descriptor.type_id, &path.to_string_lossy())?;
        }

        debug!(
            "Generated {} artifact(s) for {}",
            paths.len(),
            descriptor.type_id
        );
        Ok(paths)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EntityTemplate, TemplateStatus};
    use chrono::Utc;
    use tempfile::TempDir;

    #[test]
    fn test_generate_writes_and_tracks() {
        let temp = TempDir::new().unwrap();
        let store = Arc::new(SqliteStore::new(temp.path().join("test.db")).unwrap());
        store.initialize().unwrap();
        let generator = ArtifactGenerator::new(store.clone(), &temp.path().join("artifacts"));

        let template = EntityTemplate {
            id: 1,
            tenant_id: "t1".to_string(),
            project_id: "p1".to_string(),
            name: "orders".to_string(),
            label: "Orders".to_string(),
            description: None,
            status: TemplateStatus::Active,
            created: Utc::now(),
            updated: Utc::now(),
        };
        let descriptor =
            BindingDescriptor::build(&IdentifierGenerator::default(), &template, &[]);

        let paths = generator.generate(&descriptor).unwrap();
        assert_eq!(paths, generator.expected_paths("t1", "p1", "orders"));
        assert!(paths[0].ends_with("3dde88/Orders.json"));
        assert!(paths[1].ends_with("3dde88/Orders.schema.json"));
        assert!(paths.iter().all(|p| generator.storage().exists(p)));

        // Regenerating does not duplicate tracking rows.
        generator.generate(&descriptor).unwrap();
        assert_eq!(store.list_artifacts(&descriptor.type_id).unwrap().len(), 2);

        let written: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&paths[0]).unwrap()).unwrap();
        assert_eq!(written["class_name"], "Orders");
    }
}
