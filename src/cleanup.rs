use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::artifacts::ArtifactGenerator;
use crate::error::{Error, Result};
use crate::identifier::IdentifierGenerator;
use crate::schema::{SchemaMigrator, drop_tables_in};
use crate::store::{
    SqliteStore, Store, abandon_intents_in, delete_artifacts_in, delete_template_fields_in,
    delete_template_in,
};
use crate::types::{CleanupPreview, CleanupReport, EntityTemplate, RecordCount};

/// Removes everything a template left behind: artifact files, its physical
/// table, tracking rows, field rows and finally the template row.
pub struct ArtifactCleanupService {
    store: Arc<SqliteStore>,
    migrator: Arc<SchemaMigrator>,
    artifacts: Arc<ArtifactGenerator>,
    ids: IdentifierGenerator,
}

impl ArtifactCleanupService {
    pub fn new(
        store: Arc<SqliteStore>,
        migrator: Arc<SchemaMigrator>,
        artifacts: Arc<ArtifactGenerator>,
        ids: IdentifierGenerator,
    ) -> Self {
        Self {
            store,
            migrator,
            artifacts,
            ids,
        }
    }

    fn load(&self, template_id: i64) -> Result<EntityTemplate> {
        self.store
            .get_template(template_id)?
            .ok_or_else(|| Error::NotFound(format!("template {template_id}")))
    }

    fn type_id(&self, template: &EntityTemplate) -> String {
        self.ids
            .type_id(&template.tenant_id, &template.project_id, &template.name)
    }

    /// Computed artifact paths followed by any other tracked paths.
    fn discover_files(&self, template: &EntityTemplate, type_id: &str) -> Result<Vec<PathBuf>> {
        let mut paths =
            self.artifacts
                .expected_paths(&template.tenant_id, &template.project_id, &template.name);
        for record in self.store.list_artifacts(type_id)? {
            let path = PathBuf::from(record.path);
            if !paths.contains(&path) {
                paths.push(path);
            }
        }
        Ok(paths)
    }

    /// Runs every cleanup step. File removal is best effort and happens
    /// first; the relational steps share one transaction that is rolled back
    /// if any of them fails. Failures are collected in the report.
    pub fn cleanup(&self, template_id: i64) -> Result<CleanupReport> {
        let template = self.load(template_id)?;
        let type_id = self.type_id(&template);
        let mut report = CleanupReport::default();

        self.remove_files(&template, &type_id, &mut report)?;

        let table_names = self.migrator.owned_table_names(
            &template.tenant_id,
            &template.project_id,
            &template.name,
            Some(template_id),
        )?;

        let relational = self.store.transaction(|tx| {
            let mut tables = Vec::new();
            let mut records = Vec::new();
            let mut errors = Vec::new();

            match drop_tables_in(tx, &table_names) {
                Ok(dropped) => tables.extend(dropped),
                Err(e) => errors.push(format!("drop table: {e}")),
            }

            match abandon_intents_in(tx, template_id, "template deleted") {
                Ok(n) => records.push(format!("provision_intents: {n} abandoned")),
                Err(e) => errors.push(format!("pending intents: {e}")),
            }

            match delete_artifacts_in(tx, &type_id) {
                Ok(n) => records.push(format!("artifact_paths: {n} row(s) for {type_id}")),
                Err(e) => errors.push(format!("artifact tracking rows: {e}")),
            }

            match delete_template_fields_in(tx, template_id) {
                Ok(n) => records.push(format!("field_definitions: {n} row(s)")),
                Err(e) => errors.push(format!("field rows: {e}")),
            }

            match delete_template_in(tx, template_id) {
                Ok(true) => records.push(format!("entity_templates: template {template_id}")),
                Ok(false) => errors.push(format!("template {template_id} row already removed")),
                Err(e) => errors.push(format!("template row: {e}")),
            }

            if errors.is_empty() {
                Ok((tables, records))
            } else {
                Err(Error::PartialCleanup(errors))
            }
        });

        match relational {
            Ok((tables, records)) => {
                report.tables_removed = tables;
                report.records_removed = records;
            }
            Err(Error::PartialCleanup(errors)) => {
                warn!(
                    "Cleanup of template {} rolled back: {}",
                    template_id,
                    errors.join("; ")
                );
                report.errors.extend(errors);
            }
            Err(e) => report.errors.push(e.to_string()),
        }

        info!(
            "Cleanup of {}: {} file(s), {} table(s), {} error(s)",
            type_id,
            report.files_removed.len(),
            report.tables_removed.len(),
            report.errors.len()
        );
        Ok(report)
    }

    fn remove_files(
        &self,
        template: &EntityTemplate,
        type_id: &str,
        report: &mut CleanupReport,
    ) -> Result<()> {
        let storage = self.artifacts.storage();
        for path in self.discover_files(template, type_id)? {
            match storage.delete(&path) {
                Ok(true) => report.files_removed.push(path.to_string_lossy().into_owned()),
                Ok(false) => debug!("Artifact {} already absent", path.display()),
                Err(e) => {
                    report.errors.push(format!("file {}: {e}", path.display()));
                    continue;
                }
            }
            if let Err(e) = storage.prune_empty_parents(&path) {
                report
                    .errors
                    .push(format!("directory of {}: {e}", path.display()));
            }
        }
        Ok(())
    }

    /// Lists what [`cleanup`](Self::cleanup) would remove without touching anything.
    pub fn preview(&self, template_id: i64) -> Result<CleanupPreview> {
        let template = self.load(template_id)?;
        let type_id = self.type_id(&template);
        let storage = self.artifacts.storage();

        let file_paths = self
            .discover_files(&template, &type_id)?
            .into_iter()
            .filter(|p| storage.exists(p))
            .map(|p| p.to_string_lossy().into_owned())
            .collect();

        let mut table_names = Vec::new();
        let mut record_counts = Vec::new();
        for table in self.migrator.owned_table_names(
            &template.tenant_id,
            &template.project_id,
            &template.name,
            Some(template_id),
        )? {
            if self.migrator.table_exists(&table)? {
                record_counts.push(RecordCount {
                    source: table.clone(),
                    count: self.migrator.row_count(&table)?,
                });
                table_names.push(table);
            }
        }

        let field_count = self.store.count_fields(template_id)?;
        record_counts.push(RecordCount {
            source: "field_definitions".to_string(),
            count: field_count,
        });
        record_counts.push(RecordCount {
            source: "artifact_paths".to_string(),
            count: i64::try_from(self.store.list_artifacts(&type_id)?.len()).unwrap_or(i64::MAX),
        });

        Ok(CleanupPreview {
            field_count: usize::try_from(field_count).unwrap_or_default(),
            table_names,
            file_paths,
            record_counts,
        })
    }
}
