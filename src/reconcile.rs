//! Completes or abandons template creations that stopped half way.
//!
//! Creating a template writes metadata, then DDL, then artifact files, and
//! those cannot share one transaction. The template row is written together
//! with a pending intent; the intent is completed at the very end. Anything
//! still pending was interrupted.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::artifacts::{ArtifactGenerator, BindingDescriptor};
use crate::error::Result;
use crate::identifier::IdentifierGenerator;
use crate::schema::SchemaMigrator;
use crate::store::{SqliteStore, Store};
use crate::types::{IntentStatus, ProvisionIntent};

#[derive(Debug, Clone, Default, Serialize)]
pub struct ReconcileReport {
    /// Intent ids whose template was brought to a complete state.
    pub repaired: Vec<i64>,
    /// Intent ids whose template no longer exists.
    pub abandoned: Vec<i64>,
    pub errors: Vec<String>,
}

pub struct Reconciler {
    store: Arc<SqliteStore>,
    migrator: Arc<SchemaMigrator>,
    artifacts: Arc<ArtifactGenerator>,
    ids: IdentifierGenerator,
}

impl Reconciler {
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

    pub fn pending(&self) -> Result<Vec<ProvisionIntent>> {
        self.store.list_intents(IntentStatus::Pending)
    }

    /// Processes every pending intent. A failing intent stays pending and is
    /// reported; the others are still processed.
    pub fn run(&self) -> Result<ReconcileReport> {
        let mut report = ReconcileReport::default();

        for intent in self.pending()? {
            match self.reconcile(&intent) {
                Ok(IntentStatus::Abandoned) => report.abandoned.push(intent.id),
                Ok(_) => report.repaired.push(intent.id),
                Err(e) => {
                    warn!("Intent {} could not be reconciled: {}", intent.id, e);
                    report.errors.push(format!("intent {}: {e}", intent.id));
                }
            }
        }

        info!(
            "Reconciled {} intent(s), abandoned {}, {} error(s)",
            report.repaired.len(),
            report.abandoned.len(),
            report.errors.len()
        );
        Ok(report)
    }

    fn reconcile(&self, intent: &ProvisionIntent) -> Result<IntentStatus> {
        let Some(template) = self.store.get_template(intent.template_id)? else {
            let dropped = self.migrator.drop_table(
                &intent.tenant_id,
                &intent.project_id,
                &intent.entity_name,
                None,
            )?;
            let detail = if dropped.is_empty() {
                "template no longer exists".to_string()
            } else {
                format!("template no longer exists, dropped {}", dropped.join(", "))
            };
            self.store
                .set_intent_status(intent.id, IntentStatus::Abandoned, Some(&detail))?;
            return Ok(IntentStatus::Abandoned);
        };

        let created =
            self.migrator
                .create_table(&template.tenant_id, &template.project_id, template.id)?;
        let fields = self.store.list_fields(template.id)?;
        let descriptor = BindingDescriptor::build(&self.ids, &template, &fields);
        self.artifacts.generate(&descriptor)?;

        let detail = if created {
            "repaired: table created"
        } else {
            "repaired: table present"
        };
        self.store
            .set_intent_status(intent.id, IntentStatus::Complete, Some(detail))?;
        Ok(IntentStatus::Complete)
    }
}
