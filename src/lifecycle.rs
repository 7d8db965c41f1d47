//! Public entry point for template and field changes.
//!
//! Every operation runs the same pipeline: validate, pre hooks, persist,
//! migrate the physical table, regenerate artifacts, post hooks, then
//! invalidate and republish the type in the registry. Operations never return
//! `Err`; failures end up in the outcome's `errors`.

use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};

use crate::artifacts::{ArtifactGenerator, BindingDescriptor};
use crate::cleanup::ArtifactCleanupService;
use crate::config::ProvisionConfig;
use crate::error::{Error, Result};
use crate::hooks::{EventKind, HookRegistry, LifecycleEvent};
use crate::identifier::IdentifierGenerator;
use crate::reconcile::Reconciler;
use crate::registry::{NoopRegistry, TypeRegistry};
use crate::schema::{AlterOperation, SchemaMigrator, alter_in};
use crate::store::{
    SqliteStore, Store, delete_field_in, insert_field_in, insert_intent_in, insert_template_in,
    list_fields_in, update_field_in,
};
use crate::types::{
    CleanupPreview, DeleteOutcome, EntityTemplate, FieldDefinition, FieldOutcome, FieldValues,
    IntentOperation, IntentStatus, TemplateOutcome, TemplateValues,
};
use crate::validation::TemplateValidator;

pub struct TemplateLifecycleManager {
    store: Arc<SqliteStore>,
    ids: IdentifierGenerator,
    validator: TemplateValidator,
    migrator: Arc<SchemaMigrator>,
    artifacts: Arc<ArtifactGenerator>,
    cleanup: ArtifactCleanupService,
    hooks: HookRegistry,
    registry: Arc<dyn TypeRegistry>,
}

impl TemplateLifecycleManager {
    /// `store` must already be initialized.
    pub fn new(store: Arc<SqliteStore>, config: &ProvisionConfig) -> Self {
        let ids = IdentifierGenerator::new(config.identifier_max_length);
        let migrator = Arc::new(SchemaMigrator::new(store.clone(), ids));
        let artifacts = Arc::new(ArtifactGenerator::new(
            store.clone(),
            &config.artifacts_path(),
        ));

        Self {
            validator: TemplateValidator::new(store.clone(), ids),
            cleanup: ArtifactCleanupService::new(
                store.clone(),
                migrator.clone(),
                artifacts.clone(),
                ids,
            ),
            store,
            ids,
            migrator,
            artifacts,
            hooks: HookRegistry::new(),
            registry: Arc::new(NoopRegistry),
        }
    }

    #[must_use]
    pub fn with_hooks(mut self, hooks: HookRegistry) -> Self {
        self.hooks = hooks;
        self
    }

    #[must_use]
    pub fn with_registry(mut self, registry: Arc<dyn TypeRegistry>) -> Self {
        self.registry = registry;
        self
    }

    #[must_use]
    pub fn store(&self) -> &Arc<SqliteStore> {
        &self.store
    }

    #[must_use]
    pub fn migrator(&self) -> &SchemaMigrator {
        &self.migrator
    }

    #[must_use]
    pub fn identifiers(&self) -> IdentifierGenerator {
        self.ids
    }

    /// Reconciler sharing this manager's store, migrator and artifacts.
    #[must_use]
    pub fn reconciler(&self) -> Reconciler {
        Reconciler::new(
            self.store.clone(),
            self.migrator.clone(),
            self.artifacts.clone(),
            self.ids,
        )
    }

    fn load_template(&self, id: i64) -> Result<EntityTemplate> {
        self.store
            .get_template(id)?
            .ok_or_else(|| Error::NotFound(format!("template {id}")))
    }

    fn load_field(&self, id: i64) -> Result<FieldDefinition> {
        self.store
            .get_field(id)?
            .ok_or_else(|| Error::NotFound(format!("field {id}")))
    }

    fn type_id(&self, template: &EntityTemplate) -> String {
        self.ids
            .type_id(&template.tenant_id, &template.project_id, &template.name)
    }

    fn table_name(&self, template: &EntityTemplate) -> String {
        self.ids
            .table_name(&template.tenant_id, &template.project_id, &template.name)
    }

    fn event(kind: EventKind, template: &EntityTemplate, field_name: Option<&str>) -> LifecycleEvent {
        LifecycleEvent {
            kind,
            template_id: Some(template.id),
            tenant_id: template.tenant_id.clone(),
            project_id: template.project_id.clone(),
            entity_name: template.name.clone(),
            field_name: field_name.map(str::to_string),
        }
    }

    /// Recomputes the descriptor and rewrites the artifact files.
    fn regenerate(&self, template: &EntityTemplate) -> Result<BindingDescriptor> {
        let fields = self.store.list_fields(template.id)?;
        let descriptor = BindingDescriptor::build(&self.ids, template, &fields);
        self.artifacts.generate(&descriptor)?;
        Ok(descriptor)
    }

    /// Regenerates artifacts after a committed change. A failure is reported
    /// but does not undo the change.
    fn regenerate_after_commit(
        &self,
        template: &EntityTemplate,
        messages: &mut Vec<String>,
        errors: &mut Vec<String>,
    ) -> Option<BindingDescriptor> {
        match self.regenerate(template) {
            Ok(descriptor) => {
                messages.push(format!("Artifacts regenerated for {}", descriptor.class_name));
                Some(descriptor)
            }
            Err(e) => {
                warn!("Artifact generation for template {} failed: {}", template.id, e);
                errors.push(format!("artifact generation failed: {e}"));
                None
            }
        }
    }

    /// Registry failures are logged and never fail the operation.
    fn notify_registry(&self, type_id: &str, descriptor: Option<&BindingDescriptor>) {
        if let Err(e) = self.registry.invalidate(type_id) {
            warn!("Type registry invalidation of {} failed: {}", type_id, e);
        }
        if let Some(descriptor) = descriptor {
            if let Err(e) = self.registry.publish(descriptor) {
                warn!("Type registry publish of {} failed: {}", type_id, e);
            }
        }
    }

    // Template operations

    pub fn create_template(&self, values: &TemplateValues) -> TemplateOutcome {
        let mut outcome = TemplateOutcome::default();
        match self.try_create_template(values, &mut outcome) {
            Ok(()) => outcome.success = true,
            Err(e) => {
                error!("Creating template '{}' failed: {}", values.name, e);
                outcome.errors.push(e.to_string());
            }
        }
        outcome
    }

    fn try_create_template(&self, values: &TemplateValues, outcome: &mut TemplateOutcome) -> Result<()> {
        self.validator.validate_template(values, None)?;

        let mut event = LifecycleEvent {
            kind: EventKind::TemplateCreate,
            template_id: None,
            tenant_id: values.tenant_id.clone(),
            project_id: values.project_id.clone(),
            entity_name: values.name.clone(),
            field_name: None,
        };
        self.hooks.before(&event)?;

        let now = Utc::now();
        let mut template = EntityTemplate {
            id: 0,
            tenant_id: values.tenant_id.clone(),
            project_id: values.project_id.clone(),
            name: values.name.clone(),
            label: values.label.trim().to_string(),
            description: values.description.clone(),
            status: values.status.unwrap_or_default(),
            created: now,
            updated: now,
        };

        // The intent is written with the template row so that any failure
        // from here on leaves a pending intent for the reconciler.
        let (id, intent_id) = self.store.transaction(|tx| {
            template.id = insert_template_in(tx, &template)?;
            let intent_id = insert_intent_in(tx, &template, IntentOperation::CreateTemplate)?;
            Ok((template.id, intent_id))
        })?;
        outcome.template_id = Some(id);
        outcome
            .messages
            .push(format!("Template '{}' saved with id {id}", template.name));

        let table = self.table_name(&template);
        if self
            .migrator
            .create_table(&template.tenant_id, &template.project_id, id)?
        {
            outcome.messages.push(format!("Table {table} created"));
        } else {
            outcome
                .messages
                .push(format!("Table {table} already existed and was kept"));
        }

        let descriptor = self.regenerate(&template)?;
        outcome
            .messages
            .push(format!("Artifacts generated for {}", descriptor.class_name));

        self.store
            .set_intent_status(intent_id, IntentStatus::Complete, None)?;

        event.template_id = Some(id);
        self.hooks.after(&event);
        self.notify_registry(&descriptor.type_id, Some(&descriptor));

        info!("Created template {} ({})", descriptor.type_id, table);
        Ok(())
    }

    /// Updates label, description and status. Name, tenant and project are
    /// fixed at creation because the table name derives from them.
    pub fn update_template(&self, id: i64, values: &TemplateValues) -> TemplateOutcome {
        let mut outcome = TemplateOutcome {
            template_id: Some(id),
            ..Default::default()
        };
        match self.try_update_template(id, values, &mut outcome) {
            Ok(()) => outcome.success = true,
            Err(e) => {
                error!("Updating template {} failed: {}", id, e);
                outcome.errors.push(e.to_string());
            }
        }
        outcome
    }

    fn try_update_template(
        &self,
        id: i64,
        values: &TemplateValues,
        outcome: &mut TemplateOutcome,
    ) -> Result<()> {
        let existing = self.load_template(id)?;
        self.validator.validate_template(values, Some(id))?;

        let event = Self::event(EventKind::TemplateUpdate, &existing, None);
        self.hooks.before(&event)?;

        let template = EntityTemplate {
            label: values.label.trim().to_string(),
            description: values.description.clone(),
            status: values.status.unwrap_or(existing.status),
            updated: Utc::now(),
            ..existing
        };
        self.store.update_template(&template)?;
        outcome.messages.push(format!("Template '{}' updated", template.name));

        // Repairs a table lost to an earlier failed create; a no-op otherwise.
        if self
            .migrator
            .create_table(&template.tenant_id, &template.project_id, id)?
        {
            outcome
                .messages
                .push(format!("Table {} created", self.table_name(&template)));
        }

        let descriptor =
            self.regenerate_after_commit(&template, &mut outcome.messages, &mut outcome.errors);
        self.hooks.after(&event);
        self.notify_registry(&self.type_id(&template), descriptor.as_ref());
        Ok(())
    }

    /// Deletes a template with its fields, table, tracking rows and artifact
    /// files. `success` means the template row is gone; `errors` may still
    /// list leftovers that could not be removed.
    pub fn delete_template(&self, id: i64) -> DeleteOutcome {
        let mut outcome = DeleteOutcome::default();
        if let Err(e) = self.try_delete_template(id, &mut outcome) {
            error!("Deleting template {} failed: {}", id, e);
            outcome.errors.push(e.to_string());
        }
        outcome
    }

    fn try_delete_template(&self, id: i64, outcome: &mut DeleteOutcome) -> Result<()> {
        let template = self.load_template(id)?;

        let event = Self::event(EventKind::TemplateDelete, &template, None);
        self.hooks.before(&event)?;

        let report = self.cleanup.cleanup(id)?;
        outcome.cleaned_files = report.files_removed;
        outcome.cleaned_tables = report.tables_removed;
        outcome.cleaned_records = report.records_removed;
        outcome.errors = report.errors;
        outcome.success = self.store.get_template(id)?.is_none();

        if outcome.success {
            self.hooks.after(&event);
            self.notify_registry(&self.type_id(&template), None);
            info!("Deleted template {}", self.type_id(&template));
        }
        Ok(())
    }

    pub fn preview_cleanup(&self, id: i64) -> Result<CleanupPreview> {
        self.cleanup.preview(id)
    }

    pub fn describe(&self, id: i64) -> Result<BindingDescriptor> {
        let template = self.load_template(id)?;
        let fields = self.store.list_fields(id)?;
        Ok(BindingDescriptor::build(&self.ids, &template, &fields))
    }

    // Field operations

    pub fn create_field(&self, values: &FieldValues) -> FieldOutcome {
        let mut outcome = FieldOutcome::default();
        match self.try_create_field(values, &mut outcome) {
            Ok(()) => outcome.success = true,
            Err(e) => {
                error!("Creating field '{}' failed: {}", values.name, e);
                outcome.errors.push(e.to_string());
            }
        }
        outcome
    }

    fn try_create_field(&self, values: &FieldValues, outcome: &mut FieldOutcome) -> Result<()> {
        let template = self.load_template(values.template_id)?;
        let field_type = self.validator.validate_field(values, &template, None)?;

        let event = Self::event(EventKind::FieldCreate, &template, Some(&values.name));
        self.hooks.before(&event)?;

        let now = Utc::now();
        let mut field = FieldDefinition {
            id: 0,
            template_id: template.id,
            name: values.name.clone(),
            label: values.label.trim().to_string(),
            field_type,
            required: values.required,
            multiple: values.multiple,
            settings: values.settings.clone(),
            weight: values.weight,
            created: now,
            updated: now,
        };

        // Metadata row and column are committed together.
        let table = self.table_name(&template);
        let (id, added) = self.store.transaction(|tx| {
            let id = insert_field_in(tx, &field)?;
            let stored = FieldDefinition { id, ..field.clone() };
            let added = alter_in(tx, &table, &[], &stored, &AlterOperation::Add)?;
            Ok((id, added))
        })?;
        field.id = id;
        outcome.field_id = Some(id);
        outcome.messages.push(if added {
            format!("Column '{}' added to {table}", field.name)
        } else {
            format!("Column '{}' already present on {table}", field.name)
        });

        let descriptor =
            self.regenerate_after_commit(&template, &mut outcome.messages, &mut outcome.errors);
        self.hooks.after(&event);
        self.notify_registry(&self.type_id(&template), descriptor.as_ref());
        Ok(())
    }

    /// Updates a field in place. The field stays on its template;
    /// `values.template_id` is ignored.
    pub fn update_field(&self, field_id: i64, values: &FieldValues) -> FieldOutcome {
        let mut outcome = FieldOutcome {
            field_id: Some(field_id),
            ..Default::default()
        };
        match self.try_update_field(field_id, values, &mut outcome) {
            Ok(()) => outcome.success = true,
            Err(e) => {
                error!("Updating field {} failed: {}", field_id, e);
                outcome.errors.push(e.to_string());
            }
        }
        outcome
    }

    fn try_update_field(
        &self,
        field_id: i64,
        values: &FieldValues,
        outcome: &mut FieldOutcome,
    ) -> Result<()> {
        let previous = self.load_field(field_id)?;
        let template = self.load_template(previous.template_id)?;
        let field_type = self
            .validator
            .validate_field(values, &template, Some(field_id))?;

        let event = Self::event(EventKind::FieldUpdate, &template, Some(&previous.name));
        self.hooks.before(&event)?;

        let updated = FieldDefinition {
            name: values.name.clone(),
            label: values.label.trim().to_string(),
            field_type,
            required: values.required,
            multiple: values.multiple,
            settings: values.settings.clone(),
            weight: values.weight,
            updated: Utc::now(),
            ..previous.clone()
        };

        let table = self.table_name(&template);
        let op = AlterOperation::Update { previous };
        let changed = self.store.transaction(|tx| {
            update_field_in(tx, &updated)?;
            let fields = list_fields_in(tx, template.id)?;
            alter_in(tx, &table, &fields, &updated, &op)
        })?;
        outcome.messages.push(if changed {
            format!("Column '{}' changed on {table}", updated.name)
        } else {
            format!("Field '{}' updated without a column change", updated.name)
        });

        let descriptor =
            self.regenerate_after_commit(&template, &mut outcome.messages, &mut outcome.errors);
        self.hooks.after(&event);
        self.notify_registry(&self.type_id(&template), descriptor.as_ref());
        Ok(())
    }

    pub fn delete_field(&self, field_id: i64) -> FieldOutcome {
        let mut outcome = FieldOutcome {
            field_id: Some(field_id),
            ..Default::default()
        };
        match self.try_delete_field(field_id, &mut outcome) {
            Ok(()) => outcome.success = true,
            Err(e) => {
                error!("Deleting field {} failed: {}", field_id, e);
                outcome.errors.push(e.to_string());
            }
        }
        outcome
    }

    fn try_delete_field(&self, field_id: i64, outcome: &mut FieldOutcome) -> Result<()> {
        let field = self.load_field(field_id)?;
        let template = self.load_template(field.template_id)?;

        let event = Self::event(EventKind::FieldDelete, &template, Some(&field.name));
        self.hooks.before(&event)?;

        let table = self.table_name(&template);
        let dropped = self.store.transaction(|tx| {
            delete_field_in(tx, field_id)?;
            alter_in(tx, &table, &[], &field, &AlterOperation::Remove)
        })?;
        outcome.messages.push(if dropped {
            format!("Column '{}' dropped from {table}", field.name)
        } else {
            format!("Column '{}' was already absent from {table}", field.name)
        });

        let descriptor =
            self.regenerate_after_commit(&template, &mut outcome.messages, &mut outcome.errors);
        self.hooks.after(&event);
        self.notify_registry(&self.type_id(&template), descriptor.as_ref());
        Ok(())
    }
}
