pub const SCHEMA: &str = r#"
-- Entity templates: declarative schemas owned by a tenant project
CREATE TABLE IF NOT EXISTS entity_templates (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    tenant_id TEXT NOT NULL,
    project_id TEXT NOT NULL,
    name TEXT NOT NULL,            -- machine name, feeds the physical table name
    label TEXT NOT NULL,
    description TEXT,
    status INTEGER NOT NULL DEFAULT 1,  -- 1 = active, 0 = disabled
    created TEXT DEFAULT (datetime('now')),
    updated TEXT DEFAULT (datetime('now'))
);

-- Field definitions: one column each in the template's physical table.
-- No cascade: fields are removed explicitly before their template.
CREATE TABLE IF NOT EXISTS field_definitions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    template_id INTEGER NOT NULL REFERENCES entity_templates(id),
    name TEXT NOT NULL,
    label TEXT NOT NULL,
    type TEXT NOT NULL,
    required INTEGER NOT NULL DEFAULT 0,
    multiple INTEGER NOT NULL DEFAULT 0,
    settings TEXT NOT NULL DEFAULT '{}',  -- JSON
    weight INTEGER NOT NULL DEFAULT 0,
    created TEXT DEFAULT (datetime('now')),
    updated TEXT DEFAULT (datetime('now')),

    UNIQUE(template_id, name)
);

-- Generated binding artifact files, keyed by logical type id
CREATE TABLE IF NOT EXISTS artifact_paths (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    type_id TEXT NOT NULL,
    path TEXT NOT NULL,
    created TEXT DEFAULT (datetime('now')),

    UNIQUE(type_id, path)
);

-- Compensating-action log for the non-transactional create path
CREATE TABLE IF NOT EXISTS provision_intents (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    template_id INTEGER NOT NULL,  -- no FK: intent outlives a half-created template
    tenant_id TEXT NOT NULL,
    project_id TEXT NOT NULL,
    entity_name TEXT NOT NULL,
    operation TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'pending',
    detail TEXT,
    created TEXT DEFAULT (datetime('now')),
    updated TEXT DEFAULT (datetime('now'))
);

-- Create indexes
DROP INDEX IF EXISTS idx_templates_active_name;
CREATE UNIQUE INDEX IF NOT EXISTS idx_templates_name
    ON entity_templates(tenant_id, project_id, name);
CREATE INDEX IF NOT EXISTS idx_templates_scope ON entity_templates(tenant_id, project_id);
CREATE INDEX IF NOT EXISTS idx_fields_template ON field_definitions(template_id);
CREATE INDEX IF NOT EXISTS idx_artifacts_type ON artifact_paths(type_id);
CREATE INDEX IF NOT EXISTS idx_intents_status ON provision_intents(status);
"#;
