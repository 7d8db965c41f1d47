use serde::Serialize;

/// Result of a template create or update.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TemplateOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_id: Option<i64>,
    pub messages: Vec<String>,
    pub errors: Vec<String>,
}

/// Result of a field create, update or delete.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FieldOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_id: Option<i64>,
    pub messages: Vec<String>,
    pub errors: Vec<String>,
}

/// Result of a template deletion. `success` means the template row is gone;
/// `errors` may still carry partial cleanup failures.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DeleteOutcome {
    pub success: bool,
    pub cleaned_files: Vec<String>,
    pub cleaned_tables: Vec<String>,
    pub cleaned_records: Vec<String>,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    pub files_removed: Vec<String>,
    pub tables_removed: Vec<String>,
    pub records_removed: Vec<String>,
    pub errors: Vec<String>,
}

impl CleanupReport {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordCount {
    pub source: String,
    pub count: i64,
}

/// Read-only enumeration of what a cleanup would remove.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanupPreview {
    pub field_count: usize,
    pub table_names: Vec<String>,
    pub file_paths: Vec<String>,
    pub record_counts: Vec<RecordCount>,
}
