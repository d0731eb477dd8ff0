use serde::Serialize;

/// One CSV record before validation; every cell as found.
#[derive(Debug, Clone, Default)]
pub struct TicketRaw {
    pub id: Option<String>,
    pub code: Option<String>,
    pub name: Option<String>,
    pub priority: Option<String>,
    pub status: Option<String>,
    pub project_id: Option<String>,
    pub category_id: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportResult {
    pub imported: usize,
    pub skipped_rows: usize,
    pub warnings: Vec<ParseWarning>,
    pub missing_optional_columns: Vec<String>,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParseWarning {
    pub line: usize,
    pub message: String,
}
