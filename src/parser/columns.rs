use std::collections::HashMap;

use crate::error::AppError;

/// Required columns: the import fails if any is absent.
pub const REQUIRED: &[&str] = &["id", "code", "name", "status", "created_at"];

/// Optional columns: absent means null, reported in the result.
pub const OPTIONAL: &[&str] = &["priority", "project_id", "category_id", "updated_at"];

/// Maps column names to their index in a CSV record.
pub struct ColumnMap {
    indices: HashMap<String, usize>,
}

impl ColumnMap {
    /// Header names are trimmed and lowercased.
    pub fn from_headers(headers: &csv::StringRecord) -> Self {
        let indices = headers
            .iter()
            .enumerate()
            .map(|(i, field)| (field.trim().to_lowercase(), i))
            .collect();
        ColumnMap { indices }
    }

    pub fn get<'a>(&self, record: &'a csv::StringRecord, col: &str) -> Option<&'a str> {
        self.indices.get(col).and_then(|&i| record.get(i))
    }

    pub fn has(&self, col: &str) -> bool {
        self.indices.contains_key(col)
    }
}

/// Returns the optional columns that are missing, or
/// `AppError::MissingColumns` if a required one is.
pub fn validate_columns(col_map: &ColumnMap) -> Result<Vec<String>, AppError> {
    let missing_required: Vec<String> = REQUIRED
        .iter()
        .filter(|&&c| !col_map.has(c))
        .map(|c| c.to_string())
        .collect();

    if !missing_required.is_empty() {
        return Err(AppError::MissingColumns(missing_required));
    }

    Ok(OPTIONAL
        .iter()
        .filter(|&&c| !col_map.has(c))
        .map(|c| c.to_string())
        .collect())
}
