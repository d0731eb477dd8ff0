use std::io::Read;
use std::time::Instant;

use crate::analyzer::sample::TicketSample;
use crate::error::AppError;
use crate::parser::columns::{validate_columns, ColumnMap};
use crate::parser::deserializers::{non_blank, parse_datetime, parse_opt_i64, parse_spaced_i64};
use crate::parser::types::{ParseWarning, TicketRaw};

const PROGRESS_EVERY: usize = 500;

/// Output of `parse_csv`: accepted tickets plus per-row diagnostics.
#[derive(Debug)]
pub struct ParseOutput {
    pub tickets: Vec<TicketSample>,
    pub warnings: Vec<ParseWarning>,
    pub total_rows_processed: usize,
    pub skipped_rows: usize,
    pub missing_optional_columns: Vec<String>,
    pub parse_duration_ms: u64,
}

/// Parse a ticket export from `path`.
pub fn parse_csv(path: &str, delimiter: u8) -> Result<ParseOutput, AppError> {
    let file = std::fs::File::open(path)?;
    parse_csv_reader(std::io::BufReader::new(file), delimiter)
}

/// Core parsing logic over any `Read` source.
pub fn parse_csv_reader<R: Read>(reader: R, delimiter: u8) -> Result<ParseOutput, AppError> {
    let start = Instant::now();

    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::Headers)
        .double_quote(true)
        .quoting(true)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    if headers.is_empty() {
        return Err(AppError::EmptyFile);
    }
    let col_map = ColumnMap::from_headers(&headers);
    let missing_optional_columns = validate_columns(&col_map)?;

    let mut tickets: Vec<TicketSample> = Vec::new();
    let mut warnings: Vec<ParseWarning> = Vec::new();
    let mut skipped = 0usize;
    let mut row_idx = 0usize;

    for result in rdr.records() {
        row_idx += 1;
        if row_idx % PROGRESS_EVERY == 0 {
            log::debug!("Parsed {} rows, {} accepted", row_idx, tickets.len());
        }

        // +1 for the header row
        let line = row_idx + 1;
        let outcome = result
            .map_err(|e| e.to_string())
            .and_then(|record| normalize_ticket(&record_to_raw(&col_map, &record)));
        match outcome {
            Ok(ticket) => tickets.push(ticket),
            Err(message) => {
                warnings.push(ParseWarning { line, message });
                skipped += 1;
            }
        }
    }

    if row_idx == 0 {
        return Err(AppError::EmptyFile);
    }
    if skipped > 0 {
        log::warn!("Skipped {} of {} CSV rows", skipped, row_idx);
    }

    Ok(ParseOutput {
        tickets,
        warnings,
        total_rows_processed: row_idx,
        skipped_rows: skipped,
        missing_optional_columns,
        parse_duration_ms: start.elapsed().as_millis() as u64,
    })
}

fn record_to_raw(col_map: &ColumnMap, record: &csv::StringRecord) -> TicketRaw {
    let cell = |col: &str| col_map.get(record, col).map(str::to_string);
    TicketRaw {
        id: cell("id"),
        code: cell("code"),
        name: cell("name"),
        priority: cell("priority"),
        status: cell("status"),
        project_id: cell("project_id"),
        category_id: cell("category_id"),
        created_at: cell("created_at"),
        updated_at: cell("updated_at"),
    }
}

fn normalize_ticket(raw: &TicketRaw) -> Result<TicketSample, String> {
    let id_str = raw.id.as_deref().unwrap_or("").trim();
    let id = parse_spaced_i64(id_str).ok_or_else(|| format!("invalid id: {:?}", id_str))?;

    let created_str = raw.created_at.as_deref().unwrap_or("");
    let created_at = parse_datetime(created_str)
        .ok_or_else(|| format!("invalid created_at: {:?}", created_str.trim()))?;

    let updated_at = match non_blank(raw.updated_at.as_deref()) {
        Some(s) => Some(parse_datetime(&s).ok_or_else(|| format!("invalid updated_at: {:?}", s))?),
        None => None,
    };

    let project_id = parse_opt_i64(raw.project_id.as_deref().unwrap_or(""))
        .map_err(|e| format!("project_id {}", e))?;
    let category_id = parse_opt_i64(raw.category_id.as_deref().unwrap_or(""))
        .map_err(|e| format!("category_id {}", e))?;

    Ok(TicketSample {
        id,
        code: raw.code.as_deref().unwrap_or("").trim().to_string(),
        name: raw.name.as_deref().unwrap_or("").trim().to_string(),
        priority: non_blank(raw.priority.as_deref()),
        status: non_blank(raw.status.as_deref()),
        created_at,
        updated_at,
        project_id,
        category_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::sample::fixtures::dt;

    const HDR: &str = "id,code,name,priority,status,project_id,category_id,created_at,updated_at";

    fn parse(csv: &str) -> ParseOutput {
        parse_csv_reader(csv.as_bytes(), b',').unwrap()
    }

    fn parse_err(csv: &str) -> AppError {
        parse_csv_reader(csv.as_bytes(), b',').unwrap_err()
    }

    #[test]
    fn test_full_row() {
        let csv = format!(
            "{HDR}\n1,T-1,Printer jam,P1,closed,10,100,2024-01-01 08:00:00,2024-01-01 10:30:00"
        );
        let out = parse(&csv);
        assert_eq!(out.tickets.len(), 1);
        let t = &out.tickets[0];
        assert_eq!(t.code, "T-1");
        assert_eq!(t.priority.as_deref(), Some("P1"));
        assert_eq!(t.project_id, Some(10));
        assert_eq!(t.category_id, Some(100));
        assert_eq!(t.created_at, dt("2024-01-01 08:00:00"));
        assert_eq!(t.updated_at, Some(dt("2024-01-01 10:30:00")));
        assert!(out.missing_optional_columns.is_empty());
    }

    #[test]
    fn test_blank_optionals_become_none() {
        let csv = format!("{HDR}\n2,T-2,VPN down,,,,,2024-01-01,");
        let out = parse(&csv);
        let t = &out.tickets[0];
        assert!(t.priority.is_none());
        assert!(t.status.is_none());
        assert!(t.project_id.is_none());
        assert!(t.updated_at.is_none());
        assert_eq!(t.created_at, dt("2024-01-01 00:00:00"));
    }

    #[test]
    fn test_semicolon_delimiter_and_missing_optional_columns() {
        let csv = "id;code;name;status;created_at\n5 732 943;T-9;Disk full;open;2024-02-01 09:00";
        let out = parse_csv_reader(csv.as_bytes(), b';').unwrap();
        assert_eq!(out.tickets[0].id, 5_732_943);
        assert_eq!(out.missing_optional_columns.len(), 4);
    }

    #[test]
    fn test_bom_utf8() {
        let csv = format!("\u{FEFF}{HDR}\n1,T-1,N,P2,open,,,2024-01-01 08:00:00,");
        let out = parse(&csv);
        assert_eq!(out.tickets.len(), 1);
    }

    #[test]
    fn test_malformed_lines_skip() {
        let csv = format!(
            "{HDR}\n\
             1,T-1,OK,P1,open,,,2024-01-01 08:00:00,\n\
             X,T-2,Bad id,P1,open,,,2024-01-01 08:00:00,\n\
             3,T-3,Bad date,P1,open,,,yesterday,\n\
             4,T-4,Bad project,P1,open,abc,,2024-01-01 08:00:00,\n\
             5,T-5,OK too,P1,done,,,2024-01-02 08:00:00,2024-01-03 08:00:00"
        );
        let out = parse(&csv);
        assert_eq!(out.tickets.len(), 2);
        assert_eq!(out.skipped_rows, 3);
        assert_eq!(out.total_rows_processed, 5);
        assert_eq!(out.warnings[0].line, 3);
        assert!(out.warnings[1].message.contains("created_at"));
    }

    #[test]
    fn test_missing_required_column_error() {
        match parse_err("name,status\nFoo,open") {
            AppError::MissingColumns(cols) => assert!(cols.contains(&"id".to_string())),
            e => panic!("Expected MissingColumns, got {:?}", e),
        }
    }

    #[test]
    fn test_header_only_is_empty() {
        assert!(matches!(parse_err(HDR), AppError::EmptyFile));
    }

    #[test]
    fn test_empty_file_error() {
        match parse_err("") {
            AppError::EmptyFile | AppError::MissingColumns(_) | AppError::Csv(_) => {}
            e => panic!("Expected EmptyFile or related error, got {:?}", e),
        }
    }
}
