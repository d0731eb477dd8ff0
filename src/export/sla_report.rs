use crate::analyzer::AchievementReport;
use crate::error::AppError;
use crate::export::{
    apply_rate_conditional_format, create_header_format, create_integer_format,
    create_number_format, create_percent_format,
};
use rust_xlsxwriter::{Workbook, XlsxError};

/// Rate at or above which a trend bucket is shown green.
const RATE_TARGET: f64 = 0.9;

/// SLA achievement workbook, 4 sheets:
/// - "KPI"      : headline counters and the SLA targets in effect
/// - "Priority" : achieved/breached closed tickets per priority
/// - "Trend"    : per-bucket closures and achievement rate
/// - "Overdue"  : worst breaches, longest overrun first
pub fn generate_sla_report(report: &AchievementReport) -> Result<Vec<u8>, AppError> {
    let mut wb = Workbook::new();
    write_kpi(&mut wb, report)?;
    write_priority(&mut wb, report)?;
    write_trend(&mut wb, report)?;
    write_overdue(&mut wb, report)?;
    Ok(wb.save_to_buffer()?)
}

fn write_kpi(wb: &mut Workbook, report: &AchievementReport) -> Result<(), XlsxError> {
    let ws = wb.add_worksheet();
    ws.set_name("KPI")?;

    let hdr = create_header_format();
    let int = create_integer_format();
    let pct = create_percent_format();
    let k = &report.kpi;

    ws.write_with_format(0, 0, "Indicator", &hdr)?;
    ws.write_with_format(0, 1, "Value", &hdr)?;

    let counts: &[(&str, usize)] = &[
        ("Tickets", k.total),
        ("Closed", k.closed),
        ("Open", k.open),
        ("Closed within SLA", k.achieved_closed),
        ("Closed past SLA", k.breached_closed),
        ("Open within SLA", k.open_within_sla),
        ("Open past SLA", k.open_breach),
    ];
    for (i, (label, val)) in counts.iter().enumerate() {
        let row = (i + 1) as u32;
        ws.write(row, 0, *label)?;
        ws.write_with_format(row, 1, *val as f64, &int)?;
    }

    let mut row = counts.len() as u32 + 1;
    ws.write(row, 0, "Achievement rate (closed)")?;
    ws.write_with_format(row, 1, k.achieve_rate_closed / 100.0, &pct)?;
    row += 1;
    ws.write(row, 0, "Achievement rate (all, now)")?;
    ws.write_with_format(row, 1, k.achieve_rate_all_now / 100.0, &pct)?;

    row += 2;
    ws.write_with_format(row, 0, "Priority", &hdr)?;
    ws.write_with_format(row, 1, "Target (h)", &hdr)?;
    let h = &report.rules.by_priority_hours;
    let targets: &[(&str, u32)] = &[
        ("p1", h.p1),
        ("p2", h.p2),
        ("p3", h.p3),
        ("p4", h.p4),
        ("default", h.default_hours),
    ];
    for (i, (label, hours)) in targets.iter().enumerate() {
        let r = row + 1 + i as u32;
        ws.write(r, 0, *label)?;
        ws.write_with_format(r, 1, *hours as f64, &int)?;
    }

    ws.set_column_width(0, 28)?;
    ws.set_column_width(1, 14)?;

    Ok(())
}

fn write_priority(wb: &mut Workbook, report: &AchievementReport) -> Result<(), XlsxError> {
    let ws = wb.add_worksheet();
    ws.set_name("Priority")?;

    let hdr = create_header_format();
    let int = create_integer_format();

    let headers = ["Priority", "Achieved", "Breached"];
    for (col, h) in headers.iter().enumerate() {
        ws.write_with_format(0, col as u16, *h, &hdr)?;
    }

    let bar = &report.bar_by_priority;
    for (i, label) in bar.labels.iter().enumerate() {
        let row = (i + 1) as u32;
        ws.write(row, 0, label.as_str())?;
        ws.write_with_format(row, 1, bar.achieved[i] as f64, &int)?;
        ws.write_with_format(row, 2, bar.breached[i] as f64, &int)?;
    }

    ws.set_column_width(0, 16)?;
    ws.set_column_width(1, 12)?;
    ws.set_column_width(2, 12)?;

    Ok(())
}

fn write_trend(wb: &mut Workbook, report: &AchievementReport) -> Result<(), XlsxError> {
    let ws = wb.add_worksheet();
    ws.set_name("Trend")?;

    let hdr = create_header_format();
    let int = create_integer_format();
    let pct = create_percent_format();

    let headers = ["Period", "Closed within SLA", "Closed past SLA", "Rate"];
    for (col, h) in headers.iter().enumerate() {
        ws.write_with_format(0, col as u16, *h, &hdr)?;
    }

    let t = &report.trend;
    for (i, label) in t.labels.iter().enumerate() {
        let row = (i + 1) as u32;
        ws.write(row, 0, label.as_str())?;
        ws.write_with_format(row, 1, t.closed_achieved[i] as f64, &int)?;
        ws.write_with_format(row, 2, t.closed_breached[i] as f64, &int)?;
        ws.write_with_format(row, 3, t.rate[i] / 100.0, &pct)?;
    }

    if !t.labels.is_empty() {
        let last_row = t.labels.len() as u32;
        apply_rate_conditional_format(ws, 1, 3, last_row, RATE_TARGET)?;
        ws.set_freeze_panes(1, 0)?;
    }

    ws.set_column_width(0, 22)?;
    for col in 1u16..=3 {
        ws.set_column_width(col, 16)?;
    }

    Ok(())
}

fn write_overdue(wb: &mut Workbook, report: &AchievementReport) -> Result<(), XlsxError> {
    let ws = wb.add_worksheet();
    ws.set_name("Overdue")?;

    let hdr = create_header_format();
    let int = create_integer_format();
    let num = create_number_format();

    let headers = [
        "Code", "Name", "Priority", "Status", "Created", "Resolved", "Target (h)", "TAT (h)",
        "Overdue (h)",
    ];
    for (col, h) in headers.iter().enumerate() {
        ws.write_with_format(0, col as u16, *h, &hdr)?;
    }

    for (i, s) in report.samples.iter().enumerate() {
        let row = (i + 1) as u32;
        ws.write(row, 0, s.code.as_str())?;
        ws.write(row, 1, s.name.as_str())?;
        ws.write(row, 2, s.priority.as_str())?;
        ws.write(row, 3, s.status.as_str())?;
        ws.write(row, 4, s.created_at.as_str())?;
        ws.write(row, 5, s.resolved_at.as_str())?;
        ws.write_with_format(row, 6, s.target_h as f64, &int)?;
        ws.write_with_format(row, 7, s.tat_h, &num)?;
        ws.write_with_format(row, 8, s.overdue_h, &num)?;
    }

    if !report.samples.is_empty() {
        let last_row = report.samples.len() as u32;
        ws.set_freeze_panes(1, 0)?;
        ws.autofilter(0, 0, last_row, (headers.len() - 1) as u16)?;
    }

    ws.set_column_width(0, 14)?;
    ws.set_column_width(1, 36)?;
    for col in 2u16..=5 {
        ws.set_column_width(col, 18)?;
    }
    for col in 6u16..=8 {
        ws.set_column_width(col, 12)?;
    }

    Ok(())
}
