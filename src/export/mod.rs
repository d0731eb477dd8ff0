pub mod sla_report;

use rust_xlsxwriter::{
    ConditionalFormatCell, ConditionalFormatCellRule, Format, FormatBorder, Worksheet, XlsxError,
};

/// Blue header row, white bold text, thin border.
pub fn create_header_format() -> Format {
    Format::new()
        .set_bold()
        .set_background_color("2C5F8A")
        .set_font_color("FFFFFF")
        .set_font_size(11)
        .set_border(FormatBorder::Thin)
        .set_text_wrap()
}

pub fn create_number_format() -> Format {
    Format::new().set_num_format("#,##0.00")
}

pub fn create_integer_format() -> Format {
    Format::new().set_num_format("#,##0")
}

/// Expects fractions, 0.875 renders as 87.5%.
pub fn create_percent_format() -> Format {
    Format::new().set_num_format("0.0%")
}

/// Green when a rate column meets `target` (a fraction), red below it.
pub fn apply_rate_conditional_format(
    ws: &mut Worksheet,
    first_row: u32,
    col: u16,
    last_row: u32,
    target: f64,
) -> Result<(), XlsxError> {
    let green = Format::new()
        .set_background_color("C6EFCE")
        .set_font_color("006100");
    let red = Format::new()
        .set_background_color("FFC7CE")
        .set_font_color("9C0006");

    ws.add_conditional_format(
        first_row,
        col,
        last_row,
        col,
        &ConditionalFormatCell::new()
            .set_rule(ConditionalFormatCellRule::GreaterThanOrEqualTo(target))
            .set_format(&green),
    )?;
    ws.add_conditional_format(
        first_row,
        col,
        last_row,
        col,
        &ConditionalFormatCell::new()
            .set_rule(ConditionalFormatCellRule::LessThan(target))
            .set_format(&red),
    )?;

    Ok(())
}
