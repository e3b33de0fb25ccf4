//! XLSX sink with auto-sized columns

use super::ReportError;
use rust_xlsxwriter::Workbook;

/// Excel's maximum column width
const MAX_WIDTH: usize = 255;

/// Width of each column: the longest value in it, header included, in characters
pub fn column_widths(lines: &[Vec<String>]) -> Vec<usize> {
    let columns = lines.iter().map(Vec::len).max().unwrap_or(0);
    (0..columns)
        .map(|col| {
            lines
                .iter()
                .filter_map(|line| line.get(col))
                .map(|value| value.chars().count())
                .max()
                .unwrap_or(0)
                .min(MAX_WIDTH)
        })
        .collect()
}

/// Write rows (header first) to a single-sheet workbook in memory
pub fn render(sheet_name: Option<&str>, lines: &[Vec<String>]) -> Result<Vec<u8>, ReportError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    if let Some(name) = sheet_name {
        worksheet.set_name(name)?;
    }

    for (row, line) in lines.iter().enumerate() {
        for (col, value) in line.iter().enumerate() {
            worksheet.write_string(row as u32, col as u16, value)?;
        }
    }

    for (col, width) in column_widths(lines).into_iter().enumerate() {
        worksheet.set_column_width(col as u16, width as f64)?;
    }

    Ok(workbook.save_to_buffer()?)
}
