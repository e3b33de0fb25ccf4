//! Markdown table embedded in a handlebars template

use super::{Projection, ReportError, ReportRow, COLUMNS};
use handlebars::Handlebars;
use serde_json::json;
use std::borrow::Cow;

/// Used when no template file is configured or present
pub const DEFAULT_TEMPLATE: &str = "\
# Versioni validate

{{table}}
";

/// Escape a value so it cannot terminate a table cell.
///
/// Backslashes are doubled before pipes are escaped, so a value ending in
/// `\` cannot swallow the column delimiter that follows it.
pub fn escape_cell(value: &str) -> Cow<'_, str> {
    if value.contains(['|', '\\', '\n', '\r']) {
        Cow::Owned(
            value
                .replace('\\', r"\\")
                .replace('|', r"\|")
                .replace("\r\n", " ")
                .replace(['\n', '\r'], " "),
        )
    } else {
        Cow::Borrowed(value)
    }
}

/// `|a|b|...|` with every value escaped
pub fn table_line(row: &ReportRow) -> String {
    format!("|{}|", row.render_with(escape_cell).join("|"))
}

/// Header line, alignment line, then one line per record
pub fn table_lines(projection: &Projection) -> Vec<String> {
    let mut lines = Vec::with_capacity(projection.rows.len() + 2);
    lines.push(table_line(&projection.header));
    lines.push(format!("|{}|", vec!["---"; COLUMNS].join("|")));
    lines.extend(projection.rows.iter().map(table_line));
    lines
}

/// Render the report document.
///
/// The template sees `table` (the whole table), `header`, `md_table_lines`
/// (data rows only) and `record_count`. Output is not HTML-escaped.
pub fn render(projection: &Projection, template: &str) -> Result<String, ReportError> {
    let mut handlebars = Handlebars::new();
    handlebars.register_escape_fn(handlebars::no_escape);

    let lines = table_lines(projection);
    let data = json!({
        "table": lines.join("\n"),
        "header": lines[..2].join("\n"),
        "md_table_lines": lines[2..],
        "record_count": projection.rows.len(),
    });

    Ok(handlebars.render_template(template, &data)?)
}

/// Split a rendered table line on unescaped pipes
pub fn split_cells(line: &str) -> Vec<String> {
    let inner = line
        .strip_prefix('|')
        .and_then(|l| l.strip_suffix('|'))
        .unwrap_or(line);

    let mut cells = Vec::new();
    let mut current = String::new();
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if let Some(escaped) = chars.next() {
                    current.push(escaped);
                }
            }
            '|' => cells.push(std::mem::take(&mut current)),
            other => current.push(other),
        }
    }
    cells.push(current);
    cells
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Registry, VersionRecord};
    use crate::report::project;
    use chrono::NaiveDate;

    fn registry(application_id: &str) -> Registry {
        Registry::new(vec![VersionRecord {
            vendor: "Acme".to_string(),
            equiv_names: Vec::new(),
            application_id: application_id.to_string(),
            version: "2.0".to_string(),
            equiv_releases: vec!["2.0.1".to_string()],
            doc_type: vec!["LAB".to_string()],
            service: vec!["VALIDATION".to_string()],
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            gtw_version: "1.0".to_string(),
        }])
    }

    #[test]
    fn test_pipe_is_escaped() {
        let projection = project(&registry("A|1"));
        let line = table_line(&projection.rows[0]);
        assert!(line.contains(r"A\|1"));

        let cells = split_cells(&line);
        assert_eq!(cells.len(), COLUMNS);
        assert_eq!(cells[1], "A|1");
    }

    #[test]
    fn test_trailing_backslash_keeps_delimiter() {
        let projection = project(&registry("A1\\"));
        let line = table_line(&projection.rows[0]);
        assert!(line.starts_with(r"|Acme|A1\\|2.0|"));

        let cells = split_cells(&line);
        assert_eq!(cells.len(), COLUMNS);
        assert_eq!(cells[1], "A1\\");
        assert_eq!(cells[2], "2.0");
    }

    #[test]
    fn test_backslash_before_pipe_round_trips() {
        assert_eq!(escape_cell(r"a\|b"), r"a\\\|b");
        let cells = split_cells(&format!("|{}|x|", escape_cell(r"a\|b")));
        assert_eq!(cells, vec![r"a\|b".to_string(), "x".to_string()]);
    }

    #[test]
    fn test_newline_does_not_break_row() {
        assert_eq!(escape_cell("a\nb"), "a b");
        assert_eq!(escape_cell("plain"), "plain");
    }

    #[test]
    fn test_table_shape() {
        let lines = table_lines(&project(&registry("A1")));
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("|Fornitore|Applicativo|"));
        assert_eq!(lines[1], "|---|---|---|---|---|---|---|---|");
        assert_eq!(lines[2], "|Acme|A1|2.0|2.0.1|LAB|VALIDATION|2024-01-01|1.0|");
    }

    #[test]
    fn test_default_template() {
        let output = render(&project(&registry("A1")), DEFAULT_TEMPLATE).unwrap();
        assert!(output.starts_with("# Versioni validate\n"));
        assert!(output.contains("|Acme|A1|2.0|"));
    }

    #[test]
    fn test_custom_template_iterates_lines() {
        let template = "{{record_count}} record(s)\n{{header}}\n{{#each md_table_lines}}{{this}}\n{{/each}}";
        let output = render(&project(&registry("A<1>")), template).unwrap();
        assert!(output.starts_with("1 record(s)\n|Fornitore|"));
        // No HTML escaping
        assert!(output.contains("|A<1>|"));
    }
}
