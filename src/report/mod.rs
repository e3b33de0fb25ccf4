//! Report projection: one row rule, three sinks
//!
//! Every artifact is rendered from the same [`Projection`], so the markdown,
//! CSV and spreadsheet outputs can only differ in escaping. Rows keep
//! registry order.

pub mod delimited;
pub mod markdown;
pub mod spreadsheet;

use crate::models::{Registry, VersionRecord};
use std::borrow::Cow;
use std::path::{Path, PathBuf};

pub const COLUMNS: usize = 8;

/// Fixed header row shared by every artifact
pub const HEADER: [&str; COLUMNS] = [
    "Fornitore",
    "Applicativo",
    "Versione",
    "Versioni Equivalenti",
    "Tipo Documento",
    "Servizio",
    "Data validazione",
    "Versione Gateway",
];

/// Separator between equivalent versions inside one cell
pub const RELEASE_SEPARATOR: &str = ", ";
/// Separator between enumeration tags inside one cell
pub const TAG_SEPARATOR: &str = ",";

/// One report cell: a plain value or a list joined with a fixed separator.
///
/// List items are escaped one by one before joining, so a sink's escaping
/// applies to values and never to the separator itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cell {
    Text(String),
    Joined {
        items: Vec<String>,
        separator: &'static str,
    },
}

impl Cell {
    pub fn render_with<F>(&self, escape: F) -> String
    where
        F: Fn(&str) -> Cow<'_, str>,
    {
        match self {
            Cell::Text(value) => escape(value.as_str()).into_owned(),
            Cell::Joined { items, separator } => items
                .iter()
                .map(|item| escape(item.as_str()))
                .collect::<Vec<_>>()
                .join(*separator),
        }
    }

    pub fn plain(&self) -> String {
        self.render_with(|s| Cow::Borrowed(s))
    }
}

/// One projected row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRow {
    cells: [Cell; COLUMNS],
}

impl ReportRow {
    /// The single row-construction rule for a registry entry
    pub fn from_record(record: &VersionRecord) -> Self {
        let joined = |items: &[String], separator| Cell::Joined {
            items: items.to_vec(),
            separator,
        };

        Self {
            cells: [
                Cell::Text(record.vendor.clone()),
                Cell::Text(record.application_id.clone()),
                Cell::Text(record.version.clone()),
                joined(&record.equiv_releases, RELEASE_SEPARATOR),
                joined(&record.doc_type, TAG_SEPARATOR),
                joined(&record.service, TAG_SEPARATOR),
                Cell::Text(record.date.format("%Y-%m-%d").to_string()),
                Cell::Text(record.gtw_version.clone()),
            ],
        }
    }

    pub fn header() -> Self {
        Self {
            cells: HEADER.map(|h| Cell::Text(h.to_string())),
        }
    }

    pub fn cells(&self) -> &[Cell; COLUMNS] {
        &self.cells
    }

    pub fn render_with<F>(&self, escape: F) -> Vec<String>
    where
        F: Fn(&str) -> Cow<'_, str>,
    {
        self.cells.iter().map(|c| c.render_with(&escape)).collect()
    }

    /// Unescaped values, for sinks that quote natively
    pub fn plain(&self) -> Vec<String> {
        self.cells.iter().map(Cell::plain).collect()
    }
}

/// A registry projected into rows, header first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Projection {
    pub header: ReportRow,
    pub rows: Vec<ReportRow>,
}

impl Projection {
    /// Header followed by data rows, unescaped
    pub fn plain_lines(&self) -> Vec<Vec<String>> {
        std::iter::once(&self.header)
            .chain(self.rows.iter())
            .map(ReportRow::plain)
            .collect()
    }
}

/// Project a validated registry, preserving its order
pub fn project(registry: &Registry) -> Projection {
    Projection {
        header: ReportRow::header(),
        rows: registry.iter().map(ReportRow::from_record).collect(),
    }
}

/// Failure rendering or writing an artifact
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("Template rendering failed: {0}")]
    Template(#[from] handlebars::RenderError),

    #[error("CSV output failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("Spreadsheet output failed: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Output locations of the three artifacts
#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    pub markdown: PathBuf,
    pub csv: PathBuf,
    pub xlsx: PathBuf,
}

/// All three artifacts rendered in memory
#[derive(Debug, Clone)]
pub struct Artifacts {
    pub markdown: String,
    pub csv: Vec<u8>,
    pub xlsx: Vec<u8>,
}

impl Artifacts {
    /// Render every artifact; nothing is written yet
    pub fn render(projection: &Projection, template: &str) -> Result<Self, ReportError> {
        Ok(Self {
            markdown: markdown::render(projection, template)?,
            csv: delimited::render(&projection.plain_lines())?,
            xlsx: spreadsheet::render(None, &projection.plain_lines())?,
        })
    }

    /// Write every artifact, creating parent directories
    pub fn write(&self, paths: &ArtifactPaths) -> Result<(), ReportError> {
        write_file(&paths.markdown, self.markdown.as_bytes())?;
        write_file(&paths.csv, &self.csv)?;
        write_file(&paths.xlsx, &self.xlsx)?;
        Ok(())
    }
}

pub(crate) fn write_file(path: &Path, content: &[u8]) -> Result<(), ReportError> {
    let to_error = |source| ReportError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(to_error)?;
    }
    std::fs::write(path, content).map_err(to_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record(vendor: &str) -> VersionRecord {
        VersionRecord {
            vendor: vendor.to_string(),
            equiv_names: Vec::new(),
            application_id: "A1".to_string(),
            version: "2.0".to_string(),
            equiv_releases: vec!["2.0.1".to_string(), "2.0.2".to_string()],
            doc_type: vec!["LAB".to_string(), "RAD".to_string()],
            service: vec!["VALIDATION".to_string()],
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            gtw_version: "1.0".to_string(),
        }
    }

    #[test]
    fn test_row_rule() {
        let row = ReportRow::from_record(&record("Acme"));
        assert_eq!(
            row.plain(),
            vec!["Acme", "A1", "2.0", "2.0.1, 2.0.2", "LAB,RAD", "VALIDATION", "2024-01-01", "1.0"]
        );
    }

    #[test]
    fn test_escape_applies_to_items_not_separator() {
        let mut r = record("Acme");
        r.equiv_releases = vec!["a|b".to_string(), "c".to_string()];
        let row = ReportRow::from_record(&r);
        let rendered = row.render_with(|s| Cow::Owned(s.replace('|', "#")));
        assert_eq!(rendered[3], "a#b, c");
    }

    #[test]
    fn test_projection_keeps_order() {
        let registry = Registry::new(vec![record("Zeta"), record("Alpha"), record("Mid")]);
        let projection = project(&registry);
        let vendors: Vec<String> = projection.rows.iter().map(|r| r.plain()[0].clone()).collect();
        assert_eq!(vendors, vec!["Zeta", "Alpha", "Mid"]);
        assert_eq!(projection.plain_lines()[0][0], "Fornitore");
        assert_eq!(projection.plain_lines().len(), 4);
    }

    #[test]
    fn test_empty_list_renders_empty_cell() {
        let mut r = record("Acme");
        r.equiv_releases.clear();
        assert_eq!(ReportRow::from_record(&r).plain()[3], "");
    }
}
