//! Presentation and export of batch results.
//!
//! Two outputs: a Markdown table per file for display, and one flat
//! [`ExportTable`] for the whole batch that serialises to CSV or XLSX.

use crate::error::{DocumentError, ExtractError};
use crate::output::{BatchReport, ExtractionResult};
use crate::schema::field_label;
use rust_xlsxwriter::{Format, Workbook};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Column holding the source filename; always first.
pub const FILENAME_COLUMN: &str = "filename";

/// Column holding the failure text; present only when a document failed.
pub const ERROR_COLUMN: &str = "error";

/// Worksheet name used by the XLSX export.
pub const XLSX_SHEET_NAME: &str = "Parameters";

/// Display form of one file's result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedTable {
    pub filename: String,
    pub success: bool,
    pub body: String,
}

/// `Error (<Kind>): <message>`.
pub fn render_error(error: &DocumentError) -> String {
    format!("Error ({}): {}", error.kind(), error)
}

/// Markdown for one result: a two-column parameter table, or the error line.
pub fn render_result(result: &ExtractionResult) -> String {
    match result {
        ExtractionResult::Failure { error, .. } => render_error(error),
        ExtractionResult::Success { parameters, .. } => {
            let mut out = String::from("| Parameter | Value |\n|---|---|\n");
            for (name, value) in parameters.iter() {
                out.push_str(&format!(
                    "| {} | {} |\n",
                    escape_cell(&field_label(name)),
                    escape_cell(value)
                ));
            }
            out
        }
    }
}

/// One table per file, in upload order.
pub fn render_report(report: &BatchReport) -> Vec<RenderedTable> {
    report
        .results
        .iter()
        .map(|r| RenderedTable {
            filename: r.filename().to_string(),
            success: r.is_success(),
            body: render_result(r),
        })
        .collect()
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace(['\r', '\n'], " ")
}

/// Flat table: one row per document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ExportTable {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cell at (`row`, `column`) by column name.
    pub fn cell(&self, row: usize, column: &str) -> Option<&str> {
        let col = self.columns.iter().position(|c| c == column)?;
        self.rows.get(row)?.get(col).map(String::as_str)
    }

    /// CSV text with a header row, even when there are no rows.
    pub fn to_csv(&self) -> Result<String, ExtractError> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(&self.columns)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| ExtractError::Internal(format!("CSV flush failed: {}", e.error())))?;
        String::from_utf8(bytes)
            .map_err(|e| ExtractError::Internal(format!("CSV output is not UTF-8: {e}")))
    }

    /// XLSX workbook bytes: one `Parameters` sheet, bold header row, same
    /// columns and rows as [`to_csv`](Self::to_csv).
    pub fn to_xlsx(&self) -> Result<Vec<u8>, ExtractError> {
        let mut workbook = Workbook::new();
        let header = Format::new().set_bold();
        let sheet = workbook.add_worksheet();
        sheet.set_name(XLSX_SHEET_NAME)?;

        for (col, name) in self.columns.iter().enumerate() {
            sheet.write_string_with_format(0, xlsx_col(col)?, name, &header)?;
        }
        for (r, row) in self.rows.iter().enumerate() {
            let xl_row = u32::try_from(r + 1)
                .map_err(|_| ExtractError::Internal(format!("too many rows for XLSX: {}", r + 1)))?;
            for (col, value) in row.iter().enumerate() {
                if !value.is_empty() {
                    sheet.write_string(xl_row, xlsx_col(col)?, value)?;
                }
            }
        }

        Ok(workbook.save_to_buffer()?)
    }

    /// Write the CSV atomically: a temp file in the target directory, then rename.
    pub fn write_csv(&self, path: impl AsRef<Path>) -> Result<(), ExtractError> {
        let path = path.as_ref();
        write_atomic(path, self.to_csv()?.as_bytes())?;
        info!(
            "Wrote {} row(s) × {} column(s) → {}",
            self.rows.len(),
            self.columns.len(),
            path.display()
        );
        Ok(())
    }

    /// Write an XLSX workbook atomically.
    pub fn write_xlsx(&self, path: impl AsRef<Path>) -> Result<(), ExtractError> {
        let path = path.as_ref();
        write_atomic(path, &self.to_xlsx()?)?;
        info!(
            "Wrote {} row(s) × {} column(s) → {}",
            self.rows.len(),
            self.columns.len(),
            path.display()
        );
        Ok(())
    }

    /// Pick the format from the extension: `.xlsx` → workbook, anything else → CSV.
    pub fn write(&self, path: impl AsRef<Path>) -> Result<(), ExtractError> {
        let path = path.as_ref();
        match ExportFormat::from_path(path) {
            ExportFormat::Xlsx => self.write_xlsx(path),
            ExportFormat::Csv => self.write_csv(path),
        }
    }
}

/// On-disk export format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Xlsx,
}

impl ExportFormat {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().map(|e| e.to_string_lossy().to_lowercase()) {
            Some(ext) if ext == "xlsx" => ExportFormat::Xlsx,
            _ => ExportFormat::Csv,
        }
    }
}

fn xlsx_col(index: usize) -> Result<u16, ExtractError> {
    u16::try_from(index)
        .map_err(|_| ExtractError::Internal(format!("too many columns for XLSX: {index}")))
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), ExtractError> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let write_err = |source: std::io::Error| ExtractError::ExportWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(write_err)?;
    tmp.write_all(bytes).map_err(write_err)?;
    tmp.flush().map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;
    Ok(())
}

/// Build the batch export table.
///
/// Columns are `filename`, then every field name in first-seen order, then
/// `error` if at least one document failed. Failure rows leave parameter
/// cells empty.
pub fn export_table(report: &BatchReport) -> ExportTable {
    let mut columns = vec![FILENAME_COLUMN.to_string()];
    for params in report.results.iter().filter_map(ExtractionResult::parameters) {
        for name in params.field_names() {
            if !columns.iter().any(|c| c == name) {
                columns.push(name.to_string());
            }
        }
    }
    let has_failures = report.results.iter().any(|r| !r.is_success());
    if has_failures {
        columns.push(ERROR_COLUMN.to_string());
    }

    let rows = report
        .results
        .iter()
        .map(|result| {
            columns
                .iter()
                .enumerate()
                .map(|(i, column)| {
                    if i == 0 {
                        return result.filename().to_string();
                    }
                    match result {
                        ExtractionResult::Success { parameters, .. } => {
                            parameters.get(column).unwrap_or_default().to_string()
                        }
                        ExtractionResult::Failure { error, .. } => {
                            if has_failures && i == columns.len() - 1 {
                                render_error(error)
                            } else {
                                String::new()
                            }
                        }
                    }
                })
                .collect()
        })
        .collect::<Vec<Vec<String>>>();

    debug!("Export table: {} column(s), {} row(s)", columns.len(), rows.len());
    ExportTable { columns, rows }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::{BatchStats, ParameterRecord};

    fn success(name: &str, values: &[(&str, &str)]) -> ExtractionResult {
        ExtractionResult::success(
            name,
            ParameterRecord::new(
                values
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
                Vec::new(),
            ),
        )
    }

    fn report(results: Vec<ExtractionResult>) -> BatchReport {
        BatchReport {
            results,
            stats: BatchStats::default(),
        }
    }

    #[test]
    fn success_renders_parameter_table() {
        let md = render_result(&success(
            "a.pdf",
            &[("bore_diameter", "160 mm"), ("rod_end", "Ø60 | M36")],
        ));
        assert_eq!(
            md,
            "| Parameter | Value |\n|---|---|\n| Bore Diameter | 160 mm |\n| Rod End | Ø60 \\| M36 |\n"
        );
    }

    #[test]
    fn failure_renders_kind_and_message() {
        let r = ExtractionResult::failure(
            "notes.txt",
            DocumentError::UnsupportedFormat {
                extension: "txt".into(),
            },
        );
        let text = render_result(&r);
        assert!(text.starts_with("Error (UnsupportedFormat): "), "{text}");
        assert!(text.contains(".txt"));
    }

    #[test]
    fn report_renders_one_table_per_file_in_order() {
        let tables = render_report(&report(vec![
            success("a.pdf", &[("fluid", "AIR")]),
            ExtractionResult::failure("b.pdf", DocumentError::render("PDF has no pages")),
        ]));
        let names: Vec<_> = tables.iter().map(|t| t.filename.as_str()).collect();
        assert_eq!(names, vec!["a.pdf", "b.pdf"]);
        assert!(tables[0].success);
        assert!(!tables[1].success);
    }

    #[test]
    fn export_columns_union_in_first_seen_order() {
        let table = export_table(&report(vec![
            success("a.pdf", &[("fluid", "AIR"), ("mounting", "TRUNNION")]),
            success("b.pdf", &[("mounting", "FLANGE"), ("standard", "ISO 6020")]),
        ]));
        assert_eq!(table.columns, vec!["filename", "fluid", "mounting", "standard"]);
        assert_eq!(table.cell(1, "fluid"), Some(""));
        assert_eq!(table.cell(1, "standard"), Some("ISO 6020"));
    }

    #[test]
    fn failures_add_error_column() {
        let table = export_table(&report(vec![
            success("a.pdf", &[("fluid", "AIR")]),
            ExtractionResult::failure("b.txt", DocumentError::UnsupportedFormat {
                extension: "txt".into(),
            }),
        ]));
        assert_eq!(table.columns, vec!["filename", "fluid", "error"]);
        assert_eq!(table.cell(0, "error"), Some(""));
        assert_eq!(table.cell(1, "fluid"), Some(""));
        assert!(table.cell(1, "error").unwrap().starts_with("Error (UnsupportedFormat)"));
    }

    #[test]
    fn empty_report_exports_header_only() {
        let table = export_table(&BatchReport::default());
        assert!(table.is_empty());
        assert_eq!(table.to_csv().unwrap(), "filename\n");
    }

    #[test]
    fn csv_quotes_embedded_commas() {
        let table = export_table(&report(vec![success(
            "a.pdf",
            &[("special_features", "cushioning, position sensor")],
        )]));
        assert_eq!(
            table.to_csv().unwrap(),
            "filename,special_features\na.pdf,\"cushioning, position sensor\"\n"
        );
    }

    #[test]
    fn write_csv_replaces_target_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        std::fs::write(&path, "stale").unwrap();

        let table = export_table(&report(vec![success("a.pdf", &[("fluid", "AIR")])]));
        table.write_csv(&path).unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "filename,fluid\na.pdf,AIR\n");
        let leftovers = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 1, "temp file must not be left behind");
    }

    fn xlsx_rows(bytes: Vec<u8>) -> Vec<Vec<String>> {
        use calamine::{DataType, Reader, Xlsx};

        let mut workbook = Xlsx::new(std::io::Cursor::new(bytes)).unwrap();
        let range = workbook
            .worksheet_range(XLSX_SHEET_NAME)
            .expect("sheet present")
            .unwrap();
        range
            .rows()
            .map(|row| {
                row.iter()
                    .map(|cell| match cell {
                        DataType::String(s) => s.clone(),
                        DataType::Empty => String::new(),
                        other => panic!("unexpected cell {other:?}"),
                    })
                    .collect()
            })
            .collect()
    }

    #[test]
    fn xlsx_has_same_cells_as_csv() {
        let table = export_table(&report(vec![
            success("a.pdf", &[("fluid", "AIR"), ("mounting", "FLANGE, FRONT")]),
            ExtractionResult::failure("b.txt", DocumentError::UnsupportedFormat {
                extension: "txt".into(),
            }),
        ]));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.XLSX");
        table.write(&path).unwrap();

        let rows = xlsx_rows(std::fs::read(&path).unwrap());
        assert_eq!(rows[0], table.columns);
        assert_eq!(&rows[1..], table.rows.as_slice());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn empty_report_xlsx_has_header_only() {
        let bytes = export_table(&BatchReport::default()).to_xlsx().unwrap();
        assert_eq!(xlsx_rows(bytes), vec![vec!["filename".to_string()]]);
    }

    #[test]
    fn export_format_follows_extension() {
        assert_eq!(ExportFormat::from_path(Path::new("x.xlsx")), ExportFormat::Xlsx);
        assert_eq!(ExportFormat::from_path(Path::new("x.Xlsx")), ExportFormat::Xlsx);
        assert_eq!(ExportFormat::from_path(Path::new("x.csv")), ExportFormat::Csv);
        assert_eq!(ExportFormat::from_path(Path::new("params")), ExportFormat::Csv);
    }

    #[test]
    fn write_csv_into_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope").join("out.csv");
        let err = export_table(&BatchReport::default())
            .write_csv(&path)
            .unwrap_err();
        assert!(matches!(err, ExtractError::ExportWriteFailed { .. }));
    }
}
