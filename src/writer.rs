//! Spreadsheet output
//!
//! Rows go to a single sheet with a fixed header row. The format follows the
//! destination extension: `.xlsx` (default) or `.csv`.

use rust_xlsxwriter::Workbook;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;
use tracing::info;

use crate::error::{ExportError, Result};
use crate::models::{Row, COLUMNS};

/// Worksheet name used for xlsx output
pub const SHEET_NAME: &str = "sheet1";

/// Destination for exported rows
pub trait TabularSink {
    /// Write the header row followed by `rows`, in order.
    ///
    /// Never replaces an existing file.
    fn write(&self, path: &Path, columns: &[&str], rows: &[Row]) -> Result<()>;
}

/// Excel workbook writer
#[derive(Debug, Default, Clone, Copy)]
pub struct XlsxSink;

impl TabularSink for XlsxSink {
    fn write(&self, path: &Path, columns: &[&str], rows: &[Row]) -> Result<()> {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(SHEET_NAME)?;

        for (col, name) in columns.iter().enumerate() {
            worksheet.write_string(0, col as u16, *name)?;
        }

        for (i, row) in rows.iter().enumerate() {
            let line = (i + 1) as u32;
            for (col, cell) in row.cells().iter().enumerate() {
                worksheet.write_string(line, col as u16, *cell)?;
            }
        }

        let file = create_destination(path)?;
        workbook.save_to_writer(file)?;
        Ok(())
    }
}

/// Comma-separated values writer
#[derive(Debug, Default, Clone, Copy)]
pub struct CsvSink;

impl TabularSink for CsvSink {
    fn write(&self, path: &Path, columns: &[&str], rows: &[Row]) -> Result<()> {
        let mut writer = csv::Writer::from_writer(create_destination(path)?);
        writer.write_record(columns)?;
        for row in rows {
            writer.write_record(row.cells())?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// Open `path` for writing, failing if anything is already there
fn create_destination(path: &Path) -> Result<File> {
    OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|e| match e.kind() {
            io::ErrorKind::AlreadyExists => ExportError::OutputExists(path.to_path_buf()),
            _ => ExportError::IoError(e),
        })
}

/// Pick a sink from the destination extension
pub fn sink_for(path: &Path) -> Result<Box<dyn TabularSink>> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match extension.as_deref() {
        Some("xlsx") => Ok(Box::new(XlsxSink)),
        Some("csv") => Ok(Box::new(CsvSink)),
        other => Err(ExportError::SinkError(format!(
            "Unsupported output format {:?} for {:?}; use .xlsx or .csv",
            other.unwrap_or(""),
            path
        ))),
    }
}

/// Refuse to run when the destination is already there
pub fn ensure_absent(path: &Path) -> Result<()> {
    if path.exists() {
        return Err(ExportError::OutputExists(path.to_path_buf()));
    }
    Ok(())
}

/// Write `rows` to `path` with the standard column schema
pub fn write_rows(path: &Path, rows: &[Row]) -> Result<()> {
    let sink = sink_for(path)?;
    sink.write(path, &COLUMNS, rows)?;
    info!("Wrote {} rows to {:?}", rows.len(), path);
    Ok(())
}
