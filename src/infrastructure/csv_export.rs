// Spreadsheet export of report tables as CSV
use crate::domain::metric::{MetricId, RenderMode};
use crate::domain::report::ReportTable;
use std::io::Write;
use thiserror::Error;

pub const NO_DATA_MESSAGE: &str = "No data available to export.";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("{}", NO_DATA_MESSAGE)]
    NoData,
    #[error("csv write failed: {0}")]
    Csv(#[from] csv::Error),
    #[error("export io failed: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone)]
pub struct ExportFile {
    pub file_name: String,
    pub content: Vec<u8>,
}

pub fn file_name(metric: MetricId, mode: RenderMode) -> String {
    format!("Report-{}-{}.csv", metric, mode)
}

/// Writes a title row, the header row, then one row per table row.
/// Refuses to write anything for an empty table.
pub fn write_report<W: Write>(
    table: &ReportTable,
    metric: MetricId,
    mode: RenderMode,
    writer: W,
) -> Result<(), ExportError> {
    if table.is_empty() {
        return Err(ExportError::NoData);
    }

    let mut csv = csv::WriterBuilder::new().flexible(true).from_writer(writer);
    csv.write_record([format!("Report - {} ({})", metric, mode)])?;
    csv.write_record(&table.headers)?;

    for row in &table.rows {
        let mut record = Vec::with_capacity(row.values.len() + 1);
        record.push(row.label.clone());
        record.extend(row.display_values().iter().map(|v| format!("{:.2}", v)));
        csv.write_record(&record)?;
    }

    csv.flush()?;
    Ok(())
}

pub fn export_report(
    table: &ReportTable,
    metric: MetricId,
    mode: RenderMode,
) -> Result<ExportFile, ExportError> {
    let mut content = Vec::new();
    write_report(table, metric, mode, &mut content)?;
    Ok(ExportFile {
        file_name: file_name(metric, mode),
        content,
    })
}
