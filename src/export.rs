//! Optional export of the derived summary table as tab-delimited text, for
//! anyone who wants the numbers behind the chart without scraping HTML.

use csv::WriterBuilder;
use serde::Serialize;
use std::path::Path;

use crate::types::SummaryRow;

#[derive(Serialize)]
struct SummaryRecord<'a> {
    group: &'a str,
    gender: &'a str,
    mean_baseline: f64,
    mean_endline: f64,
    delta: f64,
    delta_display: &'a str,
    percentile_shift: &'a str,
}

/// Writes one TSV line per summary row, in the summary table's own order.
pub fn write_summary_tsv(rows: &[SummaryRow], path: &Path) -> Result<(), csv::Error> {
    let mut writer = WriterBuilder::new().delimiter(b'\t').from_path(path)?;
    for row in rows {
        writer.serialize(SummaryRecord {
            group: row.group.label(),
            gender: row.gender.label(),
            mean_baseline: row.mean_baseline,
            mean_endline: row.mean_endline,
            delta: row.delta,
            delta_display: &row.delta_display,
            percentile_shift: &row.percentile_shift,
        })?;
    }
    writer.flush()?;
    Ok(())
}
