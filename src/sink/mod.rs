//! Result table, materialized once after the run

use std::io::{self, Write};

use crate::pipeline::MetricRecord;

pub const BASE_COLUMNS: [&str; 3] = ["frame_num", "timestamp_ms", "delta_timestamp_ms"];
pub const MSE_COLUMNS: [&str; 6] = [
    "log10_msey",
    "psnr_y",
    "diff_msey",
    "diff_msey_delta_timestamp_ms",
    "diff_mseu",
    "diff_msev",
];

/// Column-keyed, order-preserving table with one row per record.
///
/// The column set is chosen at construction and never changes.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricTable {
    columns: Vec<&'static str>,
    rows: Vec<Vec<Option<f64>>>,
}

impl MetricTable {
    pub fn columns_for(add_mse: bool) -> Vec<&'static str> {
        let mut columns = BASE_COLUMNS.to_vec();
        if add_mse {
            columns.extend_from_slice(&MSE_COLUMNS);
        }
        columns
    }

    pub fn from_records(add_mse: bool, records: &[MetricRecord]) -> Self {
        let columns = Self::columns_for(add_mse);
        let rows = records
            .iter()
            .map(|record| {
                let mut row = Vec::with_capacity(columns.len());
                row.push(Some(record.frame_num as f64));
                row.push(Some(record.timestamp_ms));
                row.push(record.delta_timestamp_ms);
                if add_mse {
                    let mse = record.mse.unwrap_or_default();
                    row.extend([
                        mse.log10_msey,
                        mse.psnr_y,
                        mse.diff_msey,
                        mse.diff_msey_delta_timestamp_ms,
                        mse.diff_mseu,
                        mse.diff_msev,
                    ]);
                }
                row
            })
            .collect();

        Self { columns, rows }
    }

    pub fn columns(&self) -> &[&'static str] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column(&self, name: &str) -> Option<Vec<Option<f64>>> {
        let index = self.columns.iter().position(|c| *c == name)?;
        Some(self.rows.iter().map(|row| row[index]).collect())
    }

    /// CSV with a header row. Undefined cells are empty, infinities are `inf`/`-inf`.
    pub fn write_csv<W: Write>(&self, mut writer: W) -> io::Result<()> {
        writeln!(writer, "{}", self.columns.join(","))?;
        for row in &self.rows {
            let cells: Vec<String> = row
                .iter()
                .zip(&self.columns)
                .map(|(value, column)| format_cell(*value, *column == "frame_num"))
                .collect();
            writeln!(writer, "{}", cells.join(","))?;
        }
        writer.flush()
    }
}

fn format_cell(value: Option<f64>, integer: bool) -> String {
    match value {
        None => String::new(),
        Some(v) if v.is_nan() => String::new(),
        Some(v) if v == f64::INFINITY => "inf".to_string(),
        Some(v) if v == f64::NEG_INFINITY => "-inf".to_string(),
        Some(v) if integer => format!("{}", v as u64),
        Some(v) => format!("{}", v),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::MseMetrics;

    fn record(frame_num: u64, mse: Option<MseMetrics>) -> MetricRecord {
        MetricRecord {
            frame_num,
            timestamp_ms: frame_num as f64 * 33.5,
            delta_timestamp_ms: (frame_num > 0).then_some(33.5),
            mse,
        }
    }

    #[test]
    fn column_set_follows_mse_flag() {
        assert_eq!(MetricTable::columns_for(false), BASE_COLUMNS.to_vec());
        let columns = MetricTable::columns_for(true);
        assert_eq!(columns.len(), 9);
        assert_eq!(columns[3], "log10_msey");
        assert_eq!(columns[8], "diff_msev");
    }

    #[test]
    fn csv_formatting() {
        let records = vec![
            record(0, Some(MseMetrics::default())),
            record(
                1,
                Some(MseMetrics {
                    log10_msey: Some(f64::NEG_INFINITY),
                    psnr_y: Some(f64::INFINITY),
                    diff_msey: Some(0.0),
                    diff_msey_delta_timestamp_ms: None,
                    diff_mseu: Some(0.25),
                    diff_msev: Some(0.0),
                }),
            ),
        ];
        let table = MetricTable::from_records(true, &records);
        let mut out = Vec::new();
        table.write_csv(&mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            "frame_num,timestamp_ms,delta_timestamp_ms,log10_msey,psnr_y,diff_msey,diff_msey_delta_timestamp_ms,diff_mseu,diff_msev"
        );
        assert_eq!(lines[1], "0,0,,,,,,,");
        assert_eq!(lines[2], "1,33.5,33.5,-inf,inf,0,,0.25,0");
    }

    #[test]
    fn column_lookup() {
        let table = MetricTable::from_records(false, &[record(0, None), record(1, None)]);
        assert_eq!(table.len(), 2);
        assert_eq!(
            table.column("delta_timestamp_ms"),
            Some(vec![None, Some(33.5)])
        );
        assert_eq!(table.column("psnr_y"), None);
    }
}
