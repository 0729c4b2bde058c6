//! CSV Summary Table
//!
//! One line per summary row. Undefined statistics are written as the literal
//! `undefined` so downstream plotting never mistakes them for zero.

use crate::report::Report;
use std::io::Write;
use trialbench_core::SummaryRow;

/// Column order of the summary table
pub const SUMMARY_COLUMNS: [&str; 15] = [
    "experiment",
    "algorithm",
    "n",
    "k",
    "status",
    "count",
    "skipped",
    "rate",
    "mean",
    "std_dev",
    "mean_time_us",
    "median_time_us",
    "p95_time_us",
    "ci_lower",
    "ci_upper",
];

/// Marker written for undefined cells
pub const UNDEFINED: &str = "undefined";

fn cell(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{}", v),
        None => UNDEFINED.to_string(),
    }
}

fn record(row: &SummaryRow) -> [String; 15] {
    [
        row.experiment.clone().unwrap_or_default(),
        row.configuration.algorithm.clone(),
        row.configuration.n.to_string(),
        row.configuration.k.to_string(),
        row.status.label().to_string(),
        row.count.to_string(),
        row.skipped.to_string(),
        cell(row.rate),
        cell(row.mean),
        cell(row.std_dev),
        cell(row.mean_time_us),
        cell(row.median_time_us),
        cell(row.p95_time_us),
        cell(row.ci_lower),
        cell(row.ci_upper),
    ]
}

/// Write the summary table for `rows` to `writer`
pub fn write_summary_table<W: Write>(rows: &[SummaryRow], writer: W) -> Result<(), csv::Error> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);

    wtr.write_record(SUMMARY_COLUMNS)?;
    for row in rows {
        wtr.write_record(record(row))?;
    }

    wtr.flush()?;
    Ok(())
}

/// Generate the summary table of a report as a CSV string
pub fn generate_csv_report(report: &Report) -> Result<String, csv::Error> {
    let mut buf = Vec::new();
    write_summary_table(&report.rows, &mut buf)?;
    String::from_utf8(buf).map_err(|e| {
        csv::Error::from(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use trialbench_core::{Configuration, RowStatus};

    fn table(rows: &[SummaryRow]) -> String {
        let mut buf = Vec::new();
        write_summary_table(rows, &mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_header_matches_columns() {
        let out = table(&[]);
        assert_eq!(
            out.trim_end(),
            "experiment,algorithm,n,k,status,count,skipped,rate,mean,std_dev,\
             mean_time_us,median_time_us,p95_time_us,ci_lower,ci_upper"
        );
    }

    #[test]
    fn test_undefined_cells() {
        let row = SummaryRow::undefined(
            Configuration::new("karger", 10, 5),
            RowStatus::Failed("timeout".into()),
        )
        .in_experiment("mincut");
        let out = table(&[row]);
        let line = out.lines().nth(1).unwrap();

        assert_eq!(
            line,
            "mincut,karger,10,5,failed,0,0,undefined,undefined,undefined,\
             undefined,undefined,undefined,undefined,undefined"
        );
    }

    #[test]
    fn test_defined_cells() {
        let row = SummaryRow {
            count: 4,
            skipped: 1,
            rate: Some(0.25),
            mean: Some(1.5),
            std_dev: Some(0.0),
            mean_time_us: Some(12.0),
            ..SummaryRow::undefined(Configuration::new("ks", 16, 2), RowStatus::Ok)
        };
        let out = table(&[row]);
        let fields: Vec<&str> = out.lines().nth(1).unwrap().split(',').collect();

        assert_eq!(fields[0], "");
        assert_eq!(fields[4], "ok");
        assert_eq!(fields[5], "4");
        assert_eq!(fields[6], "1");
        assert_eq!(fields[7], "0.25");
        assert_eq!(fields[9], "0");
        assert_eq!(fields[10], "12");
        assert_eq!(fields[11], UNDEFINED);
    }

    #[test]
    fn test_algorithm_with_comma_is_quoted() {
        let row = SummaryRow::undefined(Configuration::new("a,b", 1, 1), RowStatus::Ok);
        let out = table(&[row]);
        assert!(out.lines().nth(1).unwrap().starts_with(",\"a,b\",1,1,ok"));
    }
}
