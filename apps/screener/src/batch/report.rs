//! CSV export of a ranked batch.

use csv::Writer;
use thiserror::Error;

use crate::models::batch::{BatchResult, ScoreResult};

pub const CSV_HEADER: [&str; 6] = [
    "first_name",
    "last_name",
    "email",
    "phone",
    "score",
    "matching_points",
];

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("CSV write failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("CSV buffer could not be finalized: {0}")]
    Buffer(String),
}

/// One row per ranked candidate, in rank order. Failures are not exported.
pub fn to_csv(result: &BatchResult) -> Result<Vec<u8>, ReportError> {
    let mut wtr = Writer::from_writer(Vec::new());
    wtr.write_record(CSV_HEADER)?;

    for row in &result.ranked {
        wtr.write_record(row_fields(row))?;
    }

    wtr.into_inner()
        .map_err(|e| ReportError::Buffer(e.error().to_string()))
}

fn row_fields(row: &ScoreResult) -> [String; 6] {
    // Unnamed candidates are listed under their display name (the file name).
    let first_name = match (&row.first_name, &row.last_name) {
        (None, None) => row.display_name(),
        (first, _) => first.clone().unwrap_or_default(),
    };

    [
        first_name,
        row.last_name.clone().unwrap_or_default(),
        row.email.clone().unwrap_or_default(),
        row.phone.clone().unwrap_or_default(),
        format!("{:.1}", row.score),
        row.matching_points.join("; "),
    ]
}
