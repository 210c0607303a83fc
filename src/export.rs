//! CSV audit trail of every pair the writer attempted.
use std::path::Path;

use anyhow::Result;
use csv::Writer;
use serde::Serialize;

use crate::writer::WriteReport;

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct PairRow<'a> {
    source: &'a str,
    target: &'a str,
    relationship: &'a str,
    status: &'a str,
    detail: String,
}

pub fn save_pairs_csv<P: AsRef<Path>>(report: &WriteReport, path: P) -> Result<()> {
    let mut wtr = Writer::from_path(path)?;
    for o in &report.outcomes {
        let (status, detail) = match &o.result {
            Ok(rows) => ("ok", rows.to_string()),
            Err(e) => ("failed", e.clone()),
        };
        wtr.serialize(PairRow {
            source: &o.source,
            target: &o.target,
            relationship: o.kind.relationship(),
            status,
            detail,
        })?;
    }
    wtr.flush()?;
    Ok(())
}
