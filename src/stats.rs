//! Counters summarising one run.
use crate::identifiers::FileFailure;
use crate::writer::WriteReport;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunStats {
    pub pairs_attempted: usize,
    pub pairs_succeeded: usize,
    pub pairs_failed: usize,
    pub updated: usize,
    pub malformed_lines: usize,
    pub files_skipped: Vec<FileFailure>,
    /// Users of each empty-password bucket, reported but not linked.
    pub empty_password: Vec<Vec<String>>,
}

impl RunStats {
    pub fn record_writes(&mut self, report: &WriteReport) {
        self.pairs_attempted += report.attempted;
        self.pairs_failed += report.failed;
        self.pairs_succeeded += report.attempted - report.failed;
        self.updated += report.updated;
    }

    pub fn success_rate(&self) -> String {
        pct(self.pairs_succeeded, self.pairs_attempted)
    }
}

fn pct(n: usize, d: usize) -> String {
    if d == 0 {
        return "0.00%".to_string();
    }
    format!("{:.2}%", (n as f64) / (d as f64) * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_write_report() {
        let mut s = RunStats::default();
        s.record_writes(&WriteReport {
            attempted: 4,
            failed: 1,
            updated: 3,
            outcomes: Vec::new(),
        });
        assert_eq!(s.pairs_succeeded, 3);
        assert_eq!(s.updated, 3);
        assert_eq!(s.success_rate(), "75.00%");
    }

    #[test]
    fn empty_run_rate_is_zero() {
        assert_eq!(RunStats::default().success_rate(), "0.00%");
    }
}
