//! Terminal output for a finished run.
use colored::*;

use crate::stats::RunStats;
use crate::writer::WriteReport;

fn section_header(title: &str) -> String {
    format!("\n{}\n{}\n", title.bold().blue(), "─".repeat(title.chars().count()))
}

/// Message printed for each empty-password bucket.
pub fn empty_password_notice(users: &[String]) -> String {
    format!(
        "The following users have an empty hash and will not be processed : {}",
        users.join(", ")
    )
}

/// Final count line, printed whatever the verbosity.
pub fn updated_line(stats: &RunStats) -> String {
    format!("Updated: {}", stats.updated)
}

pub fn render_summary(stats: &RunStats, report: &WriteReport) -> String {
    let mut out = String::new();
    out.push_str(&section_header("Run Summary"));
    out.push_str(&format!("Pairs attempted: {}\n", stats.pairs_attempted));
    out.push_str(&format!(
        "Pairs succeeded: {} ({})\n",
        stats.pairs_succeeded,
        stats.success_rate()
    ));
    out.push_str(&format!("Pairs failed: {}\n", stats.pairs_failed));
    if stats.malformed_lines > 0 {
        out.push_str(&format!(
            "Malformed dump lines skipped: {}\n",
            stats.malformed_lines
        ));
    }

    if !stats.files_skipped.is_empty() {
        out.push_str(&section_header("Unreadable Files"));
        for f in &stats.files_skipped {
            out.push_str(&format!("  {}: {}\n", f.path.display(), f.reason));
        }
    }

    let failures: Vec<_> = report.failures().collect();
    if !failures.is_empty() {
        out.push_str(&section_header("Failed Pairs"));
        for f in failures {
            let reason = f.result.as_ref().err().map(String::as_str).unwrap_or("");
            out.push_str(&format!(
                "  {} -> {}: {}\n",
                f.source,
                f.target,
                reason.red()
            ));
        }
    }

    out.push('\n');
    out.push_str(&updated_line(stats).bold().green().to_string());
    out
}
