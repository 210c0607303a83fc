//! Identifier lists: one user or computer name per line.
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use log::{debug, error};

use crate::io::open_lines;

/// A list file that could not be read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileFailure {
    pub path: PathBuf,
    pub reason: String,
}

/// Identifiers gathered from every readable list file, deduplicated.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IdentifierLoad {
    pub identifiers: Vec<String>,
    pub failures: Vec<FileFailure>,
}

/// Strip trailing whitespace and drop empty lines. Leading whitespace is kept.
pub fn clean_line(line: &str) -> Option<&str> {
    let clean = line.trim_end();
    if clean.is_empty() { None } else { Some(clean) }
}

pub fn parse_identifiers(contents: &str) -> Vec<String> {
    contents
        .lines()
        .filter_map(clean_line)
        .map(|l| l.to_string())
        .collect()
}

/// Read every list in `paths`. A file that cannot be opened or read is logged,
/// recorded in `failures` and skipped; the others are still read.
pub fn load_identifier_files<P: AsRef<Path>>(paths: &[P], mmap_threshold: u64) -> IdentifierLoad {
    let mut seen: BTreeSet<String> = BTreeSet::new();
    let mut failures = Vec::new();
    for p in paths {
        let path = p.as_ref();
        let lines = match open_lines(path, mmap_threshold) {
            Ok(lines) => lines,
            Err(e) => {
                error!("{:#}", e);
                failures.push(FileFailure {
                    path: path.to_path_buf(),
                    reason: format!("{:#}", e),
                });
                continue;
            }
        };
        let before = seen.len();
        for line in lines {
            match line {
                Ok(line) => {
                    if let Some(name) = clean_line(&line) {
                        seen.insert(name.to_string());
                    }
                }
                Err(e) => {
                    error!("read {}: {}", path.display(), e);
                    failures.push(FileFailure {
                        path: path.to_path_buf(),
                        reason: e.to_string(),
                    });
                    break;
                }
            }
        }
        debug!("{}: {} new identifiers", path.display(), seen.len() - before);
    }
    IdentifierLoad {
        identifiers: seen.into_iter().collect(),
        failures,
    }
}
