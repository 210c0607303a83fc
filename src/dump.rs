use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::credential::{Credential, HashGroups};
use crate::identifiers::clean_line;
use crate::io::open_lines;

#[derive(Debug, thiserror::Error)]
pub enum DumpError {
    #[error("cannot read dump {}: {reason}", path.display())]
    Open { path: PathBuf, reason: String },
    #[error("malformed dump line {line_no}: {line}")]
    MalformedLine { line_no: usize, line: String },
}

/// What to do with a line that has fewer than four `:` fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MalformedPolicy {
    #[default]
    Skip,
    Fail,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DumpLoad {
    pub groups: HashGroups,
    pub malformed: usize,
}

pub fn parse_dump_line(line: &str, line_no: usize) -> Result<Credential, DumpError> {
    // account:rid:LM:NT[:...]; only fields 0 and 3 are used
    let malformed = || DumpError::MalformedLine {
        line_no,
        line: line.to_string(),
    };
    let mut parts = line.split(':');
    let account = parts.next().ok_or_else(malformed)?;
    let hash = parts.nth(2).ok_or_else(malformed)?;
    Ok(Credential::from_dump_fields(account, hash))
}

fn accept(
    load: &mut DumpLoad,
    line: &str,
    line_no: usize,
    policy: MalformedPolicy,
) -> Result<(), DumpError> {
    let Some(clean) = clean_line(line) else {
        return Ok(());
    };
    match parse_dump_line(clean, line_no) {
        Ok(c) => load.groups.insert(c),
        Err(e) => match policy {
            MalformedPolicy::Fail => return Err(e),
            MalformedPolicy::Skip => {
                warn!("{} (skipped)", e);
                load.malformed += 1;
            }
        },
    }
    Ok(())
}

pub fn parse_dump_contents(contents: &str, policy: MalformedPolicy) -> Result<DumpLoad, DumpError> {
    let mut load = DumpLoad::default();
    for (i, line) in contents.lines().enumerate() {
        accept(&mut load, line, i + 1, policy)?;
    }
    Ok(load)
}

/// Read a whole dump file. Unlike identifier lists, failing to open the dump
/// ends the run.
pub fn load_dump_file<P: AsRef<Path>>(
    path: P,
    mmap_threshold: u64,
    policy: MalformedPolicy,
) -> Result<DumpLoad, DumpError> {
    let path = path.as_ref();
    let open_err = |reason: String| DumpError::Open {
        path: path.to_path_buf(),
        reason,
    };
    let lines = open_lines(path, mmap_threshold).map_err(|e| open_err(format!("{:#}", e)))?;
    let mut load = DumpLoad::default();
    for (i, line) in lines.enumerate() {
        let line = line.map_err(|e| open_err(e.to_string()))?;
        accept(&mut load, &line, i + 1, policy)?;
    }
    debug!(
        "{}: {} distinct hashes, {} malformed lines",
        path.display(),
        load.groups.len(),
        load.malformed
    );
    Ok(load)
}
