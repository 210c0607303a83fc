//! Line-oriented file reading shared by the identifier and dump parsers.
//!
//! Small files go through a `BufReader`; files at or above the threshold are
//! memory-mapped and split on `\n` with `memchr`. Both paths drop CRLF line
//! endings and decode invalid UTF-8 lossily, so a line's bytes never decide
//! whether the rest of the file is read.
use std::fs::File;
use std::io::{self, BufRead, BufReader, Split};
use std::path::Path;

use anyhow::{Context, Result};
use memmap2::Mmap;

/// Default size in bytes from which a file is memory-mapped.
pub const DEFAULT_MMAP_THRESHOLD_BYTES: u64 = 16 * 1024 * 1024; // 16 MiB

/// Lines of one input file, whichever way it was opened.
pub enum LineSource {
    Buffered(Split<BufReader<File>>),
    Mapped { mmap: Mmap, pos: usize },
}

impl Iterator for LineSource {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            LineSource::Buffered(lines) => lines.next().map(|l| l.map(|b| decode_line(&b))),
            LineSource::Mapped { mmap, pos } => {
                let data: &[u8] = mmap;
                if *pos >= data.len() {
                    return None;
                }
                let start = *pos;
                let end = match memchr::memchr(b'\n', &data[start..]) {
                    Some(off) => start + off,
                    None => data.len(),
                };
                *pos = end + 1;
                Some(Ok(decode_line(&data[start..end])))
            }
        }
    }
}

fn decode_line(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}

/// Whether a file of `len` bytes should be memory-mapped.
pub fn should_use_mmap(len: u64, threshold_bytes: u64) -> bool {
    len >= threshold_bytes
}

/// Open `path` and return its lines, mapping the file when it is large.
pub fn open_lines<P: AsRef<Path>>(path: P, threshold_bytes: u64) -> Result<LineSource> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let meta = file
        .metadata()
        .with_context(|| format!("stat {}", path.display()))?;
    // Mapping an empty file fails on some platforms.
    if meta.is_file() && meta.len() > 0 && should_use_mmap(meta.len(), threshold_bytes) {
        let mmap = unsafe { Mmap::map(&file) }
            .with_context(|| format!("mmap {}", path.display()))?;
        Ok(LineSource::Mapped { mmap, pos: 0 })
    } else {
        Ok(LineSource::Buffered(BufReader::new(file).split(b'\n')))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn collect(path: &Path, threshold: u64) -> Vec<String> {
        open_lines(path, threshold)
            .unwrap()
            .map(|l| l.unwrap())
            .collect()
    }

    #[test]
    fn buffered_and_mapped_agree() {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(b"alice\r\nRen\xe9\r\nbob\n\ncarol").unwrap();
        let buffered = collect(f.path(), u64::MAX);
        let mapped = collect(f.path(), 1);
        assert_eq!(buffered, vec!["alice", "Ren\u{FFFD}", "bob", "", "carol"]);
        assert_eq!(mapped, buffered);
    }

    #[test]
    fn empty_file_yields_nothing() {
        let f = NamedTempFile::new().unwrap();
        assert!(collect(f.path(), 0).is_empty());
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = open_lines(dir.path().join("nope.txt"), u64::MAX)
            .err()
            .unwrap();
        assert!(err.to_string().contains("nope.txt"));
    }
}
