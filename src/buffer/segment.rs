//! Segment files on disk.
//!
//! A segment is one fixed-duration audio chunk written by the encoder,
//! named `seg_<YYYYMMDD>_<HHMMSS>.mp3`. The embedded timestamp is the
//! preferred ordering key; the file mtime is the fallback when a name
//! does not parse.

use chrono::{DateTime, NaiveDateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use crate::constants::{SEGMENT_TIMESTAMP_FORMAT, STABILITY_WINDOW_SECS};

static SEGMENT_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^seg_(\d{8}_\d{6})\.mp3$").unwrap());

#[derive(Debug, Clone)]
pub struct Segment {
    pub path: PathBuf,
    pub name: String,
    pub timestamp: DateTime<Utc>,
    pub size_bytes: u64,
    pub modified: SystemTime,
}

impl Segment {
    /// A segment is stable once it is non-empty and old enough that the
    /// encoder is no longer writing to it.
    pub fn is_stable(&self, now: SystemTime) -> bool {
        self.size_bytes > 0
            && now
                .duration_since(self.modified)
                .map(|age| age >= Duration::from_secs(STABILITY_WINDOW_SECS))
                .unwrap_or(false)
    }
}

/// Parse the creation timestamp out of a segment filename.
///
/// Total: returns None on any mismatch instead of erroring.
pub fn timestamp_from_name(name: &str) -> Option<DateTime<Utc>> {
    let caps = SEGMENT_NAME_RE.captures(name)?;
    let ts = NaiveDateTime::parse_from_str(&caps[1], SEGMENT_TIMESTAMP_FORMAT).ok()?;
    Some(DateTime::<Utc>::from_naive_utc_and_offset(ts, Utc))
}

pub fn is_segment_name(name: &str) -> bool {
    SEGMENT_NAME_RE.is_match(name)
}

/// List all segment files in the buffer directory with their current
/// size and timestamps. Entries that vanish mid-scan are skipped.
pub fn scan_dir(dir: &Path) -> io::Result<Vec<Segment>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut segments = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                log::debug!("Skipping unreadable directory entry: {}", e);
                continue;
            }
        };

        let name = entry.file_name().to_string_lossy().to_string();
        if !is_segment_name(&name) {
            continue;
        }

        // Race with the sweeper: the file may be gone by the time we stat it.
        let metadata = match entry.metadata() {
            Ok(m) if m.is_file() => m,
            Ok(_) => continue,
            Err(e) => {
                log::debug!("Skipping segment {} (stat failed: {})", name, e);
                continue;
            }
        };

        let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        let timestamp = timestamp_from_name(&name)
            .unwrap_or_else(|| DateTime::<Utc>::from(modified));

        segments.push(Segment {
            path: entry.path(),
            name,
            timestamp,
            size_bytes: metadata.len(),
            modified,
        });
    }

    Ok(segments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};
    use std::fs::File;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_timestamp_from_name() {
        let ts = timestamp_from_name("seg_20250115_093042.mp3").unwrap();
        assert_eq!(ts.year(), 2025);
        assert_eq!(ts.month(), 1);
        assert_eq!(ts.day(), 15);
        assert_eq!(ts.hour(), 9);
        assert_eq!(ts.minute(), 30);
        assert_eq!(ts.second(), 42);
    }

    #[test]
    fn test_timestamp_from_name_rejects_garbage() {
        assert!(timestamp_from_name("seg_notadate.mp3").is_none());
        assert!(timestamp_from_name("seg_20250115_093042.wav").is_none());
        assert!(timestamp_from_name("clip_20250115_093042.mp3").is_none());
        assert!(timestamp_from_name("seg_20251315_093042.mp3").is_none()); // month 13
        assert!(timestamp_from_name("").is_none());
    }

    #[test]
    fn test_scan_dir_filters_non_segments() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path();

        let create = |name: &str| {
            let mut f = File::create(dir.join(name)).unwrap();
            f.write_all(b"mp3 bytes").unwrap();
        };

        create("seg_20250115_093042.mp3");
        create("seg_20250115_093044.mp3");
        create("metadata.json");
        create("other_20250115_093046.mp3");

        let segments = scan_dir(dir).unwrap();
        assert_eq!(segments.len(), 2);
        assert!(segments.iter().all(|s| s.name.starts_with("seg_")));
        assert!(segments.iter().all(|s| s.size_bytes > 0));
    }

    #[test]
    fn test_scan_dir_missing_dir_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("nope");
        assert!(scan_dir(&missing).unwrap().is_empty());
    }

    #[test]
    fn test_stability() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("seg_20250115_093042.mp3");
        let mut f = File::create(&path).unwrap();
        f.write_all(b"data").unwrap();
        drop(f);

        let segments = scan_dir(temp_dir.path()).unwrap();
        let seg = &segments[0];

        // Just written: too young
        assert!(!seg.is_stable(SystemTime::now()));
        // Three seconds from now it has aged past the stability window
        assert!(seg.is_stable(SystemTime::now() + Duration::from_secs(3)));

        // Empty files are never stable, regardless of age
        let empty = temp_dir.path().join("seg_20250115_093044.mp3");
        File::create(&empty).unwrap();
        let segments = scan_dir(temp_dir.path()).unwrap();
        let empty_seg = segments.iter().find(|s| s.size_bytes == 0).unwrap();
        assert!(!empty_seg.is_stable(SystemTime::now() + Duration::from_secs(60)));
    }
}
