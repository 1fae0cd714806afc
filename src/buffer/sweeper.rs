//! Retention sweeper.
//!
//! Periodically deletes segments older than the retention window
//! (buffer_minutes + cleanup_margin_minutes). Runs on its own interval,
//! independent of request traffic; the margin keeps a selection that
//! started just before a tick from losing its tail mid-download.

use std::fs;
use std::path::Path;
use std::time::{Duration, SystemTime};
use tokio_util::sync::CancellationToken;

use crate::buffer::segment::scan_dir;
use crate::constants::SWEEP_INTERVAL_SECS;

/// Background loop; ticks every 30 seconds until cancelled.
pub async fn run(dir: std::path::PathBuf, retention_minutes: u32, token: CancellationToken) {
    let keep = Duration::from_secs(retention_minutes as u64 * 60);
    let mut interval = tokio::time::interval(Duration::from_secs(SWEEP_INTERVAL_SECS));

    loop {
        tokio::select! {
            _ = interval.tick() => {
                if let Err(e) = sweep(&dir, keep) {
                    log::error!("Sweep of {:?} failed: {}", dir, e);
                }
            }
            _ = token.cancelled() => {
                log::info!("Retention sweeper stopping");
                break;
            }
        }
    }
}

pub fn sweep(dir: &Path, keep: Duration) -> std::io::Result<usize> {
    sweep_at(dir, keep, SystemTime::now())
}

/// Delete every segment whose mtime is strictly older than `now - keep`.
/// Per-file failures are logged and skipped; one bad file never aborts
/// the sweep. Returns the number of deletions.
pub fn sweep_at(dir: &Path, keep: Duration, now: SystemTime) -> std::io::Result<usize> {
    let segments = scan_dir(dir)?;
    let total = segments.len();
    let mut deleted = 0;

    for segment in segments {
        if !is_expired(segment.modified, now, keep) {
            continue;
        }
        match fs::remove_file(&segment.path) {
            Ok(()) => deleted += 1,
            // Already vanished: deletion is idempotent
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => deleted += 1,
            Err(e) => log::warn!("Failed to delete {:?}: {}", segment.path, e),
        }
    }

    if deleted > 0 {
        log::info!(
            "Deleted {} old segments (kept {}, retention {}s)",
            deleted,
            total - deleted,
            keep.as_secs()
        );
    }

    Ok(deleted)
}

fn is_expired(modified: SystemTime, now: SystemTime, keep: Duration) -> bool {
    match now.duration_since(modified) {
        Ok(age) => age > keep,
        // Modified "in the future" relative to now: never expired
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_is_expired_boundaries() {
        let now = SystemTime::now();
        let keep = Duration::from_secs(14 * 60);

        // Default window: 12min buffer + 2min margin => cutoff at 14
        // minutes of age.
        assert!(is_expired(now - Duration::from_secs(20 * 60), now, keep));
        assert!(is_expired(now - Duration::from_secs(14 * 60 + 1), now, keep));
        assert!(!is_expired(now - Duration::from_secs(14 * 60), now, keep)); // strictly older
        assert!(!is_expired(now - Duration::from_secs(10 * 60), now, keep));
        assert!(!is_expired(now - Duration::from_secs(0), now, keep));
        assert!(!is_expired(now + Duration::from_secs(60), now, keep));
    }

    #[test]
    fn test_sweep_deletes_only_past_cutoff() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path();

        for i in 0..5 {
            let name = format!("seg_20250115_12000{}.mp3", i);
            let mut f = File::create(dir.join(name)).unwrap();
            f.write_all(b"mp3 bytes").unwrap();
        }
        // Non-segment file must survive any sweep
        File::create(dir.join("notes.txt")).unwrap();

        let keep = Duration::from_secs(14 * 60);

        // Files were just written: within the window, nothing deleted
        let deleted = sweep_at(dir, keep, SystemTime::now()).unwrap();
        assert_eq!(deleted, 0);
        assert_eq!(scan_dir(dir).unwrap().len(), 5);

        // Fifteen minutes later every segment has aged out
        let later = SystemTime::now() + Duration::from_secs(15 * 60);
        let deleted = sweep_at(dir, keep, later).unwrap();
        assert_eq!(deleted, 5);
        assert!(scan_dir(dir).unwrap().is_empty());
        assert!(dir.join("notes.txt").exists());
    }

    #[test]
    fn test_sweep_keeps_younger_cohort() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path();
        let now = SystemTime::now();
        let keep = Duration::from_secs(14 * 60);

        let write = |name: &str, modified: Option<SystemTime>| {
            let f = File::create(dir.join(name)).unwrap();
            (&f).write_all(b"mp3 bytes").unwrap();
            if let Some(m) = modified {
                f.set_modified(m).unwrap();
            }
        };

        // Twenty minutes old: past the 14 minute cutoff
        write("seg_20250115_114000.mp3", Some(now - Duration::from_secs(20 * 60)));
        write("seg_20250115_114002.mp3", Some(now - Duration::from_secs(20 * 60)));
        // Fresh: must survive the same sweep
        write("seg_20250115_120000.mp3", None);
        write("seg_20250115_120002.mp3", None);

        let deleted = sweep_at(dir, keep, now).unwrap();
        assert_eq!(deleted, 2);

        let remaining = scan_dir(dir).unwrap();
        assert_eq!(remaining.len(), 2);
        assert!(remaining
            .iter()
            .all(|s| s.name.starts_with("seg_20250115_1200")));
    }

    #[test]
    fn test_sweep_missing_dir_is_noop() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("gone");
        let deleted = sweep(&missing, Duration::from_secs(60)).unwrap();
        assert_eq!(deleted, 0);
    }
}
