//! Segment selection for the download endpoint.
//!
//! Answers "every stable segment covering the last N minutes, oldest
//! first". Selection is a pure read of the buffer directory; no state is
//! kept between calls.

use std::io;
use std::path::Path;
use std::time::SystemTime;

use crate::buffer::segment::{scan_dir, Segment};

/// Return the oldest-first list of stable segments covering the requested
/// duration.
///
/// Fewer segments than the window implies is not an error; the caller gets
/// the best available window. An empty result means "not ready".
pub fn select(dir: &Path, minutes: i64, segment_seconds: u32) -> io::Result<Vec<Segment>> {
    select_at(dir, minutes, segment_seconds, SystemTime::now())
}

pub fn select_at(
    dir: &Path,
    minutes: i64,
    segment_seconds: u32,
    now: SystemTime,
) -> io::Result<Vec<Segment>> {
    if minutes <= 0 {
        log::warn!("Invalid minutes requested: {}", minutes);
        return Ok(Vec::new());
    }

    let mut stable: Vec<Segment> = scan_dir(dir)?
        .into_iter()
        .filter(|s| s.is_stable(now))
        .collect();

    if stable.is_empty() {
        log::info!("No stable segments in {:?}", dir);
        return Ok(Vec::new());
    }

    // Newest first, so we can take the most recent window off the front.
    stable.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

    let target_seconds = minutes as u64 * 60;
    // One extra segment as a small safety margin over the exact count.
    let needed = (target_seconds / segment_seconds.max(1) as u64) as usize + 1;

    if stable.len() < needed {
        log::warn!(
            "Only {} stable segments available for a {} minute window ({} needed); \
             serving ~{}s instead of {}s",
            stable.len(),
            minutes,
            needed,
            stable.len() as u64 * segment_seconds as u64,
            target_seconds
        );
    }

    stable.truncate(needed.min(stable.len()));

    // Oldest first for playable concatenation order.
    stable.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));

    log::debug!(
        "Selected {} segments spanning {} .. {}",
        stable.len(),
        stable.first().map(|s| s.name.as_str()).unwrap_or("-"),
        stable.last().map(|s| s.name.as_str()).unwrap_or("-")
    );

    Ok(stable)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, TimeZone, Utc};
    use std::fs::File;
    use std::io::Write;
    use std::time::Duration;
    use tempfile::TempDir;

    /// Write `count` non-empty segments spaced `step_seconds` apart,
    /// newest at `end`, named by their embedded timestamps.
    fn populate(dir: &Path, count: usize, step_seconds: i64) {
        let end = Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap();
        for i in 0..count {
            let ts = end - ChronoDuration::seconds(step_seconds * i as i64);
            let name = format!("seg_{}.mp3", ts.format("%Y%m%d_%H%M%S"));
            let mut f = File::create(dir.join(name)).unwrap();
            f.write_all(b"mp3 bytes").unwrap();
        }
    }

    fn stable_now() -> SystemTime {
        // Files were just created; shift "now" so they pass the 2s window.
        SystemTime::now() + Duration::from_secs(5)
    }

    #[test]
    fn test_nonpositive_minutes_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        populate(temp_dir.path(), 5, 2);

        assert!(select_at(temp_dir.path(), 0, 2, stable_now()).unwrap().is_empty());
        assert!(select_at(temp_dir.path(), -3, 2, stable_now()).unwrap().is_empty());
    }

    #[test]
    fn test_empty_dir_is_not_ready() {
        let temp_dir = TempDir::new().unwrap();
        let selected = select_at(temp_dir.path(), 5, 2, stable_now()).unwrap();
        assert!(selected.is_empty());
    }

    #[test]
    fn test_unstable_segments_excluded() {
        let temp_dir = TempDir::new().unwrap();
        populate(temp_dir.path(), 3, 2);

        // Empty file: never selectable even when old enough
        File::create(temp_dir.path().join("seg_20250115_115900.mp3")).unwrap();

        // Real "now": every file is younger than the stability window
        let selected = select_at(temp_dir.path(), 5, 2, SystemTime::now()).unwrap();
        assert!(selected.is_empty());

        // Aged past the window: the three non-empty files qualify
        let selected = select_at(temp_dir.path(), 5, 2, stable_now()).unwrap();
        assert_eq!(selected.len(), 3);
        assert!(selected.iter().all(|s| s.size_bytes > 0));
    }

    #[test]
    fn test_five_minute_window_takes_151_segments() {
        // 200 stable 2s segments spanning 10 minutes; a 5 minute request
        // needs floor(300/2)+1 = 151 of them, oldest first.
        let temp_dir = TempDir::new().unwrap();
        populate(temp_dir.path(), 200, 2);

        let selected = select_at(temp_dir.path(), 5, 2, stable_now()).unwrap();
        assert_eq!(selected.len(), 151);

        // Strictly ascending by timestamp
        for pair in selected.windows(2) {
            assert!(pair[0].timestamp < pair[1].timestamp);
        }

        // The newest segment is included, so the window ends "now"
        assert_eq!(selected.last().unwrap().name, "seg_20250115_120000.mp3");
        let span = selected.last().unwrap().timestamp - selected.first().unwrap().timestamp;
        assert_eq!(span.num_seconds(), 300);
    }

    #[test]
    fn test_partial_availability_returns_everything() {
        let temp_dir = TempDir::new().unwrap();
        populate(temp_dir.path(), 40, 2);

        let selected = select_at(temp_dir.path(), 5, 2, stable_now()).unwrap();
        assert_eq!(selected.len(), 40);
        for pair in selected.windows(2) {
            assert!(pair[0].timestamp < pair[1].timestamp);
        }
    }

    #[test]
    fn test_selection_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        populate(temp_dir.path(), 20, 2);

        let now = stable_now();
        let first = select_at(temp_dir.path(), 1, 2, now).unwrap();
        let second = select_at(temp_dir.path(), 1, 2, now).unwrap();

        let names = |v: &[Segment]| v.iter().map(|s| s.name.clone()).collect::<Vec<_>>();
        assert_eq!(names(&first), names(&second));
    }
}
