//! Parses FFmpeg stderr output.
//!
//! Progress lines (`size= ... time= ... bitrate= ...`) are logged at a
//! throttled rate; everything else goes to debug and is retained as a
//! bounded diagnostic tail so exit failures can be reported with context.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::ChildStderr;

use crate::constants::{DIAGNOSTIC_TAIL_LIMIT, PROGRESS_LOG_INTERVAL_SECS};

pub struct FfmpegMonitor;

impl FfmpegMonitor {
    /// Drain stderr in a background task. The returned handle accumulates
    /// the most recent non-progress output, truncated to a bounded length.
    pub fn start(stderr: Option<ChildStderr>, label: &'static str) -> Arc<Mutex<String>> {
        let tail = Arc::new(Mutex::new(String::new()));
        let Some(stderr) = stderr else {
            return tail;
        };

        let tail_handle = tail.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            let mut last_log_time = Instant::now();
            let mut first_log = true;

            while let Ok(Some(line)) = lines.next_line().await {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }

                let is_progress = trimmed.contains("time=") && trimmed.contains("bitrate=");
                if is_progress {
                    let interval = Duration::from_secs(PROGRESS_LOG_INTERVAL_SECS);
                    if first_log || last_log_time.elapsed() >= interval {
                        log::info!(
                            "{} | Time: {} | Bitrate: {} | Speed: {}",
                            label,
                            extract_value(trimmed, "time=").unwrap_or_else(|| "??".to_string()),
                            extract_value(trimmed, "bitrate=")
                                .unwrap_or_else(|| "N/A".to_string()),
                            extract_value(trimmed, "speed=").unwrap_or_else(|| "??".to_string()),
                        );
                        last_log_time = Instant::now();
                        first_log = false;
                    }
                } else {
                    log::debug!("FFmpeg ({}): {}", label, trimmed);
                    if let Ok(mut tail) = tail_handle.lock() {
                        append_to_tail(&mut tail, trimmed);
                    }
                }
            }
        });

        tail
    }
}

/// Append a stderr line, keeping only the most recent output. The cut
/// point is pushed forward to a char boundary; FFmpeg stderr can carry
/// multi-byte text (stream metadata, localized messages).
fn append_to_tail(tail: &mut String, line: &str) {
    if !tail.is_empty() {
        tail.push('\n');
    }
    tail.push_str(line);

    if tail.len() > DIAGNOSTIC_TAIL_LIMIT {
        let mut cut = tail.len() - DIAGNOSTIC_TAIL_LIMIT;
        while !tail.is_char_boundary(cut) {
            cut += 1;
        }
        tail.drain(..cut);
    }
}

/// Truncated snapshot of a monitor's diagnostic tail.
pub fn diagnostic_tail(tail: &Arc<Mutex<String>>) -> String {
    tail.lock()
        .map(|t| {
            if t.is_empty() {
                "no diagnostic output".to_string()
            } else {
                t.clone()
            }
        })
        .unwrap_or_else(|_| "no diagnostic output".to_string())
}

fn extract_value(line: &str, key: &str) -> Option<String> {
    let start = line.find(key)?;
    let after_key = &line[start + key.len()..];
    // Skip leading whitespace to find the start of the value
    let value_start = after_key.find(|c: char| !c.is_whitespace()).unwrap_or(0);
    let value_part = &after_key[value_start..];

    let end = value_part
        .find(|c: char| c.is_whitespace())
        .unwrap_or(value_part.len());
    Some(value_part[..end].to_string())
}
