//! Encoder supervision.
//!
//! Owns the long-lived FFmpeg segmenter process: launch it, wait for it
//! to die, log why, back off, relaunch. Encoder crashes are steady-state
//! events here; only an explicit stop() is terminal.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Mutex;
use std::time::Duration;
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::AppConfig;
use crate::constants::{
    LAUNCH_FAILURE_DELAY_SECS, RELAUNCH_DELAY_SECS, SEGMENT_OUTPUT_PATTERN, STOP_GRACE_SECS,
};
use crate::ffmpeg::commands::FfmpegCommandBuilder;
use crate::ffmpeg::monitor::{diagnostic_tail, FfmpegMonitor};

#[derive(Debug, Clone)]
struct EncoderSettings {
    ffmpeg_path: String,
    stream_url: String,
    audio_bitrate: String,
    segment_seconds: u32,
    buffer_dir: PathBuf,
}

pub struct EncoderSupervisor {
    settings: EncoderSettings,
    running: Mutex<Option<Running>>,
}

struct Running {
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl EncoderSupervisor {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            settings: EncoderSettings {
                ffmpeg_path: config.encoder.ffmpeg_path.clone(),
                stream_url: config.stream.url.clone(),
                audio_bitrate: config.encoder.audio_bitrate.clone(),
                segment_seconds: config.buffer.segment_seconds,
                buffer_dir: config.buffer_dir(),
            },
            running: Mutex::new(None),
        }
    }

    /// Launch the supervising loop. No-op if it is already running.
    pub fn start(&self) {
        let mut guard = match self.running.lock() {
            Ok(g) => g,
            Err(e) => {
                log::error!("Supervisor state lock poisoned: {}", e);
                return;
            }
        };

        if let Some(running) = guard.as_ref() {
            if !running.task.is_finished() {
                log::debug!("Encoder supervisor already running");
                return;
            }
        }

        let token = CancellationToken::new();
        let task = tokio::spawn(run_loop(self.settings.clone(), token.clone()));
        *guard = Some(Running { token, task });
        log::info!("Encoder supervisor started");
    }

    /// Request termination and wait for the managed process to go away.
    pub async fn stop(&self) {
        let running = match self.running.lock() {
            Ok(mut g) => g.take(),
            Err(e) => {
                log::error!("Supervisor state lock poisoned: {}", e);
                return;
            }
        };

        let Some(running) = running else {
            return;
        };

        running.token.cancel();
        let grace = Duration::from_secs(STOP_GRACE_SECS + 2);
        if tokio::time::timeout(grace, running.task).await.is_err() {
            log::warn!("Encoder supervisor did not stop within grace period");
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
            .lock()
            .map(|g| g.as_ref().map(|r| !r.task.is_finished()).unwrap_or(false))
            .unwrap_or(false)
    }
}

async fn run_loop(settings: EncoderSettings, token: CancellationToken) {
    let output_pattern = settings
        .buffer_dir
        .join(SEGMENT_OUTPUT_PATTERN)
        .to_string_lossy()
        .to_string();

    let args = FfmpegCommandBuilder::new(settings.stream_url.clone(), output_pattern.clone())
        .with_audio_bitrate(settings.audio_bitrate.clone())
        .with_segment_seconds(settings.segment_seconds)
        .build();

    loop {
        if token.is_cancelled() {
            break;
        }

        if let Err(e) = std::fs::create_dir_all(&settings.buffer_dir) {
            log::error!("Failed to create buffer dir {:?}: {}", settings.buffer_dir, e);
        }

        log::info!(
            "Starting segmenter: segment_time={}s, output_pattern={}",
            settings.segment_seconds,
            output_pattern
        );

        let spawned = Command::new(&settings.ffmpeg_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();

        match spawned {
            Ok(mut child) => {
                log::info!("Segmenter process started (PID: {:?})", child.id());
                let tail = FfmpegMonitor::start(child.stderr.take(), "ENCODER");

                tokio::select! {
                    status = child.wait() => {
                        match status {
                            Ok(s) if s.success() => {
                                log::info!("Encoder exited normally (code 0)");
                            }
                            Ok(s) => {
                                log::error!(
                                    "Encoder exited with code {:?}: {}",
                                    s.code(),
                                    diagnostic_tail(&tail)
                                );
                            }
                            Err(e) => log::error!("Failed to wait on encoder: {}", e),
                        }
                    }
                    _ = token.cancelled() => {
                        terminate(&mut child).await;
                        break;
                    }
                }

                log::info!("Waiting {} seconds before relaunch...", RELAUNCH_DELAY_SECS);
                if sleep_or_cancelled(RELAUNCH_DELAY_SECS, &token).await {
                    break;
                }
            }
            Err(e) => {
                // FFmpeg missing or path invalid; back off to avoid a tight loop
                log::error!("Failed to start FFmpeg ({}): {}", settings.ffmpeg_path, e);
                if sleep_or_cancelled(LAUNCH_FAILURE_DELAY_SECS, &token).await {
                    break;
                }
            }
        }
    }

    log::info!("Encoder supervisor loop exiting");
}

/// Returns true when the token fired before the delay elapsed.
async fn sleep_or_cancelled(secs: u64, token: &CancellationToken) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(Duration::from_secs(secs)) => false,
        _ = token.cancelled() => true,
    }
}

/// Graceful stop: SIGTERM, a bounded wait, then SIGKILL.
async fn terminate(child: &mut Child) {
    #[cfg(unix)]
    if let Some(pid) = child.id() {
        unsafe {
            libc::kill(pid as libc::pid_t, libc::SIGTERM);
        }
        match tokio::time::timeout(Duration::from_secs(STOP_GRACE_SECS), child.wait()).await {
            Ok(_) => {
                log::info!("Encoder terminated gracefully");
                return;
            }
            Err(_) => log::warn!("Encoder ignored SIGTERM; killing"),
        }
    }

    if let Err(e) = child.kill().await {
        log::warn!("Failed to kill encoder: {}", e);
    }
}
