use std::fs;
use std::io;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use airshift::buffer::sweeper;
use airshift::config::AppConfig;
use airshift::routes;
use airshift::state::AppState;

fn init_logger() -> Result<(), fern::InitError> {
    let level = std::env::var("AIRSHIFT_LOG")
        .ok()
        .and_then(|v| v.parse::<log::LevelFilter>().ok())
        .unwrap_or(log::LevelFilter::Info);

    let mut dispatch = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{} {} {}] {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(level)
        .chain(std::io::stdout());

    if let Ok(path) = std::env::var("AIRSHIFT_LOG_FILE") {
        dispatch = dispatch.chain(fern::log_file(path)?);
    }

    dispatch.apply()?;
    Ok(())
}

#[tokio::main]
async fn main() -> io::Result<()> {
    if let Err(e) = init_logger() {
        eprintln!("Failed to initialize logger: {}", e);
    }

    let config = AppConfig::load();
    log::info!(
        "Buffer: dir={:?}, segment={}s, window={}min (+{}min margin)",
        config.buffer_dir(),
        config.buffer.segment_seconds,
        config.buffer.buffer_minutes,
        config.buffer.cleanup_margin_minutes
    );

    fs::create_dir_all(config.buffer_dir())?;

    let state = AppState::new(config.clone());
    state.supervisor.start();

    let sweep_token = CancellationToken::new();
    let sweeper_task = tokio::spawn(sweeper::run(
        config.buffer_dir(),
        config.retention_minutes(),
        sweep_token.clone(),
    ));

    let app = routes::router(state.clone());
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    log::info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    log::info!("Shutting down...");
    state.supervisor.stop().await;
    sweep_token.cancel();
    if let Err(e) = sweeper_task.await {
        log::warn!("Sweeper task did not exit cleanly: {}", e);
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for shutdown signal: {}", e);
    }
}
