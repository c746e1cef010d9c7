use anyhow::{anyhow, Result};
use chrono::Local;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn, Level};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt;

/// `-v` count to level: 0 is ERROR, 4 and above TRACE
pub fn get_log_level(verbosity: u8) -> Level {
    match verbosity {
        0 => Level::ERROR,
        1 => Level::WARN,
        2 => Level::INFO,
        3 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// File name used for dev mode logs
pub fn dev_log_file_name() -> String {
    format!("podpulse_dev_{}.log", Local::now().format("%Y%m%d_%H%M%S"))
}

/// Install the global subscriber.
///
/// In dev mode logs go to a timestamped file through a non-blocking writer;
/// the returned guard must be held until shutdown so buffered lines are flushed.
pub fn init_tracing(verbosity: u8, dev: bool) -> Result<Option<WorkerGuard>> {
    let log_level = get_log_level(verbosity);

    if dev {
        let log_file_path = dev_log_file_name();
        println!("🔍 Development mode enabled. Logs will be written to: {}", log_file_path);

        let file_appender = tracing_appender::rolling::never(".", &log_file_path);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        fmt()
            .with_max_level(log_level)
            .with_ansi(false)
            .with_writer(non_blocking)
            .try_init()
            .map_err(|e| anyhow!("Failed to install tracing subscriber: {}", e))?;

        return Ok(Some(guard));
    }

    fmt()
        .with_max_level(log_level)
        .try_init()
        .map_err(|e| anyhow!("Failed to install tracing subscriber: {}", e))?;
    Ok(None)
}

/// Cancel `token` on CTRL+C (or SIGTERM on Unix); a second CTRL+C exits immediately
pub fn setup_signal_handler(token: CancellationToken) -> Result<()> {
    tokio::spawn(async move {
        wait_for_shutdown_signal().await;

        info!("Shutdown signal received, finishing current round");
        token.cancel();

        let _ = signal::ctrl_c().await;
        std::process::exit(130);
    });

    Ok(())
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal as unix_signal, SignalKind};

    match unix_signal(SignalKind::terminate()) {
        Ok(mut terminate) => {
            tokio::select! {
                _ = signal::ctrl_c() => println!("❌ Interrupted by user."),
                _ = terminate.recv() => println!("❌ Terminated."),
            }
        }
        Err(e) => {
            warn!("Cannot listen for SIGTERM: {}", e);
            let _ = signal::ctrl_c().await;
            println!("❌ Interrupted by user.");
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    let _ = signal::ctrl_c().await;
    println!("❌ Interrupted by user.");
}
