use std::path::PathBuf;

use tearoff::app::{self, events::UserEvent, state::AppState};
use tearoff::config::EngineConfig;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

/// Reads one JSON command per line from stdin and writes one JSON reply per
/// line to stdout. Deferred work is flushed after every command.
///
/// An optional first argument overrides the config file location.
#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = EngineConfig::load(config_path.as_deref()).unwrap_or_else(|e| {
        eprintln!("Failed to load config, using defaults: {e:#}");
        EngineConfig::default()
    });

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let (proxy, mut replies) = mpsc::unbounded_channel::<UserEvent>();
    let writer = tokio::spawn(async move {
        while let Some(UserEvent::Reply(reply)) = replies.recv().await {
            match serde_json::to_string(&reply) {
                Ok(line) => println!("{line}"),
                Err(e) => tracing::error!("Failed to serialize reply: {}", e),
            }
        }
    });

    let mut state = AppState::new(config);
    tracing::info!("Menu engine ready; reading commands from stdin.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        app::handle_ipc_message(&line, &proxy, &mut state);
        state.system.run_idle();
    }

    drop(proxy);
    writer.await?;
    tracing::info!("Input closed, shutting down.");
    Ok(())
}
