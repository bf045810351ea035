mod sink;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use spectate_client::{GameReference, SpectatorClient};
use spectate_core::{discover_game, logging, Config, Delivery, FirstGame, SessionOutcome, SpectatorSession};

use sink::ChunkWriter;

/// Exit status after Ctrl-C, as a shell would report SIGINT
const EXIT_CANCELLED: u8 = 130;

#[derive(Parser, Debug)]
#[command(name = "spectate")]
#[command(about = "Follow a live game through the spectator API", long_about = None)]
struct Args {
    /// Configuration file (TOML or YAML)
    #[arg(long, env = "SPECTATE_CONFIG")]
    config: Option<String>,

    /// Spectator host, e.g. http://spectator.na.lol.riotgames.com:8088
    #[arg(long, env = "SPECTATE_HOST")]
    host: Option<String>,

    /// Platform id, e.g. NA1
    #[arg(long, env = "SPECTATE_PLATFORM")]
    platform: Option<String>,

    /// Follow this game instead of picking the first featured one
    #[arg(long)]
    game_id: Option<u64>,

    /// Write chunks under this directory
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "SPECTATE_LOG_LEVEL")]
    log_level: Option<String>,
}

fn load_config(args: &Args) -> Result<Config> {
    let mut config = Config::load(args.config.as_deref())?;
    if let Some(host) = &args.host {
        config.spectator.host.clone_from(host);
    }
    if let Some(platform) = &args.platform {
        config.spectator.platform.clone_from(platform);
    }
    if let Some(level) = &args.log_level {
        config.logging.level.clone_from(level);
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    // 1. Load and validate configuration
    let config = load_config(&args)?;
    if let Err(errors) = config.validate() {
        for e in &errors {
            eprintln!("Config validation error: {e}");
        }
        return Err(anyhow::anyhow!(
            "Configuration validation failed with {} error(s)",
            errors.len()
        ));
    }

    // 2. Initialize logging
    logging::init_logging(&config.logging)?;
    info!(
        host = %config.spectator.host,
        platform = %config.spectator.platform,
        "spectate starting"
    );

    // 3. Spectator client
    let client = Arc::new(SpectatorClient::with_options(
        config.spectator.host.clone(),
        config.spectator.platform.clone(),
        config.spectator.request_timeout(),
        &config.spectator.user_agent,
    )?);

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            shutdown_signal().await;
            cancel.cancel();
        }
    });

    // 4. Pick the game up front so the output directory is known
    let game = match args.game_id {
        Some(game_id) => GameReference::new(config.spectator.platform.clone(), game_id),
        None => {
            let retry = config.polling.retry_policy();
            match discover_game(client.as_ref(), &FirstGame, &retry, &cancel).await? {
                Some(game) => game,
                None => return Ok(ExitCode::from(EXIT_CANCELLED)),
            }
        }
    };

    let writer = match &args.output_dir {
        Some(root) => Some(ChunkWriter::create(root, &game).await?),
        None => None,
    };

    // 5. Run the session and drain its output
    let session = SpectatorSession::new(client, config)
        .with_game(game)
        .with_cancellation(cancel.clone());
    let (handle, mut stream) = session.spawn();

    let mut write_failed = false;
    while let Some(delivery) = stream.next().await {
        match delivery {
            Delivery::Chunk(chunk) => match &writer {
                Some(writer) => {
                    if let Err(e) = writer.write(&chunk).await {
                        error!("{e:#}");
                        write_failed = true;
                        handle.cancel();
                        break;
                    }
                }
                None => info!(id = chunk.id, kind = %chunk.kind, len = chunk.bytes.len(), "Received"),
            },
            Delivery::Gap { kind, id } => warn!(id, %kind, "Skipped unavailable id"),
        }
    }
    drop(stream);

    match handle.join().await {
        Ok(SessionOutcome::Completed(summary)) => {
            if let Some(writer) = &writer {
                writer.write_summary(&summary).await?;
            }
            info!(
                game_id = summary.game_id,
                chunks = summary.chunks,
                key_frames = summary.key_frames,
                gaps = summary.gaps,
                "Game finished"
            );
            Ok(ExitCode::SUCCESS)
        }
        Ok(SessionOutcome::Cancelled) if write_failed => Ok(ExitCode::FAILURE),
        Ok(SessionOutcome::Cancelled) => {
            info!("Session cancelled");
            Ok(ExitCode::from(EXIT_CANCELLED))
        }
        Err(e) => {
            error!("Session failed: {e}");
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Wait for a shutdown signal (SIGTERM or SIGINT/Ctrl+C)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { info!("Received Ctrl+C"); }
        () = terminate => { info!("Received SIGTERM"); }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides_config() {
        let args = Args::parse_from([
            "spectate",
            "--host",
            "http://127.0.0.1:8088",
            "--platform",
            "EUW1",
            "--log-level",
            "debug",
            "--game-id",
            "99",
        ]);
        let config = load_config(&args).unwrap();

        assert_eq!(config.spectator.host, "http://127.0.0.1:8088");
        assert_eq!(config.spectator.platform, "EUW1");
        assert_eq!(config.logging.level, "debug");
        assert_eq!(args.game_id, Some(99));
        assert!(config.validate().is_ok());
    }
}
