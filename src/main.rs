use anyhow::Context;
use clap::Parser;
use fanfare::adapters::PostgresStore;
use fanfare::cli::{Cli, Commands};
use fanfare::config::AppConfig;
use fanfare::domain::{Game, RawPost};
use fanfare::error::{FanfareError, Result};
use fanfare::persistence::{GameFilter, GameRepository};
use fanfare::services::{
    CollectionPlanner, GameStatusService, IngestService, PhaseMonitor, StatisticsService,
};
use fanfare::SystemClock;
use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::sync::{mpsc, watch};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load_from(&cli.config)?;
    config
        .validate()
        .map_err(|errors| FanfareError::Validation(errors.join("; ")))?;
    init_logging(&config);

    let store = Arc::new(
        PostgresStore::new(&config.database.url, config.database.max_connections).await?,
    );
    let status = Arc::new(GameStatusService::from_config(
        store.clone(),
        Arc::new(SystemClock),
        &config,
    ));

    match cli.command {
        Commands::Migrate => {
            store.migrate().await?;
        }
        Commands::LoadGames { file } => {
            let games: Vec<Game> = read_json(&file)?;
            for game in &games {
                store.upsert(game).await?;
            }
            info!("Loaded {} games from {}", games.len(), file.display());
            let reattributed = IngestService::new(status.clone(), store.clone())
                .reattribute()
                .await?;
            print_json(&serde_json::json!({
                "loaded": games.len(),
                "reattributed": reattributed,
            }))?;
        }
        Commands::Phase { game_id } => {
            let phase = status.current_phase(&game_id).await?;
            print_json(&serde_json::json!({ "game_id": game_id, "phase": phase }))?;
        }
        Commands::Games { phase } => {
            if phase.is_empty() {
                print_json(&status.statuses(&GameFilter::all()).await?)?;
            } else {
                let phases: HashSet<_> = phase.into_iter().collect();
                print_json(&status.select_games(&phases).await?)?;
            }
        }
        Commands::Chart { game_id, width } => {
            let stats = statistics(&status, &store, &config);
            let chart = match width {
                Some(width) => stats.game_chart_with_width(&game_id, width).await?,
                None => stats.game_chart(&game_id).await?,
            };
            print_json(&chart)?;
        }
        Commands::Summary { week } => {
            let stats = statistics(&status, &store, &config);
            print_json(&stats.schedule_summary(week).await?)?;
        }
        Commands::Attribute { team, at } => {
            let game_id = status.attribute_event_to_game(&team, at).await?;
            print_json(&serde_json::json!({
                "team_id": team,
                "posted_at": at,
                "game_id": game_id,
            }))?;
        }
        Commands::Plan => {
            let planner =
                CollectionPlanner::new(status.clone(), store.clone(), config.collection.clone());
            print_json(&planner.plan().await?)?;
        }
        Commands::Ingest { file } => {
            let posts: Vec<RawPost> = read_json(&file)?;
            let ingest = IngestService::new(status.clone(), store.clone());
            print_json(&ingest.ingest(posts).await?)?;
        }
        Commands::Monitor => {
            run_monitor(status, &config).await?;
        }
    }

    Ok(())
}

fn statistics(
    status: &Arc<GameStatusService>,
    store: &Arc<PostgresStore>,
    config: &AppConfig,
) -> StatisticsService {
    StatisticsService::new(
        status.clone(),
        store.clone(),
        config.timing.bucket_width_minutes,
    )
}

async fn run_monitor(status: Arc<GameStatusService>, config: &AppConfig) -> Result<()> {
    let monitor = PhaseMonitor::new(
        status,
        Duration::from_secs(config.collection.poll_interval_secs),
    );
    let (tx, mut rx) = mpsc::channel(64);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = monitor.spawn(tx, shutdown_rx);

    let printer = async {
        while let Some(change) = rx.recv().await {
            if let Err(e) = print_json(&change) {
                error!("Failed to print phase change: {}", e);
            }
        }
    };

    tokio::select! {
        _ = printer => {}
        _ = shutdown_signal() => {
            info!("Shutdown requested");
        }
    }

    let _ = shutdown_tx.send(true);
    if let Err(e) = handle.await {
        error!("Phase monitor task failed: {}", e);
    }
    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let body = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let parsed: T = serde_json::from_str(&body)
        .with_context(|| format!("Failed to parse {} as JSON", path.display()))?;
    Ok(parsed)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn default_filter(level: &str) -> String {
    if level == "info" {
        "info,fanfare=debug,sqlx=warn".to_string()
    } else {
        format!("{},sqlx=warn", level)
    }
}

/// Console logging on stderr (stdout carries JSON output), plus a daily file
/// when the log directory is writable.
fn init_logging(config: &AppConfig) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::Layer;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(&config.logging.level)));

    // `rolling::daily` panics if it cannot create the first file, so check first
    let file_layer = std::env::var("FANFARE_LOG_DIR").ok().and_then(|log_dir| {
        if std::fs::create_dir_all(&log_dir).is_err() {
            eprintln!(
                "Warning: Could not create log directory {}, file logging disabled",
                log_dir
            );
            return None;
        }

        let test_path = Path::new(&log_dir).join(".fanfare_write_test");
        match std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&test_path)
        {
            Ok(_) => {
                let _ = std::fs::remove_file(&test_path);
                let file_appender = tracing_appender::rolling::daily(&log_dir, "fanfare.log");
                let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
                // Lives for the whole process
                Box::leak(Box::new(guard));

                Some(
                    tracing_subscriber::fmt::layer()
                        .with_writer(non_blocking)
                        .with_ansi(false)
                        .with_target(true),
                )
            }
            Err(e) => {
                eprintln!(
                    "Warning: Could not write to log directory {} ({}), file logging disabled",
                    log_dir, e
                );
                None
            }
        }
    });

    let console_layer = if config.logging.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => error!("Failed to install SIGTERM handler: {}", e),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
