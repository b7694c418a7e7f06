//! wg - corpus dashboard CLI entry point

use std::collections::HashMap;
use std::sync::Arc;

use clap::Parser;
use eyre::Result;
use tracing::info;

use wordglance::api::{DataSource, HttpDataSource};
use wordglance::cli::{Cli, Command, OutputFormat};
use wordglance::config::Config;
use wordglance::session::DashboardSession;
use wordglance::tiles::TilePhase;

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) {
    // Priority: CLI --log-level > config file > default (info); RUST_LOG
    // overrides everything when set
    let level = cli_log_level.or(config_log_level).unwrap_or("info");
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn build_sources(config: &Config) -> HashMap<String, Arc<dyn DataSource>> {
    let client = reqwest::Client::new();
    config
        .tiles
        .iter()
        .map(|tile| {
            (
                tile.id.clone(),
                Arc::new(HttpDataSource::new(client.clone(), tile.endpoint.clone()))
                    as Arc<dyn DataSource>,
            )
        })
        .collect()
}

async fn run_query(config: &Config, word: &str, format: OutputFormat) -> Result<()> {
    let (session, handle) = DashboardSession::build(config, build_sources(config))?;
    let session_task = tokio::spawn(session.run());

    info!(%word, "submitting query");
    handle.submit_query(word).await?;
    handle.settled().await?;

    let mut tile_ids: Vec<&str> = handle.tile_ids().collect();
    tile_ids.sort_unstable();

    match format {
        OutputFormat::Json => {
            let mut report = serde_json::Map::new();
            for id in &tile_ids {
                let snap = handle.tile(id).expect("configured tile");
                report.insert(
                    (*id).to_string(),
                    serde_json::json!({
                        "phase": snap.phase,
                        "error": snap.error,
                        "rows": snap.data.as_deref(),
                    }),
                );
            }
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Text => {
            for id in &tile_ids {
                let snap = handle.tile(id).expect("configured tile");
                match snap.phase {
                    TilePhase::Failed => {
                        let error = snap.error.as_deref().unwrap_or("unknown error");
                        println!("{id}: FAILED - {error}");
                    }
                    _ => {
                        let rows = snap.data.as_deref().unwrap_or(&[]);
                        println!("{id}: {} rows", rows.len());
                        for row in rows.iter().take(10) {
                            println!("  {}  {}", row.value, row.count);
                        }
                    }
                }
            }
        }
    }

    handle.shutdown().await?;
    let _ = session_task.await;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_ref())?;
    setup_logging(cli.log_level.as_deref(), config.log_level.as_deref());
    config.validate()?;

    match cli.command {
        Command::Query { word, format } => run_query(&config, &word, format).await?,
        Command::Check => {
            // Building a session runs the full edge validation without
            // touching the network
            let (_session, _handle) = DashboardSession::build(&config, build_sources(&config))?;
            println!(
                "configuration OK: {} tiles, {} edges",
                config.tiles.len(),
                config.edges.len()
            );
        }
        Command::Tiles => {
            for tile in &config.tiles {
                let role = match tile.subquery {
                    Some(extract) => format!("producer ({extract:?})"),
                    None => "plain".to_string(),
                };
                println!("{}  {}  [{}]", tile.id, tile.endpoint, role);
            }
            for edge in &config.edges {
                println!("{} -> {}  ({:?})", edge.producer, edge.consumer, edge.projection);
            }
        }
    }

    Ok(())
}
