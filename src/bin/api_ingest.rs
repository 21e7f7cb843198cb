use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};

use soccer_injuries::http_client::http_client;
use soccer_injuries::{api, config, store};

fn main() -> Result<()> {
    dotenvy::from_filename(".env.local").ok();
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "soccer_injuries=info".into()),
        )
        .init();

    let country = parse_value_arg("--country")
        .ok_or_else(|| anyhow!("pass --country=NAME (one with a known tournament code)"))?;
    if config::api_tournament_code(&country).is_none() {
        let known = config::API_TOURNAMENTS
            .iter()
            .map(|(name, _)| *name)
            .collect::<Vec<_>>()
            .join(", ");
        return Err(anyhow!("no tournament code for {country:?}; known: {known}"));
    }
    let api_key = config::api_key().context("SPORTRADAR_API_KEY is not set")?;

    let db_path = config::db_path(parse_path_arg("--db"));
    let mut conn = store::open_db(&db_path)?;
    let client = http_client().context("building http client")?;

    let summary = api::ingest_tournament(&mut conn, client, &country, &api_key)?;
    println!("Api ingest complete for {country}");
    println!("League id: {}", summary.league_id);
    println!(
        "Teams added: {} Players added: {} known: {} ambiguous: {}",
        summary.teams_added, summary.players_added, summary.players_known, summary.players_ambiguous
    );
    Ok(())
}

fn parse_path_arg(flag: &str) -> Option<PathBuf> {
    parse_value_arg(flag).map(PathBuf::from)
}

fn parse_value_arg(flag: &str) -> Option<String> {
    let prefix = format!("{flag}=");
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    for (idx, arg) in args.iter().enumerate() {
        if let Some(value) = arg.strip_prefix(&prefix) {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
        if arg == flag
            && let Some(next) = args.get(idx + 1)
            && !next.trim().is_empty()
        {
            return Some(next.trim().to_string());
        }
    }
    None
}
