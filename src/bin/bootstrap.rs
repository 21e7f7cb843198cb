use std::path::PathBuf;

use anyhow::{Context, Result};

use soccer_injuries::extract::SiteSource;
use soccer_injuries::http_client::http_client;
use soccer_injuries::{config, ingest, snapshot, store};

fn main() -> Result<()> {
    dotenvy::from_filename(".env.local").ok();
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "soccer_injuries=info".into()),
        )
        .init();

    let db_path = config::db_path(parse_path_arg("--db"));
    let mut conn = store::open_db(&db_path)?;

    if let Some(dir) = parse_path_arg("--from-snapshot") {
        snapshot::restore(&mut conn, &dir)?;
        println!("Snapshot restored from {}", dir.display());
        print_counts(&conn)?;
        return Ok(());
    }

    let top_n = parse_value_arg("--top-n")
        .map(|raw| raw.parse::<usize>().context("invalid --top-n"))
        .transpose()?
        .unwrap_or(config::TOP_LEAGUES_NUM);

    let client = http_client().context("building http client")?;
    let source = SiteSource::new(client);

    let summary = ingest::bootstrap(&mut conn, &source, top_n)?;
    println!("Bootstrap complete");
    println!("DB: {}", db_path.display());
    println!(
        "Leagues: {} Teams: {} Players: {} Injuries: {}",
        summary.leagues, summary.teams, summary.players, summary.injuries
    );

    if let Some(dir) = parse_path_arg("--snapshot-dir") {
        snapshot::write_dir(&dir, &summary.raw_leagues, &summary.raw_batches)?;
        println!("Snapshot written to {}", dir.display());
    }

    print_counts(&conn)?;
    Ok(())
}

fn print_counts(conn: &rusqlite::Connection) -> Result<()> {
    use soccer_injuries::store::Table;
    for table in [
        Table::Leagues,
        Table::Teams,
        Table::Players,
        Table::Injuries,
        Table::PlayerTeam,
        Table::PlayerSeason,
    ] {
        println!("{}: {}", table.name(), store::count_rows(conn, table)?);
    }
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
