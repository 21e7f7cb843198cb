use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};

use soccer_injuries::extract::SiteSource;
use soccer_injuries::http_client::http_client;
use soccer_injuries::resolve::{self, LeagueKey, PlayerKey, TeamKey};
use soccer_injuries::{config, store};

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

    let client = http_client().context("building http client")?;
    let source = SiteSource::new(client);

    let mut ran = false;

    if let Some(keys) = parse_keys_arg("--league-url") {
        let leagues = resolve::resolve_leagues(&mut conn, &source, &keys, LeagueKey::Url)?;
        print_leagues(&leagues);
        ran = true;
    }
    if let Some(keys) = parse_keys_arg("--league") {
        let leagues = resolve::resolve_leagues(&mut conn, &source, &keys, LeagueKey::Name)?;
        print_leagues(&leagues);
        ran = true;
    }
    if let Some(keys) = parse_keys_arg("--country") {
        let leagues = resolve::resolve_leagues(&mut conn, &source, &keys, LeagueKey::Country)?;
        print_leagues(&leagues);
        ran = true;
    }
    if let Some(keys) = parse_keys_arg("--team-url") {
        let teams = resolve::resolve_teams(&mut conn, &source, &keys, TeamKey::Url)?;
        print_teams(&teams);
        ran = true;
    }
    if let Some(keys) = parse_keys_arg("--team") {
        let teams = resolve::resolve_teams(&mut conn, &source, &keys, TeamKey::Name)?;
        print_teams(&teams);
        ran = true;
    }
    if let Some(keys) = parse_keys_arg("--player-url") {
        let players = resolve::resolve_players(&mut conn, &source, &keys, PlayerKey::Url)?;
        print_players(&players);
        ran = true;
    }
    if let Some(keys) = parse_keys_arg("--player") {
        let players = resolve::resolve_players(&mut conn, &source, &keys, PlayerKey::Name)?;
        print_players(&players);
        ran = true;
    }

    if !ran {
        return Err(anyhow!(
            "nothing to resolve; pass one of --league/--league-url/--country/--team/--team-url/--player/--player-url (comma-separated keys), optionally --db=PATH"
        ));
    }
    Ok(())
}

fn print_leagues(leagues: &[soccer_injuries::model::League]) {
    for league in leagues {
        println!(
            "league {}: {} ({}) {}",
            league.id,
            league.name,
            league.country,
            league.url.as_deref().unwrap_or("-")
        );
    }
}

fn print_teams(teams: &[soccer_injuries::model::Team]) {
    for team in teams {
        println!(
            "team {}: {} league={} {}",
            team.id,
            team.name,
            team.league_id,
            team.url.as_deref().unwrap_or("-")
        );
    }
}

fn print_players(players: &[soccer_injuries::model::Player]) {
    for player in players {
        println!(
            "player {}: {} {} born {} {}",
            player.id,
            player.first_name.as_deref().unwrap_or(""),
            player.last_name.as_deref().unwrap_or(""),
            player.birthdate,
            player.position.as_deref().unwrap_or("-")
        );
    }
}

/// Comma-separated values for `--flag=a,b` or `--flag a,b`.
fn parse_keys_arg(flag: &str) -> Option<Vec<String>> {
    let raw = parse_value_arg(flag)?;
    let keys = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect::<Vec<_>>();
    if keys.is_empty() { None } else { Some(keys) }
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
