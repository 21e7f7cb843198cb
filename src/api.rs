//! Alternate acquisition path: a JSON sports API instead of scraped pages.
//! The same normalization rules apply; only the raw formats differ (ISO
//! dates, unit-less measurements, lowercase foot labels). API entities carry
//! no site url, so their url columns stay NULL.

use chrono::Local;
use reqwest::blocking::Client;
use rusqlite::Connection;
use serde_json::Value;
use tracing::{info, warn};

use crate::config;
use crate::counters::Allocator;
use crate::error::{Error, Result};
use crate::extract::title_case;
use crate::model::{Foot, League, Player, Team};
use crate::normalize;
use crate::store::{self, LeagueField, Table, TeamField};

const API_BASE: &str = "https://api.sportradar.us/soccer-t3";
const CONTINENT: &str = "eu";

#[derive(Debug, Default, Clone)]
pub struct ApiIngestSummary {
    pub league_id: i64,
    pub teams_added: usize,
    pub players_added: usize,
    pub players_known: usize,
    pub players_ambiguous: usize,
}

/// Pull one tournament (league, teams, squads) from the API into the store.
pub fn ingest_tournament(
    conn: &mut Connection,
    client: &Client,
    country: &str,
    api_key: &str,
) -> Result<ApiIngestSummary> {
    let Some(code) = config::api_tournament_code(country) else {
        return Err(Error::Payload(format!(
            "no tournament code for country {country:?}"
        )));
    };

    let url =
        format!("{API_BASE}/{CONTINENT}/en/tournaments/sr:tournament:{code}/info.json?api_key={api_key}");
    let payload = fetch_json(client, &url)?;

    let tournament = payload
        .get("tournament")
        .ok_or_else(|| Error::Payload("missing tournament object".into()))?;
    let league_name = str_field(tournament, "name")
        .ok_or_else(|| Error::Payload("missing tournament name".into()))?;
    let league_country = tournament
        .get("category")
        .and_then(|c| c.get("name"))
        .and_then(Value::as_str)
        .unwrap_or(country)
        .to_string();

    // Existence is the resolver's dedup mechanism; reuse a league already
    // acquired through either path rather than appending a twin row.
    let league_id = match store::find_leagues(conn, LeagueField::Name, &league_name)?.first() {
        Some(existing) => {
            info!(league = %league_name, id = existing.id, "league already present");
            existing.id
        }
        None => {
            let mut alloc = Allocator::seeded(conn, Table::Leagues)?;
            let id = alloc.next_index() + 1;
            store::insert_leagues(
                conn,
                &[League {
                    id,
                    name: league_name.clone(),
                    country: league_country,
                    url: None,
                }],
            )?;
            info!(league = %league_name, id, "league added from api");
            id
        }
    };

    let mut summary = ApiIngestSummary {
        league_id,
        ..ApiIngestSummary::default()
    };

    let teams = payload
        .get("groups")
        .and_then(|g| g.get(0))
        .and_then(|g| g.get("teams"))
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    let mut team_alloc = Allocator::seeded(conn, Table::Teams)?;
    let mut player_alloc = Allocator::seeded(conn, Table::Players)?;

    for team in &teams {
        let Some(team_name) = str_field(team, "name") else {
            continue;
        };
        if store::find_teams(conn, TeamField::Name, &team_name)?.is_empty() {
            store::insert_teams(
                conn,
                &[Team {
                    id: team_alloc.next_index() + 1,
                    league_id,
                    name: team_name.clone(),
                    url: None,
                }],
            )?;
            summary.teams_added += 1;
        }

        let Some(team_key) = str_field(team, "id") else {
            continue;
        };
        let profile_url =
            format!("{API_BASE}/{CONTINENT}/en/teams/{team_key}/profile.json?api_key={api_key}");
        let profile = fetch_json(client, &profile_url)?;
        info!(team = %team_name, "fetching squad from api");

        let players = profile
            .get("players")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        ingest_players(conn, &players, &mut player_alloc, &mut summary)?;
    }

    Ok(summary)
}

fn ingest_players(
    conn: &mut Connection,
    players: &[Value],
    alloc: &mut Allocator,
    summary: &mut ApiIngestSummary,
) -> Result<()> {
    for player in players {
        let (first, last) = split_api_name(str_field(player, "name").as_deref());

        let matches = match last.as_deref() {
            Some(last_name) => store::find_players_name_like(conn, first.as_deref(), last_name)?,
            None => Vec::new(),
        };
        match matches.len() {
            1 => {
                info!(first = ?first, last = ?last, "player already in store");
                summary.players_known += 1;
                continue;
            }
            n if n > 1 => {
                // Policy, preserved from the source system: an ambiguous name
                // match is treated as "already present" and skipped. This can
                // mask a genuinely new player who shares a name.
                warn!(first = ?first, last = ?last, matches = n, "ambiguous player name; skipped");
                summary.players_ambiguous += 1;
                continue;
            }
            _ => {}
        }

        let birthdate = match str_field(player, "date_of_birth") {
            Some(raw) => normalize::parse_iso_date(&raw)?,
            None => Local::now().date_naive(),
        };
        let foot = match str_field(player, "preferred_foot").as_deref() {
            Some("right") => Foot::Right,
            Some("left") => Foot::Left,
            _ => Foot::Unknown,
        };

        let row = Player {
            id: alloc.next_index() + 1,
            first_name: first.clone(),
            last_name: last.clone(),
            nationality: str_field(player, "nationality"),
            birthdate,
            birthplace: str_field(player, "place_of_birth"),
            position: str_field(player, "type").map(|t| title_case(&t)),
            height: num_field(player, "height").unwrap_or(0.0),
            weight: num_field(player, "weight").unwrap_or(0.0),
            foot_right: foot,
            url: None,
        };
        store::insert_players(conn, &[row])?;
        info!(first = ?first, last = ?last, "player added from api");
        summary.players_added += 1;
    }
    Ok(())
}

/// API names come as "Last, First"; a single segment is a last name only.
fn split_api_name(raw: Option<&str>) -> (Option<String>, Option<String>) {
    let Some(raw) = raw else {
        return (None, None);
    };
    match raw.split_once(", ") {
        Some((last, first)) => (Some(first.to_string()), Some(last.to_string())),
        None if raw.trim().is_empty() => (None, None),
        None => (None, Some(raw.trim().to_string())),
    }
}

fn fetch_json(client: &Client, url: &str) -> Result<Value> {
    let resp = client.get(url).send()?;
    let status = resp.status();
    let body = resp.text()?;
    if !status.is_success() {
        return Err(Error::Payload(format!("api http {status}: {body}")));
    }
    Ok(serde_json::from_str(body.trim())?)
}

fn str_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(|s| s.to_string())
}

fn num_field(value: &Value, key: &str) -> Option<f64> {
    let v = value.get(key)?;
    if let Some(n) = v.as_f64() {
        return Some(n);
    }
    v.as_str()?.trim().parse::<f64>().ok()
}
