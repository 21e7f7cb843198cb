//! Raw-table JSON snapshots: the hand-off format between scraping and the
//! normalizer. One file per table, one JSON object per file, keyed by the
//! stringified zero-based surrogate index, values in raw (pre-normalization)
//! field names.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use rusqlite::Connection;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::info;

use crate::error::Result;
use crate::ingest::{self, RawBatch};
use crate::model::{
    RawInjury, RawLeague, RawPlayer, RawPlayerSeason, RawPlayerTeam, RawTeam,
};
use crate::normalize;
use crate::store;

const LEAGUE_FILE: &str = "league.json";
const TEAM_FILE: &str = "team.json";
const PLAYER_FILE: &str = "player.json";
const INJURY_FILE: &str = "injury.json";
const PLAYER_TEAM_FILE: &str = "player_team.json";
const PLAYER_SEASON_FILE: &str = "player_season.json";

fn write_table<T: Serialize>(dir: &Path, file: &str, rows: &[(i64, T)]) -> Result<()> {
    let map: BTreeMap<String, &T> = rows
        .iter()
        .map(|(index, raw)| (index.to_string(), raw))
        .collect();
    let json = serde_json::to_string(&map)?;
    let tmp = dir.join(format!("{file}.tmp"));
    fs::write(&tmp, json)?;
    fs::rename(&tmp, dir.join(file))?;
    Ok(())
}

fn read_table<T: DeserializeOwned>(dir: &Path, file: &str) -> Result<Vec<(i64, T)>> {
    let path = dir.join(file);
    if !path.exists() {
        return Ok(Vec::new());
    }
    let raw = fs::read_to_string(path)?;
    let map: BTreeMap<String, T> = serde_json::from_str(&raw)?;
    let mut rows: Vec<(i64, T)> = map
        .into_iter()
        .filter_map(|(key, value)| key.parse::<i64>().ok().map(|index| (index, value)))
        .collect();
    rows.sort_by_key(|(index, _)| *index);
    Ok(rows)
}

/// Persist the raw rows of a bootstrap run, one file per table.
pub fn write_dir(
    dir: &Path,
    leagues: &[(i64, RawLeague)],
    batches: &[RawBatch],
) -> Result<()> {
    fs::create_dir_all(dir)?;
    let mut teams = Vec::new();
    let mut players = Vec::new();
    let mut injuries = Vec::new();
    let mut player_teams = Vec::new();
    let mut player_seasons = Vec::new();
    for batch in batches {
        teams.extend(batch.teams.iter().cloned());
        players.extend(batch.players.iter().cloned());
        injuries.extend(batch.injuries.iter().cloned());
        player_teams.extend(batch.player_teams.iter().cloned());
        player_seasons.extend(batch.player_seasons.iter().cloned());
    }
    write_table(dir, LEAGUE_FILE, leagues)?;
    write_table(dir, TEAM_FILE, &teams)?;
    write_table(dir, PLAYER_FILE, &players)?;
    write_table(dir, INJURY_FILE, &injuries)?;
    write_table(dir, PLAYER_TEAM_FILE, &player_teams)?;
    write_table(dir, PLAYER_SEASON_FILE, &player_seasons)?;
    info!(dir = %dir.display(), "snapshot written");
    Ok(())
}

pub fn read_dir(dir: &Path) -> Result<(Vec<(i64, RawLeague)>, RawBatch)> {
    let leagues = read_table::<RawLeague>(dir, LEAGUE_FILE)?;
    let batch = RawBatch {
        teams: read_table::<RawTeam>(dir, TEAM_FILE)?,
        players: read_table::<RawPlayer>(dir, PLAYER_FILE)?,
        injuries: read_table::<RawInjury>(dir, INJURY_FILE)?,
        player_teams: read_table::<RawPlayerTeam>(dir, PLAYER_TEAM_FILE)?,
        player_seasons: read_table::<RawPlayerSeason>(dir, PLAYER_SEASON_FILE)?,
    };
    Ok((leagues, batch))
}

/// Build the store from snapshot files alone: leagues, then teams, then the
/// child tables, same normalization rules as the live path.
pub fn restore(conn: &mut Connection, dir: &Path) -> Result<()> {
    let (leagues, batch) = read_dir(dir)?;

    let league_rows: Vec<_> = leagues
        .iter()
        .map(|(index, raw)| normalize::league_row(*index, raw))
        .collect();
    store::insert_leagues(conn, &league_rows)?;

    let team_rows: Vec<_> = batch
        .teams
        .iter()
        .map(|(index, raw)| normalize::team_row(*index, raw))
        .collect();
    store::insert_teams(conn, &team_rows)?;

    ingest::flush_children(conn, &batch)?;
    info!(
        leagues = league_rows.len(),
        teams = team_rows.len(),
        players = batch.players.len(),
        "store restored from snapshot"
    );
    Ok(())
}
