//! SQLite persistence for the six-table schema. Append-only: rows are never
//! updated or deleted, and url uniqueness is advisory (the resolver's
//! existence check is the dedup mechanism, not a constraint).

use std::collections::BTreeMap;
use std::path::Path;

use chrono::NaiveDate;
use rusqlite::types::Type;
use rusqlite::{Connection, Row, params};

use crate::config::BATCH_COMMIT_ROWS;
use crate::error::Result;
use crate::model::{Foot, Injury, League, Player, PlayerSeason, PlayerTeam, Team};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Leagues,
    Teams,
    Players,
    Injuries,
    PlayerTeam,
    PlayerSeason,
}

impl Table {
    pub fn name(self) -> &'static str {
        match self {
            Table::Leagues => "leagues",
            Table::Teams => "teams",
            Table::Players => "players",
            Table::Injuries => "injuries",
            Table::PlayerTeam => "player_team",
            Table::PlayerSeason => "player_season",
        }
    }
}

pub fn open_db(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).ok();
    }
    let conn = Connection::open(path)?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        PRAGMA journal_mode = WAL;
        CREATE TABLE IF NOT EXISTS leagues (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            country TEXT NOT NULL,
            url TEXT NULL
        );
        CREATE TABLE IF NOT EXISTS teams (
            id INTEGER PRIMARY KEY,
            league_id INTEGER NOT NULL REFERENCES leagues(id),
            name TEXT NOT NULL,
            url TEXT NULL
        );
        CREATE TABLE IF NOT EXISTS players (
            id INTEGER PRIMARY KEY,
            first_name TEXT NULL,
            last_name TEXT NULL,
            nationality TEXT NULL,
            birthdate TEXT NOT NULL,
            birthplace TEXT NULL,
            position TEXT NULL,
            height REAL NOT NULL,
            weight REAL NOT NULL,
            foot_right INTEGER NOT NULL,
            url TEXT NULL
        );
        CREATE TABLE IF NOT EXISTS injuries (
            id INTEGER PRIMARY KEY,
            player_id INTEGER NOT NULL REFERENCES players(id),
            description TEXT NOT NULL,
            start_date TEXT NOT NULL,
            end_date TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS player_team (
            id INTEGER PRIMARY KEY,
            player_id INTEGER NOT NULL REFERENCES players(id),
            team_id INTEGER NOT NULL REFERENCES teams(id),
            start_date TEXT NOT NULL,
            end_date TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS player_season (
            id INTEGER PRIMARY KEY,
            player_id INTEGER NOT NULL REFERENCES players(id),
            team_id INTEGER NOT NULL REFERENCES teams(id),
            season TEXT NOT NULL,
            minutes_played INTEGER NOT NULL,
            appearances INTEGER NOT NULL,
            lineups INTEGER NOT NULL,
            substitute_in INTEGER NOT NULL,
            substitute_out INTEGER NOT NULL,
            on_bench INTEGER NOT NULL,
            goals INTEGER NOT NULL,
            yellow_card INTEGER NOT NULL,
            yellow_2nd INTEGER NOT NULL,
            red_card INTEGER NOT NULL
        );
        "#,
    )?;
    Ok(())
}

/// Watermark read: MAX(id), or 0 for an empty table.
pub fn max_id(conn: &Connection, table: Table) -> Result<i64> {
    let sql = format!("SELECT MAX(id) FROM {}", table.name());
    let max = conn.query_row(&sql, [], |row| row.get::<_, Option<i64>>(0))?;
    Ok(max.unwrap_or(0))
}

// ---------------------------------------------------------------------------
// Lookups
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeagueField {
    Name,
    Country,
    Url,
}

impl LeagueField {
    fn column(self) -> &'static str {
        match self {
            LeagueField::Name => "name",
            LeagueField::Country => "country",
            LeagueField::Url => "url",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeamField {
    Name,
    Url,
}

impl TeamField {
    fn column(self) -> &'static str {
        match self {
            TeamField::Name => "name",
            TeamField::Url => "url",
        }
    }
}

fn date_from_sql(idx: usize, raw: String) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn league_from_row(row: &Row<'_>) -> rusqlite::Result<League> {
    Ok(League {
        id: row.get(0)?,
        name: row.get(1)?,
        country: row.get(2)?,
        url: row.get(3)?,
    })
}

fn team_from_row(row: &Row<'_>) -> rusqlite::Result<Team> {
    Ok(Team {
        id: row.get(0)?,
        league_id: row.get(1)?,
        name: row.get(2)?,
        url: row.get(3)?,
    })
}

fn player_from_row(row: &Row<'_>) -> rusqlite::Result<Player> {
    Ok(Player {
        id: row.get(0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        nationality: row.get(3)?,
        birthdate: date_from_sql(4, row.get::<_, String>(4)?)?,
        birthplace: row.get(5)?,
        position: row.get(6)?,
        height: row.get(7)?,
        weight: row.get(8)?,
        foot_right: Foot::from_sql(row.get(9)?),
        url: row.get(10)?,
    })
}

pub fn find_leagues(conn: &Connection, field: LeagueField, value: &str) -> Result<Vec<League>> {
    let sql = format!(
        "SELECT id, name, country, url FROM leagues WHERE {} = ?1 ORDER BY id",
        field.column()
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![value], league_from_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

pub fn find_teams(conn: &Connection, field: TeamField, value: &str) -> Result<Vec<Team>> {
    let sql = format!(
        "SELECT id, league_id, name, url FROM teams WHERE {} = ?1 ORDER BY id",
        field.column()
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![value], team_from_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

const PLAYER_COLUMNS: &str = "id, first_name, last_name, nationality, birthdate, birthplace, \
                              position, height, weight, foot_right, url";

pub fn find_players_by_url(conn: &Connection, url: &str) -> Result<Vec<Player>> {
    let sql = format!("SELECT {PLAYER_COLUMNS} FROM players WHERE url = ?1 ORDER BY id");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![url], player_from_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

/// The de-facto fuzzy matching contract: a lone token matches by partial
/// last-name containment; with a first name present, both halves match as
/// substrings.
pub fn find_players_name_like(
    conn: &Connection,
    first: Option<&str>,
    last: &str,
) -> Result<Vec<Player>> {
    let last_pattern = format!("%{last}%");
    match first {
        Some(first) => {
            let sql = format!(
                "SELECT {PLAYER_COLUMNS} FROM players \
                 WHERE first_name LIKE ?1 AND last_name LIKE ?2 ORDER BY id"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![format!("%{first}%"), last_pattern], player_from_row)?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        }
        None => {
            let sql =
                format!("SELECT {PLAYER_COLUMNS} FROM players WHERE last_name LIKE ?1 ORDER BY id");
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![last_pattern], player_from_row)?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        }
    }
}

pub fn find_players_exact(
    conn: &Connection,
    first: Option<&str>,
    last: Option<&str>,
) -> Result<Vec<Player>> {
    let sql = format!(
        "SELECT {PLAYER_COLUMNS} FROM players \
         WHERE first_name IS ?1 AND last_name IS ?2 ORDER BY id"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![first, last], player_from_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

/// All committed team urls mapped to their zero-based index (id - 1), for
/// resolving career references against already-known teams.
pub fn team_url_index(conn: &Connection) -> Result<BTreeMap<String, i64>> {
    let mut stmt = conn.prepare("SELECT id, url FROM teams WHERE url IS NOT NULL")?;
    let rows = stmt.query_map([], |row| {
        Ok((row.get::<_, String>(1)?, row.get::<_, i64>(0)? - 1))
    })?;
    let mut out = BTreeMap::new();
    for row in rows {
        let (url, index) = row?;
        out.insert(url, index);
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// Batch inserts. Ids are written explicitly (the allocator already assigned
// them); each chunk of BATCH_COMMIT_ROWS rows commits in its own transaction.
// ---------------------------------------------------------------------------

fn insert_chunked<T>(
    conn: &mut Connection,
    rows: &[T],
    sql: &str,
    bind: impl Fn(&mut rusqlite::CachedStatement<'_>, &T) -> rusqlite::Result<()>,
) -> Result<()> {
    for chunk in rows.chunks(BATCH_COMMIT_ROWS) {
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(sql)?;
            for row in chunk {
                bind(&mut stmt, row)?;
            }
        }
        tx.commit()?;
    }
    Ok(())
}

pub fn insert_leagues(conn: &mut Connection, rows: &[League]) -> Result<()> {
    insert_chunked(
        conn,
        rows,
        "INSERT INTO leagues (id, name, country, url) VALUES (?1, ?2, ?3, ?4)",
        |stmt, r| {
            stmt.execute(params![r.id, r.name, r.country, r.url])?;
            Ok(())
        },
    )
}

pub fn insert_teams(conn: &mut Connection, rows: &[Team]) -> Result<()> {
    insert_chunked(
        conn,
        rows,
        "INSERT INTO teams (id, league_id, name, url) VALUES (?1, ?2, ?3, ?4)",
        |stmt, r| {
            stmt.execute(params![r.id, r.league_id, r.name, r.url])?;
            Ok(())
        },
    )
}

pub fn insert_players(conn: &mut Connection, rows: &[Player]) -> Result<()> {
    insert_chunked(
        conn,
        rows,
        "INSERT INTO players (id, first_name, last_name, nationality, birthdate, birthplace, \
         position, height, weight, foot_right, url) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        |stmt, r| {
            stmt.execute(params![
                r.id,
                r.first_name,
                r.last_name,
                r.nationality,
                r.birthdate.format("%Y-%m-%d").to_string(),
                r.birthplace,
                r.position,
                r.height,
                r.weight,
                r.foot_right.as_sql(),
                r.url,
            ])?;
            Ok(())
        },
    )
}

pub fn insert_injuries(conn: &mut Connection, rows: &[Injury]) -> Result<()> {
    insert_chunked(
        conn,
        rows,
        "INSERT INTO injuries (id, player_id, description, start_date, end_date) \
         VALUES (?1, ?2, ?3, ?4, ?5)",
        |stmt, r| {
            stmt.execute(params![
                r.id,
                r.player_id,
                r.description,
                r.start_date.format("%Y-%m-%d").to_string(),
                r.end_date.format("%Y-%m-%d").to_string(),
            ])?;
            Ok(())
        },
    )
}

pub fn insert_player_teams(conn: &mut Connection, rows: &[PlayerTeam]) -> Result<()> {
    insert_chunked(
        conn,
        rows,
        "INSERT INTO player_team (id, player_id, team_id, start_date, end_date) \
         VALUES (?1, ?2, ?3, ?4, ?5)",
        |stmt, r| {
            stmt.execute(params![
                r.id,
                r.player_id,
                r.team_id,
                r.start_date.format("%Y-%m-%d").to_string(),
                r.end_date.format("%Y-%m-%d").to_string(),
            ])?;
            Ok(())
        },
    )
}

pub fn insert_player_seasons(conn: &mut Connection, rows: &[PlayerSeason]) -> Result<()> {
    insert_chunked(
        conn,
        rows,
        "INSERT INTO player_season (id, player_id, team_id, season, minutes_played, appearances, \
         lineups, substitute_in, substitute_out, on_bench, goals, yellow_card, yellow_2nd, \
         red_card) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        |stmt, r| {
            stmt.execute(params![
                r.id,
                r.player_id,
                r.team_id,
                r.season,
                r.minutes_played,
                r.appearances,
                r.lineups,
                r.substitute_in,
                r.substitute_out,
                r.on_bench,
                r.goals,
                r.yellow_card,
                r.yellow_2nd,
                r.red_card,
            ])?;
            Ok(())
        },
    )
}

pub fn count_rows(conn: &Connection, table: Table) -> Result<i64> {
    let sql = format!("SELECT COUNT(*) FROM {}", table.name());
    Ok(conn.query_row(&sql, [], |row| row.get(0))?)
}
