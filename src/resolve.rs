//! Entity resolution: decide whether a requested league / team / player is
//! already in the store, and trigger a cascading acquisition when it is not.
//! Keys are processed independently; a miss on one never aborts the rest.

use rusqlite::Connection;
use tracing::info;

use crate::error::Result;
use crate::extract::{PageSource, title_case};
use crate::ingest;
use crate::model::{League, Player, Team};
use crate::store::{self, LeagueField, TeamField};

/// Closed set of league lookup kinds. Replaces the original free-form
/// "pick a function by name" dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeagueKey {
    Url,
    Name,
    Country,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeamKey {
    Url,
    Name,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerKey {
    Url,
    Name,
}

/// Urls are trimmed only (title-casing would corrupt the path); names and
/// countries are trimmed and title-cased.
fn normalize_key(key: &str, is_url: bool) -> String {
    if is_url {
        key.trim().to_string()
    } else {
        title_case(key)
    }
}

pub fn resolve_leagues(
    conn: &mut Connection,
    source: &dyn PageSource,
    keys: &[String],
    kind: LeagueKey,
) -> Result<Vec<League>> {
    let field = match kind {
        LeagueKey::Url => LeagueField::Url,
        LeagueKey::Name => LeagueField::Name,
        LeagueKey::Country => LeagueField::Country,
    };
    // Fetched once per call, only when a country key can need it.
    let countries = match kind {
        LeagueKey::Country => Some(source.known_countries()?),
        _ => None,
    };

    let mut results = Vec::new();
    for key in keys {
        let key = normalize_key(key, kind == LeagueKey::Url);
        if let Some(countries) = &countries
            && !countries.contains(&key)
        {
            info!(%key, "not one of the possible countries");
            continue;
        }

        let found = store::find_leagues(conn, field, &key)?;
        if !found.is_empty() {
            results.extend(found);
            continue;
        }

        info!(%key, "league not in store; scraping its teams and players");
        let Some(canonical) = ingest::acquire_league(conn, source, &key, kind)? else {
            info!(%key, "not found on site");
            continue;
        };
        // A fuzzy search may have landed on a different name than the key;
        // re-query with what acquisition actually stored.
        let requery = match kind {
            LeagueKey::Name => canonical,
            _ => key.clone(),
        };
        let found = store::find_leagues(conn, field, &requery)?;
        if found.is_empty() {
            info!(%key, "not found on site");
        } else {
            results.extend(found);
        }
    }
    Ok(results)
}

pub fn resolve_teams(
    conn: &mut Connection,
    source: &dyn PageSource,
    keys: &[String],
    kind: TeamKey,
) -> Result<Vec<Team>> {
    let field = match kind {
        TeamKey::Url => TeamField::Url,
        TeamKey::Name => TeamField::Name,
    };

    let mut results = Vec::new();
    for key in keys {
        let key = normalize_key(key, kind == TeamKey::Url);
        let found = store::find_teams(conn, field, &key)?;
        if !found.is_empty() {
            results.extend(found);
            continue;
        }

        info!(%key, "team not in store; acquiring its league first");
        let Some(canonical) = ingest::acquire_team(conn, source, &key, kind)? else {
            info!(%key, "not found on site");
            continue;
        };
        let found = store::find_teams(conn, TeamField::Name, &canonical)?;
        if found.is_empty() {
            info!(%key, "not found on site");
        } else {
            results.extend(found);
        }
    }
    Ok(results)
}

pub fn resolve_players(
    conn: &mut Connection,
    source: &dyn PageSource,
    keys: &[String],
    kind: PlayerKey,
) -> Result<Vec<Player>> {
    let mut results = Vec::new();
    for key in keys {
        let key = normalize_key(key, kind == PlayerKey::Url);
        let found = match kind {
            PlayerKey::Url => store::find_players_by_url(conn, &key)?,
            PlayerKey::Name => find_players_fuzzy(conn, &key)?,
        };
        if !found.is_empty() {
            results.extend(found);
            continue;
        }

        info!(%key, "player not in store; acquiring");
        let Some((first, last)) = ingest::acquire_player(conn, source, &key, kind)? else {
            info!(%key, "not found on site");
            continue;
        };
        let found = store::find_players_exact(conn, first.as_deref(), last.as_deref())?;
        if found.is_empty() {
            info!(%key, "not found on site");
        } else {
            results.extend(found);
        }
    }
    Ok(results)
}

/// Name lookup asymmetry, kept as the de-facto contract: one token matches
/// by partial last name; several tokens match first token against the first
/// name and the last token against the last name, both as substrings.
fn find_players_fuzzy(conn: &Connection, name: &str) -> Result<Vec<Player>> {
    let tokens: Vec<&str> = name.split_whitespace().collect();
    match tokens.as_slice() {
        [] => Ok(Vec::new()),
        [only] => store::find_players_name_like(conn, None, only),
        [first, .., last] => store::find_players_name_like(conn, Some(first), last),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_normalize_except_urls() {
        assert_eq!(normalize_key(" spain ", false), "Spain");
        assert_eq!(
            normalize_key(" https://int.soccerway.com/x ", true),
            "https://int.soccerway.com/x"
        );
    }
}
