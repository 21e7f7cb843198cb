//! Cascading acquisition: a newly discovered league implies its teams, a
//! team implies its squad, a player implies his injuries, season history and
//! team history. Rows are created in dependency order — a parent is inserted
//! and committed before any of its children are even constructed, because
//! child rows embed the parent's realized id.
//!
//! Nothing here is transactional across a whole cascade: a failure halfway
//! through a league leaves the league and the already-committed teams and
//! players in place. Only per-batch commits (every 1000 rows) checkpoint.

use std::collections::BTreeMap;

use rusqlite::Connection;
use tracing::{debug, info, warn};

use crate::counters::{Allocator, Watermarks};
use crate::error::Result;
use crate::extract::{LeaguePage, PageSource, PlayerPage};
use crate::model::{
    Injury, Player, PlayerSeason, PlayerTeam, RawInjury, RawLeague, RawPlayer, RawPlayerSeason,
    RawPlayerTeam, RawTeam,
};
use crate::normalize;
use crate::resolve::{self, LeagueKey, PlayerKey, TeamKey};
use crate::store::{self, LeagueField, Table, TeamField};

/// Raw rows accumulated during one cascade, each paired with its zero-based
/// in-memory index. This is also what the JSON snapshot files serialize.
#[derive(Debug, Default)]
pub struct RawBatch {
    pub teams: Vec<(i64, RawTeam)>,
    pub players: Vec<(i64, RawPlayer)>,
    pub injuries: Vec<(i64, RawInjury)>,
    pub player_teams: Vec<(i64, RawPlayerTeam)>,
    pub player_seasons: Vec<(i64, RawPlayerSeason)>,
}

// ---------------------------------------------------------------------------
// Acquisition entry points, one per entity kind
// ---------------------------------------------------------------------------

/// Acquire a league (and everything under it). Returns the canonical league
/// name, or None when the site has no match for the key.
pub fn acquire_league(
    conn: &mut Connection,
    source: &dyn PageSource,
    key: &str,
    kind: LeagueKey,
) -> Result<Option<String>> {
    let page = match kind {
        LeagueKey::Url => source.league_by_url(key)?,
        LeagueKey::Country => source.league_by_country(key)?,
        LeagueKey::Name => source.search_league(key)?,
    };
    let Some(page) = page else {
        return Ok(None);
    };
    let canonical = page.name.clone();
    insert_league_and_cascade(conn, source, &page)?;
    Ok(Some(canonical))
}

/// Acquire a standalone team: pull in its containing league first (which
/// usually brings the team along), then insert the team itself if the league
/// cascade did not. Returns the canonical team name.
pub fn acquire_team(
    conn: &mut Connection,
    source: &dyn PageSource,
    key: &str,
    kind: TeamKey,
) -> Result<Option<String>> {
    let page = match kind {
        TeamKey::Url => source.team_by_url(key)?,
        TeamKey::Name => source.search_team(key)?,
    };
    let Some(page) = page else {
        return Ok(None);
    };

    // Parent before child, enforced by recursive resolution.
    if let Some(league_url) = &page.league_url {
        resolve::resolve_leagues(conn, source, &[league_url.clone()], LeagueKey::Url)?;
    }

    if store::find_teams(conn, TeamField::Url, &page.url)?.is_empty() {
        let league_id = page
            .league_url
            .as_deref()
            .map(|url| store::find_leagues(conn, LeagueField::Url, url))
            .transpose()?
            .and_then(|leagues| leagues.first().map(|l| l.id));
        match league_id {
            Some(league_id) => {
                insert_standalone_team(conn, source, league_id, &page.name, &page.url)?;
            }
            None => {
                warn!(team = %page.name, "containing league unresolved; team not inserted");
            }
        }
    }

    Ok(Some(page.name.clone()))
}

/// Acquire a standalone player: pull in his current league first, then, if
/// the league cascade still did not surface him, insert his profile and
/// history directly. Returns the stored (first, last) name pair.
#[allow(clippy::type_complexity)]
pub fn acquire_player(
    conn: &mut Connection,
    source: &dyn PageSource,
    key: &str,
    kind: PlayerKey,
) -> Result<Option<(Option<String>, Option<String>)>> {
    let page = match kind {
        PlayerKey::Url => source.player_by_url(key)?,
        PlayerKey::Name => source.search_player(key)?,
    };
    let Some(page) = page else {
        return Ok(None);
    };

    if let Some(league_url) = page.current_league_url() {
        resolve::resolve_leagues(conn, source, &[league_url.to_string()], LeagueKey::Url)?;
    }

    if store::find_players_by_url(conn, &page.url)?.is_empty() {
        let mut marks = Watermarks::seeded(conn)?;
        let team_urls = store::team_url_index(conn)?;
        let mut batch = RawBatch::default();
        let player_index = marks.players.next_index();
        collect_player(&mut batch, &mut marks, player_index, &page, &team_urls);
        flush_children(conn, &batch)?;
    }

    Ok(Some((page.first_name.clone(), page.last_name.clone())))
}

// ---------------------------------------------------------------------------
// League cascade
// ---------------------------------------------------------------------------

/// Insert the league row (committed immediately), then cascade its teams and
/// squads. Returns the raw rows for snapshotting.
pub fn insert_league_and_cascade(
    conn: &mut Connection,
    source: &dyn PageSource,
    page: &LeaguePage,
) -> Result<(i64, RawLeague, RawBatch)> {
    let mut alloc = Allocator::seeded(conn, Table::Leagues)?;
    let league_index = alloc.next_index();
    let raw_league = RawLeague {
        name: page.name.clone(),
        country: page.country.clone(),
        url: Some(page.url.clone()),
    };
    store::insert_leagues(conn, &[normalize::league_row(league_index, &raw_league)])?;

    let batch = cascade_league_children(conn, source, league_index, page)?;
    Ok((league_index, raw_league, batch))
}

fn cascade_league_children(
    conn: &mut Connection,
    source: &dyn PageSource,
    league_index: i64,
    page: &LeaguePage,
) -> Result<RawBatch> {
    // The watermark: all five child allocators seeded once, before any row
    // of this cascade is constructed.
    let mut marks = Watermarks::seeded(conn)?;
    let mut batch = RawBatch::default();

    for team in &page.teams {
        let index = marks.teams.next_index();
        batch.teams.push((
            index,
            RawTeam {
                league_id: league_index,
                name: team.name.clone(),
                url: Some(team.url.clone()),
            },
        ));
        debug!(team = %team.name, url = %team.url, "league team");
    }

    // Teams are committed before any squad is read, so player history rows
    // can reference them.
    let team_rows: Vec<_> = batch
        .teams
        .iter()
        .map(|(index, raw)| normalize::team_row(*index, raw))
        .collect();
    store::insert_teams(conn, &team_rows)?;
    info!(league = %page.name, teams = team_rows.len(), "teams committed");

    let team_urls = store::team_url_index(conn)?;
    ingest_squads(conn, source, &mut marks, &mut batch, &team_urls)?;
    Ok(batch)
}

/// Scrape every squad of the batch's teams and flush the accumulated player
/// rows and their history.
fn ingest_squads(
    conn: &mut Connection,
    source: &dyn PageSource,
    marks: &mut Watermarks,
    batch: &mut RawBatch,
    team_urls: &BTreeMap<String, i64>,
) -> Result<()> {
    let teams = batch.teams.clone();
    for (_, team) in &teams {
        let Some(url) = &team.url else {
            continue;
        };
        info!(team = %team.name, "scraping squad");
        for player_url in source.squad(url)? {
            let Some(page) = source.player_by_url(&player_url)? else {
                debug!(url = %player_url, "player page missing");
                continue;
            };
            let player_index = marks.players.next_index();
            collect_player(batch, marks, player_index, &page, team_urls);
            info!(player = %player_url, "scraped player");
        }
    }
    flush_children(conn, batch)?;
    Ok(())
}

fn insert_standalone_team(
    conn: &mut Connection,
    source: &dyn PageSource,
    league_id: i64,
    name: &str,
    url: &str,
) -> Result<()> {
    let mut marks = Watermarks::seeded(conn)?;
    let team_index = marks.teams.next_index();
    let raw = RawTeam {
        league_id: league_id - 1,
        name: name.to_string(),
        url: Some(url.to_string()),
    };
    store::insert_teams(conn, &[normalize::team_row(team_index, &raw)])?;

    let mut batch = RawBatch::default();
    batch.teams.push((team_index, raw));
    let team_urls = store::team_url_index(conn)?;
    ingest_squads(conn, source, &mut marks, &mut batch, &team_urls)
}

// ---------------------------------------------------------------------------
// Per-player collection
// ---------------------------------------------------------------------------

/// Turn one player page into raw rows: profile, injuries, season history and
/// team history, allocating child indices as rows are appended. History rows
/// whose team url is not among the known teams keep `team_id: None` and are
/// dropped at flush, never inserted with a dangling reference.
fn collect_player(
    batch: &mut RawBatch,
    marks: &mut Watermarks,
    player_index: i64,
    page: &PlayerPage,
    team_urls: &BTreeMap<String, i64>,
) {
    batch.players.push((
        player_index,
        RawPlayer {
            first_name: page.first_name.clone(),
            last_name: page.last_name.clone(),
            nationality: page.nationality.clone(),
            date_of_birth: page.date_of_birth.clone(),
            country_of_birth: page
                .country_of_birth
                .clone()
                .or_else(|| Some("Unknown".to_string())),
            position: page.position.clone().or_else(|| Some("Unknown".to_string())),
            height: page.height.clone(),
            weight: page.weight.clone(),
            foot: page.foot.clone(),
            url: Some(page.url.clone()),
        },
    ));

    for injury in &page.injuries {
        let index = marks.injuries.next_index();
        batch.injuries.push((
            index,
            RawInjury {
                player_id: player_index,
                description: injury.description.clone(),
                start_date: injury.start.clone(),
                end_date: injury.end.clone(),
            },
        ));
    }

    for season in &page.seasons {
        let index = marks.player_seasons.next_index();
        let team_id = season
            .team_url
            .as_deref()
            .and_then(|url| team_urls.get(url).copied());
        batch.player_seasons.push((
            index,
            RawPlayerSeason {
                player_id: player_index,
                team_id,
                season: season.season.clone(),
                minutes_played: season.minutes_played.clone(),
                appearances: season.appearances.clone(),
                lineups: season.lineups.clone(),
                substitute_in: season.substitute_in.clone(),
                substitute_out: season.substitute_out.clone(),
                on_bench: season.on_bench.clone(),
                goals: season.goals.clone(),
                yellow_card: season.yellow_card.clone(),
                yellow_2nd: season.yellow_2nd.clone(),
                red_card: season.red_card.clone(),
            },
        ));
    }

    collect_team_history(batch, marks, player_index, page, team_urls);
}

/// The player's first spell is assumed to start on January 1st of his first
/// (oldest, rendered last) season.
fn first_spell_start(page: &PlayerPage) -> Option<String> {
    let season = &page.seasons.last()?.season;
    let head = season.split('/').next()?;
    // get() rejects out-of-range and non-boundary slices alike.
    let year = head.get(2..4)?;
    Some(format!("01/01/{year}"))
}

fn collect_team_history(
    batch: &mut RawBatch,
    marks: &mut Watermarks,
    player_index: i64,
    page: &PlayerPage,
    team_urls: &BTreeMap<String, i64>,
) {
    let initial_start = first_spell_start(page);
    let mut push = |batch: &mut RawBatch,
                    marks: &mut Watermarks,
                    team: &str,
                    team_url: Option<&str>,
                    start: Option<String>,
                    end: Option<String>| {
        let index = marks.player_teams.next_index();
        let team_id = team_url.and_then(|url| team_urls.get(url).copied());
        batch.player_teams.push((
            index,
            RawPlayerTeam {
                player_id: player_index,
                team: team.to_string(),
                team_url: team_url.map(|u| u.to_string()),
                team_id,
                start,
                end,
            },
        ));
    };

    if page.transfers.is_empty() {
        // Never transferred: a single spell with the current team.
        let current = page.seasons.first();
        let team = current.and_then(|s| s.team_name.clone()).unwrap_or_default();
        let team_url = current.and_then(|s| s.team_url.clone());
        push(
            batch,
            marks,
            &team,
            team_url.as_deref(),
            initial_start,
            None,
        );
        return;
    }

    // Transfers are rendered newest first: each spell at the destination
    // club runs from the transfer date to the start of the next-newer spell.
    let mut previous_start: Option<String> = None;
    for transfer in &page.transfers {
        push(
            batch,
            marks,
            &transfer.to_name,
            Some(&transfer.to_url),
            Some(transfer.date.clone()),
            previous_start.clone(),
        );
        previous_start = Some(transfer.date.clone());
    }
    // The first club, joined at the assumed career start and left on the
    // date of the oldest transfer.
    if let Some(oldest) = page.transfers.last() {
        push(
            batch,
            marks,
            &oldest.from_name,
            Some(&oldest.from_url),
            initial_start,
            Some(oldest.date.clone()),
        );
    }
}

// ---------------------------------------------------------------------------
// Flush
// ---------------------------------------------------------------------------

/// Normalize and commit every child table of the batch, in dependency order.
/// Rows that fail referential resolution are dropped here.
pub(crate) fn flush_children(conn: &mut Connection, batch: &RawBatch) -> Result<()> {
    let players: Vec<Player> = batch
        .players
        .iter()
        .map(|(index, raw)| normalize::player_row(*index, raw))
        .collect::<Result<_>>()?;
    store::insert_players(conn, &players)?;

    let injuries: Vec<Injury> = batch
        .injuries
        .iter()
        .map(|(index, raw)| normalize::injury_row(*index, raw))
        .collect::<Result<_>>()?;
    store::insert_injuries(conn, &injuries)?;

    let mut spells: Vec<PlayerTeam> = Vec::with_capacity(batch.player_teams.len());
    for (index, raw) in &batch.player_teams {
        if let Some(row) = normalize::player_team_row(*index, raw)? {
            spells.push(row);
        }
    }
    store::insert_player_teams(conn, &spells)?;

    let mut seasons: Vec<PlayerSeason> = Vec::with_capacity(batch.player_seasons.len());
    for (index, raw) in &batch.player_seasons {
        if let Some(row) = normalize::player_season_row(*index, raw)? {
            seasons.push(row);
        }
    }
    store::insert_player_seasons(conn, &seasons)?;

    info!(
        players = players.len(),
        injuries = injuries.len(),
        spells = spells.len(),
        seasons = seasons.len(),
        "batch committed"
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// Bootstrap: the initial top-N-league run
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct BootstrapSummary {
    pub leagues: usize,
    pub teams: usize,
    pub players: usize,
    pub injuries: usize,
    pub raw_leagues: Vec<(i64, RawLeague)>,
    pub raw_batches: Vec<RawBatch>,
}

/// Acquire the first `n` leagues of the competitions index, skipping those
/// already present. Raw rows are kept for snapshotting by the caller.
pub fn bootstrap(
    conn: &mut Connection,
    source: &dyn PageSource,
    n: usize,
) -> Result<BootstrapSummary> {
    let mut summary = BootstrapSummary::default();
    for league_ref in source.top_leagues(n)? {
        if !store::find_leagues(conn, LeagueField::Url, &league_ref.url)?.is_empty() {
            info!(league = %league_ref.name, "already present; skipped");
            continue;
        }
        let Some(page) = source.league_by_url(&league_ref.url)? else {
            info!(league = %league_ref.name, "league page missing");
            continue;
        };
        let (league_index, raw_league, batch) = insert_league_and_cascade(conn, source, &page)?;
        summary.leagues += 1;
        summary.teams += batch.teams.len();
        summary.players += batch.players.len();
        summary.injuries += batch.injuries.len();
        summary.raw_leagues.push((league_index, raw_league));
        summary.raw_batches.push(batch);
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::SeasonCells;

    #[test]
    fn first_spell_starts_january_of_oldest_season() {
        let mut page = PlayerPage::default();
        page.seasons = vec![
            SeasonCells::empty("2021/2022".into()),
            SeasonCells::empty("2019/2020".into()),
        ];
        assert_eq!(first_spell_start(&page).as_deref(), Some("01/01/19"));
    }

    #[test]
    fn no_career_table_means_no_spell_start() {
        let page = PlayerPage::default();
        assert_eq!(first_spell_start(&page), None);
    }

    #[test]
    fn garbled_season_label_yields_no_spell_start() {
        let mut page = PlayerPage::default();
        page.seasons = vec![SeasonCells::empty("2È19/2020".into())];
        assert_eq!(first_spell_start(&page), None);
        page.seasons = vec![SeasonCells::empty("20".into())];
        assert_eq!(first_spell_start(&page), None);
    }
}
