//! Pure raw-record -> canonical-row conversions. Every rule here applies
//! identically to site-scraped and API-sourced data.
//!
//! Sentinel policy (fixed, per field):
//! - missing player birthdate -> the normalization-time date. Documented
//!   anomaly: computed ages come out near zero; callers must not treat it
//!   as real data.
//! - missing height/weight -> 0
//! - missing foot -> -1 (tri-state stored in a boolean-typed column)
//! - missing injury end date -> 0001-01-01
//! - missing player_team end date -> 1970-01-01
//! - season stat cell "?" -> -1
//!
//! Foreign keys arrive as zero-based in-memory indices and are shifted by +1
//! here, at flush time, to line up with 1-based surrogate ids.

use chrono::{Local, NaiveDate};

use crate::error::{Error, Result};
use crate::model::{
    Foot, Injury, League, Player, PlayerSeason, PlayerTeam, RawInjury, RawLeague, RawPlayer,
    RawPlayerSeason, RawPlayerTeam, RawTeam, Team,
};

/// Open-ended injury sentinel.
pub fn injury_open_end() -> NaiveDate {
    NaiveDate::from_ymd_opt(1, 1, 1).unwrap_or(NaiveDate::MIN)
}

/// Open-ended team-spell sentinel (the epoch).
pub fn team_spell_open_end() -> NaiveDate {
    NaiveDate::default()
}

/// Site passport format, e.g. "24 June 1987".
pub fn parse_passport_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%d %B %Y")
        .map_err(|_| Error::parse("passport date", raw))
}

/// Injury / transfer format, e.g. "13/08/19".
pub fn parse_short_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%d/%m/%y").map_err(|_| Error::parse("short date", raw))
}

/// API format, e.g. "1987-06-24".
pub fn parse_iso_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| Error::parse("iso date", raw))
}

/// Missing birthdates take the current date by policy, not by accident.
pub fn birthdate(raw: Option<&str>) -> Result<NaiveDate> {
    match raw {
        Some(s) if !s.trim().is_empty() && s.trim() != "nan" => parse_passport_date(s),
        _ => Ok(Local::now().date_naive()),
    }
}

/// Strip the trailing unit (" cm" / " kg") and parse; absent -> 0. An
/// unrecognized unit falls through to the parse error, never a slice panic.
pub fn measurement(field: &'static str, raw: Option<&str>) -> Result<f64> {
    let Some(raw) = raw else {
        return Ok(0.0);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(0.0);
    }
    let digits = trimmed
        .strip_suffix(" cm")
        .or_else(|| trimmed.strip_suffix(" kg"))
        .unwrap_or(trimmed);
    digits
        .trim()
        .parse::<f64>()
        .map_err(|_| Error::parse(field, raw))
}

pub fn foot(raw: Option<&str>) -> Foot {
    match raw {
        Some(v) if v.trim() == "Right" => Foot::Right,
        Some(_) => Foot::Left,
        None => Foot::Unknown,
    }
}

/// Season stat cell: the site renders unknown counts as "?".
pub fn stat_cell(field: &'static str, raw: &str) -> Result<i64> {
    let trimmed = raw.trim();
    if trimmed == "?" {
        return Ok(-1);
    }
    trimmed.parse::<i64>().map_err(|_| Error::parse(field, raw))
}

fn shift(index: i64) -> i64 {
    index + 1
}

// ---------------------------------------------------------------------------
// Per-table row builders. `index` is the zero-based in-memory index of the
// row itself within the current batch.
// ---------------------------------------------------------------------------

pub fn league_row(index: i64, raw: &RawLeague) -> League {
    League {
        id: shift(index),
        name: raw.name.clone(),
        country: raw.country.clone(),
        url: raw.url.clone(),
    }
}

pub fn team_row(index: i64, raw: &RawTeam) -> Team {
    Team {
        id: shift(index),
        league_id: shift(raw.league_id),
        name: raw.name.clone(),
        url: raw.url.clone(),
    }
}

pub fn player_row(index: i64, raw: &RawPlayer) -> Result<Player> {
    Ok(Player {
        id: shift(index),
        first_name: raw.first_name.clone(),
        last_name: raw.last_name.clone(),
        nationality: raw.nationality.clone(),
        birthdate: birthdate(raw.date_of_birth.as_deref())?,
        birthplace: raw.country_of_birth.clone(),
        position: raw.position.clone(),
        height: measurement("height", raw.height.as_deref())?,
        weight: measurement("weight", raw.weight.as_deref())?,
        foot_right: foot(raw.foot.as_deref()),
        url: raw.url.clone(),
    })
}

pub fn injury_row(index: i64, raw: &RawInjury) -> Result<Injury> {
    let end_date = match raw.end_date.as_deref() {
        Some(end) if !end.trim().is_empty() => parse_short_date(end)?,
        _ => injury_open_end(),
    };
    Ok(Injury {
        id: shift(index),
        player_id: shift(raw.player_id),
        description: raw.description.clone(),
        start_date: parse_short_date(&raw.start_date)?,
        end_date,
    })
}

/// Returns None (row dropped) when the team reference never resolved.
pub fn player_team_row(index: i64, raw: &RawPlayerTeam) -> Result<Option<PlayerTeam>> {
    let Some(team_index) = raw.team_id else {
        tracing::debug!(team = %raw.team, "dropping player_team row with unresolved team");
        return Ok(None);
    };
    let start = raw
        .start
        .as_deref()
        .ok_or_else(|| Error::parse("start", "<missing>"))?;
    let end_date = match raw.end.as_deref() {
        Some(end) if !end.trim().is_empty() => parse_short_date(end)?,
        _ => team_spell_open_end(),
    };
    Ok(Some(PlayerTeam {
        id: shift(index),
        player_id: shift(raw.player_id),
        team_id: shift(team_index),
        start_date: parse_short_date(start)?,
        end_date,
    }))
}

/// Returns None (row dropped) when the team reference never resolved.
pub fn player_season_row(index: i64, raw: &RawPlayerSeason) -> Result<Option<PlayerSeason>> {
    let Some(team_index) = raw.team_id else {
        tracing::debug!(season = %raw.season, "dropping player_season row with unresolved team");
        return Ok(None);
    };
    Ok(Some(PlayerSeason {
        id: shift(index),
        player_id: shift(raw.player_id),
        team_id: shift(team_index),
        season: raw.season.clone(),
        minutes_played: stat_cell("Minutes played", &raw.minutes_played)?,
        appearances: stat_cell("Appearances", &raw.appearances)?,
        lineups: stat_cell("Lineups", &raw.lineups)?,
        substitute_in: stat_cell("Substitute in", &raw.substitute_in)?,
        substitute_out: stat_cell("Substitute out", &raw.substitute_out)?,
        on_bench: stat_cell("Substitutes on bench", &raw.on_bench)?,
        goals: stat_cell("Goal", &raw.goals)?,
        yellow_card: stat_cell("Yellow card", &raw.yellow_card)?,
        yellow_2nd: stat_cell("Yellow 2nd/RC", &raw.yellow_2nd)?,
        red_card: stat_cell("Red card", &raw.red_card)?,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn passport_date_parses_site_format() {
        let date = parse_passport_date("24 June 1987").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(1987, 6, 24).unwrap());
    }

    #[test]
    fn short_date_two_digit_year_pivot() {
        assert_eq!(
            parse_short_date("01/01/70").unwrap(),
            NaiveDate::from_ymd_opt(1970, 1, 1).unwrap()
        );
        assert_eq!(
            parse_short_date("13/08/19").unwrap(),
            NaiveDate::from_ymd_opt(2019, 8, 13).unwrap()
        );
    }

    #[test]
    fn malformed_date_is_a_parse_error() {
        assert!(matches!(
            parse_passport_date("yesterday"),
            Err(Error::Parse { .. })
        ));
    }

    #[test]
    fn missing_birthdate_takes_current_date() {
        let today = Local::now().date_naive();
        assert_eq!(birthdate(None).unwrap(), today);
        assert_eq!(birthdate(Some("nan")).unwrap(), today);
    }

    #[test]
    fn measurement_strips_unit_suffix() {
        assert_eq!(measurement("height", Some("185 cm")).unwrap(), 185.0);
        assert_eq!(measurement("weight", Some("80 kg")).unwrap(), 80.0);
        assert_eq!(measurement("height", None).unwrap(), 0.0);
    }

    #[test]
    fn measurement_with_foreign_unit_is_a_parse_error() {
        // Multibyte unit text must surface as Parse, not slice mid-character.
        assert!(matches!(
            measurement("height", Some("180 см")),
            Err(Error::Parse { .. })
        ));
        assert!(matches!(
            measurement("weight", Some("80 lbs")),
            Err(Error::Parse { .. })
        ));
    }

    #[test]
    fn foot_is_tri_state() {
        assert_eq!(foot(Some("Right")).as_sql(), 1);
        assert_eq!(foot(Some("Left")).as_sql(), 0);
        assert_eq!(foot(None).as_sql(), -1);
    }

    #[test]
    fn unknown_stat_cell_becomes_sentinel() {
        assert_eq!(stat_cell("Goal", "?").unwrap(), -1);
        assert_eq!(stat_cell("Goal", "12").unwrap(), 12);
        assert!(stat_cell("Goal", "twelve").is_err());
    }

    #[test]
    fn injury_without_end_gets_fixed_sentinel() {
        let raw = RawInjury {
            player_id: 0,
            description: "Hamstring".into(),
            start_date: "13/08/19".into(),
            end_date: None,
        };
        let row = injury_row(0, &raw).unwrap();
        assert_eq!(row.end_date, NaiveDate::from_ymd_opt(1, 1, 1).unwrap());
        assert_eq!(row.player_id, 1);
    }

    #[test]
    fn unresolved_team_rows_are_dropped() {
        let raw = RawPlayerTeam {
            player_id: 3,
            team: "Elsewhere FC".into(),
            team_url: Some("https://example.org/t".into()),
            team_id: None,
            start: Some("01/07/18".into()),
            end: None,
        };
        assert!(player_team_row(0, &raw).unwrap().is_none());
    }

    #[test]
    fn team_spell_without_end_gets_epoch() {
        let raw = RawPlayerTeam {
            player_id: 0,
            team: "FC".into(),
            team_url: None,
            team_id: Some(4),
            start: Some("01/07/18".into()),
            end: None,
        };
        let row = player_team_row(2, &raw).unwrap().unwrap();
        assert_eq!(row.end_date, NaiveDate::from_ymd_opt(1970, 1, 1).unwrap());
        assert_eq!(row.id, 3);
        assert_eq!(row.team_id, 5);
    }
}
