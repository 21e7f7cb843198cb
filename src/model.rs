use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Preferred foot as stored: tri-state even though the column is nominally
/// boolean. Unknown maps to the -1 sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Foot {
    Right,
    Left,
    Unknown,
}

impl Foot {
    pub fn as_sql(self) -> i64 {
        match self {
            Foot::Right => 1,
            Foot::Left => 0,
            Foot::Unknown => -1,
        }
    }

    pub fn from_sql(v: i64) -> Self {
        match v {
            1 => Foot::Right,
            0 => Foot::Left,
            _ => Foot::Unknown,
        }
    }
}

// ---------------------------------------------------------------------------
// Raw records: one per table, exactly as handed over by the page extractor /
// JSON snapshot, before any normalization. Foreign keys are zero-based
// in-memory indices; the +1 shift to surrogate ids happens at flush time.
// Serde names follow the on-disk snapshot contract.
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawLeague {
    pub name: String,
    pub country: String,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawTeam {
    /// Zero-based index of the owning league.
    pub league_id: i64,
    pub name: String,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawPlayer {
    #[serde(rename = "First name")]
    pub first_name: Option<String>,
    #[serde(rename = "Last name")]
    pub last_name: Option<String>,
    #[serde(rename = "Nationality")]
    pub nationality: Option<String>,
    #[serde(rename = "Date of birth")]
    pub date_of_birth: Option<String>,
    #[serde(rename = "Country of birth")]
    pub country_of_birth: Option<String>,
    #[serde(rename = "Position")]
    pub position: Option<String>,
    #[serde(rename = "Height")]
    pub height: Option<String>,
    #[serde(rename = "Weight")]
    pub weight: Option<String>,
    #[serde(rename = "Foot")]
    pub foot: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawInjury {
    /// Zero-based index of the injured player.
    pub player_id: i64,
    pub description: String,
    pub start_date: String,
    pub end_date: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawPlayerTeam {
    pub player_id: i64,
    pub team: String,
    pub team_url: Option<String>,
    /// Zero-based team index; None when the team url is not among the known
    /// teams, in which case the whole row is dropped at flush.
    pub team_id: Option<i64>,
    pub start: Option<String>,
    pub end: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawPlayerSeason {
    pub player_id: i64,
    #[serde(rename = "Team_id")]
    pub team_id: Option<i64>,
    #[serde(rename = "Season")]
    pub season: String,
    #[serde(rename = "Minutes played")]
    pub minutes_played: String,
    #[serde(rename = "Appearances")]
    pub appearances: String,
    #[serde(rename = "Lineups")]
    pub lineups: String,
    #[serde(rename = "Substitute in")]
    pub substitute_in: String,
    #[serde(rename = "Substitute out")]
    pub substitute_out: String,
    #[serde(rename = "Substitutes on bench")]
    pub on_bench: String,
    #[serde(rename = "Goal")]
    pub goals: String,
    #[serde(rename = "Yellow card")]
    pub yellow_card: String,
    #[serde(rename = "Yellow 2nd/RC")]
    pub yellow_2nd: String,
    #[serde(rename = "Red card")]
    pub red_card: String,
}

// ---------------------------------------------------------------------------
// Canonical rows, one struct per table, ids 1-based as committed.
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct League {
    pub id: i64,
    pub name: String,
    pub country: String,
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Team {
    pub id: i64,
    pub league_id: i64,
    pub name: String,
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    pub id: i64,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub nationality: Option<String>,
    pub birthdate: NaiveDate,
    pub birthplace: Option<String>,
    pub position: Option<String>,
    pub height: f64,
    pub weight: f64,
    pub foot_right: Foot,
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Injury {
    pub id: i64,
    pub player_id: i64,
    pub description: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerTeam {
    pub id: i64,
    pub player_id: i64,
    pub team_id: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerSeason {
    pub id: i64,
    pub player_id: i64,
    pub team_id: i64,
    pub season: String,
    pub minutes_played: i64,
    pub appearances: i64,
    pub lineups: i64,
    pub substitute_in: i64,
    pub substitute_out: i64,
    pub on_bench: i64,
    pub goals: i64,
    pub yellow_card: i64,
    pub yellow_2nd: i64,
    pub red_card: i64,
}
