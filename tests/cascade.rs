use std::collections::{BTreeMap, BTreeSet};

use soccer_injuries::error::Result;
use soccer_injuries::extract::{
    InjuryCells, LeaguePage, LeagueRef, PageSource, PlayerPage, SeasonCells, TeamPage, TeamRef,
    TransferCells,
};
use soccer_injuries::model::Player;
use soccer_injuries::resolve::{self, LeagueKey, PlayerKey, TeamKey};
use soccer_injuries::store::{self, Table};
use soccer_injuries::{ingest, snapshot};

const LA_LIGA_URL: &str = "/spain/primera-division/";
const BARCELONA_URL: &str = "/teams/spain/fc-barcelona/";
const REAL_URL: &str = "/teams/spain/real-madrid/";
const MESSI_URL: &str = "/players/lionel-messi/";
const PIQUE_URL: &str = "/players/gerard-pique/";
const RAMOS_URL: &str = "/players/sergio-ramos/";

#[derive(Default)]
struct FakeSource {
    countries: BTreeSet<String>,
    leagues: BTreeMap<String, LeaguePage>,
    league_of_country: BTreeMap<String, String>,
    teams: BTreeMap<String, TeamPage>,
    players: BTreeMap<String, PlayerPage>,
    squads: BTreeMap<String, Vec<String>>,
    team_searches: BTreeMap<String, String>,
    player_searches: BTreeMap<String, String>,
    index: Vec<LeagueRef>,
}

impl PageSource for FakeSource {
    fn league_by_url(&self, url: &str) -> Result<Option<LeaguePage>> {
        Ok(self.leagues.get(url).cloned())
    }

    fn team_by_url(&self, url: &str) -> Result<Option<TeamPage>> {
        Ok(self.teams.get(url).cloned())
    }

    fn player_by_url(&self, url: &str) -> Result<Option<PlayerPage>> {
        Ok(self.players.get(url).cloned())
    }

    fn search_league(&self, query: &str) -> Result<Option<LeaguePage>> {
        Ok(self
            .leagues
            .values()
            .find(|page| page.name == query)
            .cloned())
    }

    fn search_team(&self, query: &str) -> Result<Option<TeamPage>> {
        Ok(self
            .team_searches
            .get(query)
            .and_then(|url| self.teams.get(url))
            .cloned())
    }

    fn search_player(&self, query: &str) -> Result<Option<PlayerPage>> {
        Ok(self
            .player_searches
            .get(query)
            .and_then(|url| self.players.get(url))
            .cloned())
    }

    fn known_countries(&self) -> Result<BTreeSet<String>> {
        Ok(self.countries.clone())
    }

    fn league_by_country(&self, country: &str) -> Result<Option<LeaguePage>> {
        Ok(self
            .league_of_country
            .get(country)
            .and_then(|url| self.leagues.get(url))
            .cloned())
    }

    fn top_leagues(&self, n: usize) -> Result<Vec<LeagueRef>> {
        Ok(self.index.iter().take(n).cloned().collect())
    }

    fn squad(&self, team_url: &str) -> Result<Vec<String>> {
        Ok(self.squads.get(team_url).cloned().unwrap_or_default())
    }
}

fn season(season: &str, team_url: Option<&str>, minutes: &str) -> SeasonCells {
    SeasonCells {
        team_name: team_url.map(|_| "Some Team".to_string()),
        team_url: team_url.map(str::to_string),
        competition_url: Some(LA_LIGA_URL.to_string()),
        minutes_played: minutes.to_string(),
        ..SeasonCells::empty(season.to_string())
    }
}

fn la_liga_fixture() -> FakeSource {
    let mut fake = FakeSource::default();
    fake.countries.insert("Spain".to_string());
    fake.league_of_country
        .insert("Spain".to_string(), LA_LIGA_URL.to_string());
    fake.index.push(LeagueRef {
        name: "Primera Division".to_string(),
        country: "Spain".to_string(),
        url: LA_LIGA_URL.to_string(),
    });
    fake.leagues.insert(
        LA_LIGA_URL.to_string(),
        LeaguePage {
            name: "Primera Division".to_string(),
            country: "Spain".to_string(),
            url: LA_LIGA_URL.to_string(),
            teams: vec![
                TeamRef {
                    name: "FC Barcelona".to_string(),
                    url: BARCELONA_URL.to_string(),
                },
                TeamRef {
                    name: "Real Madrid".to_string(),
                    url: REAL_URL.to_string(),
                },
            ],
        },
    );

    fake.squads.insert(
        BARCELONA_URL.to_string(),
        vec![MESSI_URL.to_string(), PIQUE_URL.to_string()],
    );
    fake.squads
        .insert(REAL_URL.to_string(), vec![RAMOS_URL.to_string()]);

    // Never transferred, one injury, two seasons at the same club.
    fake.players.insert(
        MESSI_URL.to_string(),
        PlayerPage {
            url: MESSI_URL.to_string(),
            first_name: Some("Lionel".to_string()),
            last_name: Some("Messi".to_string()),
            nationality: Some("Argentina".to_string()),
            date_of_birth: Some("24 June 1987".to_string()),
            country_of_birth: Some("Argentina".to_string()),
            position: Some("Attacker".to_string()),
            height: Some("170 cm".to_string()),
            weight: Some("72 kg".to_string()),
            foot: Some("Left".to_string()),
            injuries: vec![InjuryCells {
                description: "Hamstring".to_string(),
                start: "11/03/18".to_string(),
                end: Some("02/04/18".to_string()),
            }],
            seasons: vec![
                season("2018/2019", Some(BARCELONA_URL), "2711"),
                season("2004/2005", Some(BARCELONA_URL), "77"),
            ],
            transfers: vec![],
        },
    );

    // One transfer from a club outside the store; its spell and season rows
    // must be dropped, the in-store rows kept.
    fake.players.insert(
        PIQUE_URL.to_string(),
        PlayerPage {
            url: PIQUE_URL.to_string(),
            first_name: Some("Gerard".to_string()),
            last_name: Some("Pique".to_string()),
            nationality: Some("Spain".to_string()),
            date_of_birth: Some("2 February 1987".to_string()),
            position: Some("Defender".to_string()),
            height: Some("194 cm".to_string()),
            weight: Some("85 kg".to_string()),
            foot: Some("Right".to_string()),
            seasons: vec![
                season("2018/2019", Some(BARCELONA_URL), "2520"),
                season("2006/2007", Some("/teams/england/manchester-united/"), "90"),
            ],
            transfers: vec![TransferCells {
                date: "01/07/08".to_string(),
                from_name: "Manchester United".to_string(),
                from_url: "/teams/england/manchester-united/".to_string(),
                to_name: "FC Barcelona".to_string(),
                to_url: BARCELONA_URL.to_string(),
            }],
            ..PlayerPage::default()
        },
    );

    fake.players.insert(
        RAMOS_URL.to_string(),
        PlayerPage {
            url: RAMOS_URL.to_string(),
            first_name: Some("Sergio".to_string()),
            last_name: Some("Ramos".to_string()),
            date_of_birth: Some("30 March 1986".to_string()),
            height: Some("184 cm".to_string()),
            weight: Some("82 kg".to_string()),
            foot: Some("Right".to_string()),
            seasons: vec![season("2018/2019", Some(REAL_URL), "3060")],
            ..PlayerPage::default()
        },
    );

    fake
}

fn counts(conn: &rusqlite::Connection) -> (i64, i64, i64, i64, i64, i64) {
    (
        store::count_rows(conn, Table::Leagues).unwrap(),
        store::count_rows(conn, Table::Teams).unwrap(),
        store::count_rows(conn, Table::Players).unwrap(),
        store::count_rows(conn, Table::Injuries).unwrap(),
        store::count_rows(conn, Table::PlayerTeam).unwrap(),
        store::count_rows(conn, Table::PlayerSeason).unwrap(),
    )
}

#[test]
fn country_miss_cascades_whole_league() {
    let mut conn = store::open_in_memory().unwrap();
    let fake = la_liga_fixture();

    let leagues =
        resolve::resolve_leagues(&mut conn, &fake, &["spain".to_string()], LeagueKey::Country)
            .unwrap();
    assert_eq!(leagues.len(), 1);
    assert_eq!(leagues[0].name, "Primera Division");
    assert_eq!(leagues[0].id, 1);

    // Pique loses his Manchester United season and his first-club spell;
    // everything else lands.
    assert_eq!(counts(&conn), (1, 2, 3, 1, 3, 4));

    let injured: i64 = conn
        .query_row(
            "SELECT player_id FROM injuries WHERE description = 'Hamstring'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    let messi = store::find_players_by_url(&conn, MESSI_URL).unwrap();
    assert_eq!(injured, messi[0].id);

    let (spell_team, spell_start, spell_end): (i64, String, String) = conn
        .query_row(
            "SELECT team_id, start_date, end_date FROM player_team WHERE player_id = ?1",
            [messi[0].id],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .unwrap();
    assert_eq!(spell_team, 1);
    assert_eq!(spell_start, "2004-01-01");
    assert_eq!(spell_end, "1970-01-01");
}

#[test]
fn resolving_twice_adds_nothing() {
    let mut conn = store::open_in_memory().unwrap();
    let fake = la_liga_fixture();
    let keys = ["Spain".to_string()];

    resolve::resolve_leagues(&mut conn, &fake, &keys, LeagueKey::Country).unwrap();
    let before = counts(&conn);
    let again = resolve::resolve_leagues(&mut conn, &fake, &keys, LeagueKey::Country).unwrap();
    assert_eq!(again.len(), 1);
    assert_eq!(counts(&conn), before);
}

#[test]
fn unknown_country_is_skipped_not_fatal() {
    let mut conn = store::open_in_memory().unwrap();
    let fake = la_liga_fixture();

    let leagues = resolve::resolve_leagues(
        &mut conn,
        &fake,
        &["Spain".to_string(), "Atlantis".to_string()],
        LeagueKey::Country,
    )
    .unwrap();
    assert_eq!(leagues.len(), 1);
    assert_eq!(store::count_rows(&conn, Table::Leagues).unwrap(), 1);
}

#[test]
fn ids_continue_from_existing_rows() {
    let mut conn = store::open_in_memory().unwrap();
    let fake = la_liga_fixture();

    store::insert_players(
        &mut conn,
        &[Player {
            id: 50,
            last_name: Some("Placeholder".to_string()),
            birthdate: chrono::NaiveDate::from_ymd_opt(1990, 1, 1).unwrap(),
            ..fixture_player()
        }],
    )
    .unwrap();

    resolve::resolve_leagues(&mut conn, &fake, &["Spain".to_string()], LeagueKey::Country)
        .unwrap();

    let messi = store::find_players_by_url(&conn, MESSI_URL).unwrap();
    let ramos = store::find_players_by_url(&conn, RAMOS_URL).unwrap();
    assert_eq!(messi[0].id, 51);
    assert_eq!(ramos[0].id, 53);
}

#[test]
fn standalone_team_lands_under_its_league() {
    let mut conn = store::open_in_memory().unwrap();
    let mut fake = la_liga_fixture();
    let valencia_url = "/teams/spain/valencia-cf/";
    fake.teams.insert(
        valencia_url.to_string(),
        TeamPage {
            name: "Valencia CF".to_string(),
            url: valencia_url.to_string(),
            league_url: Some(LA_LIGA_URL.to_string()),
        },
    );
    fake.team_searches
        .insert("Valencia Cf".to_string(), valencia_url.to_string());

    let teams = resolve::resolve_teams(
        &mut conn,
        &fake,
        &["valencia cf".to_string()],
        TeamKey::Name,
    )
    .unwrap();

    // The containing league came in first, standings teams included.
    assert_eq!(store::count_rows(&conn, Table::Leagues).unwrap(), 1);
    assert_eq!(store::count_rows(&conn, Table::Teams).unwrap(), 3);
    assert_eq!(teams.len(), 1);
    assert_eq!(teams[0].name, "Valencia CF");
    assert_eq!(teams[0].league_id, 1);
}

#[test]
fn standalone_player_pulls_his_league_then_himself() {
    let mut conn = store::open_in_memory().unwrap();
    let mut fake = la_liga_fixture();
    let cazorla_url = "/players/santi-cazorla/";
    fake.players.insert(
        cazorla_url.to_string(),
        PlayerPage {
            url: cazorla_url.to_string(),
            first_name: Some("Santi".to_string()),
            last_name: Some("Cazorla".to_string()),
            date_of_birth: Some("13 December 1984".to_string()),
            height: Some("165 cm".to_string()),
            weight: Some("66 kg".to_string()),
            foot: Some("Right".to_string()),
            seasons: vec![season("2018/2019", Some(BARCELONA_URL), "1800")],
            ..PlayerPage::default()
        },
    );
    fake.player_searches
        .insert("Cazorla".to_string(), cazorla_url.to_string());

    let players =
        resolve::resolve_players(&mut conn, &fake, &["cazorla".to_string()], PlayerKey::Name)
            .unwrap();

    assert_eq!(players.len(), 1);
    assert_eq!(players[0].last_name.as_deref(), Some("Cazorla"));
    // His league cascade ran first: 3 squad players plus himself.
    assert_eq!(store::count_rows(&conn, Table::Players).unwrap(), 4);
    assert_eq!(players[0].id, 4);
}

#[test]
fn bootstrap_snapshot_restores_identically() {
    let mut conn = store::open_in_memory().unwrap();
    let fake = la_liga_fixture();

    let summary = ingest::bootstrap(&mut conn, &fake, 5).unwrap();
    assert_eq!(summary.leagues, 1);
    assert_eq!(summary.teams, 2);
    assert_eq!(summary.players, 3);

    let dir = tempfile::tempdir().unwrap();
    snapshot::write_dir(dir.path(), &summary.raw_leagues, &summary.raw_batches).unwrap();

    let mut restored = store::open_in_memory().unwrap();
    snapshot::restore(&mut restored, dir.path()).unwrap();
    assert_eq!(counts(&restored), counts(&conn));
}

fn fixture_player() -> Player {
    Player {
        id: 0,
        first_name: None,
        last_name: None,
        nationality: None,
        birthdate: chrono::NaiveDate::default(),
        birthplace: None,
        position: None,
        height: 0.0,
        weight: 0.0,
        foot_right: soccer_injuries::model::Foot::Unknown,
        url: None,
    }
}
