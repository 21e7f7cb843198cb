//! Page extraction: the seam between the reconciliation core and the scraped
//! site. `PageSource` is the consumed interface — "no matching element" is
//! `None`, never an error — and `SiteSource` is the live implementation over
//! soccerway-style markup. Tests substitute their own `PageSource`.

use std::collections::{BTreeMap, BTreeSet};

use reqwest::blocking::Client;
use reqwest::header::USER_AGENT;
use reqwest::StatusCode;

use crate::config::SOCCER_URL;
use crate::error::{Error, Result};
use crate::html;

#[derive(Debug, Clone, PartialEq)]
pub struct LeagueRef {
    pub name: String,
    pub country: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TeamRef {
    pub name: String,
    pub url: String,
}

/// A league page: identity plus the standings table's teams.
#[derive(Debug, Clone, PartialEq)]
pub struct LeaguePage {
    pub name: String,
    pub country: String,
    pub url: String,
    pub teams: Vec<TeamRef>,
}

/// A team page: identity plus the url of the league table it embeds.
#[derive(Debug, Clone, PartialEq)]
pub struct TeamPage {
    pub name: String,
    pub url: String,
    pub league_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InjuryCells {
    pub description: String,
    pub start: String,
    pub end: Option<String>,
}

/// One row of the career table; stat cells stay raw text ("?" included).
#[derive(Debug, Clone, PartialEq)]
pub struct SeasonCells {
    pub season: String,
    pub team_name: Option<String>,
    pub team_url: Option<String>,
    pub competition_url: Option<String>,
    pub minutes_played: String,
    pub appearances: String,
    pub lineups: String,
    pub substitute_in: String,
    pub substitute_out: String,
    pub on_bench: String,
    pub goals: String,
    pub yellow_card: String,
    pub yellow_2nd: String,
    pub red_card: String,
}

impl SeasonCells {
    pub fn empty(season: String) -> Self {
        let unknown = || "?".to_string();
        SeasonCells {
            season,
            team_name: None,
            team_url: None,
            competition_url: None,
            minutes_played: unknown(),
            appearances: unknown(),
            lineups: unknown(),
            substitute_in: unknown(),
            substitute_out: unknown(),
            on_bench: unknown(),
            goals: unknown(),
            yellow_card: unknown(),
            yellow_2nd: unknown(),
            red_card: unknown(),
        }
    }
}

/// One row of the transfers table, most recent first as rendered.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferCells {
    pub date: String,
    pub from_name: String,
    pub from_url: String,
    pub to_name: String,
    pub to_url: String,
}

/// Everything lifted from one player page: passport fields raw, plus the
/// sidelined, career and transfers tables.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PlayerPage {
    pub url: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub nationality: Option<String>,
    pub date_of_birth: Option<String>,
    pub country_of_birth: Option<String>,
    pub position: Option<String>,
    pub height: Option<String>,
    pub weight: Option<String>,
    pub foot: Option<String>,
    pub injuries: Vec<InjuryCells>,
    pub seasons: Vec<SeasonCells>,
    pub transfers: Vec<TransferCells>,
}

impl PlayerPage {
    /// Url of the competition on the player's most recent career row, used
    /// to pull in the player's current league before inserting him.
    pub fn current_league_url(&self) -> Option<&str> {
        self.seasons
            .first()
            .and_then(|s| s.competition_url.as_deref())
    }
}

pub trait PageSource {
    fn league_by_url(&self, url: &str) -> Result<Option<LeaguePage>>;
    fn team_by_url(&self, url: &str) -> Result<Option<TeamPage>>;
    fn player_by_url(&self, url: &str) -> Result<Option<PlayerPage>>;

    /// First ranked search result, already fetched.
    fn search_league(&self, query: &str) -> Result<Option<LeaguePage>>;
    fn search_team(&self, query: &str) -> Result<Option<TeamPage>>;
    fn search_player(&self, query: &str) -> Result<Option<PlayerPage>>;

    /// Countries listed on the competitions index.
    fn known_countries(&self) -> Result<BTreeSet<String>>;
    /// The country's first league, via the country page indirection.
    fn league_by_country(&self, country: &str) -> Result<Option<LeaguePage>>;
    /// First `n` leagues of the competitions index, for bootstrap runs.
    fn top_leagues(&self, n: usize) -> Result<Vec<LeagueRef>>;

    /// Player page urls on a team's squad page.
    fn squad(&self, team_url: &str) -> Result<Vec<String>>;
}

// ---------------------------------------------------------------------------
// Live implementation
// ---------------------------------------------------------------------------

pub struct SiteSource {
    client: &'static Client,
    base: String,
}

impl SiteSource {
    pub fn new(client: &'static Client) -> Self {
        SiteSource {
            client,
            base: SOCCER_URL.to_string(),
        }
    }

    fn absolute(&self, href: &str) -> String {
        if href.starts_with("http") {
            href.to_string()
        } else {
            format!("{}{}", self.base, href)
        }
    }

    /// Blocking page fetch. 404 means "no such entity"; other failures are
    /// hard transport/payload errors.
    fn fetch(&self, url: &str) -> Result<Option<String>> {
        let resp = self
            .client
            .get(url)
            .header(USER_AGENT, "Mozilla/5.0")
            .send()?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(Error::Payload(format!("http {} for {url}", resp.status())));
        }
        Ok(Some(resp.text()?))
    }

    fn countries(&self) -> Result<BTreeMap<String, String>> {
        let Some(page) = self.fetch(&format!("{}/competitions/", self.base))? else {
            return Ok(BTreeMap::new());
        };
        let Some(areas) = html::find_block(&page, "ul", "areas") else {
            return Ok(BTreeMap::new());
        };
        let mut out = BTreeMap::new();
        for row in html::blocks(areas, "div", "row") {
            if let Some((label, href)) = html::first_anchor(row) {
                out.insert(title_case(&label), self.absolute(&href));
            }
        }
        Ok(out)
    }

    /// First result of a soccerway search page, as an absolute url.
    fn first_search_hit(&self, kind: &str, query: &str) -> Result<Option<String>> {
        let url = format!("{}/search/{kind}/?q={query}", self.base);
        let Some(page) = self.fetch(&url)? else {
            return Ok(None);
        };
        let href = if kind == "players" {
            html::find_block(&page, "table", "playerstats table")
                .and_then(|table| html::find_block(table, "td", "player"))
                .and_then(|cell| html::first_anchor(cell))
                .map(|(_, href)| href)
        } else {
            html::find_block(&page, "ul", "tree search-results")
                .and_then(|list| html::find_block(list, "li", ""))
                .and_then(|item| html::first_anchor(item))
                .map(|(_, href)| href)
        };
        Ok(href.map(|h| self.absolute(&h)))
    }

    fn parse_league_page(&self, page: &str, url: &str) -> Option<LeaguePage> {
        let name = html::find_block(page, "h1", "").map(html::text)?;
        let country = html::find_block(page, "h2", "")
            .map(html::text)
            .unwrap_or_default();
        let mut teams = Vec::new();
        if let Some(table) = html::find_block(page, "table", "leaguetable sortable table") {
            for cell in html::blocks(table, "td", "text team large-link") {
                let Some((label, href)) = html::first_anchor(cell) else {
                    continue;
                };
                let team_name = html::attr(cell, "title").unwrap_or(label);
                teams.push(TeamRef {
                    name: team_name,
                    url: self.absolute(&href),
                });
            }
        }
        Some(LeaguePage {
            name,
            country,
            url: url.to_string(),
            teams,
        })
    }

    fn parse_team_page(&self, page: &str, url: &str) -> Option<TeamPage> {
        let name = html::find_block(page, "h1", "").map(html::text)?;
        let league_url = html::find_block(page, "div", "block_team_table")
            .and_then(|block| html::find_block(block, "h2", ""))
            .and_then(|heading| html::first_anchor(heading))
            .map(|(_, href)| self.absolute(&href));
        Some(TeamPage {
            name,
            url: url.to_string(),
            league_url,
        })
    }

    fn parse_player_page(&self, page: &str, url: &str) -> Option<PlayerPage> {
        let passport = html::find_block(page, "div", "block_player_passport")?;
        let labels: Vec<String> = html::blocks(passport, "dt", "")
            .into_iter()
            .map(html::text)
            .collect();
        let values: Vec<String> = html::blocks(passport, "dd", "")
            .into_iter()
            .map(html::text)
            .collect();
        let field = |name: &str| -> Option<String> {
            labels
                .iter()
                .position(|l| l == name)
                .and_then(|i| values.get(i))
                .filter(|v| !v.is_empty())
                .cloned()
        };

        let mut out = PlayerPage {
            url: url.to_string(),
            first_name: field("First name"),
            last_name: field("Last name"),
            nationality: field("Nationality"),
            date_of_birth: field("Date of birth"),
            country_of_birth: field("Country of birth"),
            position: field("Position"),
            height: field("Height"),
            weight: field("Weight"),
            foot: field("Foot"),
            ..PlayerPage::default()
        };

        out.injuries = self.parse_sidelined(page);
        out.seasons = self.parse_career(page);
        out.transfers = self.parse_transfers(page);
        Some(out)
    }

    fn parse_sidelined(&self, page: &str) -> Vec<InjuryCells> {
        let Some(table) = html::find_block(page, "table", "sidelined table") else {
            return Vec::new();
        };
        let mut out = Vec::new();
        for row in html::blocks(table, "tr", "odd") {
            let cells = html::tagged_blocks(row, "td");
            let Some((first_open, _)) = cells.first() else {
                continue;
            };
            let Some(description) = html::attr(first_open, "title") else {
                continue;
            };
            let start = cells
                .iter()
                .find(|(open, _)| open.contains("startdate"))
                .map(|(_, inner)| html::text(inner))
                .unwrap_or_default();
            let end = cells
                .iter()
                .find(|(open, _)| open.contains("enddate"))
                .map(|(_, inner)| html::text(inner))
                .filter(|t| !t.is_empty());
            out.push(InjuryCells {
                description,
                start,
                end,
            });
        }
        out
    }

    fn parse_career(&self, page: &str) -> Vec<SeasonCells> {
        let Some(table) = html::find_block(page, "table", "playerstats career sortable table")
        else {
            return Vec::new();
        };
        // First three headers carry text, the rest only a title attribute.
        let headers: Vec<String> = html::find_block(table, "thead", "")
            .map(|thead| {
                html::blocks(thead, "th", "")
                    .into_iter()
                    .enumerate()
                    .map(|(i, th)| {
                        if i <= 2 {
                            html::text(th)
                        } else {
                            html::attr(th, "title").unwrap_or_else(|| html::text(th))
                        }
                    })
                    .collect()
            })
            .unwrap_or_default();

        let Some(body) = html::find_block(table, "tbody", "") else {
            return Vec::new();
        };
        let mut out = Vec::new();
        for row in html::blocks(body, "tr", "") {
            let cells = html::blocks(row, "td", "");
            if cells.is_empty() {
                continue;
            }
            let mut season = SeasonCells::empty(html::text(cells[0]));
            for (header, cell) in headers.iter().zip(&cells) {
                let value = html::text(cell);
                match header.as_str() {
                    "Season" => season.season = value,
                    "Comp" | "Competition" => {
                        season.competition_url =
                            html::attr(cell, "href").map(|h| self.absolute(&h));
                    }
                    "Team" => {
                        season.team_name = html::attr(cell, "title").or_else(|| {
                            html::first_anchor(cell).map(|(label, _)| label)
                        });
                        season.team_url = html::attr(cell, "href").map(|h| self.absolute(&h));
                    }
                    "Minutes played" => season.minutes_played = value,
                    "Appearances" => season.appearances = value,
                    "Lineups" => season.lineups = value,
                    "Substitute in" => season.substitute_in = value,
                    "Substitute out" => season.substitute_out = value,
                    "Substitutes on bench" => season.on_bench = value,
                    "Goal" => season.goals = value,
                    "Yellow card" => season.yellow_card = value,
                    "Yellow 2nd/RC" => season.yellow_2nd = value,
                    "Red card" => season.red_card = value,
                    _ => {}
                }
            }
            out.push(season);
        }
        out
    }

    fn parse_transfers(&self, page: &str) -> Vec<TransferCells> {
        let Some(table) = html::find_block(page, "table", "transfers table") else {
            return Vec::new();
        };
        let mut out = Vec::new();
        for (open, row) in html::tagged_blocks(table, "tr") {
            if !open.contains("odd") && !open.contains("even") {
                continue;
            }
            let cells = html::blocks(row, "td", "");
            if cells.len() < 3 {
                continue;
            }
            let Some((from_name, from_href)) = anchor_with_title(cells[1]) else {
                continue;
            };
            let Some((to_name, to_href)) = anchor_with_title(cells[2]) else {
                continue;
            };
            out.push(TransferCells {
                date: html::text(cells[0]),
                from_name,
                from_url: self.absolute(&from_href),
                to_name,
                to_url: self.absolute(&to_href),
            });
        }
        out
    }
}

fn anchor_with_title(cell: &str) -> Option<(String, String)> {
    let (label, href) = html::first_anchor(cell)?;
    Some((html::attr(cell, "title").unwrap_or(label), href))
}

impl PageSource for SiteSource {
    fn league_by_url(&self, url: &str) -> Result<Option<LeaguePage>> {
        let Some(page) = self.fetch(url)? else {
            return Ok(None);
        };
        Ok(self.parse_league_page(&page, url))
    }

    fn team_by_url(&self, url: &str) -> Result<Option<TeamPage>> {
        let Some(page) = self.fetch(url)? else {
            return Ok(None);
        };
        Ok(self.parse_team_page(&page, url))
    }

    fn player_by_url(&self, url: &str) -> Result<Option<PlayerPage>> {
        let Some(page) = self.fetch(url)? else {
            return Ok(None);
        };
        Ok(self.parse_player_page(&page, url))
    }

    fn search_league(&self, query: &str) -> Result<Option<LeaguePage>> {
        match self.first_search_hit("competitions", query)? {
            Some(url) => self.league_by_url(&url),
            None => Ok(None),
        }
    }

    fn search_team(&self, query: &str) -> Result<Option<TeamPage>> {
        match self.first_search_hit("teams", query)? {
            Some(url) => self.team_by_url(&url),
            None => Ok(None),
        }
    }

    fn search_player(&self, query: &str) -> Result<Option<PlayerPage>> {
        match self.first_search_hit("players", query)? {
            Some(url) => self.player_by_url(&url),
            None => Ok(None),
        }
    }

    fn known_countries(&self) -> Result<BTreeSet<String>> {
        Ok(self.countries()?.into_keys().collect())
    }

    fn league_by_country(&self, country: &str) -> Result<Option<LeaguePage>> {
        let Some(country_url) = self.countries()?.get(country).cloned() else {
            return Ok(None);
        };
        let Some(page) = self.fetch(&country_url)? else {
            return Ok(None);
        };
        let Some(href) = html::find_block(&page, "ul", "left-tree")
            .and_then(|tree| html::find_block(tree, "li", ""))
            .and_then(|item| html::first_anchor(item))
            .map(|(_, href)| href)
        else {
            return Ok(None);
        };
        self.league_by_url(&self.absolute(&href))
    }

    fn top_leagues(&self, n: usize) -> Result<Vec<LeagueRef>> {
        let Some(page) = self.fetch(&format!("{}/competitions/", self.base))? else {
            return Ok(Vec::new());
        };
        let mut out = Vec::new();
        for (open, item) in html::tagged_blocks(&page, "li") {
            if !open.contains("odd") && !open.contains("even") {
                continue;
            }
            let Some((_, href)) = html::first_anchor(item) else {
                continue;
            };
            // The country sits inside the national-competition href.
            let country = href
                .rsplit("national/")
                .next()
                .and_then(|tail| tail.split('/').next())
                .map(title_case)
                .unwrap_or_default();
            out.push(LeagueRef {
                name: html::text(item),
                country,
                url: self.absolute(&href),
            });
            if out.len() == n {
                break;
            }
        }
        Ok(out)
    }

    fn squad(&self, team_url: &str) -> Result<Vec<String>> {
        let squad_url = format!("{}squad/", ensure_trailing_slash(team_url));
        let Some(page) = self.fetch(&squad_url)? else {
            return Ok(Vec::new());
        };
        let Some(table) = html::find_block(&page, "table", "table squad") else {
            return Ok(Vec::new());
        };
        let mut out = Vec::new();
        for cell in html::blocks(table, "td", "name large-link") {
            if let Some((_, href)) = html::first_anchor(cell) {
                out.push(self.absolute(&href));
            }
        }
        Ok(out)
    }
}

fn ensure_trailing_slash(url: &str) -> String {
    if url.ends_with('/') {
        url.to_string()
    } else {
        format!("{url}/")
    }
}

/// Title-case every whitespace-separated word, ASCII-only on the first
/// letter, the way country labels are normalized throughout.
pub fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
