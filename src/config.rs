use std::path::PathBuf;

/// Base url of the scraped site. All relative hrefs found in pages are joined
/// onto this.
pub const SOCCER_URL: &str = "https://int.soccerway.com";

/// How many leagues the bootstrap run takes from the competitions index.
pub const TOP_LEAGUES_NUM: usize = 5;

/// Commit granularity for child-table batches.
pub const BATCH_COMMIT_ROWS: usize = 1000;

/// Countries available on the JSON API side, with their tournament codes.
pub const API_TOURNAMENTS: &[(&str, u32)] = &[
    ("Spain", 8),
    ("England", 17),
    ("Italy", 23),
    ("France", 34),
    ("Germany", 35),
    ("Netherlands", 37),
    ("Belgium", 38),
    ("Turkey", 52),
    ("Greece", 185),
    ("Russia", 203),
    ("Ukraine", 218),
    ("Portugal", 238),
];

pub fn api_tournament_code(country: &str) -> Option<u32> {
    API_TOURNAMENTS
        .iter()
        .find(|(name, _)| *name == country)
        .map(|(_, code)| *code)
}

/// Database location: explicit path wins, then SOCCER_DB, then a file in the
/// working directory.
pub fn db_path(explicit: Option<PathBuf>) -> PathBuf {
    if let Some(path) = explicit {
        return path;
    }
    if let Ok(raw) = std::env::var("SOCCER_DB")
        && !raw.trim().is_empty()
    {
        return PathBuf::from(raw.trim());
    }
    PathBuf::from("soccer_injuries.sqlite")
}

pub fn api_key() -> Option<String> {
    std::env::var("SPORTRADAR_API_KEY")
        .ok()
        .filter(|k| !k.trim().is_empty())
}
