use thiserror::Error;

/// Hard failures only. Soft conditions (a key not found on the site, an
/// ambiguous API name match, a child row whose team cannot be resolved) are
/// logged and handled in-flow, never raised.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed date or numeric text in a raw field. Aborts the enclosing
    /// row's insertion rather than storing a wrong value.
    #[error("cannot parse {field} value {value:?}")]
    Parse { field: &'static str, value: String },

    #[error("transport failure")]
    Transport(#[from] reqwest::Error),

    #[error("store failure")]
    Store(#[from] rusqlite::Error),

    #[error("malformed payload: {0}")]
    Payload(String),

    #[error("snapshot i/o failure")]
    Io(#[from] std::io::Error),

    #[error("snapshot encoding failure")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn parse(field: &'static str, value: impl Into<String>) -> Self {
        Error::Parse {
            field,
            value: value.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
