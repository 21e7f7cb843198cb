pub mod api;
pub mod config;
pub mod counters;
pub mod error;
pub mod extract;
pub mod html;
pub mod http_client;
pub mod ingest;
pub mod model;
pub mod normalize;
pub mod resolve;
pub mod snapshot;
pub mod store;

pub use error::{Error, Result};
