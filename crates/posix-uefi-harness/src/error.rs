//! Harness error type.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("cannot load fixture {path}: {source}")]
    Fixture {
        path: PathBuf,
        #[source]
        source: Box<HarnessError>,
    },
    #[error("no fixture JSON files found in {0}")]
    NoFixtures(PathBuf),
    #[error("unknown operation `{0}`")]
    UnknownOperation(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
}
