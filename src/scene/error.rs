use std::path::PathBuf;
use thiserror::Error;

use crate::fixture::{Address, StrandId};

#[derive(Debug, Error)]
pub enum SceneError {
    #[error("Fixture address {strand}:{address} is already in use")]
    DuplicateAddress { strand: StrandId, address: Address },

    #[error("No fixture at {strand}:{address}")]
    FixtureNotFound { strand: StrandId, address: Address },

    #[error("Not a scene file: file-type is '{0}'")]
    FileType(String),

    #[error("Scene has no file path; use save_as")]
    NoPath,

    #[error("Failed to access scene file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid scene JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SceneError>;
