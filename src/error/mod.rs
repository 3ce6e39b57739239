pub mod generation_error;

use std::io;

use thiserror::Error as ThisError;

pub use crate::error::generation_error::GenerationError;

#[derive(ThisError, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("serde_json error: {0}")]
    SerdeJsonError(#[from] serde_json::Error),

    #[error("http error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("base64 error: {0}")]
    Base64Error(#[from] base64::DecodeError),

    #[error("generation error: {0}")]
    GenerationError(#[from] GenerationError),

    #[error("config error: {0}")]
    ConfigError(String),

    #[error("stored value under {key} is unreadable: {reason}")]
    CorruptState { key: String, reason: String },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("nothing to export")]
    NothingToExport,
}

pub type Result<T> = core::result::Result<T, Error>;
