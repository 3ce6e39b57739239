//! Curriculum-aligned lesson activity generation.
//!
//! A [`FormConfiguration`](models::FormConfiguration) and a set of uploaded
//! supporting documents go in; an ordered list of structured activities comes
//! out. Documents are parsed to text, fitted into a character budget, and
//! assembled with the task into one prompt. The model's answer is then mined
//! for the JSON payload.

pub mod backend;
pub mod catalog;
pub mod context;
pub mod document;
pub mod error;
pub mod export;
pub mod extract;
pub mod generation;
pub mod models;
pub mod prompt;
pub mod shared;
pub mod storage;
pub mod utils;

pub use error::{Error, GenerationError, Result};
pub use generation::{ActivityGenerator, GenerationReport, GenerationStage};
