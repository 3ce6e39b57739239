pub mod filter;

pub use filter::{ActivityFilter, available_subjects};
