pub mod markdown;

pub use markdown::{DEFAULT_FILE_NAME, to_markdown};
