pub mod assembler;
pub mod builder;
pub mod schema;

pub use assembler::{AssembledPrompt, PromptAssembler};
pub use builder::{CONTEXT_END, CONTEXT_START, NOT_FOUND_SENTINEL, REQUIRED_SECTIONS};
pub use schema::{ACTIVITIES_FIELD, activities_schema};
