pub mod budget;

pub use budget::{
    AssembledContext, Combined, ContextBudgeter, ParsedDocument, SkippedDocument, TRUNCATION_MARKER,
    combine,
};
