pub mod extractor;
pub mod sections;

pub use extractor::{ResponseExtractor, activities_from_value, extract_activities};
pub use sections::missing_sections;
