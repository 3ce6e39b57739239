pub mod activity;
pub mod document;
pub mod form;

pub use activity::{Activity, GeneratedActivity};
pub use document::{DocumentStatus, UploadedDocument};
pub use form::{FormConfiguration, Level, Pillar};
