pub mod config;
pub mod telemetry;

pub use config::{BackendKind, GeneratorConfig};
pub use telemetry::init_tracing;
