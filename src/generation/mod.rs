pub mod orchestrator;
pub mod state;

pub use orchestrator::{ActivityGenerator, GenerationReport};
pub use state::{GenerationStage, StageTrace};
