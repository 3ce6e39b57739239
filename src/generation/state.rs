use std::fmt;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::info;

/// Where a generation run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationStage {
    #[default]
    Idle,
    ParsingDocuments,
    BuildingContext,
    AwaitingModel,
    ExtractingResult,
    Succeeded,
    Failed,
}

impl GenerationStage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, GenerationStage::Succeeded | GenerationStage::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationStage::Idle => "idle",
            GenerationStage::ParsingDocuments => "parsing_documents",
            GenerationStage::BuildingContext => "building_context",
            GenerationStage::AwaitingModel => "awaiting_model",
            GenerationStage::ExtractingResult => "extracting_result",
            GenerationStage::Succeeded => "succeeded",
            GenerationStage::Failed => "failed",
        }
    }
}

impl fmt::Display for GenerationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stages visited by one run, mirrored to a watch channel for observers.
#[derive(Debug)]
pub struct StageTrace<'a> {
    history: Vec<GenerationStage>,
    publisher: &'a watch::Sender<GenerationStage>,
}

impl<'a> StageTrace<'a> {
    pub fn start(publisher: &'a watch::Sender<GenerationStage>) -> Self {
        publisher.send_replace(GenerationStage::Idle);
        Self {
            history: vec![GenerationStage::Idle],
            publisher,
        }
    }

    pub fn current(&self) -> GenerationStage {
        self.history
            .last()
            .copied()
            .unwrap_or(GenerationStage::Idle)
    }

    /// Moves to `stage`. Ignored once the run has finished.
    pub fn advance(&mut self, stage: GenerationStage) {
        let from = self.current();
        if from.is_terminal() || from == stage {
            return;
        }
        info!(from = %from, to = %stage, "generation stage");
        self.history.push(stage);
        self.publisher.send_replace(stage);
    }

    pub fn history(&self) -> &[GenerationStage] {
        &self.history
    }

    pub fn into_history(self) -> Vec<GenerationStage> {
        self.history
    }
}
