use std::{future::Future, sync::Arc, time::Duration};

use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::{
    backend::{ModelBackend, ModelRequest},
    context::{ContextBudgeter, SkippedDocument},
    document::DocumentParser,
    error::GenerationError,
    extract::{ResponseExtractor, missing_sections},
    generation::state::{GenerationStage, StageTrace},
    models::{FormConfiguration, GeneratedActivity, UploadedDocument},
    prompt::PromptAssembler,
    shared::config::{DEFAULT_MODEL_TIMEOUT_SECS, GeneratorConfig},
};

/// What a successful run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationReport {
    /// At most the requested quantity, in the order the model returned them
    pub activities: Vec<GeneratedActivity>,
    pub included_documents: Vec<String>,
    pub skipped_documents: Vec<SkippedDocument>,
    pub context_truncated: bool,
    pub prompt_chars: usize,
    pub stages: Vec<GenerationStage>,
}

/// Drives one request from form and documents to a list of activities.
///
/// Runs never retry. Any failure ends the run with a classified
/// [`GenerationError`] and no partial list.
pub struct ActivityGenerator {
    backend: Arc<dyn ModelBackend>,
    budgeter: ContextBudgeter,
    assembler: PromptAssembler,
    extractor: ResponseExtractor,
    model_timeout: Duration,
    strict_sections: bool,
    stage: watch::Sender<GenerationStage>,
}

impl ActivityGenerator {
    pub fn new(backend: Arc<dyn ModelBackend>, parser: DocumentParser) -> Self {
        let (stage, _) = watch::channel(GenerationStage::Idle);
        Self {
            backend,
            budgeter: ContextBudgeter::new(parser),
            assembler: PromptAssembler::default(),
            extractor: ResponseExtractor,
            model_timeout: Duration::from_secs(DEFAULT_MODEL_TIMEOUT_SECS),
            strict_sections: false,
            stage,
        }
    }

    pub fn from_config(
        config: &GeneratorConfig,
        backend: Arc<dyn ModelBackend>,
        parser: DocumentParser,
    ) -> Self {
        Self::new(backend, parser)
            .with_safe_char_limit(config.safe_char_limit)
            .with_model_timeout(Duration::from_secs(config.model_timeout_secs))
            .with_strict_sections(config.strict_sections)
    }

    pub fn with_safe_char_limit(mut self, limit: usize) -> Self {
        self.assembler = PromptAssembler::new(limit);
        self
    }

    pub fn with_model_timeout(mut self, timeout: Duration) -> Self {
        self.model_timeout = timeout;
        self
    }

    pub fn with_strict_sections(mut self, strict: bool) -> Self {
        self.strict_sections = strict;
        self
    }

    /// Follow the stage of the run in progress.
    pub fn subscribe(&self) -> watch::Receiver<GenerationStage> {
        self.stage.subscribe()
    }

    pub async fn generate(
        &self,
        form: &FormConfiguration,
        documents: &[UploadedDocument],
    ) -> Result<GenerationReport, GenerationError> {
        self.generate_until(form, documents, std::future::pending::<()>())
            .await
    }

    /// Like [`generate`](Self::generate), abandoned as soon as `cancel`
    /// completes.
    pub async fn generate_until<C>(
        &self,
        form: &FormConfiguration,
        documents: &[UploadedDocument],
        cancel: C,
    ) -> Result<GenerationReport, GenerationError>
    where
        C: Future<Output = ()>,
    {
        let mut trace = StageTrace::start(&self.stage);
        let outcome = tokio::select! {
            biased;
            _ = cancel => Err(GenerationError::Cancelled),
            result = self.run(form, documents, &mut trace) => result,
        };

        match outcome {
            Ok(mut report) => {
                trace.advance(GenerationStage::Succeeded);
                info!(
                    activities = report.activities.len(),
                    documents = report.included_documents.len(),
                    "generation succeeded"
                );
                report.stages = trace.into_history();
                Ok(report)
            }
            Err(e) => {
                let failed_in = trace.current();
                trace.advance(GenerationStage::Failed);
                error!(stage = %failed_in, kind = e.kind(), error = %e, "generation failed");
                Err(e)
            }
        }
    }

    async fn run(
        &self,
        form: &FormConfiguration,
        documents: &[UploadedDocument],
        trace: &mut StageTrace<'_>,
    ) -> Result<GenerationReport, GenerationError> {
        form.validate()?;

        trace.advance(GenerationStage::ParsingDocuments);
        let (parsed, skipped) = self.budgeter.parse_ready(documents).await;

        trace.advance(GenerationStage::BuildingContext);
        let budget = self.assembler.context_budget(form, !parsed.is_empty());
        let context = ContextBudgeter::fit(&parsed, skipped, budget);
        let prompt = self.assembler.assemble(form, &context);
        debug!(
            prompt_chars = prompt.char_len(),
            context_chars = context.char_len(),
            budget,
            limit = self.assembler.safe_char_limit(),
            "prompt assembled"
        );

        trace.advance(GenerationStage::AwaitingModel);
        let request = ModelRequest::from_prompt(&prompt, self.backend.capability());
        debug!(
            backend = self.backend.name(),
            constrained = request.schema.is_some(),
            timeout_secs = self.model_timeout.as_secs(),
            "invoking model"
        );
        let response = tokio::time::timeout(self.model_timeout, self.backend.invoke(&request))
            .await
            .map_err(|_| GenerationError::Timeout(self.model_timeout.as_secs()))??;

        trace.advance(GenerationStage::ExtractingResult);
        let mut activities = self.extractor.extract(response)?;
        let quantity = usize::from(form.quantity);
        if activities.len() > quantity {
            warn!(
                returned = activities.len(),
                requested = quantity,
                "model returned extra activities, keeping the first ones"
            );
            activities.truncate(quantity);
        } else if activities.len() < quantity {
            warn!(
                returned = activities.len(),
                requested = quantity,
                "model returned fewer activities than requested"
            );
        }
        self.check_sections(&activities)?;

        Ok(GenerationReport {
            activities,
            included_documents: context.included.clone(),
            skipped_documents: context.skipped.clone(),
            context_truncated: context.truncated,
            prompt_chars: prompt.char_len(),
            stages: Vec::new(),
        })
    }

    fn check_sections(&self, activities: &[GeneratedActivity]) -> Result<(), GenerationError> {
        for activity in activities {
            let missing = missing_sections(activity);
            if missing.is_empty() {
                continue;
            }
            if self.strict_sections {
                return Err(GenerationError::MissingSections {
                    title: activity.title.clone(),
                    missing: missing.iter().map(|s| s.to_string()).collect(),
                });
            }
            warn!(title = %activity.title, ?missing, "activity description lacks sections");
        }
        Ok(())
    }
}
