#[cfg(test)]
mod generation_tests {
    use std::{collections::VecDeque, sync::Arc, time::Duration};

    use async_trait::async_trait;
    use lesson_forge::{
        ActivityGenerator, GenerationError, GenerationStage,
        backend::{BackendCapability, ModelBackend, ModelRequest, ModelResponse},
        context::TRUNCATION_MARKER,
        document::{DocumentParser, data_url},
        models::{
            FormConfiguration, GeneratedActivity, Level, Pillar, UploadedDocument,
            document::{MEDIA_TYPE_PDF, MEDIA_TYPE_TEXT},
        },
        prompt::{CONTEXT_START, NOT_FOUND_SENTINEL},
    };
    use tokio::sync::Mutex;

    type Reply = Result<ModelResponse, GenerationError>;

    /// Replays canned replies and records every request it receives.
    struct ScriptedBackend {
        capability: BackendCapability,
        replies: Mutex<VecDeque<Reply>>,
        requests: Mutex<Vec<ModelRequest>>,
        delay: Option<Duration>,
    }

    impl ScriptedBackend {
        fn new(capability: BackendCapability, replies: Vec<Reply>) -> Arc<Self> {
            Arc::new(Self {
                capability,
                replies: Mutex::new(replies.into()),
                requests: Mutex::new(Vec::new()),
                delay: None,
            })
        }

        fn slow(delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                capability: BackendCapability::FreeText,
                replies: Mutex::new(VecDeque::new()),
                requests: Mutex::new(Vec::new()),
                delay: Some(delay),
            })
        }

        async fn requests(&self) -> Vec<ModelRequest> {
            self.requests.lock().await.clone()
        }
    }

    #[async_trait]
    impl ModelBackend for ScriptedBackend {
        fn name(&self) -> &str {
            "scripted"
        }

        fn capability(&self) -> BackendCapability {
            self.capability
        }

        async fn invoke(&self, request: &ModelRequest) -> Reply {
            self.requests.lock().await.push(request.clone());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.replies
                .lock()
                .await
                .pop_front()
                .unwrap_or_else(|| Err(GenerationError::ModelInvocation("script exhausted".into())))
        }
    }

    fn fractions_form(quantity: u8) -> FormConfiguration {
        FormConfiguration::new(
            "Matemática",
            "Frações",
            "6º Ano",
            Pillar::Algorithms,
            Level::Medium,
            quantity,
        )
    }

    fn activity(title: &str) -> GeneratedActivity {
        GeneratedActivity {
            title: title.to_string(),
            description: "**Contextualização:** receita de bolo\n\
                          **Objetivos de Aprendizagem:**\n- somar frações\n\
                          **Passo a Passo da Atividade:**\n1. medir\n\
                          **Avaliação:** observação"
                .to_string(),
            bncc_competency: "EF06MA07".to_string(),
            bncc_computing_competency: "EF06CO01".to_string(),
            estimated_duration: 50,
            required_resources: vec!["copos medidores".to_string()],
        }
    }

    fn fenced_reply(titles: &[&str]) -> Reply {
        let activities: Vec<GeneratedActivity> = titles.iter().map(|t| activity(t)).collect();
        let json = serde_json::to_string_pretty(&serde_json::json!({ "atividades": activities }))
            .unwrap();
        Ok(ModelResponse::Text(format!(
            "Claro! Aqui estão as atividades:\n```json\n{json}\n```\nBom trabalho!"
        )))
    }

    fn text_document(name: &str, text: &str) -> UploadedDocument {
        UploadedDocument::ready(
            name,
            MEDIA_TYPE_TEXT,
            data_url::encode(MEDIA_TYPE_TEXT, text.as_bytes()),
        )
    }

    #[tokio::test]
    async fn test_fractions_without_documents() {
        let backend = ScriptedBackend::new(
            BackendCapability::FreeText,
            vec![fenced_reply(&["Receita de Frações", "Pizza Dividida"])],
        );
        let generator = ActivityGenerator::new(backend.clone(), DocumentParser::new());

        let report = generator.generate(&fractions_form(2), &[]).await.unwrap();

        let titles: Vec<&str> = report.activities.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, vec!["Receita de Frações", "Pizza Dividida"]);
        assert!(report.included_documents.is_empty());
        assert!(!report.context_truncated);
        assert_eq!(
            report.stages,
            vec![
                GenerationStage::Idle,
                GenerationStage::ParsingDocuments,
                GenerationStage::BuildingContext,
                GenerationStage::AwaitingModel,
                GenerationStage::ExtractingResult,
                GenerationStage::Succeeded,
            ]
        );

        let requests = backend.requests().await;
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert!(request.user.contains("exatamente 2 entradas"));
        assert!(request.user.contains("\"Matemática\""));
        assert!(!request.user.contains(CONTEXT_START));
        assert!(!request.user.contains(NOT_FOUND_SENTINEL));
        assert!(request.schema.is_none());
        assert_eq!(*generator.subscribe().borrow(), GenerationStage::Succeeded);
    }

    #[tokio::test]
    async fn test_rate_limit_is_carried_unchanged() {
        let backend = ScriptedBackend::new(
            BackendCapability::FreeText,
            vec![Err(GenerationError::RateLimited { retry_after_secs: 12 })],
        );
        let generator = ActivityGenerator::new(backend, DocumentParser::new());
        let stage = generator.subscribe();

        let err = generator.generate(&fractions_form(1), &[]).await.unwrap_err();

        assert_eq!(err, GenerationError::RateLimited { retry_after_secs: 12 });
        assert_eq!(err.retry_after_secs(), Some(12));
        assert!(err.user_message().contains("12 segundos"));
        assert_eq!(*stage.borrow(), GenerationStage::Failed);
    }

    #[tokio::test]
    async fn test_unreadable_documents_are_skipped() {
        let backend = ScriptedBackend::new(
            BackendCapability::FreeText,
            vec![fenced_reply(&["Frações na Feira"])],
        );
        let generator = ActivityGenerator::new(backend.clone(), DocumentParser::new());

        let mut pending = text_document("rascunho.txt", "ainda enviando");
        pending.status = Default::default();
        let documents = vec![
            text_document("notas.txt", "Frações representam partes de um inteiro."),
            UploadedDocument::ready(
                "apostila.pdf",
                MEDIA_TYPE_PDF,
                data_url::encode(MEDIA_TYPE_PDF, b"%PDF-1.4"),
            ),
            pending,
        ];

        let report = generator.generate(&fractions_form(1), &documents).await.unwrap();

        assert_eq!(report.activities.len(), 1);
        assert_eq!(report.included_documents, vec!["notas.txt".to_string()]);
        assert_eq!(report.skipped_documents.len(), 1);
        assert_eq!(report.skipped_documents[0].name, "apostila.pdf");
        assert_eq!(report.skipped_documents[0].error.kind(), "extractor_unavailable");

        let request = &backend.requests().await[0];
        assert!(request.user.contains(CONTEXT_START));
        assert!(request.user.contains("partes de um inteiro"));
        assert!(request.user.contains(NOT_FOUND_SENTINEL));
        assert!(!request.user.contains("ainda enviando"));
    }

    #[tokio::test]
    async fn test_large_document_is_truncated_under_the_limit() {
        let backend = ScriptedBackend::new(
            BackendCapability::FreeText,
            vec![fenced_reply(&["Frações Gigantes"])],
        );
        let generator = ActivityGenerator::new(backend.clone(), DocumentParser::new())
            .with_safe_char_limit(20_000);
        let documents = vec![text_document("livro.txt", &"fração ".repeat(70_000))];

        let report = generator.generate(&fractions_form(1), &documents).await.unwrap();

        assert!(report.context_truncated);
        assert!(report.prompt_chars <= 20_000);
        let request = &backend.requests().await[0];
        assert!(request.user.contains(TRUNCATION_MARKER));
    }

    #[tokio::test]
    async fn test_schema_constrained_backend_gets_the_schema() {
        let value = serde_json::json!({ "atividades": [activity("Frações com Lego")] });
        let backend = ScriptedBackend::new(
            BackendCapability::SchemaConstrained,
            vec![Ok(ModelResponse::Structured(value))],
        );
        let generator = ActivityGenerator::new(backend.clone(), DocumentParser::new());

        let report = generator.generate(&fractions_form(1), &[]).await.unwrap();

        assert_eq!(report.activities[0].title, "Frações com Lego");
        let request = &backend.requests().await[0];
        let schema = request.schema.as_ref().unwrap();
        assert_eq!(schema["properties"]["atividades"]["maxItems"], 1);
    }

    #[tokio::test]
    async fn test_extra_activities_are_dropped() {
        let backend = ScriptedBackend::new(
            BackendCapability::FreeText,
            vec![fenced_reply(&["Primeira", "Segunda", "Terceira"])],
        );
        let generator = ActivityGenerator::new(backend, DocumentParser::new());

        let report = generator.generate(&fractions_form(2), &[]).await.unwrap();

        let titles: Vec<&str> = report.activities.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, vec!["Primeira", "Segunda"]);
    }

    #[tokio::test]
    async fn test_refusal_fails_without_partial_list() {
        let backend = ScriptedBackend::new(
            BackendCapability::FreeText,
            vec![Ok(ModelResponse::Text("Sorry, I can't help with that.".into()))],
        );
        let generator = ActivityGenerator::new(backend, DocumentParser::new());

        let err = generator.generate(&fractions_form(1), &[]).await.unwrap_err();

        assert!(matches!(err, GenerationError::NoStructuredPayloadFound { .. }));
    }

    #[tokio::test]
    async fn test_strict_sections_reject_incomplete_descriptions() {
        let mut incomplete = activity("Sem Avaliação");
        incomplete.description = "**Contextualização:** apenas isso".into();
        let value = serde_json::json!({ "atividades": [incomplete] });

        let lenient = ActivityGenerator::new(
            ScriptedBackend::new(
                BackendCapability::SchemaConstrained,
                vec![Ok(ModelResponse::Structured(value.clone()))],
            ),
            DocumentParser::new(),
        );
        assert_eq!(lenient.generate(&fractions_form(1), &[]).await.unwrap().activities.len(), 1);

        let strict = ActivityGenerator::new(
            ScriptedBackend::new(
                BackendCapability::SchemaConstrained,
                vec![Ok(ModelResponse::Structured(value))],
            ),
            DocumentParser::new(),
        )
        .with_strict_sections(true);
        match strict.generate(&fractions_form(1), &[]).await.unwrap_err() {
            GenerationError::MissingSections { title, missing } => {
                assert_eq!(title, "Sem Avaliação");
                assert_eq!(missing.len(), 3);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_invalid_form_never_reaches_the_model() {
        let backend = ScriptedBackend::new(BackendCapability::FreeText, vec![]);
        let generator = ActivityGenerator::new(backend.clone(), DocumentParser::new());

        let err = generator.generate(&fractions_form(0), &[]).await.unwrap_err();

        assert_eq!(err.kind(), "invalid_form");
        assert!(backend.requests().await.is_empty());
    }

    #[tokio::test]
    async fn test_slow_model_times_out() {
        let generator = ActivityGenerator::new(
            ScriptedBackend::slow(Duration::from_secs(5)),
            DocumentParser::new(),
        )
        .with_model_timeout(Duration::from_millis(50));

        let err = generator.generate(&fractions_form(1), &[]).await.unwrap_err();

        assert_eq!(err.kind(), "timeout");
    }

    #[tokio::test]
    async fn test_cancellation_aborts_the_run() {
        let backend = ScriptedBackend::slow(Duration::from_secs(5));
        let generator = ActivityGenerator::new(backend.clone(), DocumentParser::new());
        let stage = generator.subscribe();

        let cancel = tokio::time::sleep(Duration::from_millis(50));
        let err = generator
            .generate_until(&fractions_form(1), &[], cancel)
            .await
            .unwrap_err();

        assert_eq!(err, GenerationError::Cancelled);
        assert_eq!(*stage.borrow(), GenerationStage::Failed);
        assert_eq!(backend.requests().await.len(), 1);
    }
}
