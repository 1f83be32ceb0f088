use chrono::Utc;
use std::sync::Arc;

use crate::error::{AnalyzerError, ValidationError};
use crate::handlers::form::SubmissionForm;
use crate::models::{AnalysisRequest, AnalysisResult, HistoryEntry};
use crate::prompt::build_prompt;
use crate::services::InferenceClient;
use crate::session::Session;

pub struct SubmissionHandler {
    inference: Arc<dyn InferenceClient>,
}

impl SubmissionHandler {
    pub fn new(inference: Arc<dyn InferenceClient>) -> Self {
        Self { inference }
    }

    pub fn model_name(&self) -> &str {
        self.inference.model_name()
    }

    /// Handle the "submit" action for one session. The caller holds the
    /// session lock, so the session is Processing for the whole call.
    pub async fn submit(
        &self,
        session: &mut Session,
        form: SubmissionForm,
    ) -> Result<AnalysisResult, AnalyzerError> {
        let request = match Self::validate(form) {
            Ok(request) => request,
            Err(e) => {
                log::warn!("⚠️ Rejected submission in session {}: {}", session.id(), e);
                return Err(e.into());
            }
        };

        log::info!(
            "📨 Submission in session {} | Prompt: '{}' | Image: {} ({} bytes) | Goal: {:?}",
            session.id(),
            request.prompt,
            request.image.mime_type,
            request.image.bytes.len(),
            request.goal.as_ref().map(|g| g.direction)
        );

        let instructions = build_prompt(request.goal.as_ref());

        session.begin_processing();
        let outcome = self
            .inference
            .generate(&instructions, &request.image, &request.prompt)
            .await;
        session.finish_processing();

        match outcome {
            Ok(result) => {
                session.record(HistoryEntry {
                    prompt: request.prompt,
                    result: result.clone(),
                    image: request.image,
                    created_at: Utc::now(),
                });
                log::info!(
                    "✅ Analysis stored in session {} (history: {})",
                    session.id(),
                    session.history().len()
                );
                Ok(result)
            }
            Err(e) => {
                log::error!("❌ Analysis failed in session {} [{}]: {}", session.id(), e.kind(), e);
                Err(e)
            }
        }
    }

    fn validate(form: SubmissionForm) -> Result<AnalysisRequest, ValidationError> {
        if form.prompt.trim().is_empty() {
            return Err(ValidationError::MissingInput);
        }
        let image = form.image.ok_or(ValidationError::MissingInput)?;

        Ok(AnalysisRequest {
            prompt: form.prompt,
            image: Arc::new(image),
            goal: form.goal,
        })
    }
}
