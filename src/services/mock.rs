use std::sync::Mutex;

use crate::error::AnalyzerError;
use crate::models::{AnalysisResult, ImagePayload};
use crate::services::InferenceClient;

/// One recorded `generate` call.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub instructions: String,
    pub mime_type: String,
    pub user_text: String,
}

#[derive(Debug, Clone)]
enum Reply {
    Text(String),
    Inference(String),
    Configuration(String),
}

/// Scripted client for tests: returns the same reply every time and
/// records what it was asked.
pub struct MockInferenceClient {
    reply: Reply,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockInferenceClient {
    pub fn replying(text: &str) -> Self {
        Self::with_reply(Reply::Text(text.to_string()))
    }

    pub fn failing(message: &str) -> Self {
        Self::with_reply(Reply::Inference(message.to_string()))
    }

    pub fn misconfigured(message: &str) -> Self {
        Self::with_reply(Reply::Configuration(message.to_string()))
    }

    fn with_reply(reply: Reply) -> Self {
        Self {
            reply,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl InferenceClient for MockInferenceClient {
    async fn generate(
        &self,
        instructions: &str,
        image: &ImagePayload,
        user_text: &str,
    ) -> Result<AnalysisResult, AnalyzerError> {
        self.calls.lock().unwrap().push(RecordedCall {
            instructions: instructions.to_string(),
            mime_type: image.mime_type.clone(),
            user_text: user_text.to_string(),
        });

        match &self.reply {
            Reply::Text(text) => Ok(AnalysisResult { text: text.clone() }),
            Reply::Inference(message) => Err(AnalyzerError::Inference(message.clone())),
            Reply::Configuration(message) => Err(AnalyzerError::Configuration(message.clone())),
        }
    }

    fn model_name(&self) -> &str {
        "mock"
    }
}
