use base64::{engine::general_purpose, Engine};
use serde::{Deserialize, Serialize};

use crate::error::AnalyzerError;
use crate::models::{AnalysisResult, ImagePayload};
use crate::services::InferenceClient;

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part {
    Text { text: String },
    InlineData { inline_data: InlineData },
}

#[derive(Debug, Serialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
    status: Option<String>,
}

pub struct GeminiService {
    api_key: String,
    model: String,
    base_url: String,
    client: reqwest::Client,
}

impl GeminiService {
    pub fn new(api_key: String, model: String, base_url: String) -> Self {
        Self {
            api_key,
            model,
            base_url,
            client: reqwest::Client::new(),
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }

    fn build_request(instructions: &str, image: &ImagePayload, user_text: &str) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: vec![Content {
                role: "user".to_string(),
                parts: vec![
                    Part::Text {
                        text: instructions.to_string(),
                    },
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type: image.mime_type.clone(),
                            data: general_purpose::STANDARD.encode(&image.bytes),
                        },
                    },
                    Part::Text {
                        text: user_text.to_string(),
                    },
                ],
            }],
        }
    }

    /// Turn a non-success HTTP reply into the matching error kind.
    fn classify_error(status: reqwest::StatusCode, body: &str) -> AnalyzerError {
        let envelope = serde_json::from_str::<ErrorEnvelope>(body).ok();
        let message = envelope
            .as_ref()
            .map(|e| e.error.message.clone())
            .unwrap_or_else(|| body.trim().to_string());
        let api_status = envelope.and_then(|e| e.error.status).unwrap_or_default();

        let bad_credential = status == reqwest::StatusCode::UNAUTHORIZED
            || status == reqwest::StatusCode::FORBIDDEN
            || api_status == "UNAUTHENTICATED"
            || api_status == "PERMISSION_DENIED"
            || message.contains("API key not valid");

        if bad_credential {
            AnalyzerError::Configuration(format!("Gemini API error ({}): {}", status, message))
        } else {
            AnalyzerError::Inference(format!("Gemini API error ({}): {}", status, message))
        }
    }

    fn parse_response(body: &str) -> Result<AnalysisResult, AnalyzerError> {
        let response: GenerateContentResponse = serde_json::from_str(body)
            .map_err(|e| AnalyzerError::Inference(format!("Failed to parse Gemini response: {}", e)))?;

        if let Some(reason) = response.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(AnalyzerError::Inference(format!(
                "Gemini blocked the request: {}",
                reason
            )));
        }

        let candidate = response
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| AnalyzerError::Inference("Gemini returned no candidates".to_string()))?;

        let text = candidate
            .content
            .map(|c| {
                c.parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            let reason = candidate.finish_reason.unwrap_or_else(|| "UNKNOWN".to_string());
            return Err(AnalyzerError::Inference(format!(
                "Gemini returned no text (finish reason: {})",
                reason
            )));
        }

        Ok(AnalysisResult { text })
    }
}

#[async_trait::async_trait]
impl InferenceClient for GeminiService {
    async fn generate(
        &self,
        instructions: &str,
        image: &ImagePayload,
        user_text: &str,
    ) -> Result<AnalysisResult, AnalyzerError> {
        log::debug!("📸 Starting image analysis ({}, {} bytes)", image.mime_type, image.bytes.len());

        let request = Self::build_request(instructions, image, user_text);

        log::info!("🤖 Sending request to Gemini with model: {}", self.model);

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| AnalyzerError::Inference(format!("Gemini request failed: {}", e)))?;

        let status = response.status();
        log::debug!("📥 Gemini response status: {}", status);

        let body = response
            .text()
            .await
            .map_err(|e| AnalyzerError::Inference(format!("Failed to read Gemini response: {}", e)))?;

        if !status.is_success() {
            log::error!("❌ Gemini API error response: {}", body);
            return Err(Self::classify_error(status, &body));
        }

        log::debug!("📄 Raw Gemini response size: {} bytes", body.len());

        let result = Self::parse_response(&body)?;
        log::info!("✅ Received analysis from Gemini ({} chars)", result.text.len());

        Ok(result)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
