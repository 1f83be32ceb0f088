use crate::error::AnalyzerError;
use crate::models::{AnalysisResult, ImagePayload};

/// Trait for multimodal AI services (Gemini, test doubles, etc.)
#[async_trait::async_trait]
pub trait InferenceClient: Send + Sync {
    /// Send the instruction text, the meal image and the user's own prompt,
    /// get the generated analysis back.
    async fn generate(
        &self,
        instructions: &str,
        image: &ImagePayload,
        user_text: &str,
    ) -> Result<AnalysisResult, AnalyzerError>;

    fn model_name(&self) -> &str;
}
