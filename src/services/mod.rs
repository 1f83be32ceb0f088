pub mod ai_service;
pub mod gemini; // Google Gemini generateContent client
#[cfg(test)]
pub mod mock;

pub use ai_service::InferenceClient;
pub use gemini::GeminiService;
