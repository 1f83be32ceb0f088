use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Raster image types the upload form accepts.
pub const SUPPORTED_IMAGE_TYPES: [&str; 3] = ["image/jpeg", "image/png", "image/webp"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl ImagePayload {
    pub fn new(mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            mime_type: mime_type.into(),
            bytes,
        }
    }

    /// Map a file extension (jpg, jpeg, png, webp) to its MIME type.
    pub fn mime_type_for_extension(file_name: &str) -> Option<&'static str> {
        let extension = file_name.rsplit_once('.')?.1.to_lowercase();
        match extension.as_str() {
            "jpg" | "jpeg" => Some("image/jpeg"),
            "png" => Some("image/png"),
            "webp" => Some("image/webp"),
            _ => None,
        }
    }

    pub fn is_supported_mime_type(mime_type: &str) -> bool {
        SUPPORTED_IMAGE_TYPES.contains(&mime_type)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoalDirection {
    Loss,
    Gain,
}

impl std::fmt::Display for GoalDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            GoalDirection::Loss => "loss",
            GoalDirection::Gain => "gain",
        };
        write!(f, "{}", s)
    }
}

impl GoalDirection {
    /// Parses the goal selector value. `Some(None)` is the "none" goal,
    /// `None` an unrecognized value.
    pub fn from_selection(s: &str) -> Option<Option<Self>> {
        match s.trim().to_lowercase().as_str() {
            "" | "none" => Some(None),
            "loss" => Some(Some(GoalDirection::Loss)),
            "gain" => Some(Some(GoalDirection::Gain)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gender {
    Male,
    Female,
}

impl std::fmt::Display for Gender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Gender::Male => "male",
            Gender::Female => "female",
        };
        write!(f, "{}", s)
    }
}

impl Gender {
    pub fn from_string(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "male" => Some(Gender::Male),
            "female" => Some(Gender::Female),
            _ => None,
        }
    }
}

/// Weight-management details. Only exists when the user picked a goal
/// other than "none".
#[derive(Debug, Clone, PartialEq)]
pub struct DietaryGoal {
    pub direction: GoalDirection,
    pub current_weight_kg: f64,
    pub target_weight_kg: f64,
    pub gender: Gender,
}

/// A validated request, ready for the inference call.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub prompt: String,
    pub image: Arc<ImagePayload>,
    pub goal: Option<DietaryGoal>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisResult {
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub prompt: String,
    pub result: AnalysisResult,
    pub image: Arc<ImagePayload>,
    pub created_at: DateTime<Utc>,
}
