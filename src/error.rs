use thiserror::Error;

/// Problems with the submitted form. No inference call is made.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// No image, or a prompt that is empty or only whitespace.
    #[error("Please upload an image and enter a prompt.")]
    MissingInput,

    #[error("Unsupported image type '{0}'. Please upload a jpg, jpeg, png or webp image.")]
    UnsupportedImageType(String),

    #[error("Unknown goal '{0}'. Choose none, loss or gain.")]
    UnknownGoal(String),

    #[error("Unknown gender '{0}'. Choose male or female.")]
    UnknownGender(String),

    #[error("{field} must be a number of kgs, got '{value}'")]
    InvalidWeight { field: &'static str, value: String },

    #[error("{field} cannot be negative")]
    NegativeWeight { field: &'static str },

    #[error("Malformed form submission: {0}")]
    MalformedForm(String),
}

/// Everything that can go wrong while handling a submission.
#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Inference service is not configured correctly: {0}")]
    Configuration(String),

    #[error("{0}")]
    Inference(String),
}

impl AnalyzerError {
    pub fn kind(&self) -> &'static str {
        match self {
            AnalyzerError::Validation(_) => "validation",
            AnalyzerError::Configuration(_) => "configuration",
            AnalyzerError::Inference(_) => "inference",
        }
    }

    /// Text shown to the user for this error.
    pub fn user_message(&self) -> String {
        match self {
            AnalyzerError::Validation(e) => e.to_string(),
            AnalyzerError::Configuration(_) | AnalyzerError::Inference(_) => {
                format!("An error occurred: {}", self)
            }
        }
    }
}
