use base64::{engine::general_purpose, Engine};
use serde::Serialize;
use tera::{Context, Tera};
use thiserror::Error;

use crate::models::{DietaryGoal, ImagePayload};
use crate::session::History;

pub const APP_TITLE: &str = "FoodAnalyzer AI";
pub const RESPONSE_HEADING: &str = "The Response is";

const TEMPLATE_NAME: &str = "index.html";
const TEMPLATE: &str = include_str!("../../templates/index.html");

#[derive(Debug, Error)]
pub enum PageError {
    #[error("template parse error: {0}")]
    TemplateParse(String),

    #[error("template rendering failed: {0}")]
    TemplateRender(String),
}

impl From<tera::Error> for PageError {
    fn from(e: tera::Error) -> Self {
        PageError::TemplateRender(e.to_string())
    }
}

/// What the last submission produced, if anything.
#[derive(Debug, Clone)]
pub enum Outcome {
    Response(String),
    Error(String),
}

pub struct PageView<'a> {
    pub prompt: &'a str,
    pub goal: Option<&'a DietaryGoal>,
    pub preview: Option<&'a ImagePayload>,
    pub outcome: Option<Outcome>,
    pub history: &'a History,
    pub show_history: bool,
}

#[derive(Serialize)]
struct HistoryRow {
    index: usize,
    created_at: String,
    prompt: String,
    response: String,
}

#[derive(Serialize)]
struct PageContext<'a> {
    title: &'static str,
    response_heading: &'static str,
    prompt: &'a str,
    goal: String,
    goal_options: [&'static str; 3],
    weight: String,
    target_weight: String,
    gender: String,
    gender_options: [&'static str; 2],
    preview_url: Option<String>,
    response: Option<&'a str>,
    error: Option<&'a str>,
    show_history: bool,
    history: Vec<HistoryRow>,
}

/// Base64 data URL for the upload preview. The MIME type has already been
/// checked against the supported image types.
pub fn data_url(image: &ImagePayload) -> String {
    format!(
        "data:{};base64,{}",
        image.mime_type,
        general_purpose::STANDARD.encode(&image.bytes)
    )
}

/// The form page. Tera autoescapes every value since the template is `.html`.
pub struct PageRenderer {
    tera: Tera,
}

impl PageRenderer {
    pub fn new() -> Result<Self, PageError> {
        let mut tera = Tera::default();
        tera.add_raw_template(TEMPLATE_NAME, TEMPLATE)
            .map_err(|e| PageError::TemplateParse(e.to_string()))?;
        Ok(Self { tera })
    }

    pub fn render(&self, view: &PageView) -> Result<String, PageError> {
        let (response, error) = match &view.outcome {
            Some(Outcome::Response(text)) => (Some(text.as_str()), None),
            Some(Outcome::Error(message)) => (None, Some(message.as_str())),
            None => (None, None),
        };

        let history = if view.show_history {
            view.history
                .iter()
                .enumerate()
                .map(|(index, entry)| HistoryRow {
                    index,
                    created_at: entry.created_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
                    prompt: entry.prompt.clone(),
                    response: entry.result.text.clone(),
                })
                .collect()
        } else {
            Vec::new()
        };

        let page = PageContext {
            title: APP_TITLE,
            response_heading: RESPONSE_HEADING,
            prompt: view.prompt,
            goal: view
                .goal
                .map(|g| g.direction.to_string())
                .unwrap_or_else(|| "none".to_string()),
            goal_options: ["none", "loss", "gain"],
            weight: view.goal.map(|g| g.current_weight_kg).unwrap_or(0.0).to_string(),
            target_weight: view.goal.map(|g| g.target_weight_kg).unwrap_or(0.0).to_string(),
            gender: view
                .goal
                .map(|g| g.gender.to_string())
                .unwrap_or_else(|| "male".to_string()),
            gender_options: ["male", "female"],
            preview_url: view.preview.map(data_url),
            response,
            error,
            show_history: view.show_history,
            history,
        };

        let context = Context::from_serialize(&page)?;
        Ok(self.tera.render(TEMPLATE_NAME, &context)?)
    }
}
