use base64::{engine::general_purpose, Engine};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;
use crate::handlers::{RawForm, UploadedFile};
use crate::session::SessionId;

pub const SESSION_COOKIE: &str = "food_analyzer_session";

/// JSON body for `POST /api/analyze`.
#[derive(Debug, Deserialize, Serialize, Default)]
pub struct ApiAnalyzeRequest {
    #[serde(default)]
    pub prompt: String,
    pub image_base64: Option<String>,
    pub mime_type: Option<String>,
    pub file_name: Option<String>,
    pub goal: Option<String>,
    pub weight: Option<f64>,
    pub target_weight: Option<f64>,
    pub gender: Option<String>,
}

impl ApiAnalyzeRequest {
    pub fn into_raw_form(self) -> Result<RawForm, ValidationError> {
        let image = match self.image_base64 {
            Some(encoded) => {
                let bytes = general_purpose::STANDARD
                    .decode(encoded.trim())
                    .map_err(|e| ValidationError::MalformedForm(format!("image_base64: {}", e)))?;
                Some(UploadedFile {
                    file_name: self.file_name,
                    content_type: self.mime_type,
                    bytes,
                })
            }
            None => None,
        };

        Ok(RawForm {
            prompt: Some(self.prompt),
            image,
            goal: self.goal,
            weight: self.weight.map(|w| w.to_string()),
            target_weight: self.target_weight.map(|w| w.to_string()),
            gender: self.gender,
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiAnalyzeResponse {
    pub text: String,
    pub model: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub kind: String,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryItem {
    pub index: usize,
    pub prompt: String,
    pub response: String,
    pub mime_type: String,
    pub image_url: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Pull the session id out of a `Cookie` header value.
pub fn session_id_from_cookie(header: &str) -> Option<SessionId> {
    header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .and_then(|(_, value)| Uuid::parse_str(value.trim()).ok())
}

pub fn session_cookie(id: SessionId) -> String {
    format!("{}={}; Path=/; HttpOnly; SameSite=Lax", SESSION_COOKIE, id)
}

// HTML form page
pub mod page;

pub mod server {
    use super::*;
    use axum::{
        extract::{DefaultBodyLimit, Multipart, Path, Query, State},
        http::{header, HeaderMap, StatusCode},
        response::{Html, IntoResponse, Response},
        routing::{get, post},
        Json, Router,
    };
    use std::sync::Arc;
    use tokio::sync::Mutex;
    use tower_http::limit::RequestBodyLimitLayer;

    use crate::error::AnalyzerError;
    use crate::handlers::{form, SubmissionHandler};
    use crate::session::{Session, SessionStore};
    use super::page::{Outcome, PageRenderer, PageView};

    /// Room for the JSON envelope and the other fields around the image.
    const JSON_ENVELOPE_BYTES: usize = 64 * 1024;

    pub struct AppState {
        pub handler: SubmissionHandler,
        pub sessions: Arc<SessionStore>,
        pub pages: PageRenderer,
    }

    #[derive(Debug, Deserialize)]
    pub struct PageQuery {
        #[serde(default)]
        show_history: Option<String>,
    }

    /// Body limit for `/api/analyze`: base64 grows the image by a third.
    pub fn json_body_limit(max_upload_bytes: usize) -> usize {
        max_upload_bytes.saturating_mul(4) / 3 + JSON_ENVELOPE_BYTES
    }

    pub fn create_router(state: Arc<AppState>, max_upload_bytes: usize) -> Router {
        Router::new()
            .route("/", get(index_handler))
            .route(
                "/analyze",
                post(analyze_form_handler).layer(RequestBodyLimitLayer::new(max_upload_bytes)),
            )
            .route(
                "/api/analyze",
                post(analyze_json_handler)
                    .layer(RequestBodyLimitLayer::new(json_body_limit(max_upload_bytes))),
            )
            .route("/api/history", get(history_json_handler))
            .route("/history/:index/image", get(history_image_handler))
            .route("/health", get(health_check))
            .layer(DefaultBodyLimit::disable())
            .with_state(state)
    }

    fn is_on(value: Option<&str>) -> bool {
        matches!(value.map(str::trim), Some(v) if !v.is_empty() && v != "0" && v != "false")
    }

    async fn open_session(state: &AppState, headers: &HeaderMap) -> (SessionId, Arc<Mutex<Session>>) {
        let requested = headers
            .get(header::COOKIE)
            .and_then(|v| v.to_str().ok())
            .and_then(session_id_from_cookie);

        state.sessions.get_or_create(requested).await
    }

    fn with_cookie(id: SessionId, response: impl IntoResponse) -> Response {
        ([(header::SET_COOKIE, session_cookie(id))], response).into_response()
    }

    fn page_response(state: &AppState, id: SessionId, status: StatusCode, view: &PageView) -> Response {
        match state.pages.render(view) {
            Ok(html) => with_cookie(id, (status, Html(html))),
            Err(e) => {
                log::error!("❌ Failed to render page: {}", e);
                with_cookie(id, StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }

    async fn index_handler(
        headers: HeaderMap,
        Query(query): Query<PageQuery>,
        State(state): State<Arc<AppState>>,
    ) -> Response {
        let (id, session) = open_session(&state, &headers).await;
        let session = session.lock().await;

        page_response(
            &state,
            id,
            StatusCode::OK,
            &PageView {
                prompt: "",
                goal: None,
                preview: None,
                outcome: None,
                history: session.history(),
                show_history: is_on(query.show_history.as_deref()),
            },
        )
    }

    async fn read_multipart(mut multipart: Multipart) -> Result<(RawForm, bool), ValidationError> {
        let malformed = |e: axum::extract::multipart::MultipartError| {
            ValidationError::MalformedForm(e.to_string())
        };

        let mut raw = RawForm::default();
        let mut show_history = false;

        while let Some(field) = multipart.next_field().await.map_err(malformed)? {
            let name = field.name().unwrap_or_default().to_string();

            if name == "image" {
                let file_name = field.file_name().map(str::to_string);
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await.map_err(malformed)?;
                log::debug!("🖼️ Upload field: {:?} ({:?}, {} bytes)", file_name, content_type, bytes.len());
                raw.image = Some(UploadedFile {
                    file_name,
                    content_type,
                    bytes: bytes.to_vec(),
                });
                continue;
            }

            let value = field.text().await.map_err(malformed)?;
            match name.as_str() {
                "prompt" => raw.prompt = Some(value),
                "goal" => raw.goal = Some(value),
                "weight" => raw.weight = Some(value),
                "target_weight" => raw.target_weight = Some(value),
                "gender" => raw.gender = Some(value),
                "show_history" => show_history = is_on(Some(value.as_str())),
                other => log::debug!("Ignoring unknown form field: {}", other),
            }
        }

        Ok((raw, show_history))
    }

    async fn analyze_form_handler(
        headers: HeaderMap,
        State(state): State<Arc<AppState>>,
        multipart: Multipart,
    ) -> Response {
        let (id, session) = open_session(&state, &headers).await;
        let mut session = session.lock().await;

        let (raw, show_history) = match read_multipart(multipart).await {
            Ok(parsed) => parsed,
            Err(e) => {
                log::warn!("⚠️ Could not read form submission: {}", e);
                return page_response(
                    &state,
                    id,
                    StatusCode::BAD_REQUEST,
                    &PageView {
                        prompt: "",
                        goal: None,
                        preview: None,
                        outcome: Some(Outcome::Error(AnalyzerError::from(e).user_message())),
                        history: session.history(),
                        show_history: false,
                    },
                );
            }
        };

        let echoed_prompt = raw.prompt.clone().unwrap_or_default();

        let submission = match form::collect(raw) {
            Ok(submission) => submission,
            Err(e) => {
                log::warn!("⚠️ Invalid form input: {}", e);
                return page_response(
                    &state,
                    id,
                    StatusCode::BAD_REQUEST,
                    &PageView {
                        prompt: &echoed_prompt,
                        goal: None,
                        preview: None,
                        outcome: Some(Outcome::Error(AnalyzerError::from(e).user_message())),
                        history: session.history(),
                        show_history,
                    },
                );
            }
        };

        let goal = submission.goal.clone();
        let preview = submission.image.clone();

        let (status, outcome) = match state.handler.submit(&mut session, submission).await {
            Ok(result) => (StatusCode::OK, Outcome::Response(result.text)),
            Err(e) => (status_for(&e), Outcome::Error(e.user_message())),
        };

        page_response(
            &state,
            id,
            status,
            &PageView {
                prompt: &echoed_prompt,
                goal: goal.as_ref(),
                preview: preview.as_ref(),
                outcome: Some(outcome),
                history: session.history(),
                show_history,
            },
        )
    }

    fn status_for(error: &AnalyzerError) -> StatusCode {
        match error {
            AnalyzerError::Validation(_) => StatusCode::BAD_REQUEST,
            AnalyzerError::Configuration(_) => StatusCode::SERVICE_UNAVAILABLE,
            AnalyzerError::Inference(_) => StatusCode::BAD_GATEWAY,
        }
    }

    fn api_error(error: &AnalyzerError) -> (StatusCode, Json<ApiError>) {
        (
            status_for(error),
            Json(ApiError {
                kind: error.kind().to_string(),
                message: error.user_message(),
            }),
        )
    }

    async fn analyze_json_handler(
        headers: HeaderMap,
        State(state): State<Arc<AppState>>,
        Json(request): Json<ApiAnalyzeRequest>,
    ) -> Response {
        let (id, session) = open_session(&state, &headers).await;
        let mut session = session.lock().await;

        let submission = match request.into_raw_form().and_then(form::collect) {
            Ok(submission) => submission,
            Err(e) => return with_cookie(id, api_error(&AnalyzerError::from(e))),
        };

        match state.handler.submit(&mut session, submission).await {
            Ok(result) => with_cookie(
                id,
                Json(ApiAnalyzeResponse {
                    text: result.text,
                    model: state.handler.model_name().to_string(),
                }),
            ),
            Err(e) => with_cookie(id, api_error(&e)),
        }
    }

    async fn history_json_handler(
        headers: HeaderMap,
        State(state): State<Arc<AppState>>,
    ) -> Response {
        let (id, session) = open_session(&state, &headers).await;
        let session = session.lock().await;

        let items: Vec<HistoryItem> = session
            .history()
            .iter()
            .enumerate()
            .map(|(index, entry)| HistoryItem {
                index,
                prompt: entry.prompt.clone(),
                response: entry.result.text.clone(),
                mime_type: entry.image.mime_type.clone(),
                image_url: format!("/history/{}/image", index),
                created_at: entry.created_at,
            })
            .collect();

        with_cookie(id, Json(items))
    }

    async fn history_image_handler(
        headers: HeaderMap,
        Path(index): Path<usize>,
        State(state): State<Arc<AppState>>,
    ) -> Response {
        let (id, session) = open_session(&state, &headers).await;
        let session = session.lock().await;

        match session.history().get(index) {
            Some(entry) => with_cookie(
                id,
                (
                    [(header::CONTENT_TYPE, entry.image.mime_type.clone())],
                    entry.image.bytes.clone(),
                ),
            ),
            None => with_cookie(id, StatusCode::NOT_FOUND),
        }
    }

    async fn health_check() -> &'static str {
        "OK"
    }

}
