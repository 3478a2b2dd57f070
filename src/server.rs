//! Minimal HTTP surface: one text box, one button, one answer.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/` | HTML form |
//! | `POST` | `/ask` | Form submit; renders the answer or the error in its place |
//! | `POST` | `/api/ask` | JSON `{ "question": "..." }` → `{ "answer", "sources" }` |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! Questions are answered one at a time: the [`QueryService`] sits behind
//! a mutex, so two requests arriving while the index is stale cannot both
//! start a rebuild.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::error::Error;
use crate::query::{QueryService, SourceRef};

#[derive(Clone)]
struct AppState {
    service: Arc<Mutex<QueryService>>,
}

/// Build the router over `service`.
pub fn router(service: QueryService) -> Router {
    let state = AppState {
        service: Arc::new(Mutex::new(service)),
    };
    Router::new()
        .route("/", get(handle_index))
        .route("/ask", post(handle_ask_form))
        .route("/api/ask", post(handle_ask_json))
        .route("/health", get(handle_health))
        .with_state(state)
}

/// Serve on `bind` until the process is terminated.
pub async fn run_server(service: QueryService, bind: &str) -> anyhow::Result<()> {
    let app = router(service);
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!(%bind, "listening");
    println!("askdocs listening on http://{}", bind);
    axum::serve(listener, app).await?;
    Ok(())
}

// ============ HTML ============

#[derive(Deserialize)]
struct AskForm {
    #[serde(default)]
    question: String,
}

async fn handle_index() -> Html<String> {
    Html(render_page("", None))
}

async fn handle_ask_form(State(state): State<AppState>, Form(form): Form<AskForm>) -> Html<String> {
    if form.question.trim().is_empty() {
        return Html(render_page("", None));
    }
    let service = state.service.lock().await;
    let body = match service.answer(&form.question).await {
        Ok(answer) => render_answer(&answer.text, &answer.sources),
        Err(e) => {
            warn!(error = %e, "question failed");
            format!("<p class=\"error\">{}</p>", escape_html(&e.to_string()))
        }
    };
    Html(render_page(&form.question, Some(&body)))
}

fn render_page(question: &str, answer_html: Option<&str>) -> String {
    format!(
        r#"<!doctype html>
<html lang="en">
<head><meta charset="utf-8"><title>askdocs</title>
<style>body{{font-family:sans-serif;max-width:46rem;margin:2rem auto;padding:0 1rem}}input[type=text]{{width:100%;padding:.5rem}}.error{{color:#b00020}}.sources{{color:#555;font-size:.9rem}}</style>
</head>
<body>
<h1>askdocs</h1>
<p>Ask a question about the indexed documents.</p>
<form method="post" action="/ask">
<input type="text" name="question" value="{}" autofocus>
<p><button type="submit">Ask</button></p>
</form>
{}
</body>
</html>
"#,
        escape_html(question),
        answer_html.unwrap_or("")
    )
}

fn render_answer(text: &str, sources: &[SourceRef]) -> String {
    let mut html = format!("<div class=\"answer\"><p>{}</p></div>", escape_html(text).replace('\n', "<br>"));
    if !sources.is_empty() {
        html.push_str("<ul class=\"sources\">");
        for s in sources {
            let label = match s.page {
                Some(page) => format!("{} (page {})", s.source.display(), page),
                None => s.source.display().to_string(),
            };
            html.push_str(&format!("<li>{}</li>", escape_html(&label)));
        }
        html.push_str("</ul>");
    }
    html
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

// ============ JSON ============

#[derive(Deserialize)]
struct AskRequest {
    question: String,
}

#[derive(Serialize)]
struct AskResponse {
    answer: String,
    sources: Vec<SourceRef>,
}

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: &'static str,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl From<Error> for AppError {
    fn from(err: Error) -> Self {
        let (status, code) = match &err {
            Error::EmptyQuestion => (StatusCode::BAD_REQUEST, "bad_request"),
            Error::EmptyCorpus { .. } => (StatusCode::UNPROCESSABLE_ENTITY, "empty_corpus"),
            Error::Provider(_) => (StatusCode::BAD_GATEWAY, "provider_error"),
            Error::Storage(_) | Error::Tracker(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        };
        AppError {
            status,
            code,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

async fn handle_ask_json(
    State(state): State<AppState>,
    Json(req): Json<AskRequest>,
) -> Result<Json<AskResponse>, AppError> {
    let service = state.service.lock().await;
    let answer = service.answer(&req.question).await?;
    Ok(Json(AskResponse {
        answer: answer.text,
        sources: answer.sources,
    }))
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<a href="x">Tom & 'Jerry'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#39;Jerry&#39;&lt;/a&gt;"
        );
    }

    #[test]
    fn test_page_echoes_escaped_question() {
        let page = render_page("what is <b>?", None);
        assert!(page.contains("value=\"what is &lt;b&gt;?\""));
        assert!(page.contains("<button type=\"submit\">Ask</button>"));
    }

    #[test]
    fn test_render_answer_lists_sources() {
        let sources = vec![SourceRef {
            source: PathBuf::from("/data/roadmap.pdf"),
            page: Some(2),
            score: 0.8,
        }];
        let html = render_answer("Line one\nLine two", &sources);
        assert!(html.contains("Line one<br>Line two"));
        assert!(html.contains("<li>/data/roadmap.pdf (page 2)</li>"));
    }

    #[test]
    fn test_error_status_mapping() {
        let err = AppError::from(Error::EmptyCorpus {
            root: PathBuf::from("/data"),
        });
        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.code, "empty_corpus");

        let err = AppError::from(Error::EmptyQuestion);
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }
}
