use anyhow::{Context, Result};
use axum::{
    extract::{rejection::JsonRejection, Form, Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    serve, Json, Router,
};
use minijinja::Environment;
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, sync::Arc};
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::client::{ErrorResponse, PlanRequest, PlanResponse};
use crate::conversation::{
    Advance, Phase, Progress, Rejection, SummaryLine, TranscriptEntry,
};
use crate::error::PlanError;
use crate::proxy::PlanProvider;
use crate::questions::{QuestionSpec, Script};
use crate::sessions::SessionStore;

// Shared application state
#[derive(Clone)]
pub struct AppState {
    templates: Arc<Environment<'static>>,
    sessions: Arc<SessionStore>,
    provider: Arc<dyn PlanProvider>,
}

impl AppState {
    pub fn new(script: Script, provider: Arc<dyn PlanProvider>) -> Result<Self> {
        Ok(Self {
            templates: Arc::new(create_template_env().context("Failed to initialize template engine")?),
            sessions: Arc::new(SessionStore::new(script)),
            provider,
        })
    }
}

fn create_template_env() -> Result<Environment<'static>> {
    let mut env = Environment::new();
    env.add_template("chat.html", include_str!("../templates/chat.html"))?;
    Ok(env)
}

/// Everything the chat page needs, copied out of the session so the lock is not held while rendering.
#[derive(Serialize)]
struct ChatView {
    title: &'static str,
    session: Uuid,
    transcript: Vec<TranscriptEntry>,
    question: Option<QuestionSpec>,
    progress: Progress,
    phase: Phase,
    summary: Vec<SummaryLine>,
    plan: Option<String>,
    error: Option<String>,
    hint: Option<&'static str>,
}

#[derive(Deserialize)]
struct ChatQuery {
    rejected: Option<String>,
}

#[derive(Deserialize)]
struct AnswerForm {
    #[serde(default)]
    answer: String,
}

fn chat_url(id: Uuid) -> String {
    format!("/chat/{}", id)
}

fn status_for(err: &PlanError) -> StatusCode {
    match err {
        PlanError::MissingApiKey => StatusCode::INTERNAL_SERVER_ERROR,
        PlanError::Transport(_)
        | PlanError::Upstream { .. }
        | PlanError::MalformedResponse
        | PlanError::Remote(_) => StatusCode::BAD_GATEWAY,
    }
}

fn error_json(status: StatusCode, message: String) -> Response {
    (status, Json(ErrorResponse { error: message })).into_response()
}

async fn plan_api_handler(
    State(state): State<AppState>,
    payload: Result<Json<PlanRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            warn!(error = %rejection.body_text(), "Rejected malformed plan request");
            return error_json(StatusCode::BAD_REQUEST, rejection.body_text());
        }
    };

    match state.provider.request_plan(&request.answers).await {
        Ok(plan) => Json(PlanResponse { plan }).into_response(),
        Err(err) => {
            error!(error = %err, "Plan request failed");
            error_json(status_for(&err), err.to_string())
        }
    }
}

async fn index_handler(State(state): State<AppState>) -> Redirect {
    let id = state.sessions.create().await;
    Redirect::to(&chat_url(id))
}

async fn chat_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<ChatQuery>,
) -> Response {
    let view = state
        .sessions
        .with(id, |conversation| ChatView {
            title: "Financial Health Check",
            session: id,
            transcript: conversation.transcript().to_vec(),
            question: conversation.current_question().cloned(),
            progress: conversation.progress(),
            phase: conversation.phase(),
            summary: conversation.summary(),
            plan: conversation.plan().map(str::to_string),
            error: conversation.plan_error().map(str::to_string),
            hint: query.rejected.as_ref().map(|_| "Please provide an answer to continue."),
        })
        .await;

    let Some(view) = view else {
        return Redirect::to("/").into_response();
    };

    state
        .templates
        .get_template("chat.html")
        .and_then(|tmpl| tmpl.render(&view))
        .map(|html| Html(html).into_response())
        .unwrap_or_else(|e| {
            error!("Failed to get or render template: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(format!("Internal Server Error: {}", e)),
            )
                .into_response()
        })
}

async fn answer_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Form(form): Form<AnswerForm>,
) -> Redirect {
    match state.sessions.with(id, |c| c.advance(&form.answer)).await {
        None => Redirect::to("/"),
        Some(Advance::Rejected(Rejection::Empty | Rejection::UnknownOption)) => {
            Redirect::to(&format!("{}?rejected=1", chat_url(id)))
        }
        Some(_) => Redirect::to(&chat_url(id)),
    }
}

async fn plan_handler(State(state): State<AppState>, Path(id): Path<Uuid>) -> Redirect {
    let begun = state
        .sessions
        .with(id, |c| {
            c.begin_plan_request()
                .map(|ticket| (ticket, c.answers().clone()))
        })
        .await;

    match begun {
        None => return Redirect::to("/"),
        // Not complete yet, or a request is already outstanding.
        Some(None) => return Redirect::to(&chat_url(id)),
        Some(Some((ticket, answers))) => {
            // Runs detached so a disconnecting browser cannot cancel the
            // upstream call and leave the session stuck in PlanRequested.
            let task_state = state.clone();
            let task = tokio::spawn(async move {
                // Lock released while the upstream call is in flight.
                let result = task_state.provider.request_plan(&answers).await;
                if let Err(err) = &result {
                    warn!(session = %id, error = %err, "Plan generation failed");
                }
                let applied = task_state
                    .sessions
                    .with(id, |c| c.finish_plan_request(ticket, result))
                    .await;
                if applied == Some(false) {
                    info!(session = %id, "Session restarted while the plan was generating; result dropped");
                }
            });
            if let Err(e) = task.await {
                error!(session = %id, "Plan task failed: {:?}", e);
            }
        }
    }

    Redirect::to(&chat_url(id))
}

async fn restart_handler(State(state): State<AppState>, Path(id): Path<Uuid>) -> Redirect {
    match state.sessions.with(id, |c| c.restart()).await {
        Some(()) => Redirect::to(&chat_url(id)),
        None => Redirect::to("/"),
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/api/plan", post(plan_api_handler))
        .route("/chat/:id", get(chat_handler))
        .route("/chat/:id/answer", post(answer_handler))
        .route("/chat/:id/plan", post(plan_handler))
        .route("/chat/:id/restart", post(restart_handler))
        .nest_service("/static", ServeDir::new("static"))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

pub async fn start_web_server(port: u16, state: AppState) -> Result<()> {
    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Web server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context(format!("Failed to bind to address {}", addr))?;

    serve(listener, app.into_make_service())
        .await
        .context("Web server failed")?;

    Ok(())
}
