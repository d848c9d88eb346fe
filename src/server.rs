use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tower_http::cors::{Any, CorsLayer};

use crate::agent::Engine;
use crate::types::Verdict;

// Bounds inherited from the original request contract.
pub const MAX_SHOW_NAME_LEN: usize = 50;
pub const MAX_GUESS_LEN: usize = 300;

#[derive(Clone)]
pub struct AppState {
    pub engine: Engine,
    pub feedback_path: PathBuf,
}

#[derive(Debug, Deserialize)]
pub struct EvaluateReq {
    pub tv_show_name: String,
    pub guess: String,
}

#[derive(Debug, Deserialize)]
pub struct FeedbackReq {
    pub feedback: String,
}

#[derive(Serialize)]
struct ApiError {
    error: String,
}

fn reject(msg: &str) -> (StatusCode, Json<ApiError>) {
    (StatusCode::BAD_REQUEST, Json(ApiError { error: msg.to_string() }))
}

async fn evaluate_guess(
    State(state): State<Arc<AppState>>,
    Json(req): Json<EvaluateReq>,
) -> Result<Json<Verdict>, (StatusCode, Json<ApiError>)> {
    if req.tv_show_name.trim().is_empty() {
        return Err(reject("tv_show_name must not be empty"));
    }
    if req.tv_show_name.chars().count() > MAX_SHOW_NAME_LEN {
        return Err(reject("tv_show_name too long"));
    }
    if req.guess.trim().is_empty() {
        return Err(reject("guess must not be empty"));
    }
    if req.guess.chars().count() > MAX_GUESS_LEN {
        return Err(reject("guess too long"));
    }

    // Never fails; failures surface as the fallback verdict.
    let verdict = state.engine.evaluate(&req.tv_show_name, &req.guess).await;
    Ok(Json(verdict))
}

async fn submit_feedback(
    State(state): State<Arc<AppState>>,
    Json(req): Json<FeedbackReq>,
) -> Result<StatusCode, (StatusCode, Json<ApiError>)> {
    if req.feedback.trim().is_empty() {
        return Err(reject("feedback must not be empty"));
    }
    let line = serde_json::json!({ "feedback": req.feedback }).to_string();
    let res = async {
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&state.feedback_path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.write_all(b"\n").await?;
        Ok::<_, std::io::Error>(())
    }
    .await;
    match res {
        Ok(()) => Ok(StatusCode::NO_CONTENT),
        Err(err) => {
            tracing::error!(error = %err, path = %state.feedback_path.display(), "failed to store feedback");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiError { error: "could not store feedback".to_string() }),
            ))
        }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    // The frontend is served from a different origin; keep CORS permissive.
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);
    Router::new()
        .route("/evaluate-guess", post(evaluate_guess))
        .route("/feedback", post(submit_feedback))
        .layer(cors)
        .with_state(state)
}

pub async fn run_server(state: AppState, addr: &str) -> anyhow::Result<()> {
    let app = router(Arc::new(state));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr, "listening");
    axum::serve(listener, app).await?;
    Ok(())
}
