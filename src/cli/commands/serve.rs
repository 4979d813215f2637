//! HTTP API server for web front ends.
//!
//! Provides REST endpoints for course queries, catalog stats and sessions.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::rag::RagSystem;
use crate::tools::Source;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::warn;

/// Run the HTTP API server.
pub async fn run_serve(host: &str, port: u16, settings: Settings) -> anyhow::Result<()> {
    if let Err(e) = preflight::check(Operation::Ask, &settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let rag = Arc::new(RagSystem::from_settings(&settings)?);
    let app = router(rag);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("Syllabus API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET    /health");
    Output::kv("Query", "POST   /api/query");
    Output::kv("Courses", "GET    /api/courses");
    Output::kv("Clear session", "DELETE /api/session/{session_id}");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app).await?;

    Ok(())
}

/// Routes for the API, with permissive CORS.
pub fn router(rag: Arc<RagSystem>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/api/query", post(query))
        .route("/api/courses", get(courses))
        .route("/api/session/{session_id}", delete(clear_session))
        .layer(cors)
        .with_state(rag)
}

// === Request/Response Types ===

#[derive(Deserialize)]
struct QueryRequest {
    query: String,
    #[serde(default)]
    session_id: Option<String>,
}

#[derive(Serialize)]
struct QueryResponse {
    answer: String,
    sources: Vec<Source>,
    session_id: String,
}

#[derive(Serialize)]
struct CoursesResponse {
    total_courses: usize,
    course_titles: Vec<String>,
}

#[derive(Serialize)]
struct ClearSessionResponse {
    status: &'static str,
    session_id: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

fn internal_error(e: impl std::fmt::Display) -> axum::response::Response {
    warn!("Request failed: {}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: e.to_string(),
        }),
    )
        .into_response()
}

// === Handlers ===

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn query(State(rag): State<Arc<RagSystem>>, Json(req): Json<QueryRequest>) -> impl IntoResponse {
    let session_id = req
        .session_id
        .unwrap_or_else(|| rag.sessions().create_session());

    match rag.query(&req.query, Some(&session_id)).await {
        Ok(response) => Json(QueryResponse {
            answer: response.answer,
            sources: response.sources,
            session_id,
        })
        .into_response(),
        Err(e) => internal_error(e),
    }
}

async fn courses(State(rag): State<Arc<RagSystem>>) -> impl IntoResponse {
    match rag.course_analytics().await {
        Ok(analytics) => Json(CoursesResponse {
            total_courses: analytics.total_courses,
            course_titles: analytics.course_titles,
        })
        .into_response(),
        Err(e) => internal_error(e),
    }
}

async fn clear_session(
    State(rag): State<Arc<RagSystem>>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    rag.sessions().clear_session(&session_id);
    Json(ClearSessionResponse {
        status: "cleared",
        session_id,
    })
}
