//! HTTP API module
//!
//! This module contains all HTTP endpoint handlers and response structures.

pub mod events;
pub mod handlers;
pub mod responses;

use std::sync::Arc;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;
use events::events_handler;
use handlers::*;

/// Create the HTTP router with all endpoints
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/tables", get(list_tables_handler))
        .route("/tables/:id", get(get_table_handler).patch(update_handler))
        .route("/tables/:id/start", post(start_handler))
        .route("/tables/:id/pause", post(pause_handler))
        .route("/tables/:id/resume", post(resume_handler))
        .route("/tables/:id/add-time", post(add_time_handler))
        .route("/tables/:id/end", post(end_handler))
        .route("/events", get(events_handler))
        .route("/status", get(status_handler))
        .route("/health", get(health_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use clap::Parser;
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::config::Config;

    fn router() -> Router {
        let config = Config::parse_from(["cue-clock", "--tables", "2"]);
        create_router(Arc::new(AppState::new(&config)))
    }

    async fn send(router: &Router, method: &str, uri: &str, body: Option<&str>) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                request = request.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = router
            .clone()
            .oneshot(request.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn session_lifecycle_over_http() {
        let router = router();

        let (status, body) = send(&router, "POST", "/tables/1/start", Some(r#"{"duration_minutes": 60}"#)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "active");
        assert_eq!(body["table"]["session"]["duration_seconds"], 3600.0);

        let (status, body) = send(&router, "POST", "/tables/1/pause", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["table"]["session"]["is_paused"], true);

        let (status, _) = send(&router, "POST", "/tables/1/resume", None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(&router, "POST", "/tables/1/add-time", Some(r#"{"minutes": -30}"#)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["table"]["session"]["duration_seconds"], 1800.0);

        let (_, tables) = send(&router, "GET", "/tables", None).await;
        assert_eq!(tables.as_array().unwrap().len(), 2);
        assert_eq!(tables[0]["is_active"], true);
        assert_eq!(tables[1]["remaining"], "00:00:00");

        let (status, body) = send(&router, "POST", "/tables/1/end", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "idle");
    }

    #[tokio::test]
    async fn unknown_tables_and_bad_transitions_are_rejected() {
        let router = router();

        let (status, body) = send(&router, "GET", "/tables/42", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "table 42 not found");

        let (status, _) = send(&router, "POST", "/tables/2/pause", None).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) = send(&router, "POST", "/tables/2/start", Some(r#"{"duration_minutes": -1}"#)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(&router, "PATCH", "/tables/2", Some("{}")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn details_and_status_are_reported() {
        let router = router();

        let (status, body) = send(&router, "PATCH", "/tables/2", Some(r#"{"guest_count": 3, "server": "Robin"}"#)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["table"]["guest_count"], 3);
        assert_eq!(body["table"]["server"], "Robin");

        let (status, body) = send(&router, "GET", "/status", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["table_count"], 2);
        assert_eq!(body["update_mode"], "batched");
        assert_eq!(body["last_action"], "update table 2");

        let (status, body) = send(&router, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }
}
