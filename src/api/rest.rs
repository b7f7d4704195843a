//! REST endpoints: admission, task status, health.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use super::AppState;
use crate::error::QueueError;
use crate::tasks::TaskId;

pub(crate) async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "task-relay",
        "subscribers": state.broadcaster.subscriber_count(),
        "active_workers": state.dispatcher.active_count().await,
        "tasks": state.queue.counts().await,
    }))
}

/// `POST /process` — admit a task and return immediately.
pub(crate) async fn submit(State(state): State<AppState>) -> impl IntoResponse {
    match state.admission.admit().await {
        Ok(ack) => (StatusCode::OK, Json(serde_json::json!(ack))),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({"error": e.to_string()})),
        ),
    }
}

/// `GET /api/tasks/{id}` — current task record.
pub(crate) async fn get_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let id = TaskId::from(id);
    match state.queue.get(&id).await {
        Ok(record) => (StatusCode::OK, Json(serde_json::json!(record))),
        Err(e @ QueueError::NotFound { .. }) => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({"error": e.to_string()})),
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({"error": e.to_string()})),
        ),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::app::App;
    use crate::config::ServiceConfig;

    async fn app() -> App {
        App::build(ServiceConfig {
            work_delay: Duration::from_millis(10),
            ..ServiceConfig::default()
        })
        .await
        .unwrap()
    }

    async fn call(app: &App, req: Request<Body>) -> (u16, Value) {
        let resp = app.router().oneshot(req).await.unwrap();
        let status = resp.status().as_u16();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn submit_returns_pending_ack() {
        let app = app().await;
        let req = Request::post("/process").body(Body::empty()).unwrap();

        let (status, body) = call(&app, req).await;
        assert_eq!(status, 200);
        assert_eq!(body["status"], "pending");
        assert!(body["id"].as_str().unwrap().starts_with("req_"));
    }

    #[tokio::test]
    async fn get_task_returns_record() {
        let app = app().await;
        let ack = app.admission.admit().await.unwrap();

        let req = Request::get(format!("/api/tasks/{}", ack.id))
            .body(Body::empty())
            .unwrap();
        let (status, body) = call(&app, req).await;
        assert_eq!(status, 200);
        assert_eq!(body["id"], ack.id.as_str());
        assert_eq!(body["status"], "pending");
        assert!(body.get("result").is_none());
    }

    #[tokio::test]
    async fn get_unknown_task_is_404() {
        let app = app().await;
        let req = Request::get("/api/tasks/req_0_nothing").body(Body::empty()).unwrap();

        let (status, body) = call(&app, req).await;
        assert_eq!(status, 404);
        assert!(body["error"].as_str().unwrap().contains("not found"));
    }

    #[tokio::test]
    async fn health_reports_counts() {
        let app = app().await;
        app.admission.admit().await.unwrap();

        let req = Request::get("/health").body(Body::empty()).unwrap();
        let (status, body) = call(&app, req).await;
        assert_eq!(status, 200);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "task-relay");
        assert_eq!(body["tasks"]["pending"], 1);
        assert_eq!(body["active_workers"], 0);
    }
}
