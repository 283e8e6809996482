//! `stackfall serve`: the leaderboard HTTP endpoint.

use super::{LeaderboardStore, NewEntry, TOP_LIMIT};
use anyhow::{Context, Result};
use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

#[derive(Clone)]
struct AppState {
    store: Arc<dyn LeaderboardStore>,
}

pub fn router(store: Arc<dyn LeaderboardStore>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(health))
        .route("/api/leaderboard", get(list_top).post(submit))
        .with_state(AppState { store })
        .layer(cors)
}

async fn health() -> &'static str {
    "ok"
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

async fn list_top(State(state): State<AppState>) -> Response {
    match state.store.top(TOP_LIMIT) {
        Ok(entries) => Json(entries).into_response(),
        Err(err) => {
            warn!("leaderboard read failed: {err}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

async fn submit(State(state): State<AppState>, body: Bytes) -> Response {
    let entry = match NewEntry::from_json(&body) {
        Ok(entry) => entry,
        Err(err) => return error_response(StatusCode::BAD_REQUEST, err.to_string()),
    };
    let (name, score) = (entry.name.clone(), entry.score);
    match state.store.insert(entry) {
        Ok(()) => {
            info!(%name, score, "score submitted");
            Json(json!({ "ok": true })).into_response()
        }
        Err(err) => {
            warn!("leaderboard insert failed: {err}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

/// `--addr`, then `STACKFALL_LEADERBOARD_ADDR`, then `STACKFALL_LEADERBOARD_PORT` on localhost.
pub fn resolve_addr<F>(explicit: Option<SocketAddr>, mut get_env: F) -> SocketAddr
where
    F: FnMut(&str) -> Option<String>,
{
    if let Some(addr) = explicit {
        return addr;
    }
    if let Some(addr) = get_env("STACKFALL_LEADERBOARD_ADDR").and_then(|v| v.parse().ok()) {
        return addr;
    }
    if let Some(port) = get_env("STACKFALL_LEADERBOARD_PORT").and_then(|v| v.parse::<u16>().ok()) {
        return SocketAddr::from(([127, 0, 0, 1], port));
    }
    SocketAddr::from(([127, 0, 0, 1], 4000))
}

/// Run until Ctrl-C.
pub async fn serve(addr: SocketAddr, store: Arc<dyn LeaderboardStore>) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("bind leaderboard server on {addr}"))?;
    info!("leaderboard listening on http://{addr}");
    axum::serve(listener, router(store))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutting down");
        })
        .await
        .context("serve leaderboard")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::leaderboard::{Entry, MemoryStore, StoreError};
    use axum::body::Body;
    use axum::http::{Request, header};
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tower::ServiceExt;

    struct BrokenStore;

    impl LeaderboardStore for BrokenStore {
        fn top(&self, _limit: usize) -> Result<Vec<Entry>, StoreError> {
            Err(StoreError::Poisoned)
        }
        fn insert(&self, _entry: NewEntry) -> Result<(), StoreError> {
            Err(StoreError::Poisoned)
        }
    }

    async fn call(app: Router, req: Request<Body>) -> (StatusCode, Value) {
        let resp = app.oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    fn post(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/leaderboard")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_top() -> Request<Body> {
        Request::builder()
            .uri("/api/leaderboard")
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn post_valid_entry_returns_ok() {
        let app = router(Arc::new(MemoryStore::new()));
        let (status, body) = call(app, post(r#"{"name":"Ada","score":42}"#)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "ok": true }));
    }

    #[tokio::test]
    async fn post_string_score_is_bad_request() {
        let app = router(Arc::new(MemoryStore::new()));
        let (status, body) = call(app, post(r#"{"score":"42"}"#)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "Invalid data" }));
    }

    #[tokio::test]
    async fn post_garbage_is_bad_request() {
        let app = router(Arc::new(MemoryStore::new()));
        let (status, body) = call(app, post("{{{")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid data");
    }

    #[tokio::test]
    async fn get_returns_top_ten_descending() {
        let store = Arc::new(MemoryStore::new());
        for i in 0..14 {
            store
                .insert(NewEntry { name: format!("p{i}"), score: (i * 7) % 13 })
                .unwrap();
        }
        let app = router(store);
        let (status, body) = call(app, get_top()).await;
        assert_eq!(status, StatusCode::OK);
        let rows = body.as_array().unwrap();
        assert_eq!(rows.len(), 10);
        let scores: Vec<i64> = rows.iter().map(|r| r["score"].as_i64().unwrap()).collect();
        assert!(scores.windows(2).all(|w| w[0] >= w[1]));
        assert_eq!(scores[0], 12);
        assert!(rows[0]["created_at"].is_string());
        assert!(rows[0]["name"].is_string());
    }

    #[tokio::test]
    async fn posted_entry_is_listed() {
        let store: Arc<dyn LeaderboardStore> = Arc::new(MemoryStore::new());
        let (status, _) = call(router(store.clone()), post(r#"{"name":"Ada","score":42}"#)).await;
        assert_eq!(status, StatusCode::OK);
        let (_, body) = call(router(store), get_top()).await;
        assert_eq!(body[0]["name"], "Ada");
        assert_eq!(body[0]["score"], 42);
    }

    #[tokio::test]
    async fn store_failure_is_server_error() {
        let store: Arc<dyn LeaderboardStore> = Arc::new(BrokenStore);
        let (status, body) = call(router(store.clone()), get_top()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].is_string());
        let (status, body) = call(router(store), post(r#"{"name":"Ada","score":1}"#)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn health_is_ok() {
        let app = router(Arc::new(MemoryStore::new()));
        let req = Request::builder().uri("/api/health").body(Body::empty()).unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[test]
    fn resolve_addr_defaults_to_4000() {
        assert_eq!(resolve_addr(None, |_| None), "127.0.0.1:4000".parse().unwrap());
    }

    #[test]
    fn resolve_addr_prefers_explicit_then_env() {
        let explicit: SocketAddr = "0.0.0.0:9000".parse().unwrap();
        assert_eq!(resolve_addr(Some(explicit), |_| Some("1.2.3.4:5".into())), explicit);
        let addr = resolve_addr(None, |k| match k {
            "STACKFALL_LEADERBOARD_ADDR" => Some("127.0.0.1:4555".to_string()),
            _ => None,
        });
        assert_eq!(addr, "127.0.0.1:4555".parse().unwrap());
    }

    #[test]
    fn resolve_addr_ignores_invalid_addr_but_uses_port() {
        let addr = resolve_addr(None, |k| match k {
            "STACKFALL_LEADERBOARD_ADDR" => Some("not-an-addr".to_string()),
            "STACKFALL_LEADERBOARD_PORT" => Some("4557".to_string()),
            _ => None,
        });
        assert_eq!(addr, SocketAddr::from(([127, 0, 0, 1], 4557)));
    }
}
