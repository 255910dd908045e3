pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::sponsors::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/sponsor-tags", get(handlers::handle_list_tags))
        .route("/api/v1/sponsor-tags/seed", post(handlers::handle_seed_tags))
        .route("/api/v1/sponsors", get(handlers::handle_list_sponsors))
        .route(
            "/api/v1/sponsors/:user_id",
            get(handlers::handle_get_sponsor)
                .put(handlers::handle_save_sponsor)
                .delete(handlers::handle_delete_sponsor),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use serde_json::Value;
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;

    use super::*;
    use crate::sponsors::catalog::TagCatalog;

    /// Router over a pool that never connects; only routes that answer
    /// before touching the database can be exercised.
    fn router() -> Router {
        let db = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/sponsors_test")
            .unwrap();
        build_router(AppState {
            db,
            catalog: Arc::new(TagCatalog::builtin()),
        })
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = router()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn test_save_rejects_unknown_availability_before_db() {
        let body = r#"{"availability": {"unknown": 9}, "contact": "email"}"#;
        let response = router()
            .oneshot(
                Request::put(format!("/api/v1/sponsors/{}", uuid::Uuid::new_v4()))
                    .header("content-type", "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_save_rejects_non_http_guideline_url() {
        let body = r#"{"availability": "public", "contact": "irc",
                       "guidelines": "url", "guidelines_text": "javascript:alert(1)"}"#;
        let response = router()
            .oneshot(
                Request::put(format!("/api/v1/sponsors/{}", uuid::Uuid::new_v4()))
                    .header("content-type", "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_malformed_user_id_rejected() {
        let response = router()
            .oneshot(
                Request::get("/api/v1/sponsors/not-a-uuid")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
