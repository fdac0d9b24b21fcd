//! Admin API.
//!
//! Bearer-token protected endpoints for inspecting the service tree and
//! feeding it status reports from an external health checker.

pub mod auth;
pub mod handlers;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, put},
    Router,
};

use crate::load_balancer::ServiceManager;
use self::auth::admin_auth_middleware;
use self::handlers::*;

/// State shared by admin handlers.
#[derive(Clone)]
pub struct AdminState {
    pub manager: Arc<ServiceManager>,
    pub api_key: Arc<str>,
}

impl AdminState {
    pub fn new(manager: Arc<ServiceManager>, api_key: &str) -> Self {
        Self {
            manager,
            api_key: Arc::from(api_key),
        }
    }
}

pub fn setup_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/services", get(get_services))
        .route(
            "/admin/services/{service}/servers/{server}/status",
            put(put_server_status),
        )
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use tower::ServiceExt;

    const KEY: &str = "secret";

    fn router() -> (Router, Arc<ServiceManager>) {
        let config = parse_config(
            r#"
            [listener]
            service = "web"

            [[services]]
            name = "web"
            health_check = true
            servers = [
                { name = "w1", url = "http://127.0.0.1:3001" },
                { name = "w2", url = "http://127.0.0.1:3002" },
            ]
            "#,
        )
        .unwrap();
        let manager = Arc::new(ServiceManager::new(&config).unwrap());
        (setup_admin_router(AdminState::new(manager.clone(), KEY)), manager)
    }

    fn put_status(path: &str, body: &'static str) -> Request<Body> {
        Request::builder()
            .method("PUT")
            .uri(path)
            .header(header::AUTHORIZATION, format!("Bearer {}", KEY))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_requires_token() {
        let (router, _) = router();
        let request = Request::builder().uri("/admin/status").body(Body::empty()).unwrap();
        let response = router.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let request = Request::builder()
            .uri("/admin/status")
            .header(header::AUTHORIZATION, "Bearer wrong")
            .body(Body::empty())
            .unwrap();
        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_list_services() {
        let (router, _) = router();
        let request = Request::builder()
            .uri("/admin/services")
            .header(header::AUTHORIZATION, format!("Bearer {}", KEY))
            .body(Body::empty())
            .unwrap();
        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), 4096).await.unwrap();
        let services: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(services[0]["name"], "web");
        assert_eq!(services[0]["healthy"], true);
        assert_eq!(services[0]["servers"][1]["name"], "w2");
        assert_eq!(services[0]["servers"][1]["pending"], 0);
    }

    #[tokio::test]
    async fn test_set_status() {
        let (router, manager) = router();
        let response = router
            .clone()
            .oneshot(put_status("/admin/services/web/servers/w1/status", r#"{"healthy":false}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(manager.entry().healthy_count(), 1);

        let response = router
            .oneshot(put_status("/admin/services/nope/servers/w1/status", r#"{"healthy":false}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
