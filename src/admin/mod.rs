//! Read-only admin API.
//!
//! # Endpoints
//! - `GET /admin/status`: version, provider and rule counts
//! - `GET /admin/rules`: active rules in match order
//! - `GET /admin/providers`: reconciliation status per provider
//!
//! Every endpoint requires `Authorization: Bearer <admin.api_key>`.

pub mod auth;
pub mod handlers;

use std::sync::Arc;

use axum::{middleware, routing::get, Router};

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::rules::{ProviderStatusTable, RuleRepository};

#[derive(Clone)]
pub struct AdminState {
    pub repository: Arc<RuleRepository>,
    pub status: Arc<ProviderStatusTable>,
    pub api_key: Arc<str>,
}

pub fn admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/rules", get(get_rules))
        .route("/admin/providers", get(get_providers))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::factory::tests::{factory, rule_config};
    use crate::rules::{Reconciler, RuleSetChangedEvent};
    use axum::body::Body;
    use axum::http::{header::AUTHORIZATION, Request, StatusCode};
    use tower::ServiceExt;

    const KEY: &str = "0123456789abcdef";

    fn router() -> Router {
        let repository = Arc::new(RuleRepository::new());
        let status = Arc::new(ProviderStatusTable::new());
        let mut reconciler = Reconciler::new(factory(), repository.clone(), status.clone());
        reconciler
            .apply(
                RuleSetChangedEvent::created(
                    "file:rules.json",
                    vec![rule_config("a", "/a/**"), rule_config("b", "/a/b")],
                )
                .with_version("v1"),
            )
            .unwrap();

        admin_router(AdminState {
            repository,
            status,
            api_key: Arc::from(KEY),
        })
    }

    async fn get(router: Router, path: &str, key: Option<&str>) -> (StatusCode, serde_json::Value) {
        let mut request = Request::builder().uri(path);
        if let Some(key) = key {
            request = request.header(AUTHORIZATION, format!("Bearer {}", key));
        }
        let response = router.oneshot(request.body(Body::empty()).unwrap()).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), 64 * 1024).await.unwrap();
        let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn test_requires_api_key() {
        let (status, _) = get(router(), "/admin/status", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = get(router(), "/admin/status", Some("wrong-key-wrong-key")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_status_rules_and_providers() {
        let (status, body) = get(router(), "/admin/status", Some(KEY)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["providers"], 1);
        assert_eq!(body["rules"], 2);

        let (_, body) = get(router(), "/admin/rules", Some(KEY)).await;
        let ids: Vec<&str> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert_eq!(body[0]["methods"], serde_json::json!(["GET"]));

        let (_, body) = get(router(), "/admin/providers", Some(KEY)).await;
        assert_eq!(body[0]["provider"], "file:rules.json");
        assert_eq!(body[0]["version"], "v1");
        assert_eq!(body[0]["rule_count"], 2);
        assert_eq!(body[0]["last_change"], "created");
    }
}
