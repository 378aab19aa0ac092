use axum::{extract::State, Json};
use serde::Serialize;

use crate::admin::AdminState;
use crate::rules::ProviderStatus;

#[derive(Debug, Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub providers: usize,
    pub rules: usize,
}

#[derive(Debug, Serialize)]
pub struct RuleSummary {
    pub id: String,
    pub provider: String,
    pub position: usize,
    /// Empty means any method.
    pub methods: Vec<String>,
    pub path: String,
    pub upstream: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProviderSummary {
    pub provider: String,
    #[serde(flatten)]
    pub status: ProviderStatus,
}

pub async fn get_status(State(state): State<AdminState>) -> Json<SystemStatus> {
    let index = state.repository.snapshot();

    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        providers: index.rule_sets().count(),
        rules: index.rule_count(),
    })
}

/// Rules of the current index, in match order.
pub async fn get_rules(State(state): State<AdminState>) -> Json<Vec<RuleSummary>> {
    let index = state.repository.snapshot();

    let rules = index
        .rules()
        .iter()
        .map(|rule| RuleSummary {
            id: rule.id().to_string(),
            provider: rule.provider().to_string(),
            position: rule.position(),
            methods: rule.methods().iter().map(|m| m.to_string()).collect(),
            path: rule.pattern().as_str().to_string(),
            upstream: rule.upstream().map(|u| u.to_string()),
        })
        .collect();

    Json(rules)
}

pub async fn get_providers(State(state): State<AdminState>) -> Json<Vec<ProviderSummary>> {
    let providers = state
        .status
        .snapshot()
        .into_iter()
        .map(|(provider, status)| ProviderSummary { provider, status })
        .collect();

    Json(providers)
}
