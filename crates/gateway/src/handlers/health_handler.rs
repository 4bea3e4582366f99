//! Liveness report for the backing stores.

use axum::{extract::State, http::StatusCode, response::Json, routing::get, Router};
use serde::Serialize;
use utoipa::ToSchema;

use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DependencyStatus {
    Healthy,
    Unhealthy,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DependencyCheck {
    pub status: DependencyStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<E: std::fmt::Display> From<Result<(), E>> for DependencyCheck {
    fn from(result: Result<(), E>) -> Self {
        match result {
            Ok(()) => Self {
                status: DependencyStatus::Healthy,
                error: None,
            },
            Err(e) => Self {
                status: DependencyStatus::Unhealthy,
                error: Some(e.to_string()),
            },
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Dependencies {
    /// Absent when the gateway runs without a database handle
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<DependencyCheck>,
    pub revocation_store: DependencyCheck,
}

/// `status` is "healthy" only when every checked dependency is.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthReport {
    #[schema(example = "healthy")]
    pub status: String,
    pub version: String,
    pub services: Dependencies,
}

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/", get(health_check))
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "All dependencies reachable", body = HealthReport),
        (status = 503, description = "At least one dependency unreachable", body = HealthReport)
    )
)]
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthReport>) {
    let revocation_store = DependencyCheck::from(state.revocation_store.ping().await);
    let database = match &state.database {
        Some(db) => Some(DependencyCheck::from(db.ping().await)),
        None => None,
    };

    let degraded = revocation_store.status == DependencyStatus::Unhealthy
        || database
            .as_ref()
            .is_some_and(|check| check.status == DependencyStatus::Unhealthy);

    if degraded {
        tracing::warn!("Health check reports degraded dependencies");
    }

    let (code, status) = if degraded {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    } else {
        (StatusCode::OK, "healthy")
    };

    (
        code,
        Json(HealthReport {
            status: status.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            services: Dependencies {
                database,
                revocation_store,
            },
        }),
    )
}
