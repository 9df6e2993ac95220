// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Liveness and readiness checks.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::state::AppState;

/// Key looked up on the record store; it never exists.
const RECORDS_CHECK_KEY: &str = "health:check";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Ok,
    Unavailable,
}

impl CheckStatus {
    fn from_check<E: std::fmt::Display>(component: &str, check: Result<(), E>) -> Self {
        match check {
            Ok(()) => CheckStatus::Ok,
            Err(e) => {
                tracing::warn!(component, error = %e, "Readiness check failed");
                CheckStatus::Unavailable
            }
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ComponentChecks {
    /// Sealed keyring volume (write, read and delete of a scratch file).
    pub keyring: CheckStatus,
    /// Record store point lookup.
    pub records: CheckStatus,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReadinessReport {
    pub status: CheckStatus,
    pub version: String,
    pub checks: ComponentChecks,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LivenessReport {
    pub status: CheckStatus,
}

fn readiness_report(state: &AppState) -> ReadinessReport {
    let checks = ComponentChecks {
        keyring: CheckStatus::from_check("keyring", state.storage.health_check()),
        records: CheckStatus::from_check("records", state.records.has(RECORDS_CHECK_KEY).map(|_| ())),
    };
    let ready = checks.keyring == CheckStatus::Ok && checks.records == CheckStatus::Ok;

    ReadinessReport {
        status: if ready { CheckStatus::Ok } else { CheckStatus::Unavailable },
        version: env!("CARGO_PKG_VERSION").to_string(),
        checks,
    }
}

/// Process is up. Dependencies are not consulted.
#[utoipa::path(
    get,
    path = "/health/live",
    tag = "Health",
    responses((status = 200, description = "Process is running", body = LivenessReport))
)]
pub async fn liveness() -> Json<LivenessReport> {
    Json(LivenessReport {
        status: CheckStatus::Ok,
    })
}

/// 200 when the keyring volume and the record store both answer, 503
/// otherwise.
#[utoipa::path(
    get,
    path = "/health/ready",
    tag = "Health",
    responses(
        (status = 200, description = "Ready to serve", body = ReadinessReport),
        (status = 503, description = "A dependency is unavailable", body = ReadinessReport)
    )
)]
pub async fn readiness(State(state): State<AppState>) -> (StatusCode, Json<ReadinessReport>) {
    let report = readiness_report(&state);
    let status = match report.status {
        CheckStatus::Ok => StatusCode::OK,
        CheckStatus::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status, Json(report))
}

/// Same report as `/health/ready`.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Ready to serve", body = ReadinessReport),
        (status = 503, description = "A dependency is unavailable", body = ReadinessReport)
    )
)]
pub async fn health(state: State<AppState>) -> (StatusCode, Json<ReadinessReport>) {
    readiness(state).await
}
