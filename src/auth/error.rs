// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::error::ApiError;

/// Rejections of the tenant header. Both answer 401 with the usual error
/// body.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("X-Profile-Id header is required")]
    MissingProfileHeader,

    /// Empty after trimming, or not visible ASCII.
    #[error("X-Profile-Id header is invalid")]
    InvalidProfileHeader,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        tracing::debug!(error = %self, "Request rejected at the tenant header");
        ApiError::new(StatusCode::UNAUTHORIZED, self.to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn rejection_is_a_401_with_an_error_body() {
        let response = AuthError::InvalidProfileHeader.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "X-Profile-Id header is invalid");
        assert!(body.get("fields").is_none());
    }
}
