// SPDX-FileCopyrightText: 2026 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Error taxonomy for the submission pipeline.
//!
//! Each variant maps to exactly one terminal response: status code, stable
//! JSON `error` message, and any extra headers. Internal diagnostics go to
//! tracing; the response carries at most a short `details` string.

use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde_json::json;
use thiserror::Error;

/// Pipeline errors, one variant per failure stage.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("invalid JSON")]
    InvalidJson,

    #[error("all fields required")]
    MissingFields,

    #[error("rate limit exceeded")]
    RateLimited {
        reset_at: DateTime<Utc>,
        limit: u32,
    },

    #[error("verification failed")]
    VerificationFailed,

    #[error("suspicious activity detected")]
    SuspiciousActivity,

    #[error("server misconfigured")]
    Misconfigured { missing: Vec<&'static str> },

    #[error("delivery failed: {0}")]
    Delivery(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::InvalidJson | Self::MissingFields => StatusCode::BAD_REQUEST,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::VerificationFailed | Self::SuspiciousActivity => StatusCode::FORBIDDEN,
            Self::Misconfigured { .. } | Self::Delivery(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = match &self {
            AppError::RateLimited { reset_at, .. } => json!({
                "error": "Too many requests. Please try again later.",
                "resetTime": reset_at.to_rfc3339(),
            }),
            AppError::Misconfigured { missing } => json!({
                "error": "server misconfigured",
                "details": format!("missing: {}", missing.join(", ")),
            }),
            AppError::Delivery(detail) => json!({
                "error": "internal error",
                "details": detail,
            }),
            other => json!({ "error": other.to_string() }),
        };

        let mut response = (self.status(), Json(body)).into_response();

        if let AppError::RateLimited { reset_at, limit } = &self {
            let headers = response.headers_mut();
            headers.insert("x-ratelimit-limit", HeaderValue::from(*limit));
            headers.insert("x-ratelimit-remaining", HeaderValue::from_static("0"));
            if let Ok(value) = HeaderValue::from_str(&reset_at.to_rfc3339()) {
                headers.insert("x-ratelimit-reset", value);
            }
        }

        response
    }
}
