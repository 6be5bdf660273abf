// SPDX-FileCopyrightText: 2026 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! HTTP handlers for the contact-form relay.
//!
//! The submission endpoint is mounted with `any()` plus a router fallback
//! so the method check is explicit: OPTIONS preflights answer 200 with an
//! empty body, anything other than POST answers 405, and POST enters the
//! pipeline. Every response, success or failure, carries the CORS header
//! triple.

use crate::config::Config;
use crate::error::AppError;
use crate::limiter::RateLimiter;
use crate::mailer::{Submission, SubmissionNotifier};
use crate::verifier::TokenVerifier;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode};
use axum::middleware::map_response;
use axum::response::{IntoResponse, Response};
use axum::routing::{any, get};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Minimum acceptable bot score for an otherwise successful verification.
/// Exactly 0.5 passes; anything below is treated as suspicious.
const MIN_BOT_SCORE: f64 = 0.5;

/// Shared application state.
pub struct AppState {
    pub limiter: RateLimiter,
    pub verifier: Arc<dyn TokenVerifier>,
    pub notifier: Arc<dyn SubmissionNotifier>,
    pub config: Config,
}

/// Wire shape of a contact-form POST body. Fields default to empty so a
/// missing field and an empty field fail validation the same way instead
/// of surfacing as a JSON parse error.
#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub message: String,
    #[serde(default, rename = "recaptchaToken")]
    pub recaptcha_token: Option<String>,
}

impl SubmitRequest {
    fn into_parts(self) -> Result<(Submission, Option<String>), AppError> {
        if self.name.trim().is_empty()
            || self.email.trim().is_empty()
            || self.subject.trim().is_empty()
            || self.message.trim().is_empty()
        {
            return Err(AppError::MissingFields);
        }
        Ok((
            Submission {
                name: self.name,
                email: self.email,
                subject: self.subject,
                message: self.message,
            },
            self.recaptcha_token,
        ))
    }
}

/// Success response body.
#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub message: String,
    pub success: bool,
    #[serde(rename = "messageId")]
    pub message_id: String,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "contact-form-relay",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Build the service router. The fallback routes every unmatched path to
/// the submission handler so OPTIONS and the 405 row apply to any path,
/// matching the single-function deployment this service replaces.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route("/api/contact", any(submit))
        .fallback(submit)
        .layer(map_response(apply_cors))
        .with_state(state)
}

/// Stamp the CORS triple onto a response; applied to every route.
async fn apply_cors(mut response: Response) -> Response {
    let headers = response.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("POST, OPTIONS"),
    );
    response
}

/// Entry point for contact-form submissions: method check, then the
/// staged pipeline.
pub async fn submit(
    State(state): State<Arc<AppState>>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if method == Method::OPTIONS {
        return StatusCode::OK.into_response();
    }
    if method != Method::POST {
        debug!(method = %method, "method not allowed");
        return AppError::MethodNotAllowed.into_response();
    }

    match handle_submission(&state, &headers, &body).await {
        Ok(ok) => (StatusCode::OK, Json(ok)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// The pipeline proper: rate limit → parse/validate → verify → config
/// check → deliver, early exit on the first failing stage.
async fn handle_submission(
    state: &AppState,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<SubmitResponse, AppError> {
    let client_id = client_identifier(headers);

    // Admission is booked here, before validation. A failing downstream
    // stage does not refund the slot, so a broken delivery cannot be
    // retried past the window bound.
    let decision = state.limiter.check(&client_id).await;
    if !decision.allowed {
        let reset_at = decision.reset_at();
        info!(client_id = %client_id, reset_at = %reset_at.to_rfc3339(), "submission rate limited");
        return Err(AppError::RateLimited {
            reset_at,
            limit: state.config.rate_limit.max_per_window,
        });
    }

    let form: SubmitRequest = serde_json::from_slice(body).map_err(|e| {
        debug!(client_id = %client_id, error = %e, "body is not valid JSON");
        AppError::InvalidJson
    })?;
    let (submission, token) = form.into_parts()?;

    let outcome = state.verifier.verify(token.as_deref()).await;
    if !outcome.success {
        info!(client_id = %client_id, error = ?outcome.error, "bot-score verification failed");
        return Err(AppError::VerificationFailed);
    }
    if let Some(score) = outcome.score {
        if score < MIN_BOT_SCORE {
            info!(client_id = %client_id, score, "bot score below threshold");
            return Err(AppError::SuspiciousActivity);
        }
    }

    let missing = state.config.mail.missing_keys();
    if !missing.is_empty() {
        warn!(missing = ?missing, "mail configuration incomplete");
        return Err(AppError::Misconfigured { missing });
    }

    let message_id = state.notifier.deliver(&submission).await.map_err(|e| {
        warn!(client_id = %client_id, error = %e, "submission delivery failed");
        AppError::Delivery(e.to_string())
    })?;

    info!(client_id = %client_id, message_id = %message_id, "submission relayed");
    Ok(SubmitResponse {
        message: "Message sent successfully".to_string(),
        success: true,
        message_id,
    })
}

/// Derive the rate-limit partition key from forwarding headers.
///
/// The value is client-forgeable unless a trusted proxy overwrites these
/// headers, and everything unidentifiable shares the "unknown" bucket.
/// Both are accepted limitations of this design.
fn client_identifier(headers: &HeaderMap) -> String {
    if let Some(forwarded) = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
    {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }

    if let Some(real_ip) = headers.get("x-real-ip").and_then(|v| v.to_str().ok()) {
        let real_ip = real_ip.trim();
        if !real_ip.is_empty() {
            return real_ip.to_string();
        }
    }

    "unknown".to_string()
}
