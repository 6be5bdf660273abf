// SPDX-FileCopyrightText: 2026 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Bot-score verification client.
//!
//! Sends a client-supplied token to a reCAPTCHA-style verification service
//! and interprets the success flag and score. One attempt per submission,
//! no retries: transport and parse failures degrade to a rejection, never
//! to a silent bypass. When no secret is configured the verifier is
//! `Disabled` and passes everything through (fail open when unconfigured,
//! fail closed on a bad or missing token when enforced).

use crate::config::VerificationMode;
use serde::Deserialize;
use tracing::{debug, warn};

/// Result of one verification attempt.
#[derive(Debug, Clone)]
pub struct VerificationOutcome {
    pub success: bool,
    /// 0.0–1.0 estimate of human origin, when the service scores at all
    pub score: Option<f64>,
    pub error: Option<String>,
}

impl VerificationOutcome {
    /// Outcome of a bypassed check: implicit full score.
    pub fn passed() -> Self {
        Self {
            success: true,
            score: Some(1.0),
            error: None,
        }
    }

    fn rejected(error: impl Into<String>) -> Self {
        Self {
            success: false,
            score: None,
            error: Some(error.into()),
        }
    }
}

/// Wire shape of the verification service response.
#[derive(Debug, Deserialize)]
struct VerifyResponse {
    success: bool,
    #[serde(default)]
    score: Option<f64>,
    #[serde(default)]
    action: Option<String>,
    #[serde(default, rename = "error-codes")]
    error_codes: Option<Vec<String>>,
}

/// Seam over token verification so the pipeline can be exercised with a
/// substituted verifier in tests.
#[async_trait::async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: Option<&str>) -> VerificationOutcome;
}

/// Verification client backed by the configured service.
pub struct BotScoreVerifier {
    mode: VerificationMode,
    client: reqwest::Client,
}

impl BotScoreVerifier {
    pub fn new(mode: VerificationMode) -> Self {
        Self {
            mode,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait::async_trait]
impl TokenVerifier for BotScoreVerifier {
    async fn verify(&self, token: Option<&str>) -> VerificationOutcome {
        let (secret, verify_url) = match &self.mode {
            VerificationMode::Disabled => {
                debug!("verification disabled, passing submission through");
                return VerificationOutcome::passed();
            }
            VerificationMode::Enforced { secret, verify_url } => (secret, verify_url),
        };

        let token = match token {
            Some(t) if !t.trim().is_empty() => t,
            _ => {
                debug!("verification token missing");
                return VerificationOutcome::rejected("token missing");
            }
        };

        let response = match self
            .client
            .post(verify_url)
            .form(&[("secret", secret.as_str()), ("response", token)])
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "verification service unreachable");
                return VerificationOutcome::rejected(format!("verification request failed: {e}"));
            }
        };

        if !response.status().is_success() {
            warn!(status = %response.status(), "verification service returned an error status");
            return VerificationOutcome::rejected(format!(
                "verification service error: {}",
                response.status()
            ));
        }

        let body: VerifyResponse = match response.json().await {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %e, "verification response unparseable");
                return VerificationOutcome::rejected(format!("verification response invalid: {e}"));
            }
        };

        if !body.success {
            let codes = body.error_codes.unwrap_or_default().join(", ");
            debug!(codes = %codes, "verification service rejected the token");
            return VerificationOutcome {
                success: false,
                score: body.score,
                error: (!codes.is_empty()).then_some(codes),
            };
        }

        debug!(score = ?body.score, action = ?body.action, "token verified");
        VerificationOutcome {
            success: true,
            score: body.score,
            error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enforced() -> BotScoreVerifier {
        BotScoreVerifier::new(VerificationMode::Enforced {
            secret: "test-secret".to_string(),
            // Unroutable: any test that reaches the network here is a bug.
            verify_url: "http://127.0.0.1:1/siteverify".to_string(),
        })
    }

    #[tokio::test]
    async fn test_disabled_mode_passes_with_full_score() {
        let verifier = BotScoreVerifier::new(VerificationMode::Disabled);

        let outcome = verifier.verify(None).await;
        assert!(outcome.success);
        assert_eq!(outcome.score, Some(1.0));

        let outcome = verifier.verify(Some("ignored-token")).await;
        assert!(outcome.success);
    }

    #[tokio::test]
    async fn test_enforced_mode_rejects_missing_token_without_network() {
        let outcome = enforced().verify(None).await;
        assert!(!outcome.success);
        assert_eq!(outcome.error.as_deref(), Some("token missing"));
    }

    #[tokio::test]
    async fn test_enforced_mode_rejects_blank_token_without_network() {
        let outcome = enforced().verify(Some("   ")).await;
        assert!(!outcome.success);
        assert_eq!(outcome.error.as_deref(), Some("token missing"));
    }

    #[tokio::test]
    async fn test_transport_failure_degrades_to_rejection() {
        let outcome = enforced().verify(Some("some-token")).await;
        assert!(!outcome.success);
        assert!(outcome.error.is_some());
    }

    #[tokio::test]
    async fn test_wire_shape_tolerates_missing_score() {
        let body: VerifyResponse =
            serde_json::from_str(r#"{"success": true, "action": "contact"}"#).unwrap();
        assert!(body.success);
        assert!(body.score.is_none());

        let body: VerifyResponse = serde_json::from_str(
            r#"{"success": false, "error-codes": ["invalid-input-response"]}"#,
        )
        .unwrap();
        assert!(!body.success);
        assert_eq!(body.error_codes.unwrap(), vec!["invalid-input-response"]);
    }
}
