// SPDX-FileCopyrightText: 2026 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Configuration for the contact-form relay.
//!
//! Mail settings are deliberately optional at load time: a deployment with
//! an incomplete mail configuration still serves health checks and
//! preflights, and each submission fails at the configuration-check stage
//! with an error naming the absent keys.

use serde::{Deserialize, Serialize};

/// Default endpoint of the bot-score verification service.
pub const DEFAULT_VERIFY_URL: &str = "https://www.google.com/recaptcha/api/siteverify";

/// Configuration for the contact-form relay service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server bind address (default: 0.0.0.0:8080)
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Bot-score verification configuration
    #[serde(default)]
    pub verification: VerificationMode,

    /// Mail relay configuration
    #[serde(default)]
    pub mail: MailConfig,
}

/// Sliding-window rate limit parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Maximum admitted submissions per client per window (default: 5)
    #[serde(default = "default_max_per_window")]
    pub max_per_window: u32,

    /// Window length in milliseconds (default: 3,600,000 — one hour)
    #[serde(default = "default_window_ms")]
    pub window_ms: u64,
}

/// Bot-score verification mode.
///
/// Modeled as an explicit state rather than an optional secret so the
/// fail-open behavior of an unverified deployment is visible configuration,
/// not an accidental fallthrough: `Disabled` passes every submission
/// through, `Enforced` rejects on a missing or bad token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum VerificationMode {
    /// Verify every submission token against the configured service.
    Enforced {
        secret: String,
        #[serde(default = "default_verify_url")]
        verify_url: String,
    },
    /// No secret configured; verification is bypassed entirely.
    Disabled,
}

/// Mail relay settings. All six values are required for delivery.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MailConfig {
    #[serde(default)]
    pub smtp_host: Option<String>,
    #[serde(default)]
    pub smtp_port: Option<u16>,
    #[serde(default)]
    pub smtp_user: Option<String>,
    #[serde(default)]
    pub smtp_pass: Option<String>,
    /// Sender address for both outgoing messages
    #[serde(default)]
    pub mail_from: Option<String>,
    /// Operator address receiving the notification
    #[serde(default)]
    pub mail_to: Option<String>,
}

// Default value functions
fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_max_per_window() -> u32 {
    5
}

fn default_window_ms() -> u64 {
    3_600_000 // one hour
}

fn default_verify_url() -> String {
    DEFAULT_VERIFY_URL.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            rate_limit: RateLimitConfig::default(),
            verification: VerificationMode::default(),
            mail: MailConfig::default(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_per_window: default_max_per_window(),
            window_ms: default_window_ms(),
        }
    }
}

impl Default for VerificationMode {
    fn default() -> Self {
        Self::Disabled
    }
}

impl VerificationMode {
    pub fn is_enforced(&self) -> bool {
        matches!(self, Self::Enforced { .. })
    }
}

impl MailConfig {
    /// Names of required settings that are absent, in env-variable form.
    /// Empty after a full configuration; checked before any relay connection.
    pub fn missing_keys(&self) -> Vec<&'static str> {
        fn absent(value: &Option<String>) -> bool {
            value.as_deref().map_or(true, |s| s.trim().is_empty())
        }

        let mut missing = Vec::new();
        if absent(&self.smtp_host) {
            missing.push("SMTP_HOST");
        }
        if self.smtp_port.is_none() {
            missing.push("SMTP_PORT");
        }
        if absent(&self.smtp_user) {
            missing.push("SMTP_USER");
        }
        if absent(&self.smtp_pass) {
            missing.push("SMTP_PASS");
        }
        if absent(&self.mail_from) {
            missing.push("MAIL_FROM");
        }
        if absent(&self.mail_to) {
            missing.push("MAIL_TO");
        }
        missing
    }

    pub fn is_complete(&self) -> bool {
        self.missing_keys().is_empty()
    }
}
