// SPDX-FileCopyrightText: 2026 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Contact-Form Relay
//!
//! This crate accepts contact-form submissions, filters abuse, and relays
//! each accepted submission by email:
//!
//! - Per-client sliding-window rate limiting (5 per hour default)
//! - Bot-score verification against a reCAPTCHA-style service
//! - Operator notification + sender confirmation over one SMTP session
//!
//! The pipeline runs method check → rate limit → body validation →
//! bot-score verification → mail configuration check → delivery, stopping
//! at the first failing stage.

pub mod config;
pub mod error;
pub mod handlers;
pub mod limiter;
pub mod mailer;
pub mod verifier;

pub use config::{Config, MailConfig, RateLimitConfig, VerificationMode};
pub use error::AppError;
pub use handlers::{router, AppState};
pub use limiter::{RateLimitDecision, RateLimiter};
pub use mailer::{DeliveryError, Notifier, Submission, SubmissionNotifier};
pub use verifier::{BotScoreVerifier, TokenVerifier, VerificationOutcome};
