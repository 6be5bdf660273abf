// SPDX-FileCopyrightText: 2026 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Contact-Form Relay Service
//!
//! Accepts contact-form submissions over HTTP, throttles abusive callers,
//! verifies a bot score when a secret is configured, and relays accepted
//! submissions as two emails (operator notification + sender confirmation).
//!
//! ## Configuration
//!
//! Configuration is loaded from environment variables (a `.env` file is
//! honored):
//!
//! - `BIND_ADDR`: server bind address (default: 0.0.0.0:8080)
//! - `RATE_LIMIT_MAX`: admitted submissions per client per window (default: 5)
//! - `RATE_LIMIT_WINDOW_MS`: window length in ms (default: 3600000)
//! - `RECAPTCHA_SECRET`: verification secret; verification is bypassed
//!   when unset
//! - `VERIFY_URL`: verification endpoint override
//! - `SMTP_HOST`, `SMTP_PORT`, `SMTP_USER`, `SMTP_PASS`, `MAIL_FROM`,
//!   `MAIL_TO`: mail relay settings, all six required for delivery

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use contact_form_relay::{
    config::{Config, MailConfig, RateLimitConfig, VerificationMode, DEFAULT_VERIFY_URL},
    handlers::{router, AppState},
    limiter::RateLimiter,
    mailer::Notifier,
    verifier::BotScoreVerifier,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = load_config();
    info!(
        bind_addr = %config.bind_addr,
        max_per_window = config.rate_limit.max_per_window,
        window_ms = config.rate_limit.window_ms,
        verification_enforced = config.verification.is_enforced(),
        mail_configured = config.mail.is_complete(),
        "Starting contact-form relay"
    );

    // Create application state
    let state = Arc::new(AppState {
        limiter: RateLimiter::new(config.rate_limit.clone()),
        verifier: Arc::new(BotScoreVerifier::new(config.verification.clone())),
        notifier: Arc::new(Notifier::new(config.mail.clone())),
        config: config.clone(),
    });

    // Build router
    let app = router(state).layer(TraceLayer::new_for_http());

    // Start server
    let addr: SocketAddr = config.bind_addr.parse()?;
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %addr, "Server listening");

    axum::serve(listener, app).await?;

    Ok(())
}

/// Load configuration from environment variables.
fn load_config() -> Config {
    let verification = match std::env::var("RECAPTCHA_SECRET") {
        Ok(secret) if !secret.trim().is_empty() => VerificationMode::Enforced {
            secret,
            verify_url: std::env::var("VERIFY_URL")
                .unwrap_or_else(|_| DEFAULT_VERIFY_URL.to_string()),
        },
        _ => VerificationMode::Disabled,
    };

    Config {
        bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
        rate_limit: RateLimitConfig {
            max_per_window: std::env::var("RATE_LIMIT_MAX")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5),
            window_ms: std::env::var("RATE_LIMIT_WINDOW_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3_600_000),
        },
        verification,
        mail: MailConfig {
            smtp_host: env_opt("SMTP_HOST"),
            smtp_port: std::env::var("SMTP_PORT").ok().and_then(|v| v.parse().ok()),
            smtp_user: env_opt("SMTP_USER"),
            smtp_pass: env_opt("SMTP_PASS"),
            mail_from: env_opt("MAIL_FROM"),
            mail_to: env_opt("MAIL_TO"),
        },
    }
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
