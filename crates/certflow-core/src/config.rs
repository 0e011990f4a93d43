// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Configuration loading from environment variables.

/// Certflow configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection URL
    pub database_url: String,
    /// HTTP listen port
    pub http_port: u16,
    /// Base URL of the learner-facing site (used in email links)
    pub client_url: String,
    /// Operations address that receives internal notifications
    pub ops_email: String,
    /// Transactional email service endpoint
    pub email_api_url: String,
    /// Bearer token for the email service
    pub email_api_token: String,
    /// Payment gateway REST endpoint
    pub payment_api_url: String,
    /// Payment gateway secret key
    pub payment_secret_key: String,
    /// Shared secret for verifying payment webhook signatures
    pub payment_webhook_secret: String,
    /// Optional shared secret guarding the manual trigger endpoint
    pub cron_secret: Option<String>,
    /// Cron expression for the daily certificate expiry check
    pub cert_check_cron: String,
    /// Cron expression for the daily course-completion reminder check
    pub reminder_cron: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Required:
    /// - `CERTFLOW_DATABASE_URL`: PostgreSQL connection string
    /// - `CERTFLOW_EMAIL_API_URL` / `CERTFLOW_EMAIL_API_TOKEN`: email service
    /// - `CERTFLOW_PAYMENT_API_URL` / `CERTFLOW_PAYMENT_SECRET_KEY`: gateway
    /// - `CERTFLOW_PAYMENT_WEBHOOK_SECRET`: webhook HMAC key
    ///
    /// Optional (with defaults):
    /// - `CERTFLOW_HTTP_PORT`: HTTP listen port (default: 8080)
    /// - `CERTFLOW_CLIENT_URL`: learner site base URL
    /// - `CERTFLOW_OPS_EMAIL`: operations notification address
    /// - `CERTFLOW_CRON_SECRET`: manual-trigger shared secret (default: none)
    /// - `CERTFLOW_CERT_CHECK_CRON`: expiry check schedule (default: `15 15 * * *`)
    /// - `CERTFLOW_REMINDER_CRON`: reminder check schedule (default: `45 15 * * *`)
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = require("CERTFLOW_DATABASE_URL")?;

        let http_port: u16 = std::env::var("CERTFLOW_HTTP_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .map_err(|_| {
                ConfigError::Invalid("CERTFLOW_HTTP_PORT", "must be a valid port number")
            })?;

        let client_url = std::env::var("CERTFLOW_CLIENT_URL")
            .unwrap_or_else(|_| "https://learn.certflow.dev".to_string());
        let ops_email = std::env::var("CERTFLOW_OPS_EMAIL")
            .unwrap_or_else(|_| "ops@certflow.dev".to_string());

        let email_api_url = require("CERTFLOW_EMAIL_API_URL")?;
        let email_api_token = require("CERTFLOW_EMAIL_API_TOKEN")?;
        let payment_api_url = require("CERTFLOW_PAYMENT_API_URL")?;
        let payment_secret_key = require("CERTFLOW_PAYMENT_SECRET_KEY")?;
        let payment_webhook_secret = require("CERTFLOW_PAYMENT_WEBHOOK_SECRET")?;

        let cron_secret = std::env::var("CERTFLOW_CRON_SECRET").ok();

        let cert_check_cron = std::env::var("CERTFLOW_CERT_CHECK_CRON")
            .unwrap_or_else(|_| "15 15 * * *".to_string());
        let reminder_cron = std::env::var("CERTFLOW_REMINDER_CRON")
            .unwrap_or_else(|_| "45 15 * * *".to_string());

        Ok(Self {
            database_url,
            http_port,
            client_url,
            ops_email,
            email_api_url,
            email_api_token,
            payment_api_url,
            payment_secret_key,
            payment_webhook_secret,
            cron_secret,
            cert_check_cron,
            reminder_cron,
        })
    }
}

fn require(name: &'static str) -> Result<String, ConfigError> {
    std::env::var(name).map_err(|_| ConfigError::Missing(name))
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required environment variable is missing.
    #[error("missing required environment variable: {0}")]
    Missing(&'static str),

    /// An environment variable has an invalid value.
    #[error("invalid value for {0}: {1}")]
    Invalid(&'static str, &'static str),
}
