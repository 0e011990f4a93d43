// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Notification gateway seam.
//!
//! The engines only know `send(to, subject, html)`; delivery is an external
//! transactional email service reached over HTTP.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::json;

use crate::error::CoreError;

/// Outbound notification capability.
#[async_trait]
pub trait NotificationGateway: Send + Sync {
    /// Send one email. Returns an error on delivery failure; callers decide
    /// whether that failure is isolated or propagated.
    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<(), CoreError>;
}

/// HTTP client for the transactional email service.
pub struct HttpEmailGateway {
    client: reqwest::Client,
    api_url: String,
    api_token: String,
}

impl HttpEmailGateway {
    /// Create a gateway targeting the given email service endpoint.
    pub fn new(api_url: String, api_token: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url,
            api_token,
        }
    }
}

#[async_trait]
impl NotificationGateway for HttpEmailGateway {
    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<(), CoreError> {
        let body = json!({
            "to": to,
            "subject": subject,
            "html": html,
        });

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| CoreError::NotificationFailed {
                recipient: to.to_string(),
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(CoreError::NotificationFailed {
                recipient: to.to_string(),
                reason: format!("email service returned {}", response.status()),
            });
        }

        Ok(())
    }
}

/// A sent email captured by [`RecordingGateway`].
#[derive(Debug, Clone)]
pub struct SentEmail {
    /// Recipient address.
    pub to: String,
    /// Subject line.
    pub subject: String,
    /// Rendered HTML body.
    pub html: String,
}

/// Recording gateway used by tests: captures every send, and can be toggled
/// to fail so failure-isolation paths are exercised.
#[derive(Default)]
pub struct RecordingGateway {
    sent: Mutex<Vec<SentEmail>>,
    failing: AtomicBool,
}

impl RecordingGateway {
    /// Create an empty recording gateway.
    pub fn new() -> Self {
        Self::default()
    }

    /// All emails captured so far.
    pub fn sent(&self) -> Vec<SentEmail> {
        self.sent.lock().unwrap().clone()
    }

    /// Number of emails captured so far.
    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    /// When set, every send fails without recording.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl NotificationGateway for RecordingGateway {
    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<(), CoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(CoreError::NotificationFailed {
                recipient: to.to_string(),
                reason: "recording gateway set to fail".to_string(),
            });
        }

        self.sent.lock().unwrap().push(SentEmail {
            to: to.to_string(),
            subject: subject.to_string(),
            html: html.to_string(),
        });
        Ok(())
    }
}
