// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Shared application state for the HTTP handlers.

use std::sync::Arc;
use std::time::Instant;

use certflow_core::checkout::CheckoutService;
use certflow_core::issuer::IssuerEngine;
use certflow_core::lifecycle::LifecycleEngine;
use certflow_core::notify::NotificationGateway;
use certflow_core::payment::PaymentGateway;
use certflow_core::persistence::Repository;
use certflow_core::reconcile::ReconcileEngine;
use certflow_core::templates::Branding;

/// State threaded through every handler.
#[derive(Clone)]
pub struct AppState {
    /// Persistence backend, used directly by the health check.
    pub repo: Arc<dyn Repository>,
    /// Certificate expiry engine.
    pub lifecycle: Arc<LifecycleEngine>,
    /// Quiz grading and certificate minting engine.
    pub issuer: Arc<IssuerEngine>,
    /// Checkout session service.
    pub checkout: Arc<CheckoutService>,
    /// Payment event reconciliation engine.
    pub reconcile: Arc<ReconcileEngine>,
    /// Webhook HMAC key.
    pub webhook_secret: String,
    /// Optional shared secret guarding the manual trigger endpoints.
    pub cron_secret: Option<String>,
    /// Crate version reported by the health check.
    pub version: String,
    /// Process start time, for uptime reporting.
    pub started_at: Instant,
}

impl AppState {
    /// Wire the engines over the given store and gateways.
    pub fn new(
        repo: Arc<dyn Repository>,
        mail: Arc<dyn NotificationGateway>,
        payments: Arc<dyn PaymentGateway>,
        branding: Branding,
        webhook_secret: String,
        cron_secret: Option<String>,
    ) -> Self {
        let lifecycle = Arc::new(LifecycleEngine::new(
            repo.clone(),
            mail.clone(),
            branding.clone(),
        ));
        let issuer = Arc::new(IssuerEngine::new(
            repo.clone(),
            mail.clone(),
            branding.clone(),
        ));
        let checkout = Arc::new(CheckoutService::new(
            repo.clone(),
            payments,
            branding.client_url.clone(),
        ));
        let reconcile = Arc::new(ReconcileEngine::new(repo.clone(), mail, branding));

        Self {
            repo,
            lifecycle,
            issuer,
            checkout,
            reconcile,
            webhook_secret,
            cron_secret,
            version: env!("CARGO_PKG_VERSION").to_string(),
            started_at: Instant::now(),
        }
    }

    /// Seconds since the state was created.
    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
