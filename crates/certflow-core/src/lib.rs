// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Certflow Core - Certificate Lifecycle Engine
//!
//! This crate provides the domain engines for an e-learning training
//! platform: certificate issuance and renewal, completion reminders, and
//! order/payment reconciliation, persisting all state to PostgreSQL.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       Storefront / LMS                      │
//! └─────────────────────────────────────────────────────────────┘
//!        │ quiz submissions      │ orders        │ webhooks
//!        ▼                       ▼               ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     certflow-server (HTTP)                  │
//! └─────────────────────────────────────────────────────────────┘
//!        │                       │               │
//!        ▼                       ▼               ▼
//! ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────────┐
//! │  Issuer   │  │ Lifecycle │  │ Reminder  │  │  Reconcile    │
//! │ (quizzes) │  │ (expiry)  │  │ (orders)  │  │  (payments)   │
//! └───────────┘  └───────────┘  └───────────┘  └───────────────┘
//!        │              │              │               │
//!        └──────────────┴──────┬───────┴───────────────┘
//!                              ▼
//!                     ┌─────────────────┐
//!                     │   PostgreSQL    │
//!                     └─────────────────┘
//! ```
//!
//! # Certificate Status State Machine
//!
//! ```text
//!      ┌────────┐  ≤30 days   ┌───────────────┐  ≤0 days  ┌─────────┐
//!      │ active │────────────▶│ expiring_soon │──────────▶│ expired │
//!      └────────┘             └───────────────┘           └─────────┘
//!           │                                                  ▲
//!           └──────────────────────────────────────────────────┘
//!                             ≤0 days (missed window)
//! ```
//!
//! `expired` is terminal. Warning emails fire at the 30-day, 7-day and 1-day
//! marks plus once on expiry, each tier at most once per certificate; a pass
//! that runs after a gap resolves every tier that became due in between.
//!
//! # Configuration
//!
//! Configuration is loaded from environment variables:
//!
//! | Variable | Required | Default | Description |
//! |----------|----------|---------|-------------|
//! | `CERTFLOW_DATABASE_URL` | Yes | - | PostgreSQL connection string |
//! | `CERTFLOW_HTTP_PORT` | No | `8080` | HTTP API port |
//! | `CERTFLOW_CLIENT_URL` | No | `https://learn.certflow.dev` | Learner-facing site URL |
//! | `CERTFLOW_OPS_EMAIL` | No | `ops@certflow.dev` | Operations notification address |
//! | `CERTFLOW_EMAIL_API_URL` | Yes | - | Transactional email service endpoint |
//! | `CERTFLOW_EMAIL_API_TOKEN` | Yes | - | Email service bearer token |
//! | `CERTFLOW_PAYMENT_API_URL` | Yes | - | Payment gateway API base URL |
//! | `CERTFLOW_PAYMENT_SECRET_KEY` | Yes | - | Payment gateway API key |
//! | `CERTFLOW_PAYMENT_WEBHOOK_SECRET` | Yes | - | Webhook HMAC key |
//! | `CERTFLOW_CRON_SECRET` | No | - | Shared secret for manual triggers |
//! | `CERTFLOW_CERT_CHECK_CRON` | No | `15 15 * * *` | Expiry pass schedule |
//! | `CERTFLOW_REMINDER_CRON` | No | `45 15 * * *` | Reminder pass schedule |
//!
//! # Modules
//!
//! - [`config`]: Configuration from environment variables
//! - [`error`]: Error types with stable error code mapping
//! - [`model`]: Domain types (statuses, tiers, payment events)
//! - [`persistence`]: Repository trait with PostgreSQL and in-memory backends
//! - [`lifecycle`]: Daily certificate expiry engine
//! - [`issuer`]: Quiz grading and certificate minting
//! - [`reminder`]: Paid-but-unstarted course reminders
//! - [`reconcile`]: Payment event reconciliation
//! - [`checkout`]: Hosted checkout session creation
//! - [`payment`]: Payment gateway client and webhook verification
//! - [`notify`]: Notification gateway (transactional email)
//! - [`templates`]: Email subject and HTML rendering
//! - [`schedule`]: In-process cron dispatch for the batch engines

#![deny(missing_docs)]

/// Configuration loaded from environment variables.
pub mod config;

/// Error types for engine operations with stable error code mapping.
pub mod error;

/// Domain types shared across the engines.
pub mod model;

/// Repository trait and PostgreSQL / in-memory backends.
pub mod persistence;

/// Daily certificate expiry engine.
pub mod lifecycle;

/// Quiz grading and certificate minting.
pub mod issuer;

/// Reminders for paid orders with no quiz progress.
pub mod reminder;

/// Payment event reconciliation against local orders.
pub mod reconcile;

/// Checkout session creation and pending order persistence.
pub mod checkout;

/// Payment gateway seam: sessions, webhook signatures, event parsing.
pub mod payment;

/// Notification gateway for outbound email.
pub mod notify;

/// Email templates.
pub mod templates;

/// Cron-matched dispatch for the batch engines.
pub mod schedule;
