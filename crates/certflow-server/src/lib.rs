// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Certflow Server - HTTP API and scheduler
//!
//! Wires the certflow engines behind an axum HTTP API and runs the daily
//! batch schedule in-process. See `certflow-core` for the engines themselves.
//!
//! # Endpoints
//!
//! | Method | Path | Purpose |
//! |--------|------|---------|
//! | `GET` | `/health` | Database connectivity, version, uptime |
//! | `POST` | `/certificates/check-expiring` | Manual expiry pass trigger (optional shared secret) |
//! | `POST` | `/certificates/test-expiry-email` | Preview expiry emails for a user |
//! | `POST` | `/quiz-results` | Record a quiz submission; may mint a certificate |
//! | `POST` | `/orders` | Open a checkout session, persist a pending order |
//! | `POST` | `/payments/webhook` | Signed payment gateway events |

#![deny(missing_docs)]

/// HTTP request handlers and the API error type.
pub mod handlers;

/// Router construction.
pub mod router;

/// Shared application state.
pub mod state;

pub use router::create_router;
pub use state::AppState;
