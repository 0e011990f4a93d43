// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! API router configuration.

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Build the API router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/certificates/check-expiring", post(handlers::check_expiring))
        .route(
            "/certificates/test-expiry-email",
            post(handlers::test_expiry_email),
        )
        .route("/quiz-results", post(handlers::create_quiz_result))
        .route("/orders", post(handlers::create_order))
        .route("/payments/webhook", post(handlers::payment_webhook))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
