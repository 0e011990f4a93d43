// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! HTTP request handlers.

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use bytes::Bytes;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;

use certflow_core::checkout::CreateOrderRequest;
use certflow_core::error::CoreError;
use certflow_core::issuer::QuizResultCreated;
use certflow_core::model::LineItem;
use certflow_core::payment::{parse_webhook_event, verify_webhook_signature};

use crate::state::AppState;

/// API error: an HTTP status plus the core error's stable code and message.
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", "invalid or missing secret")
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", message)
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let status = match &err {
            CoreError::ValidationError { .. } | CoreError::InvalidSignature { .. } => {
                StatusCode::BAD_REQUEST
            }
            CoreError::UserNotFound { .. }
            | CoreError::OrderNotFound { .. }
            | CoreError::CourseNotFound { .. } => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, err.error_code(), err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            warn!(code = self.code, message = %self.message, "request failed");
        }
        let body = json!({
            "error": {
                "code": self.code,
                "message": self.message,
            }
        });
        (self.status, Json(body)).into_response()
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Overall status string.
    pub status: String,
    /// Crate version.
    pub version: String,
    /// Seconds since startup.
    pub uptime_secs: u64,
    /// Database connectivity.
    pub database: String,
}

/// `GET /health`
pub async fn health(State(state): State<AppState>) -> Result<Json<HealthResponse>, ApiError> {
    state.repo.health_check().await?;
    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        version: state.version.clone(),
        uptime_secs: state.uptime_secs(),
        database: "connected".to_string(),
    }))
}

/// Query parameters for the manual trigger endpoints.
#[derive(Debug, Deserialize)]
pub struct TriggerParams {
    /// Shared secret, required when the server is configured with one.
    pub secret: Option<String>,
}

/// `POST /certificates/check-expiring?secret=`
pub async fn check_expiring(
    State(state): State<AppState>,
    Query(params): Query<TriggerParams>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if let Some(expected) = &state.cron_secret {
        if params.secret.as_deref() != Some(expected.as_str()) {
            return Err(ApiError::unauthorized());
        }
    }

    let summary = state
        .lifecycle
        .check_expiring_certificates(Utc::now().date_naive())
        .await?;
    Ok(Json(json!({ "success": true, "summary": summary })))
}

/// Query parameters for the expiry email diagnostic.
#[derive(Debug, Deserialize)]
pub struct TestEmailParams {
    /// Address of the user whose certificates get preview emails.
    pub email: Option<String>,
}

/// `POST /certificates/test-expiry-email?email=`
pub async fn test_expiry_email(
    State(state): State<AppState>,
    Query(params): Query<TestEmailParams>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let email = params
        .email
        .filter(|e| !e.is_empty())
        .ok_or_else(|| ApiError::bad_request("query parameter 'email' is required"))?;

    let results = state
        .lifecycle
        .test_expiry_email(&email, Utc::now().date_naive())
        .await?;
    Ok(Json(json!({ "success": true, "results": results })))
}

/// Quiz submission body.
#[derive(Debug, Deserialize)]
pub struct QuizResultBody {
    /// User who submitted the quiz.
    pub user_id: i64,
    /// Course the quiz belongs to.
    pub course_id: i64,
    /// Number of correct answers.
    pub score: i32,
    /// Number of questions.
    pub total_questions: i32,
    /// Quiz type; defaults to a unit quiz.
    #[serde(default = "default_quiz_type")]
    pub quiz_type: String,
}

fn default_quiz_type() -> String {
    "unit".to_string()
}

/// `POST /quiz-results`
pub async fn create_quiz_result(
    State(state): State<AppState>,
    Json(body): Json<QuizResultBody>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let outcome = state
        .issuer
        .process_quiz_result(
            QuizResultCreated {
                user_id: body.user_id,
                course_id: body.course_id,
                score: body.score,
                total_questions: body.total_questions,
                quiz_type: body.quiz_type,
            },
            Utc::now().date_naive(),
        )
        .await?;

    let response = json!({
        "quiz_result_id": outcome.quiz_result.id,
        "percentage": outcome.quiz_result.percentage,
        "is_passing": outcome.quiz_result.is_passing,
        "certificate_id": outcome.certificate.as_ref().map(|c| c.id),
    });
    Ok((StatusCode::CREATED, Json(response)))
}

/// Order creation body.
#[derive(Debug, Deserialize)]
pub struct OrderBody {
    /// Buyer.
    pub user_id: i64,
    /// Courses in the cart.
    pub products: Vec<LineItem>,
    /// Percentage discount applied to every line item.
    #[serde(default)]
    pub discount_percent: f64,
}

/// `POST /orders`
pub async fn create_order(
    State(state): State<AppState>,
    Json(body): Json<OrderBody>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let created = state
        .checkout
        .create_order(CreateOrderRequest {
            user_id: body.user_id,
            products: body.products,
            discount_percent: body.discount_percent,
        })
        .await?;

    let response = json!({
        "order_id": created.order_id,
        "session_id": created.session_id,
        "checkout_url": created.checkout_url,
    });
    Ok((StatusCode::CREATED, Json(response)))
}

/// `POST /payments/webhook`
///
/// The raw body is verified against the `webhook-signature` header before
/// anything is parsed; a bad signature has no side effects.
pub async fn payment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<serde_json::Value>, ApiError> {
    let signature = headers
        .get("webhook-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            ApiError::from(CoreError::InvalidSignature {
                reason: "missing webhook-signature header".to_string(),
            })
        })?;

    verify_webhook_signature(
        &state.webhook_secret,
        signature,
        &body,
        Utc::now().timestamp(),
    )?;

    if let Some(event) = parse_webhook_event(&body)? {
        state.reconcile.apply_payment_event(&event).await?;
    }

    Ok(Json(json!({ "received": true })))
}
