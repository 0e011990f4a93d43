// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error types for certflow-core.
//!
//! Provides a unified error type that maps to stable error codes for API
//! responses and logs.

use std::fmt;

/// Result type using CoreError
pub type Result<T> = std::result::Result<T, CoreError>;

/// Core errors that can occur while processing events and batch runs.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum CoreError {
    /// No user matched the given identifier (id or email).
    UserNotFound {
        /// The identifier that was looked up.
        identifier: String,
    },

    /// No order matched the given correlation token.
    OrderNotFound {
        /// The correlation token from the payment gateway event.
        correlation_token: String,
    },

    /// Course referenced by an event or order does not exist.
    CourseNotFound {
        /// The course id that was looked up.
        course_id: i64,
    },

    /// Input validation failed on an inbound request.
    ValidationError {
        /// The field that failed validation.
        field: String,
        /// The validation error message.
        message: String,
    },

    /// Database operation failed.
    DatabaseError {
        /// The operation that failed.
        operation: String,
        /// Error details.
        details: String,
    },

    /// A notification send attempt failed.
    NotificationFailed {
        /// The intended recipient address.
        recipient: String,
        /// The reason for failure.
        reason: String,
    },

    /// A payment gateway call failed.
    PaymentGatewayError {
        /// The operation that failed.
        operation: String,
        /// Error details.
        details: String,
    },

    /// Webhook signature verification failed.
    InvalidSignature {
        /// The reason the signature was rejected.
        reason: String,
    },
}

impl CoreError {
    /// Get the error code string for this error type.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::UserNotFound { .. } => "USER_NOT_FOUND",
            Self::OrderNotFound { .. } => "ORDER_NOT_FOUND",
            Self::CourseNotFound { .. } => "COURSE_NOT_FOUND",
            Self::ValidationError { .. } => "VALIDATION_ERROR",
            Self::DatabaseError { .. } => "DATABASE_ERROR",
            Self::NotificationFailed { .. } => "NOTIFICATION_FAILED",
            Self::PaymentGatewayError { .. } => "PAYMENT_GATEWAY_ERROR",
            Self::InvalidSignature { .. } => "INVALID_SIGNATURE",
        }
    }
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UserNotFound { identifier } => {
                write!(f, "User '{}' not found", identifier)
            }
            Self::OrderNotFound { correlation_token } => {
                write!(f, "No order found for correlation token '{}'", correlation_token)
            }
            Self::CourseNotFound { course_id } => {
                write!(f, "Course {} not found", course_id)
            }
            Self::ValidationError { field, message } => {
                write!(f, "Validation error for '{}': {}", field, message)
            }
            Self::DatabaseError { operation, details } => {
                write!(f, "Database error during '{}': {}", operation, details)
            }
            Self::NotificationFailed { recipient, reason } => {
                write!(f, "Failed to send notification to '{}': {}", recipient, reason)
            }
            Self::PaymentGatewayError { operation, details } => {
                write!(f, "Payment gateway error during '{}': {}", operation, details)
            }
            Self::InvalidSignature { reason } => {
                write!(f, "Webhook signature rejected: {}", reason)
            }
        }
    }
}

impl std::error::Error for CoreError {}

impl From<sqlx::Error> for CoreError {
    fn from(err: sqlx::Error) -> Self {
        CoreError::DatabaseError {
            operation: "query".to_string(),
            details: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::DatabaseError {
            operation: "json".to_string(),
            details: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let test_cases = vec![
            (
                CoreError::UserNotFound {
                    identifier: "a@b.test".to_string(),
                },
                "USER_NOT_FOUND",
            ),
            (
                CoreError::OrderNotFound {
                    correlation_token: "ord-123456".to_string(),
                },
                "ORDER_NOT_FOUND",
            ),
            (
                CoreError::CourseNotFound { course_id: 7 },
                "COURSE_NOT_FOUND",
            ),
            (
                CoreError::ValidationError {
                    field: "products".to_string(),
                    message: "at least one product is required".to_string(),
                },
                "VALIDATION_ERROR",
            ),
            (
                CoreError::DatabaseError {
                    operation: "insert".to_string(),
                    details: "connection refused".to_string(),
                },
                "DATABASE_ERROR",
            ),
            (
                CoreError::NotificationFailed {
                    recipient: "a@b.test".to_string(),
                    reason: "timeout".to_string(),
                },
                "NOTIFICATION_FAILED",
            ),
            (
                CoreError::PaymentGatewayError {
                    operation: "create_checkout_session".to_string(),
                    details: "502 bad gateway".to_string(),
                },
                "PAYMENT_GATEWAY_ERROR",
            ),
            (
                CoreError::InvalidSignature {
                    reason: "digest mismatch".to_string(),
                },
                "INVALID_SIGNATURE",
            ),
        ];

        for (error, expected_code) in test_cases {
            assert_eq!(
                error.error_code(),
                expected_code,
                "Error {:?} should have code {}",
                error,
                expected_code
            );
            assert!(!error.to_string().is_empty(), "Message should not be empty");
        }
    }

    #[test]
    fn test_error_display() {
        let err = CoreError::UserNotFound {
            identifier: "nobody@example.test".to_string(),
        };
        assert_eq!(err.to_string(), "User 'nobody@example.test' not found");

        let err = CoreError::OrderNotFound {
            correlation_token: "ord-483921".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "No order found for correlation token 'ord-483921'"
        );

        let err = CoreError::ValidationError {
            field: "total_questions".to_string(),
            message: "must be greater than zero".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Validation error for 'total_questions': must be greater than zero"
        );

        let err = CoreError::InvalidSignature {
            reason: "missing v1 component".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Webhook signature rejected: missing v1 component"
        );
    }
}
