// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Domain types shared across the certflow engines.
//!
//! Statuses are stored as TEXT columns and mapped at the edges, so each enum
//! carries `as_str`/`parse` helpers rather than a sqlx type binding.

use serde::{Deserialize, Serialize};

/// Certificate status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CertificateStatus {
    /// Certificate is valid and more than 30 days from expiry.
    Active,
    /// Certificate is within the 30-day warning window.
    ExpiringSoon,
    /// Certificate has expired. Terminal; never transitions away.
    Expired,
}

impl CertificateStatus {
    /// Database/API string for this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::ExpiringSoon => "expiring_soon",
            Self::Expired => "expired",
        }
    }

    /// Parse a database status string. Unknown values map to `Active` so a
    /// certificate with a bad row is still evaluated rather than skipped.
    pub fn parse(s: &str) -> Self {
        match s {
            "expiring_soon" => Self::ExpiringSoon,
            "expired" => Self::Expired,
            _ => Self::Active,
        }
    }
}

/// Order status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
    /// Checkout session created, payment not yet confirmed.
    Pending,
    /// Payment succeeded.
    Paid,
    /// Payment failed.
    Failed,
}

impl OrderStatus {
    /// Database/API string for this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Failed => "failed",
        }
    }
}

/// Quiz type. Only final quizzes can mint certificates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizType {
    /// Per-unit knowledge check.
    Unit,
    /// Final exam for a course.
    Final,
}

impl QuizType {
    /// Database/API string for this quiz type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unit => "unit",
            Self::Final => "final",
        }
    }

    /// Parse a quiz type string. Unknown values map to `Unit`, matching the
    /// inbound default.
    pub fn parse(s: &str) -> Self {
        match s {
            "final" => Self::Final,
            _ => Self::Unit,
        }
    }
}

/// Expiry-warning stage, tracked independently per certificate.
///
/// Each tier fires at most once per certificate, ever. A certificate that is
/// evaluated irregularly can have several tiers resolved in one pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationTier {
    /// 30 days or less until expiry.
    ThirtyDay,
    /// 7 days or less until expiry.
    SevenDay,
    /// 1 day or less until expiry.
    OneDay,
    /// Expiry date has passed.
    Expired,
}

impl NotificationTier {
    /// All tiers ordered from least to most urgent.
    pub const ALL: [NotificationTier; 4] = [
        Self::ThirtyDay,
        Self::SevenDay,
        Self::OneDay,
        Self::Expired,
    ];

    /// Marker string stored in `notifications_sent`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ThirtyDay => "30-day",
            Self::SevenDay => "7-day",
            Self::OneDay => "1-day",
            Self::Expired => "expired",
        }
    }

    /// A tier is due once `days_until_expiry` is at or below this bound.
    pub fn max_days(&self) -> i64 {
        match self {
            Self::ThirtyDay => 30,
            Self::SevenDay => 7,
            Self::OneDay => 1,
            Self::Expired => 0,
        }
    }
}

/// Reminder thresholds (days since purchase) for unstarted courses.
pub const REMINDER_THRESHOLDS: [i32; 4] = [3, 7, 14, 30];

/// A purchased course line item, stored as JSONB on the order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItem {
    /// Course id.
    pub id: i64,
    /// Course title at time of purchase.
    pub title: String,
    /// List price in the store currency.
    pub price: f64,
}

/// Payment gateway event kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentEventKind {
    /// Payment completed successfully.
    Succeeded,
    /// Payment was declined or otherwise failed.
    Failed,
}

/// A payment event delivered by the gateway webhook, handed explicitly to
/// the reconciliation engine.
#[derive(Debug, Clone)]
pub struct PaymentEvent {
    /// Whether the payment succeeded or failed.
    pub kind: PaymentEventKind,
    /// Token linking the gateway session back to a local order.
    pub correlation_token: String,
    /// Buyer email as reported by the gateway, if any.
    pub customer_email: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for status in [
            CertificateStatus::Active,
            CertificateStatus::ExpiringSoon,
            CertificateStatus::Expired,
        ] {
            assert_eq!(CertificateStatus::parse(status.as_str()), status);
        }
        assert_eq!(CertificateStatus::parse("garbage"), CertificateStatus::Active);
    }

    #[test]
    fn test_quiz_type_parse_defaults_to_unit() {
        assert_eq!(QuizType::parse("final"), QuizType::Final);
        assert_eq!(QuizType::parse("unit"), QuizType::Unit);
        assert_eq!(QuizType::parse(""), QuizType::Unit);
    }

    #[test]
    fn test_tier_bounds() {
        assert_eq!(NotificationTier::ThirtyDay.max_days(), 30);
        assert_eq!(NotificationTier::SevenDay.max_days(), 7);
        assert_eq!(NotificationTier::OneDay.max_days(), 1);
        assert_eq!(NotificationTier::Expired.max_days(), 0);
    }
}
