//! Persistence interfaces and backends for certflow-core.
//!
//! This module defines the repository abstraction the engines depend on, the
//! record types it returns, and the backend implementations (PostgreSQL for
//! production, in-memory for tests and local development).

pub mod memory;
pub mod postgres;

pub use self::memory::MemoryRepository;
pub use self::postgres::PostgresRepository;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::types::Json;

use crate::error::CoreError;
use crate::model::LineItem;

/// User record from the persistence layer.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRecord {
    /// Unique user id.
    pub id: i64,
    /// Login / contact email, unique.
    pub email: String,
    /// Display username.
    pub username: String,
    /// Optional first name, preferred in email greetings.
    pub first_name: Option<String>,
}

impl UserRecord {
    /// Name used to greet the user in emails.
    pub fn greeting_name(&self) -> &str {
        match self.first_name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => &self.username,
        }
    }
}

/// Course record from the persistence layer.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CourseRecord {
    /// Unique course id.
    pub id: i64,
    /// Course title.
    pub title: String,
}

/// Certificate record from the persistence layer.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CertificateRecord {
    /// Unique certificate id.
    pub id: i64,
    /// Owning user.
    pub user_id: i64,
    /// Course this certificate is for.
    pub course_id: i64,
    /// Quiz result that minted this certificate, if tracked.
    pub quiz_result_id: Option<i64>,
    /// Calendar date the certificate was issued.
    pub issued_date: NaiveDate,
    /// Calendar date the certificate expires (issued + 1 year).
    pub expiry_date: NaiveDate,
    /// Current status (active, expiring_soon, expired).
    pub status: String,
    /// Tier markers already sent (30-day, 7-day, 1-day, expired).
    pub notifications_sent: Vec<String>,
    /// When the row was created.
    pub created_at: DateTime<Utc>,
}

/// Quiz result record from the persistence layer.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct QuizResultRecord {
    /// Unique quiz result id.
    pub id: i64,
    /// User who submitted the quiz.
    pub user_id: i64,
    /// Course the quiz belongs to.
    pub course_id: i64,
    /// Raw score (number of correct answers).
    pub score: i32,
    /// Number of questions in the quiz.
    pub total_questions: i32,
    /// Quiz type (unit or final).
    pub quiz_type: String,
    /// Derived percentage, written back once by the issuer.
    pub percentage: Option<f64>,
    /// Derived pass flag (percentage >= 90), written back once.
    pub is_passing: Option<bool>,
    /// When the result was submitted.
    pub created_at: DateTime<Utc>,
}

/// Order record from the persistence layer.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OrderRecord {
    /// Unique order id.
    pub id: i64,
    /// Buyer.
    pub user_id: i64,
    /// Purchased course line items.
    pub products: Json<Vec<LineItem>>,
    /// Current status (pending, paid, failed).
    pub status: String,
    /// Gateway checkout session id.
    pub session_id: String,
    /// Token linking gateway events back to this order.
    pub correlation_token: String,
    /// Elapsed-day reminder thresholds already sent (subset of {3,7,14,30}).
    pub reminders_sent: Vec<i32>,
    /// When the order was created.
    pub created_at: DateTime<Utc>,
}

/// Fields for inserting a new certificate.
#[derive(Debug, Clone)]
pub struct NewCertificate {
    /// Owning user.
    pub user_id: i64,
    /// Course the certificate is for.
    pub course_id: i64,
    /// Quiz result that minted it, if any.
    pub quiz_result_id: Option<i64>,
    /// Issue date.
    pub issued_date: NaiveDate,
    /// Expiry date (issued + 1 year).
    pub expiry_date: NaiveDate,
}

/// Fields for inserting a new quiz result.
#[derive(Debug, Clone)]
pub struct NewQuizResult {
    /// User who submitted the quiz.
    pub user_id: i64,
    /// Course the quiz belongs to.
    pub course_id: i64,
    /// Raw score.
    pub score: i32,
    /// Number of questions.
    pub total_questions: i32,
    /// Quiz type string (unit or final).
    pub quiz_type: String,
}

/// Fields for inserting a new pending order.
#[derive(Debug, Clone)]
pub struct NewOrder {
    /// Buyer.
    pub user_id: i64,
    /// Purchased course line items.
    pub products: Vec<LineItem>,
    /// Gateway checkout session id.
    pub session_id: String,
    /// Correlation token placed in gateway metadata.
    pub correlation_token: String,
}

/// Repository interface used by the engines.
///
/// Engines receive this as an explicit dependency rather than reaching into
/// any global service locator.
#[async_trait]
pub trait Repository: Send + Sync {
    /// Look up a user by id.
    async fn get_user(&self, user_id: i64) -> Result<Option<UserRecord>, CoreError>;

    /// Look up a user by email (case-insensitive).
    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, CoreError>;

    /// Look up a course by id.
    async fn get_course(&self, course_id: i64) -> Result<Option<CourseRecord>, CoreError>;

    /// Insert a new quiz result.
    async fn create_quiz_result(
        &self,
        new: &NewQuizResult,
    ) -> Result<QuizResultRecord, CoreError>;

    /// Write back the derived percentage and pass flag on a quiz result.
    /// Idempotent; the values never change once computed.
    async fn set_quiz_result_outcome(
        &self,
        quiz_result_id: i64,
        percentage: f64,
        is_passing: bool,
    ) -> Result<(), CoreError>;

    /// Find a certificate for (user, course) whose status is not expired.
    async fn find_nonexpired_certificate(
        &self,
        user_id: i64,
        course_id: i64,
    ) -> Result<Option<CertificateRecord>, CoreError>;

    /// Insert a new active certificate with no notifications sent.
    async fn create_certificate(
        &self,
        new: &NewCertificate,
    ) -> Result<CertificateRecord, CoreError>;

    /// All certificates that are not yet expired, for the daily batch.
    async fn list_certificates_to_check(&self) -> Result<Vec<CertificateRecord>, CoreError>;

    /// All certificates owned by a user (any status), for diagnostics.
    async fn list_certificates_for_user(
        &self,
        user_id: i64,
    ) -> Result<Vec<CertificateRecord>, CoreError>;

    /// Persist a certificate's status and sent-tier markers.
    async fn update_certificate_state(
        &self,
        certificate_id: i64,
        status: &str,
        notifications_sent: &[String],
    ) -> Result<(), CoreError>;

    /// Insert a new pending order.
    async fn create_order(&self, new: &NewOrder) -> Result<OrderRecord, CoreError>;

    /// All paid orders, for the reminder batch.
    async fn list_paid_orders(&self) -> Result<Vec<OrderRecord>, CoreError>;

    /// Find an order by its correlation token.
    async fn find_order_by_token(
        &self,
        correlation_token: &str,
    ) -> Result<Option<OrderRecord>, CoreError>;

    /// Set an order's status.
    async fn set_order_status(&self, order_id: i64, status: &str) -> Result<(), CoreError>;

    /// Record that a reminder threshold was sent for an order. Thresholds are
    /// appended at most once and never removed.
    async fn append_order_reminder(
        &self,
        order_id: i64,
        threshold_days: i32,
    ) -> Result<(), CoreError>;

    /// Whether any quiz-progress signal exists for (user, course): a quiz
    /// result, or a progress entry whose type begins with `quiz_`.
    async fn has_quiz_progress(&self, user_id: i64, course_id: i64) -> Result<bool, CoreError>;

    /// Grant a user access to a course. Idempotent; re-granting is a no-op.
    async fn enroll_user(&self, course_id: i64, user_id: i64) -> Result<(), CoreError>;

    /// Check that the backing store is reachable.
    async fn health_check(&self) -> Result<bool, CoreError>;
}
