// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! PostgreSQL-backed repository for certflow-core.

use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::PgPool;

use crate::error::CoreError;

use super::{
    CertificateRecord, CourseRecord, NewCertificate, NewOrder, NewQuizResult, OrderRecord,
    QuizResultRecord, Repository, UserRecord,
};

/// Embedded schema migrations, applied by the server at startup.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// PostgreSQL-backed repository implementation.
#[derive(Clone)]
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Create a new Postgres-backed repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn get_user(&self, user_id: i64) -> Result<Option<UserRecord>, CoreError> {
        let record = sqlx::query_as::<_, UserRecord>(
            r#"
            SELECT id, email, username, first_name
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, CoreError> {
        let record = sqlx::query_as::<_, UserRecord>(
            r#"
            SELECT id, email, username, first_name
            FROM users
            WHERE lower(email) = lower($1)
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn get_course(&self, course_id: i64) -> Result<Option<CourseRecord>, CoreError> {
        let record = sqlx::query_as::<_, CourseRecord>(
            r#"
            SELECT id, title
            FROM courses
            WHERE id = $1
            "#,
        )
        .bind(course_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn create_quiz_result(
        &self,
        new: &NewQuizResult,
    ) -> Result<QuizResultRecord, CoreError> {
        let record = sqlx::query_as::<_, QuizResultRecord>(
            r#"
            INSERT INTO quiz_results (user_id, course_id, score, total_questions, quiz_type)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_id, course_id, score, total_questions, quiz_type,
                      percentage, is_passing, created_at
            "#,
        )
        .bind(new.user_id)
        .bind(new.course_id)
        .bind(new.score)
        .bind(new.total_questions)
        .bind(&new.quiz_type)
        .fetch_one(&self.pool)
        .await?;

        Ok(record)
    }

    async fn set_quiz_result_outcome(
        &self,
        quiz_result_id: i64,
        percentage: f64,
        is_passing: bool,
    ) -> Result<(), CoreError> {
        sqlx::query(
            r#"
            UPDATE quiz_results
            SET percentage = $2, is_passing = $3
            WHERE id = $1
            "#,
        )
        .bind(quiz_result_id)
        .bind(percentage)
        .bind(is_passing)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_nonexpired_certificate(
        &self,
        user_id: i64,
        course_id: i64,
    ) -> Result<Option<CertificateRecord>, CoreError> {
        let record = sqlx::query_as::<_, CertificateRecord>(
            r#"
            SELECT id, user_id, course_id, quiz_result_id, issued_date, expiry_date,
                   status, notifications_sent, created_at
            FROM certificates
            WHERE user_id = $1 AND course_id = $2 AND status <> 'expired'
            "#,
        )
        .bind(user_id)
        .bind(course_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn create_certificate(
        &self,
        new: &NewCertificate,
    ) -> Result<CertificateRecord, CoreError> {
        // The partial unique index on (user_id, course_id) WHERE status <>
        // 'expired' backstops the issuer's read-then-write duplicate check.
        let record = sqlx::query_as::<_, CertificateRecord>(
            r#"
            INSERT INTO certificates
                (user_id, course_id, quiz_result_id, issued_date, expiry_date,
                 status, notifications_sent)
            VALUES ($1, $2, $3, $4, $5, 'active', '{}')
            RETURNING id, user_id, course_id, quiz_result_id, issued_date, expiry_date,
                      status, notifications_sent, created_at
            "#,
        )
        .bind(new.user_id)
        .bind(new.course_id)
        .bind(new.quiz_result_id)
        .bind(new.issued_date)
        .bind(new.expiry_date)
        .fetch_one(&self.pool)
        .await?;

        Ok(record)
    }

    async fn list_certificates_to_check(&self) -> Result<Vec<CertificateRecord>, CoreError> {
        let records = sqlx::query_as::<_, CertificateRecord>(
            r#"
            SELECT id, user_id, course_id, quiz_result_id, issued_date, expiry_date,
                   status, notifications_sent, created_at
            FROM certificates
            WHERE status <> 'expired'
            ORDER BY expiry_date ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    async fn list_certificates_for_user(
        &self,
        user_id: i64,
    ) -> Result<Vec<CertificateRecord>, CoreError> {
        let records = sqlx::query_as::<_, CertificateRecord>(
            r#"
            SELECT id, user_id, course_id, quiz_result_id, issued_date, expiry_date,
                   status, notifications_sent, created_at
            FROM certificates
            WHERE user_id = $1
            ORDER BY expiry_date ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    async fn update_certificate_state(
        &self,
        certificate_id: i64,
        status: &str,
        notifications_sent: &[String],
    ) -> Result<(), CoreError> {
        sqlx::query(
            r#"
            UPDATE certificates
            SET status = $2, notifications_sent = $3
            WHERE id = $1
            "#,
        )
        .bind(certificate_id)
        .bind(status)
        .bind(notifications_sent)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn create_order(&self, new: &NewOrder) -> Result<OrderRecord, CoreError> {
        let record = sqlx::query_as::<_, OrderRecord>(
            r#"
            INSERT INTO orders (user_id, products, status, session_id, correlation_token)
            VALUES ($1, $2, 'pending', $3, $4)
            RETURNING id, user_id, products, status, session_id, correlation_token,
                      reminders_sent, created_at
            "#,
        )
        .bind(new.user_id)
        .bind(Json(&new.products))
        .bind(&new.session_id)
        .bind(&new.correlation_token)
        .fetch_one(&self.pool)
        .await?;

        Ok(record)
    }

    async fn list_paid_orders(&self) -> Result<Vec<OrderRecord>, CoreError> {
        let records = sqlx::query_as::<_, OrderRecord>(
            r#"
            SELECT id, user_id, products, status, session_id, correlation_token,
                   reminders_sent, created_at
            FROM orders
            WHERE status = 'paid'
            ORDER BY created_at ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    async fn find_order_by_token(
        &self,
        correlation_token: &str,
    ) -> Result<Option<OrderRecord>, CoreError> {
        let record = sqlx::query_as::<_, OrderRecord>(
            r#"
            SELECT id, user_id, products, status, session_id, correlation_token,
                   reminders_sent, created_at
            FROM orders
            WHERE correlation_token = $1
            "#,
        )
        .bind(correlation_token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn set_order_status(&self, order_id: i64, status: &str) -> Result<(), CoreError> {
        let result = sqlx::query(
            r#"
            UPDATE orders
            SET status = $2
            WHERE id = $1
            "#,
        )
        .bind(order_id)
        .bind(status)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::OrderNotFound {
                correlation_token: format!("order:{}", order_id),
            });
        }

        Ok(())
    }

    async fn append_order_reminder(
        &self,
        order_id: i64,
        threshold_days: i32,
    ) -> Result<(), CoreError> {
        // array_append guarded by a containment check keeps the append
        // idempotent under overlapping batch runs.
        sqlx::query(
            r#"
            UPDATE orders
            SET reminders_sent = array_append(reminders_sent, $2)
            WHERE id = $1 AND NOT (reminders_sent @> ARRAY[$2]::int[])
            "#,
        )
        .bind(order_id)
        .bind(threshold_days)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn has_quiz_progress(&self, user_id: i64, course_id: i64) -> Result<bool, CoreError> {
        let row: (bool,) = sqlx::query_as(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM quiz_results
                WHERE user_id = $1 AND course_id = $2
            ) OR EXISTS (
                SELECT 1 FROM progress_entries
                WHERE user_id = $1 AND course_id = $2 AND entry_type LIKE 'quiz\_%'
            )
            "#,
        )
        .bind(user_id)
        .bind(course_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.0)
    }

    async fn enroll_user(&self, course_id: i64, user_id: i64) -> Result<(), CoreError> {
        sqlx::query(
            r#"
            INSERT INTO enrollments (course_id, user_id)
            VALUES ($1, $2)
            ON CONFLICT (course_id, user_id) DO NOTHING
            "#,
        )
        .bind(course_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn health_check(&self) -> Result<bool, CoreError> {
        let row: (i32,) = sqlx::query_as("SELECT 1").fetch_one(&self.pool).await?;
        Ok(row.0 == 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LineItem;

    // Helper to get a test database pool; tests are skipped when
    // TEST_DATABASE_URL is not set.
    async fn test_pool() -> Option<PgPool> {
        let url = std::env::var("TEST_DATABASE_URL").ok()?;
        let pool = PgPool::connect(&url).await.ok()?;
        MIGRATOR.run(&pool).await.ok()?;
        Some(pool)
    }

    async fn seed_user(pool: &PgPool, email: &str) -> i64 {
        let row: (i64,) = sqlx::query_as(
            "INSERT INTO users (email, username) VALUES ($1, $2) RETURNING id",
        )
        .bind(email)
        .bind(email)
        .fetch_one(pool)
        .await
        .expect("insert user");
        row.0
    }

    async fn seed_course(pool: &PgPool, title: &str) -> i64 {
        let row: (i64,) = sqlx::query_as("INSERT INTO courses (title) VALUES ($1) RETURNING id")
            .bind(title)
            .fetch_one(pool)
            .await
            .expect("insert course");
        row.0
    }

    #[tokio::test]
    async fn test_order_round_trip() {
        let Some(pool) = test_pool().await else {
            return;
        };
        let repo = PostgresRepository::new(pool.clone());
        let user_id = seed_user(&pool, "pg-order@example.test").await;

        let order = repo
            .create_order(&NewOrder {
                user_id,
                products: vec![LineItem {
                    id: 1,
                    title: "Course A".to_string(),
                    price: 50.0,
                }],
                session_id: "cs_test_pg_1".to_string(),
                correlation_token: "ord-900001".to_string(),
            })
            .await
            .expect("create order");
        assert_eq!(order.status, "pending");

        let found = repo
            .find_order_by_token("ord-900001")
            .await
            .expect("lookup")
            .expect("order exists");
        assert_eq!(found.id, order.id);

        repo.set_order_status(order.id, "paid").await.expect("set status");
        repo.append_order_reminder(order.id, 3).await.expect("mark");
        repo.append_order_reminder(order.id, 3).await.expect("mark again");

        let paid = repo.list_paid_orders().await.expect("list paid");
        let found = paid.iter().find(|o| o.id == order.id).expect("paid order listed");
        assert_eq!(found.reminders_sent, vec![3]);
    }

    #[tokio::test]
    async fn test_live_duplicate_certificate_is_rejected() {
        let Some(pool) = test_pool().await else {
            return;
        };
        let repo = PostgresRepository::new(pool.clone());
        let user_id = seed_user(&pool, "pg-cert@example.test").await;
        let course_id = seed_course(&pool, "Duplicate Check").await;

        let new = NewCertificate {
            user_id,
            course_id,
            quiz_result_id: None,
            issued_date: chrono::NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            expiry_date: chrono::NaiveDate::from_ymd_opt(2027, 1, 1).unwrap(),
        };
        repo.create_certificate(&new).await.expect("first certificate");
        let second = repo.create_certificate(&new).await;
        assert!(second.is_err(), "partial unique index must reject a live duplicate");
    }
}
