// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! In-memory repository backend.
//!
//! Backs the engine and HTTP-layer tests, and doubles as a throwaway local
//! development store. Mirrors the PostgreSQL backend's semantics, including
//! the "one non-expired certificate per (user, course)" uniqueness rule and
//! idempotent reminder/enrollment writes.

use std::collections::HashSet;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;

use crate::error::CoreError;
use crate::model::LineItem;

use super::{
    CertificateRecord, CourseRecord, NewCertificate, NewOrder, NewQuizResult, OrderRecord,
    QuizResultRecord, Repository, UserRecord,
};

#[derive(Default)]
struct Tables {
    users: Vec<UserRecord>,
    courses: Vec<CourseRecord>,
    certificates: Vec<CertificateRecord>,
    quiz_results: Vec<QuizResultRecord>,
    orders: Vec<OrderRecord>,
    enrollments: HashSet<(i64, i64)>,
    progress_entries: Vec<(i64, i64, String)>,
}

/// In-memory repository implementation.
#[derive(Default)]
pub struct MemoryRepository {
    tables: Mutex<Tables>,
    next_id: AtomicI64,
    // Course id whose enrollment writes fail; 0 disables the fault.
    fail_enroll_course: AtomicI64,
}

impl MemoryRepository {
    /// Create an empty in-memory repository.
    pub fn new() -> Self {
        Self {
            tables: Mutex::new(Tables::default()),
            next_id: AtomicI64::new(1),
            fail_enroll_course: AtomicI64::new(0),
        }
    }

    /// Make `enroll_user` fail for the given course. Pass 0 to clear.
    pub fn set_enroll_failure(&self, course_id: i64) {
        self.fail_enroll_course.store(course_id, Ordering::SeqCst);
    }

    fn allocate_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Seed a user row.
    pub fn seed_user(&self, email: &str, username: &str, first_name: Option<&str>) -> UserRecord {
        let record = UserRecord {
            id: self.allocate_id(),
            email: email.to_string(),
            username: username.to_string(),
            first_name: first_name.map(str::to_string),
        };
        self.tables.lock().unwrap().users.push(record.clone());
        record
    }

    /// Seed a course row.
    pub fn seed_course(&self, title: &str) -> CourseRecord {
        let record = CourseRecord {
            id: self.allocate_id(),
            title: title.to_string(),
        };
        self.tables.lock().unwrap().courses.push(record.clone());
        record
    }

    /// Seed a certificate row with explicit dates, status, and markers.
    pub fn seed_certificate(
        &self,
        user_id: i64,
        course_id: i64,
        issued_date: chrono::NaiveDate,
        expiry_date: chrono::NaiveDate,
        status: &str,
        notifications_sent: &[&str],
    ) -> CertificateRecord {
        let record = CertificateRecord {
            id: self.allocate_id(),
            user_id,
            course_id,
            quiz_result_id: None,
            issued_date,
            expiry_date,
            status: status.to_string(),
            notifications_sent: notifications_sent.iter().map(|s| s.to_string()).collect(),
            created_at: Utc::now(),
        };
        self.tables
            .lock()
            .unwrap()
            .certificates
            .push(record.clone());
        record
    }

    /// Seed a paid order with an explicit creation timestamp.
    pub fn seed_paid_order(
        &self,
        user_id: i64,
        products: Vec<LineItem>,
        created_at: DateTime<Utc>,
        reminders_sent: Vec<i32>,
    ) -> OrderRecord {
        let id = self.allocate_id();
        let record = OrderRecord {
            id,
            user_id,
            products: Json(products),
            status: "paid".to_string(),
            session_id: format!("cs_test_{}", id),
            correlation_token: format!("ord-{:06}", id),
            reminders_sent,
            created_at,
        };
        self.tables.lock().unwrap().orders.push(record.clone());
        record
    }

    /// Seed a structured progress entry (e.g. entry_type `quiz_unit_1`).
    pub fn seed_progress_entry(&self, user_id: i64, course_id: i64, entry_type: &str) {
        self.tables
            .lock()
            .unwrap()
            .progress_entries
            .push((user_id, course_id, entry_type.to_string()));
    }

    /// Whether an enrollment exists for (course, user).
    pub fn is_enrolled(&self, course_id: i64, user_id: i64) -> bool {
        self.tables
            .lock()
            .unwrap()
            .enrollments
            .contains(&(course_id, user_id))
    }

    /// Fetch a certificate by id (test inspection).
    pub fn certificate(&self, certificate_id: i64) -> Option<CertificateRecord> {
        self.tables
            .lock()
            .unwrap()
            .certificates
            .iter()
            .find(|c| c.id == certificate_id)
            .cloned()
    }

    /// Fetch an order by id (test inspection).
    pub fn order(&self, order_id: i64) -> Option<OrderRecord> {
        self.tables
            .lock()
            .unwrap()
            .orders
            .iter()
            .find(|o| o.id == order_id)
            .cloned()
    }

    /// Fetch a quiz result by id (test inspection).
    pub fn quiz_result(&self, quiz_result_id: i64) -> Option<QuizResultRecord> {
        self.tables
            .lock()
            .unwrap()
            .quiz_results
            .iter()
            .find(|q| q.id == quiz_result_id)
            .cloned()
    }

    /// Number of certificates stored (test inspection).
    pub fn certificate_count(&self) -> usize {
        self.tables.lock().unwrap().certificates.len()
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn get_user(&self, user_id: i64) -> Result<Option<UserRecord>, CoreError> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.users.iter().find(|u| u.id == user_id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, CoreError> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .users
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn get_course(&self, course_id: i64) -> Result<Option<CourseRecord>, CoreError> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.courses.iter().find(|c| c.id == course_id).cloned())
    }

    async fn create_quiz_result(
        &self,
        new: &NewQuizResult,
    ) -> Result<QuizResultRecord, CoreError> {
        let record = QuizResultRecord {
            id: self.allocate_id(),
            user_id: new.user_id,
            course_id: new.course_id,
            score: new.score,
            total_questions: new.total_questions,
            quiz_type: new.quiz_type.clone(),
            percentage: None,
            is_passing: None,
            created_at: Utc::now(),
        };
        self.tables
            .lock()
            .unwrap()
            .quiz_results
            .push(record.clone());
        Ok(record)
    }

    async fn set_quiz_result_outcome(
        &self,
        quiz_result_id: i64,
        percentage: f64,
        is_passing: bool,
    ) -> Result<(), CoreError> {
        let mut tables = self.tables.lock().unwrap();
        if let Some(result) = tables
            .quiz_results
            .iter_mut()
            .find(|q| q.id == quiz_result_id)
        {
            result.percentage = Some(percentage);
            result.is_passing = Some(is_passing);
        }
        Ok(())
    }

    async fn find_nonexpired_certificate(
        &self,
        user_id: i64,
        course_id: i64,
    ) -> Result<Option<CertificateRecord>, CoreError> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .certificates
            .iter()
            .find(|c| c.user_id == user_id && c.course_id == course_id && c.status != "expired")
            .cloned())
    }

    async fn create_certificate(
        &self,
        new: &NewCertificate,
    ) -> Result<CertificateRecord, CoreError> {
        let mut tables = self.tables.lock().unwrap();

        // Same uniqueness rule as the partial unique index in Postgres.
        let duplicate = tables
            .certificates
            .iter()
            .any(|c| c.user_id == new.user_id && c.course_id == new.course_id && c.status != "expired");
        if duplicate {
            return Err(CoreError::DatabaseError {
                operation: "insert certificate".to_string(),
                details: "duplicate non-expired certificate for user and course".to_string(),
            });
        }

        let record = CertificateRecord {
            id: self.allocate_id(),
            user_id: new.user_id,
            course_id: new.course_id,
            quiz_result_id: new.quiz_result_id,
            issued_date: new.issued_date,
            expiry_date: new.expiry_date,
            status: "active".to_string(),
            notifications_sent: Vec::new(),
            created_at: Utc::now(),
        };
        tables.certificates.push(record.clone());
        Ok(record)
    }

    async fn list_certificates_to_check(&self) -> Result<Vec<CertificateRecord>, CoreError> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .certificates
            .iter()
            .filter(|c| c.status != "expired")
            .cloned()
            .collect())
    }

    async fn list_certificates_for_user(
        &self,
        user_id: i64,
    ) -> Result<Vec<CertificateRecord>, CoreError> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .certificates
            .iter()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn update_certificate_state(
        &self,
        certificate_id: i64,
        status: &str,
        notifications_sent: &[String],
    ) -> Result<(), CoreError> {
        let mut tables = self.tables.lock().unwrap();
        if let Some(cert) = tables
            .certificates
            .iter_mut()
            .find(|c| c.id == certificate_id)
        {
            cert.status = status.to_string();
            cert.notifications_sent = notifications_sent.to_vec();
        }
        Ok(())
    }

    async fn create_order(&self, new: &NewOrder) -> Result<OrderRecord, CoreError> {
        let record = OrderRecord {
            id: self.allocate_id(),
            user_id: new.user_id,
            products: Json(new.products.clone()),
            status: "pending".to_string(),
            session_id: new.session_id.clone(),
            correlation_token: new.correlation_token.clone(),
            reminders_sent: Vec::new(),
            created_at: Utc::now(),
        };
        self.tables.lock().unwrap().orders.push(record.clone());
        Ok(record)
    }

    async fn list_paid_orders(&self) -> Result<Vec<OrderRecord>, CoreError> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .orders
            .iter()
            .filter(|o| o.status == "paid")
            .cloned()
            .collect())
    }

    async fn find_order_by_token(
        &self,
        correlation_token: &str,
    ) -> Result<Option<OrderRecord>, CoreError> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .orders
            .iter()
            .find(|o| o.correlation_token == correlation_token)
            .cloned())
    }

    async fn set_order_status(&self, order_id: i64, status: &str) -> Result<(), CoreError> {
        let mut tables = self.tables.lock().unwrap();
        match tables.orders.iter_mut().find(|o| o.id == order_id) {
            Some(order) => {
                order.status = status.to_string();
                Ok(())
            }
            None => Err(CoreError::OrderNotFound {
                correlation_token: format!("order:{}", order_id),
            }),
        }
    }

    async fn append_order_reminder(
        &self,
        order_id: i64,
        threshold_days: i32,
    ) -> Result<(), CoreError> {
        let mut tables = self.tables.lock().unwrap();
        if let Some(order) = tables.orders.iter_mut().find(|o| o.id == order_id) {
            if !order.reminders_sent.contains(&threshold_days) {
                order.reminders_sent.push(threshold_days);
            }
        }
        Ok(())
    }

    async fn has_quiz_progress(&self, user_id: i64, course_id: i64) -> Result<bool, CoreError> {
        let tables = self.tables.lock().unwrap();
        let has_result = tables
            .quiz_results
            .iter()
            .any(|q| q.user_id == user_id && q.course_id == course_id);
        let has_entry = tables
            .progress_entries
            .iter()
            .any(|(u, c, t)| *u == user_id && *c == course_id && t.starts_with("quiz_"));
        Ok(has_result || has_entry)
    }

    async fn enroll_user(&self, course_id: i64, user_id: i64) -> Result<(), CoreError> {
        if self.fail_enroll_course.load(Ordering::SeqCst) == course_id {
            return Err(CoreError::DatabaseError {
                operation: "enroll user".to_string(),
                details: "enrollment write rejected".to_string(),
            });
        }
        self.tables
            .lock()
            .unwrap()
            .enrollments
            .insert((course_id, user_id));
        Ok(())
    }

    async fn health_check(&self) -> Result<bool, CoreError> {
        Ok(true)
    }
}
