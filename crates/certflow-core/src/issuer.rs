// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Certificate issuer.
//!
//! Consumes quiz submission events: records the result, derives the grade,
//! and mints a one-year certificate when a final quiz is passed at 90% or
//! better and no live certificate already covers the (user, course) pair.

use std::sync::Arc;

use chrono::{Months, NaiveDate};
use tracing::{info, instrument, warn};

use crate::error::CoreError;
use crate::model::QuizType;
use crate::notify::NotificationGateway;
use crate::persistence::{
    CertificateRecord, NewCertificate, NewQuizResult, QuizResultRecord, Repository,
};
use crate::templates::{self, Branding};

/// Passing grade, in percent. Final quizzes at or above this mint a
/// certificate.
pub const PASSING_PERCENTAGE: f64 = 90.0;

/// Validity period granted to a new certificate.
const VALIDITY_MONTHS: u32 = 12;

/// A quiz submission event, handed to the issuer by the API layer.
#[derive(Debug, Clone)]
pub struct QuizResultCreated {
    /// User who submitted the quiz.
    pub user_id: i64,
    /// Course the quiz belongs to.
    pub course_id: i64,
    /// Number of correct answers.
    pub score: i32,
    /// Number of questions in the quiz.
    pub total_questions: i32,
    /// Quiz type string; anything other than "final" is a unit quiz.
    pub quiz_type: String,
}

/// What the issuer did with a quiz submission.
#[derive(Debug, Clone)]
pub struct QuizOutcome {
    /// The recorded quiz result with its derived grade.
    pub quiz_result: QuizResultRecord,
    /// The certificate minted by this submission, when all gates passed.
    pub certificate: Option<CertificateRecord>,
}

/// Quiz grading and certificate minting engine.
pub struct IssuerEngine {
    repo: Arc<dyn Repository>,
    mail: Arc<dyn NotificationGateway>,
    branding: Branding,
}

impl IssuerEngine {
    /// Create an engine over the given store and mailer.
    pub fn new(
        repo: Arc<dyn Repository>,
        mail: Arc<dyn NotificationGateway>,
        branding: Branding,
    ) -> Self {
        Self {
            repo,
            mail,
            branding,
        }
    }

    /// Process a quiz submission.
    ///
    /// The quiz result is always recorded; the certificate gates run after.
    /// Notification failures are logged but never revoke a minted
    /// certificate.
    #[instrument(skip(self, event), fields(user_id = event.user_id, course_id = event.course_id))]
    pub async fn process_quiz_result(
        &self,
        event: QuizResultCreated,
        today: NaiveDate,
    ) -> Result<QuizOutcome, CoreError> {
        // 1. Validate the submission.
        if event.total_questions <= 0 {
            return Err(CoreError::ValidationError {
                field: "total_questions".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        if event.score < 0 || event.score > event.total_questions {
            return Err(CoreError::ValidationError {
                field: "score".to_string(),
                message: format!("must be between 0 and {}", event.total_questions),
            });
        }

        let user = self
            .repo
            .get_user(event.user_id)
            .await?
            .ok_or_else(|| CoreError::UserNotFound {
                identifier: event.user_id.to_string(),
            })?;
        let course = self
            .repo
            .get_course(event.course_id)
            .await?
            .ok_or(CoreError::CourseNotFound {
                course_id: event.course_id,
            })?;

        // 2. Record the result and derive the grade.
        let quiz_type = QuizType::parse(&event.quiz_type);
        let mut quiz_result = self
            .repo
            .create_quiz_result(&NewQuizResult {
                user_id: event.user_id,
                course_id: event.course_id,
                score: event.score,
                total_questions: event.total_questions,
                quiz_type: quiz_type.as_str().to_string(),
            })
            .await?;

        let percentage = f64::from(event.score) / f64::from(event.total_questions) * 100.0;
        let is_passing = percentage >= PASSING_PERCENTAGE;
        self.repo
            .set_quiz_result_outcome(quiz_result.id, percentage, is_passing)
            .await?;
        quiz_result.percentage = Some(percentage);
        quiz_result.is_passing = Some(is_passing);

        // 3. Certificate gates: final quiz, passing grade, no live duplicate.
        if quiz_type != QuizType::Final {
            return Ok(QuizOutcome {
                quiz_result,
                certificate: None,
            });
        }
        if !is_passing {
            info!(percentage, "final quiz below passing grade, no certificate");
            return Ok(QuizOutcome {
                quiz_result,
                certificate: None,
            });
        }
        if let Some(existing) = self
            .repo
            .find_nonexpired_certificate(event.user_id, event.course_id)
            .await?
        {
            info!(
                certificate_id = existing.id,
                "live certificate already exists, not minting another"
            );
            return Ok(QuizOutcome {
                quiz_result,
                certificate: None,
            });
        }

        // 4. Mint the certificate.
        let expiry_date = today
            .checked_add_months(Months::new(VALIDITY_MONTHS))
            .unwrap_or(NaiveDate::MAX);
        let certificate = self
            .repo
            .create_certificate(&NewCertificate {
                user_id: event.user_id,
                course_id: event.course_id,
                quiz_result_id: Some(quiz_result.id),
                issued_date: today,
                expiry_date,
            })
            .await?;

        info!(
            certificate_id = certificate.id,
            expiry_date = %expiry_date,
            "certificate issued"
        );

        // 5. Notify the learner and operations. The certificate stands even
        //    if either email fails.
        let (subject, body) = templates::congratulations(
            &self.branding,
            user.greeting_name(),
            &course.title,
            event.score,
            event.total_questions,
            percentage,
            certificate.issued_date,
            certificate.expiry_date,
        );
        if let Err(e) = self.mail.send(&user.email, &subject, &body).await {
            warn!(recipient = %user.email, error = %e, "congratulations email failed");
        }

        let (subject, body) = templates::ops_certificate_issued(
            &user.username,
            &user.email,
            &course.title,
            event.score,
            event.total_questions,
            certificate.issued_date,
            certificate.expiry_date,
        );
        if let Err(e) = self.mail.send(&self.branding.ops_email, &subject, &body).await {
            warn!(error = %e, "operations certificate notice failed");
        }

        Ok(QuizOutcome {
            quiz_result,
            certificate: Some(certificate),
        })
    }
}
