// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Certificate lifecycle engine.
//!
//! Runs the daily expiry pass: evaluates every non-expired certificate
//! against today's date, sends the warning tiers that have become due, and
//! advances the certificate status. The tier decision itself is a pure
//! function so the batch semantics are testable without a store or a mailer.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{info, instrument, warn};

use crate::error::CoreError;
use crate::model::{CertificateStatus, NotificationTier};
use crate::notify::NotificationGateway;
use crate::persistence::Repository;
use crate::templates::{self, Branding};

/// Outcome of evaluating one certificate against a reference date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    /// Status the certificate should hold after this pass.
    pub next_status: CertificateStatus,
    /// Tiers that are due and have not been sent, least urgent first.
    pub due_tiers: Vec<NotificationTier>,
}

/// Evaluate a certificate's expiry state.
///
/// Returns every tier whose window has been entered and whose marker is not
/// yet present. A certificate evaluated after a gap can owe several tiers at
/// once; they are returned least urgent first so the learner's inbox reads
/// in escalation order.
pub fn evaluate(
    status: CertificateStatus,
    expiry_date: NaiveDate,
    notifications_sent: &[String],
    today: NaiveDate,
) -> Evaluation {
    // Expired is terminal. Nothing further is owed.
    if status == CertificateStatus::Expired {
        return Evaluation {
            next_status: CertificateStatus::Expired,
            due_tiers: Vec::new(),
        };
    }

    let days_until_expiry = (expiry_date - today).num_days();

    let due_tiers = NotificationTier::ALL
        .into_iter()
        .filter(|tier| days_until_expiry <= tier.max_days())
        .filter(|tier| !notifications_sent.iter().any(|m| m == tier.as_str()))
        .collect();

    let next_status = if days_until_expiry <= 0 {
        CertificateStatus::Expired
    } else if days_until_expiry <= 30 {
        CertificateStatus::ExpiringSoon
    } else {
        status
    };

    Evaluation {
        next_status,
        due_tiers,
    }
}

/// The tier a preview email should demonstrate for a certificate: the most
/// urgent tier already due, or the 30-day tier when none is.
fn preview_tier(expiry_date: NaiveDate, today: NaiveDate) -> NotificationTier {
    let days_until_expiry = (expiry_date - today).num_days();
    NotificationTier::ALL
        .into_iter()
        .rev()
        .find(|tier| days_until_expiry <= tier.max_days())
        .unwrap_or(NotificationTier::ThirtyDay)
}

/// Summary of one expiry batch run, reported to logs and the trigger caller.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct LifecycleRunSummary {
    /// Certificates evaluated.
    pub checked: usize,
    /// Warning emails delivered.
    pub emails_sent: usize,
    /// Certificates moved to expired during this run.
    pub expired: usize,
    /// Send attempts that failed; their tiers stay unmarked and retry on the
    /// next run.
    pub send_failures: usize,
}

/// Daily certificate expiry engine.
pub struct LifecycleEngine {
    repo: Arc<dyn Repository>,
    mail: Arc<dyn NotificationGateway>,
    branding: Branding,
}

impl LifecycleEngine {
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

    /// Run one expiry pass against the given reference date.
    ///
    /// Per-certificate failures are logged and skipped so one bad row cannot
    /// stall the rest of the batch.
    #[instrument(skip(self))]
    pub async fn check_expiring_certificates(
        &self,
        today: NaiveDate,
    ) -> Result<LifecycleRunSummary, CoreError> {
        let certificates = self.repo.list_certificates_to_check().await?;
        let mut summary = LifecycleRunSummary::default();

        info!(count = certificates.len(), "starting certificate expiry pass");

        for cert in certificates {
            summary.checked += 1;

            let status = CertificateStatus::parse(&cert.status);
            let evaluation = evaluate(status, cert.expiry_date, &cert.notifications_sent, today);

            if evaluation.due_tiers.is_empty() && evaluation.next_status == status {
                continue;
            }

            // 1. Resolve recipient and course for the emails.
            let user = match self.repo.get_user(cert.user_id).await? {
                Some(user) => user,
                None => {
                    warn!(certificate_id = cert.id, user_id = cert.user_id, "certificate owner missing, skipping");
                    continue;
                }
            };
            let course = match self.repo.get_course(cert.course_id).await? {
                Some(course) => course,
                None => {
                    warn!(certificate_id = cert.id, course_id = cert.course_id, "certificate course missing, skipping");
                    continue;
                }
            };

            // 2. Send each due tier, marking only on successful delivery so a
            //    failed tier is retried on the next run.
            let mut sent = cert.notifications_sent.clone();
            for tier in &evaluation.due_tiers {
                let subject = templates::expiry_subject(*tier, &course.title);
                let body = templates::expiry_body(
                    &self.branding,
                    *tier,
                    user.greeting_name(),
                    &course.title,
                    course.id,
                    cert.expiry_date,
                );

                match self.mail.send(&user.email, &subject, &body).await {
                    Ok(()) => {
                        sent.push(tier.as_str().to_string());
                        summary.emails_sent += 1;
                        info!(
                            certificate_id = cert.id,
                            tier = tier.as_str(),
                            recipient = %user.email,
                            "expiry notification sent"
                        );
                    }
                    Err(e) => {
                        summary.send_failures += 1;
                        warn!(
                            certificate_id = cert.id,
                            tier = tier.as_str(),
                            error = %e,
                            "expiry notification failed, tier left unmarked"
                        );
                    }
                }
            }

            // 3. Persist the new status and markers in one write. Expired is
            //    only persisted once the expired notice is marked; until then
            //    the row stays in the batch so the notice is retried.
            let expired_notified = sent.iter().any(|m| m == NotificationTier::Expired.as_str());
            let next_status = if evaluation.next_status == CertificateStatus::Expired
                && !expired_notified
            {
                CertificateStatus::ExpiringSoon
            } else {
                evaluation.next_status
            };
            if next_status == CertificateStatus::Expired && status != CertificateStatus::Expired {
                summary.expired += 1;
            }
            self.repo
                .update_certificate_state(cert.id, next_status.as_str(), &sent)
                .await?;
        }

        info!(
            checked = summary.checked,
            emails_sent = summary.emails_sent,
            expired = summary.expired,
            send_failures = summary.send_failures,
            "certificate expiry pass finished"
        );

        Ok(summary)
    }

    /// Send preview expiry emails for every certificate owned by the user
    /// with the given address. Subjects carry a `[TEST]` prefix and no tier
    /// markers are written. One failed send does not stop the rest; every
    /// certificate gets a reported outcome.
    #[instrument(skip(self))]
    pub async fn test_expiry_email(
        &self,
        email: &str,
        today: NaiveDate,
    ) -> Result<Vec<TestEmailOutcome>, CoreError> {
        let user = self
            .repo
            .find_user_by_email(email)
            .await?
            .ok_or_else(|| CoreError::UserNotFound {
                identifier: email.to_string(),
            })?;

        let certificates = self.repo.list_certificates_for_user(user.id).await?;
        let mut outcomes = Vec::with_capacity(certificates.len());

        for cert in certificates {
            let course = match self.repo.get_course(cert.course_id).await? {
                Some(course) => course,
                None => {
                    warn!(certificate_id = cert.id, course_id = cert.course_id, "certificate course missing, skipping preview");
                    continue;
                }
            };

            let tier = preview_tier(cert.expiry_date, today);
            let subject = format!("[TEST] {}", templates::expiry_subject(tier, &course.title));
            let body = templates::expiry_body(
                &self.branding,
                tier,
                user.greeting_name(),
                &course.title,
                course.id,
                cert.expiry_date,
            );

            let error = self
                .mail
                .send(&user.email, &subject, &body)
                .await
                .err()
                .map(|e| e.to_string());
            outcomes.push(TestEmailOutcome {
                certificate_id: cert.id,
                course: course.title,
                tier: tier.as_str().to_string(),
                sent: error.is_none(),
                error,
            });
        }

        info!(
            recipient = %user.email,
            sent = outcomes.iter().filter(|o| o.sent).count(),
            total = outcomes.len(),
            "test expiry emails processed"
        );
        Ok(outcomes)
    }
}

/// Result of one preview email in the diagnostic pass.
#[derive(Debug, Clone, serde::Serialize)]
pub struct TestEmailOutcome {
    /// Certificate the preview was rendered for.
    pub certificate_id: i64,
    /// Course title on the certificate.
    pub course: String,
    /// Tier the preview demonstrated.
    pub tier: String,
    /// Whether the email was delivered.
    pub sent: bool,
    /// Delivery error, when sending failed.
    pub error: Option<String>,
}
