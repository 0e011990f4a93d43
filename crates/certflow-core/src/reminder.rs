// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Course completion reminders.
//!
//! Daily pass over paid orders: buyers who have not touched a quiz in any of
//! their purchased courses get a nudge at 3, 7, 14 and 30 days after
//! purchase. When a pass catches up after a gap it sends one email for the
//! largest threshold reached and marks everything at or below it, so a stale
//! order never produces a burst of backdated reminders.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{info, instrument, warn};

use crate::error::CoreError;
use crate::model::REMINDER_THRESHOLDS;
use crate::notify::NotificationGateway;
use crate::persistence::Repository;
use crate::templates::{self, Branding};

/// Summary of one reminder batch run.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct ReminderRunSummary {
    /// Paid orders examined.
    pub checked: usize,
    /// Reminder emails delivered.
    pub reminders_sent: usize,
    /// Orders skipped because the buyer already has quiz progress in one of
    /// the purchased courses.
    pub skipped_in_progress: usize,
    /// Send attempts that failed; thresholds stay unmarked and retry on the
    /// next run.
    pub send_failures: usize,
}

/// Reminder engine for paid-but-unstarted courses.
pub struct ReminderEngine {
    repo: Arc<dyn Repository>,
    mail: Arc<dyn NotificationGateway>,
    branding: Branding,
}

impl ReminderEngine {
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

    /// Run one reminder pass against the given reference date.
    #[instrument(skip(self))]
    pub async fn run_reminder_pass(
        &self,
        today: NaiveDate,
    ) -> Result<ReminderRunSummary, CoreError> {
        let orders = self.repo.list_paid_orders().await?;
        let mut summary = ReminderRunSummary::default();

        info!(count = orders.len(), "starting course reminder pass");

        for order in orders {
            summary.checked += 1;

            let days_elapsed = (today - order.created_at.date_naive()).num_days();
            let days_elapsed = match i32::try_from(days_elapsed) {
                Ok(d) if d >= 0 => d,
                _ => continue,
            };

            // 1. Thresholds reached but never marked for this order.
            let reached: Vec<i32> = REMINDER_THRESHOLDS
                .into_iter()
                .filter(|t| *t <= days_elapsed)
                .filter(|t| !order.reminders_sent.contains(t))
                .collect();
            let Some(&threshold) = reached.iter().max() else {
                continue;
            };

            // 2. Any quiz progress in any purchased course means the buyer
            //    has started; the whole order is skipped without marking.
            let mut has_progress = false;
            for item in order.products.0.iter() {
                if self.repo.has_quiz_progress(order.user_id, item.id).await? {
                    has_progress = true;
                    break;
                }
            }
            if has_progress {
                summary.skipped_in_progress += 1;
                continue;
            }

            let user = match self.repo.get_user(order.user_id).await? {
                Some(user) => user,
                None => {
                    warn!(order_id = order.id, user_id = order.user_id, "order buyer missing, skipping");
                    continue;
                }
            };

            // 3. One email naming every purchased course, for the largest
            //    threshold; mark everything reached so earlier thresholds
            //    never fire late.
            let course_names = order
                .products
                .0
                .iter()
                .map(|item| item.title.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            let (subject, body) = templates::course_reminder(
                &self.branding,
                user.greeting_name(),
                &course_names,
                threshold,
            );

            match self.mail.send(&user.email, &subject, &body).await {
                Ok(()) => {
                    for t in &reached {
                        self.repo.append_order_reminder(order.id, *t).await?;
                    }
                    summary.reminders_sent += 1;
                    info!(
                        order_id = order.id,
                        threshold,
                        recipient = %user.email,
                        "course reminder sent"
                    );
                }
                Err(e) => {
                    summary.send_failures += 1;
                    warn!(
                        order_id = order.id,
                        threshold,
                        error = %e,
                        "course reminder failed, thresholds left unmarked"
                    );
                }
            }
        }

        info!(
            checked = summary.checked,
            reminders_sent = summary.reminders_sent,
            skipped_in_progress = summary.skipped_in_progress,
            send_failures = summary.send_failures,
            "course reminder pass finished"
        );

        Ok(summary)
    }
}
