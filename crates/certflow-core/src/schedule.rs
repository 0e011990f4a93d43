// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! In-process schedule dispatch.
//!
//! The schedule is an explicit list of (cron expression, job) entries rather
//! than registrations scattered across modules. A minute-tick loop matches
//! each entry against the current time with `croner` and runs due jobs; job
//! failures are logged and never stop the dispatcher.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use croner::Cron;
use tokio::sync::watch;
use tracing::{error, info, instrument, warn};

use crate::error::CoreError;
use crate::lifecycle::LifecycleEngine;
use crate::reminder::ReminderEngine;

/// A scheduled batch job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Job {
    /// Daily certificate expiry pass.
    CertificateCheck,
    /// Daily course reminder pass.
    ReminderCheck,
}

impl Job {
    fn name(&self) -> &'static str {
        match self {
            Self::CertificateCheck => "certificate_check",
            Self::ReminderCheck => "reminder_check",
        }
    }
}

/// One schedule entry: a cron expression and the job it fires.
#[derive(Debug, Clone)]
pub struct ScheduleEntry {
    /// Standard 5-field cron expression, UTC.
    pub cron: String,
    /// Job to run when the expression matches.
    pub job: Job,
}

/// Minute-tick dispatcher for the batch engines.
pub struct Scheduler {
    lifecycle: Arc<LifecycleEngine>,
    reminder: Arc<ReminderEngine>,
    entries: Vec<(Cron, Job)>,
}

impl Scheduler {
    /// Build a scheduler from a list of entries. Rejects unparseable cron
    /// expressions up front so a bad config fails at startup, not at 15:15.
    pub fn new(
        lifecycle: Arc<LifecycleEngine>,
        reminder: Arc<ReminderEngine>,
        entries: Vec<ScheduleEntry>,
    ) -> Result<Self, CoreError> {
        let mut parsed = Vec::with_capacity(entries.len());
        for entry in entries {
            let cron = Cron::new(&entry.cron)
                .parse()
                .map_err(|e| CoreError::ValidationError {
                    field: "cron".to_string(),
                    message: format!("invalid expression '{}': {}", entry.cron, e),
                })?;
            parsed.push((cron, entry.job));
        }
        Ok(Self {
            lifecycle,
            reminder,
            entries: parsed,
        })
    }

    /// Run the dispatch loop until the shutdown channel flips to true.
    ///
    /// Ticks are aligned to minute boundaries so each cron minute is
    /// evaluated exactly once.
    #[instrument(skip(self, shutdown_rx))]
    pub async fn run(self, mut shutdown_rx: watch::Receiver<bool>) {
        info!(entries = self.entries.len(), "scheduler started");

        loop {
            let wait = seconds_to_next_minute();
            tokio::select! {
                biased;

                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("scheduler received shutdown signal");
                        break;
                    }
                }

                _ = tokio::time::sleep(Duration::from_secs(wait)) => {
                    self.dispatch_due_jobs().await;
                }
            }
        }
    }

    async fn dispatch_due_jobs(&self) {
        let now = Utc::now();
        for (cron, job) in &self.entries {
            let due = match cron.is_time_matching(&now) {
                Ok(due) => due,
                Err(e) => {
                    warn!(job = job.name(), error = %e, "cron match failed");
                    continue;
                }
            };
            if !due {
                continue;
            }

            info!(job = job.name(), "scheduled job firing");
            let today = now.date_naive();
            let result = match job {
                Job::CertificateCheck => self
                    .lifecycle
                    .check_expiring_certificates(today)
                    .await
                    .map(|_| ()),
                Job::ReminderCheck => {
                    self.reminder.run_reminder_pass(today).await.map(|_| ())
                }
            };
            if let Err(e) = result {
                error!(job = job.name(), error = %e, "scheduled job failed");
            }
        }
    }
}

fn seconds_to_next_minute() -> u64 {
    let secs = Utc::now().timestamp().rem_euclid(60);
    (60 - secs) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_default_cron_expressions_parse_and_match() {
        let cert = Cron::new("15 15 * * *").parse().unwrap();
        let reminder = Cron::new("45 15 * * *").parse().unwrap();

        let at_cert = Utc.with_ymd_and_hms(2026, 3, 10, 15, 15, 0).unwrap();
        let at_reminder = Utc.with_ymd_and_hms(2026, 3, 10, 15, 45, 0).unwrap();

        assert!(cert.is_time_matching(&at_cert).unwrap());
        assert!(!cert.is_time_matching(&at_reminder).unwrap());
        assert!(reminder.is_time_matching(&at_reminder).unwrap());
    }

    #[test]
    fn test_seconds_to_next_minute_is_in_range() {
        let wait = seconds_to_next_minute();
        assert!(wait >= 1 && wait <= 60);
    }
}
