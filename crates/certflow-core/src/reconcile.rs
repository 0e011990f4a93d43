// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Order reconciliation.
//!
//! Applies verified payment gateway events to local orders: success settles
//! the order, enrolls the buyer in each purchased course and confirms by
//! email; failure settles the order as failed and notifies. Events for
//! unknown correlation tokens are logged and dropped so the gateway never
//! retries them forever.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::error::CoreError;
use crate::model::{OrderStatus, PaymentEvent, PaymentEventKind};
use crate::notify::NotificationGateway;
use crate::persistence::{OrderRecord, Repository};
use crate::templates::{self, Branding};

/// What applying a payment event did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The order was settled by this event.
    Applied {
        /// The settled order.
        order_id: i64,
        /// Status the order now holds.
        status: OrderStatus,
    },
    /// The order was already settled; the event changed nothing.
    AlreadySettled {
        /// The order the event matched.
        order_id: i64,
    },
    /// No order matched the event's correlation token. Dropped.
    UnknownToken,
}

/// Payment event reconciliation engine.
pub struct ReconcileEngine {
    repo: Arc<dyn Repository>,
    mail: Arc<dyn NotificationGateway>,
    branding: Branding,
}

impl ReconcileEngine {
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

    /// Apply one verified payment event.
    ///
    /// Settlement and enrollment are the source of truth; confirmation
    /// emails are best-effort and never fail the event.
    #[instrument(skip(self, event), fields(token = %event.correlation_token))]
    pub async fn apply_payment_event(
        &self,
        event: &PaymentEvent,
    ) -> Result<ReconcileOutcome, CoreError> {
        // 1. Locate the order. Unknown tokens are dropped, not errored, so
        //    the gateway gets its acknowledgement and stops retrying.
        let order = match self.repo.find_order_by_token(&event.correlation_token).await? {
            Some(order) => order,
            None => {
                warn!("payment event for unknown correlation token, dropping");
                return Ok(ReconcileOutcome::UnknownToken);
            }
        };

        // 2. Settled orders are terminal; replays and late failures change
        //    nothing.
        if order.status != OrderStatus::Pending.as_str() {
            info!(order_id = order.id, status = %order.status, "order already settled, ignoring event");
            return Ok(ReconcileOutcome::AlreadySettled { order_id: order.id });
        }

        match event.kind {
            PaymentEventKind::Succeeded => self.settle_paid(&order, event).await,
            PaymentEventKind::Failed => self.settle_failed(&order, event).await,
        }
    }

    async fn settle_paid(
        &self,
        order: &OrderRecord,
        event: &PaymentEvent,
    ) -> Result<ReconcileOutcome, CoreError> {
        self.repo
            .set_order_status(order.id, OrderStatus::Paid.as_str())
            .await?;

        // One bad course grant must not block the rest of the order or the
        // confirmation emails; the order is already settled at this point.
        let mut enrolled = 0usize;
        for item in order.products.0.iter() {
            match self.repo.enroll_user(item.id, order.user_id).await {
                Ok(()) => enrolled += 1,
                Err(e) => warn!(
                    order_id = order.id,
                    course_id = item.id,
                    error = %e,
                    "enrollment failed for purchased course"
                ),
            }
        }

        info!(
            order_id = order.id,
            enrolled,
            courses = order.products.0.len(),
            "order paid, buyer enrolled"
        );

        let buyer_email = self.buyer_email(order, event).await?;
        let (subject, body) = templates::payment_succeeded(&self.branding, &order.products.0);
        if let Err(e) = self.mail.send(&buyer_email, &subject, &body).await {
            warn!(order_id = order.id, error = %e, "payment confirmation email failed");
        }

        let (subject, body) =
            templates::ops_payment_outcome(&buyer_email, true, &order.products.0);
        if let Err(e) = self.mail.send(&self.branding.ops_email, &subject, &body).await {
            warn!(order_id = order.id, error = %e, "operations order notice failed");
        }

        Ok(ReconcileOutcome::Applied {
            order_id: order.id,
            status: OrderStatus::Paid,
        })
    }

    async fn settle_failed(
        &self,
        order: &OrderRecord,
        event: &PaymentEvent,
    ) -> Result<ReconcileOutcome, CoreError> {
        self.repo
            .set_order_status(order.id, OrderStatus::Failed.as_str())
            .await?;

        info!(order_id = order.id, "order marked failed");

        let buyer_email = self.buyer_email(order, event).await?;
        let (subject, body) = templates::payment_failed(&self.branding, &order.products.0);
        if let Err(e) = self.mail.send(&buyer_email, &subject, &body).await {
            warn!(order_id = order.id, error = %e, "payment failure email failed");
        }

        let (subject, body) =
            templates::ops_payment_outcome(&buyer_email, false, &order.products.0);
        if let Err(e) = self.mail.send(&self.branding.ops_email, &subject, &body).await {
            warn!(order_id = order.id, error = %e, "operations failure notice failed");
        }

        Ok(ReconcileOutcome::Applied {
            order_id: order.id,
            status: OrderStatus::Failed,
        })
    }

    /// The address to notify: the local account email, falling back to the
    /// address the gateway reported when the account is gone.
    async fn buyer_email(
        &self,
        order: &OrderRecord,
        event: &PaymentEvent,
    ) -> Result<String, CoreError> {
        if let Some(user) = self.repo.get_user(order.user_id).await? {
            return Ok(user.email);
        }
        event
            .customer_email
            .clone()
            .ok_or_else(|| CoreError::UserNotFound {
                identifier: order.user_id.to_string(),
            })
    }
}
