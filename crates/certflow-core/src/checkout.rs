// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Checkout flow.
//!
//! Turns a course purchase request into a hosted checkout session and a
//! pending local order. The order carries a locally generated correlation
//! token that the gateway echoes back in webhook events, which is how
//! reconciliation finds its way home.

use std::sync::Arc;

use rand::Rng;
use tracing::{info, instrument};

use crate::error::CoreError;
use crate::model::LineItem;
use crate::payment::{CheckoutLineItem, CheckoutSession, CheckoutSessionRequest, PaymentGateway};
use crate::persistence::{NewOrder, Repository};

/// A course purchase request from the storefront.
#[derive(Debug, Clone)]
pub struct CreateOrderRequest {
    /// Buyer.
    pub user_id: i64,
    /// Courses in the cart, with storefront prices.
    pub products: Vec<LineItem>,
    /// Percentage discount applied to every line item, 0 to 100.
    pub discount_percent: f64,
}

/// Result of opening a checkout: the local order and the gateway session.
#[derive(Debug, Clone)]
pub struct CheckoutCreated {
    /// Local order id, status pending.
    pub order_id: i64,
    /// Gateway session id.
    pub session_id: String,
    /// URL the buyer is redirected to for payment.
    pub checkout_url: String,
}

/// Checkout service: validates the cart, opens a gateway session and
/// persists the pending order.
pub struct CheckoutService {
    repo: Arc<dyn Repository>,
    gateway: Arc<dyn PaymentGateway>,
    client_url: String,
}

impl CheckoutService {
    /// Create a service over the given store and payment gateway.
    pub fn new(
        repo: Arc<dyn Repository>,
        gateway: Arc<dyn PaymentGateway>,
        client_url: String,
    ) -> Self {
        Self {
            repo,
            gateway,
            client_url,
        }
    }

    /// Open a checkout session for a cart and record the pending order.
    #[instrument(skip(self, request), fields(user_id = request.user_id))]
    pub async fn create_order(
        &self,
        request: CreateOrderRequest,
    ) -> Result<CheckoutCreated, CoreError> {
        // 1. Validate the cart.
        if request.products.is_empty() {
            return Err(CoreError::ValidationError {
                field: "products".to_string(),
                message: "at least one product is required".to_string(),
            });
        }
        if !(0.0..=100.0).contains(&request.discount_percent) {
            return Err(CoreError::ValidationError {
                field: "discount_percent".to_string(),
                message: "must be between 0 and 100".to_string(),
            });
        }

        let user = self
            .repo
            .get_user(request.user_id)
            .await?
            .ok_or_else(|| CoreError::UserNotFound {
                identifier: request.user_id.to_string(),
            })?;

        // 2. Apply the discount and price in cents, floored at zero.
        let products: Vec<LineItem> = request
            .products
            .iter()
            .map(|item| LineItem {
                id: item.id,
                title: item.title.clone(),
                price: discounted_price(item.price, request.discount_percent),
            })
            .collect();

        let line_items: Vec<CheckoutLineItem> = products
            .iter()
            .map(|item| CheckoutLineItem {
                name: item.title.clone(),
                amount_cents: to_cents(item.price),
                quantity: 1,
            })
            .collect();

        // 3. Open the gateway session with the correlation token in its
        //    metadata.
        let correlation_token = generate_correlation_token();
        let session: CheckoutSession = self
            .gateway
            .create_checkout_session(&CheckoutSessionRequest {
                customer_email: user.email.clone(),
                line_items,
                success_url: format!("{}/checkout/success", self.client_url),
                cancel_url: format!("{}/checkout/cancelled", self.client_url),
                correlation_token: correlation_token.clone(),
            })
            .await?;

        // 4. Persist the pending order.
        let order = self
            .repo
            .create_order(&NewOrder {
                user_id: request.user_id,
                products,
                session_id: session.id.clone(),
                correlation_token,
            })
            .await?;

        info!(order_id = order.id, session_id = %session.id, "checkout session opened");

        Ok(CheckoutCreated {
            order_id: order.id,
            session_id: session.id,
            checkout_url: session.url,
        })
    }
}

/// Apply a percentage discount, never going below zero.
fn discounted_price(price: f64, discount_percent: f64) -> f64 {
    (price * (1.0 - discount_percent / 100.0)).max(0.0)
}

/// Price in the smallest currency unit, rounded to the nearest cent.
fn to_cents(price: f64) -> i64 {
    (price * 100.0).round() as i64
}

/// Six-digit order reference, `ord-NNNNNN`.
fn generate_correlation_token() -> String {
    let n: u32 = rand::thread_rng().gen_range(100_000..1_000_000);
    format!("ord-{}", n)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discount_application() {
        assert_eq!(discounted_price(100.0, 0.0), 100.0);
        assert_eq!(discounted_price(100.0, 25.0), 75.0);
        assert_eq!(discounted_price(100.0, 100.0), 0.0);
    }

    #[test]
    fn test_cents_rounding() {
        assert_eq!(to_cents(99.5), 9950);
        assert_eq!(to_cents(10.005), 1001);
        assert_eq!(to_cents(0.0), 0);
    }

    #[test]
    fn test_correlation_token_shape() {
        for _ in 0..20 {
            let token = generate_correlation_token();
            assert!(token.starts_with("ord-"));
            assert_eq!(token.len(), "ord-".len() + 6);
            assert!(token["ord-".len()..].chars().all(|c| c.is_ascii_digit()));
        }
    }
}
