// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Integration tests for payment event reconciliation.

mod common;

use certflow_core::model::{LineItem, OrderStatus, PaymentEvent, PaymentEventKind};
use certflow_core::persistence::{NewOrder, Repository};
use certflow_core::reconcile::{ReconcileEngine, ReconcileOutcome};

use common::{branding, fixtures, OPS_EMAIL};

async fn seed_pending_order(
    repo: &certflow_core::persistence::MemoryRepository,
    user_id: i64,
    course_ids: &[(i64, &str)],
    token: &str,
) -> i64 {
    let products = course_ids
        .iter()
        .map(|(id, title)| LineItem {
            id: *id,
            title: title.to_string(),
            price: 150.0,
        })
        .collect();
    let order = repo
        .create_order(&NewOrder {
            user_id,
            products,
            session_id: format!("cs_test_{}", token),
            correlation_token: token.to_string(),
        })
        .await
        .unwrap();
    order.id
}

fn success_event(token: &str) -> PaymentEvent {
    PaymentEvent {
        kind: PaymentEventKind::Succeeded,
        correlation_token: token.to_string(),
        customer_email: None,
    }
}

#[tokio::test]
async fn test_success_settles_enrolls_and_confirms() {
    let (repo, mail) = fixtures();
    let user = repo.seed_user("vic@example.test", "vic", None);
    let a = repo.seed_course("Course A");
    let b = repo.seed_course("Course B");
    let order_id = seed_pending_order(
        &repo,
        user.id,
        &[(a.id, "Course A"), (b.id, "Course B")],
        "ord-111111",
    )
    .await;

    let engine = ReconcileEngine::new(repo.clone(), mail.clone(), branding());
    let outcome = engine
        .apply_payment_event(&success_event("ord-111111"))
        .await
        .unwrap();

    assert_eq!(
        outcome,
        ReconcileOutcome::Applied {
            order_id,
            status: OrderStatus::Paid,
        }
    );
    assert_eq!(repo.order(order_id).unwrap().status, "paid");
    assert!(repo.is_enrolled(a.id, user.id));
    assert!(repo.is_enrolled(b.id, user.id));

    let sent = mail.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].to, "vic@example.test");
    assert_eq!(sent[0].subject, "Payment Successful");
    assert_eq!(sent[1].to, OPS_EMAIL);
    assert!(sent[1].subject.contains("New order from vic@example.test"));
}

#[tokio::test]
async fn test_failure_settles_failed_and_notifies() {
    let (repo, mail) = fixtures();
    let user = repo.seed_user("wes@example.test", "wes", None);
    let course = repo.seed_course("Course A");
    let order_id =
        seed_pending_order(&repo, user.id, &[(course.id, "Course A")], "ord-222222").await;

    let engine = ReconcileEngine::new(repo.clone(), mail.clone(), branding());
    let outcome = engine
        .apply_payment_event(&PaymentEvent {
            kind: PaymentEventKind::Failed,
            correlation_token: "ord-222222".to_string(),
            customer_email: None,
        })
        .await
        .unwrap();

    assert_eq!(
        outcome,
        ReconcileOutcome::Applied {
            order_id,
            status: OrderStatus::Failed,
        }
    );
    assert_eq!(repo.order(order_id).unwrap().status, "failed");
    assert!(!repo.is_enrolled(course.id, user.id));

    let sent = mail.sent();
    assert_eq!(sent[0].subject, "Payment Failed");
}

#[tokio::test]
async fn test_unknown_token_is_dropped_without_mutation() {
    let (repo, mail) = fixtures();
    let user = repo.seed_user("xia@example.test", "xia", None);
    let course = repo.seed_course("Course A");
    let order_id =
        seed_pending_order(&repo, user.id, &[(course.id, "Course A")], "ord-333333").await;

    let engine = ReconcileEngine::new(repo.clone(), mail.clone(), branding());
    let outcome = engine
        .apply_payment_event(&PaymentEvent {
            kind: PaymentEventKind::Failed,
            correlation_token: "ord-999999".to_string(),
            customer_email: None,
        })
        .await
        .unwrap();

    assert_eq!(outcome, ReconcileOutcome::UnknownToken);
    assert_eq!(repo.order(order_id).unwrap().status, "pending");
    assert_eq!(mail.sent_count(), 0);
}

#[tokio::test]
async fn test_replayed_event_changes_nothing() {
    let (repo, mail) = fixtures();
    let user = repo.seed_user("yan@example.test", "yan", None);
    let course = repo.seed_course("Course A");
    let order_id =
        seed_pending_order(&repo, user.id, &[(course.id, "Course A")], "ord-444444").await;

    let engine = ReconcileEngine::new(repo.clone(), mail.clone(), branding());
    engine
        .apply_payment_event(&success_event("ord-444444"))
        .await
        .unwrap();
    assert_eq!(mail.sent_count(), 2);

    // Replay of the success, then a late failure: both ignored.
    let replay = engine
        .apply_payment_event(&success_event("ord-444444"))
        .await
        .unwrap();
    assert_eq!(replay, ReconcileOutcome::AlreadySettled { order_id });

    let late_failure = engine
        .apply_payment_event(&PaymentEvent {
            kind: PaymentEventKind::Failed,
            correlation_token: "ord-444444".to_string(),
            customer_email: None,
        })
        .await
        .unwrap();
    assert_eq!(late_failure, ReconcileOutcome::AlreadySettled { order_id });

    assert_eq!(repo.order(order_id).unwrap().status, "paid");
    assert_eq!(mail.sent_count(), 2);
}

#[tokio::test]
async fn test_enrollment_failure_never_blocks_the_other_courses() {
    let (repo, mail) = fixtures();
    let user = repo.seed_user("ana@example.test", "ana", None);
    let a = repo.seed_course("Course A");
    let b = repo.seed_course("Course B");
    let c = repo.seed_course("Course C");
    let order_id = seed_pending_order(
        &repo,
        user.id,
        &[(a.id, "Course A"), (b.id, "Course B"), (c.id, "Course C")],
        "ord-666666",
    )
    .await;
    repo.set_enroll_failure(b.id);

    let engine = ReconcileEngine::new(repo.clone(), mail.clone(), branding());
    let outcome = engine
        .apply_payment_event(&success_event("ord-666666"))
        .await
        .unwrap();

    // The failed grant is logged; the order settles, the other courses are
    // granted, and the confirmations still go out.
    assert_eq!(
        outcome,
        ReconcileOutcome::Applied {
            order_id,
            status: OrderStatus::Paid,
        }
    );
    assert_eq!(repo.order(order_id).unwrap().status, "paid");
    assert!(repo.is_enrolled(a.id, user.id));
    assert!(!repo.is_enrolled(b.id, user.id));
    assert!(repo.is_enrolled(c.id, user.id));
    assert_eq!(mail.sent_count(), 2);
}

#[tokio::test]
async fn test_email_failure_never_unsettles_the_order() {
    let (repo, mail) = fixtures();
    let user = repo.seed_user("zoe@example.test", "zoe", None);
    let course = repo.seed_course("Course A");
    let order_id =
        seed_pending_order(&repo, user.id, &[(course.id, "Course A")], "ord-555555").await;
    mail.set_failing(true);

    let engine = ReconcileEngine::new(repo.clone(), mail.clone(), branding());
    let outcome = engine
        .apply_payment_event(&success_event("ord-555555"))
        .await
        .unwrap();

    assert_eq!(
        outcome,
        ReconcileOutcome::Applied {
            order_id,
            status: OrderStatus::Paid,
        }
    );
    assert_eq!(repo.order(order_id).unwrap().status, "paid");
    assert!(repo.is_enrolled(course.id, user.id));
}
