// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Integration tests for the course completion reminder batch.

mod common;

use certflow_core::model::LineItem;
use certflow_core::reminder::ReminderEngine;

use common::{branding, date, datetime, fixtures};

fn course_item(id: i64, title: &str) -> LineItem {
    LineItem {
        id,
        title: title.to_string(),
        price: 120.0,
    }
}

#[tokio::test]
async fn test_ten_day_old_order_gets_the_seven_day_reminder() {
    let (repo, mail) = fixtures();
    let user = repo.seed_user("oli@example.test", "oli", Some("Oli"));
    let course = repo.seed_course("Forklift Safety");
    let order = repo.seed_paid_order(
        user.id,
        vec![course_item(course.id, "Forklift Safety")],
        datetime(2026, 6, 1),
        vec![],
    );

    let engine = ReminderEngine::new(repo.clone(), mail.clone(), branding());
    let summary = engine.run_reminder_pass(date(2026, 6, 11)).await.unwrap();

    assert_eq!(summary.reminders_sent, 1);
    let sent = mail.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "oli@example.test");
    assert!(sent[0].html.contains("7 days ago"));

    // Both reached thresholds are marked, so 3 never fires late.
    let order = repo.order(order.id).unwrap();
    assert!(order.reminders_sent.contains(&3));
    assert!(order.reminders_sent.contains(&7));
    assert!(!order.reminders_sent.contains(&14));
}

#[tokio::test]
async fn test_quiz_progress_suppresses_reminders_regardless_of_age() {
    let (repo, mail) = fixtures();
    let user = repo.seed_user("pam@example.test", "pam", None);
    let course = repo.seed_course("OSHA 10");
    repo.seed_paid_order(
        user.id,
        vec![course_item(course.id, "OSHA 10")],
        datetime(2026, 1, 1),
        vec![],
    );
    repo.seed_progress_entry(user.id, course.id, "quiz_unit_2");

    let engine = ReminderEngine::new(repo.clone(), mail.clone(), branding());
    let summary = engine.run_reminder_pass(date(2026, 6, 11)).await.unwrap();

    assert_eq!(summary.reminders_sent, 0);
    assert_eq!(summary.skipped_in_progress, 1);
    assert_eq!(mail.sent_count(), 0);
}

#[tokio::test]
async fn test_progress_in_one_course_suppresses_the_whole_order() {
    let (repo, mail) = fixtures();
    let user = repo.seed_user("quin@example.test", "quin", None);
    let started = repo.seed_course("Started Course");
    let untouched = repo.seed_course("Untouched Course");
    let order = repo.seed_paid_order(
        user.id,
        vec![
            course_item(started.id, "Started Course"),
            course_item(untouched.id, "Untouched Course"),
        ],
        datetime(2026, 6, 1),
        vec![],
    );
    repo.seed_progress_entry(user.id, started.id, "quiz_final");

    let engine = ReminderEngine::new(repo.clone(), mail.clone(), branding());
    let summary = engine.run_reminder_pass(date(2026, 6, 5)).await.unwrap();

    // Starting any purchased course silences the order entirely, and the
    // thresholds stay unmarked.
    assert_eq!(summary.reminders_sent, 0);
    assert_eq!(summary.skipped_in_progress, 1);
    assert_eq!(mail.sent_count(), 0);
    assert!(repo.order(order.id).unwrap().reminders_sent.is_empty());
}

#[tokio::test]
async fn test_reminder_names_every_purchased_course() {
    let (repo, mail) = fixtures();
    let user = repo.seed_user("viv@example.test", "viv", None);
    let first = repo.seed_course("Forklift Safety");
    let second = repo.seed_course("OSHA 10");
    repo.seed_paid_order(
        user.id,
        vec![
            course_item(first.id, "Forklift Safety"),
            course_item(second.id, "OSHA 10"),
        ],
        datetime(2026, 6, 1),
        vec![],
    );

    let engine = ReminderEngine::new(repo.clone(), mail.clone(), branding());
    let summary = engine.run_reminder_pass(date(2026, 6, 5)).await.unwrap();

    assert_eq!(summary.reminders_sent, 1);
    let sent = mail.sent();
    assert!(sent[0].html.contains("Forklift Safety"));
    assert!(sent[0].html.contains("OSHA 10"));
}

#[tokio::test]
async fn test_second_pass_same_day_is_a_no_op() {
    let (repo, mail) = fixtures();
    let user = repo.seed_user("raj@example.test", "raj", None);
    let course = repo.seed_course("First Aid");
    repo.seed_paid_order(
        user.id,
        vec![course_item(course.id, "First Aid")],
        datetime(2026, 6, 1),
        vec![],
    );

    let engine = ReminderEngine::new(repo.clone(), mail.clone(), branding());
    let today = date(2026, 6, 5);
    let first = engine.run_reminder_pass(today).await.unwrap();
    assert_eq!(first.reminders_sent, 1);

    let second = engine.run_reminder_pass(today).await.unwrap();
    assert_eq!(second.reminders_sent, 0);
    assert_eq!(mail.sent_count(), 1);
}

#[tokio::test]
async fn test_thresholds_escalate_across_passes() {
    let (repo, mail) = fixtures();
    let user = repo.seed_user("sia@example.test", "sia", None);
    let course = repo.seed_course("Rigging");
    let order = repo.seed_paid_order(
        user.id,
        vec![course_item(course.id, "Rigging")],
        datetime(2026, 6, 1),
        vec![],
    );

    let engine = ReminderEngine::new(repo.clone(), mail.clone(), branding());

    engine.run_reminder_pass(date(2026, 6, 4)).await.unwrap();
    engine.run_reminder_pass(date(2026, 6, 8)).await.unwrap();
    engine.run_reminder_pass(date(2026, 6, 15)).await.unwrap();
    engine.run_reminder_pass(date(2026, 7, 1)).await.unwrap();

    assert_eq!(mail.sent_count(), 4);
    let order = repo.order(order.id).unwrap();
    assert_eq!(order.reminders_sent, vec![3, 7, 14, 30]);

    // 30 days is the last threshold; nothing more ever fires.
    let summary = engine.run_reminder_pass(date(2026, 8, 1)).await.unwrap();
    assert_eq!(summary.reminders_sent, 0);
}

#[tokio::test]
async fn test_young_order_is_left_alone() {
    let (repo, mail) = fixtures();
    let user = repo.seed_user("tom@example.test", "tom", None);
    let course = repo.seed_course("Scaffolding");
    repo.seed_paid_order(
        user.id,
        vec![course_item(course.id, "Scaffolding")],
        datetime(2026, 6, 10),
        vec![],
    );

    let engine = ReminderEngine::new(repo.clone(), mail.clone(), branding());
    let summary = engine.run_reminder_pass(date(2026, 6, 12)).await.unwrap();

    assert_eq!(summary.checked, 1);
    assert_eq!(summary.reminders_sent, 0);
    assert_eq!(mail.sent_count(), 0);
}

#[tokio::test]
async fn test_failed_send_retries_on_the_next_pass() {
    let (repo, mail) = fixtures();
    let user = repo.seed_user("uma@example.test", "uma", None);
    let course = repo.seed_course("Welding");
    let order = repo.seed_paid_order(
        user.id,
        vec![course_item(course.id, "Welding")],
        datetime(2026, 6, 1),
        vec![],
    );

    let engine = ReminderEngine::new(repo.clone(), mail.clone(), branding());

    mail.set_failing(true);
    let summary = engine.run_reminder_pass(date(2026, 6, 5)).await.unwrap();
    assert_eq!(summary.send_failures, 1);
    assert!(repo.order(order.id).unwrap().reminders_sent.is_empty());

    mail.set_failing(false);
    let summary = engine.run_reminder_pass(date(2026, 6, 5)).await.unwrap();
    assert_eq!(summary.reminders_sent, 1);
    assert_eq!(repo.order(order.id).unwrap().reminders_sent, vec![3]);
}
