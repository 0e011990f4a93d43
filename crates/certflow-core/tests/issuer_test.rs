// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Integration tests for quiz grading and certificate minting.

mod common;

use certflow_core::issuer::{IssuerEngine, QuizResultCreated};

use common::{branding, date, fixtures, OPS_EMAIL};

fn final_quiz(user_id: i64, course_id: i64, score: i32, total: i32) -> QuizResultCreated {
    QuizResultCreated {
        user_id,
        course_id,
        score,
        total_questions: total,
        quiz_type: "final".to_string(),
    }
}

#[tokio::test]
async fn test_passing_final_mints_a_one_year_certificate() {
    let (repo, mail) = fixtures();
    let user = repo.seed_user("gia@example.test", "gia", Some("Gia"));
    let course = repo.seed_course("Forklift Safety");
    let today = date(2026, 3, 5);

    let engine = IssuerEngine::new(repo.clone(), mail.clone(), branding());
    let outcome = engine
        .process_quiz_result(final_quiz(user.id, course.id, 9, 10), today)
        .await
        .unwrap();

    let cert = outcome.certificate.expect("certificate minted");
    assert_eq!(cert.issued_date, today);
    assert_eq!(cert.expiry_date, date(2027, 3, 5));
    assert_eq!(cert.status, "active");
    assert!(cert.notifications_sent.is_empty());

    // Grade written back on the result.
    let result = repo.quiz_result(outcome.quiz_result.id).unwrap();
    assert_eq!(result.percentage, Some(90.0));
    assert_eq!(result.is_passing, Some(true));

    // Learner congratulations plus operations notice.
    let sent = mail.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].to, "gia@example.test");
    assert!(sent[0].subject.contains("Congratulations"));
    assert_eq!(sent[1].to, OPS_EMAIL);
    assert!(sent[1].subject.contains("New certificate issued"));
}

#[tokio::test]
async fn test_exactly_ninety_percent_passes_and_just_below_does_not() {
    let (repo, mail) = fixtures();
    let user = repo.seed_user("hal@example.test", "hal", None);
    let course_a = repo.seed_course("Course A");
    let course_b = repo.seed_course("Course B");
    let today = date(2026, 3, 5);

    let engine = IssuerEngine::new(repo.clone(), mail.clone(), branding());

    let at_ninety = engine
        .process_quiz_result(final_quiz(user.id, course_a.id, 9, 10), today)
        .await
        .unwrap();
    assert!(at_ninety.certificate.is_some());

    let just_below = engine
        .process_quiz_result(final_quiz(user.id, course_b.id, 89_999, 100_000), today)
        .await
        .unwrap();
    assert!(just_below.certificate.is_none());
    assert_eq!(just_below.quiz_result.is_passing, Some(false));
}

#[tokio::test]
async fn test_perfect_unit_quiz_never_mints() {
    let (repo, mail) = fixtures();
    let user = repo.seed_user("ida@example.test", "ida", None);
    let course = repo.seed_course("Course A");

    let engine = IssuerEngine::new(repo.clone(), mail.clone(), branding());
    let outcome = engine
        .process_quiz_result(
            QuizResultCreated {
                user_id: user.id,
                course_id: course.id,
                score: 10,
                total_questions: 10,
                quiz_type: "unit".to_string(),
            },
            date(2026, 3, 5),
        )
        .await
        .unwrap();

    assert!(outcome.certificate.is_none());
    assert_eq!(outcome.quiz_result.is_passing, Some(true));
    assert_eq!(repo.certificate_count(), 0);
    assert_eq!(mail.sent_count(), 0);
}

#[tokio::test]
async fn test_retake_with_live_certificate_does_not_mint_again() {
    let (repo, mail) = fixtures();
    let user = repo.seed_user("joy@example.test", "joy", None);
    let course = repo.seed_course("Course A");
    repo.seed_certificate(
        user.id,
        course.id,
        date(2025, 9, 1),
        date(2026, 9, 1),
        "active",
        &[],
    );

    let engine = IssuerEngine::new(repo.clone(), mail.clone(), branding());
    let outcome = engine
        .process_quiz_result(final_quiz(user.id, course.id, 10, 10), date(2026, 3, 5))
        .await
        .unwrap();

    assert!(outcome.certificate.is_none());
    assert_eq!(repo.certificate_count(), 1);
}

#[tokio::test]
async fn test_expired_certificate_does_not_block_reissue() {
    let (repo, mail) = fixtures();
    let user = repo.seed_user("kim@example.test", "kim", None);
    let course = repo.seed_course("Course A");
    repo.seed_certificate(
        user.id,
        course.id,
        date(2024, 9, 1),
        date(2025, 9, 1),
        "expired",
        &["30-day", "7-day", "1-day", "expired"],
    );

    let engine = IssuerEngine::new(repo.clone(), mail.clone(), branding());
    let outcome = engine
        .process_quiz_result(final_quiz(user.id, course.id, 10, 10), date(2026, 3, 5))
        .await
        .unwrap();

    assert!(outcome.certificate.is_some());
    assert_eq!(repo.certificate_count(), 2);
}

#[tokio::test]
async fn test_zero_total_questions_is_rejected() {
    let (repo, mail) = fixtures();
    let user = repo.seed_user("lou@example.test", "lou", None);
    let course = repo.seed_course("Course A");

    let engine = IssuerEngine::new(repo.clone(), mail.clone(), branding());
    let err = engine
        .process_quiz_result(final_quiz(user.id, course.id, 0, 0), date(2026, 3, 5))
        .await
        .expect_err("zero questions");

    assert_eq!(err.error_code(), "VALIDATION_ERROR");
    assert_eq!(repo.certificate_count(), 0);
}

#[tokio::test]
async fn test_unknown_user_or_course_is_not_found() {
    let (repo, mail) = fixtures();
    let user = repo.seed_user("mia@example.test", "mia", None);

    let engine = IssuerEngine::new(repo.clone(), mail.clone(), branding());

    let err = engine
        .process_quiz_result(final_quiz(999, 1, 9, 10), date(2026, 3, 5))
        .await
        .expect_err("unknown user");
    assert_eq!(err.error_code(), "USER_NOT_FOUND");

    let err = engine
        .process_quiz_result(final_quiz(user.id, 999, 9, 10), date(2026, 3, 5))
        .await
        .expect_err("unknown course");
    assert_eq!(err.error_code(), "COURSE_NOT_FOUND");
}

#[tokio::test]
async fn test_email_failure_never_rolls_back_the_certificate() {
    let (repo, mail) = fixtures();
    let user = repo.seed_user("nat@example.test", "nat", None);
    let course = repo.seed_course("Course A");
    mail.set_failing(true);

    let engine = IssuerEngine::new(repo.clone(), mail.clone(), branding());
    let outcome = engine
        .process_quiz_result(final_quiz(user.id, course.id, 10, 10), date(2026, 3, 5))
        .await
        .unwrap();

    assert!(outcome.certificate.is_some());
    assert_eq!(repo.certificate_count(), 1);
    assert_eq!(mail.sent_count(), 0);
}
