// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Email template rendering.
//!
//! Pure functions from notification type + data to subject and HTML markup.
//! Branding (site URL, operations address) comes from configuration so the
//! templates stay free of hard-coded deployment details.

use chrono::NaiveDate;

use crate::model::{LineItem, NotificationTier};

/// Branding details threaded into every rendered email.
#[derive(Debug, Clone)]
pub struct Branding {
    /// Learner-facing site base URL.
    pub client_url: String,
    /// Operations address receiving internal notifications.
    pub ops_email: String,
}

/// Common wrapper: bordered card with a call-to-action button and footer.
fn wrap_email(branding: &Branding, content: &str, cta_url: &str, cta_text: &str, cta_color: &str) -> String {
    format!(
        r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto; padding: 20px; border: 1px solid #ddd; border-radius: 8px; background-color: #f9f9f9;">
  {content}
  <div style="text-align: center; margin: 30px 0;">
    <a href="{cta_url}" style="display: inline-block; padding: 15px 30px; background-color: {cta_color}; color: white; text-decoration: none; border-radius: 5px; font-weight: bold;">{cta_text}</a>
  </div>
  <p style="font-size: 14px; color: #555;">Questions? Contact us at <a href="mailto:{ops}">{ops}</a>.</p>
  <p style="font-size: 14px; color: #555;">Best regards,<br />The Training Team</p>
</div>"#,
        content = content,
        cta_url = cta_url,
        cta_text = cta_text,
        cta_color = cta_color,
        ops = branding.ops_email,
    )
}

/// Subject line for an expiry-tier notification.
pub fn expiry_subject(tier: NotificationTier, course_title: &str) -> String {
    match tier {
        NotificationTier::ThirtyDay => {
            format!("30-day reminder: Renew your {} certificate", course_title)
        }
        NotificationTier::SevenDay => {
            format!("Urgent: Your {} certificate expires in 7 days", course_title)
        }
        NotificationTier::OneDay => {
            format!("Final notice: Your {} certificate expires tomorrow", course_title)
        }
        NotificationTier::Expired => {
            format!("Your {} certificate has expired", course_title)
        }
    }
}

/// Body for an expiry-tier notification.
pub fn expiry_body(
    branding: &Branding,
    tier: NotificationTier,
    user_name: &str,
    course_title: &str,
    course_id: i64,
    expiry_date: NaiveDate,
) -> String {
    let renewal_url = format!("{}/renewal?course={}", branding.client_url, course_id);

    let (content, cta_text, cta_color) = match tier {
        NotificationTier::ThirtyDay => (
            format!(
                r#"<p style="font-size: 14px; color: #555;">Hi {user_name},</p>
<p style="font-size: 14px; color: #555;">Just a quick reminder: your <strong>{course_title}</strong> certificate will expire on <strong>{expiry_date}</strong>.</p>
<p style="font-size: 14px; color: #555;">Renewing early keeps you compliant and keeps your training record continuous for audits and documentation.</p>"#
            ),
            "Renew now",
            "#FF774B",
        ),
        NotificationTier::SevenDay => (
            format!(
                r#"<p style="font-size: 14px; color: #555;">Hi {user_name},</p>
<p style="font-size: 14px; color: #555;">Your <strong>{course_title}</strong> certificate expires on <strong>{expiry_date}</strong>, just <strong>7 days away</strong>.</p>
<p style="font-size: 14px; color: #555;">Once expired, you lose access to your course materials and will need to re-enroll to keep your certification.</p>
<p style="font-size: 14px; color: #d32f2f; font-weight: bold;">Renew today and keep your certification active.</p>"#
            ),
            "Renew now — 7 days left",
            "#FF5722",
        ),
        NotificationTier::OneDay => (
            format!(
                r#"<p style="font-size: 14px; color: #555;">Hi {user_name},</p>
<p style="font-size: 16px; color: #d32f2f; font-weight: bold;">Your <strong>{course_title}</strong> certificate expires tomorrow ({expiry_date}).</p>
<p style="font-size: 14px; color: #555;">This is your last chance to renew before losing access. It only takes a few minutes.</p>"#
            ),
            "Renew now — expires tomorrow",
            "#d32f2f",
        ),
        NotificationTier::Expired => (
            format!(
                r#"<p style="font-size: 14px; color: #555;">Hi {user_name},</p>
<p style="font-size: 14px; color: #555;">Your <strong>{course_title}</strong> certificate expired on <strong>{expiry_date}</strong>.</p>
<p style="font-size: 14px; color: #555;">Your course access has been removed and your certification is no longer active. Re-enroll to complete the training and receive a new certificate valid for another year. Your training history is kept on file, so re-enrolling is quick.</p>"#
            ),
            "Re-enroll now",
            "#d32f2f",
        ),
    };

    wrap_email(branding, &content, &renewal_url, cta_text, cta_color)
}

/// Congratulations email sent to a learner when a certificate is minted.
pub fn congratulations(
    branding: &Branding,
    user_name: &str,
    course_title: &str,
    score: i32,
    total_questions: i32,
    percentage: f64,
    issued_date: NaiveDate,
    expiry_date: NaiveDate,
) -> (String, String) {
    let subject = format!(
        "Congratulations! You've earned your {} certificate",
        course_title
    );
    let certificates_url = format!("{}/account/certificates", branding.client_url);
    let content = format!(
        r#"<h2 style="color: #4CAF50; text-align: center;">Congratulations!</h2>
<p style="font-size: 14px; color: #555;">Hi {user_name},</p>
<p style="font-size: 14px; color: #555;">You've successfully completed <strong>{course_title}</strong> with a score of <strong>{pct:.0}%</strong>!</p>
<table style="width: 100%; border-collapse: collapse; margin: 20px 0;">
  <tr><td style="padding: 10px; border: 1px solid #ddd; background-color: #f2f2f2;"><strong>Course</strong></td><td style="padding: 10px; border: 1px solid #ddd;">{course_title}</td></tr>
  <tr><td style="padding: 10px; border: 1px solid #ddd; background-color: #f2f2f2;"><strong>Score</strong></td><td style="padding: 10px; border: 1px solid #ddd;">{score}/{total} ({pct:.0}%)</td></tr>
  <tr><td style="padding: 10px; border: 1px solid #ddd; background-color: #f2f2f2;"><strong>Issued</strong></td><td style="padding: 10px; border: 1px solid #ddd;">{issued}</td></tr>
  <tr><td style="padding: 10px; border: 1px solid #ddd; background-color: #f2f2f2;"><strong>Valid until</strong></td><td style="padding: 10px; border: 1px solid #ddd;">{expiry}</td></tr>
</table>"#,
        user_name = user_name,
        course_title = course_title,
        pct = percentage,
        score = score,
        total = total_questions,
        issued = issued_date,
        expiry = expiry_date,
    );
    let html = wrap_email(
        branding,
        &content,
        &certificates_url,
        "View your certificate",
        "#4CAF50",
    );
    (subject, html)
}

/// Operations notice for a newly issued certificate.
pub fn ops_certificate_issued(
    username: &str,
    email: &str,
    course_title: &str,
    score: i32,
    total_questions: i32,
    issued_date: NaiveDate,
    expiry_date: NaiveDate,
) -> (String, String) {
    let subject = format!("New certificate issued: {} - {}", username, course_title);
    let html = format!(
        r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
  <h2 style="color: #333;">New Certificate Issued</h2>
  <table style="width: 100%; border-collapse: collapse; margin-top: 10px;">
    <tr><td style="padding: 10px; border: 1px solid #ddd; background-color: #f2f2f2;"><strong>User</strong></td><td style="padding: 10px; border: 1px solid #ddd;">{username}</td></tr>
    <tr><td style="padding: 10px; border: 1px solid #ddd; background-color: #f2f2f2;"><strong>Email</strong></td><td style="padding: 10px; border: 1px solid #ddd;">{email}</td></tr>
    <tr><td style="padding: 10px; border: 1px solid #ddd; background-color: #f2f2f2;"><strong>Course</strong></td><td style="padding: 10px; border: 1px solid #ddd;">{course_title}</td></tr>
    <tr><td style="padding: 10px; border: 1px solid #ddd; background-color: #f2f2f2;"><strong>Score</strong></td><td style="padding: 10px; border: 1px solid #ddd;">{score}/{total}</td></tr>
    <tr><td style="padding: 10px; border: 1px solid #ddd; background-color: #f2f2f2;"><strong>Issued</strong></td><td style="padding: 10px; border: 1px solid #ddd;">{issued}</td></tr>
    <tr><td style="padding: 10px; border: 1px solid #ddd; background-color: #f2f2f2;"><strong>Expires</strong></td><td style="padding: 10px; border: 1px solid #ddd;">{expiry}</td></tr>
  </table>
</div>"#,
        username = username,
        email = email,
        course_title = course_title,
        score = score,
        total = total_questions,
        issued = issued_date,
        expiry = expiry_date,
    );
    (subject, html)
}

/// Wording that scales with how long a purchased course has sat untouched.
fn reminder_urgency(days: i32) -> &'static str {
    if days >= 14 {
        "Don't miss out on your certification!"
    } else if days >= 7 {
        "Your certification is waiting for you!"
    } else {
        "Start your training today!"
    }
}

/// "Come finish your course" reminder for a paid order with no quiz progress.
pub fn course_reminder(
    branding: &Branding,
    user_name: &str,
    course_names: &str,
    days: i32,
) -> (String, String) {
    let subject = format!("Complete your training - {}", course_names);
    let learning_url = format!("{}/my-learning", branding.client_url);
    let content = format!(
        r#"<h2 style="color: #FF774B;">Complete Your Training</h2>
<p style="font-size: 14px; color: #555;">Hi {user_name},</p>
<p style="font-size: 14px; color: #555;">You enrolled in <strong>{course_names}</strong> {days} days ago but haven't completed the final quiz yet.</p>
<p style="font-size: 14px; color: #555;">{urgency}</p>"#,
        user_name = user_name,
        course_names = course_names,
        days = days,
        urgency = reminder_urgency(days),
    );
    let html = wrap_email(branding, &content, &learning_url, "Continue learning", "#FF774B");
    (subject, html)
}

/// Itemized order table shared by the payment outcome emails.
fn order_table(products: &[LineItem]) -> String {
    let rows: String = products
        .iter()
        .map(|p| {
            format!(
                r#"<tr><td style="padding: 10px; border: 1px solid #ddd;">{}</td><td style="padding: 10px; border: 1px solid #ddd; text-align: right;">${:.2}</td></tr>"#,
                p.title, p.price
            )
        })
        .collect();
    format!(
        r#"<table style="width: 100%; border-collapse: collapse; margin-top: 10px;">
  <thead><tr><th style="padding: 10px; border: 1px solid #ddd; background-color: #f2f2f2; text-align: left;">Course</th><th style="padding: 10px; border: 1px solid #ddd; background-color: #f2f2f2; text-align: right;">Price</th></tr></thead>
  <tbody>{}</tbody>
</table>"#,
        rows
    )
}

/// Buyer confirmation for a successful payment.
pub fn payment_succeeded(branding: &Branding, products: &[LineItem]) -> (String, String) {
    let subject = "Payment Successful".to_string();
    let content = format!(
        r#"<p style="font-size: 14px; color: #555;">Your payment was successful. You now have access to your courses.</p>
<h3 style="color: #333;">Courses Ordered</h3>
{}"#,
        order_table(products)
    );
    let html = wrap_email(
        branding,
        &content,
        &format!("{}/my-learning", branding.client_url),
        "Start learning",
        "#4CAF50",
    );
    (subject, html)
}

/// Buyer notification for a failed payment.
pub fn payment_failed(branding: &Branding, products: &[LineItem]) -> (String, String) {
    let subject = "Payment Failed".to_string();
    let content = format!(
        r#"<p style="font-size: 14px; color: #555;">Your payment could not be completed. No charge was made.</p>
<h3 style="color: #333;">Courses in this order</h3>
{}"#,
        order_table(products)
    );
    let html = wrap_email(
        branding,
        &content,
        &format!("{}/checkout", branding.client_url),
        "Try again",
        "#d32f2f",
    );
    (subject, html)
}

/// Operations copy of a payment outcome.
pub fn ops_payment_outcome(
    buyer_email: &str,
    succeeded: bool,
    products: &[LineItem],
) -> (String, String) {
    let subject = if succeeded {
        format!("New order from {}", buyer_email)
    } else {
        format!("Failed payment from {}", buyer_email)
    };
    let html = format!(
        r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
  <h2 style="color: #333;">{heading}</h2>
  <p style="font-size: 14px; color: #555;"><strong>Buyer:</strong> {buyer}</p>
  {table}
</div>"#,
        heading = if succeeded { "Payment Received" } else { "Payment Failed" },
        buyer = buyer_email,
        table = order_table(products),
    );
    (subject, html)
}
