// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Shared fixtures for the engine integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use certflow_core::notify::RecordingGateway;
use certflow_core::persistence::MemoryRepository;
use certflow_core::templates::Branding;
use chrono::{NaiveDate, TimeZone, Utc};

pub const OPS_EMAIL: &str = "ops@certflow.test";

/// Branding used across the engine tests.
pub fn branding() -> Branding {
    Branding {
        client_url: "https://learn.certflow.test".to_string(),
        ops_email: OPS_EMAIL.to_string(),
    }
}

/// Calendar date shorthand.
pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

/// Midnight UTC timestamp shorthand, for order creation times.
pub fn datetime(y: i32, m: u32, d: u32) -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).single().expect("valid datetime")
}

/// A fresh in-memory store and recording mailer.
pub fn fixtures() -> (Arc<MemoryRepository>, Arc<RecordingGateway>) {
    (
        Arc::new(MemoryRepository::new()),
        Arc::new(RecordingGateway::new()),
    )
}
