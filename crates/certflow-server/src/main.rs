// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Certflow server binary: HTTP API plus the in-process batch schedule.

use std::sync::Arc;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::EnvFilter;

use certflow_core::config::Config;
use certflow_core::lifecycle::LifecycleEngine;
use certflow_core::notify::HttpEmailGateway;
use certflow_core::payment::RestPaymentGateway;
use certflow_core::persistence::postgres::MIGRATOR;
use certflow_core::persistence::PostgresRepository;
use certflow_core::reminder::ReminderEngine;
use certflow_core::schedule::{Job, ScheduleEntry, Scheduler};
use certflow_core::templates::Branding;

use certflow_server::{create_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env().context("loading configuration")?;

    // 1. Database: connect, verify, migrate.
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .context("connecting to PostgreSQL")?;
    sqlx::query("SELECT 1")
        .execute(&pool)
        .await
        .context("verifying database connectivity")?;
    MIGRATOR.run(&pool).await.context("running migrations")?;
    info!("database connected and migrated");

    // 2. Wire the store, gateways and engines.
    let repo = Arc::new(PostgresRepository::new(pool));
    let mail = Arc::new(HttpEmailGateway::new(
        config.email_api_url.clone(),
        config.email_api_token.clone(),
    ));
    let payments = Arc::new(RestPaymentGateway::new(
        config.payment_api_url.clone(),
        config.payment_secret_key.clone(),
    ));
    let branding = Branding {
        client_url: config.client_url.clone(),
        ops_email: config.ops_email.clone(),
    };

    let state = AppState::new(
        repo.clone(),
        mail.clone(),
        payments,
        branding.clone(),
        config.payment_webhook_secret.clone(),
        config.cron_secret.clone(),
    );

    // 3. Start the batch schedule.
    let lifecycle = Arc::new(LifecycleEngine::new(
        repo.clone(),
        mail.clone(),
        branding.clone(),
    ));
    let reminder = Arc::new(ReminderEngine::new(repo, mail, branding));
    let scheduler = Scheduler::new(
        lifecycle,
        reminder,
        vec![
            ScheduleEntry {
                cron: config.cert_check_cron.clone(),
                job: Job::CertificateCheck,
            },
            ScheduleEntry {
                cron: config.reminder_cron.clone(),
                job: Job::ReminderCheck,
            },
        ],
    )
    .context("building schedule")?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scheduler_handle = tokio::spawn(scheduler.run(shutdown_rx));

    // 4. Serve the API.
    let app = create_router(state);
    let listener = TcpListener::bind(("0.0.0.0", config.http_port))
        .await
        .with_context(|| format!("binding port {}", config.http_port))?;
    info!(port = config.http_port, "certflow server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving HTTP")?;

    info!("shutting down");
    let _ = shutdown_tx.send(true);
    let _ = scheduler_handle.await;

    Ok(())
}

/// Resolve on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("received Ctrl+C, shutting down gracefully");
        }
        _ = terminate => {
            info!("received terminate signal, shutting down gracefully");
        }
    }
}
