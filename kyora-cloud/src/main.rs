//! kyora-cloud: multi-tenant retail back office
//!
//! Long-running service that:
//! - Serves the JSON API (JWT authenticated, scoped per business)
//! - Runs the recurring expense processor on a fixed interval

mod api;
mod auth;
mod config;
mod db;
mod error;
mod services;
mod state;
mod util;

use std::net::SocketAddr;
use std::time::Duration;

use config::Config;
use state::AppState;

pub(crate) type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    // Load .env file
    let _ = dotenvy::dotenv();

    let config = Config::from_env()?;
    init_tracing(&config);

    tracing::info!("Starting kyora-cloud (env: {})", config.environment);

    let state = AppState::new(&config).await?;
    let app = api::create_router(state.clone()).layer(api::cors_layer(&config));

    // Periodic rate limiter cleanup (every 5 minutes)
    let rate_limiter = state.rate_limiter.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(300));
        loop {
            interval.tick().await;
            rate_limiter.cleanup().await;
        }
    });

    if config.recurring_job_enabled {
        spawn_recurring_job(state.clone(), config.recurring_job_interval_secs);
    } else {
        tracing::info!("Recurring expense job disabled in this instance");
    }

    let http_addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&http_addr).await?;
    tracing::info!("kyora-cloud HTTP listening on {http_addr}");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

fn init_tracing(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "kyora_cloud=info,tower_http=info".into());

    if config.log_format == "json" {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

/// Materialise due recurring expenses now and then every `interval_secs`.
fn spawn_recurring_job(state: AppState, interval_secs: u64) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            let today = shared::util::today_utc();
            match services::recurring::process_due(&state.pool, today).await {
                Ok(report) => tracing::info!(
                    %today,
                    processed = report.processed,
                    created = report.created,
                    ended = report.ended,
                    "Recurring expense run finished"
                ),
                Err(e) => {
                    let err: shared::error::AppError = e.into();
                    tracing::error!(%today, code = %err.code, "Recurring expense run failed: {}", err.message);
                }
            }
        }
    });
}
