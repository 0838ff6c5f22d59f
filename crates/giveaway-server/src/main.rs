mod config;
mod telegram;

use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use giveaway_api::AppStateInner;
use giveaway_crypto::TokenCodec;
use giveaway_db::Database;
use giveaway_engine::scheduler;
use giveaway_engine::{Engine, EngineSettings};

use crate::config::Config;
use crate::telegram::TelegramClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "giveaway=debug,giveaway_engine=debug,tower_http=debug".into()),
        )
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("FATAL: {:#}", e);
            std::process::exit(1);
        }
    };

    let db = Arc::new(Database::open(&config.db_path)?);
    let codec = TokenCodec::new(config.hmac_secret.as_bytes(), config.token_max_age_secs)?;
    let platform = Arc::new(TelegramClient::new(
        &config.platform_base_url,
        &config.bot_token,
        config.platform_timeout,
        config.mandatory_channels.clone(),
    )?);

    let engine = Engine::new(
        db,
        codec,
        platform,
        EngineSettings {
            mandatory_channels: config.mandatory_channels.clone(),
            debounce_window: config.debounce_window,
            query_timeout: config.platform_timeout,
        },
    );

    tokio::spawn(scheduler::run_membership_recheck_loop(
        engine.clone(),
        config.membership_check_every,
    ));
    tokio::spawn(scheduler::run_auto_draw_loop(engine.clone(), config.auto_draw_every));
    info!(
        "Schedulers started: membership re-check every {:?}, auto-draw scan every {:?}",
        config.membership_check_every, config.auto_draw_every
    );
    info!("{} mandatory channel(s) configured", config.mandatory_channels.len());

    let app = giveaway_api::router(Arc::new(AppStateInner {
        engine,
        admin_token: config.admin_token.clone(),
    }))
    .layer(CorsLayer::permissive())
    .layer(TraceLayer::new_for_http());

    info!("Giveaway server listening on {}", config.addr);
    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
