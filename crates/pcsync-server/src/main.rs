mod api;
mod middleware;
mod scheduler;

use std::sync::Arc;

use pcsync_sync::{build_shopify_client, build_source_client, Mailer};
use tracing_subscriber::EnvFilter;

use crate::{
    api::{build_app, default_rate_limit_state, AppState},
    scheduler::JobContext,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Arc::new(pcsync_core::load_app_config()?);
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let source = Arc::new(build_source_client(&config)?);
    let shopify = Arc::new(build_shopify_client(&config)?);
    let mailer = config.mail.as_ref().map(Mailer::new).transpose()?.map(Arc::new);

    if config.admin.is_none() {
        tracing::warn!(
            "ADMIN_USERNAME/ADMIN_PASSWORD not set; /api/login will reject every attempt"
        );
    }

    let _scheduler = scheduler::build_scheduler(JobContext {
        config: Arc::clone(&config),
        source: Arc::clone(&source),
        shopify: Arc::clone(&shopify),
        mailer,
    })
    .await?;

    let app = build_app(
        AppState {
            config: Arc::clone(&config),
            source,
            shopify,
        },
        default_rate_limit_state(),
    );

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, env = %config.env, "pcsync-server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
