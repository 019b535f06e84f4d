use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{self, EnvFilter};
use vpsctl::common::config::PanelConfig;
use vpsctl::common::context::PanelContext;
use vpsctl::common::registry::PanelRegistry;
use vpsctl::common::security::audit_logger;
use vpsctl::server::auth::AuthService;
use vpsctl::server::AppState;

/// VPS control panel API.
/// Configure with VPSCTL_CONFIG (TOML) and the PORT / JWT_SECRET / ADMIN_* environment.
#[tokio::main]
async fn main() -> Result<()> {
    // Initialize the tracing subscriber with stderr logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    tracing::info!("Starting vpsctl");

    let config = PanelConfig::load().context("loading configuration")?;
    if config.auth.admin_password == "changeme" {
        tracing::warn!("ADMIN_PASSWORD is the default; set a real password");
    }
    let auth = AuthService::from_config(&config.auth).context("preparing admin credentials")?;
    let registry = PanelRegistry::new(PanelContext::elevated(config, audit_logger()));
    tracing::info!(modules = ?registry.module_names(), "panel modules ready");

    let shutdown = CancellationToken::new();
    tokio::spawn(watch_signals(shutdown.clone()));

    vpsctl::server::serve(AppState::new(registry, auth), shutdown)
        .await
        .context("serving panel API")?;
    Ok(())
}

/// Cancel `shutdown` on SIGINT or SIGTERM
async fn watch_signals(shutdown: CancellationToken) {
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = terminate => {}
    }
    tracing::info!("shutdown requested");
    shutdown.cancel();
}
