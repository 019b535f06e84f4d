/// HTTP adapter: axum router, admin login and bearer-token middleware.
///
/// Handlers only translate requests into calls on the panel modules held by
/// [`PanelRegistry`](crate::common::registry::PanelRegistry); every failure is
/// rendered as `{"error": "<message>"}` with the status from
/// [`PanelError::status_code`](crate::common::error::PanelError::status_code).
///
/// # Examples
///
/// ```no_run
/// use vpsctl::common::config::PanelConfig;
/// use vpsctl::common::context::PanelContext;
/// use vpsctl::common::registry::PanelRegistry;
/// use vpsctl::common::security::audit_logger;
/// use vpsctl::server::{auth::AuthService, AppState};
///
/// # async fn run() -> vpsctl::common::error::PanelResult<()> {
/// let config = PanelConfig::default();
/// let auth = AuthService::from_config(&config.auth)?;
/// let registry = PanelRegistry::new(PanelContext::elevated(config, audit_logger()));
/// let shutdown = tokio_util::sync::CancellationToken::new();
/// vpsctl::server::serve(AppState::new(registry, auth), shutdown).await?;
/// # Ok(())
/// # }
/// ```
pub mod auth;
pub mod error;
pub mod routes;
pub mod state;

pub use routes::router;
pub use state::AppState;

use crate::common::error::PanelResult;
use tokio_util::sync::CancellationToken;

/// Bind the configured address and serve until `shutdown` is cancelled
pub async fn serve(state: AppState, shutdown: CancellationToken) -> PanelResult<()> {
    let server = &state.registry.context().config.server;
    let addr = format!("{}:{}", server.host, server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "panel API listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    tracing::info!("panel API stopped");
    Ok(())
}
