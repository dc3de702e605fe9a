use crate::db;
use crate::routes::{self, RouteDelegates};
use crate::settings::Settings;
use anyhow::Result;
use sqlx::AnyPool;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Application state shared with every handler and middleware layer.
/// Settings are immutable after startup; the pool is internally shared.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub db: AnyPool,
}

/// Start the web server with the given delegated handler groups.
pub async fn start_server(settings: Settings, delegates: RouteDelegates) -> Result<()> {
    let addr = format!("{}:{}", settings.host, settings.port);

    let db = db::connect(&settings.database)?;
    let settings = Arc::new(settings);

    debug!(debug_mode = settings.debug, "Creating application state");
    let state = Arc::new(AppState {
        settings: settings.clone(),
        db,
    });

    debug!("Setting up routes");
    let app = routes::router(state, delegates)?;

    info!("Routes configured:");
    if settings.serve_api_root {
        info!("  GET  /          - API descriptor");
    }
    info!("  *    /admin/... - Administrative interface (delegated)");
    info!("  *    /...       - App handler groups: auth, menu, cart, orders (delegated)");

    debug!(address = %addr, "Binding TCP listener");
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => {
            let local_addr = listener.local_addr()?;
            info!("🚀 ClickToEat backend listening on http://{}", local_addr);
            info!(
                debug_mode = settings.debug,
                "Cookie policy: {:?}",
                settings.cookie_policy()
            );
            listener
        }
        Err(e) => {
            error!(address = %addr, error = %e, "Failed to bind to address");
            return Err(e.into());
        }
    };

    match axum::serve(listener, app).await {
        Ok(()) => {
            info!("Server stopped");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Server error");
            Err(e.into())
        }
    }
}
