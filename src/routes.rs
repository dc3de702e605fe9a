use crate::cors::{self, OriginPolicy};
use crate::csrf;
use crate::server::AppState;
use crate::settings::SettingsError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::routing::get;
use axum::{middleware, Router};
use serde_json::Value;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// The external handler groups this gateway dispatches to: the app router
/// (auth, menu, cart, orders) and the administrative interface. Both are
/// owned by the embedding application; the defaults are empty routers that
/// answer 404 JSON.
pub struct RouteDelegates {
    pub app: Router<Arc<AppState>>,
    pub admin: Router<Arc<AppState>>,
}

impl Default for RouteDelegates {
    fn default() -> Self {
        Self {
            app: Router::new().fallback(not_found),
            admin: Router::new().fallback(not_found),
        }
    }
}

/// Build the root dispatcher. Matching is ordered, first match wins:
/// the optional API descriptor at `/`, then `/admin/...`, then everything
/// else goes to the delegated app router.
pub fn router(state: Arc<AppState>, delegates: RouteDelegates) -> Result<Router, SettingsError> {
    let policy = OriginPolicy::new(&state.settings.cors)?;

    let mut router = Router::new();
    if state.settings.serve_api_root {
        router = router.route("/", get(api_root));
    }

    let router = router
        .nest("/admin", delegates.admin)
        .merge(delegates.app)
        .layer(middleware::from_fn_with_state(state.clone(), csrf::guard))
        .layer(cors::cors_layer(policy))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    Ok(router)
}

/// Informational descriptor of the API groups. Fixed document, carries no
/// state; used for service discovery and health checks.
async fn api_root() -> Json<Value> {
    Json(serde_json::json!({
        "message": "ClickToEat API",
        "version": "1.0",
        "endpoints": {
            "auth": "/api/auth/",
            "menu": "/api/menu/",
            "cart": "/api/cart/",
            "orders": "/api/orders/",
            "admin": "/admin/"
        }
    }))
}

async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({"detail": "Not found"})),
    )
}
