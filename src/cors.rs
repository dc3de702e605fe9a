use crate::settings::{CorsSettings, SettingsError};
use axum::http::request::Parts;
use axum::http::{HeaderName, HeaderValue, Method};
use regex::Regex;
use std::collections::HashSet;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::debug;

/// Request headers a cross-origin client may send, mirrored in the
/// preflight response.
pub const ALLOWED_REQUEST_HEADERS: &[&str] = &[
    "accept",
    "accept-encoding",
    "authorization",
    "content-type",
    "dnt",
    "origin",
    "user-agent",
    "x-csrftoken",
    "x-requested-with",
];

/// Compiled origin allow-list: exact origins plus regex patterns for
/// wildcard deployments. Patterns carry their own anchors, e.g.
/// `^https://.*\.vercel\.app$`.
#[derive(Debug, Clone)]
pub struct OriginPolicy {
    exact: HashSet<String>,
    patterns: Vec<Regex>,
}

impl OriginPolicy {
    pub fn new(settings: &CorsSettings) -> Result<Self, SettingsError> {
        let exact = settings.allowed_origins.iter().cloned().collect();
        let patterns = settings
            .allowed_origin_regexes
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|source| SettingsError::InvalidOriginRegex {
                    pattern: pattern.clone(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { exact, patterns })
    }

    /// Exact match first, regex fallback second.
    pub fn allows(&self, origin: &str) -> bool {
        if self.exact.contains(origin) {
            return true;
        }
        self.patterns.iter().any(|pattern| pattern.is_match(origin))
    }
}

/// CORS layer driven by the origin policy. Allowed origins are mirrored
/// back with credentials enabled; everything else gets no CORS headers and
/// the browser blocks the response.
pub fn cors_layer(policy: OriginPolicy) -> CorsLayer {
    let policy = Arc::new(policy);

    let allow_origin = AllowOrigin::predicate(move |origin: &HeaderValue, _parts: &Parts| {
        let allowed = origin.to_str().map(|o| policy.allows(o)).unwrap_or(false);
        if !allowed {
            debug!(origin = ?origin, "Rejecting CORS origin");
        }
        allowed
    });

    let allow_headers: Vec<HeaderName> = ALLOWED_REQUEST_HEADERS
        .iter()
        .map(|header| HeaderName::from_static(header))
        .collect();

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(allow_headers)
        .allow_credentials(true)
}
