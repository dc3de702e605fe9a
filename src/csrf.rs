use crate::cookies::{self, CSRF_COOKIE_NAME};
use crate::server::AppState;
use axum::extract::{Request, State};
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Json, Response};
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::sync::Arc;
use tracing::warn;

/// Header the frontend uses to echo the CSRF cookie back.
pub const CSRF_HEADER: &str = "x-csrftoken";

const TOKEN_LENGTH: usize = 64;

/// CSRF guard for state-changing requests.
///
/// Safe methods pass through and pick up a `csrftoken` cookie when the
/// client has none yet. Unsafe methods must present a trusted `Origin`
/// (or `Referer`) and a matching cookie/header token pair, otherwise the
/// request is rejected with 403 before it reaches any handler.
pub async fn guard(State(state): State<Arc<AppState>>, request: Request, next: Next) -> Response {
    if is_safe_method(request.method()) {
        let needs_token = request_cookie(&request, CSRF_COOKIE_NAME).is_none();
        let mut response = next.run(request).await;
        if needs_token {
            issue_token(&mut response, &state);
        }
        return response;
    }

    if let Err(reason) = verify(&request, &state) {
        warn!(
            method = %request.method(),
            path = %request.uri().path(),
            reason,
            "CSRF verification failed"
        );
        return reject(reason);
    }

    next.run(request).await
}

fn verify(request: &Request, state: &AppState) -> Result<(), &'static str> {
    // Browser requests carry an Origin header on state-changing methods;
    // older ones may only send Referer. Whichever is present must be in
    // the trusted list. Requests with neither (non-browser clients) fall
    // through to the token check alone.
    let origin = request
        .headers()
        .get(header::ORIGIN)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
        .or_else(|| {
            request
                .headers()
                .get(header::REFERER)
                .and_then(|value| value.to_str().ok())
                .and_then(origin_of)
        });

    if let Some(origin) = origin {
        if !state.settings.csrf_trusted_origins.contains(&origin) {
            return Err("origin not trusted");
        }
    }

    let cookie_token = request_cookie(request, CSRF_COOKIE_NAME).ok_or("CSRF cookie missing")?;
    let header_token = request
        .headers()
        .get(CSRF_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or("CSRF token header missing")?;

    if cookie_token != header_token {
        return Err("CSRF token mismatch");
    }

    Ok(())
}

fn is_safe_method(method: &Method) -> bool {
    matches!(
        *method,
        Method::GET | Method::HEAD | Method::OPTIONS | Method::TRACE
    )
}

fn request_cookie<'a>(request: &'a Request, name: &str) -> Option<&'a str> {
    let header = request.headers().get(header::COOKIE)?.to_str().ok()?;
    cookies::cookie_value(header, name)
}

fn issue_token(response: &mut Response, state: &AppState) {
    let cookie = cookies::csrf_cookie(&new_token(), &state.settings.cookie_policy());
    if let Ok(value) = HeaderValue::from_str(&cookie) {
        response.headers_mut().append(header::SET_COOKIE, value);
    }
}

fn new_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

fn reject(reason: &str) -> Response {
    (
        StatusCode::FORBIDDEN,
        Json(serde_json::json!({
            "detail": format!("CSRF verification failed: {reason}")
        })),
    )
        .into_response()
}

/// Reduce a URL to its origin (`scheme://host[:port]`).
fn origin_of(url: &str) -> Option<String> {
    let scheme_end = url.find("://")?;
    let rest = &url[scheme_end + 3..];
    let host_end = rest.find('/').unwrap_or(rest.len());
    if rest[..host_end].is_empty() {
        return None;
    }
    Some(format!("{}{}", &url[..scheme_end + 3], &rest[..host_end]))
}
