/// Name of the session cookie issued by the delegated auth handlers.
pub const SESSION_COOKIE_NAME: &str = "sessionid";

/// Name of the CSRF token cookie. Deliberately readable from JavaScript so
/// the frontend can echo it back in the `x-csrftoken` header.
pub const CSRF_COOKIE_NAME: &str = "csrftoken";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl SameSite {
    pub fn as_str(self) -> &'static str {
        match self {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
            SameSite::None => "None",
        }
    }

    /// Parse a configured SameSite mode, case-insensitively.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "strict" => Some(SameSite::Strict),
            "lax" => Some(SameSite::Lax),
            "none" => Some(SameSite::None),
            _ => Option::None,
        }
    }
}

/// Shared attributes for the session and CSRF cookies. Two ambient states
/// exist, selected by the debug flag in `Settings::cookie_policy`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CookiePolicy {
    pub same_site: SameSite,
    pub secure: bool,
}

impl CookiePolicy {
    /// Development policy: works over plain HTTP on localhost.
    pub fn relaxed() -> Self {
        Self {
            same_site: SameSite::Lax,
            secure: false,
        }
    }

    /// Production policy: cross-site cookies over HTTPS.
    pub fn strict() -> Self {
        Self {
            same_site: SameSite::None,
            secure: true,
        }
    }

    /// Browsers drop `SameSite=None` cookies that are not also `Secure`.
    pub fn is_consistent(self) -> bool {
        self.same_site != SameSite::None || self.secure
    }
}

/// Build the `Set-Cookie` value for the session cookie (HttpOnly).
pub fn session_cookie(value: &str, policy: &CookiePolicy) -> String {
    build(SESSION_COOKIE_NAME, value, policy, true)
}

/// Build the `Set-Cookie` value for the CSRF token cookie.
pub fn csrf_cookie(value: &str, policy: &CookiePolicy) -> String {
    build(CSRF_COOKIE_NAME, value, policy, false)
}

fn build(name: &str, value: &str, policy: &CookiePolicy, http_only: bool) -> String {
    let mut cookie = format!("{name}={value}; Path=/; SameSite={}", policy.same_site.as_str());
    if policy.secure {
        cookie.push_str("; Secure");
    }
    if http_only {
        cookie.push_str("; HttpOnly");
    }
    cookie
}

/// Extract a cookie value from a `Cookie` request header.
pub fn cookie_value<'a>(cookie_header: &'a str, name: &str) -> Option<&'a str> {
    cookie_header.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        (key == name).then_some(value)
    })
}
