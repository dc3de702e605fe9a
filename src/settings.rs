use crate::cookies::{CookiePolicy, SameSite};
use crate::cors::OriginPolicy;
use std::env;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

const DEFAULT_DATABASE_URL: &str = "sqlite://db.sqlite3";
const DEFAULT_CONN_MAX_AGE_SECS: u64 = 600;
const DEFAULT_SECRET_KEY: &str = "insecure-dev-secret-key";
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8000;

const DEFAULT_ALLOWED_ORIGINS: &[&str] = &[
    "https://clicktoeat-pw67.onrender.com",
    "https://clicktoeat-frontend.onrender.com",
    "http://localhost:3000",
];

const DEFAULT_ORIGIN_REGEXES: &[&str] = &[r"^https://.*\.vercel\.app$"];

const DEFAULT_CSRF_TRUSTED_ORIGINS: &[&str] = &[
    "https://clicktoeat-pw67.onrender.com",
    "https://clicktoeat-frontend.onrender.com",
    "http://localhost:3000",
];

/// Errors that make the configuration unusable. All of them are fatal at
/// startup; the process never serves traffic with a broken configuration.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("invalid value {value:?} for {var}")]
    InvalidValue { var: &'static str, value: String },

    #[error("unsupported database URL {url:?} (expected sqlite://, postgres:// or mysql://)")]
    UnsupportedDatabaseUrl { url: String },

    #[error("invalid database URL {url:?}")]
    InvalidDatabaseUrl {
        url: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("invalid origin regex {pattern:?}")]
    InvalidOriginRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("cookie policy is inconsistent: SameSite=None requires Secure")]
    InconsistentCookiePolicy,
}

/// Process-wide configuration, assembled once at startup and shared
/// read-only behind an `Arc` afterwards.
#[derive(Debug, Clone)]
pub struct Settings {
    pub debug: bool,
    pub secret_key: String,
    pub host: String,
    pub port: u16,
    pub database: DatabaseSettings,
    pub cors: CorsSettings,
    pub csrf_trusted_origins: Vec<String>,
    /// Explicit cookie attributes (`COOKIE_SAMESITE`/`COOKIE_SECURE`),
    /// overriding the policy derived from the debug flag. Overrides go
    /// through the same consistency validation.
    pub cookie_policy_override: Option<CookiePolicy>,
    /// Serve the informational API descriptor at `/`. Off by default; the
    /// root path then falls through to the delegated app router.
    pub serve_api_root: bool,
}

#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    pub url: String,
    /// How long a pooled connection may be reused before being recycled.
    pub conn_max_age: Duration,
}

/// Origin allow-list configuration. Exact origins are checked first, the
/// regex patterns are the fallback for wildcard deployments (e.g. vercel
/// preview URLs).
#[derive(Debug, Clone)]
pub struct CorsSettings {
    pub allowed_origins: Vec<String>,
    pub allowed_origin_regexes: Vec<String>,
}

impl Settings {
    /// Load settings from the environment, reading a local `.env` file
    /// first. Fails fast on anything malformed.
    pub fn from_env() -> Result<Self, SettingsError> {
        dotenv::dotenv().ok();

        let debug = env_bool("DEBUG", true)?;

        let settings = Self {
            debug,
            secret_key: env_or("SECRET_KEY", DEFAULT_SECRET_KEY),
            host: env_or("HOST", DEFAULT_HOST),
            port: env_port("PORT", DEFAULT_PORT)?,
            database: DatabaseSettings {
                url: env_or("DATABASE_URL", DEFAULT_DATABASE_URL),
                conn_max_age: Duration::from_secs(DEFAULT_CONN_MAX_AGE_SECS),
            },
            cors: CorsSettings {
                allowed_origins: env_list("CORS_ALLOWED_ORIGINS", DEFAULT_ALLOWED_ORIGINS),
                allowed_origin_regexes: env_list(
                    "CORS_ALLOWED_ORIGIN_REGEXES",
                    DEFAULT_ORIGIN_REGEXES,
                ),
            },
            csrf_trusted_origins: env_list("CSRF_TRUSTED_ORIGINS", DEFAULT_CSRF_TRUSTED_ORIGINS),
            cookie_policy_override: env_cookie_policy(debug)?,
            serve_api_root: env_bool("SERVE_API_ROOT", false)?,
        };

        settings.validate()?;
        Ok(settings)
    }

    /// Cookie attributes for both the session and the CSRF cookie,
    /// selected by the debug flag: relaxed for plain-HTTP development,
    /// strict (cross-site over HTTPS) otherwise. An explicit override
    /// from the environment wins over both.
    pub fn cookie_policy(&self) -> CookiePolicy {
        self.cookie_policy_override.unwrap_or(if self.debug {
            CookiePolicy::relaxed()
        } else {
            CookiePolicy::strict()
        })
    }

    /// Check everything that would otherwise only surface once traffic
    /// arrives: database URL scheme, origin regexes, cookie invariants.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if !database_scheme_supported(&self.database.url) {
            return Err(SettingsError::UnsupportedDatabaseUrl {
                url: self.database.url.clone(),
            });
        }

        // Compiling the policy here means a bad regex aborts startup
        // instead of silently rejecting every cross-origin request.
        OriginPolicy::new(&self.cors)?;

        if !self.cookie_policy().is_consistent() {
            return Err(SettingsError::InconsistentCookiePolicy);
        }

        if !self.debug && self.secret_key == DEFAULT_SECRET_KEY {
            warn!("SECRET_KEY is the insecure default while DEBUG is off");
        }

        Ok(())
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            debug: true,
            secret_key: DEFAULT_SECRET_KEY.to_string(),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            database: DatabaseSettings {
                url: DEFAULT_DATABASE_URL.to_string(),
                conn_max_age: Duration::from_secs(DEFAULT_CONN_MAX_AGE_SECS),
            },
            cors: CorsSettings {
                allowed_origins: to_strings(DEFAULT_ALLOWED_ORIGINS),
                allowed_origin_regexes: to_strings(DEFAULT_ORIGIN_REGEXES),
            },
            csrf_trusted_origins: to_strings(DEFAULT_CSRF_TRUSTED_ORIGINS),
            cookie_policy_override: None,
            serve_api_root: false,
        }
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

fn database_scheme_supported(url: &str) -> bool {
    ["sqlite:", "postgres:", "postgresql:", "mysql:"]
        .iter()
        .any(|scheme| url.starts_with(scheme))
}

fn env_or(var: &str, default: &str) -> String {
    env::var(var).unwrap_or_else(|_| default.to_string())
}

fn env_bool(var: &'static str, default: bool) -> Result<bool, SettingsError> {
    match env::var(var) {
        Err(_) => Ok(default),
        Ok(raw) => parse_bool(var, raw),
    }
}

fn parse_bool(var: &'static str, raw: String) -> Result<bool, SettingsError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(SettingsError::InvalidValue { var, value: raw }),
    }
}

fn env_port(var: &'static str, default: u16) -> Result<u16, SettingsError> {
    match env::var(var) {
        Err(_) => Ok(default),
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| SettingsError::InvalidValue { var, value: raw }),
    }
}

/// Optional cookie attribute override. Absent variables fall back to the
/// policy the debug flag selects, so setting only one of the pair works.
fn env_cookie_policy(debug: bool) -> Result<Option<CookiePolicy>, SettingsError> {
    cookie_policy_parts(
        debug,
        env::var("COOKIE_SAMESITE").ok(),
        env::var("COOKIE_SECURE").ok(),
    )
}

fn cookie_policy_parts(
    debug: bool,
    same_site: Option<String>,
    secure: Option<String>,
) -> Result<Option<CookiePolicy>, SettingsError> {
    if same_site.is_none() && secure.is_none() {
        return Ok(None);
    }

    let mut policy = if debug {
        CookiePolicy::relaxed()
    } else {
        CookiePolicy::strict()
    };

    if let Some(raw) = same_site {
        policy.same_site = SameSite::parse(&raw).ok_or(SettingsError::InvalidValue {
            var: "COOKIE_SAMESITE",
            value: raw,
        })?;
    }
    if let Some(raw) = secure {
        policy.secure = parse_bool("COOKIE_SECURE", raw)?;
    }

    Ok(Some(policy))
}

/// Comma-separated list variable; empty entries are dropped.
fn env_list(var: &str, default: &[&str]) -> Vec<String> {
    match env::var(var) {
        Err(_) => to_strings(default),
        Ok(raw) => raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cookies::SameSite;

    #[test]
    fn test_defaults_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.database.url, "sqlite://db.sqlite3");
        assert_eq!(settings.database.conn_max_age, Duration::from_secs(600));
        assert!(!settings.serve_api_root);
    }

    #[test]
    fn test_from_env_without_database_url_falls_back_to_sqlite() {
        env::remove_var("DATABASE_URL");
        let settings = Settings::from_env().expect("defaults must load");
        assert_eq!(settings.database.url, "sqlite://db.sqlite3");
    }

    #[test]
    fn test_unsupported_database_scheme_is_fatal() {
        let mut settings = Settings::default();
        settings.database.url = "mssql://somewhere/db".to_string();
        assert!(matches!(
            settings.validate(),
            Err(SettingsError::UnsupportedDatabaseUrl { .. })
        ));
    }

    #[test]
    fn test_invalid_origin_regex_is_fatal() {
        let mut settings = Settings::default();
        settings.cors.allowed_origin_regexes = vec!["(unclosed".to_string()];
        assert!(matches!(
            settings.validate(),
            Err(SettingsError::InvalidOriginRegex { .. })
        ));
    }

    #[test]
    fn test_cookie_policy_tracks_debug_flag() {
        let mut settings = Settings::default();
        settings.debug = true;
        let relaxed = settings.cookie_policy();
        assert_eq!(relaxed.same_site, SameSite::Lax);
        assert!(!relaxed.secure);

        settings.debug = false;
        let strict = settings.cookie_policy();
        assert_eq!(strict.same_site, SameSite::None);
        assert!(strict.secure);
    }

    #[test]
    fn test_cookie_policy_override_wins_over_debug_flag() {
        let mut settings = Settings::default();
        settings.debug = true;
        settings.cookie_policy_override = Some(CookiePolicy {
            same_site: SameSite::Strict,
            secure: true,
        });
        assert!(settings.validate().is_ok());
        let policy = settings.cookie_policy();
        assert_eq!(policy.same_site, SameSite::Strict);
        assert!(policy.secure);
    }

    #[test]
    fn test_inconsistent_cookie_policy_override_is_fatal() {
        let mut settings = Settings::default();
        settings.cookie_policy_override = Some(CookiePolicy {
            same_site: SameSite::None,
            secure: false,
        });
        assert!(matches!(
            settings.validate(),
            Err(SettingsError::InconsistentCookiePolicy)
        ));
    }

    #[test]
    fn test_cookie_override_rejects_unknown_same_site_mode() {
        let result = cookie_policy_parts(true, Some("sideways".to_string()), None);
        assert!(matches!(
            result,
            Err(SettingsError::InvalidValue {
                var: "COOKIE_SAMESITE",
                ..
            })
        ));
    }

    #[test]
    fn test_cookie_override_partial_variables_keep_base_policy() {
        // Only COOKIE_SECURE set: SameSite stays what the debug flag picks.
        let policy = cookie_policy_parts(true, None, Some("true".to_string()))
            .unwrap()
            .unwrap();
        assert_eq!(policy.same_site, SameSite::Lax);
        assert!(policy.secure);
    }

    #[test]
    fn test_list_parsing_drops_empty_entries() {
        env::set_var("CSRF_TRUSTED_ORIGINS", "https://a.example, ,https://b.example,");
        let list = env_list("CSRF_TRUSTED_ORIGINS", &[]);
        env::remove_var("CSRF_TRUSTED_ORIGINS");
        assert_eq!(list, vec!["https://a.example", "https://b.example"]);
    }
}
