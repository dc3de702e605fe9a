use crate::settings::{DatabaseSettings, SettingsError};
use sqlx::any::AnyPoolOptions;
use sqlx::AnyPool;
use std::sync::Once;
use tracing::debug;

static DRIVERS: Once = Once::new();

/// Build the connection pool. The URL is parsed here, so a malformed
/// `DATABASE_URL` fails at startup, but connections are established
/// lazily: the sqlite default serves traffic without the database file
/// existing until the delegated handlers first touch it.
pub fn connect(settings: &DatabaseSettings) -> Result<AnyPool, SettingsError> {
    DRIVERS.call_once(sqlx::any::install_default_drivers);

    debug!(
        max_age_secs = settings.conn_max_age.as_secs(),
        "Creating database pool"
    );

    AnyPoolOptions::new()
        .max_lifetime(settings.conn_max_age)
        .connect_lazy(&settings.url)
        .map_err(|source| SettingsError::InvalidDatabaseUrl {
            url: settings.url.clone(),
            source,
        })
}
