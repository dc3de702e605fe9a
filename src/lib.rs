// Library exports for testing and embedding

pub mod cookies;
pub mod cors;
pub mod csrf;
pub mod db;
pub mod routes;
pub mod server;
pub mod settings;

// Re-export commonly used types
pub use routes::RouteDelegates;
pub use server::AppState;
pub use settings::Settings;
