pub mod config;

use std::env;

pub use config::{AppConfig, ConfigError, Environment, ExistingPolicy, SeedConfig, TargetConfig};

pub const DEFAULT_MONGO_URI: &str = "mongodb://localhost:27017";

/// Loads environment variables from `.env` when available.
///
/// Missing files are ignored so the function is safe in container builds
/// where dotenv files are not deployed.
pub fn load_env_file() {
    let _ = dotenvy::dotenv();
}

/// Returns the admin connection string.
///
/// The value is resolved from the `MONGO_URI` environment variable and
/// falls back to [`DEFAULT_MONGO_URI`] when the variable is not set.
pub fn mongo_uri() -> String {
    env::var("MONGO_URI").unwrap_or_else(|_| DEFAULT_MONGO_URI.to_string())
}
