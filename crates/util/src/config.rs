use std::{env, fmt, time::Duration};

use super::mongo_uri;

/// Application runtime environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
    Test,
}

impl Environment {
    fn from_str(value: &str) -> Result<Self, ConfigError> {
        match value {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            "test" => Ok(Self::Test),
            other => Err(ConfigError::InvalidEnvironment(other.to_string())),
        }
    }

    /// Returns the canonical name used for logging labels.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Test => "test",
        }
    }
}

/// What to do when the user or collection already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExistingPolicy {
    /// Surface the server's duplicate error and stop.
    #[default]
    Fail,
    /// Treat the step as done and move on.
    Skip,
}

impl ExistingPolicy {
    fn from_str(value: &str) -> Result<Self, ConfigError> {
        match value {
            "fail" => Ok(Self::Fail),
            "skip" => Ok(Self::Skip),
            other => Err(ConfigError::InvalidPolicy(other.to_string())),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fail => "fail",
            Self::Skip => "skip",
        }
    }
}

/// Names and credential of everything the routine creates.
#[derive(Clone)]
pub struct TargetConfig {
    pub database: String,
    pub username: String,
    pub password: String,
    pub role: String,
    pub collection: String,
}

impl fmt::Debug for TargetConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TargetConfig")
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &"***")
            .field("role", &self.role)
            .field("collection", &self.collection)
            .finish()
    }
}

/// Product seeding settings. A `target_count` of zero disables seeding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedConfig {
    pub target_count: u64,
    pub batch_size: usize,
    pub rng_seed: Option<u64>,
}

impl SeedConfig {
    pub fn is_enabled(&self) -> bool {
        self.target_count > 0
    }
}

/// Runtime configuration resolved from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: Environment,
    pub mongo_uri: String,
    pub connect_timeout: Duration,
    pub target: TargetConfig,
    pub on_existing: ExistingPolicy,
    pub create_indexes: bool,
    pub verify: bool,
    pub seed: SeedConfig,
}

impl AppConfig {
    /// Constructs the configuration by reading and validating environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let env_value = env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());
        let environment = Environment::from_str(&env_value)?;

        let target = TargetConfig {
            database: non_empty("MONGO_INIT_DATABASE", "marketplace_product")?,
            username: non_empty("MONGO_INIT_USERNAME", "mongo")?,
            password: non_empty("MONGO_INIT_PASSWORD", "mongo123")?,
            role: non_empty("MONGO_INIT_ROLE", "readWrite")?,
            collection: non_empty("MONGO_INIT_COLLECTION", "products")?,
        };

        let on_existing = match env::var("MONGO_INIT_ON_EXISTING") {
            Ok(value) => ExistingPolicy::from_str(&value)?,
            Err(_) => ExistingPolicy::default(),
        };

        let timeout_ms: u64 = number("MONGO_CONNECT_TIMEOUT_MS", 3000)?;
        let batch_size: usize = number("SEED_BATCH_SIZE", 1000)?;
        if batch_size == 0 {
            return Err(ConfigError::ZeroBatchSize);
        }
        let rng_seed = match env::var("SEED_RNG_SEED") {
            Ok(value) => Some(parse_number("SEED_RNG_SEED", &value)?),
            Err(_) => None,
        };

        Ok(Self {
            environment,
            mongo_uri: mongo_uri(),
            connect_timeout: Duration::from_millis(timeout_ms),
            target,
            on_existing,
            create_indexes: flag("MONGO_INIT_CREATE_INDEXES", true)?,
            verify: flag("MONGO_INIT_VERIFY", false)?,
            seed: SeedConfig {
                target_count: number("SEED_PRODUCT_COUNT", 0)?,
                batch_size,
                rng_seed,
            },
        })
    }
}

fn non_empty(name: &'static str, default: &str) -> Result<String, ConfigError> {
    let value = env::var(name).unwrap_or_else(|_| default.to_string());
    if value.trim().is_empty() {
        return Err(ConfigError::Empty(name));
    }
    Ok(value)
}

fn flag(name: &'static str, default: bool) -> Result<bool, ConfigError> {
    let Ok(value) = env::var(name) else {
        return Ok(default);
    };
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidFlag { name, value }),
    }
}

fn number<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => parse_number(name, &value),
        Err(_) => Ok(default),
    }
}

fn parse_number<T: std::str::FromStr>(name: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidNumber {
        name,
        value: value.to_string(),
    })
}

/// Errors that can occur during configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    InvalidEnvironment(String),
    InvalidPolicy(String),
    Empty(&'static str),
    InvalidFlag { name: &'static str, value: String },
    InvalidNumber { name: &'static str, value: String },
    ZeroBatchSize,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidEnvironment(value) => write!(
                f,
                "APP_ENV must be one of 'development', 'production', or 'test' (got {value})"
            ),
            Self::InvalidPolicy(value) => write!(
                f,
                "MONGO_INIT_ON_EXISTING must be 'fail' or 'skip' (got {value})"
            ),
            Self::Empty(name) => write!(f, "{name} must not be empty"),
            Self::InvalidFlag { name, value } => {
                write!(f, "{name} must be a boolean (got {value})")
            }
            Self::InvalidNumber { name, value } => {
                write!(f, "{name} must be a non-negative integer (got {value})")
            }
            Self::ZeroBatchSize => write!(f, "SEED_BATCH_SIZE must be greater than zero"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
pub(crate) static ENV_GUARD: std::sync::LazyLock<std::sync::Mutex<()>> =
    std::sync::LazyLock::new(|| std::sync::Mutex::new(()));
