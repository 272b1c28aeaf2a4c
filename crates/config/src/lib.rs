use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

const DEFAULT_CONFIG_FILES: &[&str] = &[
    "cycle.toml",
    "config/cycle.toml",
    "crates/config/cycle.toml",
    "../cycle.toml",
    "../config/cycle.toml",
    "../crates/config/cycle.toml",
];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub http: HttpConfig,
    pub database: DatabaseConfig,
    pub invites: InviteConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    pub address: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1".to_string(),
            port: 7080,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://cycle.db".to_string(),
            max_connections: 10,
        }
    }
}

/// Settings for chama invitations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InviteConfig {
    /// How long a freshly issued invite stays acceptable.
    #[serde(default = "InviteConfig::default_expiry_hours")]
    pub expiry_hours: i64,
}

impl Default for InviteConfig {
    fn default() -> Self {
        Self {
            expiry_hours: Self::default_expiry_hours(),
        }
    }
}

impl InviteConfig {
    const fn default_expiry_hours() -> i64 {
        72
    }
}

/// Load the application configuration by combining defaults, files, and environment overrides.
///
/// ```
/// use cycle_config::load;
///
/// std::env::remove_var("CYCLE_CONFIG");
///
/// let config = load().expect("configuration should load with defaults");
/// assert!(!config.http.address.is_empty());
/// ```
pub fn load() -> anyhow::Result<AppConfig> {
    let defaults = AppConfig::default();

    let mut builder = config::Config::builder();
    builder = builder
        .set_default("http.address", defaults.http.address.clone())
        .unwrap()
        .set_default("http.port", i64::from(defaults.http.port))
        .unwrap()
        .set_default("database.url", defaults.database.url.clone())
        .unwrap()
        .set_default(
            "database.max_connections",
            i64::from(defaults.database.max_connections),
        )
        .unwrap()
        .set_default("invites.expiry_hours", defaults.invites.expiry_hours)
        .unwrap();

    let environment_overrides = config::Environment::with_prefix("CYCLE").separator("__");

    let mut config_file_attached = false;

    if let Ok(path) = std::env::var("CYCLE_CONFIG") {
        builder = builder.add_source(config::File::from(PathBuf::from(&path)));
        config_file_attached = true;
        debug!(path, "loading configuration via CYCLE_CONFIG");
    } else if let Ok(cwd) = std::env::current_dir() {
        let fallback = DEFAULT_CONFIG_FILES
            .iter()
            .map(|candidate| cwd.join(candidate))
            .find(|path| path.exists());

        if let Some(path) = fallback {
            debug!(path = %path.display(), "loading configuration file");
            builder = builder.add_source(config::File::from(path));
            config_file_attached = true;
        }
    }

    if !config_file_attached {
        debug!("no configuration file found, relying on defaults and environment overrides");
    }

    builder = builder.add_source(environment_overrides);

    let cfg = builder.build().context("unable to build configuration")?;

    let config = cfg
        .try_deserialize::<AppConfig>()
        .context("invalid configuration")?;

    debug!(?config, "loaded backend configuration");
    Ok(config)
}
