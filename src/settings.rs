use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct KeyAuthSettings {
    pub api: ApiSettings,
    pub identity: IdentitySettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    /// Base URL the protocol paths are appended to, e.g. `https://host/api`
    pub base_url: String,
    /// Upper bound for a whole request, including reading the body
    pub timeout_seconds: u64,
    pub connect_timeout_seconds: u64,
    pub user_agent: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct IdentitySettings {
    /// Reuse the first resolved hardware ID for the rest of the process.
    /// When false the ID is recomputed before every license call.
    pub cache_for_process: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/api".to_string(),
            timeout_seconds: 10,
            connect_timeout_seconds: 5,
            user_agent: format!("keyauth-client/{}", crate::VERSION),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl ApiSettings {
    /// Request timeout; a zero setting is raised to one second so calls never hang
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds.max(1))
    }

    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds.max(1))
    }
}

impl KeyAuthSettings {
    /// Load settings from configuration files and environment variables, then
    /// initialize logging
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Settings file cannot be read or parsed
    /// - TOML parsing fails
    /// - Logger initialization fails
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        Self::load_env_file();

        // Load base settings from TOML or defaults
        let mut settings = Self::load_base_settings()?;

        // Apply environment variable overrides
        Self::apply_env_overrides(&mut settings);

        settings.initialize_logging()?;
        Ok(settings)
    }

    /// Initialize `env_logger` with the configured level as the default filter
    ///
    /// # Errors
    ///
    /// Returns an error if a global logger is already installed
    pub fn initialize_logging(&self) -> Result<(), Box<dyn std::error::Error>> {
        env_logger::Builder::from_env(
            env_logger::Env::default().default_filter_or(self.logging.level.as_str()),
        )
        .try_init()?;
        Ok(())
    }

    /// Load base settings from TOML file(s) or use defaults
    /// Settings are loaded with the following priority (highest to lowest):
    /// 1. Environment variables (applied separately after loading base settings)
    /// 2. Settings.toml in `KEYAUTH_SECRETS_DIR` (if specified and exists)
    /// 3. Settings.toml in current directory (if exists)
    /// 4. Default settings
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Settings file cannot be read
    /// - TOML parsing fails
    fn load_base_settings() -> Result<Self, Box<dyn std::error::Error>> {
        let mut settings = Self::default();

        let default_config_path = Path::new("Settings.toml");
        if default_config_path.exists() {
            settings = Self::from_file(default_config_path)?;
            eprintln!(
                "✓ Loaded base settings from {}",
                default_config_path.display()
            );
        }

        if let Ok(secrets_dir) = std::env::var("KEYAUTH_SECRETS_DIR") {
            let secrets_path = Path::new(&secrets_dir).join("Settings.toml");
            if secrets_path.exists() {
                settings = Self::from_file(&secrets_path)?;
                eprintln!("✓ Overriding settings from {}", secrets_path.display());
            } else {
                eprintln!(
                    "ℹ KEYAUTH_SECRETS_DIR set but no Settings.toml found at: {}",
                    secrets_path.display()
                );
            }
        }

        Ok(settings)
    }

    /// Parse a single TOML settings file; missing sections and keys use defaults
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid TOML
    pub fn from_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let toml_content = fs::read_to_string(path)?;
        Ok(basic_toml::from_str(&toml_content)?)
    }

    /// Apply environment variable overrides to settings
    pub fn apply_env_overrides(settings: &mut Self) {
        Self::apply_api_env_overrides(&mut settings.api);
        Self::apply_identity_env_overrides(&mut settings.identity);
        Self::apply_logging_env_overrides(&mut settings.logging);
    }

    /// Apply environment overrides for API settings
    pub fn apply_api_env_overrides(api_settings: &mut ApiSettings) {
        if let Ok(base_url) = std::env::var("KEYAUTH_API_URL") {
            if !base_url.trim().is_empty() {
                api_settings.base_url = base_url.trim().to_string();
            }
        }
        Self::apply_numeric_env_override("KEYAUTH_TIMEOUT_SECONDS", &mut api_settings.timeout_seconds);
        Self::apply_numeric_env_override(
            "KEYAUTH_CONNECT_TIMEOUT_SECONDS",
            &mut api_settings.connect_timeout_seconds,
        );
        if let Ok(user_agent) = std::env::var("KEYAUTH_USER_AGENT") {
            api_settings.user_agent = user_agent;
        }
    }

    /// Apply environment overrides for hardware identity settings
    fn apply_identity_env_overrides(identity_settings: &mut IdentitySettings) {
        if let Ok(cache_str) = std::env::var("KEYAUTH_CACHE_HWID") {
            if let Ok(cache) = cache_str.parse::<bool>() {
                identity_settings.cache_for_process = cache;
            }
        }
    }

    /// Apply environment overrides for logging settings
    fn apply_logging_env_overrides(logging_settings: &mut LoggingSettings) {
        if let Ok(log_level) = std::env::var("RUST_LOG") {
            logging_settings.level = log_level;
        }
    }

    /// Helper function to apply numeric environment variable overrides
    fn apply_numeric_env_override(env_var: &str, target: &mut u64) {
        if let Ok(value_str) = std::env::var(env_var) {
            if let Ok(value) = value_str.parse::<u64>() {
                *target = value;
            }
        }
    }

    /// Load environment variables from .env file
    fn load_env_file() {
        if let Ok(contents) = std::fs::read_to_string(".env") {
            for line in contents.lines() {
                let line = line.trim();
                if line.starts_with('#') {
                    continue;
                }
                if let Some((key, value)) = line.split_once('=') {
                    if std::env::var_os(key.trim()).is_none() {
                        std::env::set_var(key.trim(), value.trim());
                    }
                }
            }
        }
    }
}
