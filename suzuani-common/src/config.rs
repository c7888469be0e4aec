//! Configuration loading and root folder resolution
//!
//! Root folder priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (`SUZUANI_ROOT_FOLDER`, then `SUZUANI_ROOT`)
//! 3. TOML config file (`root_folder` key)
//! 4. OS-dependent compiled default (fallback)
//!
//! A missing or unreadable TOML file is never fatal: the loader logs a warning
//! and the compiled defaults are used instead.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Database file name inside the root folder
pub const DATABASE_FILE_NAME: &str = "suzuani.db";

/// Upload sub-folders created under `static/uploads`
pub const UPLOAD_FOLDERS: [&str; 7] = [
    "banners",
    "covers",
    "episodes",
    "manga_pages",
    "posters",
    "profiles",
    "songs",
];

/// Environment variable names
pub const ENV_ROOT_FOLDER: &str = "SUZUANI_ROOT_FOLDER";
pub const ENV_ROOT: &str = "SUZUANI_ROOT";
pub const ENV_SECRET_KEY: &str = "SUZUANI_SECRET_KEY";

/// Compiled-in defaults for the current platform
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub root_folder: PathBuf,
    pub bind_address: String,
    pub port: u16,
    pub log_level: String,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        Self {
            root_folder: default_root_folder(),
            bind_address: "127.0.0.1".to_string(),
            port: 5000,
            log_level: "info".to_string(),
        }
    }
}

/// `[logging]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// `[mail]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    #[serde(default = "default_sender_name")]
    pub sender_name: String,
    #[serde(default = "default_sender_address")]
    pub sender_address: String,
    /// Spool directory for outgoing messages (defaults to `<root>/mail_spool`)
    #[serde(default)]
    pub spool_dir: Option<PathBuf>,
    /// Public base URL used in links sent by e-mail
    #[serde(default = "default_public_url")]
    pub public_url: String,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            sender_name: default_sender_name(),
            sender_address: default_sender_address(),
            spool_dir: None,
            public_url: default_public_url(),
        }
    }
}

fn default_sender_name() -> String {
    "SuzuAni".to_string()
}

fn default_sender_address() -> String {
    "no-reply@suzuani.com".to_string()
}

fn default_public_url() -> String {
    "http://127.0.0.1:5000".to_string()
}

/// `[admin]` section: the account seeded on first start
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminConfig {
    #[serde(default = "default_admin_username")]
    pub username: String,
    #[serde(default = "default_admin_email")]
    pub email: String,
    #[serde(default = "default_admin_password")]
    pub password: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            username: default_admin_username(),
            email: default_admin_email(),
            password: default_admin_password(),
        }
    }
}

fn default_admin_username() -> String {
    "admin".to_string()
}

fn default_admin_email() -> String {
    "admin@suzuani.com".to_string()
}

/// Password of the seeded admin account when none is configured
pub const DEFAULT_ADMIN_PASSWORD: &str = "admin123";

fn default_admin_password() -> String {
    DEFAULT_ADMIN_PASSWORD.to_string()
}

/// Contents of `suzuani.toml`. Every key is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    pub root_folder: Option<PathBuf>,
    pub bind_address: Option<String>,
    pub port: Option<u16>,
    pub secret_key: Option<String>,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub mail: MailConfig,
    #[serde(default)]
    pub admin: AdminConfig,
}

impl TomlConfig {
    /// Parse TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
    }

    /// Load from the first config file found on this platform, or defaults
    pub fn load_or_default() -> ConfigLoad {
        match config_file_path() {
            Some(path) => Self::load_from_path(&path),
            None => ConfigLoad {
                config: Self::default(),
                source: ConfigSource::Defaults,
            },
        }
    }

    /// Load from an explicit path; missing or malformed files fall back to defaults
    pub fn load_from_path(path: &Path) -> ConfigLoad {
        let parsed = std::fs::read_to_string(path)
            .map_err(|e| format!("not readable ({})", e))
            .and_then(|content| Self::from_toml_str(&content).map_err(|e| e.to_string()));

        match parsed {
            Ok(config) => ConfigLoad {
                config,
                source: ConfigSource::File(path.to_path_buf()),
            },
            Err(reason) => ConfigLoad {
                config: Self::default(),
                source: ConfigSource::Fallback {
                    path: path.to_path_buf(),
                    reason,
                },
            },
        }
    }
}

/// Where the configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Parsed from this file
    File(PathBuf),
    /// No config file present
    Defaults,
    /// A config file exists but could not be used
    Fallback { path: PathBuf, reason: String },
}

/// Result of loading `suzuani.toml`
///
/// Loading happens before logging is set up (the log level is part of the
/// config), so the outcome is kept and reported through [`ConfigLoad::log`].
#[derive(Debug, Clone)]
pub struct ConfigLoad {
    pub config: TomlConfig,
    pub source: ConfigSource,
}

impl ConfigLoad {
    /// Report the outcome; call once the tracing subscriber is installed
    pub fn log(&self) {
        match &self.source {
            ConfigSource::File(path) => info!("Loaded configuration from {}", path.display()),
            ConfigSource::Defaults => info!("No config file found, using defaults"),
            ConfigSource::Fallback { path, reason } => {
                warn!("Config file {}: {}, using defaults", path.display(), reason)
            }
        }
    }
}

/// Resolves the root folder following the documented priority order
#[derive(Debug, Clone)]
pub struct RootFolderResolver {
    module_name: String,
    cli_arg: Option<PathBuf>,
    toml_root: Option<PathBuf>,
}

impl RootFolderResolver {
    pub fn new(module_name: &str) -> Self {
        Self {
            module_name: module_name.to_string(),
            cli_arg: None,
            toml_root: None,
        }
    }

    pub fn with_cli_arg(mut self, cli_arg: Option<PathBuf>) -> Self {
        self.cli_arg = cli_arg;
        self
    }

    pub fn with_toml_config(mut self, config: &TomlConfig) -> Self {
        self.toml_root = config.root_folder.clone();
        self
    }

    pub fn resolve(&self) -> PathBuf {
        if let Some(path) = &self.cli_arg {
            info!("[{}] Root folder from command line: {}", self.module_name, path.display());
            return path.clone();
        }

        for var in [ENV_ROOT_FOLDER, ENV_ROOT] {
            if let Ok(path) = std::env::var(var) {
                if !path.trim().is_empty() {
                    info!("[{}] Root folder from {}: {}", self.module_name, var, path);
                    return PathBuf::from(path);
                }
            }
        }

        if let Some(path) = &self.toml_root {
            info!("[{}] Root folder from TOML config: {}", self.module_name, path.display());
            return path.clone();
        }

        let path = CompiledDefaults::for_current_platform().root_folder;
        info!("[{}] Root folder (compiled default): {}", self.module_name, path.display());
        path
    }
}

/// Creates the root folder layout and knows where things live inside it
#[derive(Debug, Clone)]
pub struct RootFolderInitializer {
    root_folder: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root_folder: PathBuf) -> Self {
        Self { root_folder }
    }

    pub fn root_folder(&self) -> &Path {
        &self.root_folder
    }

    /// Create the root folder, the upload tree and the mail spool if missing
    pub fn ensure_directory_exists(&self) -> Result<()> {
        if !self.root_folder.exists() {
            info!("Creating root folder: {}", self.root_folder.display());
        }
        std::fs::create_dir_all(&self.root_folder)?;
        for folder in UPLOAD_FOLDERS {
            std::fs::create_dir_all(self.uploads_path().join(folder))?;
        }
        std::fs::create_dir_all(self.mail_spool_path())?;
        Ok(())
    }

    pub fn database_path(&self) -> PathBuf {
        self.root_folder.join(DATABASE_FILE_NAME)
    }

    pub fn database_exists(&self) -> bool {
        self.database_path().exists()
    }

    /// Directory served under `/static`
    pub fn static_path(&self) -> PathBuf {
        self.root_folder.join("static")
    }

    pub fn uploads_path(&self) -> PathBuf {
        self.static_path().join("uploads")
    }

    pub fn mail_spool_path(&self) -> PathBuf {
        self.root_folder.join("mail_spool")
    }
}

/// Resolve the signing secret from environment or TOML.
///
/// Returns `None` when neither is set; the caller then falls back to the
/// secret persisted in the settings table.
pub fn secret_key_override(config: &TomlConfig) -> Option<String> {
    std::env::var(ENV_SECRET_KEY)
        .ok()
        .filter(|key| !key.trim().is_empty())
        .or_else(|| config.secret_key.clone().filter(|key| !key.trim().is_empty()))
}

/// Locate the configuration file for the platform
fn config_file_path() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("suzuani").join("suzuani.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/suzuani/suzuani.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Get OS-dependent default root folder path
fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        dirs::data_local_dir()
            .map(|d| d.join("suzuani"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/suzuani"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("suzuani"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/suzuani"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("suzuani"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\suzuani"))
    } else {
        PathBuf::from("./suzuani_data")
    }
}
