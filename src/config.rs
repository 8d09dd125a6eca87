//! Unified configuration for repolens.
//!
//! Settings are read from `.repolens/repolens.toml` in the project directory and
//! layered as file → environment → CLI. A missing file yields defaults.
//!
//! # Configuration File Format
//!
//! ```toml
//! [api]
//! base_url = "http://localhost:8000"
//! timeout_secs = 30
//!
//! [auth]
//! access_token = "eyJhbGciOi..."
//!
//! [chat]
//! default_project = "default"
//!
//! [layout]
//! sibling_spacing = 120.0
//! level_height = 180.0
//! base_offset = 100.0
//! max_jitter = 20.0
//! canvas_width = 2000.0
//! canvas_height = 1500.0
//!
//! [viewport]
//! width = 1280.0
//! height = 800.0
//! wheel_sensitivity = 0.001
//! min_zoom = 0.1
//! max_zoom = 3.0
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::errors::ConfigError;

/// Environment variable overriding `[api] base_url`.
pub const API_URL_ENV: &str = "REPOLENS_API_URL";
/// Environment variable overriding `[auth] access_token`.
pub const ACCESS_TOKEN_ENV: &str = "REPOLENS_ACCESS_TOKEN";

/// Backend connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSection {
    /// Base URL of the backend, without the `/api/v1` suffix
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Timeout for non-streaming requests. The chat stream itself is never timed out.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for ApiSection {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Credentials handed to the session provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_email: Option<String>,
}

/// Chat defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSection {
    /// Project id used when none is given on the command line
    #[serde(default = "default_project")]
    pub default_project: String,
}

fn default_project() -> String {
    "default".to_string()
}

impl Default for ChatSection {
    fn default() -> Self {
        Self {
            default_project: default_project(),
        }
    }
}

/// Constants for the layered tree layout.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayoutSection {
    #[serde(default = "default_sibling_spacing")]
    pub sibling_spacing: f64,
    #[serde(default = "default_level_height")]
    pub level_height: f64,
    #[serde(default = "default_base_offset")]
    pub base_offset: f64,
    /// Upper bound of the random horizontal jitter added to every node
    #[serde(default = "default_max_jitter")]
    pub max_jitter: f64,
    #[serde(default = "default_canvas_width")]
    pub canvas_width: f64,
    #[serde(default = "default_canvas_height")]
    pub canvas_height: f64,
}

fn default_sibling_spacing() -> f64 {
    120.0
}

fn default_level_height() -> f64 {
    180.0
}

fn default_base_offset() -> f64 {
    100.0
}

fn default_max_jitter() -> f64 {
    20.0
}

fn default_canvas_width() -> f64 {
    2000.0
}

fn default_canvas_height() -> f64 {
    1500.0
}

impl Default for LayoutSection {
    fn default() -> Self {
        Self {
            sibling_spacing: default_sibling_spacing(),
            level_height: default_level_height(),
            base_offset: default_base_offset(),
            max_jitter: default_max_jitter(),
            canvas_width: default_canvas_width(),
            canvas_height: default_canvas_height(),
        }
    }
}

/// Viewport size and zoom behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportSection {
    #[serde(default = "default_viewport_width")]
    pub width: f64,
    #[serde(default = "default_viewport_height")]
    pub height: f64,
    /// Zoom change per unit of wheel delta
    #[serde(default = "default_wheel_sensitivity")]
    pub wheel_sensitivity: f64,
    #[serde(default = "default_min_zoom")]
    pub min_zoom: f64,
    #[serde(default = "default_max_zoom")]
    pub max_zoom: f64,
}

fn default_viewport_width() -> f64 {
    1280.0
}

fn default_viewport_height() -> f64 {
    800.0
}

fn default_wheel_sensitivity() -> f64 {
    0.001
}

fn default_min_zoom() -> f64 {
    0.1
}

fn default_max_zoom() -> f64 {
    3.0
}

impl Default for ViewportSection {
    fn default() -> Self {
        Self {
            width: default_viewport_width(),
            height: default_viewport_height(),
            wheel_sensitivity: default_wheel_sensitivity(),
            min_zoom: default_min_zoom(),
            max_zoom: default_max_zoom(),
        }
    }
}

/// The complete repolens.toml structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepolensToml {
    #[serde(default)]
    pub api: ApiSection,
    #[serde(default)]
    pub auth: AuthSection,
    #[serde(default)]
    pub chat: ChatSection,
    #[serde(default)]
    pub layout: LayoutSection,
    #[serde(default)]
    pub viewport: ViewportSection,
}

impl RepolensToml {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load `repolens.toml` from the given config directory, or defaults if absent.
    pub fn load_or_default(config_dir: &Path) -> Result<Self, ConfigError> {
        let path = config_dir.join(CONFIG_FILE_NAME);
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Validate the configuration and return any warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if !(self.api.base_url.starts_with("http://") || self.api.base_url.starts_with("https://"))
        {
            warnings.push(format!(
                "Invalid api.base_url '{}': expected an http:// or https:// URL",
                self.api.base_url
            ));
        }
        if self.api.timeout_secs == 0 {
            warnings.push("api.timeout_secs is 0; requests will time out immediately".to_string());
        }
        if self.layout.sibling_spacing <= 0.0 {
            warnings.push(format!(
                "layout.sibling_spacing must be positive (got {})",
                self.layout.sibling_spacing
            ));
        }
        if self.layout.level_height <= 0.0 {
            warnings.push(format!(
                "layout.level_height must be positive (got {})",
                self.layout.level_height
            ));
        }
        if self.layout.max_jitter < 0.0 {
            warnings.push(format!(
                "layout.max_jitter cannot be negative (got {})",
                self.layout.max_jitter
            ));
        }
        if self.viewport.min_zoom <= 0.0 || self.viewport.min_zoom > self.viewport.max_zoom {
            warnings.push(format!(
                "viewport zoom bounds are invalid: min_zoom = {}, max_zoom = {}",
                self.viewport.min_zoom, self.viewport.max_zoom
            ));
        }

        warnings
    }
}

/// Name of the config file inside the `.repolens` directory.
pub const CONFIG_FILE_NAME: &str = "repolens.toml";

/// Get the `.repolens` directory for a project.
pub fn config_dir(project_dir: &Path) -> PathBuf {
    project_dir.join(".repolens")
}

/// Unified configuration combining repolens.toml with environment and CLI overrides.
#[derive(Debug, Clone)]
pub struct RepolensConfig {
    pub project_dir: PathBuf,
    pub config_dir: PathBuf,
    pub toml: RepolensToml,
    /// CLI override for the API base URL
    pub cli_api_url: Option<String>,
    /// CLI override for the access token
    pub cli_token: Option<String>,
    pub verbose: bool,
}

impl RepolensConfig {
    /// Create a config from a project directory, reading repolens.toml if present.
    pub fn new(project_dir: PathBuf) -> Result<Self, ConfigError> {
        let config_dir = config_dir(&project_dir);
        let toml = RepolensToml::load_or_default(&config_dir)?;
        Ok(Self {
            project_dir,
            config_dir,
            toml,
            cli_api_url: None,
            cli_token: None,
            verbose: false,
        })
    }

    /// Create a config with CLI overrides applied.
    pub fn with_cli_args(
        project_dir: PathBuf,
        api_url: Option<String>,
        token: Option<String>,
        verbose: bool,
    ) -> Result<Self, ConfigError> {
        let mut config = Self::new(project_dir)?;
        config.cli_api_url = api_url;
        config.cli_token = token;
        config.verbose = verbose;
        Ok(config)
    }

    /// API base URL (CLI → env → file → default), without a trailing slash.
    pub fn api_base_url(&self) -> String {
        let url = self
            .cli_api_url
            .clone()
            .or_else(|| std::env::var(API_URL_ENV).ok())
            .unwrap_or_else(|| self.toml.api.base_url.clone());
        url.trim_end_matches('/').to_string()
    }

    /// Access token (CLI → env → file). `None` means no authenticated session.
    pub fn access_token(&self) -> Option<String> {
        self.cli_token
            .clone()
            .or_else(|| std::env::var(ACCESS_TOKEN_ENV).ok())
            .or_else(|| self.toml.auth.access_token.clone())
            .filter(|t| !t.trim().is_empty())
    }

    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.toml.api.timeout_secs)
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE_NAME)
    }

    /// Directory for JSON log files.
    pub fn log_dir(&self) -> PathBuf {
        self.config_dir.join("logs")
    }

    pub fn validate(&self) -> Vec<String> {
        self.toml.validate()
    }
}
