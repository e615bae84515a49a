//! Configuration management.
//!
//! Configuration is layered: built-in defaults, then an optional TOML file,
//! then environment variables (a `.env` file in the working directory is
//! loaded first by the binary).
//!
//! ```toml
//! [steam]
//! api_key = "XXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXX"
//! steam_id = "76561197960287930"
//!
//! [http]
//! timeout_ms = 30000
//!
//! [guides]
//! search_limit = 10
//! full_text_threshold = 20000
//! top_k = 5
//!
//! [observability.logging]
//! format = "json"
//! level = "info"
//! ```

use crate::{Error, Result};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default Steam Web API base URL.
pub const DEFAULT_API_BASE_URL: &str = "https://api.steampowered.com";

/// Default Steam Community base URL.
pub const DEFAULT_COMMUNITY_BASE_URL: &str = "https://steamcommunity.com";

/// Default port for the HTTP transport.
pub const DEFAULT_HTTP_PORT: u16 = 8099;

/// Environment variable holding an explicit config file path.
pub const CONFIG_PATH_ENV: &str = "STEAM_MCP_CONFIG_PATH";

/// Main configuration for steam-mcp.
#[derive(Debug, Clone, Default)]
pub struct SteamMcpConfig {
    /// Steam credentials and endpoints.
    pub steam: SteamSettings,
    /// Outbound HTTP client settings.
    pub http: HttpSettings,
    /// Guide search and content settings.
    pub guides: GuideSettings,
    /// MCP server settings.
    pub server: ServerSettings,
    /// Logging and metrics settings.
    pub observability: ObservabilitySettings,
}

/// Steam credentials and endpoint configuration.
#[derive(Debug, Clone)]
pub struct SteamSettings {
    /// Steam Web API key.
    pub api_key: Option<SecretString>,
    /// 64-bit Steam id of the player whose data is read.
    pub steam_id: Option<String>,
    /// Base URL of the Steam Web API.
    pub api_base_url: String,
    /// Base URL of the Steam Community site.
    pub community_base_url: String,
}

impl Default for SteamSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            steam_id: None,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            community_base_url: DEFAULT_COMMUNITY_BASE_URL.to_string(),
        }
    }
}

/// Outbound HTTP configuration.
#[derive(Debug, Clone)]
pub struct HttpSettings {
    /// Request timeout in milliseconds (0 to disable).
    pub timeout_ms: u64,
    /// Connect timeout in milliseconds (0 to disable).
    pub connect_timeout_ms: u64,
    /// User agent sent to steamcommunity.com.
    pub user_agent: String,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            connect_timeout_ms: 5_000,
            user_agent: "Mozilla/5.0".to_string(),
        }
    }
}

/// Guide search and retrieval configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuideSettings {
    /// Maximum number of guides returned by a search.
    pub search_limit: usize,
    /// Guides whose text is at most this many characters are returned whole.
    pub full_text_threshold: usize,
    /// Number of sections returned when a large guide is ranked against a query.
    pub top_k: usize,
}

impl Default for GuideSettings {
    fn default() -> Self {
        Self {
            search_limit: 10,
            full_text_threshold: 20_000,
            top_k: 5,
        }
    }
}

/// MCP server configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerSettings {
    /// Port for the HTTP transport.
    pub port: u16,
    /// Maximum requests per rate limit window.
    pub rate_limit_max_requests: usize,
    /// Rate limit window in seconds.
    pub rate_limit_window_secs: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            port: DEFAULT_HTTP_PORT,
            rate_limit_max_requests: 1000,
            rate_limit_window_secs: 60,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Default)]
pub struct ObservabilitySettings {
    /// Logging configuration.
    pub logging: LoggingSettings,
    /// Metrics configuration.
    pub metrics: MetricsSettings,
}

/// Logging configuration.
#[derive(Debug, Clone, Default)]
pub struct LoggingSettings {
    /// Log format: `pretty` or `json`.
    pub format: Option<String>,
    /// Log filter directive (e.g. `info`, `steam_mcp=debug`).
    pub level: Option<String>,
    /// Optional log file; logs go to stderr when unset.
    pub file: Option<PathBuf>,
}

/// Metrics configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsSettings {
    /// Whether the Prometheus recorder is installed.
    pub enabled: bool,
    /// Port for the Prometheus scrape listener.
    pub port: Option<u16>,
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    /// Steam section.
    pub steam: Option<ConfigFileSteam>,
    /// HTTP section.
    pub http: Option<ConfigFileHttp>,
    /// Guides section.
    pub guides: Option<ConfigFileGuides>,
    /// Server section.
    pub server: Option<ConfigFileServer>,
    /// Observability section.
    pub observability: Option<ConfigFileObservability>,
}

/// Steam section in config file.
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ConfigFileSteam {
    /// Steam Web API key.
    pub api_key: Option<String>,
    /// Player Steam id.
    pub steam_id: Option<String>,
    /// Web API base URL.
    pub api_base_url: Option<String>,
    /// Community base URL.
    pub community_base_url: Option<String>,
}

/// HTTP section in config file.
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ConfigFileHttp {
    /// Request timeout in milliseconds.
    pub timeout_ms: Option<u64>,
    /// Connect timeout in milliseconds.
    pub connect_timeout_ms: Option<u64>,
    /// User agent.
    pub user_agent: Option<String>,
}

/// Guides section in config file.
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ConfigFileGuides {
    /// Maximum search results.
    pub search_limit: Option<usize>,
    /// Full text threshold in characters.
    pub full_text_threshold: Option<usize>,
    /// Ranked sections to return.
    pub top_k: Option<usize>,
}

/// Server section in config file.
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ConfigFileServer {
    /// HTTP port.
    pub port: Option<u16>,
    /// Maximum requests per window.
    pub rate_limit_max_requests: Option<usize>,
    /// Window length in seconds.
    pub rate_limit_window_secs: Option<u64>,
}

/// Observability section in config file.
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ConfigFileObservability {
    /// Logging subsection.
    pub logging: Option<ConfigFileLogging>,
    /// Metrics subsection.
    pub metrics: Option<ConfigFileMetrics>,
}

/// Logging subsection in config file.
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ConfigFileLogging {
    /// Log format.
    pub format: Option<String>,
    /// Log filter directive.
    pub level: Option<String>,
    /// Log file path.
    pub file: Option<String>,
}

/// Metrics subsection in config file.
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ConfigFileMetrics {
    /// Whether metrics are enabled.
    pub enabled: Option<bool>,
    /// Listener port.
    pub port: Option<u16>,
}

impl SteamMcpConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a file path, then applies environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let mut config = Self::parse_file(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Loads configuration from the default location, then applies environment overrides.
    ///
    /// Checks the following paths in order:
    /// 1. Platform-specific config dir (`~/Library/Application Support/steam-mcp/` on macOS)
    /// 2. XDG config dir (`~/.config/steam-mcp/`)
    ///
    /// Falls back to defaults if no readable config file is found.
    #[must_use]
    pub fn load_default() -> Self {
        let mut config = Self::default_file_candidates()
            .into_iter()
            .filter(|path| path.exists())
            .find_map(|path| match Self::parse_file(&path) {
                Ok(config) => Some(config),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Ignoring unreadable config file");
                    None
                },
            })
            .unwrap_or_default();
        config.apply_env_overrides();
        config
    }

    /// Loads configuration honoring an explicit path, then `STEAM_MCP_CONFIG_PATH`,
    /// then the default locations.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicitly requested file cannot be loaded.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load_from_file(path);
        }

        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            if !path.trim().is_empty() {
                return Self::load_from_file(Path::new(&path));
            }
        }

        Ok(Self::load_default())
    }

    fn default_file_candidates() -> Vec<PathBuf> {
        let Some(base_dirs) = directories::BaseDirs::new() else {
            return Vec::new();
        };

        let mut candidates = vec![
            base_dirs.config_dir().join("steam-mcp").join("config.toml"),
            base_dirs
                .home_dir()
                .join(".config")
                .join("steam-mcp")
                .join("config.toml"),
        ];
        // On Linux both entries are `~/.config`.
        candidates.dedup();
        candidates
    }

    fn parse_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::operation("read_config_file", format!("{}: {e}", path.display())))?;
        Self::parse_toml(&contents)
    }

    /// Parses configuration from TOML text without applying environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed or contains unknown sections or keys.
    pub fn parse_toml(contents: &str) -> Result<Self> {
        let file: ConfigFile =
            toml::from_str(contents).map_err(|e| Error::operation("parse_config_file", e))?;
        Ok(Self::from_config_file(file))
    }

    /// Converts a `ConfigFile` to `SteamMcpConfig`.
    fn from_config_file(file: ConfigFile) -> Self {
        let mut config = Self::default();

        if let Some(steam) = file.steam {
            config.steam.api_key = steam.api_key.filter(|k| !k.is_empty()).map(SecretString::from);
            config.steam.steam_id = steam.steam_id.filter(|id| !id.is_empty());
            if let Some(url) = steam.api_base_url {
                config.steam.api_base_url = url;
            }
            if let Some(url) = steam.community_base_url {
                config.steam.community_base_url = url;
            }
        }
        if let Some(http) = file.http {
            if let Some(v) = http.timeout_ms {
                config.http.timeout_ms = v;
            }
            if let Some(v) = http.connect_timeout_ms {
                config.http.connect_timeout_ms = v;
            }
            if let Some(v) = http.user_agent {
                config.http.user_agent = v;
            }
        }
        if let Some(guides) = file.guides {
            if let Some(v) = guides.search_limit {
                config.guides.search_limit = v;
            }
            if let Some(v) = guides.full_text_threshold {
                config.guides.full_text_threshold = v;
            }
            if let Some(v) = guides.top_k {
                config.guides.top_k = v;
            }
        }
        if let Some(server) = file.server {
            if let Some(v) = server.port {
                config.server.port = v;
            }
            if let Some(v) = server.rate_limit_max_requests {
                config.server.rate_limit_max_requests = v;
            }
            if let Some(v) = server.rate_limit_window_secs {
                config.server.rate_limit_window_secs = v;
            }
        }
        if let Some(observability) = file.observability {
            if let Some(logging) = observability.logging {
                config.observability.logging.format = logging.format;
                config.observability.logging.level = logging.level;
                config.observability.logging.file = logging.file.map(PathBuf::from);
            }
            if let Some(metrics) = observability.metrics {
                config.observability.metrics.enabled = metrics.enabled.unwrap_or(false);
                config.observability.metrics.port = metrics.port;
            }
        }

        config
    }

    /// Applies overrides from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Applies overrides from an arbitrary variable lookup.
    ///
    /// Recognised variables: `API_KEY`, `STEAM_ID`, `STEAM_MCP_API_BASE_URL`,
    /// `STEAM_MCP_COMMUNITY_BASE_URL`, `STEAM_MCP_TIMEOUT_MS`,
    /// `STEAM_MCP_CONNECT_TIMEOUT_MS`, `STEAM_MCP_LOG_FORMAT`, `STEAM_MCP_LOG_LEVEL`,
    /// `STEAM_MCP_METRICS_ENABLED`, `STEAM_MCP_METRICS_PORT`,
    /// `STEAM_MCP_RATE_LIMIT_MAX_REQUESTS`, `STEAM_MCP_RATE_LIMIT_WINDOW_SECS`.
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = get("API_KEY") {
            self.steam.api_key = Some(SecretString::from(key));
        }
        if let Some(id) = get("STEAM_ID") {
            self.steam.steam_id = Some(id);
        }
        if let Some(url) = get("STEAM_MCP_API_BASE_URL") {
            self.steam.api_base_url = url;
        }
        if let Some(url) = get("STEAM_MCP_COMMUNITY_BASE_URL") {
            self.steam.community_base_url = url;
        }
        if let Some(v) = get("STEAM_MCP_TIMEOUT_MS").and_then(|v| v.parse().ok()) {
            self.http.timeout_ms = v;
        }
        if let Some(v) = get("STEAM_MCP_CONNECT_TIMEOUT_MS").and_then(|v| v.parse().ok()) {
            self.http.connect_timeout_ms = v;
        }
        if let Some(v) = get("STEAM_MCP_LOG_FORMAT") {
            self.observability.logging.format = Some(v);
        }
        if let Some(v) = get("STEAM_MCP_LOG_LEVEL") {
            self.observability.logging.level = Some(v);
        }
        if let Some(v) = get("STEAM_MCP_METRICS_ENABLED").and_then(|v| parse_bool(&v)) {
            self.observability.metrics.enabled = v;
        }
        if let Some(v) = get("STEAM_MCP_METRICS_PORT").and_then(|v| v.parse().ok()) {
            self.observability.metrics.port = Some(v);
        }
        if let Some(v) = get("STEAM_MCP_RATE_LIMIT_MAX_REQUESTS").and_then(|v| v.parse().ok()) {
            self.server.rate_limit_max_requests = v;
        }
        if let Some(v) = get("STEAM_MCP_RATE_LIMIT_WINDOW_SECS").and_then(|v| v.parse().ok()) {
            self.server.rate_limit_window_secs = v;
        }
    }

    /// Sets the Steam Web API key.
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.steam.api_key = Some(SecretString::from(key.into()));
        self
    }

    /// Sets the player Steam id.
    #[must_use]
    pub fn with_steam_id(mut self, steam_id: impl Into<String>) -> Self {
        self.steam.steam_id = Some(steam_id.into());
        self
    }

    /// Points both the Web API and the community site at a single base URL.
    ///
    /// Used to run against a local mock of Steam.
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        self.steam.api_base_url.clone_from(&url);
        self.steam.community_base_url = url;
        self
    }

    /// Renders the configuration for display with the API key redacted.
    #[must_use]
    pub fn display_redacted(&self) -> String {
        let api_key = self.steam.api_key.as_ref().map_or_else(
            || "(not set)".to_string(),
            |key| redact(key.expose_secret()),
        );
        let steam_id = self.steam.steam_id.as_deref().unwrap_or("(not set)");
        let log_file = self
            .observability
            .logging
            .file
            .as_ref()
            .map_or_else(|| "stderr".to_string(), |p| p.display().to_string());

        format!(
            "[steam]\n\
             api_key = {api_key}\n\
             steam_id = {steam_id}\n\
             api_base_url = {}\n\
             community_base_url = {}\n\
             \n\
             [http]\n\
             timeout_ms = {}\n\
             connect_timeout_ms = {}\n\
             user_agent = {}\n\
             \n\
             [guides]\n\
             search_limit = {}\n\
             full_text_threshold = {}\n\
             top_k = {}\n\
             \n\
             [server]\n\
             port = {}\n\
             rate_limit = {} requests / {}s\n\
             \n\
             [observability]\n\
             log_format = {}\n\
             log_level = {}\n\
             log_output = {log_file}\n\
             metrics = {}",
            self.steam.api_base_url,
            self.steam.community_base_url,
            self.http.timeout_ms,
            self.http.connect_timeout_ms,
            self.http.user_agent,
            self.guides.search_limit,
            self.guides.full_text_threshold,
            self.guides.top_k,
            self.server.port,
            self.server.rate_limit_max_requests,
            self.server.rate_limit_window_secs,
            self.observability.logging.format.as_deref().unwrap_or("pretty"),
            self.observability.logging.level.as_deref().unwrap_or("info"),
            if self.observability.metrics.enabled {
                "enabled"
            } else {
                "disabled"
            },
        )
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Keeps the last four characters of a secret.
fn redact(secret: &str) -> String {
    let visible: String = secret
        .chars()
        .rev()
        .take(4)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    if secret.chars().count() <= 4 {
        "****".to_string()
    } else {
        format!("****{visible}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use test_case::test_case;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = SteamMcpConfig::default();
        assert!(config.steam.api_key.is_none());
        assert_eq!(config.steam.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.steam.community_base_url, DEFAULT_COMMUNITY_BASE_URL);
        assert_eq!(config.guides.search_limit, 10);
        assert_eq!(config.guides.full_text_threshold, 20_000);
        assert_eq!(config.guides.top_k, 5);
        assert_eq!(config.server.port, 8099);
    }

    #[test]
    fn test_parse_toml_sections() {
        let config = SteamMcpConfig::parse_toml(
            r#"
            [steam]
            api_key = "abcdef123456"
            steam_id = "76561197960287930"
            community_base_url = "http://localhost:9000"

            [guides]
            search_limit = 3

            [observability.logging]
            format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(
            config.steam.api_key.as_ref().unwrap().expose_secret(),
            "abcdef123456"
        );
        assert_eq!(config.steam.steam_id.as_deref(), Some("76561197960287930"));
        assert_eq!(config.steam.community_base_url, "http://localhost:9000");
        assert_eq!(config.steam.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.guides.search_limit, 3);
        assert_eq!(config.guides.top_k, 5);
        assert_eq!(config.observability.logging.format.as_deref(), Some("json"));
    }

    #[test]
    fn test_parse_toml_rejects_unknown_section() {
        let result = SteamMcpConfig::parse_toml("[database]\nurl = \"x\"\n");
        assert!(matches!(result, Err(Error::OperationFailed { .. })));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = SteamMcpConfig::default();
        config.apply_overrides_from(lookup(&[
            ("API_KEY", "key-from-env"),
            ("STEAM_ID", "123"),
            ("STEAM_MCP_TIMEOUT_MS", "1500"),
            ("STEAM_MCP_METRICS_ENABLED", "yes"),
            ("STEAM_MCP_METRICS_PORT", "not-a-port"),
        ]));

        assert_eq!(
            config.steam.api_key.as_ref().unwrap().expose_secret(),
            "key-from-env"
        );
        assert_eq!(config.steam.steam_id.as_deref(), Some("123"));
        assert_eq!(config.http.timeout_ms, 1500);
        assert!(config.observability.metrics.enabled);
        assert!(config.observability.metrics.port.is_none());
    }

    #[test]
    fn test_blank_env_values_are_ignored() {
        let mut config = SteamMcpConfig::default().with_steam_id("999");
        config.apply_overrides_from(lookup(&[("STEAM_ID", "  ")]));
        assert_eq!(config.steam.steam_id.as_deref(), Some("999"));
    }

    #[test]
    fn test_load_from_missing_file() {
        let result = SteamMcpConfig::load_from_file(Path::new("/nonexistent/steam-mcp.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_file_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server]\nport = 9100").unwrap();

        let config = SteamMcpConfig::parse_file(file.path()).unwrap();
        assert_eq!(config.server.port, 9100);
    }

    #[test]
    fn test_display_redacts_api_key() {
        let config = SteamMcpConfig::default().with_api_key("ABCDEFGHIJKL1234");
        let shown = config.display_redacted();
        assert!(shown.contains("****1234"));
        assert!(!shown.contains("ABCDEFGH"));

        let shown = SteamMcpConfig::default().display_redacted();
        assert!(shown.contains("api_key = (not set)"));
    }

    #[test]
    fn test_with_base_url() {
        let config = SteamMcpConfig::default().with_base_url("http://127.0.0.1:1234");
        assert_eq!(config.steam.api_base_url, "http://127.0.0.1:1234");
        assert_eq!(config.steam.community_base_url, "http://127.0.0.1:1234");
    }

    #[test_case("[guides]\nsearch_limt = 3" ; "guides")]
    #[test_case("[server]\nrate_limit_max = 5" ; "server")]
    #[test_case("[steam]\napikey = \"k\"" ; "steam")]
    #[test_case("[http]\ntimeout = 5" ; "http")]
    #[test_case("[observability.logging]\nlevle = \"debug\"" ; "logging")]
    #[test_case("[observability.metrics]\nenable = true" ; "metrics")]
    fn test_misspelled_keys_rejected(toml: &str) {
        let err = SteamMcpConfig::parse_toml(toml).unwrap_err();
        assert!(err.to_string().contains("parse_config_file"), "{err}");
    }

    #[test]
    fn test_default_file_candidates_are_distinct() {
        let candidates = SteamMcpConfig::default_file_candidates();
        for (i, path) in candidates.iter().enumerate() {
            assert!(!candidates[i + 1..].contains(path), "{} listed twice", path.display());
        }
    }
}
