use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;

/// Pre-compiled regex for hostname validation (compiled once at first use)
static HOSTNAME_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9][-a-zA-Z0-9\.]*[a-zA-Z0-9]$").unwrap());

#[derive(Debug, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub server: Option<ServerSection>,
    #[serde(default)]
    pub logging: Option<LoggingSection>,
    #[serde(default)]
    pub cors: Option<CorsSection>,
    #[serde(default)]
    pub queue: Option<QueueSection>,
    #[serde(default)]
    pub storage: Option<StorageSection>,
    #[serde(default)]
    pub meta: Option<MetaSection>,
    #[serde(default)]
    pub media: Option<MediaSection>,
}

#[derive(Debug, Deserialize)]
pub struct ServerSection {
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
}

#[derive(Debug, Deserialize)]
pub struct LoggingSection {
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub json: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct CorsSection {
    #[serde(default)]
    pub allowed_origins: Option<Vec<String>>,
    #[serde(default)]
    pub allow_all_origins: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct QueueSection {
    #[serde(default)]
    pub backend: Option<String>,
    #[serde(default)]
    pub redis_url: Option<String>,
    #[serde(default)]
    pub key: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StorageSection {
    #[serde(default)]
    pub root: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MetaSection {
    #[serde(default)]
    pub ttl_seconds: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct MediaSection {
    #[serde(default)]
    pub allowed_domains: Option<Vec<String>>,
    #[serde(default)]
    pub ytdlp_path: Option<String>,
    #[serde(default)]
    pub ffmpeg_path: Option<String>,
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("Io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Load a RawConfigFile from a path. The format is inferred from the extension: .toml, .yaml/.yml, .json
pub fn load_raw_from_file<P: AsRef<Path>>(path: P) -> Result<RawConfigFile, ConfigError> {
    let path = path.as_ref();
    let s = fs::read_to_string(path)?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_ascii_lowercase());
    parse_config_str(&s, ext.as_deref())
}

/// Parse configuration from a string with optional format hint
#[inline]
fn parse_config_str(s: &str, ext: Option<&str>) -> Result<RawConfigFile, ConfigError> {
    match ext {
        #[cfg(feature = "toml")]
        Some("toml") => toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string())),
        #[cfg(feature = "yaml")]
        Some("yaml" | "yml") => {
            serde_yaml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))
        }
        #[cfg(feature = "json")]
        Some("json") => serde_json::from_str(s).map_err(|e| ConfigError::Parse(e.to_string())),
        _ => parse_config_auto(s),
    }
}

/// Try to parse config by attempting each enabled format
#[inline]
fn parse_config_auto(s: &str) -> Result<RawConfigFile, ConfigError> {
    #[cfg(feature = "yaml")]
    if let Ok(cfg) = serde_yaml::from_str(s) {
        return Ok(cfg);
    }

    #[cfg(feature = "toml")]
    if let Ok(cfg) = toml::from_str(s) {
        return Ok(cfg);
    }

    #[cfg(feature = "json")]
    if let Ok(cfg) = serde_json::from_str(s) {
        return Ok(cfg);
    }

    #[cfg(any(feature = "yaml", feature = "toml", feature = "json"))]
    {
        Err(ConfigError::Parse(
            "failed to parse config as any supported format".into(),
        ))
    }

    #[cfg(not(any(feature = "yaml", feature = "toml", feature = "json")))]
    {
        let _ = s; // suppress unused warning
        Err(ConfigError::Parse("no config format enabled".into()))
    }
}

/// Concrete application configuration with defaults.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub cors: CorsConfig,
    pub queue: QueueConfig,
    pub storage: StorageConfig,
    pub meta: MetaConfig,
    pub media: MediaConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
    pub allow_all_origins: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueueConfig {
    /// Queue backend: "memory" (in-process worker) or "redis" (external workers).
    pub backend: String,
    pub redis_url: Option<String>,
    /// Redis list key the queue pushes descriptors onto.
    pub key: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StorageConfig {
    /// Root directory for per-job work directories.
    pub root: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetaConfig {
    /// TTL applied to every metadata record write.
    pub ttl_seconds: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MediaConfig {
    /// Source URL hosts accepted by the submission endpoint.
    pub allowed_domains: Vec<String>,
    pub ytdlp_path: String,
    pub ffmpeg_path: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8000,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                json: false,
            },
            cors: CorsConfig {
                allowed_origins: Vec::new(),
                allow_all_origins: false,
            },
            queue: QueueConfig {
                backend: "memory".to_string(),
                redis_url: None,
                key: "mediagrab:queue".to_string(),
            },
            storage: StorageConfig {
                root: "./storage".to_string(),
            },
            meta: MetaConfig { ttl_seconds: 3600 },
            media: MediaConfig {
                allowed_domains: vec![
                    "www.youtube.com".to_string(),
                    "youtube.com".to_string(),
                    "m.youtube.com".to_string(),
                    "youtu.be".to_string(),
                ],
                ytdlp_path: "yt-dlp".to_string(),
                ffmpeg_path: "ffmpeg".to_string(),
            },
        }
    }
}

#[inline]
fn parse_bool(s: &str) -> Result<bool, ()> {
    let bytes = s.as_bytes();
    match bytes {
        b"1" | b"true" | b"TRUE" | b"True" | b"yes" | b"YES" | b"Yes" | b"y" | b"Y" => Ok(true),
        b"0" | b"false" | b"FALSE" | b"False" | b"no" | b"NO" | b"No" | b"n" | b"N" => Ok(false),
        _ => match s.to_ascii_lowercase().as_str() {
            "true" | "yes" | "y" => Ok(true),
            "false" | "no" | "n" => Ok(false),
            _ => Err(()),
        },
    }
}

#[inline]
fn split_csv(s: &str) -> Vec<String> {
    s.split(',')
        .filter_map(|p| {
            let trimmed = p.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        })
        .collect()
}

/// Helper macro to apply optional value if present
macro_rules! apply_opt {
    ($target:expr, $source:expr) => {
        if let Some(v) = $source {
            $target = v;
        }
    };
    ($target:expr, $source:expr, wrap) => {
        if let Some(v) = $source {
            $target = Some(v);
        }
    };
}

/// Load concrete `Config` from optional file and environment variables.
/// Environment variables take precedence over file values and defaults.
pub fn load_config<P: AsRef<Path>>(path: Option<P>) -> Result<Config, ConfigError> {
    let mut cfg = Config::default();

    // Start with file values if provided
    if let Some(p) = path {
        let raw = load_raw_from_file(p)?;
        if let Some(server) = raw.server {
            apply_opt!(cfg.server.host, server.host);
            apply_opt!(cfg.server.port, server.port);
        }
        if let Some(logging) = raw.logging {
            apply_opt!(cfg.logging.level, logging.level);
            apply_opt!(cfg.logging.json, logging.json);
        }
        if let Some(cors) = raw.cors {
            apply_opt!(cfg.cors.allowed_origins, cors.allowed_origins);
            apply_opt!(cfg.cors.allow_all_origins, cors.allow_all_origins);
        }
        if let Some(queue) = raw.queue {
            apply_opt!(cfg.queue.backend, queue.backend);
            apply_opt!(cfg.queue.redis_url, queue.redis_url, wrap);
            apply_opt!(cfg.queue.key, queue.key);
        }
        if let Some(storage) = raw.storage {
            apply_opt!(cfg.storage.root, storage.root);
        }
        if let Some(meta) = raw.meta {
            apply_opt!(cfg.meta.ttl_seconds, meta.ttl_seconds);
        }
        if let Some(media) = raw.media {
            apply_opt!(cfg.media.allowed_domains, media.allowed_domains);
            apply_opt!(cfg.media.ytdlp_path, media.ytdlp_path);
            apply_opt!(cfg.media.ffmpeg_path, media.ffmpeg_path);
        }
    }

    // Apply environment variable overrides (env takes precedence)
    apply_env_overrides(&mut cfg)?;

    Ok(cfg)
}

/// Helper to parse env var as a specific type
#[inline]
fn env_parse<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(v) => v
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::Parse(format!("invalid {}: {}", key, e))),
        Err(_) => Ok(None),
    }
}

/// Helper to parse env var as bool
#[inline]
fn env_bool(key: &str) -> Result<Option<bool>, ConfigError> {
    match env::var(key) {
        Ok(v) => parse_bool(&v)
            .map(Some)
            .map_err(|_| ConfigError::Parse(format!("invalid {}", key))),
        Err(_) => Ok(None),
    }
}

/// Helper to get env var as string
#[inline]
fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

/// Apply all environment variable overrides to config
fn apply_env_overrides(cfg: &mut Config) -> Result<(), ConfigError> {
    // Server
    if let Some(v) = env_str("MEDIAGRAB_SERVER_HOST") {
        cfg.server.host = v;
    }
    if let Some(v) = env_parse::<u16>("MEDIAGRAB_SERVER_PORT")? {
        cfg.server.port = v;
    }

    // Logging
    if let Some(v) = env_str("MEDIAGRAB_LOG_LEVEL") {
        cfg.logging.level = v;
    }
    if let Some(v) = env_bool("MEDIAGRAB_LOG_JSON")? {
        cfg.logging.json = v;
    }

    // CORS
    if let Some(v) = env_str("MEDIAGRAB_CORS_ALLOWED_ORIGINS") {
        cfg.cors.allowed_origins = split_csv(&v);
    }
    if let Some(v) = env_bool("MEDIAGRAB_CORS_ALLOW_ALL_ORIGINS")? {
        cfg.cors.allow_all_origins = v;
    }

    // Queue
    if let Some(v) = env_str("MEDIAGRAB_QUEUE_BACKEND") {
        cfg.queue.backend = v;
    }
    if let Some(v) = env_str("MEDIAGRAB_REDIS_URL") {
        cfg.queue.redis_url = Some(v);
    }
    if let Some(v) = env_str("MEDIAGRAB_QUEUE_KEY") {
        cfg.queue.key = v;
    }

    // Storage
    if let Some(v) = env_str("MEDIAGRAB_STORAGE_ROOT") {
        cfg.storage.root = v;
    }

    // Metadata store
    if let Some(v) = env_parse::<u64>("MEDIAGRAB_META_TTL_SECONDS")? {
        cfg.meta.ttl_seconds = v;
    }

    // Media engine
    if let Some(v) = env_str("MEDIAGRAB_ALLOWED_DOMAINS") {
        cfg.media.allowed_domains = split_csv(&v);
    }
    if let Some(v) = env_str("MEDIAGRAB_YTDLP_PATH") {
        cfg.media.ytdlp_path = v;
    }
    if let Some(v) = env_str("MEDIAGRAB_FFMPEG_PATH") {
        cfg.media.ffmpeg_path = v;
    }

    Ok(())
}

/// Validate higher-level constraints on the resolved configuration.
pub fn validate_config(cfg: &Config) -> Result<(), ConfigError> {
    // server port range
    if cfg.server.port == 0 {
        return Err(ConfigError::Validation("server.port must be > 0".into()));
    }
    // validate server.host: allow IPs or simple hostname pattern
    let host_ok = cfg.server.host.parse::<std::net::IpAddr>().is_ok()
        || HOSTNAME_REGEX.is_match(&cfg.server.host);
    if !host_ok {
        return Err(ConfigError::Validation(format!(
            "invalid server.host: {}",
            cfg.server.host
        )));
    }

    // queue backend supported
    match cfg.queue.backend.as_str() {
        "memory" => {}
        "redis" => {
            if cfg
                .queue
                .redis_url
                .as_deref()
                .map(|s| s.is_empty())
                .unwrap_or(true)
            {
                return Err(ConfigError::Validation(
                    "queue.redis_url must be set for the redis backend".to_string(),
                ));
            }
        }
        other => {
            return Err(ConfigError::Validation(format!(
                "unsupported queue backend: {}",
                other
            )))
        }
    }

    if cfg.storage.root.is_empty() {
        return Err(ConfigError::Validation(
            "storage.root must not be empty".to_string(),
        ));
    }

    if cfg.meta.ttl_seconds == 0 {
        return Err(ConfigError::Validation(
            "meta.ttl_seconds must be > 0".to_string(),
        ));
    }

    if cfg.media.allowed_domains.is_empty() {
        return Err(ConfigError::Validation(
            "media.allowed_domains must not be empty".to_string(),
        ));
    }

    // Validate CORS allowed origins are valid URLs (if present)
    if !cfg.cors.allowed_origins.is_empty() {
        for origin in &cfg.cors.allowed_origins {
            if origin == "*" {
                continue;
            }
            match url::Url::parse(origin) {
                Ok(u) => {
                    let scheme = u.scheme();
                    if scheme != "http" && scheme != "https" {
                        return Err(ConfigError::Validation(format!(
                            "CORS origin must be http or https: {}",
                            origin
                        )));
                    }
                }
                Err(_) => {
                    return Err(ConfigError::Validation(format!(
                        "invalid CORS origin: {}",
                        origin
                    )))
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn parse_toml() {
        let f = NamedTempFile::new().expect("tmpfile");
        std::fs::write(
            f.path(),
            r#"
[server]
host = "127.0.0.1"
port = 8000

[queue]
backend = "redis"
redis_url = "redis://127.0.0.1:6379/0"
"#,
        )
        .unwrap();
        let cfg = load_raw_from_file(f.path()).expect("load");
        assert!(cfg.server.is_some());
        assert!(cfg.queue.is_some());
        let q = cfg.queue.unwrap();
        assert_eq!(q.backend.unwrap(), "redis");
        assert_eq!(q.redis_url.unwrap(), "redis://127.0.0.1:6379/0");
    }

    #[test]
    fn parse_yaml() {
        let f = NamedTempFile::new().expect("tmpfile");
        std::fs::write(
            f.path(),
            r#"
server:
  host: 0.0.0.0
  port: 9000
storage:
  root: /var/lib/mediagrab
media:
  allowed_domains:
    - youtu.be
"#,
        )
        .unwrap();
        let cfg = load_raw_from_file(f.path()).expect("load");
        let s = cfg.server.unwrap();
        assert_eq!(s.host.unwrap(), "0.0.0.0");
        assert_eq!(s.port.unwrap(), 9000);
        assert_eq!(cfg.storage.unwrap().root.unwrap(), "/var/lib/mediagrab");
        assert_eq!(
            cfg.media.unwrap().allowed_domains.unwrap(),
            vec!["youtu.be".to_string()]
        );
    }

    #[test]
    fn env_overrides() {
        // Clear any related env vars first to avoid interference
        for k in &[
            "MEDIAGRAB_SERVER_HOST",
            "MEDIAGRAB_SERVER_PORT",
            "MEDIAGRAB_META_TTL_SECONDS",
            "MEDIAGRAB_STORAGE_ROOT",
            "MEDIAGRAB_ALLOWED_DOMAINS",
        ] {
            std::env::remove_var(k);
        }

        std::env::set_var("MEDIAGRAB_SERVER_HOST", "10.1.2.3");
        std::env::set_var("MEDIAGRAB_SERVER_PORT", "1234");
        std::env::set_var("MEDIAGRAB_META_TTL_SECONDS", "120");
        std::env::set_var("MEDIAGRAB_STORAGE_ROOT", "/tmp/grab");
        std::env::set_var("MEDIAGRAB_ALLOWED_DOMAINS", "youtube.com, youtu.be");

        let cfg = load_config::<&Path>(None).expect("load config");
        assert_eq!(cfg.server.host, "10.1.2.3");
        assert_eq!(cfg.server.port, 1234);
        assert_eq!(cfg.meta.ttl_seconds, 120);
        assert_eq!(cfg.storage.root, "/tmp/grab");
        assert_eq!(cfg.media.allowed_domains.len(), 2);

        // cleanup
        for k in &[
            "MEDIAGRAB_SERVER_HOST",
            "MEDIAGRAB_SERVER_PORT",
            "MEDIAGRAB_META_TTL_SECONDS",
            "MEDIAGRAB_STORAGE_ROOT",
            "MEDIAGRAB_ALLOWED_DOMAINS",
        ] {
            std::env::remove_var(k);
        }
    }

    #[test]
    fn csv_split() {
        let s = "https://a.example, https://b.example, , https://c.example";
        let parts = split_csv(s);
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "https://a.example");
        assert_eq!(parts[1], "https://b.example");
        assert_eq!(parts[2], "https://c.example");
    }

    #[test]
    fn redis_backend_requires_url() {
        let mut cfg = Config::default();
        cfg.queue.backend = "redis".to_string();
        cfg.queue.redis_url = None;
        assert!(validate_config(&cfg).is_err());

        cfg.queue.redis_url = Some("redis://127.0.0.1:6379/0".to_string());
        assert!(validate_config(&cfg).is_ok());
    }

    #[test]
    fn rejects_unknown_queue_backend() {
        let mut cfg = Config::default();
        cfg.queue.backend = "rabbitmq".to_string();
        assert!(validate_config(&cfg).is_err());
    }

    #[test]
    fn defaults_validate() {
        let cfg = Config::default();
        validate_config(&cfg).expect("defaults should validate");
    }
}
