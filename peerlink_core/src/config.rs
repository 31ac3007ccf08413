use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

const APP_QUALIFIER: &str = "com";
const APP_ORGANIZATION: &str = "peerlink";
const APP_NAME: &str = "peerlink";
const CONFIG_FILE: &str = "config.json";

/// Default HTTP port when neither the config file nor `PORT` set one
pub const DEFAULT_HTTP_PORT: u16 = 8080;

/// Default request body limit for uploads (100MB)
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;

/// Default lifetime of a session nobody is listening for (1 hour)
pub const DEFAULT_SESSION_TTL_SECS: u64 = 60 * 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub http_port: u16,
    /// Address the HTTP server and share listeners bind to
    pub bind_host: IpAddr,
    pub upload_dir: PathBuf,
    /// How long a share listener waits for its peer; `None` waits until shutdown
    pub accept_timeout_secs: Option<u64>,
    pub session_ttl_secs: u64,
    pub max_upload_bytes: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            http_port: DEFAULT_HTTP_PORT,
            bind_host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            upload_dir: std::env::temp_dir().join("peerlink-uploads"),
            accept_timeout_secs: None,
            session_ttl_secs: DEFAULT_SESSION_TTL_SECS,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl AppConfig {
    /// Get the config file path
    fn get_config_path() -> Option<PathBuf> {
        if let Ok(dir) = std::env::var("PEERLINK_CONFIG_DIR") {
            return Some(PathBuf::from(dir).join(CONFIG_FILE));
        }

        ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE))
    }

    /// Load config from disk (or defaults), then apply environment overrides
    pub fn load() -> Self {
        let mut config = Self::get_config_path()
            .map(|path| Self::load_from(&path))
            .unwrap_or_default();
        config.apply_overrides(|key| std::env::var(key).ok());
        config
    }

    /// Read a config file; a missing or unreadable file yields the defaults
    pub fn load_from(path: &Path) -> Self {
        let Ok(content) = fs::read_to_string(path) else {
            return Self::default();
        };

        serde_json::from_str(&content).unwrap_or_else(|e| {
            warn!("Ignoring invalid config {}: {}", path.display(), e);
            Self::default()
        })
    }

    /// Apply `PORT`, `PEERLINK_BIND_HOST` and `PEERLINK_UPLOAD_DIR`.
    /// Unparsable values are logged and skipped.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("PORT") {
            match port.trim().parse() {
                Ok(p) => self.http_port = p,
                Err(_) => warn!("Ignoring invalid PORT value: {:?}", port),
            }
        }

        if let Some(host) = lookup("PEERLINK_BIND_HOST") {
            match host.trim().parse() {
                Ok(h) => self.bind_host = h,
                Err(_) => warn!("Ignoring invalid PEERLINK_BIND_HOST value: {:?}", host),
            }
        }

        if let Some(dir) = lookup("PEERLINK_UPLOAD_DIR").filter(|d| !d.trim().is_empty()) {
            self.upload_dir = PathBuf::from(dir);
        }
    }

    pub fn accept_timeout(&self) -> Option<Duration> {
        self.accept_timeout_secs.map(Duration::from_secs)
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }
}
