use anyhow::Context;
use chrono::{FixedOffset, Offset, Utc};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

use crate::registry::{RegistrySettings, MAX_SPACES_PER_BATCH};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub storage: StorageConfig,
    pub api_server: ServerConfig,
    pub reports: ReportsConfig,
    pub spaces: SpacesConfig,
    pub display: DisplayConfig,
    pub frontend: FrontendConfig,
    /// Seconds between periodic stats recomputations
    pub stats_refresh_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Directory holding the JSON blobs of the file backend
    pub state_dir: String,
    pub database_url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    File,
    Sqlite,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportsConfig {
    /// Base URL of the report backend, e.g. `http://localhost:8080/api`
    pub api_base: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpacesConfig {
    pub initial_level_spaces: usize,
    pub new_level_spaces: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Offset used when printing timestamps for staff
    pub utc_offset_hours: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrontendConfig {
    /// Path to directory containing static frontend files
    pub static_dir: Option<String>,
}

impl SpacesConfig {
    pub fn registry_settings(&self) -> RegistrySettings {
        RegistrySettings {
            initial_level_spaces: self.initial_level_spaces,
            new_level_spaces: self.new_level_spaces,
        }
    }
}

impl DisplayConfig {
    pub fn offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_hours * 3600)
            .unwrap_or_else(|| Utc.fix())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage: StorageConfig {
                backend: StorageBackend::File,
                state_dir: "./data".to_string(),
                database_url: "sqlite://./autolavado.db?mode=rwc".to_string(),
                max_connections: 5,
            },
            api_server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 3000,
            },
            reports: ReportsConfig {
                api_base: "http://localhost:8080/api".to_string(),
                timeout_secs: 30,
            },
            spaces: SpacesConfig {
                initial_level_spaces: 10,
                new_level_spaces: 5,
            },
            display: DisplayConfig {
                utc_offset_hours: -3,
            },
            frontend: FrontendConfig { static_dir: None },
            stats_refresh_secs: 60,
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        let backend_str = std::env::var("STORAGE_BACKEND").unwrap_or_else(|_| "file".to_string());
        let backend = match backend_str.to_lowercase().as_str() {
            "file" => StorageBackend::File,
            "sqlite" => StorageBackend::Sqlite,
            "memory" => StorageBackend::Memory,
            other => {
                tracing::warn!(
                    "Unknown STORAGE_BACKEND '{other}', falling back to 'file'. Supported values: file, sqlite, memory"
                );
                StorageBackend::File
            }
        };

        let state_dir = std::env::var("STATE_DIR").unwrap_or(defaults.storage.state_dir);
        let database_url = std::env::var("DATABASE_URL").unwrap_or(defaults.storage.database_url);
        let max_connections = parse_var("DATABASE_MAX_CONNECTIONS", defaults.storage.max_connections)?;

        let api_host = std::env::var("API_HOST").unwrap_or(defaults.api_server.host);
        let api_port = parse_var("API_PORT", defaults.api_server.port)?;

        let reports_api_base = std::env::var("REPORTS_API_BASE").unwrap_or(defaults.reports.api_base);
        let reports_timeout_secs = parse_var("REPORTS_TIMEOUT_SECS", defaults.reports.timeout_secs)?;

        let initial_level_spaces = parse_var("INITIAL_LEVEL_SPACES", defaults.spaces.initial_level_spaces)?;
        let new_level_spaces = parse_var("NEW_LEVEL_SPACES", defaults.spaces.new_level_spaces)?;
        for (name, value) in [
            ("INITIAL_LEVEL_SPACES", initial_level_spaces),
            ("NEW_LEVEL_SPACES", new_level_spaces),
        ] {
            if value > MAX_SPACES_PER_BATCH {
                anyhow::bail!("{name} must be at most {MAX_SPACES_PER_BATCH}, got {value}");
            }
        }

        let utc_offset_hours = parse_var("DISPLAY_UTC_OFFSET_HOURS", defaults.display.utc_offset_hours)?;
        if !(-23..=23).contains(&utc_offset_hours) {
            anyhow::bail!("DISPLAY_UTC_OFFSET_HOURS must be between -23 and 23, got {utc_offset_hours}");
        }

        let stats_refresh_secs = parse_var("STATS_REFRESH_SECS", defaults.stats_refresh_secs)?.max(1);

        let frontend_static_dir = std::env::var("FRONTEND_STATIC_DIR").ok();

        Ok(Config {
            storage: StorageConfig {
                backend,
                state_dir,
                database_url,
                max_connections,
            },
            api_server: ServerConfig {
                host: api_host,
                port: api_port,
            },
            reports: ReportsConfig {
                api_base: reports_api_base,
                timeout_secs: reports_timeout_secs,
            },
            spaces: SpacesConfig {
                initial_level_spaces,
                new_level_spaces,
            },
            display: DisplayConfig { utc_offset_hours },
            frontend: FrontendConfig {
                static_dir: frontend_static_dir,
            },
            stats_refresh_secs,
        })
    }

    /// Fails when the report backend URL resolves to this server's own bind
    /// address, which would make the `/api/reports` proxy call itself.
    pub fn check_reports_backend(&self) -> anyhow::Result<()> {
        let url = Url::parse(&self.reports.api_base)
            .with_context(|| format!("REPORTS_API_BASE is not a valid URL: '{}'", self.reports.api_base))?;
        let host = url.host_str().unwrap_or_default();
        if url.port_or_known_default() == Some(self.api_server.port) && same_host(host, &self.api_server.host) {
            anyhow::bail!(
                "REPORTS_API_BASE '{}' points at this server ({}:{}); set it to the report backend",
                self.reports.api_base,
                self.api_server.host,
                self.api_server.port
            );
        }
        Ok(())
    }
}

/// Whether a URL host reaches a server bound to `bind_host`.
fn same_host(url_host: &str, bind_host: &str) -> bool {
    let url_host = normalize_host(url_host);
    let bind_host = normalize_host(bind_host);
    if url_host == bind_host {
        return true;
    }
    // A wildcard or loopback bind answers on every loopback name
    is_loopback(&url_host) && (is_loopback(&bind_host) || is_unspecified(&bind_host))
}

fn normalize_host(host: &str) -> String {
    host.trim_matches(|c| c == '[' || c == ']').to_ascii_lowercase()
}

fn is_loopback(host: &str) -> bool {
    host == "localhost" || host.parse::<IpAddr>().is_ok_and(|ip| ip.is_loopback())
}

fn is_unspecified(host: &str) -> bool {
    host.parse::<IpAddr>().is_ok_and(|ip| ip.is_unspecified())
}

fn parse_var<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name) {
        Ok(value) => value
            .trim()
            .parse::<T>()
            .with_context(|| format!("{name} has an invalid value '{value}'")),
        Err(_) => Ok(default),
    }
}
