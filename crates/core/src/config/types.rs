use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub view: ViewConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    8080
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("mediathek.db")
}

/// Catalog sync configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SyncConfig {
    /// Run the periodic sync loop (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Where the list of catalog mirrors is published
    #[serde(default = "default_mirror_list_url")]
    pub mirror_list_url: String,
    /// Refresh the mirror list when older than this many whole days (default: 7)
    #[serde(default = "default_mirror_list_update_after_days")]
    pub mirror_list_update_after_days: u32,
    /// Refresh the catalog when older than this many whole hours (default: 3)
    #[serde(default = "default_catalog_update_after_hours")]
    pub catalog_update_after_hours: u32,
    /// How often the sync loop checks for stale data (default: 3600)
    #[serde(default = "default_check_interval")]
    pub check_interval_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Connect timeout for remote transfers in seconds (default: 30)
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Seed for mirror selection; random when unset
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            mirror_list_url: default_mirror_list_url(),
            mirror_list_update_after_days: default_mirror_list_update_after_days(),
            catalog_update_after_hours: default_catalog_update_after_hours(),
            check_interval_secs: default_check_interval(),
            user_agent: default_user_agent(),
            connect_timeout_secs: default_connect_timeout(),
            seed: None,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_mirror_list_url() -> String {
    "http://zdfmediathk.sourceforge.net/akt.xml".to_string()
}

fn default_mirror_list_update_after_days() -> u32 {
    7
}

fn default_catalog_update_after_hours() -> u32 {
    3
}

fn default_check_interval() -> u64 {
    3600
}

fn default_user_agent() -> String {
    format!("mediathek/{}", env!("CARGO_PKG_VERSION"))
}

fn default_connect_timeout() -> u64 {
    30
}

/// Lazy view configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ViewConfig {
    /// Rows added per fetch (default: 256)
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// Full records kept in memory (default: 1024)
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            cache_capacity: default_cache_capacity(),
        }
    }
}

fn default_page_size() -> usize {
    256
}

fn default_cache_capacity() -> usize {
    1024
}

/// Config for API responses
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub sync: SanitizedSyncConfig,
    pub view: ViewConfig,
}

/// Sync config without the mirror selection seed
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedSyncConfig {
    pub enabled: bool,
    pub mirror_list_url: String,
    pub mirror_list_update_after_days: u32,
    pub catalog_update_after_hours: u32,
    pub check_interval_secs: u64,
    pub seeded: bool,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            database: config.database.clone(),
            sync: SanitizedSyncConfig {
                enabled: config.sync.enabled,
                mirror_list_url: config.sync.mirror_list_url.clone(),
                mirror_list_update_after_days: config.sync.mirror_list_update_after_days,
                catalog_update_after_hours: config.sync.catalog_update_after_hours,
                check_interval_secs: config.sync.check_interval_secs,
                seeded: config.sync.seed.is_some(),
            },
            view: config.view.clone(),
        }
    }
}
