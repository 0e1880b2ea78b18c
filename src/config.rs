/// Configuration management for Simple Skins
use crate::error::{SkinError, SkinResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_UUID_URL: &str = "https://api.ashcon.app/mojang/v2/uuid/";
pub const DEFAULT_PROFILE_URL: &str = "https://sessionserver.mojang.com/session/minecraft/profile/";
pub const DEFAULT_FALLBACK_PROFILE_URL: &str = "https://api.ashcon.app/mojang/v2/user/";

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkinsConfig {
    pub storage: StorageConfig,
    pub endpoints: EndpointConfig,
    pub cache: CacheConfig,
    pub workers: WorkerConfig,
    /// Usernames resolved at startup into the default skin pool
    pub default_skins: Vec<String>,
    /// Whether the proxy authenticates players against the identity service
    pub online_mode: bool,
    pub logging: LoggingConfig,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_directory: PathBuf,
    pub users_db: PathBuf,
}

/// Identity and texture endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// Name -> UUID lookup, the name is appended
    pub uuid_url: String,
    /// Primary texture endpoint, the undashed UUID is appended
    pub profile_url: String,
    /// Alternate texture endpoint used when the primary one is rate limited
    pub fallback_profile_url: String,
    /// Connect timeout in milliseconds; the read timeout is twice this
    pub timeout_ms: u64,
    pub user_agent: String,
}

/// In-memory result cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub ttl_secs: u64,
    pub sweep_interval_secs: u64,
}

/// Worker pool configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    pub size: usize,
    pub shutdown_grace_ms: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            uuid_url: DEFAULT_UUID_URL.to_string(),
            profile_url: DEFAULT_PROFILE_URL.to_string(),
            fallback_profile_url: DEFAULT_FALLBACK_PROFILE_URL.to_string(),
            timeout_ms: 6000,
            user_agent: default_user_agent(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 60,
            sweep_interval_secs: 15,
        }
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            size: default_worker_count(),
            shutdown_grace_ms: 5000,
        }
    }
}

impl EndpointConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms * 2)
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

impl WorkerConfig {
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}

fn default_user_agent() -> String {
    format!("SimpleSkins-rust/{}", env!("CARGO_PKG_VERSION"))
}

fn default_worker_count() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

impl SkinsConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> SkinResult<Self> {
        dotenv::dotenv().ok();

        let data_directory: PathBuf = env::var("SKINS_DATA_DIRECTORY")
            .unwrap_or_else(|_| "./data".to_string())
            .into();
        let users_db = env::var("SKINS_DB_LOCATION")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_directory.join("users.sqlite"));

        let defaults = EndpointConfig::default();
        let uuid_url = env::var("SKINS_UUID_URL").unwrap_or(defaults.uuid_url);
        let profile_url = env::var("SKINS_PROFILE_URL").unwrap_or(defaults.profile_url);
        let fallback_profile_url =
            env::var("SKINS_FALLBACK_PROFILE_URL").unwrap_or(defaults.fallback_profile_url);
        let timeout_ms = env::var("SKINS_HTTP_TIMEOUT_MS")
            .unwrap_or_else(|_| defaults.timeout_ms.to_string())
            .parse()
            .map_err(|_| SkinError::Config("Invalid HTTP timeout".to_string()))?;
        let user_agent = env::var("SKINS_USER_AGENT").unwrap_or(defaults.user_agent);

        let default_skins = env::var("SKINS_DEFAULT_SKINS")
            .unwrap_or_else(|_| String::new())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect::<Vec<String>>();

        let online_mode = env::var("SKINS_ONLINE_MODE")
            .unwrap_or_else(|_| "false".to_string())
            .parse()
            .unwrap_or(false);

        let ttl_secs = env::var("SKINS_CACHE_TTL_SECS")
            .unwrap_or_else(|_| "60".to_string())
            .parse()
            .unwrap_or(60);
        let sweep_interval_secs = env::var("SKINS_CACHE_SWEEP_SECS")
            .unwrap_or_else(|_| "15".to_string())
            .parse()
            .unwrap_or(15);

        let size = match env::var("SKINS_WORKERS") {
            Ok(raw) => raw
                .parse()
                .map_err(|_| SkinError::Config(format!("Invalid worker count: {}", raw)))?,
            Err(_) => default_worker_count(),
        };
        let shutdown_grace_ms = env::var("SKINS_SHUTDOWN_GRACE_MS")
            .unwrap_or_else(|_| "5000".to_string())
            .parse()
            .unwrap_or(5000);

        let level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
        let json = env::var("SKINS_LOG_FORMAT")
            .map(|f| f.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        Ok(SkinsConfig {
            storage: StorageConfig {
                data_directory,
                users_db,
            },
            endpoints: EndpointConfig {
                uuid_url,
                profile_url,
                fallback_profile_url,
                timeout_ms,
                user_agent,
            },
            cache: CacheConfig {
                ttl_secs,
                sweep_interval_secs,
            },
            workers: WorkerConfig {
                size,
                shutdown_grace_ms,
            },
            default_skins,
            online_mode,
            logging: LoggingConfig { level, json },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> SkinResult<()> {
        let urls = [
            ("uuid", &self.endpoints.uuid_url),
            ("profile", &self.endpoints.profile_url),
            ("fallback profile", &self.endpoints.fallback_profile_url),
        ];
        for (label, url) in urls {
            if url.trim().is_empty() {
                return Err(SkinError::Config(format!("The {} URL cannot be empty", label)));
            }
        }

        if self.endpoints.timeout_ms == 0 {
            return Err(SkinError::Config("HTTP timeout must be positive".to_string()));
        }

        if self.cache.ttl_secs == 0 || self.cache.sweep_interval_secs == 0 {
            return Err(SkinError::Config(
                "Cache TTL and sweep interval must be positive".to_string(),
            ));
        }

        if self.workers.size == 0 {
            return Err(SkinError::Config("Worker pool needs at least one worker".to_string()));
        }

        Ok(())
    }
}
