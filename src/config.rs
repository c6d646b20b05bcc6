use crate::error::ConfigError;
use std::net::SocketAddr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct MimirConfig {
    /// Address to bind the HTTP API to
    pub http_bind_addr: SocketAddr,

    /// Directory scanned for trust-anchor zone files (None = no anchors)
    pub anchor_dir: Option<String>,

    /// Lifetime of a cached referral entry
    pub referral_ttl: Duration,

    /// Timeout for a single UDP or TCP exchange with a nameserver
    pub query_timeout: Duration,

    /// Port queried on nameservers
    pub query_port: u16,

    /// Default root nameserver hint seeded into the referral cache
    pub root_hint: String,

    /// Number of worker threads for the Tokio runtime (0 = use default)
    pub worker_threads: usize,
}

impl Default for MimirConfig {
    fn default() -> Self {
        Self {
            http_bind_addr: "127.0.0.1:8080"
                .parse()
                .expect("Default HTTP bind address is valid"),
            anchor_dir: None,
            referral_ttl: Duration::from_secs(30),
            query_timeout: Duration::from_secs(5),
            query_port: 53,
            root_hint: "a.root-servers.net.".to_string(),
            worker_threads: 0,
        }
    }
}

impl MimirConfig {
    /// Build a configuration from `MIMIR_*` environment variables, falling
    /// back to defaults for anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(bind_addr) = std::env::var("MIMIR_HTTP_BIND_ADDR") {
            config.http_bind_addr = bind_addr
                .parse()
                .map_err(|_| ConfigError::InvalidBindAddress(bind_addr))?;
        }

        if let Ok(anchor_dir) = std::env::var("MIMIR_ANCHOR_DIR") {
            if !anchor_dir.is_empty() {
                config.anchor_dir = Some(anchor_dir);
            }
        }

        if let Ok(ttl_str) = std::env::var("MIMIR_REFERRAL_TTL") {
            let ttl_secs = ttl_str
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidTimeout(ttl_str.clone()))?;
            if ttl_secs == 0 {
                return Err(ConfigError::InvalidTimeout(
                    "Referral TTL must be greater than 0".to_string(),
                ));
            }
            config.referral_ttl = Duration::from_secs(ttl_secs);
        }

        if let Ok(timeout_str) = std::env::var("MIMIR_QUERY_TIMEOUT") {
            let timeout_secs = timeout_str
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidTimeout(timeout_str.clone()))?;
            if timeout_secs == 0 {
                return Err(ConfigError::InvalidTimeout(
                    "Query timeout must be greater than 0".to_string(),
                ));
            }
            config.query_timeout = Duration::from_secs(timeout_secs);
        }

        if let Ok(port_str) = std::env::var("MIMIR_QUERY_PORT") {
            config.query_port = port_str
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidPort(port_str.clone()))?;
            if config.query_port == 0 {
                return Err(ConfigError::InvalidPort(port_str));
            }
        }

        if let Ok(root_hint) = std::env::var("MIMIR_ROOT_HINT") {
            if root_hint.is_empty() {
                return Err(ConfigError::InvalidRootHint(root_hint));
            }
            config.root_hint = root_hint;
        }

        if let Ok(worker_threads) = std::env::var("MIMIR_WORKER_THREADS") {
            config.worker_threads = worker_threads.parse::<usize>().map_err(|_| {
                ConfigError::ParseError(format!("Invalid worker threads: {}", worker_threads))
            })?;
        }

        Ok(config)
    }
}
