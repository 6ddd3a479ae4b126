//! Broker configuration, read once at process start.
//! Mandatory keys (signing secret, store URL, anonymous key) are fatal when
//! absent; the privileged service key is only fatal when an admin client is
//! first requested.

use std::time::Duration;

use crate::error::{BrokerError, BrokerResult};

#[derive(Debug, Clone)]
pub struct BrokerConfig {
    /// HS256 signing secret for session tokens. Never defaulted.
    pub signing_secret: String,
    /// Base URL of the backing store (PostgREST-style REST surface).
    pub store_url: String,
    /// Anonymous/publishable key; sent as `apikey` on every request.
    pub anon_key: String,
    /// Privileged service-role key. Optional at startup; required the first
    /// time an admin-scoped client is constructed.
    pub service_key: Option<String>,

    pub pool_max_idle: usize,
    /// Idle connection eviction. Kept under typical intermediary idle-close
    /// windows so a half-closed connection is never handed back out.
    pub pool_idle_timeout: Duration,
    pub request_timeout: Duration,

    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
    pub masquerade_ttl: Duration,

    /// Whether the deployment is same-origin. Cross-origin deployments must
    /// never consult the cookie credential path.
    pub same_origin: bool,
}

impl BrokerConfig {
    /// Minimal constructor with production defaults for the tunables.
    pub fn new<S: Into<String>>(signing_secret: S, store_url: S, anon_key: S) -> Self {
        Self {
            signing_secret: signing_secret.into(),
            store_url: store_url.into(),
            anon_key: anon_key.into(),
            service_key: None,
            pool_max_idle: 8,
            pool_idle_timeout: Duration::from_secs(30),
            request_timeout: Duration::from_secs(20),
            access_ttl: Duration::from_secs(15 * 60),
            refresh_ttl: Duration::from_secs(14 * 24 * 3600),
            masquerade_ttl: Duration::from_secs(3600),
            same_origin: true,
        }
    }

    /// Read the configuration surface from the process environment.
    pub fn from_env() -> BrokerResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env`, but over an arbitrary lookup so tests do not race
    /// on process-global environment state.
    pub fn from_lookup<F: Fn(&str) -> Option<String>>(get: F) -> BrokerResult<Self> {
        let required = |key: &str| -> BrokerResult<String> {
            match get(key) {
                Some(v) if !v.trim().is_empty() => Ok(v),
                _ => Err(BrokerError::Configuration(format!("{} is not set", key))),
            }
        };
        let secs = |key: &str, default: u64| -> Duration {
            Duration::from_secs(get(key).and_then(|s| s.parse::<u64>().ok()).unwrap_or(default))
        };

        let mut cfg = Self::new(
            required("TUTELA_SIGNING_SECRET")?,
            required("TUTELA_STORE_URL")?,
            required("TUTELA_ANON_KEY")?,
        );
        cfg.service_key = get("TUTELA_SERVICE_KEY").filter(|v| !v.trim().is_empty());
        cfg.pool_max_idle = get("TUTELA_POOL_MAX_IDLE")
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(cfg.pool_max_idle);
        cfg.pool_idle_timeout = secs("TUTELA_POOL_IDLE_SECS", 30);
        cfg.request_timeout = secs("TUTELA_REQUEST_TIMEOUT_SECS", 20);
        cfg.access_ttl = secs("TUTELA_ACCESS_TTL_SECS", 15 * 60);
        cfg.refresh_ttl = secs("TUTELA_REFRESH_TTL_SECS", 14 * 24 * 3600);
        cfg.masquerade_ttl = secs("TUTELA_MASQUERADE_TTL_SECS", 3600);
        cfg.same_origin = get("TUTELA_SAME_ORIGIN")
            .map(|v| v != "0" && !v.eq_ignore_ascii_case("false"))
            .unwrap_or(true);
        Ok(cfg)
    }
}

/// Install a tracing subscriber honoring `RUST_LOG`. Safe to call more than
/// once; later calls are no-ops.
pub fn init_logging() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
}
