//! Process-wide HTTP transport shared by every scoped data client.
//!
//! reqwest's `Client` already multiplexes an internal connection pool and is
//! cheap to clone, so the broker hands out clones of one lazily-built
//! instance. Idle connections are evicted after ~30s, deliberately shorter
//! than common intermediary idle-close windows, so a half-closed connection
//! is never handed back out as live.

use parking_lot::Mutex;
use std::time::Duration;
use tracing::info;

use crate::config::BrokerConfig;
use crate::error::{BrokerError, BrokerResult};

pub struct ConnectionPool {
    max_idle: usize,
    idle_timeout: Duration,
    request_timeout: Duration,
    slot: Mutex<Option<reqwest::Client>>,
}

impl ConnectionPool {
    pub fn new(cfg: &BrokerConfig) -> Self {
        Self {
            max_idle: cfg.pool_max_idle,
            idle_timeout: cfg.pool_idle_timeout,
            request_timeout: cfg.request_timeout,
            slot: Mutex::new(None),
        }
    }

    /// Return the shared transport, building it on first call. Concurrent
    /// first-callers serialize on the slot lock and converge on one client.
    pub fn handle(&self) -> BrokerResult<reqwest::Client> {
        let mut slot = self.slot.lock();
        if let Some(client) = slot.as_ref() {
            return Ok(client.clone());
        }
        let client = reqwest::Client::builder()
            .pool_max_idle_per_host(self.max_idle)
            .pool_idle_timeout(self.idle_timeout)
            .timeout(self.request_timeout)
            .build()
            .map_err(|e| BrokerError::Configuration(format!("transport init failed: {}", e)))?;
        info!(
            "connection pool initialized (max_idle={}, idle_timeout={}s)",
            self.max_idle,
            self.idle_timeout.as_secs()
        );
        *slot = Some(client.clone());
        Ok(client)
    }

    /// Drop the shared transport. Idempotent; safe from process-exit hooks.
    /// Outstanding clones keep their connections until they drop too.
    pub fn shutdown(&self) {
        if self.slot.lock().take().is_some() {
            info!("connection pool shut down");
        }
    }
}
