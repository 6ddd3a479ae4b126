//! Per-request client cache.
//!
//! Constructed once per request and passed by reference; never shared
//! across requests. At most one client exists per scope key, so two calls
//! asking for "the admin client" within one request observe the identical
//! connection-bearing handle rather than two short-lived privileged
//! clients (which would exhaust protocol streams under load).

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::BrokerResult;

use super::scoped_client::ScopedClient;

#[derive(Default)]
pub struct RequestScope {
    clients: Mutex<HashMap<String, Arc<ScopedClient>>>,
}

impl RequestScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the cached client for `key`, building it on first use.
    pub(crate) fn get_or_try_insert<F>(&self, key: &str, build: F) -> BrokerResult<Arc<ScopedClient>>
    where
        F: FnOnce() -> BrokerResult<ScopedClient>,
    {
        let mut clients = self.clients.lock();
        if let Some(existing) = clients.get(key) {
            return Ok(Arc::clone(existing));
        }
        let created = Arc::new(build()?);
        clients.insert(key.to_string(), Arc::clone(&created));
        Ok(created)
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.clients.lock().len()
    }
}
