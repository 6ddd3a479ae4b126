//! tutela: authenticated data-access broker.
//!
//! Sits between the HTTP boundary and the backing store: issues and
//! verifies session tokens, hands out correctly-scoped data clients so
//! row-level security is enforced rather than bypassed, retries transient
//! transport failures, and resolves cross-principal capabilities over the
//! guardianship graph. Collaborators never construct their own transport;
//! they ask the broker for a scoped client.

pub mod broker;
pub mod config;
pub mod error;
pub mod identity;
pub mod permissions;
pub mod pool;
pub mod retry;
pub mod token;

use std::sync::Arc;

use broker::ScopedClientBroker;
use config::BrokerConfig;
use error::BrokerResult;
use identity::SessionManager;
use pool::ConnectionPool;
use token::TokenCodec;

/// Application context owning the process-wide pieces (config, transport
/// pool, codec, client broker, session manager). Constructed once at
/// startup and passed by reference; tests build isolated instances.
pub struct Broker {
    pub config: Arc<BrokerConfig>,
    pub pool: Arc<ConnectionPool>,
    pub codec: Arc<TokenCodec>,
    pub clients: ScopedClientBroker,
    pub sessions: SessionManager,
}

impl Broker {
    pub fn new(config: BrokerConfig) -> BrokerResult<Self> {
        let config = Arc::new(config);
        let pool = Arc::new(ConnectionPool::new(&config));
        let codec = Arc::new(TokenCodec::new(&config)?);
        let clients = ScopedClientBroker::new(Arc::clone(&config), Arc::clone(&pool))?;
        let sessions = SessionManager::new(Arc::clone(&codec));
        Ok(Self { config, pool, codec, clients, sessions })
    }

    /// Build from the process environment. Missing mandatory configuration
    /// aborts startup here rather than degrading later.
    pub fn from_env() -> BrokerResult<Self> {
        Self::new(BrokerConfig::from_env()?)
    }

    /// Tear down shared transport state. Idempotent; intended for
    /// process-exit hooks.
    pub fn shutdown(&self) {
        self.pool.shutdown();
    }
}
