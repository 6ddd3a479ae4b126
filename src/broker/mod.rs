//! Scoped client selection and caching.
//!
//! Three client flavors exist: anonymous, user-scoped (RLS enforced via the
//! caller's access token), and admin (service role; bypasses RLS and is
//! reserved for explicitly administrative operations). All of them share
//! one process-wide transport; constructing a fresh transport per client
//! is the anti-pattern this module exists to prevent.

mod request_scope;
mod scoped_client;

pub use request_scope::RequestScope;
pub use scoped_client::{Scope, ScopedClient, TableRequest};

use once_cell::sync::OnceCell;
use reqwest::Url;
use std::sync::Arc;
use tracing::warn;

use crate::config::BrokerConfig;
use crate::error::{BrokerError, BrokerResult};
use crate::identity::Credential;
use crate::pool::ConnectionPool;
use crate::token::token_preview;

/// Length of the signature slice used in user cache keys. The header and
/// payload segments share long constant prefixes across tokens, so the key
/// is taken from the signature segment, which varies with every claim set.
const CACHE_TAG_LEN: usize = 12;

const ANON_KEY: &str = "anon";
const ADMIN_KEY: &str = "admin";

pub struct ScopedClientBroker {
    cfg: Arc<BrokerConfig>,
    pool: Arc<ConnectionPool>,
    base: Url,
    admin_slot: OnceCell<Arc<ScopedClient>>,
}

impl ScopedClientBroker {
    pub fn new(cfg: Arc<BrokerConfig>, pool: Arc<ConnectionPool>) -> BrokerResult<Self> {
        if cfg.anon_key.trim().is_empty() {
            return Err(BrokerError::Configuration("anonymous key is not set".into()));
        }
        let mut base = Url::parse(&cfg.store_url)
            .map_err(|e| BrokerError::Configuration(format!("bad store URL: {}", e)))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self { cfg, pool, base, admin_slot: OnceCell::new() })
    }

    fn build(&self, scope: Scope, api_key: String, bearer: String) -> BrokerResult<ScopedClient> {
        // Every client rides the shared transport.
        let http = self.pool.handle()?;
        Ok(ScopedClient::new(scope, http, self.base.clone(), api_key, bearer))
    }

    fn build_anonymous(&self) -> BrokerResult<ScopedClient> {
        self.build(
            Scope::Anonymous,
            self.cfg.anon_key.clone(),
            self.cfg.anon_key.clone(),
        )
    }

    fn build_admin(&self) -> BrokerResult<ScopedClient> {
        // Deferred-fatal: only an actual admin operation requires the key.
        let service_key = self
            .cfg
            .service_key
            .clone()
            .ok_or_else(|| BrokerError::Configuration("service key is not set".into()))?;
        self.build(Scope::Admin, service_key.clone(), service_key)
    }

    /// One-off anonymous client (shares the pooled transport).
    pub fn anonymous(&self) -> BrokerResult<Arc<ScopedClient>> {
        self.build_anonymous().map(Arc::new)
    }

    /// Process-wide admin singleton for long-lived administrative work
    /// (registration, maintenance). Constructed at most once per process.
    pub fn admin(&self) -> BrokerResult<Arc<ScopedClient>> {
        self.admin_slot
            .get_or_try_init(|| self.build_admin().map(Arc::new))
            .map(Arc::clone)
    }

    /// Request-scoped admin client for interactive admin operations;
    /// constructed at most once per request.
    pub fn admin_for_request(&self, scope: &RequestScope) -> BrokerResult<Arc<ScopedClient>> {
        scope.get_or_try_insert(ADMIN_KEY, || self.build_admin())
    }

    /// Select a client for the presented credential.
    ///
    /// No credential → anonymous. A structurally invalid credential (wrong
    /// segment count for the signing scheme, or no signature at all)
    /// degrades to anonymous with a warning, never to admin, and never as
    /// an error to the caller. A
    /// well-formed credential yields a user-scoped client cached under a
    /// short slice of the token's signature for the remainder of the
    /// request; the signature differs per user, so distinct tokens never
    /// share a key.
    pub fn for_principal(
        &self,
        credential: &Credential,
        scope: &RequestScope,
    ) -> BrokerResult<Arc<ScopedClient>> {
        let Some(token) = credential.token() else {
            return scope.get_or_try_insert(ANON_KEY, || self.build_anonymous());
        };
        let mut segments = token.split('.');
        let signature = match (segments.next(), segments.next(), segments.next(), segments.next())
        {
            (Some(_), Some(_), Some(sig), None) if !sig.is_empty() => sig,
            _ => {
                warn!(
                    "structurally invalid credential ({}), serving anonymous client",
                    token_preview(token)
                );
                return scope.get_or_try_insert(ANON_KEY, || self.build_anonymous());
            }
        };
        let tag: String = signature.chars().take(CACHE_TAG_LEN).collect();
        let key = format!("user:{}", tag);
        scope.get_or_try_insert(&key, || {
            self.build(
                Scope::User(tag.clone()),
                self.cfg.anon_key.clone(),
                token.to_string(),
            )
        })
    }
}
