//! Client-selection integration tests across the full broker context.

use std::sync::Arc;
use uuid::Uuid;

use tutela::broker::{RequestScope, Scope};
use tutela::config::BrokerConfig;
use tutela::error::BrokerError;
use tutela::identity::Credential;
use tutela::Broker;

fn broker_with(service_key: Option<&str>) -> Broker {
    let mut cfg = BrokerConfig::new("integration-secret", "http://store.local", "anon-key");
    cfg.service_key = service_key.map(|s| s.to_string());
    Broker::new(cfg).unwrap()
}

#[test]
fn one_client_per_scope_key_per_request() {
    let b = broker_with(None);
    let pair = b.sessions.login(Uuid::new_v4()).unwrap();
    let cred = Credential::Bearer(pair.access_token);

    let request = RequestScope::new();
    let first = b.clients.for_principal(&cred, &request).unwrap();
    let second = b.clients.for_principal(&cred, &request).unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    // A new request builds its own client.
    let other_request = RequestScope::new();
    let third = b.clients.for_principal(&cred, &other_request).unwrap();
    assert!(!Arc::ptr_eq(&first, &third));
}

#[test]
fn two_logged_in_users_never_share_a_client_within_a_request() {
    let b = broker_with(None);
    let alice = b.sessions.login(Uuid::new_v4()).unwrap();
    let bob = b.sessions.login(Uuid::new_v4()).unwrap();

    let request = RequestScope::new();
    let for_alice = b
        .clients
        .for_principal(&Credential::Bearer(alice.access_token.clone()), &request)
        .unwrap();
    let for_bob = b
        .clients
        .for_principal(&Credential::Bearer(bob.access_token.clone()), &request)
        .unwrap();

    // Serving one user's rows through the other's RLS identity would be a
    // cross-tenant leak; the two handles must be independent clients.
    assert!(!Arc::ptr_eq(&for_alice, &for_bob));
    assert_ne!(for_alice.scope(), for_bob.scope());
}

#[test]
fn garbled_credential_degrades_to_anonymous_never_admin() {
    let b = broker_with(Some("service-key"));
    let request = RequestScope::new();
    let cred = Credential::Bearer("550e8400-e29b-41d4-a716-446655440000".into());

    let client = b.clients.for_principal(&cred, &request).unwrap();
    assert_eq!(client.scope(), &Scope::Anonymous);
}

#[test]
fn admin_singleton_and_deferred_service_key() {
    // Without a service key the broker constructs fine; only the first
    // admin operation fails.
    let b = broker_with(None);
    assert!(b.clients.anonymous().is_ok());
    assert!(matches!(b.clients.admin(), Err(BrokerError::Configuration(_))));

    let b = broker_with(Some("service-key"));
    let one = b.clients.admin().unwrap();
    let two = b.clients.admin().unwrap();
    assert!(Arc::ptr_eq(&one, &two));
    assert_eq!(one.scope(), &Scope::Admin);
}

#[test]
fn shutdown_is_safe_and_idempotent() {
    let b = broker_with(None);
    let request = RequestScope::new();
    let _ = b.clients.for_principal(&Credential::None, &request).unwrap();
    b.shutdown();
    b.shutdown();
    // Clients can still be constructed afterwards; the pool lazily rebuilds.
    let _ = b.clients.anonymous().unwrap();
}

#[test]
fn missing_mandatory_configuration_aborts_startup() {
    let err = BrokerConfig::from_lookup(|_| None).unwrap_err();
    assert!(matches!(err, BrokerError::Configuration(_)));
    assert_eq!(err.http_status(), 500);
}
