//! Signed session tokens (HS256) with a `kind` discriminator.
//!
//! Three kinds exist: short-lived access tokens, long-lived refresh tokens,
//! and ~1h masquerade tokens that additionally carry the impersonated
//! principal. A token of one kind must never verify as another; all
//! verification failures collapse into one opaque `Authentication` error so
//! callers cannot distinguish a bad signature from an expired token.

use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

use crate::config::BrokerConfig;
use crate::error::{BrokerError, BrokerResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
    Masquerade,
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenKind::Access => write!(f, "access"),
            TokenKind::Refresh => write!(f, "refresh"),
            TokenKind::Masquerade => write!(f, "masquerade"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Principal the token was issued to. For masquerade tokens this is the
    /// acting admin, not the impersonated principal.
    pub sub: Uuid,
    pub kind: TokenKind,
    /// Issued at (Unix timestamp, seconds).
    pub iat: i64,
    /// Expiry (Unix timestamp, seconds).
    pub exp: i64,
    /// Masquerade target; present iff `kind == Masquerade`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mas: Option<Uuid>,
}

/// First few characters of a token for log lines. Never log full tokens.
pub fn token_preview(token: &str) -> String {
    let head: String = token.chars().take(8).collect();
    format!("{}…", head)
}

pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
    masquerade_ttl: Duration,
}

impl TokenCodec {
    pub fn new(cfg: &BrokerConfig) -> BrokerResult<Self> {
        if cfg.signing_secret.trim().is_empty() {
            return Err(BrokerError::Configuration("signing secret is not set".into()));
        }
        Ok(Self {
            encoding: EncodingKey::from_secret(cfg.signing_secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.signing_secret.as_bytes()),
            access_ttl: cfg.access_ttl,
            refresh_ttl: cfg.refresh_ttl,
            masquerade_ttl: cfg.masquerade_ttl,
        })
    }

    pub fn ttl_for(&self, kind: TokenKind) -> Duration {
        match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
            TokenKind::Masquerade => self.masquerade_ttl,
        }
    }

    /// Issue a token of the given kind for a principal.
    pub fn issue(&self, principal_id: Uuid, kind: TokenKind) -> BrokerResult<String> {
        self.sign(self.claims_for(principal_id, kind, None))
    }

    /// Issue a masquerade token: `sub` is the acting admin, `mas` the target.
    pub fn issue_masquerade(&self, admin_id: Uuid, target_id: Uuid) -> BrokerResult<String> {
        self.sign(self.claims_for(admin_id, TokenKind::Masquerade, Some(target_id)))
    }

    fn claims_for(&self, principal_id: Uuid, kind: TokenKind, mas: Option<Uuid>) -> TokenClaims {
        let now = Utc::now().timestamp();
        TokenClaims {
            sub: principal_id,
            kind,
            iat: now,
            exp: now + self.ttl_for(kind).as_secs() as i64,
            mas,
        }
    }

    fn sign(&self, claims: TokenClaims) -> BrokerResult<String> {
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| BrokerError::Configuration(format!("token encoding failed: {}", e)))
    }

    /// Verify a token string against an expected kind.
    ///
    /// Rejects on signature failure, expiry, or kind mismatch, always with
    /// the same undifferentiated error. A masquerade token must carry its
    /// target claim to verify at all.
    pub fn verify(&self, token: &str, expected: TokenKind) -> BrokerResult<TokenClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;

        let data = decode::<TokenClaims>(token, &self.decoding, &validation).map_err(|e| {
            debug!("token rejected ({}): {}", token_preview(token), e);
            BrokerError::Authentication
        })?;
        let claims = data.claims;
        if claims.kind != expected {
            debug!(
                "token kind mismatch ({}): got {}, expected {}",
                token_preview(token),
                claims.kind,
                expected
            );
            return Err(BrokerError::Authentication);
        }
        if claims.kind == TokenKind::Masquerade && claims.mas.is_none() {
            debug!("masquerade token missing target ({})", token_preview(token));
            return Err(BrokerError::Authentication);
        }
        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec() -> TokenCodec {
        let cfg = BrokerConfig::new("unit-test-secret", "http://store.local", "anon");
        TokenCodec::new(&cfg).unwrap()
    }

    fn signed(claims: &TokenClaims, secret: &str) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn roundtrip_for_every_kind() {
        let c = codec();
        let id = Uuid::new_v4();
        for kind in [TokenKind::Access, TokenKind::Refresh] {
            let tok = c.issue(id, kind).unwrap();
            let claims = c.verify(&tok, kind).unwrap();
            assert_eq!(claims.sub, id);
            assert_eq!(claims.kind, kind);
            assert!(claims.exp > claims.iat);
        }
        let target = Uuid::new_v4();
        let tok = c.issue_masquerade(id, target).unwrap();
        let claims = c.verify(&tok, TokenKind::Masquerade).unwrap();
        assert_eq!(claims.sub, id);
        assert_eq!(claims.mas, Some(target));
    }

    #[test]
    fn kind_confusion_is_rejected() {
        let c = codec();
        let id = Uuid::new_v4();
        let access = c.issue(id, TokenKind::Access).unwrap();
        let refresh = c.issue(id, TokenKind::Refresh).unwrap();
        assert!(matches!(c.verify(&access, TokenKind::Refresh), Err(BrokerError::Authentication)));
        assert!(matches!(c.verify(&refresh, TokenKind::Access), Err(BrokerError::Authentication)));
        assert!(matches!(c.verify(&access, TokenKind::Masquerade), Err(BrokerError::Authentication)));
    }

    #[test]
    fn expired_token_fails_even_with_valid_signature() {
        let c = codec();
        let now = Utc::now().timestamp();
        let claims = TokenClaims {
            sub: Uuid::new_v4(),
            kind: TokenKind::Access,
            iat: now - 7200,
            exp: now - 3600,
            mas: None,
        };
        let tok = signed(&claims, "unit-test-secret");
        assert!(matches!(c.verify(&tok, TokenKind::Access), Err(BrokerError::Authentication)));
    }

    #[test]
    fn wrong_secret_fails() {
        let c = codec();
        let now = Utc::now().timestamp();
        let claims = TokenClaims {
            sub: Uuid::new_v4(),
            kind: TokenKind::Access,
            iat: now,
            exp: now + 3600,
            mas: None,
        };
        let tok = signed(&claims, "a-different-secret");
        assert!(matches!(c.verify(&tok, TokenKind::Access), Err(BrokerError::Authentication)));
    }

    #[test]
    fn garbage_and_empty_inputs_fail_without_panic() {
        let c = codec();
        for bad in ["", "not-a-token", "a.b", "550e8400-e29b-41d4-a716-446655440000"] {
            assert!(c.verify(bad, TokenKind::Access).is_err(), "accepted: {}", bad);
        }
    }

    #[test]
    fn masquerade_without_target_is_invalid() {
        let c = codec();
        let now = Utc::now().timestamp();
        let claims = TokenClaims {
            sub: Uuid::new_v4(),
            kind: TokenKind::Masquerade,
            iat: now,
            exp: now + 3600,
            mas: None,
        };
        let tok = signed(&claims, "unit-test-secret");
        assert!(matches!(c.verify(&tok, TokenKind::Masquerade), Err(BrokerError::Authentication)));
    }

    #[test]
    fn empty_secret_is_a_fatal_configuration_error() {
        let cfg = BrokerConfig::new("", "http://store.local", "anon");
        assert!(matches!(TokenCodec::new(&cfg), Err(BrokerError::Configuration(_))));
    }

    #[test]
    fn preview_truncates() {
        let p = token_preview("eyJhbGciOiJIUzI1NiJ9.payload.sig");
        assert!(p.starts_with("eyJhbGci"));
        assert!(p.len() < 15);
    }
}
