//! Session orchestration: issuance, verification, refresh, masquerade.
//!
//! There is no server-side session store; the token itself is the session.
//! Login or a successful refresh starts a session; expiry or the client
//! clearing its credential material ends it.

use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{BrokerError, BrokerResult};
use crate::token::{token_preview, TokenClaims, TokenCodec, TokenKind};

use super::credential::Credential;

/// Token pair handed to the HTTP boundary after login or refresh.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SessionTokens {
    pub access_token: String,
    pub refresh_token: String,
    /// Access-token lifetime in seconds.
    pub expires_in: u64,
}

/// Outcome of resolving a request's credential: an authenticated principal,
/// possibly masquerading as another.
#[derive(Debug, Clone)]
pub struct ResolvedSession {
    claims: TokenClaims,
}

impl ResolvedSession {
    /// Principal whose data the request operates on. For masquerade tokens
    /// this is the impersonated target.
    pub fn effective_principal(&self) -> Uuid {
        match (self.claims.kind, self.claims.mas) {
            (TokenKind::Masquerade, Some(target)) => target,
            _ => self.claims.sub,
        }
    }

    /// The true, non-impersonated principal: the admin, even while
    /// masquerading. Audit attribution uses this, never `effective`.
    pub fn actual_principal(&self) -> Uuid {
        self.claims.sub
    }

    pub fn is_masquerading(&self) -> bool {
        self.claims.kind == TokenKind::Masquerade
    }

    pub fn claims(&self) -> &TokenClaims {
        &self.claims
    }
}

pub struct SessionManager {
    codec: Arc<TokenCodec>,
}

impl SessionManager {
    pub fn new(codec: Arc<TokenCodec>) -> Self {
        Self { codec }
    }

    /// Session start: issue a fresh access+refresh pair. Authenticating the
    /// principal (password check, OAuth exchange) happens in the caller;
    /// this layer never sees raw credentials.
    pub fn login(&self, principal_id: Uuid) -> BrokerResult<SessionTokens> {
        let access_token = self.codec.issue(principal_id, TokenKind::Access)?;
        let refresh_token = self.codec.issue(principal_id, TokenKind::Refresh)?;
        info!("session start principal={}", principal_id);
        Ok(SessionTokens {
            access_token,
            refresh_token,
            expires_in: self.codec.ttl_for(TokenKind::Access).as_secs(),
        })
    }

    /// Resolve a request's credential to a session.
    ///
    /// `Ok(None)` means no credential was presented (anonymous request).
    /// A presented-but-invalid credential is an authentication failure; the
    /// error never says which check failed.
    pub fn resolve(&self, credential: &Credential) -> BrokerResult<Option<ResolvedSession>> {
        let Some(token) = credential.token() else {
            return Ok(None);
        };
        // Access tokens are the common case; masquerade tokens travel the
        // same header, so try them second.
        let claims = self
            .codec
            .verify(token, TokenKind::Access)
            .or_else(|_| self.codec.verify(token, TokenKind::Masquerade))
            .map_err(|_| {
                warn!("credential rejected ({})", token_preview(token));
                BrokerError::Authentication
            })?;
        Ok(Some(ResolvedSession { claims }))
    }

    /// Rotate a refresh token into a brand-new access+refresh pair.
    /// Rotation is "issue new", not "invalidate old": there is no
    /// server-side blacklist, expiry is the only kill switch.
    pub fn refresh(&self, refresh_token: &str) -> BrokerResult<SessionTokens> {
        let claims = self.codec.verify(refresh_token, TokenKind::Refresh)?;
        info!("session refresh principal={}", claims.sub);
        self.login(claims.sub)
    }

    /// Start impersonating `target_id` from an authenticated admin session.
    ///
    /// The short masquerade lifetime bounds the impersonation window. A
    /// masquerade token can never seed a further masquerade; the caller is
    /// responsible for the role check (superadmin) before invoking this.
    pub fn begin_masquerade(
        &self,
        session: &ResolvedSession,
        target_id: Uuid,
    ) -> BrokerResult<String> {
        if session.is_masquerading() {
            warn!(
                "nested masquerade refused admin={} target={}",
                session.actual_principal(),
                target_id
            );
            return Err(BrokerError::Authorization);
        }
        let admin_id = session.actual_principal();
        let token = self.codec.issue_masquerade(admin_id, target_id)?;
        info!("masquerade start admin={} target={}", admin_id, target_id);
        Ok(token)
    }
}
