//! Principals, credential material, and session orchestration.
//! Keep the public surface thin and split implementation across sub-modules.

mod credential;
mod principal;
mod session;

pub use credential::{cookie_value, refresh_token_from_cookie, Credential, ACCESS_COOKIE, REFRESH_COOKIE};
pub use principal::{Principal, Role};
pub use session::{ResolvedSession, SessionManager, SessionTokens};
