//! Tagged credential material produced at the HTTP boundary.
//! Downstream code branches on this closed type, never on string-shape
//! heuristics ("does this look like a JWT or a UUID?").

pub const ACCESS_COOKIE: &str = "access_token";
pub const REFRESH_COOKIE: &str = "refresh_token";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    /// Token from an `Authorization: Bearer <token>` header.
    Bearer(String),
    /// Token from the httpOnly `access_token` cookie (same-origin only).
    Cookie(String),
    None,
}

impl Credential {
    /// Build from raw header material. Bearer is preferred; the cookie pair
    /// is consulted only for same-origin deployments; cross-site cookies
    /// are unreliable in privacy-restricted browser contexts, so relying on
    /// them there would produce silent auth failures.
    pub fn from_parts(
        authorization: Option<&str>,
        cookie_header: Option<&str>,
        same_origin: bool,
    ) -> Credential {
        if let Some(value) = authorization {
            if let Some(token) = bearer_token(value) {
                return Credential::Bearer(token.to_string());
            }
        }
        if same_origin {
            if let Some(token) = cookie_header.and_then(|h| cookie_value(h, ACCESS_COOKIE)) {
                return Credential::Cookie(token);
            }
        }
        Credential::None
    }

    pub fn token(&self) -> Option<&str> {
        match self {
            Credential::Bearer(t) | Credential::Cookie(t) => Some(t.as_str()),
            Credential::None => None,
        }
    }
}

fn bearer_token(header_value: &str) -> Option<&str> {
    let v = header_value.trim();
    let rest = v.strip_prefix("Bearer ").or_else(|| v.strip_prefix("bearer "))?;
    let token = rest.trim();
    if token.is_empty() { None } else { Some(token) }
}

/// Extract a named value from a `Cookie:` header line (`a=b; c=d`).
pub fn cookie_value(header: &str, name: &str) -> Option<String> {
    for part in header.split(';') {
        if let Some((k, v)) = part.split_once('=') {
            if k.trim() == name {
                let v = v.trim();
                if !v.is_empty() {
                    return Some(v.to_string());
                }
            }
        }
    }
    None
}

/// Refresh token from the cookie pair; same-origin deployments only.
pub fn refresh_token_from_cookie(header: &str) -> Option<String> {
    cookie_value(header, REFRESH_COOKIE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_is_preferred_over_cookie() {
        let cred = Credential::from_parts(
            Some("Bearer aaa.bbb.ccc"),
            Some("access_token=xxx.yyy.zzz"),
            true,
        );
        assert_eq!(cred, Credential::Bearer("aaa.bbb.ccc".into()));
    }

    #[test]
    fn cookie_fallback_only_when_same_origin() {
        let cookies = Some("theme=dark; access_token=xxx.yyy.zzz; refresh_token=rrr.sss.ttt");
        let same = Credential::from_parts(None, cookies, true);
        assert_eq!(same, Credential::Cookie("xxx.yyy.zzz".into()));

        // Cross-origin: the cookie path is skipped entirely.
        let cross = Credential::from_parts(None, cookies, false);
        assert_eq!(cross, Credential::None);
    }

    #[test]
    fn absent_material_is_none() {
        assert_eq!(Credential::from_parts(None, None, true), Credential::None);
        assert_eq!(Credential::from_parts(Some("Basic Zm9v"), None, true), Credential::None);
        assert_eq!(Credential::from_parts(Some("Bearer "), None, true), Credential::None);
    }

    #[test]
    fn refresh_cookie_extraction() {
        let header = "access_token=a.b.c; refresh_token=d.e.f";
        assert_eq!(refresh_token_from_cookie(header).as_deref(), Some("d.e.f"));
        assert_eq!(refresh_token_from_cookie("theme=dark"), None);
    }
}
