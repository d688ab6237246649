//! Bearer token state and expiry inspection.

use base64::prelude::*;
use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;

/// A bearer token issued by the auth endpoint.
///
/// Holds the encoded compact JWT together with its decoded `exp` claim.
/// The signature is never verified on the client side: the token was
/// issued by the trusted server and is only decoded to learn when it
/// expires. A token whose expiry cannot be decoded is simply treated as
/// invalid, which fails safe toward re-authentication.
///
/// Tokens are replaced wholesale on refresh and never mutated in place.
#[derive(Debug, Clone)]
pub struct Token {
    encoded: String,
    expires_at: Option<DateTime<Utc>>,
}

impl Token {
    /// Wraps an encoded token, decoding its expiry claim if possible.
    pub fn new(encoded: impl Into<String>) -> Self {
        let encoded = encoded.into();
        let expires_at = decode_expiry(&encoded);
        Self { encoded, expires_at }
    }

    /// The encoded token string, as sent in the `Authorization` header.
    pub fn encoded(&self) -> &str {
        &self.encoded
    }

    /// The decoded `exp` claim, when it could be decoded.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }
}

/// Decodes the `exp` claim from a compact JWT without verifying the
/// signature. Returns `None` for anything that is not a well-formed JWT
/// with a numeric `exp`.
fn decode_expiry(encoded: &str) -> Option<DateTime<Utc>> {
    #[derive(Deserialize)]
    struct ExpClaim {
        exp: i64,
    }

    let payload = encoded.split('.').nth(1)?;
    let bytes = BASE64_URL_SAFE_NO_PAD.decode(payload).ok()?;
    let claims: ExpClaim = serde_json::from_slice(&bytes).ok()?;
    Utc.timestamp_opt(claims.exp, 0).single()
}

/// The token currently held by a client, if any.
///
/// Private to one client instance; the owning client guards it (together
/// with the failure counter) behind a single async mutex so concurrent
/// callers cannot race a refresh against a clear.
#[derive(Debug, Default)]
pub struct TokenState {
    token: Option<Token>,
}

impl TokenState {
    /// Creates an empty state holding no token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` if no token is held, the expiry could not be
    /// decoded, or `now` is past the expiry.
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        match &self.token {
            Some(token) => match token.expires_at() {
                Some(exp) => now <= exp,
                None => false,
            },
            None => false,
        }
    }

    /// Swaps in a freshly issued token.
    pub fn replace(&mut self, token: Token) {
        self.token = Some(token);
    }

    /// Drops the held token, forcing re-authentication on next use.
    pub fn clear(&mut self) {
        self.token = None;
    }

    /// The encoded form of the held token, if any.
    pub fn encoded(&self) -> Option<&str> {
        self.token.as_ref().map(Token::encoded)
    }
}

/// Builds an unsigned compact JWT carrying the given `exp` timestamp.
/// Only the payload segment matters for expiry decoding.
#[cfg(test)]
pub(crate) fn fake_jwt(exp: i64) -> String {
    let header = BASE64_URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","typ":"JWT"}"#);
    let payload = BASE64_URL_SAFE_NO_PAD.encode(format!(r#"{{"exp":{}}}"#, exp).as_bytes());
    format!("{}.{}.sig", header, payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_expired_token_invalid_for_every_now() {
        let past = Utc::now() - Duration::hours(1);
        let mut state = TokenState::new();
        state.replace(Token::new(fake_jwt(past.timestamp())));

        assert!(!state.is_valid(Utc::now()));
        assert!(!state.is_valid(past + Duration::seconds(1)));
        assert!(!state.is_valid(Utc::now() + Duration::days(365)));
    }

    #[test]
    fn test_future_token_valid_until_expiry() {
        let exp = Utc::now() + Duration::minutes(30);
        let mut state = TokenState::new();
        state.replace(Token::new(fake_jwt(exp.timestamp())));

        assert!(state.is_valid(Utc::now()));
        assert!(state.is_valid(Utc.timestamp_opt(exp.timestamp(), 0).single().unwrap()));
        assert!(!state.is_valid(exp + Duration::seconds(1)));
    }

    #[test]
    fn test_no_token_is_invalid() {
        let state = TokenState::new();
        assert!(!state.is_valid(Utc::now()));
    }

    #[test]
    fn test_undecodable_token_is_invalid_not_an_error() {
        let mut state = TokenState::new();
        state.replace(Token::new("not-a-jwt"));
        assert!(!state.is_valid(Utc::now()));

        state.replace(Token::new("a.b.c"));
        assert!(!state.is_valid(Utc::now()));

        // Valid base64 payload but no exp claim
        let payload = BASE64_URL_SAFE_NO_PAD.encode(br#"{"sub":"x"}"#);
        state.replace(Token::new(format!("h.{}.s", payload)));
        assert!(!state.is_valid(Utc::now()));
    }

    #[test]
    fn test_clear_forces_invalid() {
        let exp = Utc::now() + Duration::minutes(30);
        let mut state = TokenState::new();
        state.replace(Token::new(fake_jwt(exp.timestamp())));
        assert!(state.is_valid(Utc::now()));

        state.clear();
        assert!(!state.is_valid(Utc::now()));
        assert!(state.encoded().is_none());
    }

    #[test]
    fn test_replace_swaps_wholesale() {
        let mut state = TokenState::new();
        state.replace(Token::new(fake_jwt((Utc::now() - Duration::hours(1)).timestamp())));
        assert!(!state.is_valid(Utc::now()));

        state.replace(Token::new(fake_jwt((Utc::now() + Duration::hours(1)).timestamp())));
        assert!(state.is_valid(Utc::now()));
    }
}
