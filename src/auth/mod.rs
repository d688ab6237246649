//! Authentication for the Bunkerhill Inference API.
//!
//! This module provides the types behind the client's token lifecycle:
//!
//! - [`RsaPrivateKey`]: RS256 private key for signing the outbound JWT
//! - [`Credential`]: the client's identity plus its signing key
//! - [`TokenState`]: the bearer token currently held, with validity queries
//!
//! The client signs a short-lived claim set with its private key, exchanges
//! it for a bearer token at the auth endpoint, and holds that token in
//! memory until it expires or is force-invalidated by the failure policy.
//! Tokens are never persisted.

mod credentials;
mod rsa;
mod token;

pub use credentials::Credential;
pub use rsa::RsaPrivateKey;
pub use token::{Token, TokenState};

#[cfg(test)]
pub(crate) use token::fake_jwt;
