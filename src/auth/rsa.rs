//! RSA private key handling for JWT signing.

use std::fmt;
use std::path::Path;

use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::Serialize;

use crate::error::{Error, Result};

/// An RSA private key for signing client JWTs with RS256.
///
/// The key is constructed from exactly one source, a PEM string or a PEM
/// file; there is no way to build a client with both or neither.
///
/// ## Loading Keys
///
/// ```rust,ignore
/// use bunkerhill_inference::RsaPrivateKey;
///
/// // From a PEM file (recommended for production)
/// let key = RsaPrivateKey::from_pem_file("private-key.pem")?;
///
/// // From a PEM string
/// let pem = std::fs::read_to_string("private-key.pem")?;
/// let key = RsaPrivateKey::from_pem(&pem)?;
/// ```
///
/// ## Security Notes
///
/// - Debug output never contains key material
/// - Never log or serialize private keys
/// - Store keys securely and rotate them periodically
pub struct RsaPrivateKey {
    key: EncodingKey,
}

impl RsaPrivateKey {
    /// Loads a key from a PEM-encoded string.
    ///
    /// Accepts PKCS#1 (`BEGIN RSA PRIVATE KEY`) and PKCS#8
    /// (`BEGIN PRIVATE KEY`) encodings.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidClientConfiguration`] if the PEM is not a
    /// valid RSA private key.
    pub fn from_pem(pem: &str) -> Result<Self> {
        let key = EncodingKey::from_rsa_pem(pem.as_bytes())
            .map_err(|e| Error::configuration(format!("failed to parse RSA PEM: {}", e)))?;
        Ok(Self { key })
    }

    /// Loads a key from a PEM file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidClientConfiguration`] if the file cannot be
    /// read or contains invalid PEM.
    pub fn from_pem_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let pem = std::fs::read_to_string(path).map_err(|e| {
            Error::configuration(format!(
                "failed to read RSA key file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_pem(&pem)
    }

    /// Signs a claim set, producing a compact RS256 JWT.
    pub(crate) fn sign_claims<T: Serialize>(
        &self,
        claims: &T,
    ) -> std::result::Result<String, jsonwebtoken::errors::Error> {
        jsonwebtoken::encode(&Header::new(Algorithm::RS256), claims, &self.key)
    }
}

impl fmt::Debug for RsaPrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RsaPrivateKey")
            .field("key", &"[REDACTED]")
            .finish()
    }
}
