//! Client credentials: identity plus signing key.

use std::fmt;

use super::RsaPrivateKey;

/// The authenticated identity of one client instance.
///
/// Immutable for the client's lifetime. The private key is supplied as an
/// [`RsaPrivateKey`], which is itself constructed from exactly one of a
/// PEM file or a PEM string, so the "both or neither" misconfiguration of
/// older client drafts cannot be expressed.
///
/// ## Example
///
/// ```rust,ignore
/// use bunkerhill_inference::{Credential, RsaPrivateKey};
///
/// let credential = Credential::new(
///     "datashare-admin",
///     RsaPrivateKey::from_pem_file("private_key.pem")?,
/// );
/// ```
pub struct Credential {
    /// The identity (username) asserted in the signed claim set.
    pub identity: String,

    /// The RS256 private key used to sign the outbound JWT.
    pub key: RsaPrivateKey,
}

impl Credential {
    /// Creates a new credential.
    pub fn new(identity: impl Into<String>, key: RsaPrivateKey) -> Self {
        Self { identity: identity.into(), key }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("identity", &self.identity)
            .field("key", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_KEY_PEM: &str = include_str!("../../tests/keys/test_key.pem");

    #[test]
    fn test_new() {
        let credential =
            Credential::new("datashare-admin", RsaPrivateKey::from_pem(TEST_KEY_PEM).unwrap());
        assert_eq!(credential.identity, "datashare-admin");
    }

    #[test]
    fn test_debug_redacts_key() {
        let credential =
            Credential::new("datashare-admin", RsaPrivateKey::from_pem(TEST_KEY_PEM).unwrap());
        let debug = format!("{:?}", credential);
        assert!(debug.contains("datashare-admin"));
        assert!(debug.contains("REDACTED"));
        assert!(!debug.contains("BEGIN"));
    }
}
