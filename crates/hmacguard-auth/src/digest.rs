//! Keyed message digests.
//!
//! [`compute_digest`] is a pure function of the secret, the message and the
//! hash algorithm. The message is always the exact request body; nothing is
//! normalized before hashing.

use std::fmt;
use std::str::FromStr;

use ::digest::KeyInit;
use hmac::{Hmac, Mac};
use sha1::Sha1;
use sha2::{Sha256, Sha384, Sha512};

use crate::error::AuthError;

/// Hash function used inside the HMAC construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    /// HMAC-SHA1. Only for interoperability with legacy clients.
    Sha1,
    /// HMAC-SHA256.
    #[default]
    Sha256,
    /// HMAC-SHA384.
    Sha384,
    /// HMAC-SHA512.
    Sha512,
}

impl HashAlgorithm {
    /// Canonical lowercase name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sha1 => "sha1",
            Self::Sha256 => "sha256",
            Self::Sha384 => "sha384",
            Self::Sha512 => "sha512",
        }
    }

    /// Length in bytes of the raw digest.
    #[must_use]
    pub fn output_len(self) -> usize {
        match self {
            Self::Sha1 => 20,
            Self::Sha256 => 32,
            Self::Sha384 => 48,
            Self::Sha512 => 64,
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown algorithm name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported hash algorithm: {0}")]
pub struct UnknownAlgorithm(pub String);

impl FromStr for HashAlgorithm {
    type Err = UnknownAlgorithm;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "").as_str() {
            "sha1" => Ok(Self::Sha1),
            "sha256" => Ok(Self::Sha256),
            "sha384" => Ok(Self::Sha384),
            "sha512" => Ok(Self::Sha512),
            _ => Err(UnknownAlgorithm(s.to_owned())),
        }
    }
}

/// Compute `HMAC(key, message)` with the given algorithm and return the raw bytes.
///
/// # Errors
///
/// Returns [`AuthError::MissingKey`] if `key` is empty.
///
/// # Examples
///
/// ```
/// use hmacguard_auth::digest::{HashAlgorithm, compute_digest};
///
/// let raw = compute_digest(b"s3cr3tk3y", b"{}", HashAlgorithm::Sha256).unwrap();
/// assert_eq!(raw.len(), 32);
/// ```
pub fn compute_digest(
    key: &[u8],
    message: &[u8],
    algorithm: HashAlgorithm,
) -> Result<Vec<u8>, AuthError> {
    if key.is_empty() {
        return Err(AuthError::MissingKey);
    }

    let raw = match algorithm {
        HashAlgorithm::Sha1 => keyed_digest::<Hmac<Sha1>>(key, message),
        HashAlgorithm::Sha256 => keyed_digest::<Hmac<Sha256>>(key, message),
        HashAlgorithm::Sha384 => keyed_digest::<Hmac<Sha384>>(key, message),
        HashAlgorithm::Sha512 => keyed_digest::<Hmac<Sha512>>(key, message),
    };
    Ok(raw)
}

fn keyed_digest<M: Mac + KeyInit>(key: &[u8], message: &[u8]) -> Vec<u8> {
    let mut mac = <M as KeyInit>::new_from_slice(key).expect("HMAC can accept any key length");
    mac.update(message);
    mac.finalize().into_bytes().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    // RFC 4231, test case 2.
    const RFC4231_KEY: &[u8] = b"Jefe";
    const RFC4231_DATA: &[u8] = b"what do ya want for nothing?";

    #[test]
    fn test_should_match_rfc4231_sha256_vector() {
        let raw = compute_digest(RFC4231_KEY, RFC4231_DATA, HashAlgorithm::Sha256).unwrap();
        assert_eq!(
            hex::encode(raw),
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn test_should_match_rfc4231_sha512_vector() {
        let raw = compute_digest(RFC4231_KEY, RFC4231_DATA, HashAlgorithm::Sha512).unwrap();
        assert_eq!(
            hex::encode(raw),
            "164b7a7bfcf819e2e395fbe73b56e0a387bd64222e831fd610270cd7ea2505549758bf75c05a994a6d034f65f8f0e6fdcaeab1a34d4a6b4b636e070a38bce737"
        );
    }

    #[test]
    fn test_should_produce_algorithm_sized_output() {
        for algorithm in [
            HashAlgorithm::Sha1,
            HashAlgorithm::Sha256,
            HashAlgorithm::Sha384,
            HashAlgorithm::Sha512,
        ] {
            let raw = compute_digest(b"key", b"message", algorithm).unwrap();
            assert_eq!(raw.len(), algorithm.output_len(), "{algorithm}");
        }
    }

    #[test]
    fn test_should_be_deterministic() {
        let a = compute_digest(b"key", b"body", HashAlgorithm::Sha256).unwrap();
        let b = compute_digest(b"key", b"body", HashAlgorithm::Sha256).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_should_be_sensitive_to_every_byte() {
        let a = compute_digest(b"key", b"{\"foo\":\"boo\"}", HashAlgorithm::Sha256).unwrap();
        let b = compute_digest(b"key", b"{\"foo\": \"boo\"}", HashAlgorithm::Sha256).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_should_reject_empty_key() {
        assert_eq!(
            compute_digest(b"", b"body", HashAlgorithm::Sha256),
            Err(AuthError::MissingKey)
        );
    }

    #[test]
    fn test_should_parse_algorithm_names() {
        assert_eq!("sha256".parse(), Ok(HashAlgorithm::Sha256));
        assert_eq!("SHA-512".parse(), Ok(HashAlgorithm::Sha512));
        assert_eq!(" sha1 ".parse(), Ok(HashAlgorithm::Sha1));
        assert!("md5".parse::<HashAlgorithm>().is_err());
    }

    #[test]
    fn test_should_default_to_sha256() {
        assert_eq!(HashAlgorithm::default(), HashAlgorithm::Sha256);
    }
}
