//! Wire encoding for signatures.
//!
//! A raw digest travels as URL-safe base64 (`-` and `_` instead of `+` and
//! `/`). Padding is always emitted on encode and optional on decode.
//!
//! The multi-tenant composite value binds a client id to its digest:
//!
//! ```text
//! header = base64url(client_id + ":" + base64url(hmac(secret, body)))
//! ```

use std::fmt;

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};

use crate::error::AuthError;
use crate::keys::ClientId;

/// Header carrying the signature. Header names are matched case-insensitively.
pub const SIGNATURE_HEADER: &str = "signature";

/// Separator between the client id and the digest inside a composite value.
pub const COMPOSITE_SEPARATOR: char = ':';

const SIGNATURE_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(true)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Transport-safe text form of a signature, as it appears in the header.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EncodedSignature(String);

impl EncodedSignature {
    /// Get the encoded signature as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Get the encoded signature as bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// Consume the signature and return the inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for EncodedSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for EncodedSignature {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for EncodedSignature {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

/// Encode raw digest bytes as URL-safe, padded base64.
///
/// # Examples
///
/// ```
/// use hmacguard_auth::codec::encode;
///
/// assert_eq!(encode(&[0xfb, 0xff]).as_str(), "-_8=");
/// ```
#[must_use]
pub fn encode(raw: &[u8]) -> EncodedSignature {
    EncodedSignature(SIGNATURE_ENGINE.encode(raw))
}

/// Decode URL-safe base64, with or without padding.
///
/// # Errors
///
/// Returns [`AuthError::MalformedSignature`] on invalid characters or length.
pub fn decode(text: &str) -> Result<Vec<u8>, AuthError> {
    SIGNATURE_ENGINE
        .decode(text)
        .map_err(|_| AuthError::MalformedSignature)
}

/// A parsed multi-tenant signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositeSignature {
    /// The client the signature claims to come from.
    pub client_id: ClientId,
    /// The encoded digest computed with that client's secret.
    pub digest: EncodedSignature,
}

impl CompositeSignature {
    /// Create a composite signature from its parts.
    #[must_use]
    pub fn new(client_id: ClientId, digest: EncodedSignature) -> Self {
        Self { client_id, digest }
    }

    /// Parse a header value into its client id and digest.
    ///
    /// Splits on the first `:` only.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::MalformedSignature`] if the value is not valid
    /// base64, not UTF-8, has no separator, or either part is empty.
    pub fn parse(header: &str) -> Result<Self, AuthError> {
        let raw = decode(header)?;
        let value = String::from_utf8(raw).map_err(|_| AuthError::MalformedSignature)?;

        let (client_id, digest) = value
            .split_once(COMPOSITE_SEPARATOR)
            .ok_or(AuthError::MalformedSignature)?;

        if client_id.is_empty() || digest.is_empty() {
            return Err(AuthError::MalformedSignature);
        }

        let client_id = ClientId::new(client_id).map_err(|_| AuthError::MalformedSignature)?;
        Ok(Self::new(client_id, EncodedSignature::from(digest)))
    }

    /// Serialize to the transport-encoded header value.
    #[must_use]
    pub fn to_header(&self) -> EncodedSignature {
        let value = format!(
            "{}{COMPOSITE_SEPARATOR}{}",
            self.client_id.as_str(),
            self.digest.as_str()
        );
        encode(value.as_bytes())
    }
}

/// Build the composite header value for `client_id` and its encoded digest.
#[must_use]
pub fn encode_composite(client_id: &ClientId, digest: &EncodedSignature) -> EncodedSignature {
    CompositeSignature::new(client_id.clone(), digest.clone()).to_header()
}

/// Split a composite header value into its client id and encoded digest.
///
/// # Errors
///
/// See [`CompositeSignature::parse`].
pub fn decode_composite(header: &str) -> Result<(ClientId, EncodedSignature), AuthError> {
    CompositeSignature::parse(header).map(|sig| (sig.client_id, sig.digest))
}
