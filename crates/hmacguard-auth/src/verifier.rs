//! Request signature verification.
//!
//! The flow of [`Verifier::verify`]:
//!
//! 1. A disarmed verifier accepts everything (and says so in the logs).
//! 2. A missing header is rejected with [`AuthError::SignatureMissing`].
//! 3. The set of acceptable header values is built: the default-key
//!    signature of the body if a default secret exists, and, if named secrets
//!    exist, the composite signature of the body for the client named in the
//!    header. When that client is unknown or not allowed, a decoy computed
//!    with a throwaway key takes its place so the cost stays the same.
//! 4. The header is compared against every candidate in constant time.
//! 5. No match is [`AuthError::InvalidSignature`].
//!
//! Malformed composites, clients outside the allowed set and unknown client
//! ids all end in step 5, so a caller cannot tell them apart by result or by
//! timing.

use std::collections::HashSet;

use subtle::{Choice, ConstantTimeEq};
use tracing::{debug, info, warn};

use crate::codec::{CompositeSignature, EncodedSignature, encode, encode_composite};
use crate::digest::{HashAlgorithm, compute_digest};
use crate::error::AuthError;
use crate::keys::{ClientId, KeyRegistry, KeyResolver, KeyStore};
use crate::signer::Signer;

/// Settings fixed for the lifetime of a [`Verifier`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VerifierConfig {
    /// Hash algorithm used inside HMAC.
    pub algorithm: HashAlgorithm,
    /// Accept every request without checking. Never enable in production.
    pub disarmed: bool,
}

/// Which path accepted a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthResult {
    /// Verification is disarmed; nothing was checked.
    Disarmed,
    /// The header matched the default-key signature.
    DefaultKey,
    /// The header matched the composite signature of this client.
    NamedKey(ClientId),
}

/// Verifies request signatures against a [`KeyStore`].
///
/// A `Verifier` is safe to share between threads; wrap it in an `Arc` and
/// hand it to every request handler that needs it.
#[derive(Debug)]
pub struct Verifier {
    keys: KeyStore,
    config: VerifierConfig,
}

impl Verifier {
    /// Create a verifier.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::NoKeysConfigured`] if `registry` holds no secret.
    pub fn new(registry: KeyRegistry, config: VerifierConfig) -> Result<Self, AuthError> {
        let keys = KeyStore::new(registry)?;

        if config.disarmed {
            warn!("HMAC signature verification is DISARMED, every request will be accepted");
        }

        Ok(Self { keys, config })
    }

    /// Whether verification is bypassed.
    #[must_use]
    pub fn is_disarmed(&self) -> bool {
        self.config.disarmed
    }

    /// The hash algorithm in use.
    #[must_use]
    pub fn algorithm(&self) -> HashAlgorithm {
        self.config.algorithm
    }

    /// A signer over the current key snapshot.
    #[must_use]
    pub fn signer(&self) -> Signer {
        Signer::new(self.keys.snapshot(), self.config.algorithm)
    }

    /// Sign `body` with the default secret.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::SecretKeyNotSet`] if no default secret is configured.
    pub fn sign(&self, body: &[u8]) -> Result<EncodedSignature, AuthError> {
        self.signer().sign(body)
    }

    /// Produce the composite header value for `client_id`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::UnknownKeyName`] if `client_id` is not registered.
    pub fn sign_for(&self, client_id: &str, body: &[u8]) -> Result<EncodedSignature, AuthError> {
        self.signer().sign_for(client_id, body)
    }

    /// Swap in a new key registry. In-flight verifications finish against the old one.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::NoKeysConfigured`] and keeps the current keys if
    /// `registry` is empty.
    pub fn rotate_keys(&self, registry: KeyRegistry) -> Result<(), AuthError> {
        self.keys.replace(registry)?;
        info!("rotated HMAC key registry");
        Ok(())
    }

    /// Verify a request.
    ///
    /// `header` is the raw signature header value, `body` the exact request
    /// body, and `allowed_clients` an optional per-route restriction on which
    /// named clients may be accepted.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::SignatureMissing`] when `header` is `None` and
    /// [`AuthError::InvalidSignature`] when nothing matches.
    pub fn verify(
        &self,
        header: Option<&str>,
        body: &[u8],
        allowed_clients: Option<&HashSet<ClientId>>,
    ) -> Result<AuthResult, AuthError> {
        if self.config.disarmed {
            warn!("HMAC verification disarmed, accepting request without checking");
            return Ok(AuthResult::Disarmed);
        }

        let Some(header) = header else {
            debug!("request carries no signature");
            return Err(AuthError::SignatureMissing);
        };

        let signer = self.signer();
        let mut candidates: Vec<Candidate> = Vec::with_capacity(2);

        if signer.keys().has_default_key() {
            candidates.push((signer.sign(body)?, Some(AuthResult::DefaultKey)));
        }

        if signer.keys().has_named_keys() {
            candidates.push(named_candidate(&signer, header, body, allowed_clients)?);
        }

        match find_match(header, &candidates) {
            Some(result) => {
                debug!(?result, "signature verified");
                Ok(result)
            }
            None => {
                debug!(candidates = candidates.len(), "signature does not match");
                Err(AuthError::InvalidSignature)
            }
        }
    }
}

/// An expected header value and the result it grants. `None` never matches.
type Candidate = (EncodedSignature, Option<AuthResult>);

/// Stand-in secret for headers that name no usable client.
const DECOY_KEY: &[u8] = b"hmacguard-decoy-key";

/// Stand-in client id for headers that are not composite values.
const DECOY_CLIENT: &str = "-";

/// Compute the expected composite value for the client named in `header`.
///
/// A malformed composite, a client outside `allowed_clients` and an unknown
/// client all yield a decoy candidate that costs one digest over `body` like
/// a real one but can never match.
fn named_candidate(
    signer: &Signer,
    header: &str,
    body: &[u8],
    allowed_clients: Option<&HashSet<ClientId>>,
) -> Result<Candidate, AuthError> {
    let client_id = match CompositeSignature::parse(header) {
        Ok(composite) => composite.client_id,
        Err(err) => {
            debug!(error = %err, "signature is not a composite value");
            return decoy_candidate(&ClientId::new(DECOY_CLIENT)?, body, signer.algorithm());
        }
    };

    if let Some(allowed) = allowed_clients {
        if !allowed.contains(&client_id) {
            debug!(client_id = %client_id, "client is not allowed on this route");
            return decoy_candidate(&client_id, body, signer.algorithm());
        }
    }

    match signer.sign_for(client_id.as_str(), body) {
        Ok(expected) => Ok((expected, Some(AuthResult::NamedKey(client_id)))),
        Err(err) => {
            debug!(client_id = %client_id, error = %err, "no secret for client");
            decoy_candidate(&client_id, body, signer.algorithm())
        }
    }
}

fn decoy_candidate(
    client_id: &ClientId,
    body: &[u8],
    algorithm: HashAlgorithm,
) -> Result<Candidate, AuthError> {
    let digest = encode(&compute_digest(DECOY_KEY, body, algorithm)?);
    Ok((encode_composite(client_id, &digest), None))
}

/// Compare `header` against every candidate before deciding.
///
/// All comparisons run regardless of earlier matches so the timing does not
/// reveal which candidate, if any, matched.
fn find_match(header: &str, candidates: &[Candidate]) -> Option<AuthResult> {
    let provided = header.as_bytes();
    let matches: Vec<Choice> = candidates
        .iter()
        .map(|(expected, result)| {
            provided.ct_eq(expected.as_bytes()) & Choice::from(u8::from(result.is_some()))
        })
        .collect();

    let any = matches.iter().fold(Choice::from(0), |acc, m| acc | *m);
    if !bool::from(any) {
        return None;
    }

    candidates
        .iter()
        .zip(matches)
        .find(|(_, m)| bool::from(*m))
        .and_then(|((_, result), _)| result.clone())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    const KEY: &str = "s3cr3tk3y";
    const BODY: &[u8] = br#"{"foo":"boo"}"#;
    const OTHER_BODY: &[u8] = br#"{"foo":"bla"}"#;

    fn single_key_verifier(disarmed: bool) -> Verifier {
        Verifier::new(
            KeyRegistry::new().with_default_key(KEY).unwrap(),
            VerifierConfig {
                disarmed,
                ..VerifierConfig::default()
            },
        )
        .unwrap()
    }

    fn multi_tenant_verifier() -> Verifier {
        Verifier::new(
            KeyRegistry::from_parts(None, [("a", "aa"), ("b", "bb")]).unwrap(),
            VerifierConfig::default(),
        )
        .unwrap()
    }

    fn allowed(ids: &[&str]) -> HashSet<ClientId> {
        ids.iter().map(|id| ClientId::new(*id).unwrap()).collect()
    }

    #[test]
    fn test_should_verify_signature_of_same_body() {
        let verifier = single_key_verifier(false);
        let sig = verifier.sign(BODY).unwrap();
        assert_eq!(
            verifier.verify(Some(sig.as_str()), BODY, None),
            Ok(AuthResult::DefaultKey)
        );
    }

    #[test]
    fn test_should_reject_signature_of_changed_body() {
        let verifier = single_key_verifier(false);
        let sig = verifier.sign(BODY).unwrap();
        assert_eq!(
            verifier.verify(Some(sig.as_str()), OTHER_BODY, None),
            Err(AuthError::InvalidSignature)
        );
    }

    #[test]
    fn test_should_reject_missing_signature_when_armed() {
        let verifier = single_key_verifier(false);
        assert_eq!(
            verifier.verify(None, BODY, None),
            Err(AuthError::SignatureMissing)
        );
    }

    #[test]
    fn test_should_accept_everything_when_disarmed() {
        let verifier = single_key_verifier(true);
        assert!(verifier.is_disarmed());
        assert_eq!(verifier.verify(None, BODY, None), Ok(AuthResult::Disarmed));
        assert_eq!(
            verifier.verify(Some("00"), BODY, None),
            Ok(AuthResult::Disarmed)
        );
        let sig = verifier.sign(BODY).unwrap();
        assert_eq!(
            verifier.verify(Some(sig.as_str()), OTHER_BODY, None),
            Ok(AuthResult::Disarmed)
        );
    }

    #[test]
    fn test_should_reject_garbage_header() {
        let verifier = single_key_verifier(false);
        assert_eq!(
            verifier.verify(Some("00"), BODY, None),
            Err(AuthError::InvalidSignature)
        );
        assert_eq!(
            verifier.verify(Some(""), BODY, None),
            Err(AuthError::InvalidSignature)
        );
    }

    #[test]
    fn test_should_reject_unpadded_variant_of_valid_signature() {
        let verifier = single_key_verifier(false);
        let sig = verifier.sign(BODY).unwrap();
        let unpadded = sig.as_str().trim_end_matches('=');
        assert_eq!(
            verifier.verify(Some(unpadded), BODY, None),
            Err(AuthError::InvalidSignature)
        );
    }

    #[test]
    fn test_should_verify_each_client_against_its_own_key_only() {
        let verifier = multi_tenant_verifier();
        let sig_a = verifier.sign_for("a", BODY).unwrap();
        let sig_b = verifier.sign_for("b", BODY).unwrap();
        assert_ne!(sig_a, sig_b);

        assert_eq!(
            verifier.verify(Some(sig_a.as_str()), BODY, None),
            Ok(AuthResult::NamedKey(ClientId::new("a").unwrap()))
        );
        assert_eq!(
            verifier.verify(Some(sig_b.as_str()), BODY, None),
            Ok(AuthResult::NamedKey(ClientId::new("b").unwrap()))
        );
    }

    #[test]
    fn test_should_reject_client_claiming_another_clients_id() {
        let verifier = multi_tenant_verifier();
        // Digest computed with b's secret but labelled as client a.
        let raw = crate::digest::compute_digest(b"bb", BODY, HashAlgorithm::Sha256).unwrap();
        let forged = encode_composite(&ClientId::new("a").unwrap(), &encode(&raw));
        assert_eq!(
            verifier.verify(Some(forged.as_str()), BODY, None),
            Err(AuthError::InvalidSignature)
        );
    }

    #[test]
    fn test_should_enforce_allowed_clients() {
        let verifier = multi_tenant_verifier();
        let sig_a = verifier.sign_for("a", BODY).unwrap();
        let sig_b = verifier.sign_for("b", BODY).unwrap();
        let only_a = allowed(&["a"]);

        assert!(verifier.verify(Some(sig_a.as_str()), BODY, Some(&only_a)).is_ok());
        assert_eq!(
            verifier.verify(Some(sig_b.as_str()), BODY, Some(&only_a)),
            Err(AuthError::InvalidSignature)
        );
    }

    #[test]
    fn test_should_not_distinguish_unknown_client_from_malformed_signature() {
        let verifier = multi_tenant_verifier();
        let unknown = encode_composite(&ClientId::new("zz").unwrap(), &encode(b"whatever"));
        let malformed = encode(b"no separator here");

        let unknown_result = verifier.verify(Some(unknown.as_str()), BODY, None);
        let malformed_result = verifier.verify(Some(malformed.as_str()), BODY, None);
        let not_base64 = verifier.verify(Some("***"), BODY, None);

        assert_eq!(unknown_result, Err(AuthError::InvalidSignature));
        assert_eq!(unknown_result, malformed_result);
        assert_eq!(unknown_result, not_base64);
    }

    #[test]
    fn test_should_not_distinguish_disallowed_client_from_unknown_client() {
        let verifier = multi_tenant_verifier();
        let sig_b = verifier.sign_for("b", BODY).unwrap();
        let unknown = encode_composite(&ClientId::new("zz").unwrap(), &encode(b"whatever"));
        let only_a = allowed(&["a"]);

        assert_eq!(
            verifier.verify(Some(sig_b.as_str()), BODY, Some(&only_a)),
            verifier.verify(Some(unknown.as_str()), BODY, Some(&only_a)),
        );
    }

    #[test]
    fn test_should_accept_either_mode_when_both_are_configured() {
        let registry = KeyRegistry::new()
            .with_default_key(KEY)
            .unwrap()
            .with_named_key("a", "aa")
            .unwrap();
        let verifier = Verifier::new(registry, VerifierConfig::default()).unwrap();

        let plain = verifier.sign(BODY).unwrap();
        let composite = verifier.sign_for("a", BODY).unwrap();
        assert_eq!(
            verifier.verify(Some(plain.as_str()), BODY, None),
            Ok(AuthResult::DefaultKey)
        );
        assert_eq!(
            verifier.verify(Some(composite.as_str()), BODY, None),
            Ok(AuthResult::NamedKey(ClientId::new("a").unwrap()))
        );
    }

    #[test]
    fn test_should_reject_plain_signature_when_only_named_keys_exist() {
        let verifier = multi_tenant_verifier();
        let single = single_key_verifier(false);
        let plain = single.sign(BODY).unwrap();
        assert_eq!(
            verifier.verify(Some(plain.as_str()), BODY, None),
            Err(AuthError::InvalidSignature)
        );
        assert_eq!(verifier.sign(BODY), Err(AuthError::SecretKeyNotSet));
    }

    #[test]
    fn test_should_fail_construction_without_keys() {
        assert_eq!(
            Verifier::new(KeyRegistry::new(), VerifierConfig::default()).unwrap_err(),
            AuthError::NoKeysConfigured
        );
    }

    #[test]
    fn test_should_respect_configured_algorithm() {
        let registry = KeyRegistry::new().with_default_key(KEY).unwrap();
        let sha512 = Verifier::new(
            registry.clone(),
            VerifierConfig {
                algorithm: HashAlgorithm::Sha512,
                disarmed: false,
            },
        )
        .unwrap();
        let sha256 = Verifier::new(registry, VerifierConfig::default()).unwrap();

        let sig = sha512.sign(BODY).unwrap();
        assert!(sha512.verify(Some(sig.as_str()), BODY, None).is_ok());
        assert_eq!(
            sha256.verify(Some(sig.as_str()), BODY, None),
            Err(AuthError::InvalidSignature)
        );
    }

    #[test]
    fn test_should_use_new_keys_after_rotation() {
        let verifier = single_key_verifier(false);
        let old_sig = verifier.sign(BODY).unwrap();

        verifier
            .rotate_keys(KeyRegistry::new().with_default_key("n3wk3y").unwrap())
            .unwrap();

        assert_eq!(
            verifier.verify(Some(old_sig.as_str()), BODY, None),
            Err(AuthError::InvalidSignature)
        );
        let new_sig = verifier.sign(BODY).unwrap();
        assert!(verifier.verify(Some(new_sig.as_str()), BODY, None).is_ok());
    }

    #[test]
    fn test_should_verify_concurrently_while_rotating() {
        let verifier = Arc::new(single_key_verifier(false));
        let sig = verifier.sign(BODY).unwrap();

        std::thread::scope(|scope| {
            for _ in 0..8 {
                let verifier = Arc::clone(&verifier);
                let sig = sig.clone();
                scope.spawn(move || {
                    for _ in 0..200 {
                        let result = verifier.verify(Some(sig.as_str()), BODY, None);
                        // Rotation re-installs the same secret, so every
                        // snapshot accepts the signature.
                        assert_eq!(result, Ok(AuthResult::DefaultKey));
                    }
                });
            }
            scope.spawn(|| {
                for _ in 0..50 {
                    verifier
                        .rotate_keys(KeyRegistry::new().with_default_key(KEY).unwrap())
                        .unwrap();
                }
            });
        });
    }

    #[test]
    fn test_should_find_match_in_any_position() {
        let a = EncodedSignature::from("aaaa");
        let b = EncodedSignature::from("bbbb");
        let candidates = vec![
            (a, Some(AuthResult::DefaultKey)),
            (b, Some(AuthResult::NamedKey(ClientId::new("x").unwrap()))),
        ];
        assert_eq!(find_match("aaaa", &candidates), Some(AuthResult::DefaultKey));
        assert_eq!(
            find_match("bbbb", &candidates),
            Some(AuthResult::NamedKey(ClientId::new("x").unwrap()))
        );
        assert_eq!(find_match("cccc", &candidates), None);
        assert_eq!(find_match("aaa", &candidates), None);
    }

    #[test]
    fn test_should_never_match_decoy_candidate() {
        let decoy = decoy_candidate(&ClientId::new("zz").unwrap(), BODY, HashAlgorithm::Sha256)
            .unwrap();
        let header = decoy.0.clone();
        assert_eq!(find_match(header.as_str(), &[decoy]), None);
    }

    #[test]
    fn test_should_build_same_shaped_candidate_for_known_and_unknown_clients() {
        let verifier = multi_tenant_verifier();
        let signer = verifier.signer();
        let wrong_digest = encode(&[0u8; 32]);
        let known = encode_composite(&ClientId::new("a").unwrap(), &wrong_digest);
        let unknown = encode_composite(&ClientId::new("z").unwrap(), &wrong_digest);
        let only_b = allowed(&["b"]);

        let (known_expected, known_result) =
            named_candidate(&signer, known.as_str(), BODY, None).unwrap();
        let (unknown_expected, unknown_result) =
            named_candidate(&signer, unknown.as_str(), BODY, None).unwrap();
        let (disallowed_expected, disallowed_result) =
            named_candidate(&signer, known.as_str(), BODY, Some(&only_b)).unwrap();
        let (malformed_expected, malformed_result) =
            named_candidate(&signer, "00", BODY, None).unwrap();

        assert!(known_result.is_some());
        assert_eq!(unknown_result, None);
        assert_eq!(disallowed_result, None);
        assert_eq!(malformed_result, None);
        // Every branch pays for one digest over the body.
        assert_eq!(known_expected.as_str().len(), unknown_expected.as_str().len());
        assert_eq!(known_expected.as_str().len(), disallowed_expected.as_str().len());
        assert_ne!(unknown_expected, disallowed_expected);
        assert!(!malformed_expected.as_str().is_empty());
    }
}
