//! Ephemeral Diffie-Hellman envelope used to encrypt deals.
//!
//! The sender draws a one-time keypair, computes the shared point with the
//! recipient's long-term key and feeds its encoding into HKDF-SHA256 together
//! with a context string binding the dealer and the verifier set. The derived
//! 32-byte key drives AES-256-GCM. Because the key is fresh per envelope the
//! nonce is a constant twelve zero bytes.

use crate::group::{Curve, Element, Encodable};
use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Key, Nonce,
};
use hkdf::Hkdf;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// The AEAD nonce length
pub const NONCE_LEN: usize = 12;

/// The AEAD authentication tag length
pub const TAG_LEN: usize = 16;

/// The derived AEAD key length
const KEY_LEN: usize = 32;

#[derive(Debug, Error)]
pub enum DHError {
    #[error("aead encryption failed")]
    EncryptionFailed,

    #[error("aead decryption failed")]
    DecryptionFailed,

    #[error("nonce has length {0}, expected {1}")]
    InvalidNonce(usize, usize),
}

/// Computes the HKDF context binding a dealer to its verifier set:
/// `SHA256("dkg-dealer" || dealer || "dkg-verifiers" || verifiers...)`.
pub fn context<C: Curve>(dealer: &C::Point, verifiers: &[C::Point]) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(b"dkg-dealer");
    hasher.update(dealer.marshal());
    hasher.update(b"dkg-verifiers");
    for v in verifiers {
        hasher.update(v.marshal());
    }
    hasher.finalize().to_vec()
}

/// Computes the shared point `own * remote`
pub fn dh_exchange<C: Curve>(own: &C::Scalar, remote: &C::Point) -> C::Point {
    let mut shared = remote.clone();
    shared.mul(own);
    shared
}

/// Derives the AEAD instance for a shared point and context
pub fn new_aead<C: Curve>(shared: &C::Point, context: &[u8]) -> Aes256Gcm {
    // no salt is fine since the shared point comes from an ephemeral-static
    // exchange
    let h = Hkdf::<Sha256>::new(None, &shared.marshal());
    let mut key = [0u8; KEY_LEN];
    h.expand(context, &mut key).expect("hkdf should not fail");

    Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key))
}

/// Seals a plaintext under the zero nonce, returning `(cipher, tag)`
pub fn seal(gcm: &Aes256Gcm, plaintext: &[u8]) -> Result<(Vec<u8>, Vec<u8>), DHError> {
    let nonce = [0u8; NONCE_LEN];
    let mut sealed = gcm
        .encrypt(Nonce::from_slice(&nonce), plaintext)
        .map_err(|_| DHError::EncryptionFailed)?;

    let tag = sealed.split_off(sealed.len() - TAG_LEN);
    Ok((sealed, tag))
}

/// Opens a `(cipher, tag)` pair sealed with [`seal`]
pub fn open(
    gcm: &Aes256Gcm,
    nonce: &[u8],
    cipher: &[u8],
    tag: &[u8],
) -> Result<Vec<u8>, DHError> {
    if nonce.len() != NONCE_LEN {
        return Err(DHError::InvalidNonce(nonce.len(), NONCE_LEN));
    }

    let mut sealed = cipher.to_vec();
    sealed.extend_from_slice(tag);

    gcm.decrypt(Nonce::from_slice(nonce), sealed.as_ref())
        .map_err(|_| DHError::DecryptionFailed)
}
