//! Detached Schnorr signatures over byte strings.
//!
//! The signature is `R || s` at fixed widths, with the challenge bound to the
//! group: `h = SHA256(R || A || msg)` reduced modulo the curve order, and
//! `s = k + h * x`. Verification recomputes the challenge and checks
//! `s * G == R + h * A`. A buffer that is not exactly one point plus one
//! scalar long is rejected outright.

use crate::group::{Curve, CurveError, Element, Encodable, Scalar};
use rand_core::RngCore;
use sha2::{Digest, Sha256};
use thiserror::Error;
use zeroize::Zeroize;

#[derive(Debug, Error)]
pub enum SchnorrError {
    #[error("signature has length {0}, expected {1}")]
    InvalidLength(usize, usize),

    #[error(transparent)]
    Encoding(#[from] CurveError),

    #[error("signature does not verify")]
    InvalidSignature,
}

/// The fixed signature size for the given curve
pub fn signature_len<C: Curve>() -> usize {
    C::Point::marshal_len() + C::Scalar::marshal_len()
}

/// Signs the message with the given private key
pub fn sign<C: Curve, R: RngCore>(private: &C::Scalar, msg: &[u8], rng: &mut R) -> Vec<u8> {
    let mut k = C::Scalar::rand(rng);
    let mut r = C::Point::one();
    r.mul(&k);

    let mut public = C::Point::one();
    public.mul(private);

    let h = challenge::<C>(&r, &public, msg);

    // s = k + h * x
    let mut s = h;
    s.mul(private);
    s.add(&k);

    k.zeroize();

    let mut out = r.marshal();
    out.extend_from_slice(&s.marshal());
    out
}

/// Verifies a signature produced by [`sign`] against the signer's public key
pub fn verify<C: Curve>(public: &C::Point, msg: &[u8], sig: &[u8]) -> Result<(), SchnorrError> {
    let plen = C::Point::marshal_len();
    let expected = signature_len::<C>();
    if sig.len() != expected {
        return Err(SchnorrError::InvalidLength(sig.len(), expected));
    }

    let mut r = C::Point::new();
    r.unmarshal(&sig[..plen])?;
    let mut s = C::Scalar::new();
    s.unmarshal(&sig[plen..])?;

    let h = challenge::<C>(&r, public, msg);

    // s * G == R + h * A
    let mut left = C::Point::one();
    left.mul(&s);
    let mut right = public.clone();
    right.mul(&h);
    right.add(&r);

    if left != right {
        return Err(SchnorrError::InvalidSignature);
    }

    Ok(())
}

fn challenge<C: Curve>(r: &C::Point, public: &C::Point, msg: &[u8]) -> C::Scalar {
    let mut hasher = Sha256::new();
    hasher.update(r.marshal());
    hasher.update(public.marshal());
    hasher.update(msg);

    let mut h = C::Scalar::new();
    h.set_bytes(&hasher.finalize());
    h
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::secp256k1::Secp256k1;
    use crate::group::new_key_pair;
    use rand::thread_rng;

    type C = Secp256k1;

    #[test]
    fn sign_and_verify() {
        let (private, public) = new_key_pair::<C, _>(&mut thread_rng());
        let msg = b"deal envelope key";

        let sig = sign::<C, _>(&private, msg, &mut thread_rng());
        assert_eq!(sig.len(), signature_len::<C>());
        verify::<C>(&public, msg, &sig).unwrap();
    }

    #[test]
    fn tampering_fails() {
        let (private, public) = new_key_pair::<C, _>(&mut thread_rng());
        let msg = b"some message";
        let sig = sign::<C, _>(&private, msg, &mut thread_rng());

        // flip any byte of the signature
        for i in 0..sig.len() {
            let mut bad = sig.clone();
            bad[i] ^= 1;
            verify::<C>(&public, msg, &bad).unwrap_err();
        }

        // flip a byte of the message
        verify::<C>(&public, b"some messagf", &sig).unwrap_err();

        // trailing bytes are not tolerated
        let mut extended = sig.clone();
        extended.push(0);
        verify::<C>(&public, msg, &extended).unwrap_err();
        verify::<C>(&public, msg, &sig[..sig.len() - 1]).unwrap_err();

        // substituted public key
        let (_, other) = new_key_pair::<C, _>(&mut thread_rng());
        verify::<C>(&other, msg, &sig).unwrap_err();
    }
}
