//! ElGamal encryption of short byte strings via point embedding.
//!
//! The message is embedded into a curve point `M` and encrypted as
//! `(k * G, k * pub + M)`. With a threshold-shared private key, each holder
//! can contribute `c1 * share` and any `t` contributions recover the mask by
//! Lagrange interpolation in point space.

use crate::group::{Curve, CurveError, Element, Point};
use crate::poly::{Eval, Poly, PolyError};
use rand_core::RngCore;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use zeroize::Zeroize;

#[derive(Debug, Error)]
pub enum ElGamalError {
    #[error(transparent)]
    Curve(#[from] CurveError),

    #[error(transparent)]
    Recovery(#[from] PolyError),
}

/// An ElGamal ciphertext
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ciphertext<C: Curve> {
    /// The ephemeral commitment `k * G`
    pub c1: C::Point,
    /// The masked message point `k * pub + M`
    pub c2: C::Point,
}

/// Encrypts up to `embed_len` bytes to the given public key
pub fn encrypt<C: Curve, R: RngCore>(
    public: &C::Point,
    msg: &[u8],
    rng: &mut R,
) -> Result<Ciphertext<C>, ElGamalError> {
    let mut m = C::Point::new();
    m.embed(msg, rng)?;

    let mut k = C::Scalar::rand(rng);
    let mut c1 = C::Point::one();
    c1.mul(&k);
    let mut c2 = public.clone();
    c2.mul(&k);
    c2.add(&m);

    k.zeroize();

    Ok(Ciphertext { c1, c2 })
}

/// Decrypts a ciphertext with the full private key
pub fn decrypt<C: Curve>(
    private: &C::Scalar,
    cipher: &Ciphertext<C>,
) -> Result<Vec<u8>, ElGamalError> {
    let mut mask = cipher.c1.clone();
    mask.mul(private);

    let mut m = cipher.c2.clone();
    m.sub(&mask);

    Ok(m.data()?)
}

/// Computes one holder's contribution `c1 * share` to a threshold decryption
pub fn partial_decrypt<C: Curve>(
    share: &Eval<C::Scalar>,
    cipher: &Ciphertext<C>,
) -> Eval<C::Point> {
    let mut v = cipher.c1.clone();
    v.mul(&share.value);
    Eval {
        index: share.index,
        value: v,
    }
}

/// Recovers the plaintext from `t` partial decryptions
pub fn decrypt_from_partials<C: Curve>(
    t: usize,
    cipher: &Ciphertext<C>,
    partials: Vec<Eval<C::Point>>,
) -> Result<Vec<u8>, ElGamalError> {
    let mask = Poly::<C::Point>::recover(t, partials)?;

    let mut m = cipher.c2.clone();
    m.sub(&mask);

    Ok(m.data()?)
}
