//! Traits for operating on prime-order groups and elliptic curves.

use rand_core::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Display};
use std::marker::PhantomData;
use thiserror::Error;
use zeroize::Zeroize;

/// Errors raised by curve backends during encoding and data embedding.
#[derive(Debug, Error)]
pub enum CurveError {
    #[error("invalid encoding length: got {0}, expected {1}")]
    InvalidLength(usize, usize),

    #[error("encoding is not a canonical group element")]
    NotCanonical,

    #[error("encoding is not a point on the curve")]
    NotOnCurve,

    #[error("data is too long to embed: {0} > {1}")]
    DataTooLong(usize, usize),

    #[error("could not find a curve point embedding the data")]
    EmbeddingFailed,

    #[error("point does not carry embedded data")]
    NoEmbeddedData,
}

/// Element represents an element of a group with the additive notation
/// which is also equipped with a multiplication transformation.
/// Two implementations are provided: Scalar, which forms a ring so RHS is
/// the same type, and Point, which can be multiplied by a scalar of its
/// prime field.
pub trait Element:
    Clone + Display + Debug + Eq + Serialize + for<'a> Deserialize<'a> + PartialEq + Send + Sync
{
    /// The right-hand-side argument for multiplication
    type RHS;

    /// Returns the zero element of the group
    fn new() -> Self;

    /// Returns the one element of the group
    fn one() -> Self;

    /// Adds the RHS element to the LHS element in place
    fn add(&mut self, s2: &Self);

    /// Multiplies the LHS element by the RHS element in place
    fn mul(&mut self, mul: &Self::RHS);

    /// Replaces the element by its additive inverse
    fn negate(&mut self);

    /// Subtracts the RHS element from the LHS element in place
    fn sub(&mut self, other: &Self) {
        let mut neg = other.clone();
        neg.negate();
        self.add(&neg);
    }

    /// Samples a random element using the provided RNG
    fn rand<R: RngCore>(rng: &mut R) -> Self;

    /// Returns the zero element of the group
    fn zero() -> Self {
        Self::new()
    }
}

/// Fixed-width canonical byte encoding of a group element.
///
/// `unmarshal` must consume the input exactly: a buffer of the wrong length,
/// a non-canonical value or trailing bytes are all rejected.
pub trait Encodable: Sized {
    /// The canonical encoded size in bytes
    fn marshal_len() -> usize;

    /// Returns the canonical encoding
    fn marshal(&self) -> Vec<u8>;

    /// Replaces the element by the one encoded in `data`
    fn unmarshal(&mut self, data: &[u8]) -> Result<(), CurveError>;
}

/// Scalar can be multiplied by only a Scalar, no other elements.
pub trait Scalar: Element + Encodable + Zeroize {
    /// Sets the scalar to the given small integer
    fn set_int(&mut self, i: u64);

    /// Sets the scalar to the given byte string reduced modulo the group order
    fn set_bytes(&mut self, buf: &[u8]);

    /// Returns the multiplicative inverse, or None for zero
    fn inverse(&self) -> Option<Self>;
}

/// Basic point functionality: multiplication by a scalar plus reversible
/// embedding of short byte strings into the point's coordinates.
pub trait Point: Element + Encodable {
    /// The maximum number of bytes `embed` accepts
    fn embed_len() -> usize;

    /// Picks a curve point whose x-coordinate carries `data`, rerolling the
    /// free bytes at random until a valid point is found
    fn embed<R: RngCore>(&mut self, data: &[u8], rng: &mut R) -> Result<(), CurveError>;

    /// Extracts the bytes previously embedded with `embed`
    fn data(&self) -> Result<Vec<u8>, CurveError>;
}

/// A group holds functionalities to create scalars and points; it is
/// similar to an Engine definition, just much simpler.
pub trait Curve: Clone + Debug + Send + Sync {
    /// The curve's scalar
    type Scalar: Scalar<RHS = Self::Scalar>;

    /// The curve's point
    type Point: Point<RHS = Self::Scalar>;

    /// scalar returns the identity element of the field.
    fn scalar() -> Self::Scalar {
        Self::Scalar::new()
    }

    /// point returns the default additive generator of the group.
    fn point() -> Self::Point {
        Self::Point::one()
    }
}

/// Returns a fresh keypair `(secret, secret * G)` sampled from the RNG.
pub fn new_key_pair<C: Curve, R: RngCore>(rng: &mut R) -> (C::Scalar, C::Point) {
    let private = C::Scalar::rand(rng);
    let mut public = C::Point::one();
    public.mul(&private);
    (private, public)
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Helper which binds together a scalar with a group type to form a curve
pub struct CurveFrom<S: Scalar, P: Point> {
    s: PhantomData<S>,
    p: PhantomData<P>,
}

impl<S, P> Curve for CurveFrom<S, P>
where
    S: Scalar<RHS = S>,
    P: Point<RHS = S>,
{
    type Scalar = S;
    type Point = P;
}
