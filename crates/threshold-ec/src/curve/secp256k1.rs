//! Instantiation of the group traits over secp256k1.
//!
//! Scalars marshal to 32 big-endian bytes, points to the 33-byte SEC1
//! compressed form (`0x02`/`0x03 || x`). Both encodings reject non-canonical
//! inputs so that `unmarshal . marshal` is the identity and nothing else.

use crate::group::{CurveError, CurveFrom, Element, Encodable, Point as Pt, Scalar as Sc};
use ark_ec::{AffineRepr, CurveGroup, Group};
use ark_ff::{BigInteger, Field, PrimeField, UniformRand, Zero};
use ark_secp256k1 as secp;
use rand_core::RngCore;
use serde::{
    de::Error as DeserializeError, Deserialize, Deserializer, Serialize, Serializer,
};
use std::fmt;
use zeroize::Zeroize;

const SCALAR_LEN: usize = 32;
const POINT_LEN: usize = 33;

/// An element of the scalar field of secp256k1.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Scalar(secp::Fr);

/// A point on secp256k1, kept in projective coordinates.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Point(secp::Projective);

/// The default curve of the crate.
pub type Secp256k1 = CurveFrom<Scalar, Point>;

impl Element for Scalar {
    type RHS = Scalar;

    fn new() -> Self {
        Self(secp::Fr::zero())
    }

    fn one() -> Self {
        Self(secp::Fr::from(1u64))
    }

    fn add(&mut self, s2: &Self) {
        self.0 += s2.0;
    }

    fn mul(&mut self, mul: &Scalar) {
        self.0 *= mul.0;
    }

    fn negate(&mut self) {
        self.0 = -self.0;
    }

    fn rand<R: RngCore>(rng: &mut R) -> Self {
        Self(secp::Fr::rand(rng))
    }
}

impl Encodable for Scalar {
    fn marshal_len() -> usize {
        SCALAR_LEN
    }

    fn marshal(&self) -> Vec<u8> {
        self.0.into_bigint().to_bytes_be()
    }

    fn unmarshal(&mut self, data: &[u8]) -> Result<(), CurveError> {
        if data.len() != SCALAR_LEN {
            return Err(CurveError::InvalidLength(data.len(), SCALAR_LEN));
        }
        let v = secp::Fr::from_be_bytes_mod_order(data);
        // values >= the group order would silently wrap above
        if v.into_bigint().to_bytes_be() != data {
            return Err(CurveError::NotCanonical);
        }
        self.0 = v;
        Ok(())
    }
}

impl Sc for Scalar {
    fn set_int(&mut self, i: u64) {
        self.0 = secp::Fr::from(i);
    }

    fn set_bytes(&mut self, buf: &[u8]) {
        self.0 = secp::Fr::from_be_bytes_mod_order(buf);
    }

    fn inverse(&self) -> Option<Self> {
        Field::inverse(&self.0).map(Self)
    }
}

impl Zeroize for Scalar {
    fn zeroize(&mut self) {
        self.0 = secp::Fr::zero();
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{{{:?}}}", self.0)
    }
}

impl Element for Point {
    type RHS = Scalar;

    fn new() -> Self {
        Self(secp::Projective::zero())
    }

    fn one() -> Self {
        Self(secp::Projective::generator())
    }

    fn add(&mut self, s2: &Self) {
        self.0 += s2.0;
    }

    fn mul(&mut self, mul: &Scalar) {
        self.0 *= mul.0;
    }

    fn negate(&mut self) {
        self.0 = -self.0;
    }

    fn rand<R: RngCore>(rng: &mut R) -> Self {
        Self(secp::Projective::rand(rng))
    }
}

impl Encodable for Point {
    fn marshal_len() -> usize {
        POINT_LEN
    }

    fn marshal(&self) -> Vec<u8> {
        let affine = self.0.into_affine();
        match affine.xy() {
            Some((x, y)) => {
                let mut out = Vec::with_capacity(POINT_LEN);
                out.push(if y.into_bigint().is_odd() { 0x03 } else { 0x02 });
                out.extend_from_slice(&x.into_bigint().to_bytes_be());
                out
            }
            // the identity never travels on the wire but the encoding must
            // stay total
            None => vec![0u8; POINT_LEN],
        }
    }

    fn unmarshal(&mut self, data: &[u8]) -> Result<(), CurveError> {
        if data.len() != POINT_LEN {
            return Err(CurveError::InvalidLength(data.len(), POINT_LEN));
        }
        match data[0] {
            0x00 => {
                if data[1..].iter().any(|b| *b != 0) {
                    return Err(CurveError::NotCanonical);
                }
                self.0 = secp::Projective::zero();
                Ok(())
            }
            tag @ (0x02 | 0x03) => {
                let x = secp::Fq::from_be_bytes_mod_order(&data[1..]);
                if x.into_bigint().to_bytes_be() != data[1..] {
                    return Err(CurveError::NotCanonical);
                }
                let affine = secp::Affine::get_point_from_x_unchecked(x, false)
                    .ok_or(CurveError::NotOnCurve)?;
                let y_odd = affine
                    .xy()
                    .map(|(_, y)| y.into_bigint().is_odd())
                    .unwrap_or(false);
                let mut point = affine.into_group();
                if y_odd != (tag == 0x03) {
                    point = -point;
                }
                self.0 = point;
                Ok(())
            }
            _ => Err(CurveError::NotCanonical),
        }
    }
}

impl Pt for Point {
    fn embed_len() -> usize {
        // one byte is consumed by the length tag and one is kept free for
        // rerolling
        SCALAR_LEN - 2
    }

    fn embed<R: RngCore>(&mut self, data: &[u8], rng: &mut R) -> Result<(), CurveError> {
        let dl = data.len();
        if dl > Self::embed_len() {
            return Err(CurveError::DataTooLong(dl, Self::embed_len()));
        }

        // candidate x-coordinate: length tag, then the data, then random
        // filler. The tag in the most significant byte keeps the candidate
        // well below the field modulus.
        let mut buf = [0u8; SCALAR_LEN];
        buf[0] = dl as u8;
        buf[1..1 + dl].copy_from_slice(data);

        for _ in 0..256 {
            rng.fill_bytes(&mut buf[1 + dl..]);
            let x = secp::Fq::from_be_bytes_mod_order(&buf);
            if let Some(affine) = secp::Affine::get_point_from_x_unchecked(x, false) {
                self.0 = affine.into_group();
                return Ok(());
            }
        }

        Err(CurveError::EmbeddingFailed)
    }

    fn data(&self) -> Result<Vec<u8>, CurveError> {
        let buf = self.marshal();
        let dl = buf[1] as usize;
        if dl > Self::embed_len() {
            return Err(CurveError::NoEmbeddedData);
        }
        Ok(buf[2..2 + dl].to_vec())
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{{{:?}}}", self.0)
    }
}

// Serde goes through the canonical encodings so that transport blobs match
// the wire format byte for byte.

impl Serialize for Scalar {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_bytes(&self.marshal())
    }
}

impl<'de> Deserialize<'de> for Scalar {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let bytes = Vec::<u8>::deserialize(d)?;
        let mut out = Self::new();
        out.unmarshal(&bytes).map_err(DeserializeError::custom)?;
        Ok(out)
    }
}

impl Serialize for Point {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_bytes(&self.marshal())
    }
}

impl<'de> Deserialize<'de> for Point {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let bytes = Vec::<u8>::deserialize(d)?;
        let mut out = Self::new();
        out.unmarshal(&bytes).map_err(DeserializeError::custom)?;
        Ok(out)
    }
}
