//! # Threshold EC
//!
//! Building blocks for threshold cryptography over prime-order elliptic
//! curves: generic group traits with a secp256k1 instantiation, Shamir
//! polynomials with Lagrange recovery, detached Schnorr signatures, an
//! ephemeral-DH/HKDF/AES-GCM envelope, and a byte-embedding ElGamal scheme.
//!
//! ## Secret sharing
//!
//! ```rust
//! use threshold_ec::{
//!     curve::secp256k1::Secp256k1,
//!     poly::{Idx, Poly, PrivatePoly},
//! };
//!
//! let (n, t) = (5, 3);
//! // create the private key polynomial
//! let private_poly = PrivatePoly::<Secp256k1>::new(t - 1);
//!
//! // evaluate it at `n` points to generate the shares
//! let shares = (0..n).map(|i| private_poly.eval(i as Idx)).collect::<Vec<_>>();
//!
//! // any `t` of them recover the secret
//! let secret = Poly::recover(t, shares[1..1 + t].to_vec()).unwrap();
//! assert_eq!(&secret, private_poly.public_key());
//! ```
//!
//! ### Supporting a new curve
//!
//! Curves are implemented in the [`curve`] module. In order to support a new
//! curve, implement the `Scalar`, `Element`, `Point` and `Encodable` traits
//! of the [`group`] module for its field and group types. For reference, use
//! the existing secp256k1 implementation which wraps
//! [arkworks](https://github.com/arkworks-rs/algebra).

/// Curve implementations for the traits defined in the [`group`](group/index.html) module.
pub mod curve;

/// Ephemeral Diffie-Hellman envelope: HKDF-SHA256 key derivation and
/// AES-256-GCM sealing, used to encrypt deals.
pub mod dh;

/// ElGamal encryption of short byte strings through point embedding.
pub mod elgamal;

/// Definitions of generic traits with scalars of prime fields and points on elliptic curves.
pub mod group;

/// Implementation of a polynomial suitable to be used for secret sharing schemes and DKG
/// protocols. It can evaluate and interpolate private and public shares to their corresponding
/// polynomial.
pub mod poly;

/// Detached Schnorr signatures used to authenticate protocol messages.
pub mod schnorr;
