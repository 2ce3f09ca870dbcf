//! Curve abstraction
//!
//! The protocol code is written against the small set of traits below and is
//! instantiated twice, once per pairing curve. Keys and commitments live on
//! G2, signatures and hashed messages on G1.

use std::fmt::Debug;
use std::ops::{Add, Mul, Neg, Sub};

use rand_core::{CryptoRng, RngCore};

use crate::Result;

pub mod bls12381;
pub mod bn254;
pub mod encoding;
mod hash;

pub use bls12381::Bls12381;
pub use bn254::Bn254;
pub use hash::expand_message_xmd;

/// Element of a prime-order scalar field
pub trait Scalar:
    Copy
    + Debug
    + PartialEq
    + Send
    + Sync
    + 'static
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Neg<Output = Self>
{
    fn zero() -> Self;

    fn one() -> Self;

    fn from_u64(value: u64) -> Self;

    /// Sample a uniformly random element
    fn pick<R: RngCore + CryptoRng + ?Sized>(rng: &mut R) -> Self;

    /// Multiplicative inverse, `None` for zero
    fn inverse(&self) -> Option<Self>;

    /// Canonical fixed-size encoding
    fn marshal(&self) -> Vec<u8>;

    fn unmarshal(bytes: &[u8]) -> Result<Self>;
}

/// Element of a prime-order group, written additively
pub trait Point: Clone + Debug + PartialEq + Send + Sync + 'static + Add<Output = Self> {
    type Scalar: Scalar;

    fn identity() -> Self;

    /// The standard generator
    fn base() -> Self;

    /// Scalar multiplication
    fn scale(&self, scalar: &Self::Scalar) -> Self;

    /// Compressed encoding
    fn marshal(&self) -> Vec<u8>;

    /// Decode a compressed point, rejecting points off the curve or outside
    /// the prime-order subgroup
    fn unmarshal(bytes: &[u8]) -> Result<Self>;
}

/// A group that messages can be hashed into
pub trait HashablePoint: Point {
    fn hash_to_point(message: &[u8]) -> Self;
}

/// A pairing-friendly curve with signatures on G1 and keys on G2
pub trait PairingCurve: Send + Sync + 'static {
    /// Human readable curve name used in logs and errors
    const NAME: &'static str;

    type Scalar: Scalar;
    type G1: HashablePoint<Scalar = Self::Scalar>;
    type G2: Point<Scalar = Self::Scalar>;

    /// Returns true iff `e(a, b) == e(c, d)`
    fn pairing_check(a: &Self::G1, b: &Self::G2, c: &Self::G1, d: &Self::G2) -> bool;
}

/// Public key group of a pairing curve
pub type KeyPoint<C> = <C as PairingCurve>::G2;

/// Signature group of a pairing curve
pub type SigPoint<C> = <C as PairingCurve>::G1;

pub(crate) fn fixed_bytes<const N: usize>(bytes: &[u8], what: &str) -> Result<[u8; N]> {
    bytes.try_into().map_err(|_| {
        crate::Error::Deserialization(format!(
            "invalid {} length: expected {}, got {}",
            what,
            N,
            bytes.len()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    fn scalar_laws<S: Scalar>() {
        let a = S::pick(&mut OsRng);
        let b = S::pick(&mut OsRng);

        assert_eq!(a + S::zero(), a);
        assert_eq!(a * S::one(), a);
        assert_eq!(a - a, S::zero());
        assert_eq!(a + (-a), S::zero());
        assert_eq!(a * b, b * a);
        assert_eq!(a * a.inverse().unwrap(), S::one());
        assert!(S::zero().inverse().is_none());
        assert_eq!(S::from_u64(2) + S::from_u64(3), S::from_u64(5));

        let decoded = S::unmarshal(&a.marshal()).unwrap();
        assert_eq!(decoded, a);
    }

    fn point_laws<P: Point>() {
        let a = <P::Scalar as Scalar>::pick(&mut OsRng);
        let b = <P::Scalar as Scalar>::pick(&mut OsRng);
        let g = P::base();

        assert_eq!(g.scale(&a) + g.scale(&b), g.scale(&(a + b)));
        assert_eq!(g.scale(&a).scale(&b), g.scale(&(a * b)));
        assert_eq!(g.clone() + P::identity(), g);
        assert_eq!(g.scale(&<P::Scalar as Scalar>::zero()), P::identity());

        let p = g.scale(&a);
        assert_eq!(P::unmarshal(&p.marshal()).unwrap(), p);
        assert!(P::unmarshal(&[0u8; 3]).is_err());
    }

    fn pairing_bilinear<C: PairingCurve>() {
        let x = <C::Scalar as Scalar>::pick(&mut OsRng);
        let h = <C::G1 as HashablePoint>::hash_to_point(b"bilinear");
        let pk = <C::G2 as Point>::base().scale(&x);

        let g2 = <C::G2 as Point>::base();
        assert!(C::pairing_check(&h.scale(&x), &g2, &h, &pk));
        assert!(!C::pairing_check(&h, &g2, &h, &pk));
    }

    #[test]
    fn test_bn254_laws() {
        scalar_laws::<<Bn254 as PairingCurve>::Scalar>();
        point_laws::<<Bn254 as PairingCurve>::G1>();
        point_laws::<<Bn254 as PairingCurve>::G2>();
        pairing_bilinear::<Bn254>();
    }

    #[test]
    fn test_bls12381_laws() {
        scalar_laws::<<Bls12381 as PairingCurve>::Scalar>();
        point_laws::<<Bls12381 as PairingCurve>::G1>();
        point_laws::<<Bls12381 as PairingCurve>::G2>();
        pairing_bilinear::<Bls12381>();
    }

    #[test]
    fn test_hash_to_point_is_deterministic() {
        let a = <Bn254 as PairingCurve>::G1::hash_to_point(b"Hello BLS");
        let b = <Bn254 as PairingCurve>::G1::hash_to_point(b"Hello BLS");
        let c = <Bn254 as PairingCurve>::G1::hash_to_point(b"Hello BLS!");
        assert_eq!(a, b);
        assert_ne!(a, c);

        let a = <Bls12381 as PairingCurve>::G1::hash_to_point(b"Hello BLS");
        let b = <Bls12381 as PairingCurve>::G1::hash_to_point(b"Hello BLS");
        assert_eq!(a, b);
    }
}
