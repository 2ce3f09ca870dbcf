//! BLS12-381 adapter over `ic_bls12_381`

use ic_bls12_381::hash_to_curve::{ExpandMsgXmd, HashToCurve};
use ic_bls12_381::{pairing, G1Affine, G1Projective, G2Affine, G2Projective, Scalar as Fr};
use rand_core::{CryptoRng, RngCore};

use super::{HashablePoint, PairingCurve, Point, Scalar};
use crate::{Error, Result};

/// Ciphersuite of RFC 9380 / draft-irtf-cfrg-bls-signature, minimal-signature-size variant
pub const HASH_DST: &[u8] = b"BLS_SIG_BLS12381G1_XMD:SHA-256_SSWU_RO_NUL_";

/// BLS12-381
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bls12381;

impl PairingCurve for Bls12381 {
    const NAME: &'static str = "BLS12-381";

    type Scalar = Fr;
    type G1 = G1Projective;
    type G2 = G2Projective;

    fn pairing_check(a: &G1Projective, b: &G2Projective, c: &G1Projective, d: &G2Projective) -> bool {
        let lhs = pairing(&G1Affine::from(a), &G2Affine::from(b));
        let rhs = pairing(&G1Affine::from(c), &G2Affine::from(d));
        lhs == rhs
    }
}

impl Scalar for Fr {
    fn zero() -> Self {
        Fr::from(0u64)
    }

    fn one() -> Self {
        Fr::from(1u64)
    }

    fn from_u64(value: u64) -> Self {
        Fr::from(value)
    }

    fn pick<R: RngCore + CryptoRng + ?Sized>(rng: &mut R) -> Self {
        let mut wide = [0u8; 64];
        rng.fill_bytes(&mut wide);
        Fr::from_bytes_wide(&wide)
    }

    fn inverse(&self) -> Option<Self> {
        Option::from(self.invert())
    }

    fn marshal(&self) -> Vec<u8> {
        self.to_bytes().to_vec()
    }

    fn unmarshal(bytes: &[u8]) -> Result<Self> {
        let bytes: [u8; 32] = super::fixed_bytes(bytes, "BLS12-381 scalar")?;
        Option::from(Fr::from_bytes(&bytes))
            .ok_or_else(|| Error::Deserialization("BLS12-381 scalar is not reduced".into()))
    }
}

impl Point for G1Projective {
    type Scalar = Fr;

    fn identity() -> Self {
        G1Projective::identity()
    }

    fn base() -> Self {
        G1Projective::generator()
    }

    fn scale(&self, scalar: &Fr) -> Self {
        self * scalar
    }

    fn marshal(&self) -> Vec<u8> {
        G1Affine::from(self).to_compressed().to_vec()
    }

    fn unmarshal(bytes: &[u8]) -> Result<Self> {
        let bytes: [u8; 48] = super::fixed_bytes(bytes, "BLS12-381 G1 point")?;
        Option::<G1Affine>::from(G1Affine::from_compressed(&bytes))
            .map(G1Projective::from)
            .ok_or_else(|| Error::Deserialization("invalid BLS12-381 G1 point".into()))
    }
}

impl Point for G2Projective {
    type Scalar = Fr;

    fn identity() -> Self {
        G2Projective::identity()
    }

    fn base() -> Self {
        G2Projective::generator()
    }

    fn scale(&self, scalar: &Fr) -> Self {
        self * scalar
    }

    fn marshal(&self) -> Vec<u8> {
        G2Affine::from(self).to_compressed().to_vec()
    }

    fn unmarshal(bytes: &[u8]) -> Result<Self> {
        let bytes: [u8; 96] = super::fixed_bytes(bytes, "BLS12-381 G2 point")?;
        Option::<G2Affine>::from(G2Affine::from_compressed(&bytes))
            .map(G2Projective::from)
            .ok_or_else(|| Error::Deserialization("invalid BLS12-381 G2 point".into()))
    }
}

impl HashablePoint for G1Projective {
    fn hash_to_point(message: &[u8]) -> Self {
        <G1Projective as HashToCurve<ExpandMsgXmd<sha2::Sha256>>>::hash_to_curve(message, HASH_DST)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    #[test]
    fn test_encoding_sizes() {
        let s = Fr::pick(&mut OsRng);
        assert_eq!(Scalar::marshal(&s).len(), 32);
        assert_eq!(Point::marshal(&<G1Projective as Point>::base()).len(), 48);
        assert_eq!(Point::marshal(&<G2Projective as Point>::base()).len(), 96);
    }

    #[test]
    fn test_identity_round_trips() {
        let id = <G2Projective as Point>::identity();
        assert_eq!(<G2Projective as Point>::unmarshal(&id.marshal()).unwrap(), id);
    }
}
