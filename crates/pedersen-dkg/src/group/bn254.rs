//! BN254 adapter over arkworks

use ark_bn254::{g1, g2, Fq, Fr, G1Affine, G2Affine};
use ark_ec::short_weierstrass::Projective;
use ark_ec::{pairing::Pairing, CurveGroup, Group};
use ark_ff::{BigInteger, Field, One, PrimeField, Zero};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use rand_core::{CryptoRng, RngCore};
use sha3::Keccak256;

use super::{expand_message_xmd, HashablePoint, PairingCurve, Point, Scalar};
use crate::{Error, Result};

/// Domain separation tag for hashing messages to G1
pub const HASH_DST: &[u8] = b"BLS_SIG_BN254G1_XMD:KECCAK-256_TAI_RO_NUL_";

// The `ark_bn254::G{1,2}Projective` aliases go through `BnConfig` projections,
// which coherence cannot tell apart, so the impls name the concrete configs.
type G1Projective = Projective<g1::Config>;
type G2Projective = Projective<g2::Config>;

/// BN254 (alt_bn128), the curve with EVM precompiles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bn254;

impl PairingCurve for Bn254 {
    const NAME: &'static str = "BN254";

    type Scalar = Fr;
    type G1 = G1Projective;
    type G2 = G2Projective;

    fn pairing_check(a: &G1Projective, b: &G2Projective, c: &G1Projective, d: &G2Projective) -> bool {
        let lhs = ark_bn254::Bn254::pairing(a.into_affine(), b.into_affine());
        let rhs = ark_bn254::Bn254::pairing(c.into_affine(), d.into_affine());
        lhs == rhs
    }
}

impl Scalar for Fr {
    fn zero() -> Self {
        <Fr as Zero>::zero()
    }

    fn one() -> Self {
        <Fr as One>::one()
    }

    fn from_u64(value: u64) -> Self {
        Fr::from(value)
    }

    fn pick<R: RngCore + CryptoRng + ?Sized>(rng: &mut R) -> Self {
        let mut wide = [0u8; 64];
        rng.fill_bytes(&mut wide);
        Fr::from_le_bytes_mod_order(&wide)
    }

    fn inverse(&self) -> Option<Self> {
        Field::inverse(self)
    }

    fn marshal(&self) -> Vec<u8> {
        self.into_bigint().to_bytes_be()
    }

    fn unmarshal(bytes: &[u8]) -> Result<Self> {
        let bytes: [u8; 32] = super::fixed_bytes(bytes, "BN254 scalar")?;
        let value = Fr::from_be_bytes_mod_order(&bytes);
        if value.into_bigint().to_bytes_be() != bytes {
            return Err(Error::Deserialization(
                "BN254 scalar is not reduced".into(),
            ));
        }
        Ok(value)
    }
}

fn marshal_compressed<T: CanonicalSerialize>(value: &T) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(value.compressed_size());
    // Writing into a Vec cannot fail
    let _ = value.serialize_compressed(&mut bytes);
    bytes
}

impl Point for G1Projective {
    type Scalar = Fr;

    fn identity() -> Self {
        <G1Projective as Zero>::zero()
    }

    fn base() -> Self {
        <G1Projective as Group>::generator()
    }

    fn scale(&self, scalar: &Fr) -> Self {
        *self * *scalar
    }

    fn marshal(&self) -> Vec<u8> {
        marshal_compressed(&self.into_affine())
    }

    fn unmarshal(bytes: &[u8]) -> Result<Self> {
        let bytes: [u8; 32] = super::fixed_bytes(bytes, "BN254 G1 point")?;
        G1Affine::deserialize_compressed(&bytes[..])
            .map(G1Projective::from)
            .map_err(|e| Error::Deserialization(format!("BN254 G1 point: {}", e)))
    }
}

impl Point for G2Projective {
    type Scalar = Fr;

    fn identity() -> Self {
        <G2Projective as Zero>::zero()
    }

    fn base() -> Self {
        <G2Projective as Group>::generator()
    }

    fn scale(&self, scalar: &Fr) -> Self {
        *self * *scalar
    }

    fn marshal(&self) -> Vec<u8> {
        marshal_compressed(&self.into_affine())
    }

    fn unmarshal(bytes: &[u8]) -> Result<Self> {
        let bytes: [u8; 64] = super::fixed_bytes(bytes, "BN254 G2 point")?;
        G2Affine::deserialize_compressed(&bytes[..])
            .map(G2Projective::from)
            .map_err(|e| Error::Deserialization(format!("BN254 G2 point: {}", e)))
    }
}

impl HashablePoint for G1Projective {
    /// Try-and-increment: the message is expanded to a field element `x`
    /// and `x` is incremented until `x^3 + 3` is a square. G1 has cofactor
    /// one so every curve point is in the subgroup.
    ///
    /// Not constant time; only ever applied to public messages.
    fn hash_to_point(message: &[u8]) -> Self {
        // 48 bytes keep the modular bias below 2^-128
        let uniform = expand_message_xmd::<Keccak256>(message, HASH_DST, 48)
            .expect("constant expand_message_xmd parameters are valid");
        let mut x = Fq::from_be_bytes_mod_order(&uniform);
        let b = Fq::from(3u64);

        loop {
            let rhs = x.square() * x + b;
            if let Some(y) = rhs.sqrt() {
                let neg_y = -y;
                let y = if y.into_bigint() <= neg_y.into_bigint() {
                    y
                } else {
                    neg_y
                };
                return G1Affine::new_unchecked(x, y).into();
            }
            x += Fq::one();
        }
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
        assert_eq!(Point::marshal(&G1Projective::base()).len(), 32);
        assert_eq!(Point::marshal(&G2Projective::base()).len(), 64);
    }

    #[test]
    fn test_unreduced_scalar_rejected() {
        assert!(<Fr as Scalar>::unmarshal(&[0xff; 32]).is_err());
    }

    #[test]
    fn test_hashed_point_is_on_curve() {
        let p = G1Projective::hash_to_point(b"Hello BLS").into_affine();
        assert!(p.is_on_curve());
        assert!(p.is_in_correct_subgroup_assuming_on_curve());
    }
}
