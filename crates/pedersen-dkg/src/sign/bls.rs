//! Plain BLS signatures

use std::marker::PhantomData;

use rand_core::{CryptoRng, RngCore};

use crate::group::{HashablePoint, KeyPoint, PairingCurve, Point, Scalar, SigPoint};
use crate::{Error, Result};

/// BLS signatures on G1 with public keys on G2 of curve `C`
pub struct Bls<C>(PhantomData<C>);

impl<C: PairingCurve> Bls<C> {
    /// Sample a private key and its public key
    pub fn keypair<R: RngCore + CryptoRng + ?Sized>(rng: &mut R) -> (C::Scalar, KeyPoint<C>) {
        let private = C::Scalar::pick(rng);
        (private, Self::public_key(&private))
    }

    pub fn public_key(private: &C::Scalar) -> KeyPoint<C> {
        <KeyPoint<C> as Point>::base().scale(private)
    }

    /// `H(msg) * private`, marshalled
    pub fn sign(private: &C::Scalar, msg: &[u8]) -> Vec<u8> {
        Self::sign_point(private, msg).marshal()
    }

    pub(crate) fn sign_point(private: &C::Scalar, msg: &[u8]) -> SigPoint<C> {
        <SigPoint<C> as HashablePoint>::hash_to_point(msg).scale(private)
    }

    /// Check `e(sig, G2) == e(H(msg), public)`
    pub fn verify(public: &KeyPoint<C>, msg: &[u8], sig: &[u8]) -> Result<()> {
        let sig = <SigPoint<C> as Point>::unmarshal(sig)
            .map_err(|_| Error::SignatureVerificationFailure)?;
        Self::verify_point(public, msg, &sig)
    }

    pub(crate) fn verify_point(public: &KeyPoint<C>, msg: &[u8], sig: &SigPoint<C>) -> Result<()> {
        let hashed = <SigPoint<C> as HashablePoint>::hash_to_point(msg);
        if C::pairing_check(sig, &<KeyPoint<C> as Point>::base(), &hashed, public) {
            Ok(())
        } else {
            Err(Error::SignatureVerificationFailure)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::{Bls12381, Bn254};
    use rand::rngs::OsRng;

    fn sign_and_verify<C: PairingCurve>() {
        let (private, public) = Bls::<C>::keypair(&mut OsRng);
        let sig = Bls::<C>::sign(&private, b"Hello BLS");

        Bls::<C>::verify(&public, b"Hello BLS", &sig).unwrap();
        assert!(Bls::<C>::verify(&public, b"Hello BLS!", &sig).is_err());

        let (_, other) = Bls::<C>::keypair(&mut OsRng);
        assert!(Bls::<C>::verify(&other, b"Hello BLS", &sig).is_err());

        let mut tampered = sig.clone();
        tampered[5] ^= 0x01;
        assert!(matches!(
            Bls::<C>::verify(&public, b"Hello BLS", &tampered),
            Err(Error::SignatureVerificationFailure)
        ));
    }

    #[test]
    fn test_bn254() {
        sign_and_verify::<Bn254>();
    }

    #[test]
    fn test_bls12381() {
        sign_and_verify::<Bls12381>();
    }

    #[test]
    fn test_signatures_are_deterministic() {
        let (private, _) = Bls::<Bn254>::keypair(&mut OsRng);
        assert_eq!(
            Bls::<Bn254>::sign(&private, b"msg"),
            Bls::<Bn254>::sign(&private, b"msg")
        );
        assert_eq!(Bls::<Bn254>::sign(&private, b"msg").len(), 32);
        assert_eq!(Bls::<Bls12381>::sign(&<<Bls12381 as PairingCurve>::Scalar as Scalar>::one(), b"msg").len(), 48);
    }
}
