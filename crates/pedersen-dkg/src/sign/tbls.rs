//! Threshold BLS signatures
//!
//! A partial signature is the share index as a big-endian `u16` followed by
//! the marshalled point `H(msg) * share`. Any `t` valid partials recover the
//! signature of the group key by interpolation in G1.

use std::marker::PhantomData;

use tracing::{debug, instrument};

use super::Bls;
use crate::group::{KeyPoint, PairingCurve, Point, SigPoint};
use crate::poly::{recover_commit, PriShare, PubPoly, PubShare};
use crate::{Error, NodeIndex, Result};

const INDEX_LEN: usize = 2;

/// Threshold BLS on curve `C`
pub struct ThresholdBls<C>(PhantomData<C>);

impl<C: PairingCurve> ThresholdBls<C> {
    /// Partial signature of `msg` with one key share
    pub fn sign(share: &PriShare<C::Scalar>, msg: &[u8]) -> Result<Vec<u8>> {
        let index = u16::try_from(share.index).map_err(|_| {
            Error::InvalidConfig(format!("share index {} does not fit a partial signature", share.index))
        })?;

        let point = Bls::<C>::sign_point(&share.value, msg);
        let mut partial = index.to_be_bytes().to_vec();
        partial.extend_from_slice(&point.marshal());
        Ok(partial)
    }

    /// Index of the share that produced `partial`
    pub fn index_of(partial: &[u8]) -> Result<NodeIndex> {
        let bytes: [u8; INDEX_LEN] = partial
            .get(..INDEX_LEN)
            .and_then(|b| b.try_into().ok())
            .ok_or_else(|| Error::Deserialization("partial signature too short".into()))?;
        Ok(u16::from_be_bytes(bytes) as NodeIndex)
    }

    fn parse(partial: &[u8]) -> Result<PubShare<SigPoint<C>>> {
        let index = Self::index_of(partial)?;
        let value = <SigPoint<C> as Point>::unmarshal(&partial[INDEX_LEN..])?;
        Ok(PubShare { index, value })
    }

    /// Verify a partial signature against the public share of its signer
    pub fn verify_partial(
        pub_poly: &PubPoly<KeyPoint<C>>,
        msg: &[u8],
        partial: &[u8],
    ) -> Result<()> {
        let share = Self::parse(partial).map_err(|_| Error::SignatureVerificationFailure)?;
        let public = pub_poly.eval(share.index).value;
        Bls::<C>::verify_point(&public, msg, &share.value)
    }

    /// Recover the group signature from at least `t` partials of an
    /// `n`-node set. Malformed, repeated, out of range and invalid partials
    /// are skipped.
    #[instrument(skip_all, fields(curve = C::NAME, partials = partials.len(), t = t, n = n))]
    pub fn recover<S: AsRef<[u8]>>(
        pub_poly: &PubPoly<KeyPoint<C>>,
        msg: &[u8],
        partials: &[S],
        t: usize,
        n: usize,
    ) -> Result<Vec<u8>> {
        let mut shares: Vec<PubShare<SigPoint<C>>> = Vec::with_capacity(t);

        for partial in partials {
            let partial = partial.as_ref();
            let share = match Self::parse(partial) {
                Ok(share) => share,
                Err(e) => {
                    debug!(error = %e, "Skipping malformed partial signature");
                    continue;
                }
            };
            if share.index as usize >= n {
                debug!(index = share.index, "Skipping out of range partial signature");
                continue;
            }
            if shares.iter().any(|s| s.index == share.index) {
                debug!(index = share.index, "Skipping repeated partial signature");
                continue;
            }
            let public = pub_poly.eval(share.index).value;
            if Bls::<C>::verify_point(&public, msg, &share.value).is_err() {
                debug!(index = share.index, "Skipping invalid partial signature");
                continue;
            }

            shares.push(share);
            if shares.len() >= t {
                break;
            }
        }

        let signature = recover_commit(&shares, t, n)?;
        Ok(signature.marshal())
    }

    /// Verify a recovered signature under the group public key
    pub fn verify_recovered(public: &KeyPoint<C>, msg: &[u8], sig: &[u8]) -> Result<()> {
        Bls::<C>::verify(public, msg, sig)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::{Bls12381, Bn254, Scalar};
    use crate::keygen::tests::run_dkg;
    use crate::poly::PriPoly;
    use crate::CurveShare;
    use rand::rngs::OsRng;

    const MSG: &[u8] = b"Hello BLS";

    fn partials<C: PairingCurve>(shares: &[&CurveShare<C>], msg: &[u8]) -> Vec<Vec<u8>> {
        shares
            .iter()
            .map(|s| ThresholdBls::<C>::sign(&s.share, msg).unwrap())
            .collect()
    }

    fn threshold_round_trip<C: PairingCurve>(shares: Vec<&CurveShare<C>>) {
        let pub_poly = shares[0].pub_poly();
        let public = shares[0].public_key();

        // t = 3 of n = 5
        let a = partials(&shares[..3], MSG);
        let b = partials(&shares[2..], MSG);

        let sig_a = ThresholdBls::<C>::recover(&pub_poly, MSG, &a, 3, 5).unwrap();
        let sig_b = ThresholdBls::<C>::recover(&pub_poly, MSG, &b, 3, 5).unwrap();
        assert_eq!(sig_a, sig_b);

        ThresholdBls::<C>::verify_recovered(&public, MSG, &sig_a).unwrap();
        Bls::<C>::verify(&public, MSG, &sig_a).unwrap();

        for partial in &a {
            ThresholdBls::<C>::verify_partial(&pub_poly, MSG, partial).unwrap();
        }

        // Tampering and wrong keys
        let mut tampered = sig_a.clone();
        let last = tampered.len() - 1;
        tampered[last] ^= 0x01;
        assert!(ThresholdBls::<C>::verify_recovered(&public, MSG, &tampered).is_err());
        assert!(ThresholdBls::<C>::verify_recovered(&public, b"Hello BLS?", &sig_a).is_err());
        let (_, wrong) = Bls::<C>::keypair(&mut OsRng);
        assert!(matches!(
            ThresholdBls::<C>::verify_recovered(&wrong, MSG, &sig_a),
            Err(Error::SignatureVerificationFailure)
        ));

        // Two partials are not enough
        let err = ThresholdBls::<C>::recover(&pub_poly, MSG, &a[..2], 3, 5).unwrap_err();
        assert!(matches!(err, Error::InsufficientShares { required: 3, got: 2 }));
    }

    #[test]
    fn test_hello_bls_after_dkg() {
        let (_, _, shares) = run_dkg(5, 3);

        let bn: Vec<_> = shares.iter().map(|s| &s.bn254).collect();
        threshold_round_trip::<Bn254>(bn);

        let bls: Vec<_> = shares.iter().map(|s| &s.bls12_381).collect();
        threshold_round_trip::<Bls12381>(bls);
    }

    #[test]
    fn test_invalid_partials_are_skipped() {
        let (_, _, shares) = run_dkg(5, 3);
        let bn: Vec<_> = shares.iter().map(|s| &s.bn254).collect();
        let pub_poly = bn[0].pub_poly();

        let mut all = partials(&bn, MSG);
        // Corrupt partial 0, truncate partial 1, and sign another message with partial 2
        all[0][5] ^= 0x01;
        all[1].truncate(1);
        all[2] = ThresholdBls::<Bn254>::sign(&bn[2].share, b"other").unwrap();

        assert!(ThresholdBls::<Bn254>::verify_partial(&pub_poly, MSG, &all[2]).is_err());

        let err = ThresholdBls::<Bn254>::recover(&pub_poly, MSG, &all, 3, 5).unwrap_err();
        assert!(matches!(err, Error::InsufficientShares { required: 3, got: 2 }));

        all.push(ThresholdBls::<Bn254>::sign(&bn[0].share, MSG).unwrap());
        let sig = ThresholdBls::<Bn254>::recover(&pub_poly, MSG, &all, 3, 5).unwrap();
        ThresholdBls::<Bn254>::verify_recovered(&bn[0].public_key(), MSG, &sig).unwrap();
    }

    #[test]
    fn test_repeated_partials_are_skipped() {
        let (_, _, shares) = run_dkg(5, 3);
        let bls: Vec<_> = shares.iter().map(|s| &s.bls12_381).collect();
        let pub_poly = bls[0].pub_poly();

        let p = partials(&bls[..3], MSG);
        let repeated = vec![p[0].clone(), p[0].clone(), p[1].clone(), p[2].clone()];

        let sig = ThresholdBls::<Bls12381>::recover(&pub_poly, MSG, &repeated, 3, 5).unwrap();
        ThresholdBls::<Bls12381>::verify_recovered(&bls[0].public_key(), MSG, &sig).unwrap();
        assert_eq!(sig, ThresholdBls::<Bls12381>::recover(&pub_poly, MSG, &p, 3, 5).unwrap());

        // Repeats alone never make up a quorum
        let only_two = vec![p[0].clone(), p[0].clone(), p[1].clone(), p[1].clone()];
        let err = ThresholdBls::<Bls12381>::recover(&pub_poly, MSG, &only_two, 3, 5).unwrap_err();
        assert!(matches!(err, Error::InsufficientShares { required: 3, got: 2 }));
    }

    #[test]
    fn test_out_of_range_partial_is_skipped() {
        type S = <Bn254 as PairingCurve>::Scalar;
        let poly = PriPoly::<S>::new(2, None, &mut OsRng).unwrap();
        let pub_poly = poly.commit(&<KeyPoint<Bn254> as Point>::base());

        // Share 5 is valid for the polynomial but outside n = 3
        let parts: Vec<_> = [0u32, 5]
            .iter()
            .map(|i| ThresholdBls::<Bn254>::sign(&poly.eval(*i), MSG).unwrap())
            .collect();
        assert!(ThresholdBls::<Bn254>::recover(&pub_poly, MSG, &parts, 2, 3).is_err());
        assert!(ThresholdBls::<Bn254>::recover(&pub_poly, MSG, &parts, 2, 6).is_ok());
    }

    #[test]
    fn test_partial_index_prefix() {
        type S = <Bls12381 as PairingCurve>::Scalar;
        let share = PriShare {
            index: 258,
            value: <S as Scalar>::from_u64(9),
        };
        let partial = ThresholdBls::<Bls12381>::sign(&share, MSG).unwrap();
        assert_eq!(&partial[..2], &[1, 2]);
        assert_eq!(partial.len(), 2 + 48);
        assert_eq!(ThresholdBls::<Bls12381>::index_of(&partial).unwrap(), 258);

        let too_large = PriShare {
            index: 70_000,
            value: <S as Scalar>::from_u64(9),
        };
        assert!(ThresholdBls::<Bls12381>::sign(&too_large, MSG).is_err());
    }
}
