//! Distributed Key Generation (DKG) module
//!
//! A Pedersen-style DKG run in parallel on BN254 and BLS12-381, with two
//! independent secrets. Every participant deals one [`DealBundle`] to the
//! node set and processes the complete set of bundles into a
//! [`DistKeyShare`]. Resharing moves an existing shared secret to a new node
//! set and threshold while keeping the public key.
//!
//! There is no complaint phase: any bad deal aborts the run.

mod dkg;
mod driver;
mod messages;
mod reshare;

pub use driver::{run_keygen, run_reshare_dealer, run_reshare_receiver};
pub use messages::*;

use k256::SecretKey;
use rand_core::{CryptoRng, RngCore};

use crate::group::{Bls12381, Bn254, KeyPoint, PairingCurve, Point};
use crate::poly::{PriPoly, PriShare, PubPoly};
use crate::{DkgConfig, Error, Node, NodeIndex, Result, SessionId};

/// Protocol phase of a generator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Init,
    Dealt,
    Finished,
    Aborted,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Init => "init",
            Phase::Dealt => "dealt",
            Phase::Finished => "finished",
            Phase::Aborted => "aborted",
        }
    }
}

/// Per-curve working state: the local polynomial and the per-dealer
/// accumulators, indexed by dealer index
pub(crate) struct CurveState<C: PairingCurve> {
    pri_poly: PriPoly<C::Scalar>,
    pub_poly: PubPoly<KeyPoint<C>>,
    valid_shares: Vec<Option<PriShare<C::Scalar>>>,
    all_publics: Vec<Option<PubPoly<KeyPoint<C>>>>,
}

impl<C: PairingCurve> CurveState<C> {
    fn new<R: RngCore + CryptoRng>(
        threshold: usize,
        secret: Option<C::Scalar>,
        rng: &mut R,
    ) -> Result<Self> {
        let pri_poly = PriPoly::new(threshold, secret, rng)?;
        let pub_poly = pri_poly.commit(&<KeyPoint<C> as Point>::base());
        Ok(Self {
            pri_poly,
            pub_poly,
            valid_shares: Vec::new(),
            all_publics: Vec::new(),
        })
    }

    /// Empty accumulators for `dealers` dealers
    fn reset(&mut self, dealers: usize) {
        self.valid_shares = vec![None; dealers];
        self.all_publics = vec![None; dealers];
    }
}

/// One participant's protocol state for a single key generation or
/// resharing run
pub struct DistKeyGenerator {
    index: NodeIndex,
    identity: SecretKey,
    config: DkgConfig,
    phase: Phase,
    bn254: CurveState<Bn254>,
    bls12_381: CurveState<Bls12381>,
}

impl DistKeyGenerator {
    /// Create a generator for the node whose identity key is `identity`.
    /// Both curves get a fresh random secret.
    pub fn new<R: RngCore + CryptoRng>(
        config: DkgConfig,
        identity: SecretKey,
        rng: &mut R,
    ) -> Result<Self> {
        let public = identity.public_key();
        let index = config
            .nodes
            .iter()
            .find(|node| node.public == public)
            .map(|node| node.index)
            .ok_or_else(|| {
                Error::InvalidConfig("identity key is not part of the node set".into())
            })?;

        let bn254 = CurveState::new(config.threshold, None, rng)?;
        let bls12_381 = CurveState::new(config.threshold, None, rng)?;

        Ok(Self {
            index,
            identity,
            config,
            phase: Phase::Init,
            bn254,
            bls12_381,
        })
    }

    pub fn index(&self) -> NodeIndex {
        self.index
    }

    pub fn threshold(&self) -> usize {
        self.config.threshold
    }

    pub fn nodes(&self) -> &[Node] {
        &self.config.nodes
    }

    pub fn session_id(&self) -> &SessionId {
        &self.config.session_id
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Commitments to this generator's own BN254 polynomial
    pub fn pub_poly_bn254(&self) -> &PubPoly<KeyPoint<Bn254>> {
        &self.bn254.pub_poly
    }

    /// Commitments to this generator's own BLS12-381 polynomial
    pub fn pub_poly_bls12_381(&self) -> &PubPoly<KeyPoint<Bls12381>> {
        &self.bls12_381.pub_poly
    }

    fn require_phase(&self, operation: &'static str, allowed: &[Phase]) -> Result<()> {
        if allowed.contains(&self.phase) {
            Ok(())
        } else {
            Err(Error::InvalidPhase {
                operation,
                phase: self.phase.as_str(),
            })
        }
    }

    /// Move to `Finished` on success and to `Aborted` on any error
    fn conclude<T>(&mut self, result: Result<T>) -> Result<T> {
        self.phase = if result.is_ok() {
            Phase::Finished
        } else {
            Phase::Aborted
        };
        result
    }
}

/// Associated data for a deal: session, dealer and recipient
fn deal_aad(session_id: &SessionId, dealer: NodeIndex, recipient: NodeIndex) -> Vec<u8> {
    let mut aad = Vec::with_capacity(40);
    aad.extend_from_slice(session_id);
    aad.extend_from_slice(&dealer.to_be_bytes());
    aad.extend_from_slice(&recipient.to_be_bytes());
    aad
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::poly::recover_secret;
    use crate::DistKeyShare;
    use rand::rngs::OsRng;

    /// Identity keys and a config for `n` nodes
    pub(crate) fn setup(n: usize, t: usize) -> (Vec<SecretKey>, DkgConfig) {
        let keys: Vec<SecretKey> = (0..n).map(|_| SecretKey::random(&mut OsRng)).collect();
        let nodes = keys
            .iter()
            .enumerate()
            .map(|(i, k)| Node::new(i as u32, k.public_key()))
            .collect();
        let config = DkgConfig::new(nodes, t).unwrap();
        (keys, config)
    }

    pub(crate) fn generators(keys: &[SecretKey], config: &DkgConfig) -> Vec<DistKeyGenerator> {
        keys.iter()
            .map(|k| DistKeyGenerator::new(config.clone(), k.clone(), &mut OsRng).unwrap())
            .collect()
    }

    /// Finished generators and their key shares after key generation
    pub(crate) struct Finished {
        pub keys: Vec<SecretKey>,
        pub config: DkgConfig,
        pub gens: Vec<DistKeyGenerator>,
        pub shares: Vec<DistKeyShare>,
    }

    pub(crate) fn dkg(n: usize, t: usize) -> Finished {
        let (keys, config) = setup(n, t);
        let mut gens = generators(&keys, &config);
        let bundles: Vec<DealBundle> = gens.iter_mut().map(|g| g.deal(&mut OsRng).unwrap()).collect();
        let shares = gens
            .iter_mut()
            .map(|g| g.process_deal_bundles(&bundles).unwrap())
            .collect();
        Finished {
            keys,
            config,
            gens,
            shares,
        }
    }

    /// Full key generation among `n` nodes with threshold `t`
    pub(crate) fn run_dkg(n: usize, t: usize) -> (Vec<SecretKey>, DkgConfig, Vec<DistKeyShare>) {
        let finished = dkg(n, t);
        (finished.keys, finished.config, finished.shares)
    }

    #[test]
    fn test_unknown_identity_rejected() {
        let (_, config) = setup(3, 2);
        let stranger = SecretKey::random(&mut OsRng);
        assert!(matches!(
            DistKeyGenerator::new(config, stranger, &mut OsRng),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_generator_index_follows_identity() {
        let (keys, config) = setup(4, 2);
        let gens = generators(&keys, &config);
        for (i, g) in gens.iter().enumerate() {
            assert_eq!(g.index(), i as u32);
            assert_eq!(g.phase(), Phase::Init);
            assert_eq!(g.pub_poly_bn254().threshold(), 2);
            assert_eq!(g.pub_poly_bls12_381().threshold(), 2);
        }
    }

    #[test]
    fn test_independent_recombination() {
        let (_, _, shares) = run_dkg(5, 3);

        for subset in [[0usize, 1, 2], [1, 3, 4], [0, 2, 4]] {
            let bn: Vec<_> = subset.iter().map(|i| shares[*i].bn254.share).collect();
            let secret = recover_secret(&bn, 3, 5).unwrap();
            assert_eq!(
                <KeyPoint<Bn254> as Point>::base().scale(&secret),
                shares[0].bn254.public_key()
            );

            let bls: Vec<_> = subset.iter().map(|i| shares[*i].bls12_381.share).collect();
            let secret = recover_secret(&bls, 3, 5).unwrap();
            assert_eq!(
                <KeyPoint<Bls12381> as Point>::base().scale(&secret),
                shares[0].bls12_381.public_key()
            );
        }
    }
}
