//! Resharing an existing key to a new node set
//!
//! Each old node deals a fresh polynomial whose constant term is its old
//! share. A new node interpolates the deals it received across old dealer
//! indices, which yields a share of the original secret under a new
//! polynomial of the new threshold.

use rand_core::{CryptoRng, RngCore};
use tracing::{debug, info, instrument, warn};

use super::dkg::slot_bundles;
use super::{CurveState, DealBundle, DistKeyGenerator, Phase};
use crate::group::{KeyPoint, PairingCurve, Point};
use crate::poly::{recover_commit, recover_secret, PriShare, PubPoly, PubShare};
use crate::{CurveShare, DistKeyShare, DkgConfig, Error, NodeIndex, Result};

impl<C: PairingCurve> CurveState<C> {
    /// Interpolate the share of `own_index` and the new public polynomial
    /// from the recorded deals of the old dealers
    fn recover_reshared(
        &self,
        own_index: NodeIndex,
        new_t: usize,
        old_t: usize,
        old_n: usize,
    ) -> Result<CurveShare<C>> {
        let dealt: Vec<_> = (0..old_n as u32)
            .filter_map(|dealer| self.slot(dealer).ok())
            .collect();

        let shares: Vec<PriShare<C::Scalar>> = dealt.iter().map(|(share, _)| **share).collect();
        let value = recover_secret(&shares, old_t, old_n)?;

        let mut commits = Vec::with_capacity(new_t);
        for k in 0..new_t {
            let coefficient: Vec<PubShare<KeyPoint<C>>> = dealt
                .iter()
                .map(|(share, poly)| PubShare {
                    index: share.index,
                    value: poly.commits()[k].clone(),
                })
                .collect();
            commits.push(recover_commit(&coefficient, old_t, old_n)?);
        }

        let pub_poly = PubPoly::new(<KeyPoint<C> as Point>::base(), commits);
        let share = PriShare {
            index: own_index,
            value,
        };
        // Implied by verify_shares over the recorded deals; checked again on
        // the interpolated result
        if !pub_poly.check(&share) {
            return Err(Error::PublicPolyCheckFailure {
                index: own_index,
                curve: C::NAME,
            });
        }

        Ok(CurveShare {
            commits: pub_poly.commits().to_vec(),
            share,
        })
    }
}

fn check_new_set(new_config: &DkgConfig) -> Result<()> {
    let n = new_config.n();
    let new_t = new_config.threshold;
    if new_t == 0 || new_t > n {
        return Err(Error::InvalidConfig(format!(
            "new threshold must be in 1..={}, got {}",
            n, new_t
        )));
    }
    for (position, node) in new_config.nodes.iter().enumerate() {
        if node.index as usize != position {
            return Err(Error::InvalidConfig(format!(
                "new node set indices must be 0..{} in order",
                n
            )));
        }
    }
    Ok(())
}

impl DistKeyGenerator {
    /// Deal `old_share` to the node set of `new_config`, in its session and
    /// with its threshold.
    ///
    /// The generator must belong to the old node set; its working
    /// polynomials are replaced by the resharing polynomials. A generator
    /// that finished key generation can reshare its own output, and can
    /// reshare again to later node sets.
    #[instrument(skip_all, fields(index = self.index, new_n = new_config.n(), new_t = new_config.threshold))]
    pub fn reshare<R: RngCore + CryptoRng>(
        &mut self,
        old_share: &DistKeyShare,
        new_config: &DkgConfig,
        rng: &mut R,
    ) -> Result<DealBundle> {
        self.require_phase("reshare", &[Phase::Init, Phase::Dealt, Phase::Finished])?;
        check_new_set(new_config)?;

        if old_share.index() != self.index || old_share.bls12_381.share.index != self.index {
            return Err(Error::InvalidConfig(format!(
                "share of node {} cannot be reshared by node {}",
                old_share.index(),
                self.index
            )));
        }

        let new_t = new_config.threshold;
        self.bn254 = CurveState::new(new_t, Some(old_share.bn254.share.value), rng)?;
        self.bls12_381 = CurveState::new(new_t, Some(old_share.bls12_381.share.value), rng)?;

        let bundle = self.deal_to(&new_config.session_id, &new_config.nodes, rng)?;

        info!(
            index = self.index,
            new_n = new_config.n(),
            new_t,
            "Dealt reshare"
        );
        Ok(bundle)
    }

    /// Process reshare bundles from the old node set, which had threshold
    /// `old_t` and `old_n` nodes. Called on a generator of the new node set.
    #[instrument(skip_all, fields(index = self.index, bundles = bundles.len(), old_t = old_t, old_n = old_n))]
    pub fn process_reshare_deal_bundles(
        &mut self,
        bundles: &[DealBundle],
        old_t: usize,
        old_n: usize,
    ) -> Result<DistKeyShare> {
        self.require_phase("process reshare bundles", &[Phase::Init, Phase::Dealt])?;
        let result = self.process_reshare_inner(bundles, old_t, old_n);
        self.conclude(result)
    }

    fn process_reshare_inner(
        &mut self,
        bundles: &[DealBundle],
        old_t: usize,
        old_n: usize,
    ) -> Result<DistKeyShare> {
        if old_t == 0 || old_t > old_n {
            return Err(Error::InvalidConfig(format!(
                "old threshold must be in 1..={}, got {}",
                old_n, old_t
            )));
        }
        if let Some(dealers) = &self.config.dealers {
            if dealers.len() != old_n {
                return Err(Error::InvalidConfig(format!(
                    "declared dealer set has {} nodes, expected {}",
                    dealers.len(),
                    old_n
                )));
            }
        } else {
            warn!("No dealer set configured, reshare bundle signatures are not checked");
        }

        self.bn254.reset(old_n);
        self.bls12_381.reset(old_n);

        let ordered = slot_bundles(bundles, old_n)?;
        for bundle in &ordered {
            self.check_bundle_shape(bundle)?;
            if let Some(dealers) = &self.config.dealers {
                bundle.verify_signature(&dealers[bundle.dealer_index as usize].public)?;
            }

            self.bn254.record_public(bundle.dealer_index, &bundle.public_bn254);
            self.bls12_381
                .record_public(bundle.dealer_index, &bundle.public_bls12_381);
            self.open_bundle(bundle)?;
        }
        debug!(dealers = ordered.len(), "Decrypted reshare deals");

        let dealers: Vec<NodeIndex> = ordered.iter().map(|b| b.dealer_index).collect();
        self.bn254.verify_shares(self.index, dealers.iter().copied())?;
        self.bls12_381.verify_shares(self.index, dealers.iter().copied())?;

        let new_t = self.config.threshold;
        let key_share = DistKeyShare {
            bn254: self.bn254.recover_reshared(self.index, new_t, old_t, old_n)?,
            bls12_381: self.bls12_381.recover_reshared(self.index, new_t, old_t, old_n)?,
        };

        info!(
            index = self.index,
            public_key_bn254 = hex::encode(key_share.bn254.public_key().marshal()),
            public_key_bls12_381 = hex::encode(key_share.bls12_381.public_key().marshal()),
            "Reshare completed successfully"
        );
        Ok(key_share)
    }
}
