//! Key generation: dealing and processing deal bundles

use k256::SecretKey;
use rand_core::{CryptoRng, RngCore};
use tracing::{debug, info, instrument};

use super::{deal_aad, CurveState, Deal, DealBundle, DistKeyGenerator, Phase};
use crate::group::{KeyPoint, PairingCurve, Point, Scalar};
use crate::poly::{PriShare, PubPoly};
use crate::{ecies, CurveShare, DistKeyShare, Error, Node, NodeIndex, Result, SessionId};

impl<C: PairingCurve> CurveState<C> {
    /// Evaluate the local polynomial for `recipient` and encrypt the result
    fn encrypt_share<R: RngCore + CryptoRng>(
        &self,
        recipient: &Node,
        aad: &[u8],
        rng: &mut R,
    ) -> Result<Vec<u8>> {
        let share = self.pri_poly.eval(recipient.index);
        ecies::encrypt(&recipient.public, &share.value.marshal(), aad, rng)
    }

    /// Record the commitments declared by `dealer`
    pub(super) fn record_public(&mut self, dealer: NodeIndex, commits: &[KeyPoint<C>]) {
        let pub_poly = PubPoly::new(<KeyPoint<C> as Point>::base(), commits.to_vec());
        self.all_publics[dealer as usize] = Some(pub_poly);
    }

    /// Decrypt the share `dealer` addressed to us and record it under the
    /// dealer's index
    pub(super) fn open_share(
        &mut self,
        dealer: NodeIndex,
        ciphertext: &[u8],
        aad: &[u8],
        identity: &SecretKey,
    ) -> Result<()> {
        let plaintext = ecies::decrypt(identity, ciphertext, aad)
            .map_err(|_| Error::DecryptionFailure { dealer })?;
        let value = C::Scalar::unmarshal(&plaintext).map_err(|_| Error::DecryptionFailure { dealer })?;
        self.valid_shares[dealer as usize] = Some(PriShare {
            index: dealer,
            value,
        });
        Ok(())
    }

    /// Verify the shares of `dealers` against their commitments, evaluated
    /// at our own index
    pub(super) fn verify_shares<I>(&self, own_index: NodeIndex, dealers: I) -> Result<()>
    where
        I: IntoIterator<Item = NodeIndex>,
    {
        for dealer in dealers {
            let (share, pub_poly) = self.slot(dealer)?;
            let own = PriShare {
                index: own_index,
                value: share.value,
            };
            if !pub_poly.check(&own) {
                return Err(Error::ShareVerificationFailure {
                    dealer,
                    curve: C::NAME,
                });
            }
        }
        Ok(())
    }

    pub(super) fn slot(&self, dealer: NodeIndex) -> Result<(&PriShare<C::Scalar>, &PubPoly<KeyPoint<C>>)> {
        let missing = || Error::MissingDealerContribution {
            dealer,
            curve: C::NAME,
        };
        let share = self.valid_shares[dealer as usize].as_ref().ok_or_else(missing)?;
        let pub_poly = self.all_publics[dealer as usize].as_ref().ok_or_else(missing)?;
        Ok((share, pub_poly))
    }

    /// Sum every dealer's share and commitments
    fn aggregate(&self, own_index: NodeIndex) -> Result<CurveShare<C>> {
        let (first_share, first_poly) = self.slot(0)?;
        let mut value = first_share.value;
        let mut pub_poly = first_poly.clone();

        for dealer in 1..self.valid_shares.len() as u32 {
            let (share, poly) = self.slot(dealer)?;
            value = value + share.value;
            pub_poly = pub_poly.add(poly)?;
        }

        Ok(CurveShare {
            commits: pub_poly.commits().to_vec(),
            share: PriShare {
                index: own_index,
                value,
            },
        })
    }
}

impl DistKeyGenerator {
    /// Deal shares of both local polynomials to every node of the set
    #[instrument(skip_all, fields(index = self.index))]
    pub fn deal<R: RngCore + CryptoRng>(&mut self, rng: &mut R) -> Result<DealBundle> {
        self.require_phase("deal", &[Phase::Init, Phase::Dealt])?;

        let bundle = self.deal_to(&self.config.session_id, &self.config.nodes, rng)?;
        self.phase = Phase::Dealt;

        info!(
            index = self.index,
            n = self.config.n(),
            threshold = self.config.threshold,
            "Dealt shares"
        );
        Ok(bundle)
    }

    /// Build and sign a bundle dealing the current polynomials to
    /// `recipients` in session `session_id`
    pub(super) fn deal_to<R: RngCore + CryptoRng>(
        &self,
        session_id: &SessionId,
        recipients: &[Node],
        rng: &mut R,
    ) -> Result<DealBundle> {
        let session_id = *session_id;
        let mut deals = Vec::with_capacity(recipients.len());

        for recipient in recipients {
            let aad = deal_aad(&session_id, self.index, recipient.index);
            deals.push(Deal {
                share_index: recipient.index,
                encrypted_share_bn254: self.bn254.encrypt_share(recipient, &aad, rng)?,
                encrypted_share_bls12_381: self.bls12_381.encrypt_share(recipient, &aad, rng)?,
            });
        }

        let mut bundle = DealBundle {
            dealer_index: self.index,
            deals,
            public_bn254: self.bn254.pub_poly.commits().to_vec(),
            public_bls12_381: self.bls12_381.pub_poly.commits().to_vec(),
            session_id,
            signature: Vec::new(),
        };
        bundle.sign(&self.identity)?;
        Ok(bundle)
    }

    /// Process one bundle from every node into this node's key share
    #[instrument(skip_all, fields(index = self.index, bundles = bundles.len()))]
    pub fn process_deal_bundles(&mut self, bundles: &[DealBundle]) -> Result<DistKeyShare> {
        self.require_phase("process deal bundles", &[Phase::Init, Phase::Dealt])?;
        let result = self.process_deal_bundles_inner(bundles);
        self.conclude(result)
    }

    fn process_deal_bundles_inner(&mut self, bundles: &[DealBundle]) -> Result<DistKeyShare> {
        let n = self.config.n();
        if bundles.len() != n {
            return Err(Error::IncompleteBundleSet {
                expected: n,
                got: bundles.len(),
            });
        }

        self.bn254.reset(n);
        self.bls12_381.reset(n);

        let ordered = slot_bundles(bundles, n)?;
        for bundle in &ordered {
            let dealer = &self.config.nodes[bundle.dealer_index as usize];
            self.check_bundle_shape(bundle)?;
            bundle.verify_signature(&dealer.public)?;

            self.bn254.record_public(bundle.dealer_index, &bundle.public_bn254);
            self.bls12_381
                .record_public(bundle.dealer_index, &bundle.public_bls12_381);
        }
        debug!("Recorded public polynomials");

        for bundle in &ordered {
            self.open_bundle(bundle)?;
        }
        debug!("Decrypted deals");

        self.bn254.verify_shares(self.index, 0..n as u32)?;
        self.bls12_381.verify_shares(self.index, 0..n as u32)?;

        let key_share = DistKeyShare {
            bn254: self.bn254.aggregate(self.index)?,
            bls12_381: self.bls12_381.aggregate(self.index)?,
        };

        info!(
            index = self.index,
            public_key_bn254 = hex::encode(key_share.bn254.public_key().marshal()),
            public_key_bls12_381 = hex::encode(key_share.bls12_381.public_key().marshal()),
            "DKG completed successfully"
        );
        Ok(key_share)
    }

    /// Reject bundles from another session or of the wrong shape for this
    /// node set and threshold
    pub(super) fn check_bundle_shape(&self, bundle: &DealBundle) -> Result<()> {
        let invalid = |reason: String| Error::InvalidBundle {
            dealer: bundle.dealer_index,
            reason,
        };

        if bundle.session_id != self.config.session_id {
            return Err(invalid("session id mismatch".into()));
        }
        if bundle.deals.len() != self.config.n() {
            return Err(invalid(format!(
                "expected {} deals, got {}",
                self.config.n(),
                bundle.deals.len()
            )));
        }
        let t = self.config.threshold;
        if bundle.public_bn254.len() != t || bundle.public_bls12_381.len() != t {
            return Err(invalid(format!(
                "expected {} commitments per curve, got {} and {}",
                t,
                bundle.public_bn254.len(),
                bundle.public_bls12_381.len()
            )));
        }
        Ok(())
    }

    /// Decrypt both shares the bundle's dealer addressed to this node
    pub(super) fn open_bundle(&mut self, bundle: &DealBundle) -> Result<()> {
        let dealer = bundle.dealer_index;
        let deal = bundle
            .deals
            .iter()
            .find(|deal| deal.share_index == self.index)
            .ok_or(Error::DecryptionFailure { dealer })?;

        let aad = deal_aad(&self.config.session_id, dealer, self.index);
        self.bn254
            .open_share(dealer, &deal.encrypted_share_bn254, &aad, &self.identity)?;
        self.bls12_381
            .open_share(dealer, &deal.encrypted_share_bls12_381, &aad, &self.identity)?;
        Ok(())
    }
}

/// Order bundles by dealer index, rejecting unknown and repeated dealers
pub(super) fn slot_bundles(bundles: &[DealBundle], dealers: usize) -> Result<Vec<&DealBundle>> {
    let mut slots: Vec<Option<&DealBundle>> = vec![None; dealers];

    for bundle in bundles {
        let dealer = bundle.dealer_index;
        let slot = slots.get_mut(dealer as usize).ok_or_else(|| Error::InvalidBundle {
            dealer,
            reason: format!("dealer index out of range 0..{}", dealers),
        })?;
        if slot.is_some() {
            return Err(Error::InvalidBundle {
                dealer,
                reason: "duplicate bundle".into(),
            });
        }
        *slot = Some(bundle);
    }

    Ok(slots.into_iter().flatten().collect())
}
