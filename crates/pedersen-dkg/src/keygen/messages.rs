//! Key generation and resharing messages

use k256::ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use k256::ecdsa::{Signature, SigningKey, VerifyingKey};
use k256::{PublicKey, SecretKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::group::{encoding, Bls12381, Bn254, KeyPoint, Point};
use crate::{Error, NodeIndex, Result, SessionId};

const BUNDLE_DIGEST_TAG: &[u8] = b"pedersen-dkg/deal-bundle/v1";

/// A dealer's encrypted shares for one recipient
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deal {
    /// Recipient node index
    pub share_index: NodeIndex,
    /// ECIES ciphertext of the BN254 share
    #[serde(with = "encoding::bytes")]
    pub encrypted_share_bn254: Vec<u8>,
    /// ECIES ciphertext of the BLS12-381 share
    #[serde(with = "encoding::bytes")]
    pub encrypted_share_bls12_381: Vec<u8>,
}

/// A dealer's full broadcast: one deal per recipient plus the public
/// commitments of both dealt polynomials
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DealBundle {
    pub dealer_index: NodeIndex,
    pub deals: Vec<Deal>,
    #[serde(with = "encoding::points")]
    pub public_bn254: Vec<KeyPoint<Bn254>>,
    #[serde(with = "encoding::points")]
    pub public_bls12_381: Vec<KeyPoint<Bls12381>>,
    pub session_id: SessionId,
    /// ECDSA signature by the dealer's identity key over [`DealBundle::digest`]
    #[serde(with = "encoding::bytes")]
    pub signature: Vec<u8>,
}

fn update_len_prefixed(hasher: &mut Sha256, bytes: &[u8]) {
    hasher.update((bytes.len() as u32).to_be_bytes());
    hasher.update(bytes);
}

impl DealBundle {
    /// SHA-256 over a canonical encoding of everything but the signature
    pub fn digest(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(BUNDLE_DIGEST_TAG);
        hasher.update(self.session_id);
        hasher.update(self.dealer_index.to_be_bytes());

        hasher.update((self.deals.len() as u32).to_be_bytes());
        for deal in &self.deals {
            hasher.update(deal.share_index.to_be_bytes());
            update_len_prefixed(&mut hasher, &deal.encrypted_share_bn254);
            update_len_prefixed(&mut hasher, &deal.encrypted_share_bls12_381);
        }

        hasher.update((self.public_bn254.len() as u32).to_be_bytes());
        for commit in &self.public_bn254 {
            update_len_prefixed(&mut hasher, &commit.marshal());
        }
        hasher.update((self.public_bls12_381.len() as u32).to_be_bytes());
        for commit in &self.public_bls12_381 {
            update_len_prefixed(&mut hasher, &commit.marshal());
        }

        hasher.finalize().into()
    }

    pub(crate) fn sign(&mut self, identity: &SecretKey) -> Result<()> {
        let signing_key = SigningKey::from(identity);
        let signature: Signature = signing_key
            .sign_prehash(&self.digest())
            .map_err(|e| Error::Encryption(format!("bundle signing: {}", e)))?;
        self.signature = signature.to_bytes().to_vec();
        Ok(())
    }

    /// Check the dealer signature against the dealer's identity key
    pub fn verify_signature(&self, dealer: &PublicKey) -> Result<()> {
        let signature = Signature::from_slice(&self.signature)
            .map_err(|_| Error::InvalidBundleSignature(self.dealer_index))?;
        VerifyingKey::from(dealer)
            .verify_prehash(&self.digest(), &signature)
            .map_err(|_| Error::InvalidBundleSignature(self.dealer_index))
    }
}
