//! Encrypted deal delivery
//!
//! ECIES over secp256k1: an ephemeral ECDH key agreement with the recipient's
//! identity key, HKDF-SHA256 to derive a ChaCha20-Poly1305 key, and the
//! caller's associated data bound into the tag.
//!
//! Ciphertext layout: `ephemeral_pubkey (33, compressed) || nonce (12) || sealed`

use aead::{Aead, KeyInit, Payload};
use chacha20poly1305::{ChaCha20Poly1305, Nonce};
use elliptic_curve::sec1::ToEncodedPoint;
use hkdf::Hkdf;
use k256::ecdh::{diffie_hellman, EphemeralSecret};
use k256::{PublicKey, SecretKey};
use rand_core::{CryptoRng, RngCore};
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::{Error, Result};

const EPHEMERAL_LEN: usize = 33;
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;
const HKDF_INFO: &[u8] = b"pedersen-dkg deal encryption v1";

fn derive_cipher(shared: &[u8], ephemeral: &[u8]) -> Result<ChaCha20Poly1305> {
    let hk = Hkdf::<Sha256>::new(Some(ephemeral), shared);
    let mut key = Zeroizing::new([0u8; 32]);
    hk.expand(HKDF_INFO, &mut key[..])
        .map_err(|e| Error::Encryption(format!("key derivation: {}", e)))?;
    ChaCha20Poly1305::new_from_slice(&key[..])
        .map_err(|e| Error::Encryption(format!("cipher init: {}", e)))
}

/// Encrypt `plaintext` to `recipient`, authenticating `aad`
pub fn encrypt<R: RngCore + CryptoRng>(
    recipient: &PublicKey,
    plaintext: &[u8],
    aad: &[u8],
    rng: &mut R,
) -> Result<Vec<u8>> {
    let ephemeral = EphemeralSecret::random(rng);
    let ephemeral_public = ephemeral.public_key().to_encoded_point(true);
    let shared = ephemeral.diffie_hellman(recipient);

    let cipher = derive_cipher(shared.raw_secret_bytes().as_slice(), ephemeral_public.as_bytes())?;

    let mut nonce = [0u8; NONCE_LEN];
    rng.fill_bytes(&mut nonce);

    let sealed = cipher
        .encrypt(Nonce::from_slice(&nonce), Payload { msg: plaintext, aad })
        .map_err(|_| Error::Encryption("AEAD seal failed".into()))?;

    let mut out = Vec::with_capacity(EPHEMERAL_LEN + NONCE_LEN + sealed.len());
    out.extend_from_slice(ephemeral_public.as_bytes());
    out.extend_from_slice(&nonce);
    out.extend_from_slice(&sealed);
    Ok(out)
}

/// Decrypt a ciphertext produced by [`encrypt`] with the recipient's secret key
pub fn decrypt(secret: &SecretKey, ciphertext: &[u8], aad: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
    if ciphertext.len() < EPHEMERAL_LEN + NONCE_LEN + TAG_LEN {
        return Err(Error::Encryption(format!(
            "ciphertext too short: {} bytes",
            ciphertext.len()
        )));
    }
    let (ephemeral_bytes, rest) = ciphertext.split_at(EPHEMERAL_LEN);
    let (nonce, sealed) = rest.split_at(NONCE_LEN);

    let ephemeral = PublicKey::from_sec1_bytes(ephemeral_bytes)
        .map_err(|_| Error::Encryption("invalid ephemeral key".into()))?;
    let shared = diffie_hellman(secret.to_nonzero_scalar(), ephemeral.as_affine());

    let cipher = derive_cipher(shared.raw_secret_bytes().as_slice(), ephemeral_bytes)?;
    cipher
        .decrypt(Nonce::from_slice(nonce), Payload { msg: sealed, aad })
        .map(Zeroizing::new)
        .map_err(|_| Error::Encryption("AEAD open failed".into()))
}
