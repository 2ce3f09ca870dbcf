//! `expand_message_xmd` from RFC 9380, section 5.3.1

use digest::{core_api::BlockSizeUser, Digest};

use crate::{Error, Result};

/// Expand `msg` into `len_in_bytes` uniformly random bytes under the domain
/// separation tag `dst`.
pub fn expand_message_xmd<D>(msg: &[u8], dst: &[u8], len_in_bytes: usize) -> Result<Vec<u8>>
where
    D: Digest + BlockSizeUser,
{
    let b_in_bytes = <D as Digest>::output_size();
    let r_in_bytes = D::block_size();
    let ell = (len_in_bytes + b_in_bytes - 1) / b_in_bytes;

    if ell > 255 || len_in_bytes > u16::MAX as usize {
        return Err(Error::InvalidConfig(format!(
            "expand_message_xmd: output length {} too large",
            len_in_bytes
        )));
    }
    if dst.len() > 255 {
        return Err(Error::InvalidConfig(
            "expand_message_xmd: domain separation tag longer than 255 bytes".into(),
        ));
    }

    let dst_prime = [dst, &[dst.len() as u8]].concat();

    let b_0 = D::new()
        .chain_update(vec![0u8; r_in_bytes])
        .chain_update(msg)
        .chain_update((len_in_bytes as u16).to_be_bytes())
        .chain_update([0u8])
        .chain_update(&dst_prime)
        .finalize();

    let mut b_i = D::new()
        .chain_update(&b_0)
        .chain_update([1u8])
        .chain_update(&dst_prime)
        .finalize();

    let mut uniform = Vec::with_capacity(ell * b_in_bytes);
    uniform.extend_from_slice(&b_i);

    for i in 2..=ell {
        let mixed: Vec<u8> = b_0.iter().zip(b_i.iter()).map(|(x, y)| x ^ y).collect();
        b_i = D::new()
            .chain_update(&mixed)
            .chain_update([i as u8])
            .chain_update(&dst_prime)
            .finalize();
        uniform.extend_from_slice(&b_i);
    }

    uniform.truncate(len_in_bytes);
    Ok(uniform)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sha3::Keccak256;

    #[test]
    fn test_keccak_reference_vector() {
        // Shared with the Solidity and TypeScript bls-bn254 implementations
        let dst = b"BLS_SIG_BN254G1_XMD:KECCAK-256_SSWU_RO_NUL_";
        let msg = hex::decode("af6c1f30b2f3f2fd448193f90d6fb55b544a").unwrap();

        let expanded = expand_message_xmd::<Keccak256>(&msg, dst, 96).unwrap();

        assert_eq!(
            hex::encode(expanded),
            "bd365d9672926bbb6887f8c0ce88d1edc0c20bd46f6af54e80c7edc15ac1c5eb\
             a9e754994af715195aa8acb3f21febae2b9626bc1b06c185922455908d1c8db3\
             d370fe339995718e344af3add0aa77d3bd48d0d9f3ebe26b88cbb393325c1c6e"
        );
    }

    #[test]
    fn test_output_length() {
        let out = expand_message_xmd::<sha2::Sha256>(b"abc", b"QUUX-V01-CS02", 48).unwrap();
        assert_eq!(out.len(), 48);

        let too_long = expand_message_xmd::<sha2::Sha256>(b"abc", b"QUUX-V01-CS02", 256 * 32);
        assert!(too_long.is_err());
    }
}
