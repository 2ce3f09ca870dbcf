//! BLS signatures
//!
//! Signatures are points on G1, public keys on G2. [`Bls`] is the plain
//! single-key scheme; [`ThresholdBls`] signs with key shares from
//! [`crate::keygen`] and recovers a signature that verifies under the group
//! public key.

pub mod bls;
pub mod tbls;

pub use bls::Bls;
pub use tbls::ThresholdBls;
