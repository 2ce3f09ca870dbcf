//! # Pedersen DKG
//!
//! Threshold key generation and threshold BLS signatures over two pairing
//! curves at once, BN254 and BLS12-381.
//!
//! This crate provides:
//! - Polynomial secret sharing with Lagrange recovery ([`poly`])
//! - Pedersen-style Distributed Key Generation with encrypted, signed deal
//!   bundles ([`keygen`])
//! - Resharing to a new node set and threshold with the same public key
//! - Plain and threshold BLS signatures ([`sign`])
//!
//! ## Protocol Overview
//!
//! Every node deals one bundle: the commitments to two random polynomials
//! and, for each node, its two shares encrypted to that node's secp256k1
//! identity key. Once a node holds one bundle from every node it verifies
//! its shares against the commitments and adds them up. Any failure aborts
//! the run; there is no complaint round.
//!
//! ## Example
//!
//! ```rust,ignore
//! use pedersen_dkg::{keygen::DistKeyGenerator, sign::ThresholdBls, Bn254};
//!
//! let mut generator = DistKeyGenerator::new(config, identity, &mut rng)?;
//! let bundle = generator.deal(&mut rng)?;
//! // ... broadcast and collect every node's bundle ...
//! let key_share = generator.process_deal_bundles(&bundles)?;
//!
//! let partial = ThresholdBls::<Bn254>::sign(&key_share.bn254.share, b"Hello BLS")?;
//! ```

pub mod ecies;
pub mod error;
pub mod group;
pub mod keygen;
pub mod mpc;
pub mod poly;
pub mod sign;
pub mod types;

pub use error::{Error, Result};
pub use group::{Bls12381, Bn254, PairingCurve};
pub use keygen::{DealBundle, DistKeyGenerator, Phase};
pub use types::{CurveShare, DistKeyShare, DkgConfig, Node, NodeIndex, SessionId};

/// Protocol version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
