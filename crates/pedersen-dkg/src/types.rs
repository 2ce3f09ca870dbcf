//! Core types shared by key generation, resharing and signing

use k256::PublicKey;
use serde::{Deserialize, Serialize};

use crate::group::{encoding, Bls12381, Bn254, KeyPoint, PairingCurve, Point};
use crate::poly::{PriShare, PubPoly};
use crate::{Error, Result};

/// Index of a node in its node set, also the x-coordinate of its shares
/// (shifted by one)
pub type NodeIndex = u32;

/// Unique identifier for one protocol run
pub type SessionId = [u8; 32];

/// A participant: its index and its secp256k1 identity key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub index: NodeIndex,
    #[serde(with = "identity_key_serde")]
    pub public: PublicKey,
}

impl Node {
    pub fn new(index: NodeIndex, public: PublicKey) -> Self {
        Self { index, public }
    }
}

mod identity_key_serde {
    use elliptic_curve::sec1::ToEncodedPoint;
    use k256::PublicKey;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(key: &PublicKey, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode(key.to_encoded_point(true).as_bytes()))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<PublicKey, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = String::deserialize(deserializer)?;
        let bytes = hex::decode(encoded).map_err(de::Error::custom)?;
        PublicKey::from_sec1_bytes(&bytes).map_err(|_| de::Error::custom("invalid identity key"))
    }
}

/// Sort `nodes` by index and require the indices to be exactly `0..n`
fn normalize_nodes(mut nodes: Vec<Node>, what: &str) -> Result<Vec<Node>> {
    if nodes.is_empty() {
        return Err(Error::InvalidConfig(format!("{} is empty", what)));
    }
    nodes.sort_by_key(|node| node.index);
    for (position, node) in nodes.iter().enumerate() {
        if node.index as usize != position {
            return Err(Error::InvalidConfig(format!(
                "{} indices must be 0..{}, found {} at position {}",
                what,
                nodes.len(),
                node.index,
                position
            )));
        }
    }
    Ok(nodes)
}

/// Configuration of one key generation or resharing run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DkgConfig {
    /// Session identifier, bound into every encrypted deal and bundle signature
    pub session_id: SessionId,

    /// Number of shares needed to recover the secret (t-of-n)
    pub threshold: usize,

    /// Participants of this run, sorted by index
    pub nodes: Vec<Node>,

    /// Previous node set when this run receives a reshare; used to
    /// authenticate the dealers' bundles
    pub dealers: Option<Vec<Node>>,
}

impl DkgConfig {
    /// Create a validated configuration with a random session id
    pub fn new(nodes: Vec<Node>, threshold: usize) -> Result<Self> {
        let nodes = normalize_nodes(nodes, "node set")?;
        if threshold == 0 || threshold > nodes.len() {
            return Err(Error::InvalidConfig(format!(
                "threshold must be in 1..={}, got {}",
                nodes.len(),
                threshold
            )));
        }

        Ok(Self {
            session_id: rand::random(),
            threshold,
            nodes,
            dealers: None,
        })
    }

    pub fn with_session_id(mut self, session_id: SessionId) -> Self {
        self.session_id = session_id;
        self
    }

    /// Declare the node set that deals a reshare to this one
    pub fn with_dealers(mut self, dealers: Vec<Node>) -> Result<Self> {
        self.dealers = Some(normalize_nodes(dealers, "dealer set")?);
        Ok(self)
    }

    /// Number of nodes
    pub fn n(&self) -> usize {
        self.nodes.len()
    }
}

/// One curve's half of a participant's key share
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct CurveShare<C: PairingCurve> {
    /// Commitments to the shared polynomial; `commits[0]` is the public key
    #[serde(with = "encoding::points")]
    pub commits: Vec<KeyPoint<C>>,

    /// This participant's private share
    pub share: PriShare<C::Scalar>,
}

impl<C: PairingCurve> CurveShare<C> {
    /// The group public key
    pub fn public_key(&self) -> KeyPoint<C> {
        self.pub_poly().commit()
    }

    pub fn pub_poly(&self) -> PubPoly<KeyPoint<C>> {
        PubPoly::new(<KeyPoint<C> as Point>::base(), self.commits.clone())
    }

    pub fn threshold(&self) -> usize {
        self.commits.len()
    }
}

/// Output of key generation or resharing for one participant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistKeyShare {
    pub bn254: CurveShare<Bn254>,
    pub bls12_381: CurveShare<Bls12381>,
}

impl DistKeyShare {
    /// Index of the holder in its node set
    pub fn index(&self) -> NodeIndex {
        self.bn254.share.index
    }

    pub fn threshold(&self) -> usize {
        self.bn254.threshold()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k256::SecretKey;
    use rand::rngs::OsRng;

    fn nodes(indices: &[u32]) -> Vec<Node> {
        indices
            .iter()
            .map(|i| Node::new(*i, SecretKey::random(&mut OsRng).public_key()))
            .collect()
    }

    #[test]
    fn test_config_sorts_nodes() {
        let config = DkgConfig::new(nodes(&[2, 0, 1]), 2).unwrap();
        let indices: Vec<_> = config.nodes.iter().map(|n| n.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert_eq!(config.n(), 3);
    }

    #[test]
    fn test_config_validation() {
        assert!(DkgConfig::new(nodes(&[0, 1, 2]), 0).is_err());
        assert!(DkgConfig::new(nodes(&[0, 1, 2]), 4).is_err());
        assert!(DkgConfig::new(nodes(&[0, 1, 3]), 2).is_err());
        assert!(DkgConfig::new(nodes(&[0, 0, 1]), 2).is_err());
        assert!(DkgConfig::new(Vec::new(), 1).is_err());
        assert!(DkgConfig::new(nodes(&[0]), 1).is_ok());

        let config = DkgConfig::new(nodes(&[0, 1]), 2).unwrap();
        assert!(config.clone().with_dealers(nodes(&[1, 2])).is_err());
        assert!(config.with_dealers(nodes(&[0, 1, 2])).is_ok());
    }

    #[test]
    fn test_node_serde() {
        let node = nodes(&[4]).remove(0);
        let json = serde_json::to_string(&node).unwrap();
        let decoded: Node = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, node);
    }
}
