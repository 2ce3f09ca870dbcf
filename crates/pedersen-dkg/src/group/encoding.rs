//! Serde helpers: scalars and points travel as hex strings of their
//! marshalled bytes.

use serde::{de, Deserialize, Deserializer, Serializer};

use super::{Point, Scalar};

fn decode_hex<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
    let encoded = String::deserialize(deserializer)?;
    hex::decode(encoded).map_err(de::Error::custom)
}

pub mod scalar {
    use super::*;

    pub fn serialize<S: Scalar, Ser: Serializer>(value: &S, serializer: Ser) -> Result<Ser::Ok, Ser::Error> {
        serializer.serialize_str(&hex::encode(value.marshal()))
    }

    pub fn deserialize<'de, S: Scalar, D: Deserializer<'de>>(deserializer: D) -> Result<S, D::Error> {
        let bytes = decode_hex(deserializer)?;
        S::unmarshal(&bytes).map_err(de::Error::custom)
    }
}

pub mod point {
    use super::*;

    pub fn serialize<P: Point, S: Serializer>(value: &P, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(value.marshal()))
    }

    pub fn deserialize<'de, P: Point, D: Deserializer<'de>>(deserializer: D) -> Result<P, D::Error> {
        let bytes = decode_hex(deserializer)?;
        P::unmarshal(&bytes).map_err(de::Error::custom)
    }
}

pub mod points {
    use super::*;
    use serde::ser::SerializeSeq;

    #[allow(clippy::ptr_arg)]
    pub fn serialize<P: Point, S: Serializer>(values: &Vec<P>, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(values.len()))?;
        for value in values {
            seq.serialize_element(&hex::encode(value.marshal()))?;
        }
        seq.end()
    }

    pub fn deserialize<'de, P: Point, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<P>, D::Error> {
        let encoded = Vec::<String>::deserialize(deserializer)?;
        encoded
            .into_iter()
            .map(|s| {
                let bytes = hex::decode(s).map_err(de::Error::custom)?;
                P::unmarshal(&bytes).map_err(de::Error::custom)
            })
            .collect()
    }
}

/// Byte strings as hex
pub mod bytes {
    use super::*;

    pub fn serialize<S: Serializer>(value: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        decode_hex(deserializer)
    }
}
