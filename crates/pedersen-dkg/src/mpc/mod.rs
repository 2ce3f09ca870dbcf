//! Bundle transport for running the protocol over a network
//!
//! The protocol assumes a reliable broadcast: every participant must end up
//! with the same set of bundles. A [`Relay`] provides exactly that, per
//! session and round.

use std::time::Duration;

use serde::{de::DeserializeOwned, Serialize};

use crate::{Result, SessionId};

pub use ::async_trait::async_trait;

/// Message relay trait for broadcasting deal bundles
#[async_trait]
pub trait Relay: Send + Sync {
    /// Broadcast a message to all parties
    async fn broadcast<T: Serialize + Send + Sync>(
        &self,
        session_id: &SessionId,
        round: u32,
        message: &T,
    ) -> Result<()>;

    /// Wait until `count` messages were broadcast in `round` and return them
    /// in arrival order. Fails with [`crate::Error::Timeout`] after `timeout`.
    async fn collect_broadcasts<T: DeserializeOwned + Send>(
        &self,
        session_id: &SessionId,
        round: u32,
        count: usize,
        timeout: Duration,
    ) -> Result<Vec<T>>;
}

/// In-memory relay for tests and local simulation
pub mod memory;

pub use memory::MemoryRelay;
