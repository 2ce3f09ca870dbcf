//! In-memory relay implementation

use super::{async_trait, Relay};
use crate::{Error, Result, SessionId};
use dashmap::DashMap;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::trace;

/// In-memory message relay shared by all local participants
pub struct MemoryRelay {
    /// Broadcast messages: (session_id, round) -> Vec<message_bytes>
    broadcasts: Arc<DashMap<(SessionId, u32), Vec<Vec<u8>>>>,
    /// Notification channel
    notify: broadcast::Sender<()>,
}

impl MemoryRelay {
    pub fn new() -> Self {
        let (notify, _) = broadcast::channel(100);
        Self {
            broadcasts: Arc::new(DashMap::new()),
            notify,
        }
    }

    /// Number of messages broadcast so far in `round`
    pub fn pending(&self, session_id: &SessionId, round: u32) -> usize {
        self.broadcasts
            .get(&(*session_id, round))
            .map(|messages| messages.len())
            .unwrap_or(0)
    }
}

impl Default for MemoryRelay {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Relay for MemoryRelay {
    async fn broadcast<T: Serialize + Send + Sync>(
        &self,
        session_id: &SessionId,
        round: u32,
        message: &T,
    ) -> Result<()> {
        let bytes = serde_json::to_vec(message)?;
        trace!(round, bytes = bytes.len(), "broadcast");

        self.broadcasts
            .entry((*session_id, round))
            .or_default()
            .push(bytes);

        let _ = self.notify.send(());
        Ok(())
    }

    async fn collect_broadcasts<T: DeserializeOwned + Send>(
        &self,
        session_id: &SessionId,
        round: u32,
        count: usize,
        timeout: Duration,
    ) -> Result<Vec<T>> {
        let mut rx = self.notify.subscribe();
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            if let Some(messages) = self.broadcasts.get(&(*session_id, round)) {
                if messages.len() >= count {
                    return messages
                        .iter()
                        .take(count)
                        .map(|bytes| {
                            serde_json::from_slice(bytes)
                                .map_err(|e| Error::Deserialization(format!("round {}: {}", round, e)))
                        })
                        .collect();
                }
            }

            if tokio::time::Instant::now() >= deadline {
                return Err(Error::Timeout(format!(
                    "{} broadcasts in round {}, have {}",
                    count,
                    round,
                    self.pending(session_id, round)
                )));
            }

            // Re-check on notification, or periodically in case one was missed
            tokio::select! {
                _ = rx.recv() => continue,
                _ = tokio::time::sleep(Duration::from_millis(100)) => continue,
            }
        }
    }
}
