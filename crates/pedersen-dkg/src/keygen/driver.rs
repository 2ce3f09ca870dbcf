//! Running key generation and resharing over a [`Relay`]

use std::time::Duration;

use rand_core::{CryptoRng, RngCore};
use tracing::{debug, info, instrument};

use super::{DealBundle, DistKeyGenerator};
use crate::mpc::Relay;
use crate::{DistKeyShare, DkgConfig, Result};

/// Relay round carrying key generation bundles
pub const ROUND_KEYGEN: u32 = 1;

/// Relay round carrying reshare bundles
pub const ROUND_RESHARE: u32 = 2;

/// Run key generation for one participant
///
/// Deals, broadcasts the bundle, waits for one bundle per node and
/// processes the full set.
#[instrument(skip_all, fields(index = generator.index()))]
pub async fn run_keygen<R, G>(
    generator: &mut DistKeyGenerator,
    relay: &R,
    rng: &mut G,
    timeout: Duration,
) -> Result<DistKeyShare>
where
    R: Relay,
    G: RngCore + CryptoRng + Send,
{
    info!(
        index = generator.index(),
        n = generator.nodes().len(),
        threshold = generator.threshold(),
        "Starting DKG"
    );

    let session_id = *generator.session_id();
    let bundle = generator.deal(rng)?;
    relay.broadcast(&session_id, ROUND_KEYGEN, &bundle).await?;

    let bundles: Vec<DealBundle> = relay
        .collect_broadcasts(&session_id, ROUND_KEYGEN, generator.nodes().len(), timeout)
        .await?;
    debug!(bundles = bundles.len(), "Collected deal bundles");

    generator.process_deal_bundles(&bundles)
}

/// Deal a reshare of `old_share` to the node set of `new_config` from a
/// member of the old set. The bundle goes out in the new session.
#[instrument(skip_all, fields(index = generator.index(), new_t = new_config.threshold))]
pub async fn run_reshare_dealer<R, G>(
    generator: &mut DistKeyGenerator,
    old_share: &DistKeyShare,
    new_config: &DkgConfig,
    relay: &R,
    rng: &mut G,
) -> Result<()>
where
    R: Relay,
    G: RngCore + CryptoRng + Send,
{
    let bundle = generator.reshare(old_share, new_config, rng)?;
    relay
        .broadcast(&new_config.session_id, ROUND_RESHARE, &bundle)
        .await
}

/// Receive a reshare on a member of the new set, waiting for a bundle from
/// each of the `old_n` old nodes
#[instrument(skip_all, fields(index = generator.index(), old_t = old_t, old_n = old_n))]
pub async fn run_reshare_receiver<R: Relay>(
    generator: &mut DistKeyGenerator,
    relay: &R,
    old_t: usize,
    old_n: usize,
    timeout: Duration,
) -> Result<DistKeyShare> {
    let session_id = *generator.session_id();
    let bundles: Vec<DealBundle> = relay
        .collect_broadcasts(&session_id, ROUND_RESHARE, old_n, timeout)
        .await?;
    debug!(bundles = bundles.len(), "Collected reshare bundles");

    generator.process_reshare_deal_bundles(&bundles, old_t, old_n)
}

#[cfg(test)]
mod tests {
    use super::super::tests::{generators, setup};
    use super::*;
    use crate::keygen::Phase;
    use crate::mpc::MemoryRelay;
    use crate::Error;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;
    use std::sync::Arc;

    const TIMEOUT: Duration = Duration::from_secs(10);

    async fn keygen_over_relay(
        relay: Arc<MemoryRelay>,
        gens: Vec<DistKeyGenerator>,
    ) -> Vec<(DistKeyGenerator, DistKeyShare)> {
        let handles: Vec<_> = gens
            .into_iter()
            .enumerate()
            .map(|(i, mut generator)| {
                let relay = relay.clone();
                tokio::spawn(async move {
                    let mut rng = ChaCha20Rng::seed_from_u64(i as u64);
                    let share = run_keygen(&mut generator, relay.as_ref(), &mut rng, TIMEOUT)
                        .await
                        .unwrap();
                    (generator, share)
                })
            })
            .collect();

        let mut results = Vec::new();
        for handle in handles {
            results.push(handle.await.unwrap());
        }
        results
    }

    #[tokio::test]
    async fn test_keygen_over_relay() {
        let (keys, config) = setup(4, 3);
        let relay = Arc::new(MemoryRelay::new());

        let results = keygen_over_relay(relay, generators(&keys, &config)).await;

        let pk = results[0].1.bn254.public_key();
        for (generator, share) in &results {
            assert_eq!(share.index(), generator.index());
            assert_eq!(share.bn254.public_key(), pk);
        }
    }

    #[tokio::test]
    async fn test_reshare_over_relay() {
        let (old_keys, old_config) = setup(3, 2);
        let relay = Arc::new(MemoryRelay::new());
        let mut results = keygen_over_relay(relay, generators(&old_keys, &old_config)).await;
        let old_pk = results[0].1.bls12_381.public_key();

        let (new_keys, new_config) = setup(4, 3);
        let new_config = new_config.with_dealers(old_config.nodes.clone()).unwrap();
        let reshare_relay = Arc::new(MemoryRelay::new());

        let mut receivers = Vec::new();
        for mut generator in generators(&new_keys, &new_config) {
            let relay = reshare_relay.clone();
            receivers.push(tokio::spawn(async move {
                run_reshare_receiver(&mut generator, relay.as_ref(), 2, 3, TIMEOUT).await
            }));
        }

        for (generator, old_share) in results.iter_mut() {
            let mut rng = ChaCha20Rng::seed_from_u64(100 + old_share.index() as u64);
            run_reshare_dealer(generator, old_share, &new_config, reshare_relay.as_ref(), &mut rng)
                .await
                .unwrap();
            assert_eq!(generator.phase(), Phase::Finished);
        }

        for receiver in receivers {
            let share = receiver.await.unwrap().unwrap();
            assert_eq!(share.threshold(), 3);
            assert_eq!(share.bls12_381.public_key(), old_pk);
        }
    }

    #[tokio::test]
    async fn test_keygen_times_out_without_peers() {
        let (keys, config) = setup(3, 2);
        let relay = MemoryRelay::new();
        let mut generator = generators(&keys[..1], &config).remove(0);
        let mut rng = ChaCha20Rng::seed_from_u64(0);

        let result = run_keygen(&mut generator, &relay, &mut rng, Duration::from_millis(200)).await;
        assert!(matches!(result, Err(Error::Timeout(_))));
    }
}
