//! DKG Simulator
//!
//! Runs every node of the network as a tokio task over an in-memory relay:
//! - Distributed Key Generation on BN254 and BLS12-381
//! - Resharing to a new node set and threshold
//! - Threshold BLS signing and verification

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use k256::SecretKey;
use pedersen_dkg::group::Point;
use pedersen_dkg::keygen::{run_keygen, run_reshare_dealer, run_reshare_receiver};
use pedersen_dkg::mpc::MemoryRelay;
use pedersen_dkg::sign::ThresholdBls;
use pedersen_dkg::{
    Bls12381, Bn254, CurveShare, DistKeyGenerator, DistKeyShare, DkgConfig, Node, PairingCurve,
};
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, Level};

/// DKG Simulator - in-process threshold BLS network
#[derive(Parser)]
#[command(name = "dkg-sim")]
#[command(about = "Simulate a dual-curve Pedersen DKG network")]
#[command(version)]
struct Cli {
    /// Number of nodes
    #[arg(short, long, env = "DKG_N", default_value_t = 5)]
    n: usize,

    /// Threshold (t-of-n)
    #[arg(short, long, env = "DKG_T", default_value_t = 3)]
    t: usize,

    /// Seed for a reproducible run
    #[arg(short, long, env = "DKG_SEED")]
    seed: Option<u64>,

    /// Output directory for key shares
    #[arg(short, long, env = "DEST", default_value = "./data")]
    dest: PathBuf,

    /// Seconds to wait for bundles
    #[arg(long, env = "DKG_TIMEOUT", default_value_t = 30)]
    timeout: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run key generation and save every node's key share
    Keygen,

    /// Run key generation, then reshare to a new node set
    Reshare {
        /// Number of nodes in the new set
        #[arg(long)]
        new_n: usize,

        /// Threshold of the new set
        #[arg(long)]
        new_t: usize,

        /// Message signed by the new set
        #[arg(short, long, default_value = "Hello BLS")]
        message: String,
    },

    /// Run key generation, then sign a message with a quorum
    Sign {
        /// Message to sign
        #[arg(short, long, default_value = "Hello BLS")]
        message: String,

        /// Signing node indices (comma-separated), defaults to the first t
        #[arg(long)]
        signers: Option<String>,
    },
}

/// One simulated node set
struct Network {
    keys: Vec<SecretKey>,
    config: DkgConfig,
}

impl Network {
    fn new(rng: &mut ChaCha20Rng, n: usize, t: usize) -> Result<Self> {
        let keys: Vec<SecretKey> = (0..n).map(|_| SecretKey::random(&mut *rng)).collect();
        let nodes = keys
            .iter()
            .enumerate()
            .map(|(i, key)| Node::new(i as u32, key.public_key()))
            .collect();

        let mut session_id = [0u8; 32];
        rng.fill_bytes(&mut session_id);
        let config = DkgConfig::new(nodes, t)?.with_session_id(session_id);

        Ok(Self { keys, config })
    }

    fn generator(&self, i: usize, rng: &mut ChaCha20Rng) -> Result<DistKeyGenerator> {
        Ok(DistKeyGenerator::new(
            self.config.clone(),
            self.keys[i].clone(),
            rng,
        )?)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();
    std::fs::create_dir_all(&cli.dest)?;

    let mut rng = match cli.seed {
        Some(seed) => ChaCha20Rng::seed_from_u64(seed),
        None => ChaCha20Rng::from_entropy(),
    };
    let timeout = Duration::from_secs(cli.timeout);

    let network = Network::new(&mut rng, cli.n, cli.t)?;
    let parties = keygen(&network, &mut rng, timeout).await?;
    let shares: Vec<DistKeyShare> = parties.iter().map(|p| p.share.clone()).collect();
    save_shares(&cli.dest, "keyshare", &shares)?;

    println!(
        "Public Key (BN254):     {}",
        hex::encode(shares[0].bn254.public_key().marshal())
    );
    println!(
        "Public Key (BLS12-381): {}",
        hex::encode(shares[0].bls12_381.public_key().marshal())
    );

    match cli.command {
        Commands::Keygen => {}
        Commands::Sign {
            ref message,
            ref signers,
        } => {
            let signers = parse_signers(signers.as_deref(), cli.t, cli.n)?;
            sign_and_verify(&shares, &signers, message.as_bytes(), cli.t, cli.n)?;
        }
        Commands::Reshare {
            new_n,
            new_t,
            ref message,
        } => {
            let new_network = Network::new(&mut rng, new_n, new_t)?;
            let new_shares = reshare(&network, parties, new_network, &mut rng, timeout).await?;
            save_shares(&cli.dest, "reshared", &new_shares)?;

            if new_shares[0].bn254.public_key() != shares[0].bn254.public_key()
                || new_shares[0].bls12_381.public_key() != shares[0].bls12_381.public_key()
            {
                bail!("reshare changed the public key");
            }
            info!(new_n, new_t, "Reshare preserved the public key");

            let signers: Vec<usize> = (0..new_t).collect();
            sign_and_verify(&new_shares, &signers, message.as_bytes(), new_t, new_n)?;
        }
    }

    Ok(())
}

/// A node of the key generation set after it finished
struct Party {
    generator: DistKeyGenerator,
    share: DistKeyShare,
}

/// Run key generation with one task per node
async fn keygen(
    network: &Network,
    rng: &mut ChaCha20Rng,
    timeout: Duration,
) -> Result<Vec<Party>> {
    info!(
        n = network.config.n(),
        threshold = network.config.threshold,
        "Starting DKG"
    );

    let relay = Arc::new(MemoryRelay::new());
    let mut handles = Vec::with_capacity(network.keys.len());

    for i in 0..network.keys.len() {
        let mut node_rng = ChaCha20Rng::seed_from_u64(rng.next_u64());
        let mut generator = network.generator(i, &mut node_rng)?;
        let relay = relay.clone();
        handles.push(tokio::spawn(async move {
            let share = run_keygen(&mut generator, relay.as_ref(), &mut node_rng, timeout).await?;
            Ok::<_, pedersen_dkg::Error>(Party { generator, share })
        }));
    }

    let mut parties = Vec::with_capacity(handles.len());
    for handle in handles {
        parties.push(handle.await??);
    }
    Ok(parties)
}

/// Each party of the old set reshares its own key share to `new`
async fn reshare(
    old: &Network,
    parties: Vec<Party>,
    new: Network,
    rng: &mut ChaCha20Rng,
    timeout: Duration,
) -> Result<Vec<DistKeyShare>> {
    let old_n = old.config.n();
    let old_t = old.config.threshold;
    info!(
        old_n,
        old_t,
        new_n = new.config.n(),
        new_t = new.config.threshold,
        "Starting reshare"
    );

    let new = Network {
        config: new.config.with_dealers(old.config.nodes.clone())?,
        keys: new.keys,
    };
    let relay = Arc::new(MemoryRelay::new());

    let mut receivers = Vec::with_capacity(new.keys.len());
    for i in 0..new.keys.len() {
        let mut node_rng = ChaCha20Rng::seed_from_u64(rng.next_u64());
        let mut generator = new.generator(i, &mut node_rng)?;
        let relay = relay.clone();
        receivers.push(tokio::spawn(async move {
            run_reshare_receiver(&mut generator, relay.as_ref(), old_t, old_n, timeout).await
        }));
    }

    let mut dealers = Vec::with_capacity(parties.len());
    for Party { mut generator, share } in parties {
        let mut node_rng = ChaCha20Rng::seed_from_u64(rng.next_u64());
        let new_config = new.config.clone();
        let relay = relay.clone();
        dealers.push(tokio::spawn(async move {
            run_reshare_dealer(
                &mut generator,
                &share,
                &new_config,
                relay.as_ref(),
                &mut node_rng,
            )
            .await
        }));
    }

    for dealer in dealers {
        dealer.await??;
    }

    let mut new_shares = Vec::with_capacity(receivers.len());
    for receiver in receivers {
        new_shares.push(receiver.await??);
    }
    Ok(new_shares)
}

fn parse_signers(signers: Option<&str>, t: usize, n: usize) -> Result<Vec<usize>> {
    let signers: Vec<usize> = match signers {
        Some(list) => list
            .split(',')
            .map(|s| s.trim().parse())
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("signers must be comma-separated node indices")?,
        None => (0..t).collect(),
    };
    if let Some(bad) = signers.iter().find(|i| **i >= n) {
        bail!("signer {} is not in 0..{}", bad, n);
    }
    Ok(signers)
}

/// Sign on both curves with `signers`, recover and verify
fn sign_and_verify(
    shares: &[DistKeyShare],
    signers: &[usize],
    msg: &[u8],
    t: usize,
    n: usize,
) -> Result<()> {
    let bn: Vec<&CurveShare<Bn254>> = signers.iter().map(|i| &shares[*i].bn254).collect();
    let sig = threshold_sign(&bn, msg, t, n)?;
    println!("Signature (BN254):      {}", hex::encode(&sig));

    let bls: Vec<&CurveShare<Bls12381>> = signers.iter().map(|i| &shares[*i].bls12_381).collect();
    let sig = threshold_sign(&bls, msg, t, n)?;
    println!("Signature (BLS12-381):  {}", hex::encode(&sig));

    Ok(())
}

fn threshold_sign<C: PairingCurve>(
    shares: &[&CurveShare<C>],
    msg: &[u8],
    t: usize,
    n: usize,
) -> Result<Vec<u8>> {
    let first = shares.first().context("no signers")?;
    let partials = shares
        .iter()
        .map(|s| ThresholdBls::<C>::sign(&s.share, msg))
        .collect::<pedersen_dkg::Result<Vec<_>>>()?;

    let sig = ThresholdBls::<C>::recover(&first.pub_poly(), msg, &partials, t, n)?;
    ThresholdBls::<C>::verify_recovered(&first.public_key(), msg, &sig)?;

    info!(
        curve = C::NAME,
        signers = partials.len(),
        "Threshold signature verified"
    );
    Ok(sig)
}

fn save_shares(dest: &Path, prefix: &str, shares: &[DistKeyShare]) -> Result<()> {
    for share in shares {
        let path = dest.join(format!("{}.{}.json", prefix, share.index()));
        let json = serde_json::to_string_pretty(share)?;
        std::fs::write(&path, json)?;
        info!(index = share.index(), path = ?path, "Key share saved");
    }
    Ok(())
}
