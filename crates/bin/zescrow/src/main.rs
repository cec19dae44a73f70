use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use sha2::{Digest, Sha256};
use tracing::{info, warn};
use zeratul_commitment_tree::{empty_root, Sha256Compress};
use zeratul_swap_escrow::memory::{DigestVerifier, FixedRateVenue, InMemoryBank};
use zeratul_swap_escrow::{
    Address, AssetBank, AssetId, CallContext, Collaborators, Commitment, EscrowLedger,
    LedgerConfig, NullifierHash, PublicInputs, SwapConfiguration, VenueParams,
};

#[derive(Parser, Debug)]
#[command(name = "zescrow")]
#[command(about = "private swap escrow operator tool", long_about = None)]
struct Args {
    /// ledger config (TOML), devnet defaults when omitted
    #[arg(long, env = "ZESCROW_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// print tree parameters, roles and seeded denominations
    Info,

    /// run deposit → swap → withdraw against in-memory collaborators
    Simulate {
        /// number of deposits to make
        #[arg(long, default_value_t = 4)]
        deposits: u64,

        /// token deposits are swapped into
        #[arg(long, default_value = "0x00000000000000000000000000000000000000aa")]
        output_token: Address,

        /// venue rate in basis points of the input amount
        #[arg(long, default_value_t = 9_500)]
        rate_bps: u128,

        /// print emitted events as json lines
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    // initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "zescrow=info,zeratul_swap_escrow=info".into()),
        )
        .init();

    let args = Args::parse();
    let config = load_config(args.config.as_ref())?;

    match args.command {
        Command::Info => print_info(&config),
        Command::Simulate {
            deposits,
            output_token,
            rate_bps,
            json,
        } => simulate(&config, deposits, AssetId::Token(output_token), rate_bps, json),
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<LedgerConfig> {
    match path {
        Some(path) => {
            let config = LedgerConfig::load(path)
                .with_context(|| format!("failed to load ledger config from {}", path.display()))?;
            info!("loaded config from {}", path.display());
            Ok(config)
        }
        None => {
            info!("no config given, using devnet defaults");
            Ok(LedgerConfig::default())
        }
    }
}

fn print_info(config: &LedgerConfig) -> Result<()> {
    let root = empty_root::<Sha256Compress>(config.tree_height);

    println!("tree height:   {}", config.tree_height);
    println!("capacity:      {}", 1u64 << config.tree_height);
    println!("empty root:    0x{}", hex::encode(root));
    println!("ledger:        {}", config.ledger_address);
    println!("owner:         {}", config.owner);
    println!("operator:      {}", config.operator);
    println!("executor:      {}", config.executor);

    if config.swap_configurations.is_empty() {
        println!("denominations: none");
    } else {
        println!("denominations:");
        for (i, seed) in config.swap_configurations.iter().enumerate() {
            println!("  #{}  {} x {}", i + 1, seed.fixed_amount, seed.input_asset);
        }
    }
    Ok(())
}

/// deterministic 32-byte value for simulated secrets and accounts
fn derive(label: &str, index: u64) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(b"zescrow-sim");
    hasher.update(label.as_bytes());
    hasher.update(index.to_le_bytes());
    hasher.finalize().into()
}

fn derive_address(label: &str, index: u64) -> Address {
    let digest = derive(label, index);
    let mut bytes = [0u8; 20];
    bytes.copy_from_slice(&digest[12..]);
    Address(bytes)
}

fn simulate(config: &LedgerConfig, deposits: u64, output_token: AssetId, rate_bps: u128, json: bool) -> Result<()> {
    let capacity = 1u64 << config.tree_height;
    if deposits == 0 || deposits > capacity {
        bail!("deposits must be within 1..={}", capacity);
    }

    let bank = Arc::new(InMemoryBank::new());
    let venue_address = derive_address("venue", 0);
    let venue = Arc::new(FixedRateVenue::new(venue_address, bank.clone(), rate_bps));
    let ledger: EscrowLedger = EscrowLedger::new(
        config,
        Collaborators {
            verifier: Arc::new(DigestVerifier),
            venue: venue.clone(),
            bank: bank.clone(),
        },
    )
    .context("failed to build ledger")?;

    let denomination = match ledger.swap_configurations().first() {
        Some(existing) => *existing,
        None => {
            let id = ledger.add_swap_configuration(CallContext::new(config.owner), AssetId::Native, 1000)?;
            SwapConfiguration {
                id,
                input_asset: AssetId::Native,
                fixed_amount: 1000,
            }
        }
    };
    let output_asset = if denomination.input_asset == output_token {
        AssetId::Native
    } else {
        output_token
    };
    info!(
        config_id = denomination.id,
        input = %denomination.input_asset,
        amount = denomination.fixed_amount,
        output = %output_asset,
        "simulating {} deposits",
        deposits
    );

    let per_swap = venue
        .quote(denomination.fixed_amount)
        .context("venue quote overflows")?;
    let inventory = per_swap
        .checked_mul(u128::from(deposits))
        .context("venue inventory overflows")?;
    bank.mint(output_asset, venue_address, inventory);

    // deposits
    for i in 0..deposits {
        let depositor = derive_address("depositor", i);
        bank.mint(denomination.input_asset, depositor, denomination.fixed_amount);

        let ctx = match denomination.input_asset {
            AssetId::Native => CallContext::new(depositor).with_value(denomination.fixed_amount),
            asset => {
                bank.approve(asset, depositor, ledger.address(), denomination.fixed_amount)?;
                CallContext::new(depositor)
            }
        };
        ledger.deposit(ctx, Commitment(derive("commitment", i)), denomination.id)?;
    }

    // swaps
    for i in 0..deposits {
        let nullifier_hash = NullifierHash(derive("nullifier", i));
        let params = VenueParams {
            min_return: per_swap,
            ..VenueParams::default()
        };
        ledger.execute_swap(
            CallContext::new(config.operator),
            nullifier_hash,
            denomination.id,
            output_asset,
            params,
        )?;
    }

    // withdrawals, each proof built against the final root
    let mut paid = 0u128;
    for i in 0..deposits {
        let nullifier_hash = NullifierHash(derive("nullifier", i));
        let recipient = derive_address("recipient", i);
        let proof = DigestVerifier::prove(&PublicInputs {
            merkle_root: ledger.current_root(),
            nullifier_hash,
            recipient,
        });

        let result = ledger.withdraw(CallContext::new(recipient), nullifier_hash, recipient, &proof)?;
        paid += result.amount;
    }

    let escrowed = bank.balance_of(output_asset, ledger.address());
    if escrowed != 0 {
        warn!(%output_asset, escrowed, "proceeds left in the ledger after all withdrawals");
    }

    if json {
        for event in ledger.events() {
            println!("{}", serde_json::to_string(&event)?);
        }
    } else {
        println!("deposits:   {}", ledger.leaf_count());
        println!("final root: 0x{}", hex::encode(ledger.current_root()));
        println!("paid out:   {} {}", paid, output_asset);
        println!("events:     {}", ledger.events().len());
    }
    Ok(())
}
