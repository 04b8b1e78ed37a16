//! # xenon
//!
//! Command-line front end for the Xenon identity client.
//!
//! ```text
//! xenon [--node URL] [--config FILE] [--confirmation inBlock|finalized] [--dev] [--json]
//!       <create-identity | link-chain NAME ID ADDR | unlink-chain ID | show [ADDR] | accounts>
//! ```
//!
//! `--dev` runs against a fresh in-process ledger with one seeded account,
//! so every invocation starts from an empty chain.

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use shared_types::{AccountAddress, ChainId};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use xenon_runtime::{RuntimeConfig, XenonClient};
use xn_01_connection_manager::{InMemoryLedger, LedgerConnector, RpcConnector};
use xn_02_account_registry::{AccountProvider, LocalKeystore};
use xn_03_operation_codec::{EventPayload, Operation};
use xn_04_submission_engine::{Confirmation, OnChainEffect, Resolution};

const DEV_NODE_URL: &str = "memory://dev";
const DEV_SEED: [u8; 32] = [0x58; 32];

#[derive(Parser)]
#[command(name = "xenon")]
#[command(about = "Submit and inspect Xenon decentralized identities")]
struct Cli {
    /// Ledger node WebSocket address
    #[arg(long)]
    node: Option<String>,

    /// Path to a TOML configuration file
    #[arg(short, long, env = "XENON_CONFIG")]
    config: Option<PathBuf>,

    /// Confirmation that resolves a submission
    #[arg(long)]
    confirmation: Option<Confirmation>,

    /// Use an in-process ledger and a seeded development account
    #[arg(long)]
    dev: bool,

    /// Hex-encoded 32-byte ed25519 seed of the signing account
    #[arg(long, env = "XENON_SEED", hide_env_values = true)]
    seed: Option<String>,

    /// Account to sign with (defaults to the first available)
    #[arg(long)]
    account: Option<String>,

    /// Print results as JSON
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a DID document for the signing account
    CreateIdentity,
    /// Link an external chain address
    LinkChain {
        name: String,
        chain_id: ChainId,
        address: String,
    },
    /// Remove a linked chain
    UnlinkChain { chain_id: ChainId },
    /// Show the DID document of an address
    Show { address: Option<String> },
    /// List signing accounts
    Accounts,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging()?;
    let cli = Cli::parse();

    let mut config = RuntimeConfig::load(cli.config.as_deref()).context("loading configuration")?;
    if let Some(node) = &cli.node {
        config.node_url = node.clone();
    }
    if let Some(confirmation) = cli.confirmation {
        config.engine.confirmation = confirmation;
    }

    let keystore = Arc::new(LocalKeystore::new());
    if let Some(seed) = &cli.seed {
        keystore.add_seed(parse_seed(seed)?, Some("cli"));
    }

    let connector: Arc<dyn LedgerConnector> = if cli.dev {
        config.node_url = DEV_NODE_URL.to_string();
        keystore.add_seed(DEV_SEED, Some("dev"));
        info!("Development mode: in-process ledger");
        Arc::new(InMemoryLedger::new())
    } else {
        Arc::new(RpcConnector::new(&config.connection))
    };
    let provider: Arc<dyn AccountProvider> = keystore;

    let client = XenonClient::connect(config, connector, provider)
        .await
        .context("starting client")?;
    let result = run(&client, &cli).await;
    client.shutdown().await;
    result
}

async fn run(client: &XenonClient, cli: &Cli) -> Result<()> {
    match &cli.command {
        Command::CreateIdentity => {
            let signer = signer(client, cli)?;
            let resolution = submit(client, &signer, Operation::CreateIdentity).await?;
            report(cli, &resolution)?;
        }
        Command::LinkChain {
            name,
            chain_id,
            address,
        } => {
            let signer = signer(client, cli)?;
            let operation = Operation::link_chain(name.as_str(), *chain_id, address.as_str());
            let resolution = submit(client, &signer, operation).await?;
            report(cli, &resolution)?;
        }
        Command::UnlinkChain { chain_id } => {
            let signer = signer(client, cli)?;
            let operation = Operation::UnlinkChain {
                chain_id: *chain_id,
            };
            let resolution = submit(client, &signer, operation).await?;
            report(cli, &resolution)?;
        }
        Command::Show { address } => {
            let address = match address {
                Some(address) => AccountAddress::new(address.as_str()),
                None => signer(client, cli)?,
            };
            let view = client
                .queries()
                .identity_view(&address)
                .await
                .context("querying document")?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&view)?);
                return Ok(());
            }

            println!("{}", view.did_uri);
            let Some(document) = &view.document else {
                println!("  no document registered");
                return Ok(());
            };
            println!("  controller  {}", document.controller);
            println!(
                "  created     block {} (updated {})",
                document.created_at, document.updated_at
            );
            println!("  chains      {}", document.linked_chains.len());
            for chain in &document.linked_chains {
                println!("    {:>6}  {:<12} {}", chain.chain_id, chain.chain_name, chain.address);
            }
            println!("  keys        {}", document.public_keys.len());
            for key in &document.public_keys {
                println!("    {:<8} {}", key.id, key.fingerprint());
            }
            for service in &document.services {
                println!("  service     {} {} {}", service.id, service.service_type, service.endpoint);
            }
        }
        Command::Accounts => {
            let accounts = client.accounts();
            if accounts.is_empty() {
                println!("no signing accounts (pass --seed or --dev)");
            }
            for account in accounts.iter() {
                match &account.name {
                    Some(name) => println!("{}  {}", account.address, name),
                    None => println!("{}", account.address),
                }
            }
        }
    }
    Ok(())
}

/// Submit and wait, echoing state changes to stderr.
async fn submit(
    client: &XenonClient,
    submitter: &AccountAddress,
    operation: Operation,
) -> Result<Resolution> {
    let kind = operation.kind();
    let ticket = client.engine().submit(submitter, operation);
    let id = ticket.id();

    let mut progress = ticket.progress();
    tokio::spawn(async move {
        while progress.changed().await.is_ok() {
            let state = *progress.borrow_and_update();
            eprintln!("[{}] {state}", id.short());
        }
    });

    ticket.outcome().await.map_err(|failure| {
        let effect = match failure.effect() {
            OnChainEffect::None => "nothing was written to the ledger",
            OnChainEffect::Unknown => "the operation may still land; check before retrying",
            OnChainEffect::LandedWithoutExpectedEffect => {
                "the operation was included but had no effect"
            }
        };
        anyhow!("{kind} failed: {failure} ({effect})")
    })
}

fn signer(client: &XenonClient, cli: &Cli) -> Result<AccountAddress> {
    match &cli.account {
        Some(address) => Ok(AccountAddress::new(address.as_str())),
        None => client
            .default_account()
            .ok_or_else(|| anyhow!("no signing account available (pass --seed or --dev)")),
    }
}

fn report(cli: &Cli, resolution: &Resolution) -> Result<()> {
    if cli.json {
        println!("{}", serde_json::to_string_pretty(resolution)?);
        return Ok(());
    }
    match &resolution.payload {
        EventPayload::DocumentCreated(event) => {
            println!("created {}", event.did.did_uri());
            println!("controller {}", event.controller);
        }
        EventPayload::ChainLinked(event) => {
            println!("linked chain {} -> {}", event.chain_id, event.address);
        }
        EventPayload::ChainUnlinked(event) => println!("unlinked chain {}", event.chain_id),
    }
    if let Some(hash) = resolution.block_hash {
        println!("block 0x{}", hex::encode(hash));
    }
    Ok(())
}

fn parse_seed(seed: &str) -> Result<[u8; 32]> {
    let bytes = hex::decode(seed.trim_start_matches("0x")).context("seed is not hex")?;
    match <[u8; 32]>::try_from(bytes.as_slice()) {
        Ok(seed) => Ok(seed),
        Err(_) => bail!("seed must be 32 bytes, got {}", bytes.len()),
    }
}

/// `RUST_LOG`, else `XENON_LOG_LEVEL`, else `info`.
fn init_logging() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| {
            let level = std::env::var("XENON_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
            EnvFilter::try_new(level)
        })
        .context("invalid log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
    debug!("Logging initialized");
    Ok(())
}
