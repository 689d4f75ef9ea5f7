use std::path::PathBuf;

use anyhow::{Context, anyhow};
use clap::{Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use pinmint::config::{Config, parse_chain_id};
use pinmint::flow;
use pinmint::gallery::{Gallery, gateway_url};
use pinmint::pin_client::PinClient;
use pinmint::session_store::{FileStorage, MemoryStorage, RecordStore, SessionStorage};
use pinmint::utils;
use pinmint::wallet::{HttpProvider, WalletBridge};

#[derive(Parser, Debug)]
#[command(name = "pinmint", about = "Pin images to IPFS and mint them as NFTs")]
struct Cli {
    /// Session whose record list to use
    #[arg(long, global = true, value_parser = clap::builder::NonEmptyStringValueParser::new())]
    session: Option<String>,
    /// Keep records in memory only, they are gone when the command exits
    #[arg(long, global = true)]
    ephemeral: bool,
    /// Gateway used to render ipfs:// references
    #[arg(long, global = true)]
    gateway: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Pin an image and record it in the session
    Upload {
        file: PathBuf,
        #[arg(short, long, default_value = "")]
        description: String,
    },
    /// List the session's uploads, newest first
    Gallery {
        #[arg(short, long)]
        filter: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Mint a recorded upload through the wallet provider
    Mint {
        id: String,
        #[arg(long)]
        rpc_url: Option<String>,
        #[arg(long)]
        contract: Option<String>,
        #[arg(long)]
        chain_id: Option<String>,
    },
    /// Print the gateway url for a content reference
    Resolve { content_ref: String },
    /// Forget every record in the session
    Clear,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pinmint=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let mut config = Config::from_env();
    if let Some(session) = cli.session {
        config.session = session;
    }
    if let Some(gateway) = cli.gateway {
        config.gateway = gateway;
    }

    if cli.ephemeral {
        debug!("in-memory session storage");
        return run(cli.command, config, RecordStore::new(MemoryStorage::new()));
    }
    let storage = FileStorage::for_session(&config.session);
    debug!(path = %storage.path().display(), "session storage");
    run(cli.command, config, RecordStore::new(storage))
}

fn run<S: SessionStorage>(command: Command, mut config: Config, store: RecordStore<S>) -> anyhow::Result<()> {
    match command {
        Command::Upload { file, description } => {
            let pin = PinClient::new(&config).context("could not build pinning client")?;
            let record = flow::upload_and_record(&pin, &store, &file, &description)
                .with_context(|| format!("upload of {} failed", file.display()))?;
            println!("{}\t{}\t{}", record.id, record.content_ref, gateway_url(&record, &config.gateway));
        }

        Command::Gallery { filter, json } => {
            let gallery = Gallery::load(&store).context("could not read session records")?;
            let shown = gallery.filter(filter.as_deref().unwrap_or(""));
            debug!(total = gallery.len(), shown = shown.len(), "gallery loaded");
            if json {
                println!("{}", serde_json::to_string_pretty(&shown)?);
            } else if gallery.is_empty() {
                println!("no uploads in session {}", config.session);
            } else if shown.is_empty() {
                println!("no uploads match");
            } else {
                for record in shown {
                    println!(
                        "{}\t{}\t{}",
                        record.id,
                        gateway_url(record, &config.gateway),
                        record.description
                    );
                }
            }
        }

        Command::Mint { id, rpc_url, contract, chain_id } => {
            if let Some(url) = rpc_url {
                config.wallet_rpc_url = url;
            }
            if let Some(contract) = contract {
                config.contract = Some(contract);
            }
            if let Some(chain_id) = chain_id {
                config.chain_id = chain_id;
            }
            parse_chain_id(&config.chain_id).context("invalid chain id")?;

            let gallery = Gallery::load(&store).context("could not read session records")?;
            let record = gallery
                .find(&id)
                .ok_or_else(|| anyhow!("no upload with id {id} in session {}", config.session))?;

            let mut bridge = WalletBridge::new(&config, || HttpProvider::new(&config));
            let accounts = bridge.connect().context("wallet connection failed")?;
            info!(sub = %accounts.sub, primary = %accounts.primary, "minting from sub-account");
            let receipt = bridge.mint(record).map_err(|e| anyhow!(e.user_message()))?;
            println!("{}", serde_json::to_string_pretty(&receipt)?);
        }

        Command::Resolve { content_ref } => {
            println!("{}", utils::resolve_gateway_url(&content_ref, &config.gateway));
        }

        Command::Clear => {
            store.clear().context("could not clear session records")?;
            println!("session {} cleared", config.session);
        }
    }

    Ok(())
}
