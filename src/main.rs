//! token-flow CLI - ERC-20 transfer ledger and holder snapshot tool

use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use token_flow::{
    ledger, unique_addresses, BalanceAggregator, BlockNumber, Chain, ChainClient, CheckpointStore, Config,
    ConfigFile, HolderWriter, HttpClient, LedgerWriter, RoleBook, ScanProgress, Scanner,
    SnapshotMetadata,
};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "token-flow")]
#[command(
    version,
    about = "Labeled trade ledgers and holder snapshots from ERC-20 transfer events"
)]
#[command(after_help = r#"EXAMPLES:
    # Build a labeled buy/sell ledger for a token
    token-flow ledger -c 0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48 \
                      --exchanges dex.txt --tracked-users users.txt \
                      -f 18000000 -t latest -o trades.csv

    # Holder balance snapshot at the chain head
    token-flow snapshot -c 0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48 \
                        -f 18000000 -o holders.csv --non-zero-only

    # Resume an interrupted scan (checkpoints are picked up automatically)
    token-flow ledger -c 0x... --exchanges dex.txt --tracked-users users.txt

ENVIRONMENT VARIABLES:
    RPC_URL          JSON-RPC endpoint
    TOKEN_ADDRESS    Token contract address

CONFIG FILE:
    Default: ~/.config/token-flow/config.toml
"#)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Chain to query
    #[arg(long, default_value = "ethereum", global = true)]
    chain: String,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress progress output
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Args)]
struct ScanArgs {
    /// Token contract address
    #[arg(short = 'c', long, env = "TOKEN_ADDRESS")]
    token: String,

    /// RPC endpoint URL
    #[arg(long, env = "RPC_URL")]
    rpc: Option<String>,

    /// Start block number
    #[arg(short = 'f', long, default_value = "0")]
    from_block: u64,

    /// End block number (or "latest")
    #[arg(short = 't', long, default_value = "latest")]
    to_block: String,

    /// Blocks per getLogs window
    #[arg(short = 'w', long)]
    window_size: Option<u64>,

    /// Number of concurrent window fetches
    #[arg(short = 'n', long)]
    concurrency: Option<usize>,

    /// Aggregate requests per second across all workers
    #[arg(long)]
    rate_limit: Option<u32>,

    /// Request timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Max retries per window span
    #[arg(long)]
    retries: Option<u32>,

    /// Directory for checkpoint files
    #[arg(long)]
    checkpoint_dir: Option<PathBuf>,

    /// Output file path (stdout if not specified)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a labeled buy/sell/transfer ledger
    Ledger {
        #[command(flatten)]
        scan: ScanArgs,

        /// File with known exchange addresses, one per line
        #[arg(long)]
        exchanges: PathBuf,

        /// File with tracked user addresses, one per line
        #[arg(long)]
        tracked_users: PathBuf,
    },

    /// Snapshot holder balances and supply percentages
    Snapshot {
        #[command(flatten)]
        scan: ScanArgs,

        /// Drop holders whose balance is zero at the snapshot block
        #[arg(long)]
        non_zero_only: bool,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show config file path
    Path,

    /// Show current config
    Show,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(EnvFilter::new(filter))
        .init();

    match &cli.command {
        Commands::Ledger {
            scan,
            exchanges,
            tracked_users,
        } => run_ledger(&cli, scan, exchanges, tracked_users).await,
        Commands::Snapshot {
            scan,
            non_zero_only,
        } => run_snapshot(&cli, scan, *non_zero_only).await,
        Commands::Config { action } => handle_config(action),
    }
}

fn build_config(cli: &Cli, scan: &ScanArgs) -> anyhow::Result<Config> {
    let chain: Chain = cli.chain.parse()?;
    let to_block: BlockNumber = scan.to_block.parse()?;

    let config_file = ConfigFile::load_default().ok().flatten();
    let settings = config_file
        .as_ref()
        .map(|c| c.settings.clone())
        .unwrap_or_default();

    let rpc_url = scan
        .rpc
        .clone()
        .or_else(|| config_file.as_ref().and_then(|c| c.rpc_url.clone()))
        .ok_or_else(|| anyhow::anyhow!("RPC endpoint is required. Use --rpc or set RPC_URL"))?;

    let checkpoint_dir = scan
        .checkpoint_dir
        .clone()
        .or_else(|| config_file.as_ref().and_then(|c| c.checkpoint_dir.clone()))
        .unwrap_or_else(|| PathBuf::from("."));

    let config = Config::builder()
        .chain(chain)
        .token(&scan.token)
        .rpc_url(rpc_url)
        .from_block(scan.from_block)
        .to_block(to_block)
        .window_size(scan.window_size.unwrap_or(settings.window_size))
        .concurrency(scan.concurrency.unwrap_or(settings.concurrency))
        .requests_per_second(scan.rate_limit.unwrap_or(settings.requests_per_second))
        .timeout_secs(scan.timeout.unwrap_or(settings.timeout_seconds))
        .max_retries(scan.retries.unwrap_or(settings.retry_attempts))
        .checkpoint_dir(checkpoint_dir)
        .build()?;

    Ok(config)
}

fn progress_bar(quiet: bool) -> Option<ProgressBar> {
    if quiet {
        return None;
    }
    let pb = ProgressBar::new(100);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}% ({msg})")
            .unwrap()
            .progress_chars("#>-"),
    );
    Some(pb)
}

async fn scan_events(
    cli: &Cli,
    config: &Config,
    client: Arc<HttpClient>,
) -> anyhow::Result<(Vec<token_flow::TransferEvent>, token_flow::SharedRateLimiter)> {
    let store = CheckpointStore::open(
        &config.checkpoint_dir,
        config.token,
        config.chain.chain_id(),
    )?;

    if !cli.quiet {
        eprintln!(
            "Scanning {} transfers on {}...",
            config.token,
            config.chain.display_name()
        );
    }

    let pb = progress_bar(cli.quiet);
    let pb_clone = pb.clone();

    let mut scanner = Scanner::new(client, store, config.scan.clone()).with_progress(
        move |progress: ScanProgress| {
            if let Some(ref pb) = pb_clone {
                pb.set_position(progress.percent as u64);
                pb.set_message(format!(
                    "{} events, {:.0} blocks/s",
                    progress.events_fetched, progress.blocks_per_second
                ));
            }
        },
    );
    let limiter = scanner.limiter();

    let start = Instant::now();
    let events = scanner
        .scan(config.block_range.from_block(), config.block_range.to_block())
        .await?;

    if let Some(ref pb) = pb {
        pb.finish_and_clear();
    }

    if !cli.quiet {
        eprintln!(
            "Scanned {} transfer events in {:.2}s",
            events.len(),
            start.elapsed().as_secs_f64()
        );
    }

    Ok((events, limiter))
}

async fn run_ledger(
    cli: &Cli,
    scan: &ScanArgs,
    exchanges: &PathBuf,
    tracked_users: &PathBuf,
) -> anyhow::Result<()> {
    let config = build_config(cli, scan)?;

    // Role sets are validated before the first network call.
    let roles = RoleBook::from_files(exchanges, tracked_users)?;
    if !cli.quiet {
        eprintln!(
            "Loaded {} exchange and {} tracked-user addresses",
            roles.exchange_count(),
            roles.tracked_user_count()
        );
    }

    let client = Arc::new(HttpClient::new(
        &config.rpc_url,
        config.token,
        Duration::from_secs(config.scan.timeout_secs),
    )?);

    let (events, _limiter) = scan_events(cli, &config, client.clone()).await?;
    let rows = ledger(&events, &roles);

    let decimals = client.get_decimals().await.map_err(token_flow::Error::Rpc)?;
    let mut writer = LedgerWriter::new(scan.output.as_deref(), decimals)?;
    writer.write_rows(&rows)?;
    writer.finalize()?;

    if !cli.quiet {
        eprintln!("Wrote {} ledger rows", rows.len());
    }

    Ok(())
}

async fn run_snapshot(cli: &Cli, scan: &ScanArgs, non_zero_only: bool) -> anyhow::Result<()> {
    let config = build_config(cli, scan)?;

    let client = Arc::new(HttpClient::new(
        &config.rpc_url,
        config.token,
        Duration::from_secs(config.scan.timeout_secs),
    )?);

    // Pin "latest" to a concrete block so the scan range and every balance
    // query refer to the same snapshot point.
    let at_block = match config.block_range.to_block() {
        BlockNumber::Number(n) => n,
        BlockNumber::Latest => client
            .get_block_number()
            .await
            .map_err(token_flow::Error::Rpc)?,
    };
    let config = {
        let mut c = config;
        c.block_range = token_flow::BlockRange::new(
            c.block_range.from_block(),
            BlockNumber::Number(at_block),
        )?;
        c
    };

    let (events, limiter) = scan_events(cli, &config, client.clone()).await?;

    let addresses = unique_addresses(&events);
    if !cli.quiet {
        eprintln!("Found {} unique addresses", addresses.len());
    }

    let aggregator =
        BalanceAggregator::new(client.clone(), limiter, config.scan.concurrency);
    let mut records = aggregator.snapshot(&addresses, at_block).await?;

    if non_zero_only {
        records.retain(|r| !r.balance.is_zero());
    }

    let decimals = client.get_decimals().await.map_err(token_flow::Error::Rpc)?;
    let mut writer = HolderWriter::new(scan.output.as_deref(), decimals)?;
    writer.write_rows(&records)?;
    writer.finalize()?;

    if let Some(output) = &scan.output {
        let meta = SnapshotMetadata::new(config.chain.chain_id(), config.token, at_block);
        let meta_path = meta.write_sidecar(output)?;
        if !cli.quiet {
            eprintln!(
                "Wrote {} holder rows, metadata at {}",
                records.len(),
                meta_path.display()
            );
        }
    } else if !cli.quiet {
        eprintln!("Wrote {} holder rows", records.len());
    }

    Ok(())
}

fn handle_config(action: &ConfigCommands) -> anyhow::Result<()> {
    match action {
        ConfigCommands::Path => {
            println!("{}", ConfigFile::default_path().display());
        }

        ConfigCommands::Show => {
            let path = ConfigFile::default_path();
            if path.exists() {
                let content = std::fs::read_to_string(&path)?;
                println!("# {}\n", path.display());
                println!("{}", content);
            } else {
                println!("No config file found at: {}", path.display());
            }
        }
    }

    Ok(())
}
