//! synthpool CLI
//!
//! Offline tools for synthetic pools: request digests and signatures for the
//! meta-transaction forwarder, scenario simulation and config checks.

use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand};

use synthpool::cli::{
    check_pool_config, default_forwarder_address, digest_request, load_protocol_config,
    load_request, sign_request, simulate, OutputFormat, OutputFormatter,
};
use synthpool::utils::crypto::{Address, PrivateKey};

/// synthpool - collateral-backed synthetic asset pools
#[derive(Parser)]
#[command(name = "synthpool")]
#[command(version = synthpool::VERSION)]
#[command(about = "Command-line tools for synthpool", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Engine config file (JSON); SYNTHPOOL_* variables override it
    #[arg(short, long, env = "SYNTHPOOL_CONFIG")]
    config: Option<PathBuf>,

    /// Output format: text, json or pretty
    #[arg(short, long, default_value = "pretty")]
    output: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the forwarder digest of a request
    Digest {
        /// Request file (JSON)
        request: PathBuf,

        /// Forwarder address
        #[arg(short, long)]
        forwarder: Option<Address>,
    },

    /// Sign a request with a private key
    Sign {
        /// Request file (JSON)
        request: PathBuf,

        /// Hex private key of the request sender
        #[arg(short, long, env = "SYNTHPOOL_SIGNER_KEY", hide_env_values = true)]
        key: String,

        /// Forwarder address
        #[arg(short, long)]
        forwarder: Option<Address>,
    },

    /// Run a scenario file and print the report
    Simulate {
        /// Scenario file (JSON)
        scenario: PathBuf,

        /// Exit with an error if any step fails
        #[arg(long)]
        strict: bool,
    },

    /// Validate a pool config file
    CheckConfig {
        /// Pool config file (JSON)
        pool: PathBuf,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run_command(&cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run_command(cli: &Cli) -> anyhow::Result<()> {
    let output = OutputFormatter::new(cli.output);
    let config = load_protocol_config(cli.config.as_deref()).context("loading engine config")?;

    match &cli.command {
        Commands::Digest { request, forwarder } => {
            let request = load_request(request).context("reading request")?;
            let forwarder = forwarder.unwrap_or_else(default_forwarder_address);
            output.print(&digest_request(&config, forwarder, &request))?;
        }
        Commands::Sign {
            request,
            key,
            forwarder,
        } => {
            let request = load_request(request).context("reading request")?;
            let key = PrivateKey::from_hex(key).context("parsing private key")?;
            let forwarder = forwarder.unwrap_or_else(default_forwarder_address);
            output.print(&sign_request(&config, forwarder, &request, &key)?)?;
        }
        Commands::Simulate { scenario, strict } => {
            let report = simulate(scenario)
                .with_context(|| format!("running {}", scenario.display()))?;
            output.print(&report)?;
            if *strict && report.failures() > 0 {
                anyhow::bail!("{} step(s) failed", report.failures());
            }
        }
        Commands::CheckConfig { pool } => {
            let pool_config = check_pool_config(pool)
                .with_context(|| format!("checking {}", pool.display()))?;
            tracing::info!(identifier = %pool_config.price_identifier, "pool config is valid");
            output.print(&pool_config)?;
        }
    }
    Ok(())
}
