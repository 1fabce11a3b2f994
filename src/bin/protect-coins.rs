//! protect-coins - turn transparent unspent outputs into shielded funds
//!
//! Exit status: 0 on success or when there is nothing to shield, 1 on
//! `--help`, a configuration error, or any failed node call.

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;
use zcash_protect_coins::client::{CliNodeClient, HttpNodeClient};
use zcash_protect_coins::config::{Cli, Config, NodeEndpoint};
use zcash_protect_coins::pipeline::{PipelineOutcome, ShieldingPipeline};
use zcash_protect_coins::report::Reporter;
use zcash_protect_coins::rpc::NodeRpc;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Exits non-zero, matching the historical behavior of this tool
    if cli.help {
        println!("{}", Cli::usage());
        return ExitCode::from(1);
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.verbosity.tracing_directive()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = match Config::from_cli(cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", Cli::usage());
            eprintln!("error: {}", e);
            return ExitCode::from(1);
        }
    };

    match run(&config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // Library errors already embed their cause in the message
            eprintln!("error: {}", e);
            ExitCode::from(1)
        }
    }
}

async fn run(config: &Config) -> anyhow::Result<()> {
    let reporter = Reporter::stdout(config.verbosity);

    match &config.endpoint {
        NodeEndpoint::Cli { node_cli } => {
            tracing::debug!(%node_cli, "using zcash-cli transport");
            let node = CliNodeClient::new(node_cli.clone(), reporter.clone());
            shield(&node, reporter, config).await
        }
        NodeEndpoint::Http { url, credentials } => {
            let node = match credentials {
                Some((user, password)) => {
                    HttpNodeClient::with_auth(url.clone(), user, password, reporter.clone())
                }
                None => HttpNodeClient::new(url.clone(), reporter.clone()),
            };
            tracing::debug!(endpoint = %node.endpoint(), "using json-rpc transport");
            shield(&node, reporter, config).await
        }
    }
}

async fn shield<R: NodeRpc>(node: &R, reporter: Reporter, config: &Config) -> anyhow::Result<()> {
    let pipeline = ShieldingPipeline::new(node, reporter);
    let outcome = pipeline.run(&config.directive, config.fee).await?;

    match outcome {
        PipelineOutcome::NothingToShield => {
            tracing::info!("nothing to shield");
        }
        PipelineOutcome::Shielded(receipt) => {
            tracing::info!(
                txid = %receipt.txid,
                zcaddress = %receipt.zcaddress,
                inputs = receipt.selected.len(),
                amount = receipt.amount_shielded,
                "shielding complete"
            );
        }
    }
    Ok(())
}
