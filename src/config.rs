//! Command-line flags and the immutable run configuration built from them

use clap::{ArgAction, CommandFactory, Parser};

use crate::error::{Error, Result};
use crate::report::Verbosity;
use crate::selection::SelectionDirective;

/// `zcash-cli` location used when `--node-cli` is not given.
pub const DEFAULT_NODE_CLI: &str = "./src/zcash-cli";

/// Raw command-line flags.
#[derive(Debug, Parser)]
#[command(name = "protect-coins")]
#[command(
    about = "Makes public funds (utxo) into private funds",
    long_about = None,
    disable_help_flag = true
)]
pub struct Cli {
    /// Unspent outputs to convert: all, first, last, or one or more comma
    /// separated txids
    #[arg(long, value_name = "all|first|last|TXID[,TXID...]")]
    pub unspent: Option<String>,

    /// Fee amount
    #[arg(long, default_value_t = 0.0)]
    pub fee: f64,

    /// Path to zcash-cli, extra flags may follow the path
    #[arg(long = "node-cli", visible_alias = "zcash-cli", default_value = DEFAULT_NODE_CLI)]
    pub node_cli: String,

    /// Talk JSON-RPC to this URL instead of running zcash-cli
    #[arg(long)]
    pub rpc_url: Option<String>,

    /// RPC username
    #[arg(long, requires = "rpc_url")]
    pub rpc_user: Option<String>,

    /// RPC password
    #[arg(long, requires = "rpc_url")]
    pub rpc_password: Option<String>,

    /// Console output level
    #[arg(long, value_enum, default_value_t = Verbosity::Debug)]
    pub verbosity: Verbosity,

    /// Display usage information
    #[arg(long, action = ArgAction::SetTrue)]
    pub help: bool,
}

impl Cli {
    /// Rendered usage text.
    pub fn usage() -> String {
        Cli::command().render_help().to_string()
    }
}

/// Where node RPC calls go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeEndpoint {
    /// Run `zcash-cli` per call
    Cli { node_cli: String },
    /// JSON-RPC over HTTP
    Http {
        url: String,
        credentials: Option<(String, String)>,
    },
}

/// Settings for one run, fixed at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub directive: SelectionDirective,
    pub fee: f64,
    pub endpoint: NodeEndpoint,
    pub verbosity: Verbosity,
}

impl Config {
    /// Validate parsed flags. `--help` is handled by the caller before this.
    pub fn from_cli(cli: Cli) -> Result<Self> {
        let directive = match cli.unspent.as_deref().map(str::trim) {
            None | Some("") => {
                return Err(Error::Config("--unspent is required".to_string()));
            }
            Some(choice) => choice.parse::<SelectionDirective>()?,
        };

        if !cli.fee.is_finite() || cli.fee < 0.0 {
            return Err(Error::Config(format!(
                "--fee must be a non-negative amount, got {}",
                cli.fee
            )));
        }

        let endpoint = match cli.rpc_url {
            Some(url) => {
                let credentials = match (cli.rpc_user, cli.rpc_password) {
                    (Some(user), Some(password)) => Some((user, password)),
                    (None, None) => None,
                    _ => {
                        tracing::warn!(
                            "both --rpc-user and --rpc-password are needed for authentication; connecting unauthenticated"
                        );
                        None
                    }
                };
                NodeEndpoint::Http { url, credentials }
            }
            None => NodeEndpoint::Cli {
                node_cli: cli.node_cli,
            },
        };

        Ok(Config {
            directive,
            fee: cli.fee,
            endpoint,
            verbosity: cli.verbosity,
        })
    }
}
