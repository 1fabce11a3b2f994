//! # Zcash Protect Coins
//!
//! Converts a wallet's transparent unspent outputs into shielded funds by
//! driving a `zcashd` node through a fixed sequence of RPC calls.
//!
//! - **Coin selection**: pick all, the first, the last, or an explicit list of
//!   unspent outputs from the node's listing
//! - **Shielding pipeline**: key generation, raw transaction, pour, signing,
//!   broadcast and note decryption, in that order
//! - **Transports**: `zcash-cli` subprocess or JSON-RPC over HTTP
//!
//! ## Example
//!
//! ```no_run
//! use zcash_protect_coins::client::CliNodeClient;
//! use zcash_protect_coins::pipeline::ShieldingPipeline;
//! use zcash_protect_coins::report::{Reporter, Verbosity};
//! use zcash_protect_coins::selection::SelectionDirective;
//!
//! # async fn example() -> zcash_protect_coins::Result<()> {
//! let reporter = Reporter::stdout(Verbosity::Summaries);
//! let node = CliNodeClient::new("./src/zcash-cli", reporter.clone());
//! let pipeline = ShieldingPipeline::new(&node, reporter);
//! let outcome = pipeline.run(&SelectionDirective::First, 0.0001).await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod report;
pub mod rpc;
pub mod selection;

pub use error::{Error, Result};
