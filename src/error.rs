use thiserror::Error;

/// Error types for the coin shielding tool
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No unspent outputs to select from")]
    NoUnspentOutputs,

    #[error("tx not in unspent list (txid: {txid})")]
    SelectionMismatch { txid: String },

    #[error("node command returned non-zero exit status {}. cmd was:\n{command}\noutput:\n{output}", exit_status(.status))]
    Process {
        command: String,
        status: Option<i32>,
        output: String,
    },

    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{method} response has no `{field}` field")]
    MissingField {
        method: &'static str,
        field: &'static str,
    },

    #[error("{method} returned an unexpected response (expected {expected})")]
    UnexpectedResponse {
        method: &'static str,
        expected: &'static str,
    },
}

fn exit_status(status: &Option<i32>) -> String {
    match status {
        Some(code) => code.to_string(),
        None => "(terminated by signal)".to_string(),
    }
}

/// Result type alias for shielding operations
pub type Result<T> = std::result::Result<T, Error>;
