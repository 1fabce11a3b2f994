//! RPC call model and response types for zcashd
//!
//! Every interaction with the node goes through [`NodeRpc::call`], which takes a
//! method name plus positional JSON arguments and hands back either structured
//! JSON or raw text. Responses are wrapped in thin typed views whose fields are
//! looked up only when the pipeline needs them.

use std::borrow::Cow;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// zcashd RPC method names used by the shielding pipeline
pub mod methods {
    pub const LIST_UNSPENT: &str = "listunspent";
    pub const ZC_RAW_KEYGEN: &str = "zcrawkeygen";
    pub const CREATE_RAW_TRANSACTION: &str = "createrawtransaction";
    pub const ZC_RAW_POUR: &str = "zcrawpour";
    pub const SIGN_RAW_TRANSACTION: &str = "signrawtransaction";
    pub const SEND_RAW_TRANSACTION: &str = "sendrawtransaction";
    pub const ZC_RAW_RECEIVE: &str = "zcrawreceive";
}

/// A single RPC invocation: method name plus positional arguments.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RpcCall {
    pub method: String,
    pub args: Vec<Value>,
}

impl RpcCall {
    pub fn new(method: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            method: method.into(),
            args,
        }
    }
}

/// What a node call produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RpcOutput {
    Json(Value),
    Text(String),
}

impl RpcOutput {
    /// Classify raw node output by its first non-whitespace character.
    ///
    /// Output starting with `[` or `{` must parse as JSON; anything else is
    /// returned as trimmed text. Raw control characters inside JSON strings
    /// are accepted, since node replies such as decrypted notes may carry them.
    pub fn classify(buf: &str) -> Result<Self> {
        let trimmed = buf.trim();
        match trimmed.chars().next() {
            Some('[') | Some('{') => {
                let json = escape_control_chars(trimmed);
                Ok(RpcOutput::Json(serde_json::from_str(&json)?))
            }
            _ => Ok(RpcOutput::Text(trimmed.to_string())),
        }
    }

    /// Wrap a decoded JSON-RPC `result` value.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::String(s) => RpcOutput::Text(s.trim().to_string()),
            other => RpcOutput::Json(other),
        }
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            RpcOutput::Json(value) => Some(value),
            RpcOutput::Text(_) => None,
        }
    }

    /// Take the text form of a response, failing if the node answered with JSON.
    pub fn into_text(self, method: &'static str) -> Result<String> {
        match self {
            RpcOutput::Text(text) => Ok(text),
            RpcOutput::Json(_) => Err(Error::UnexpectedResponse {
                method,
                expected: "a plain text value",
            }),
        }
    }

    /// Look up a string field of a JSON object response.
    pub fn str_field(&self, method: &'static str, field: &'static str) -> Result<&str> {
        self.as_json()
            .and_then(|value| value.get(field))
            .and_then(Value::as_str)
            .ok_or(Error::MissingField { method, field })
    }
}

/// Escape raw U+0000..U+001F characters that appear inside JSON string
/// literals so that a strict parser accepts them. Text outside strings is
/// left untouched.
fn escape_control_chars(json: &str) -> Cow<'_, str> {
    if !json.chars().any(|c| c < '\u{20}') {
        return Cow::Borrowed(json);
    }

    let mut out = String::with_capacity(json.len() + 8);
    let mut in_string = false;
    let mut escaped = false;
    for c in json.chars() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            } else if c < '\u{20}' {
                out.push_str(&format!("\\u{:04x}", c as u32));
                continue;
            }
        } else if c == '"' {
            in_string = true;
        }
        out.push(c);
    }
    Cow::Owned(out)
}

/// Connection to a zcashd node.
///
/// Calls are issued exactly once and awaited to completion. No retry or timeout
/// wrapper is applied at this seam: a failed call is fatal to the caller and an
/// unresponsive node blocks it.
#[async_trait]
pub trait NodeRpc: Send + Sync {
    async fn call(&self, call: &RpcCall) -> Result<RpcOutput>;
}

/// Unspent transparent output as listed by `listunspent`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnspentOutput {
    pub txid: String,
    /// Output index as reported by the node. Transaction inputs always spend
    /// index 0, see [`TxInput`].
    #[serde(default)]
    pub vout: u32,
    pub amount: f64,
    /// Remaining fields reported by the node (address, confirmations, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UnspentOutput {
    pub fn new(txid: impl Into<String>, amount: f64) -> Self {
        Self {
            txid: txid.into(),
            vout: 0,
            amount,
            extra: Map::new(),
        }
    }

    /// Decode a `listunspent` response.
    pub fn list_from(output: &RpcOutput) -> Result<Vec<UnspentOutput>> {
        match output.as_json() {
            Some(value) if value.is_array() => Ok(serde_json::from_value(value.clone())?),
            _ => Err(Error::UnexpectedResponse {
                method: methods::LIST_UNSPENT,
                expected: "a JSON array of unspent outputs",
            }),
        }
    }
}

/// Input reference passed to `createrawtransaction`.
///
/// The wallet is expected to hold one output per funding transaction, so every
/// input spends output index 0 of its transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TxInput {
    pub txid: String,
    pub vout: u32,
}

impl From<&UnspentOutput> for TxInput {
    fn from(utxo: &UnspentOutput) -> Self {
        TxInput {
            txid: utxo.txid.clone(),
            vout: 0,
        }
    }
}

/// One-time shielding keypair returned by `zcrawkeygen`.
#[derive(Debug, Clone)]
pub struct KeyInfo(RpcOutput);

impl KeyInfo {
    pub fn zcaddress(&self) -> Result<&str> {
        self.0.str_field(methods::ZC_RAW_KEYGEN, "zcaddress")
    }

    pub fn zcsecretkey(&self) -> Result<&str> {
        self.0.str_field(methods::ZC_RAW_KEYGEN, "zcsecretkey")
    }
}

impl From<RpcOutput> for KeyInfo {
    fn from(output: RpcOutput) -> Self {
        KeyInfo(output)
    }
}

/// Result of `zcrawpour`.
#[derive(Debug, Clone)]
pub struct PourResult(RpcOutput);

impl PourResult {
    /// Poured transaction, still unsigned
    pub fn rawtxn(&self) -> Result<&str> {
        self.0.str_field(methods::ZC_RAW_POUR, "rawtxn")
    }

    /// Ciphertext of the note sent to the shielding address
    pub fn encryptedbucket1(&self) -> Result<&str> {
        self.0.str_field(methods::ZC_RAW_POUR, "encryptedbucket1")
    }
}

impl From<RpcOutput> for PourResult {
    fn from(output: RpcOutput) -> Self {
        PourResult(output)
    }
}

/// Result of `signrawtransaction`.
#[derive(Debug, Clone)]
pub struct SignedTx(RpcOutput);

impl SignedTx {
    pub fn hex(&self) -> Result<&str> {
        self.0.str_field(methods::SIGN_RAW_TRANSACTION, "hex")
    }
}

impl From<RpcOutput> for SignedTx {
    fn from(output: RpcOutput) -> Self {
        SignedTx(output)
    }
}

/// JSON-RPC request structure
#[derive(Debug, Serialize)]
pub(crate) struct RpcRequest<'a> {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: &'a str,
    pub params: &'a [Value],
}

/// JSON-RPC response structure
#[derive(Debug, Deserialize)]
pub(crate) struct RpcResponse {
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<RpcError>,
}

/// JSON-RPC error structure
#[derive(Debug, Deserialize)]
pub(crate) struct RpcError {
    pub code: i32,
    pub message: String,
}
