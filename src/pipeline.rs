//! Shielding pipeline: move transparent unspent outputs into a fresh shielded note
//!
//! The pipeline is a fixed sequence of node calls, each one consuming the
//! output of the previous:
//!
//! 1. `listunspent` to get the coins on hand
//! 2. coin selection (local)
//! 3. `zcrawkeygen` for a one-time shielding address and secret key
//! 4. `createrawtransaction` spending the selected coins, with no outputs
//! 5. `zcrawpour` sending `total - fee` to the shielding address
//! 6. `signrawtransaction`
//! 7. `sendrawtransaction`
//! 8. `zcrawreceive` to prove the secret key recovers the note
//!
//! Any failure aborts the run where it happened. Nothing is rolled back or
//! retried: once the transaction has been broadcast the steps are not
//! idempotent.

use serde_json::{json, Map, Value};

use crate::error::Result;
use crate::report::{Reporter, Verbosity};
use crate::rpc::{
    methods, KeyInfo, NodeRpc, PourResult, RpcCall, RpcOutput, SignedTx, TxInput, UnspentOutput,
};
use crate::selection::{select, total_amount, SelectionDirective};

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    ListUnspent,
    Select,
    GenerateKey,
    CreateRawTransaction,
    Pour,
    Sign,
    Broadcast,
    Decrypt,
    Done,
}

impl Step {
    pub fn title(self) -> &'static str {
        match self {
            Step::ListUnspent => "Listing Unspent Coins",
            Step::Select => "Unspent Coins Chosen",
            Step::GenerateKey => "Generating Shielding Address",
            Step::CreateRawTransaction => "Creating Raw Transaction",
            Step::Pour => "Pouring Into Shielded Address",
            Step::Sign => "Signing Transaction",
            Step::Broadcast => "Sending Transaction To Ourself",
            Step::Decrypt => "Decrypting Received Note",
            Step::Done => "Done!",
        }
    }
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineOutcome {
    /// The wallet had no unspent outputs; nothing was sent.
    NothingToShield,
    Shielded(ShieldingReceipt),
}

/// Summary of a completed shielding run.
#[derive(Debug, Clone, PartialEq)]
pub struct ShieldingReceipt {
    pub selected: Vec<UnspentOutput>,
    pub zcaddress: String,
    pub total: f64,
    pub fee: f64,
    /// `total - fee`, negative when the fee exceeds the selected total
    pub amount_shielded: f64,
    pub txid: String,
    /// `zcrawreceive` output for the poured note
    pub received: RpcOutput,
}

/// Drives one shielding run against a node.
pub struct ShieldingPipeline<'a, R: NodeRpc + ?Sized> {
    rpc: &'a R,
    reporter: Reporter,
}

impl<'a, R: NodeRpc + ?Sized> ShieldingPipeline<'a, R> {
    pub fn new(rpc: &'a R, reporter: Reporter) -> Self {
        Self { rpc, reporter }
    }

    /// Shield the outputs picked by `directive`, paying `fee`.
    pub async fn run(&self, directive: &SelectionDirective, fee: f64) -> Result<PipelineOutcome> {
        let listing = self
            .step(Step::ListUnspent, RpcCall::new(methods::LIST_UNSPENT, vec![]))
            .await?;
        let unspent = UnspentOutput::list_from(&listing)?;
        if unspent.is_empty() {
            tracing::info!("wallet has no unspent outputs");
            self.reporter
                .note(Verbosity::Errors, "\n\nNo unspent coins to process.  Quitting!\n");
            return Ok(PipelineOutcome::NothingToShield);
        }

        let selected = select(directive, &unspent)?;
        self.reporter.header(Step::Select.title());
        self.reporter
            .note(Verbosity::Results, &format!("  User's choice: {}\n\n", directive));
        self.reporter.result(&selected);

        let keyinfo = KeyInfo::from(
            self.step(Step::GenerateKey, RpcCall::new(methods::ZC_RAW_KEYGEN, vec![]))
                .await?,
        );

        let inputs: Vec<TxInput> = selected.iter().map(TxInput::from).collect();
        let total = total_amount(&selected);
        let rawtx = self
            .step(
                Step::CreateRawTransaction,
                RpcCall::new(
                    methods::CREATE_RAW_TRANSACTION,
                    vec![serde_json::to_value(&inputs)?, json!({})],
                ),
            )
            .await?
            .into_text(methods::CREATE_RAW_TRANSACTION)?;

        let amount_shielded = total - fee;
        if amount_shielded < 0.0 {
            tracing::warn!(total, fee, "fee exceeds the selected total; pouring a negative amount");
        }
        let zcaddress = keyinfo.zcaddress()?.to_string();
        let mut shielded_outputs = Map::new();
        shielded_outputs.insert(zcaddress.clone(), json!(amount_shielded));
        let pour = PourResult::from(
            self.step(
                Step::Pour,
                RpcCall::new(
                    methods::ZC_RAW_POUR,
                    vec![
                        Value::String(rawtx),
                        json!({}),
                        Value::Object(shielded_outputs),
                        json!(total),
                        json!(fee),
                    ],
                ),
            )
            .await?,
        );

        let signed = SignedTx::from(
            self.step(
                Step::Sign,
                RpcCall::new(methods::SIGN_RAW_TRANSACTION, vec![json!(pour.rawtxn()?)]),
            )
            .await?,
        );

        let txid = self
            .step(
                Step::Broadcast,
                RpcCall::new(methods::SEND_RAW_TRANSACTION, vec![json!(signed.hex()?)]),
            )
            .await?
            .into_text(methods::SEND_RAW_TRANSACTION)?;
        tracing::info!(%txid, amount = amount_shielded, "shielding transaction broadcast");

        let received = self
            .step(
                Step::Decrypt,
                RpcCall::new(
                    methods::ZC_RAW_RECEIVE,
                    vec![json!(keyinfo.zcsecretkey()?), json!(pour.encryptedbucket1()?)],
                ),
            )
            .await?;

        self.reporter.header(Step::Done.title());
        Ok(PipelineOutcome::Shielded(ShieldingReceipt {
            selected,
            zcaddress,
            total,
            fee,
            amount_shielded,
            txid,
            received,
        }))
    }

    async fn step(&self, step: Step, call: RpcCall) -> Result<RpcOutput> {
        self.reporter.header(step.title());
        tracing::debug!(?step, method = %call.method, "running pipeline step");
        let output = self.rpc.call(&call).await?;
        self.reporter.result(&output);
        Ok(output)
    }
}
