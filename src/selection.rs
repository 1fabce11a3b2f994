//! Coin selection over a `listunspent` snapshot

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::rpc::UnspentOutput;

/// Which unspent outputs to shield.
///
/// `First` and `Last` refer to the order the node listed the outputs in, not
/// to amount or age.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionDirective {
    All,
    First,
    Last,
    /// Transaction ids in the order the user gave them
    Explicit(Vec<String>),
}

impl FromStr for SelectionDirective {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        match s {
            "" => Err(Error::Config("empty unspent selection".to_string())),
            "all" => Ok(SelectionDirective::All),
            "first" => Ok(SelectionDirective::First),
            "last" => Ok(SelectionDirective::Last),
            list => Ok(SelectionDirective::Explicit(
                list.split(',').map(|txid| txid.trim().to_string()).collect(),
            )),
        }
    }
}

impl fmt::Display for SelectionDirective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionDirective::All => f.write_str("all"),
            SelectionDirective::First => f.write_str("first"),
            SelectionDirective::Last => f.write_str("last"),
            SelectionDirective::Explicit(txids) => f.write_str(&txids.join(",")),
        }
    }
}

/// Pick the outputs to spend from `unspent`.
///
/// Explicit txids are matched exactly and resolved in request order; the first
/// txid missing from the listing aborts the selection.
pub fn select(directive: &SelectionDirective, unspent: &[UnspentOutput]) -> Result<Vec<UnspentOutput>> {
    let (first, last) = match (unspent.first(), unspent.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => return Err(Error::NoUnspentOutputs),
    };

    let selected = match directive {
        SelectionDirective::All => unspent.to_vec(),
        SelectionDirective::First => vec![first.clone()],
        SelectionDirective::Last => vec![last.clone()],
        SelectionDirective::Explicit(txids) => txids
            .iter()
            .map(|txid| {
                unspent
                    .iter()
                    .find(|utxo| utxo.txid == *txid)
                    .cloned()
                    .ok_or_else(|| Error::SelectionMismatch { txid: txid.clone() })
            })
            .collect::<Result<Vec<_>>>()?,
    };

    tracing::debug!(
        directive = %directive,
        selected = selected.len(),
        available = unspent.len(),
        "selected unspent outputs"
    );
    Ok(selected)
}

/// Sum of the selected amounts, as reported by the node.
pub fn total_amount(selected: &[UnspentOutput]) -> f64 {
    selected.iter().map(|utxo| utxo.amount).sum()
}
