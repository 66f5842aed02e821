//! Results recovered from program logs.
//!
//! The pool program reports computed amounts only through log lines of the
//! form `<OperationName>: {<json object>}`. The same lines show up in a
//! non-committing simulation and in the logs of a confirmed transaction, so
//! one scanner serves both quotes and post-commit results.

use std::fmt;

use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{Map, Value};

use crate::constants::PROGRAM_LOG_PREFIX;
use crate::error::{ClientError, Result};

/// Operations that log a result line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuoteKind {
    GetDyUnderlying,
    GetMintAmount,
    GetWithdrawalAmounts,
    GetWithdrawalAmount,
    GetVirtualPrice,
}

impl QuoteKind {
    pub const ALL: [QuoteKind; 5] = [
        QuoteKind::GetDyUnderlying,
        QuoteKind::GetMintAmount,
        QuoteKind::GetWithdrawalAmounts,
        QuoteKind::GetWithdrawalAmount,
        QuoteKind::GetVirtualPrice,
    ];

    /// Name written by the program in front of the payload.
    pub const fn log_name(self) -> &'static str {
        match self {
            QuoteKind::GetDyUnderlying => "GetDyUnderlying",
            QuoteKind::GetMintAmount => "GetMintAmount",
            QuoteKind::GetWithdrawalAmounts => "GetWithdrawalAmounts",
            QuoteKind::GetWithdrawalAmount => "GetWithdrawalAmount",
            QuoteKind::GetVirtualPrice => "GetVirtualPrice",
        }
    }
}

impl fmt::Display for QuoteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.log_name())
    }
}

/// A typed result bound to the operation that logs it.
pub trait QuoteShape: DeserializeOwned {
    const KIND: QuoteKind;
}

/// Output amount of a swap.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct DyQuote {
    pub dy: u64,
}

impl QuoteShape for DyQuote {
    const KIND: QuoteKind = QuoteKind::GetDyUnderlying;
}

/// LP tokens minted by a deposit.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MintAmountQuote {
    pub mint_amount: u64,
}

impl QuoteShape for MintAmountQuote {
    const KIND: QuoteKind = QuoteKind::GetMintAmount;
}

/// Per-asset amounts returned by a proportional withdrawal, vault order.
///
/// Accepts `{"amounts": [..]}` or an object of integers taken in document
/// order.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(try_from = "Map<String, Value>")]
pub struct WithdrawalAmountsQuote {
    pub amounts: Vec<u64>,
}

impl TryFrom<Map<String, Value>> for WithdrawalAmountsQuote {
    type Error = String;

    fn try_from(object: Map<String, Value>) -> std::result::Result<Self, Self::Error> {
        let as_amount = |value: &Value| {
            value
                .as_u64()
                .ok_or_else(|| format!("{} is not an unsigned amount", value))
        };

        if object.len() == 1 {
            if let Some(Value::Array(values)) = object.values().next() {
                let amounts = values.iter().map(as_amount).collect::<std::result::Result<_, _>>()?;
                return Ok(Self { amounts });
            }
        }
        let amounts = object.values().map(as_amount).collect::<std::result::Result<_, _>>()?;
        Ok(Self { amounts })
    }
}

impl QuoteShape for WithdrawalAmountsQuote {
    const KIND: QuoteKind = QuoteKind::GetWithdrawalAmounts;
}

/// Amount of the single asset returned by a one-token withdrawal.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct WithdrawalAmountQuote {
    pub amount: u64,
}

impl QuoteShape for WithdrawalAmountQuote {
    const KIND: QuoteKind = QuoteKind::GetWithdrawalAmount;
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct VirtualPriceQuote {
    pub price: u64,
}

impl QuoteShape for VirtualPriceQuote {
    const KIND: QuoteKind = QuoteKind::GetVirtualPrice;
}

/// A matched result line before it is bound to a result shape.
#[derive(Debug, Clone, PartialEq)]
pub struct RawQuote {
    pub kind: QuoteKind,
    pub payload: Map<String, Value>,
}

/// Returns the `{...}` body if `line` is a result line for `kind`.
///
/// Equivalent to `^<name>: (\{.+\})$`, case-insensitive, after an optional
/// runtime log prefix.
pub fn match_quote_line(line: &str, kind: QuoteKind) -> Option<&str> {
    let line = line.strip_prefix(PROGRAM_LOG_PREFIX).unwrap_or(line);
    let name = kind.log_name();
    let head = line.get(..name.len())?;
    if !head.eq_ignore_ascii_case(name) {
        return None;
    }
    let body = line[name.len()..].strip_prefix(": ")?;
    if body.len() > 2 && body.starts_with('{') && body.ends_with('}') {
        Some(body)
    } else {
        None
    }
}

/// Finds the first result line for `kind` and parses its JSON object.
pub fn find_raw_quote(logs: &[String], kind: QuoteKind) -> Result<RawQuote> {
    let body = logs
        .iter()
        .find_map(|line| match_quote_line(line, kind))
        .ok_or_else(|| ClientError::MissingQuoteResult {
            operation: kind,
            logs: logs.to_vec(),
        })?;

    let payload: Map<String, Value> =
        serde_json::from_str(body).map_err(|e| ClientError::MalformedQuote {
            operation: kind,
            reason: e.to_string(),
        })?;
    Ok(RawQuote { kind, payload })
}

/// Finds and parses the result line for `Q`.
pub fn find_log_and_parse<Q: QuoteShape>(logs: &[String]) -> Result<Q> {
    let raw = find_raw_quote(logs, Q::KIND)?;
    serde_json::from_value(Value::Object(raw.payload)).map_err(|e| ClientError::MalformedQuote {
        operation: Q::KIND,
        reason: e.to_string(),
    })
}
