//! Ledger transport interface consumed by the pool client.
//!
//! The client never talks to an RPC node directly; it drives whatever
//! implements [`LedgerConnection`]. Implementations own retries, timeouts and
//! commitment levels.

use async_trait::async_trait;
use solana_sdk::{
    account::Account,
    hash::Hash,
    instruction::Instruction,
    message::Message,
    pubkey::Pubkey,
    signature::Signature,
    signer::{Signer, SignerError},
    transaction::Transaction,
};

use crate::error::TransportError;

/// Result of a non-committing execution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimulationOutcome {
    /// Program log lines, in emission order.
    pub logs: Vec<String>,
    /// Execution error reported by the runtime, if any.
    pub err: Option<String>,
}

#[async_trait]
pub trait LedgerConnection: Send + Sync {
    /// Fetches an account, `None` if it does not exist.
    async fn get_account(&self, address: &Pubkey) -> Result<Option<Account>, TransportError>;

    async fn get_minimum_balance_for_rent_exemption(
        &self,
        data_len: usize,
    ) -> Result<u64, TransportError>;

    async fn get_latest_blockhash(&self) -> Result<Hash, TransportError>;

    /// Submits a signed transaction and waits for confirmation.
    ///
    /// A transaction rejected by a program comes back as an error.
    async fn send_and_confirm_transaction(
        &self,
        transaction: &Transaction,
    ) -> Result<Signature, TransportError>;

    /// Executes a transaction without committing it and without verifying
    /// signatures.
    async fn simulate_transaction(
        &self,
        transaction: &Transaction,
    ) -> Result<SimulationOutcome, TransportError>;

    /// Log messages of a confirmed transaction, `None` if unknown.
    async fn get_transaction_logs(
        &self,
        signature: &Signature,
    ) -> Result<Option<Vec<String>>, TransportError>;
}

/// Builds a transaction paid for by `payer` and signed by `payer` plus
/// `extra_signers`.
pub fn build_signed_transaction(
    instructions: &[Instruction],
    payer: &dyn Signer,
    extra_signers: &[&dyn Signer],
    recent_blockhash: Hash,
) -> Result<Transaction, SignerError> {
    let message = Message::new(instructions, Some(&payer.pubkey()));
    let mut transaction = Transaction::new_unsigned(message);
    let mut signers: Vec<&dyn Signer> = Vec::with_capacity(extra_signers.len() + 1);
    signers.push(payer);
    signers.extend_from_slice(extra_signers);
    transaction.try_sign(&signers, recent_blockhash)?;
    Ok(transaction)
}

/// Builds an unsigned transaction for dry-run execution.
///
/// Simulation skips signature verification, so `fee_payer` never has to
/// sign.
pub fn build_simulation_transaction(
    instructions: &[Instruction],
    fee_payer: &Pubkey,
    recent_blockhash: Hash,
) -> Transaction {
    let mut message = Message::new(instructions, Some(fee_payer));
    message.recent_blockhash = recent_blockhash;
    Transaction::new_unsigned(message)
}
