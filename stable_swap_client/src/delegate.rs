//! Delegated-authority transaction assembly.
//!
//! Every instruction that moves user funds into the pool is wrapped as
//! `approve -> operation -> revoke` inside one transaction. The approvals
//! grant a freshly generated key delegate rights over exactly the amounts
//! being moved, the operation is authorized by that key, and the revokes
//! clear the delegation before the transaction ends. The user's own key only
//! signs the approvals and revokes.

use std::fmt;

use solana_sdk::{
    hash::Hash, instruction::Instruction, pubkey::Pubkey, signature::Keypair, signer::Signer,
    transaction::Transaction,
};
use spl_token::instruction::{approve, revoke};

use crate::connection::build_signed_transaction;
use crate::error::Result;

/// One-time signing key for a single delegated transaction.
///
/// Not `Clone`; it is consumed when its transaction is signed. `Debug` shows
/// the public key only.
pub struct EphemeralAuthority {
    keypair: Keypair,
}

impl EphemeralAuthority {
    pub fn generate() -> Self {
        Self {
            keypair: Keypair::new(),
        }
    }

    pub fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    #[cfg(test)]
    pub(crate) fn secret_bytes(&self) -> [u8; 64] {
        self.keypair.to_bytes()
    }
}

impl fmt::Debug for EphemeralAuthority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EphemeralAuthority")
            .field(&self.pubkey())
            .finish()
    }
}

/// A token account debited by the operation and the amount to delegate over it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delegation {
    pub source: Pubkey,
    pub amount: u64,
}

impl Delegation {
    pub fn new(source: Pubkey, amount: u64) -> Self {
        Self { source, amount }
    }
}

/// Lays out `[approve..] ++ [operation] ++ [revoke..]`, with approvals and
/// revokes in delegation order.
pub fn delegated_instructions(
    owner: &Pubkey,
    delegate: &Pubkey,
    delegations: &[Delegation],
    operation: Instruction,
) -> Result<Vec<Instruction>> {
    let mut instructions = Vec::with_capacity(delegations.len() * 2 + 1);
    for delegation in delegations {
        instructions.push(approve(
            &spl_token::id(),
            &delegation.source,
            delegate,
            owner,
            &[],
            delegation.amount,
        )?);
    }
    instructions.push(operation);
    for delegation in delegations {
        instructions.push(revoke(&spl_token::id(), &delegation.source, owner, &[])?);
    }
    Ok(instructions)
}

/// A fully assembled delegated transaction awaiting signatures.
pub struct DelegatedCall {
    authority: EphemeralAuthority,
    instructions: Vec<Instruction>,
}

impl DelegatedCall {
    /// Generates a fresh authority, builds the operation for it and wraps
    /// the operation in approvals and revokes for `owner`'s accounts.
    pub fn new<F>(owner: &Pubkey, delegations: &[Delegation], build_operation: F) -> Result<Self>
    where
        F: FnOnce(&Pubkey) -> Result<Instruction>,
    {
        let authority = EphemeralAuthority::generate();
        let delegate = authority.pubkey();
        let operation = build_operation(&delegate)?;
        let instructions = delegated_instructions(owner, &delegate, delegations, operation)?;
        log::debug!(
            "Delegated call: {} delegation(s) to ephemeral authority {}",
            delegations.len(),
            delegate
        );
        Ok(Self {
            authority,
            instructions,
        })
    }

    /// Puts caller instructions in front of the approvals.
    ///
    /// Prefix instructions may only require the payer's signature.
    pub fn with_prefix(mut self, mut prefix: Vec<Instruction>) -> Self {
        prefix.append(&mut self.instructions);
        self.instructions = prefix;
        self
    }

    pub fn authority(&self) -> Pubkey {
        self.authority.pubkey()
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    #[cfg(test)]
    pub(crate) fn authority_secret_bytes(&self) -> [u8; 64] {
        self.authority.secret_bytes()
    }

    /// Signs with the payer (who also owns the debited accounts) and the
    /// ephemeral authority. The authority is dropped here.
    pub fn sign(self, payer: &dyn Signer, recent_blockhash: Hash) -> Result<Transaction> {
        Ok(build_signed_transaction(
            &self.instructions,
            payer,
            &[&self.authority.keypair],
            recent_blockhash,
        )?)
    }
}

impl fmt::Debug for DelegatedCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DelegatedCall")
            .field("authority", &self.authority)
            .field("instructions", &self.instructions)
            .finish()
    }
}
