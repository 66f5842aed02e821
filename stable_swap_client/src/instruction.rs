#![allow(clippy::doc_lazy_continuation)]
#![allow(clippy::too_many_arguments)]
use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
};

use crate::constants::MAX_N_COINS;
use crate::error::{ClientError, Result};
use crate::state::AdminSettings;

/// Defines the instructions accepted by the stable-swap pool program.
///
/// The borsh variant index is the one-byte instruction tag and must follow
/// the deployed program's interface; do not reorder variants.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub enum SwapInstruction {
    /// Initializes a new pool in a freshly allocated state account.
    ///
    /// Accounts:
    /// 0. [writable] pool state: Account allocated with `POOL_STATE_LEN` bytes
    /// 1. [read]   authority: Derived from the pool state address
    /// 2..2+N. [read] vaults: Token accounts holding each asset, owned by the authority
    /// 2+N. [read] pool mint: LP mint, mint authority = authority
    /// 3+N. [read] admin mint: Mint the admin fee is paid in
    Initialize {
        /// Bump seed of the authority
        nonce: u8,
        amplification_coefficient: u64,
        fee_numerator: u64,
        admin_fee_numerator: u64,
        admin_settings: AdminSettings,
    },

    /// Swaps one pool asset for another.
    ///
    /// Accounts:
    /// 0. [read]   pool state
    /// 1. [read]   authority
    /// 2. [signer] user transfer authority: Delegate over the source account
    /// 3..3+N. [writable] vaults
    /// 3+N. [writable] user source token account
    /// 4+N. [writable] user destination token account
    Exchange {
        in_amount: u64,
        /// Slippage protection on the output amount
        minimum_out_amount: u64,
    },

    /// Deposits every pool asset and mints LP tokens.
    ///
    /// Accounts:
    /// 0. [read]   pool state
    /// 1. [read]   authority
    /// 2. [signer] user transfer authority
    /// 3..3+N. [writable] vaults
    /// 3+N. [writable] pool mint
    /// 4+N..4+2N. [writable] user source token accounts, vault order
    /// 4+2N. [writable] user LP destination
    AddLiquidity {
        /// One amount per asset, vault order
        deposit_amounts: Vec<u64>,
        min_mint_amount: u64,
    },

    /// Burns LP tokens and withdraws every asset proportionally.
    ///
    /// Accounts:
    /// 0. [read]   pool state
    /// 1. [read]   authority
    /// 2. [signer] user transfer authority: Delegate over the LP account
    /// 3..3+N. [writable] vaults
    /// 3+N. [writable] pool mint
    /// 4+N..4+2N. [writable] user destination token accounts, vault order
    /// 4+2N. [writable] user LP source
    RemoveLiquidity {
        unmint_amount: u64,
        /// One amount per asset, vault order
        minimum_amounts: Vec<u64>,
    },

    /// Burns LP tokens and withdraws a single asset.
    ///
    /// Accounts:
    /// 0. [read]   pool state
    /// 1. [read]   authority
    /// 2. [signer] user transfer authority: Delegate over the LP account
    /// 3..3+N. [writable] vaults
    /// 3+N. [writable] pool mint
    /// 4+N. [writable] user destination token account
    /// 5+N. [writable] user LP source
    RemoveLiquidityOneToken {
        unmint_amount: u64,
        minimum_out_amount: u64,
    },

    /// Logs the pool's virtual price. Changes nothing.
    ///
    /// Accounts:
    /// 0. [read] pool state
    /// 1. [read] authority
    /// 2. [read] caller
    /// 3..3+N. [read] vaults
    /// 3+N. [read] pool mint
    GetVirtualPrice,
}

impl SwapInstruction {
    pub fn pack(&self) -> Result<Vec<u8>> {
        Ok(self.try_to_vec()?)
    }

    pub fn unpack(data: &[u8]) -> Result<Self> {
        Ok(Self::try_from_slice(data)?)
    }
}

fn check_token_count(token_accounts: &[Pubkey]) -> Result<()> {
    if token_accounts.is_empty() || token_accounts.len() > MAX_N_COINS {
        return Err(ClientError::InvalidTokenCount(token_accounts.len()));
    }
    Ok(())
}

fn check_arity(field: &'static str, expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(ClientError::ArityMismatch {
            field,
            expected,
            actual,
        });
    }
    Ok(())
}

// Common prefix of every pool operation: state, authority, caller.
fn pool_prefix(
    pool_account: &Pubkey,
    authority: &Pubkey,
    user_transfer_authority: &Pubkey,
    caller_signs: bool,
) -> Vec<AccountMeta> {
    vec![
        AccountMeta::new_readonly(*pool_account, false),
        AccountMeta::new_readonly(*authority, false),
        AccountMeta::new_readonly(*user_transfer_authority, caller_signs),
    ]
}

fn writable(keys: &[Pubkey]) -> impl Iterator<Item = AccountMeta> + '_ {
    keys.iter().map(|key| AccountMeta::new(*key, false))
}

pub fn initialize(
    program_id: &Pubkey,
    pool_account: &Pubkey,
    authority: &Pubkey,
    token_accounts: &[Pubkey],
    pool_mint: &Pubkey,
    admin_token_mint: &Pubkey,
    nonce: u8,
    amplification_coefficient: u64,
    fee_numerator: u64,
    admin_fee_numerator: u64,
    admin_settings: AdminSettings,
) -> Result<Instruction> {
    check_token_count(token_accounts)?;

    let mut accounts = Vec::with_capacity(token_accounts.len() + 4);
    accounts.push(AccountMeta::new(*pool_account, false));
    accounts.push(AccountMeta::new_readonly(*authority, false));
    accounts.extend(
        token_accounts
            .iter()
            .map(|key| AccountMeta::new_readonly(*key, false)),
    );
    accounts.push(AccountMeta::new_readonly(*pool_mint, false));
    accounts.push(AccountMeta::new_readonly(*admin_token_mint, false));

    let data = SwapInstruction::Initialize {
        nonce,
        amplification_coefficient,
        fee_numerator,
        admin_fee_numerator,
        admin_settings,
    }
    .pack()?;

    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data,
    })
}

pub fn exchange(
    program_id: &Pubkey,
    pool_account: &Pubkey,
    authority: &Pubkey,
    user_transfer_authority: &Pubkey,
    token_accounts: &[Pubkey],
    source: &Pubkey,
    destination: &Pubkey,
    in_amount: u64,
    minimum_out_amount: u64,
) -> Result<Instruction> {
    check_token_count(token_accounts)?;

    let mut accounts = pool_prefix(pool_account, authority, user_transfer_authority, true);
    accounts.extend(writable(token_accounts));
    accounts.push(AccountMeta::new(*source, false));
    accounts.push(AccountMeta::new(*destination, false));

    let data = SwapInstruction::Exchange {
        in_amount,
        minimum_out_amount,
    }
    .pack()?;

    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data,
    })
}

pub fn add_liquidity(
    program_id: &Pubkey,
    pool_account: &Pubkey,
    authority: &Pubkey,
    user_transfer_authority: &Pubkey,
    token_accounts: &[Pubkey],
    pool_mint: &Pubkey,
    sources: &[Pubkey],
    destination_lp: &Pubkey,
    deposit_amounts: &[u64],
    min_mint_amount: u64,
) -> Result<Instruction> {
    check_token_count(token_accounts)?;
    check_arity("source accounts", token_accounts.len(), sources.len())?;
    check_arity("deposit amounts", token_accounts.len(), deposit_amounts.len())?;

    let mut accounts = pool_prefix(pool_account, authority, user_transfer_authority, true);
    accounts.extend(writable(token_accounts));
    accounts.push(AccountMeta::new(*pool_mint, false));
    accounts.extend(writable(sources));
    accounts.push(AccountMeta::new(*destination_lp, false));

    let data = SwapInstruction::AddLiquidity {
        deposit_amounts: deposit_amounts.to_vec(),
        min_mint_amount,
    }
    .pack()?;

    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data,
    })
}

pub fn remove_liquidity(
    program_id: &Pubkey,
    pool_account: &Pubkey,
    authority: &Pubkey,
    user_transfer_authority: &Pubkey,
    token_accounts: &[Pubkey],
    pool_mint: &Pubkey,
    destinations: &[Pubkey],
    source_lp: &Pubkey,
    unmint_amount: u64,
    minimum_amounts: &[u64],
) -> Result<Instruction> {
    check_token_count(token_accounts)?;
    check_arity("destination accounts", token_accounts.len(), destinations.len())?;
    check_arity("minimum amounts", token_accounts.len(), minimum_amounts.len())?;

    let mut accounts = pool_prefix(pool_account, authority, user_transfer_authority, true);
    accounts.extend(writable(token_accounts));
    accounts.push(AccountMeta::new(*pool_mint, false));
    accounts.extend(writable(destinations));
    accounts.push(AccountMeta::new(*source_lp, false));

    let data = SwapInstruction::RemoveLiquidity {
        unmint_amount,
        minimum_amounts: minimum_amounts.to_vec(),
    }
    .pack()?;

    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data,
    })
}

pub fn remove_liquidity_one_token(
    program_id: &Pubkey,
    pool_account: &Pubkey,
    authority: &Pubkey,
    user_transfer_authority: &Pubkey,
    token_accounts: &[Pubkey],
    pool_mint: &Pubkey,
    destination: &Pubkey,
    source_lp: &Pubkey,
    unmint_amount: u64,
    minimum_out_amount: u64,
) -> Result<Instruction> {
    check_token_count(token_accounts)?;

    let mut accounts = pool_prefix(pool_account, authority, user_transfer_authority, true);
    accounts.extend(writable(token_accounts));
    accounts.push(AccountMeta::new(*pool_mint, false));
    accounts.push(AccountMeta::new(*destination, false));
    accounts.push(AccountMeta::new(*source_lp, false));

    let data = SwapInstruction::RemoveLiquidityOneToken {
        unmint_amount,
        minimum_out_amount,
    }
    .pack()?;

    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data,
    })
}

pub fn get_virtual_price(
    program_id: &Pubkey,
    pool_account: &Pubkey,
    authority: &Pubkey,
    caller: &Pubkey,
    token_accounts: &[Pubkey],
    pool_mint: &Pubkey,
) -> Result<Instruction> {
    check_token_count(token_accounts)?;

    let mut accounts = pool_prefix(pool_account, authority, caller, false);
    accounts.extend(
        token_accounts
            .iter()
            .map(|key| AccountMeta::new_readonly(*key, false)),
    );
    accounts.push(AccountMeta::new_readonly(*pool_mint, false));

    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data: SwapInstruction::GetVirtualPrice.pack()?,
    })
}
