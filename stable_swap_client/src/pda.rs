use futures::future::try_join_all;
use solana_program::{program_pack::Pack, pubkey::Pubkey};
use spl_associated_token_account::get_associated_token_address;
use spl_token::{
    state::{Account as TokenAccount, AccountState},
    ID as TOKEN_PROGRAM_ID,
};

use crate::connection::LedgerConnection;
use crate::error::{ClientError, Result};

/// Derives the pool's program authority and its bump seed.
///
/// The authority signs for the vaults and the LP mint; it is seeded by the
/// pool state address alone.
pub fn find_authority_address(program_id: &Pubkey, pool_account: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[pool_account.as_ref()], program_id)
}

/// Associated token accounts of `owner`, one per mint, in mint order.
pub fn get_associated_token_addresses(owner: &Pubkey, mints: &[Pubkey]) -> Vec<Pubkey> {
    mints
        .iter()
        .map(|mint| get_associated_token_address(owner, mint))
        .collect()
}

/// Reads the mint out of raw token account data.
/// Checks: Token Program owner, unpackable, initialized.
pub fn token_account_mint(address: &Pubkey, owner: &Pubkey, data: &[u8]) -> Result<Pubkey> {
    if owner != &TOKEN_PROGRAM_ID {
        log::warn!(
            "Token account {} owned by {}, expected {}",
            address,
            owner,
            TOKEN_PROGRAM_ID
        );
        return Err(ClientError::UnresolvedMint(*address));
    }

    let token_account =
        TokenAccount::unpack(data).map_err(|_| ClientError::UnresolvedMint(*address))?;

    if token_account.state != AccountState::Initialized {
        log::warn!("Token account {} is not initialized", address);
        return Err(ClientError::UnresolvedMint(*address));
    }

    Ok(token_account.mint)
}

/// Fetches a token account and returns the mint it holds.
pub async fn resolve_token_account_mint<C: LedgerConnection + ?Sized>(
    connection: &C,
    address: &Pubkey,
) -> Result<Pubkey> {
    let account = connection
        .get_account(address)
        .await?
        .ok_or(ClientError::UnresolvedMint(*address))?;
    token_account_mint(address, &account.owner, &account.data)
}

/// Resolves the mints of several token accounts concurrently, preserving order.
pub async fn resolve_token_account_mints<C: LedgerConnection + ?Sized>(
    connection: &C,
    addresses: &[Pubkey],
) -> Result<Vec<Pubkey>> {
    try_join_all(
        addresses
            .iter()
            .map(|address| resolve_token_account_mint(connection, address)),
    )
    .await
}
