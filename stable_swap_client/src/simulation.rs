//! The simulation identity: a non-signing address with one associated token
//! account per pool asset plus one for the LP token. Dry runs use it as fee
//! payer and as owner of the user-side accounts so that quotes need nothing
//! from the caller. It never takes part in a committed pool operation.

use futures::future::try_join_all;
use solana_sdk::{pubkey::Pubkey, signer::Signer, system_instruction};
use spl_associated_token_account::{
    get_associated_token_address, instruction::create_associated_token_account_idempotent,
};

use crate::connection::{build_signed_transaction, LedgerConnection};
use crate::error::Result;
use crate::pda::get_associated_token_addresses;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationIdentity {
    pub address: Pubkey,
    /// Associated token accounts, aligned with the pool's asset mints.
    pub token_accounts: Vec<Pubkey>,
    /// Associated LP token account.
    pub lp_token_account: Pubkey,
}

impl SimulationIdentity {
    /// Derives the associated account addresses, assuming they already exist.
    pub fn derive(address: &Pubkey, token_mints: &[Pubkey], pool_mint: &Pubkey) -> Self {
        Self {
            address: *address,
            token_accounts: get_associated_token_addresses(address, token_mints),
            lp_token_account: get_associated_token_address(address, pool_mint),
        }
    }

    /// Provisions the identity on the ledger when a funder is given, otherwise
    /// only derives its addresses.
    ///
    /// With a funder: transfers `bootstrap_lamports` to the address, then
    /// creates any missing associated accounts concurrently.
    pub async fn setup<C: LedgerConnection + ?Sized>(
        connection: &C,
        address: &Pubkey,
        token_mints: &[Pubkey],
        pool_mint: &Pubkey,
        funder: Option<&dyn Signer>,
        bootstrap_lamports: u64,
    ) -> Result<Self> {
        let Some(funder) = funder else {
            return Ok(Self::derive(address, token_mints, pool_mint));
        };

        log::info!(
            "Simulation: funding {} with {} lamports",
            address,
            bootstrap_lamports
        );
        let blockhash = connection.get_latest_blockhash().await?;
        let transfer = system_instruction::transfer(&funder.pubkey(), address, bootstrap_lamports);
        let transaction = build_signed_transaction(&[transfer], funder, &[], blockhash)?;
        connection.send_and_confirm_transaction(&transaction).await?;

        let token_accounts = try_join_all(
            token_mints
                .iter()
                .map(|mint| get_or_create_associated_account(connection, funder, address, mint)),
        )
        .await?;
        let lp_token_account =
            get_or_create_associated_account(connection, funder, address, pool_mint).await?;

        Ok(Self {
            address: *address,
            token_accounts,
            lp_token_account,
        })
    }
}

/// Returns `owner`'s associated account for `mint`, creating it first if it
/// does not exist yet.
pub async fn get_or_create_associated_account<C: LedgerConnection + ?Sized>(
    connection: &C,
    payer: &dyn Signer,
    owner: &Pubkey,
    mint: &Pubkey,
) -> Result<Pubkey> {
    let address = get_associated_token_address(owner, mint);
    if connection.get_account(&address).await?.is_some() {
        return Ok(address);
    }

    log::debug!("Creating associated account {} for mint {}", address, mint);
    let blockhash = connection.get_latest_blockhash().await?;
    let create = create_associated_token_account_idempotent(
        &payer.pubkey(),
        owner,
        mint,
        &spl_token::id(),
    );
    let transaction = build_signed_transaction(&[create], payer, &[], blockhash)?;
    connection.send_and_confirm_transaction(&transaction).await?;
    Ok(address)
}
