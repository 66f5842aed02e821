//! Client facade for one deployed stable-swap pool.
//!
//! A [`StableSwapPool`] is a snapshot of the pool state taken at `load` time
//! plus the addresses derived from it. Mutating operations are submitted as
//! delegated transactions and report the program's own result line from the
//! committed logs. Quotes run the same instructions as dry runs under the
//! simulation identity.

#![allow(clippy::too_many_arguments)]

use std::sync::Arc;

use solana_sdk::{
    instruction::Instruction,
    pubkey::Pubkey,
    signature::{Keypair, Signature},
    signer::Signer,
    system_instruction,
};

use crate::{
    config::ClientConfig,
    connection::{build_signed_transaction, build_simulation_transaction, LedgerConnection},
    constants::{MAX_N_COINS, POOL_STATE_LEN},
    delegate::{DelegatedCall, Delegation},
    error::{ClientError, Result},
    instruction,
    pda::{find_authority_address, resolve_token_account_mints},
    quote::{
        find_log_and_parse, DyQuote, MintAmountQuote, QuoteKind, QuoteShape, VirtualPriceQuote,
        WithdrawalAmountQuote, WithdrawalAmountsQuote,
    },
    simulation::SimulationIdentity,
    state::{AdminSettings, PoolState},
};

/// Outcome of a committed pool operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxResult<Q> {
    pub signature: Signature,
    /// Result line the program logged while executing the operation.
    pub quote: Q,
}

/// Arguments for [`StableSwapPool::create`].
pub struct CreatePoolParams<'a> {
    /// New keypair for the pool state account; signs its own creation.
    pub pool_account: &'a Keypair,
    /// Vault accounts, already owned by the derived authority.
    pub token_accounts: Vec<Pubkey>,
    pub pool_mint: Pubkey,
    pub admin_token_mint: Pubkey,
    pub amplification_coefficient: u64,
    pub fee_numerator: u64,
    pub admin_fee_numerator: u64,
    pub add_liquidity_enabled: bool,
    /// Funds and provisions the simulation identity when given.
    pub simulation_funder: Option<&'a dyn Signer>,
}

pub struct StableSwapPool<C: LedgerConnection> {
    connection: Arc<C>,
    config: ClientConfig,
    pool_account: Pubkey,
    authority: Pubkey,
    version: u8,
    nonce: u8,
    amplification_coefficient: u64,
    fee_numerator: u64,
    admin_fee_numerator: u64,
    precision_factor: u64,
    precision_multipliers: Vec<u64>,
    token_accounts: Vec<Pubkey>,
    token_mints: Vec<Pubkey>,
    pool_mint: Pubkey,
    admin_token_mint: Pubkey,
    admin_settings: AdminSettings,
    simulation: SimulationIdentity,
}

impl<C: LedgerConnection> StableSwapPool<C> {
    /// Creates and initializes a pool state account, then loads it.
    pub async fn create(
        connection: Arc<C>,
        config: ClientConfig,
        payer: &dyn Signer,
        params: CreatePoolParams<'_>,
    ) -> Result<Self> {
        let pool_address = params.pool_account.pubkey();
        let n_coins = params.token_accounts.len();
        if n_coins == 0 || n_coins > MAX_N_COINS {
            return Err(ClientError::InvalidTokenCount(n_coins));
        }
        log::info!("Create: pool {} with {} tokens", pool_address, n_coins);

        let token_mints =
            resolve_token_account_mints(connection.as_ref(), &params.token_accounts).await?;
        SimulationIdentity::setup(
            connection.as_ref(),
            &config.simulation_user,
            &token_mints,
            &params.pool_mint,
            params.simulation_funder,
            config.simulation_bootstrap_lamports,
        )
        .await?;

        let (authority, nonce) = find_authority_address(&config.program_id, &pool_address);
        log::debug!("Create: authority {} nonce {}", authority, nonce);

        let lamports = Self::min_balance_for_rent_exempt_pool_state(connection.as_ref()).await?;
        let instructions = [
            system_instruction::create_account(
                &payer.pubkey(),
                &pool_address,
                lamports,
                POOL_STATE_LEN as u64,
                &config.program_id,
            ),
            instruction::initialize(
                &config.program_id,
                &pool_address,
                &authority,
                &params.token_accounts,
                &params.pool_mint,
                &params.admin_token_mint,
                nonce,
                params.amplification_coefficient,
                params.fee_numerator,
                params.admin_fee_numerator,
                AdminSettings {
                    swap_enabled: true,
                    add_liquidity_enabled: params.add_liquidity_enabled,
                },
            )?,
        ];

        let blockhash = connection.get_latest_blockhash().await?;
        let transaction =
            build_signed_transaction(&instructions, payer, &[params.pool_account], blockhash)?;
        let signature = connection.send_and_confirm_transaction(&transaction).await?;
        log::info!("Create: initialized pool {} in {}", pool_address, signature);

        tokio::time::sleep(config.settle_delay()).await;
        Self::load(connection, config, &pool_address).await
    }

    /// Reads the pool state account and builds a snapshot from it.
    pub async fn load(connection: Arc<C>, config: ClientConfig, address: &Pubkey) -> Result<Self> {
        let account = connection
            .get_account(address)
            .await?
            .ok_or(ClientError::PoolAccountNotFound(*address))?;
        if account.owner != config.program_id {
            return Err(ClientError::InvalidPoolOwner {
                expected: config.program_id,
                actual: account.owner,
            });
        }

        let state = PoolState::decode(&account.data)?;
        if !state.is_initialized {
            return Err(ClientError::UninitializedPool(*address));
        }

        let token_accounts = state.token_accounts().to_vec();
        let token_mints = resolve_token_account_mints(connection.as_ref(), &token_accounts).await?;

        let (authority, bump) = find_authority_address(&config.program_id, address);
        if bump != state.nonce {
            log::warn!(
                "Load: pool {} stores nonce {}, derived {}",
                address,
                state.nonce,
                bump
            );
        }

        let simulation =
            SimulationIdentity::derive(&config.simulation_user, &token_mints, &state.pool_mint);
        log::debug!(
            "Load: pool {} with {} tokens, authority {}",
            address,
            token_accounts.len(),
            authority
        );

        Ok(Self {
            connection,
            config,
            pool_account: *address,
            authority,
            version: state.version,
            nonce: state.nonce,
            amplification_coefficient: state.amplification_coefficient,
            fee_numerator: state.fee_numerator,
            admin_fee_numerator: state.admin_fee_numerator,
            precision_factor: state.precision_factor,
            precision_multipliers: state.precision_multipliers().to_vec(),
            token_accounts,
            token_mints,
            pool_mint: state.pool_mint,
            admin_token_mint: state.admin_token_mint,
            admin_settings: state.admin_settings,
            simulation,
        })
    }

    /// Takes a fresh snapshot of the same pool.
    pub async fn reload(&self) -> Result<Self> {
        Self::load(
            Arc::clone(&self.connection),
            self.config.clone(),
            &self.pool_account,
        )
        .await
    }

    pub async fn min_balance_for_rent_exempt_pool_state(connection: &C) -> Result<u64> {
        Ok(connection
            .get_minimum_balance_for_rent_exemption(POOL_STATE_LEN)
            .await?)
    }

    /// Deposits into every asset and mints LP tokens to `destination_lp`.
    ///
    /// Each source account is approved for its own deposit amount.
    pub async fn add_liquidity(
        &self,
        user: &dyn Signer,
        sources: &[Pubkey],
        destination_lp: &Pubkey,
        deposit_amounts: &[u64],
        min_mint_amount: u64,
        prefix: Vec<Instruction>,
    ) -> Result<TxResult<MintAmountQuote>> {
        log::info!(
            "AddLiquidity: pool {} amounts {:?}",
            self.pool_account,
            deposit_amounts
        );
        let delegations: Vec<Delegation> = sources
            .iter()
            .zip(deposit_amounts)
            .map(|(source, amount)| Delegation::new(*source, *amount))
            .collect();
        let call = DelegatedCall::new(&user.pubkey(), &delegations, |delegate| {
            instruction::add_liquidity(
                &self.config.program_id,
                &self.pool_account,
                &self.authority,
                delegate,
                &self.token_accounts,
                &self.pool_mint,
                sources,
                destination_lp,
                deposit_amounts,
                min_mint_amount,
            )
        })?
        .with_prefix(prefix);
        self.submit(call, user).await
    }

    /// Burns `unmint_amount` LP tokens for a proportional share of every asset.
    pub async fn remove_liquidity(
        &self,
        user: &dyn Signer,
        destinations: &[Pubkey],
        source_lp: &Pubkey,
        unmint_amount: u64,
        minimum_amounts: &[u64],
        prefix: Vec<Instruction>,
    ) -> Result<TxResult<WithdrawalAmountsQuote>> {
        log::info!(
            "RemoveLiquidity: pool {} unmint {}",
            self.pool_account,
            unmint_amount
        );
        let delegations = [Delegation::new(*source_lp, unmint_amount)];
        let call = DelegatedCall::new(&user.pubkey(), &delegations, |delegate| {
            instruction::remove_liquidity(
                &self.config.program_id,
                &self.pool_account,
                &self.authority,
                delegate,
                &self.token_accounts,
                &self.pool_mint,
                destinations,
                source_lp,
                unmint_amount,
                minimum_amounts,
            )
        })?
        .with_prefix(prefix);
        let result: TxResult<WithdrawalAmountsQuote> = self.submit(call, user).await?;
        self.check_withdrawal_amounts(&result.quote)?;
        Ok(result)
    }

    /// Burns LP tokens for a single asset, paid into `destination`.
    pub async fn remove_liquidity_one_token(
        &self,
        user: &dyn Signer,
        destination: &Pubkey,
        source_lp: &Pubkey,
        unmint_amount: u64,
        minimum_out_amount: u64,
        prefix: Vec<Instruction>,
    ) -> Result<TxResult<WithdrawalAmountQuote>> {
        log::info!(
            "RemoveLiquidityOneToken: pool {} unmint {} into {}",
            self.pool_account,
            unmint_amount,
            destination
        );
        let delegations = [Delegation::new(*source_lp, unmint_amount)];
        let call = DelegatedCall::new(&user.pubkey(), &delegations, |delegate| {
            instruction::remove_liquidity_one_token(
                &self.config.program_id,
                &self.pool_account,
                &self.authority,
                delegate,
                &self.token_accounts,
                &self.pool_mint,
                destination,
                source_lp,
                unmint_amount,
                minimum_out_amount,
            )
        })?
        .with_prefix(prefix);
        self.submit(call, user).await
    }

    /// Swaps `in_amount` from `source` into `destination`.
    pub async fn exchange(
        &self,
        user: &dyn Signer,
        source: &Pubkey,
        destination: &Pubkey,
        in_amount: u64,
        minimum_out_amount: u64,
        prefix: Vec<Instruction>,
    ) -> Result<TxResult<DyQuote>> {
        log::info!(
            "Exchange: pool {} in {} from {} to {}",
            self.pool_account,
            in_amount,
            source,
            destination
        );
        let delegations = [Delegation::new(*source, in_amount)];
        let call = DelegatedCall::new(&user.pubkey(), &delegations, |delegate| {
            instruction::exchange(
                &self.config.program_id,
                &self.pool_account,
                &self.authority,
                delegate,
                &self.token_accounts,
                source,
                destination,
                in_amount,
                minimum_out_amount,
            )
        })?
        .with_prefix(prefix);
        self.submit(call, user).await
    }

    /// Output of swapping `in_amount` of `source_mint` into `destination_mint`.
    pub async fn get_out_amount(
        &self,
        source_mint: &Pubkey,
        destination_mint: &Pubkey,
        in_amount: u64,
    ) -> Result<DyQuote> {
        let i = self.token_index(source_mint)?;
        let j = self.token_index(destination_mint)?;
        let instruction = instruction::exchange(
            &self.config.program_id,
            &self.pool_account,
            &self.authority,
            &self.simulation.address,
            &self.token_accounts,
            &self.simulation.token_accounts[i],
            &self.simulation.token_accounts[j],
            in_amount,
            0,
        )?;
        self.simulate(instruction).await
    }

    /// LP tokens minted for `deposit_amounts`, one per asset.
    pub async fn get_mint_amount(&self, deposit_amounts: &[u64]) -> Result<MintAmountQuote> {
        let instruction = instruction::add_liquidity(
            &self.config.program_id,
            &self.pool_account,
            &self.authority,
            &self.simulation.address,
            &self.token_accounts,
            &self.pool_mint,
            &self.simulation.token_accounts,
            &self.simulation.lp_token_account,
            deposit_amounts,
            0,
        )?;
        self.simulate(instruction).await
    }

    /// Per-asset payout for burning `unmint_amount` LP tokens.
    pub async fn get_withdrawal_amounts(
        &self,
        unmint_amount: u64,
    ) -> Result<WithdrawalAmountsQuote> {
        let minimum_amounts = vec![0; self.token_accounts.len()];
        let instruction = instruction::remove_liquidity(
            &self.config.program_id,
            &self.pool_account,
            &self.authority,
            &self.simulation.address,
            &self.token_accounts,
            &self.pool_mint,
            &self.simulation.token_accounts,
            &self.simulation.lp_token_account,
            unmint_amount,
            &minimum_amounts,
        )?;
        let quote: WithdrawalAmountsQuote = self.simulate(instruction).await?;
        self.check_withdrawal_amounts(&quote)?;
        Ok(quote)
    }

    /// Payout in `destination_mint` for burning `unmint_amount` LP tokens.
    pub async fn get_withdrawal_amount(
        &self,
        destination_mint: &Pubkey,
        unmint_amount: u64,
    ) -> Result<WithdrawalAmountQuote> {
        let i = self.token_index(destination_mint)?;
        let instruction = instruction::remove_liquidity_one_token(
            &self.config.program_id,
            &self.pool_account,
            &self.authority,
            &self.simulation.address,
            &self.token_accounts,
            &self.pool_mint,
            &self.simulation.token_accounts[i],
            &self.simulation.lp_token_account,
            unmint_amount,
            0,
        )?;
        self.simulate(instruction).await
    }

    pub async fn get_virtual_price(&self) -> Result<VirtualPriceQuote> {
        let instruction = instruction::get_virtual_price(
            &self.config.program_id,
            &self.pool_account,
            &self.authority,
            &self.simulation.address,
            &self.token_accounts,
            &self.pool_mint,
        )?;
        self.simulate(instruction).await
    }

    async fn submit<Q: QuoteShape>(
        &self,
        call: DelegatedCall,
        payer: &dyn Signer,
    ) -> Result<TxResult<Q>> {
        let blockhash = self.connection.get_latest_blockhash().await?;
        let transaction = call.sign(payer, blockhash)?;
        let signature = self
            .connection
            .send_and_confirm_transaction(&transaction)
            .await?;
        log::info!("{}: confirmed {}", Q::KIND, signature);

        let logs = self
            .connection
            .get_transaction_logs(&signature)
            .await?
            .unwrap_or_default();
        let quote = find_log_and_parse(&logs)?;
        Ok(TxResult { signature, quote })
    }

    async fn simulate<Q: QuoteShape>(&self, instruction: Instruction) -> Result<Q> {
        let blockhash = self.connection.get_latest_blockhash().await?;
        let transaction =
            build_simulation_transaction(&[instruction], &self.simulation.address, blockhash);
        let outcome = self.connection.simulate_transaction(&transaction).await?;
        if let Some(err) = &outcome.err {
            log::debug!("{}: simulation reported {}", Q::KIND, err);
        }
        find_log_and_parse(&outcome.logs)
    }

    fn check_withdrawal_amounts(&self, quote: &WithdrawalAmountsQuote) -> Result<()> {
        if quote.amounts.len() != self.token_accounts.len() {
            return Err(ClientError::MalformedQuote {
                operation: QuoteKind::GetWithdrawalAmounts,
                reason: format!(
                    "expected {} amounts, got {}",
                    self.token_accounts.len(),
                    quote.amounts.len()
                ),
            });
        }
        Ok(())
    }

    /// Position of `mint` among the pool's assets.
    pub fn token_index(&self, mint: &Pubkey) -> Result<usize> {
        self.token_mints
            .iter()
            .position(|m| m == mint)
            .ok_or(ClientError::UnknownMint(*mint))
    }

    pub fn connection(&self) -> &Arc<C> {
        &self.connection
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn pool_account(&self) -> &Pubkey {
        &self.pool_account
    }

    pub fn authority(&self) -> &Pubkey {
        &self.authority
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn nonce(&self) -> u8 {
        self.nonce
    }

    pub fn amplification_coefficient(&self) -> u64 {
        self.amplification_coefficient
    }

    pub fn fee_numerator(&self) -> u64 {
        self.fee_numerator
    }

    pub fn admin_fee_numerator(&self) -> u64 {
        self.admin_fee_numerator
    }

    pub fn precision_factor(&self) -> u64 {
        self.precision_factor
    }

    pub fn precision_multipliers(&self) -> &[u64] {
        &self.precision_multipliers
    }

    pub fn token_accounts(&self) -> &[Pubkey] {
        &self.token_accounts
    }

    pub fn token_mints(&self) -> &[Pubkey] {
        &self.token_mints
    }

    pub fn pool_mint(&self) -> &Pubkey {
        &self.pool_mint
    }

    pub fn admin_token_mint(&self) -> &Pubkey {
        &self.admin_token_mint
    }

    pub fn admin_settings(&self) -> AdminSettings {
        self.admin_settings
    }

    pub fn simulation(&self) -> &SimulationIdentity {
        &self.simulation
    }
}
