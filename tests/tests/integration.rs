use {
    async_trait::async_trait,
    solana_sdk::{
        account::Account,
        hash::Hash,
        instruction::Instruction,
        pubkey::Pubkey,
        signature::{Keypair, Signature},
        signer::Signer,
        system_instruction, system_program,
        transaction::Transaction,
    },
    spl_associated_token_account::get_associated_token_address,
    spl_token::{
        instruction::TokenInstruction,
        solana_program::{program_option::COption, program_pack::Pack},
        state::{Account as TokenAccount, AccountState},
    },
    stable_swap_client::{
        error::TransportError,
        instruction::SwapInstruction,
        pda::find_authority_address,
        quote::QuoteKind,
        state::{AdminSettings, FixedSlots, PoolState},
        ClientConfig, ClientError, CreatePoolParams, LedgerConnection, SimulationOutcome,
        StableSwapPool, POOL_STATE_LEN,
    },
    std::{
        collections::HashMap,
        error::Error,
        sync::{Arc, Mutex},
    },
};

// In-memory ledger: a map of accounts plus scripted program logs.
#[derive(Default)]
struct MockLedger {
    accounts: Mutex<HashMap<Pubkey, Account>>,
    // Accounts that appear once the next transaction is confirmed.
    pending_accounts: Mutex<Vec<(Pubkey, Account)>>,
    // Logs attached to every confirmed transaction.
    committed_logs: Mutex<Vec<String>>,
    simulation_logs: Mutex<Vec<String>>,
    logs_by_signature: Mutex<HashMap<Signature, Vec<String>>>,
    sent: Mutex<Vec<Transaction>>,
    simulated: Mutex<Vec<Transaction>>,
}

impl MockLedger {
    fn set_account(&self, address: Pubkey, account: Account) {
        self.accounts.lock().unwrap().insert(address, account);
    }

    fn set_committed_logs(&self, lines: &[&str]) {
        *self.committed_logs.lock().unwrap() = lines.iter().map(|l| l.to_string()).collect();
    }

    fn set_simulation_logs(&self, lines: &[&str]) {
        *self.simulation_logs.lock().unwrap() = lines.iter().map(|l| l.to_string()).collect();
    }

    fn sent(&self) -> Vec<Transaction> {
        self.sent.lock().unwrap().clone()
    }

    fn simulated(&self) -> Vec<Transaction> {
        self.simulated.lock().unwrap().clone()
    }
}

fn rent_for(data_len: usize) -> u64 {
    (data_len as u64 + 128) * 6_960
}

#[async_trait]
impl LedgerConnection for MockLedger {
    async fn get_account(
        &self,
        address: &Pubkey,
    ) -> Result<Option<Account>, TransportError> {
        Ok(self.accounts.lock().unwrap().get(address).cloned())
    }

    async fn get_minimum_balance_for_rent_exemption(
        &self,
        data_len: usize,
    ) -> Result<u64, TransportError> {
        Ok(rent_for(data_len))
    }

    async fn get_latest_blockhash(&self) -> Result<Hash, TransportError> {
        Ok(Hash::new_unique())
    }

    async fn send_and_confirm_transaction(
        &self,
        transaction: &Transaction,
    ) -> Result<Signature, TransportError> {
        transaction.verify().map_err(|e| {
            TransportError::new(format!("verify failed: {}", e))
        })?;
        let signature = transaction.signatures[0];
        let logs = self.committed_logs.lock().unwrap().clone();
        self.logs_by_signature.lock().unwrap().insert(signature, logs);
        for (address, account) in self.pending_accounts.lock().unwrap().drain(..) {
            self.set_account(address, account);
        }
        self.sent.lock().unwrap().push(transaction.clone());
        Ok(signature)
    }

    async fn simulate_transaction(
        &self,
        transaction: &Transaction,
    ) -> Result<SimulationOutcome, TransportError> {
        self.simulated.lock().unwrap().push(transaction.clone());
        Ok(SimulationOutcome {
            logs: self.simulation_logs.lock().unwrap().clone(),
            err: None,
        })
    }

    async fn get_transaction_logs(
        &self,
        signature: &Signature,
    ) -> Result<Option<Vec<String>>, TransportError> {
        Ok(self.logs_by_signature.lock().unwrap().get(signature).cloned())
    }
}

// Define a struct to hold the common setup elements
struct TestSetup {
    ledger: Arc<MockLedger>,
    config: ClientConfig,
    pool_account: Pubkey,
    authority: Pubkey,
    mints: Vec<Pubkey>,
    vaults: Vec<Pubkey>,
    pool_mint: Pubkey,
    user: Keypair,
    user_token_accounts: Vec<Pubkey>,
    user_lp: Pubkey,
}

// A flattened view of one compiled instruction.
#[derive(Debug)]
struct Decoded {
    program_id: Pubkey,
    accounts: Vec<Pubkey>,
    data: Vec<u8>,
}

fn decompile(transaction: &Transaction) -> Vec<Decoded> {
    let keys = &transaction.message.account_keys;
    transaction
        .message
        .instructions
        .iter()
        .map(|ix| Decoded {
            program_id: keys[ix.program_id_index as usize],
            accounts: ix.accounts.iter().map(|i| keys[*i as usize]).collect(),
            data: ix.data.clone(),
        })
        .collect()
}

fn token_account(mint: &Pubkey, owner: &Pubkey, amount: u64) -> Account {
    let state = TokenAccount {
        mint: *mint,
        owner: *owner,
        amount,
        delegate: COption::None,
        state: AccountState::Initialized,
        is_native: COption::None,
        delegated_amount: 0,
        close_authority: COption::None,
    };
    let mut data = vec![0u8; TokenAccount::LEN];
    TokenAccount::pack(state, &mut data).unwrap();
    Account {
        lamports: rent_for(TokenAccount::LEN),
        data,
        owner: spl_token::id(),
        executable: false,
        rent_epoch: 0,
    }
}

fn pool_state(setup_vaults: &[Pubkey], pool_mint: &Pubkey, nonce: u8) -> PoolState {
    PoolState {
        version: 1,
        is_initialized: true,
        nonce,
        amplification_coefficient: 100,
        fee_numerator: 4_000_000,
        admin_fee_numerator: 0,
        precision_factor: 1_000_000,
        precision_multipliers: FixedSlots::from_active(&vec![1_000; setup_vaults.len()]).unwrap(),
        token_accounts: FixedSlots::from_active(setup_vaults).unwrap(),
        pool_mint: *pool_mint,
        admin_token_mint: Pubkey::new_unique(),
        admin_settings: AdminSettings {
            swap_enabled: true,
            add_liquidity_enabled: true,
        },
    }
}

fn program_account(program_id: &Pubkey, state: &PoolState) -> Account {
    Account {
        lamports: rent_for(POOL_STATE_LEN),
        data: state.encode().unwrap(),
        owner: *program_id,
        executable: false,
        rent_epoch: 0,
    }
}

// The main setup function: a pool with `n_coins` vaults and a funded user.
fn setup_test_environment(n_coins: usize) -> TestSetup {
    let _ = env_logger::builder().is_test(true).try_init();

    let ledger = Arc::new(MockLedger::default());
    let config = ClientConfig::new(Pubkey::new_unique()).with_settle_delay_ms(0);
    let pool_account = Pubkey::new_unique();
    let (authority, nonce) = find_authority_address(&config.program_id, &pool_account);

    let mints: Vec<Pubkey> = (0..n_coins).map(|_| Pubkey::new_unique()).collect();
    let vaults: Vec<Pubkey> = (0..n_coins).map(|_| Pubkey::new_unique()).collect();
    for (vault, mint) in vaults.iter().zip(&mints) {
        ledger.set_account(*vault, token_account(mint, &authority, 1_000_000));
    }
    let pool_mint = Pubkey::new_unique();

    let state = pool_state(&vaults, &pool_mint, nonce);
    ledger.set_account(pool_account, program_account(&config.program_id, &state));

    let user = Keypair::new();
    let user_token_accounts: Vec<Pubkey> = mints
        .iter()
        .map(|mint| get_associated_token_address(&user.pubkey(), mint))
        .collect();
    let user_lp = get_associated_token_address(&user.pubkey(), &pool_mint);

    TestSetup {
        ledger,
        config,
        pool_account,
        authority,
        mints,
        vaults,
        pool_mint,
        user,
        user_token_accounts,
        user_lp,
    }
}

async fn load_pool(setup: &TestSetup) -> Result<StableSwapPool<MockLedger>, ClientError> {
    StableSwapPool::load(
        Arc::clone(&setup.ledger),
        setup.config.clone(),
        &setup.pool_account,
    )
    .await
}

fn approved_amount(decoded: &Decoded) -> Option<u64> {
    match TokenInstruction::unpack(&decoded.data).ok()? {
        TokenInstruction::Approve { amount } => Some(amount),
        _ => None,
    }
}

fn is_revoke(decoded: &Decoded) -> bool {
    matches!(
        TokenInstruction::unpack(&decoded.data),
        Ok(TokenInstruction::Revoke)
    )
}

#[tokio::test]
async fn test_load_pool() -> Result<(), Box<dyn Error>> {
    let setup = setup_test_environment(3);
    let pool = load_pool(&setup).await?;

    assert_eq!(pool.pool_account(), &setup.pool_account);
    assert_eq!(pool.authority(), &setup.authority);
    assert_eq!(pool.token_accounts(), setup.vaults.as_slice());
    assert_eq!(pool.token_mints(), setup.mints.as_slice());
    assert_eq!(pool.precision_multipliers(), &[1_000, 1_000, 1_000]);
    assert_eq!(pool.pool_mint(), &setup.pool_mint);
    assert_eq!(pool.amplification_coefficient(), 100);
    assert_eq!(pool.fee_numerator(), 4_000_000);
    assert!(pool.admin_settings().add_liquidity_enabled);

    let simulation = pool.simulation();
    assert_eq!(simulation.address, setup.config.simulation_user);
    for (ata, mint) in simulation.token_accounts.iter().zip(&setup.mints) {
        assert_eq!(*ata, get_associated_token_address(&simulation.address, mint));
    }
    assert_eq!(pool.token_index(&setup.mints[2])?, 2);

    // Loading reads only; nothing is submitted.
    assert!(setup.ledger.sent().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_reload_picks_up_new_state() -> Result<(), Box<dyn Error>> {
    let setup = setup_test_environment(2);
    let pool = load_pool(&setup).await?;

    let (_, nonce) = find_authority_address(&setup.config.program_id, &setup.pool_account);
    let mut state = pool_state(&setup.vaults, &setup.pool_mint, nonce);
    state.amplification_coefficient = 250;
    setup.ledger.set_account(
        setup.pool_account,
        program_account(&setup.config.program_id, &state),
    );

    let reloaded = pool.reload().await?;
    assert_eq!(pool.amplification_coefficient(), 100);
    assert_eq!(reloaded.amplification_coefficient(), 250);
    Ok(())
}

#[tokio::test]
async fn test_load_rejects_missing_account() {
    let setup = setup_test_environment(2);
    let missing = Pubkey::new_unique();
    let err = StableSwapPool::load(Arc::clone(&setup.ledger), setup.config.clone(), &missing)
        .await
        .err()
        .unwrap();
    assert!(matches!(err, ClientError::PoolAccountNotFound(key) if key == missing));
}

#[tokio::test]
async fn test_load_rejects_wrong_owner() {
    let setup = setup_test_environment(2);
    let mut account = setup
        .ledger
        .accounts
        .lock()
        .unwrap()
        .get(&setup.pool_account)
        .cloned()
        .unwrap();
    let stranger = Pubkey::new_unique();
    account.owner = stranger;
    setup.ledger.set_account(setup.pool_account, account);

    match load_pool(&setup).await.err().unwrap() {
        ClientError::InvalidPoolOwner { expected, actual } => {
            assert_eq!(expected, setup.config.program_id);
            assert_eq!(actual, stranger);
        }
        other => panic!("unexpected error {:?}", other),
    }
}

#[tokio::test]
async fn test_load_rejects_uninitialized_pool() {
    let setup = setup_test_environment(2);
    let mut state = pool_state(&setup.vaults, &setup.pool_mint, 255);
    state.is_initialized = false;
    setup.ledger.set_account(
        setup.pool_account,
        program_account(&setup.config.program_id, &state),
    );

    assert!(matches!(
        load_pool(&setup).await,
        Err(ClientError::UninitializedPool(key)) if key == setup.pool_account
    ));
}

#[tokio::test]
async fn test_load_rejects_truncated_account() {
    let setup = setup_test_environment(2);
    let mut account = setup
        .ledger
        .accounts
        .lock()
        .unwrap()
        .get(&setup.pool_account)
        .cloned()
        .unwrap();
    account.data.truncate(100);
    setup.ledger.set_account(setup.pool_account, account);

    assert!(matches!(
        load_pool(&setup).await,
        Err(ClientError::Layout(_))
    ));
}

#[tokio::test]
async fn test_load_unresolved_mint() {
    let setup = setup_test_environment(3);
    setup.ledger.accounts.lock().unwrap().remove(&setup.vaults[1]);

    assert!(matches!(
        load_pool(&setup).await,
        Err(ClientError::UnresolvedMint(key)) if key == setup.vaults[1]
    ));
    assert!(setup.ledger.sent().is_empty());
    assert!(setup.ledger.simulated().is_empty());
}

#[tokio::test]
async fn test_exchange_reports_dy() -> Result<(), Box<dyn Error>> {
    let setup = setup_test_environment(2);
    let pool = load_pool(&setup).await?;
    setup.ledger.set_committed_logs(&[
        "Program log: Instruction: Exchange",
        r#"Program log: GetDyUnderlying: {"dy": 995}"#,
    ]);

    let result = pool
        .exchange(
            &setup.user,
            &setup.user_token_accounts[0],
            &setup.user_token_accounts[1],
            1_000,
            990,
            vec![],
        )
        .await?;
    assert_eq!(result.quote.dy, 995);

    let sent = setup.ledger.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(result.signature, sent[0].signatures[0]);

    let ixs = decompile(&sent[0]);
    assert_eq!(ixs.len(), 3);
    assert_eq!(approved_amount(&ixs[0]), Some(1_000));
    assert_eq!(ixs[0].accounts[0], setup.user_token_accounts[0]);
    let delegate = ixs[0].accounts[1];
    assert_eq!(ixs[1].program_id, setup.config.program_id);
    assert_eq!(ixs[1].accounts[2], delegate);
    assert_eq!(
        SwapInstruction::unpack(&ixs[1].data)?,
        SwapInstruction::Exchange {
            in_amount: 1_000,
            minimum_out_amount: 990
        }
    );
    assert!(is_revoke(&ixs[2]));
    Ok(())
}

#[tokio::test]
async fn test_get_out_amount() -> Result<(), Box<dyn Error>> {
    let setup = setup_test_environment(3);
    let pool = load_pool(&setup).await?;
    setup
        .ledger
        .set_simulation_logs(&[r#"GetDyUnderlying: {"dy": 995}"#]);

    let quote = pool
        .get_out_amount(&setup.mints[2], &setup.mints[0], 1_000)
        .await?;
    assert_eq!(quote.dy, 995);

    let simulated = setup.ledger.simulated();
    assert_eq!(simulated.len(), 1);
    let simulation = pool.simulation();
    assert_eq!(simulated[0].message.account_keys[0], simulation.address);

    let ixs = decompile(&simulated[0]);
    assert_eq!(ixs.len(), 1);
    // Pool, authority, caller, 3 vaults, source, destination.
    assert_eq!(ixs[0].accounts[2], simulation.address);
    assert_eq!(ixs[0].accounts[6], simulation.token_accounts[2]);
    assert_eq!(ixs[0].accounts[7], simulation.token_accounts[0]);
    assert_eq!(
        SwapInstruction::unpack(&ixs[0].data)?,
        SwapInstruction::Exchange {
            in_amount: 1_000,
            minimum_out_amount: 0
        }
    );
    assert!(setup.ledger.sent().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_quote_unknown_mint() -> Result<(), Box<dyn Error>> {
    let setup = setup_test_environment(2);
    let pool = load_pool(&setup).await?;
    let stranger = Pubkey::new_unique();

    assert!(matches!(
        pool.get_out_amount(&stranger, &setup.mints[0], 1).await,
        Err(ClientError::UnknownMint(key)) if key == stranger
    ));
    assert!(matches!(
        pool.get_withdrawal_amount(&stranger, 1).await,
        Err(ClientError::UnknownMint(_))
    ));
    assert!(setup.ledger.simulated().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_missing_quote_result() -> Result<(), Box<dyn Error>> {
    let setup = setup_test_environment(2);
    let pool = load_pool(&setup).await?;
    setup
        .ledger
        .set_simulation_logs(&["Program log: Error: pool is paused"]);

    match pool.get_virtual_price().await {
        Err(ClientError::MissingQuoteResult { operation, logs }) => {
            assert_eq!(operation, QuoteKind::GetVirtualPrice);
            assert_eq!(logs, vec!["Program log: Error: pool is paused".to_string()]);
        }
        other => panic!("unexpected result {:?}", other),
    }

    // Committed transactions with no result line fail the same way.
    let err = pool
        .exchange(
            &setup.user,
            &setup.user_token_accounts[0],
            &setup.user_token_accounts[1],
            5,
            0,
            vec![],
        )
        .await
        .err()
        .unwrap();
    assert!(matches!(
        err,
        ClientError::MissingQuoteResult {
            operation: QuoteKind::GetDyUnderlying,
            ..
        }
    ));
    Ok(())
}

#[tokio::test]
async fn test_add_liquidity_three_assets() -> Result<(), Box<dyn Error>> {
    let setup = setup_test_environment(3);
    let pool = load_pool(&setup).await?;
    setup
        .ledger
        .set_committed_logs(&[r#"Program log: GetMintAmount: {"mintAmount": 600}"#]);

    let result = pool
        .add_liquidity(
            &setup.user,
            &setup.user_token_accounts,
            &setup.user_lp,
            &[100, 200, 300],
            590,
            vec![],
        )
        .await?;
    assert_eq!(result.quote.mint_amount, 600);

    let sent = setup.ledger.sent();
    let ixs = decompile(&sent[0]);
    assert_eq!(ixs.len(), 7);

    let delegate = ixs[0].accounts[1];
    for (i, amount) in [100u64, 200, 300].iter().enumerate() {
        assert_eq!(ixs[i].program_id, spl_token::id());
        assert_eq!(approved_amount(&ixs[i]), Some(*amount));
        assert_eq!(ixs[i].accounts[0], setup.user_token_accounts[i]);
        assert_eq!(ixs[i].accounts[1], delegate);
        assert_eq!(ixs[i].accounts[2], setup.user.pubkey());
    }

    assert_eq!(ixs[3].program_id, setup.config.program_id);
    assert_eq!(ixs[3].accounts[2], delegate);
    assert_eq!(
        SwapInstruction::unpack(&ixs[3].data)?,
        SwapInstruction::AddLiquidity {
            deposit_amounts: vec![100, 200, 300],
            min_mint_amount: 590
        }
    );

    for (i, ix) in ixs[4..].iter().enumerate() {
        assert!(is_revoke(ix));
        assert_eq!(ix.accounts[0], setup.user_token_accounts[i]);
    }

    // Payer plus the ephemeral authority.
    assert_eq!(sent[0].signatures.len(), 2);
    assert_eq!(sent[0].message.account_keys[0], setup.user.pubkey());
    Ok(())
}

#[tokio::test]
async fn test_add_liquidity_arity_mismatch() -> Result<(), Box<dyn Error>> {
    let setup = setup_test_environment(3);
    let pool = load_pool(&setup).await?;

    let err = pool
        .add_liquidity(
            &setup.user,
            &setup.user_token_accounts,
            &setup.user_lp,
            &[100, 200],
            0,
            vec![],
        )
        .await
        .err()
        .unwrap();
    assert!(matches!(
        err,
        ClientError::ArityMismatch {
            expected: 3,
            actual: 2,
            ..
        }
    ));
    assert!(setup.ledger.sent().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_ephemeral_authority_is_fresh_per_call() -> Result<(), Box<dyn Error>> {
    let setup = setup_test_environment(2);
    let pool = load_pool(&setup).await?;
    setup
        .ledger
        .set_committed_logs(&[r#"GetDyUnderlying: {"dy": 1}"#]);

    for _ in 0..2 {
        pool.exchange(
            &setup.user,
            &setup.user_token_accounts[0],
            &setup.user_token_accounts[1],
            10,
            0,
            vec![],
        )
        .await?;
    }

    let sent = setup.ledger.sent();
    let first = decompile(&sent[0])[1].accounts[2];
    let second = decompile(&sent[1])[1].accounts[2];
    assert_ne!(first, second);
    assert_ne!(first, setup.user.pubkey());
    Ok(())
}

#[tokio::test]
async fn test_remove_liquidity_approves_lp_account() -> Result<(), Box<dyn Error>> {
    let setup = setup_test_environment(3);
    let pool = load_pool(&setup).await?;
    setup
        .ledger
        .set_committed_logs(&[r#"GetWithdrawalAmounts: {"amounts": [10, 20, 30]}"#]);

    let result = pool
        .remove_liquidity(
            &setup.user,
            &setup.user_token_accounts,
            &setup.user_lp,
            60,
            &[0, 0, 0],
            vec![],
        )
        .await?;
    assert_eq!(result.quote.amounts, vec![10, 20, 30]);

    let ixs = decompile(&setup.ledger.sent()[0]);
    assert_eq!(ixs.len(), 3);
    assert_eq!(ixs[0].accounts[0], setup.user_lp);
    assert_eq!(approved_amount(&ixs[0]), Some(60));
    assert!(is_revoke(&ixs[2]));
    assert_eq!(ixs[2].accounts[0], setup.user_lp);
    Ok(())
}

#[tokio::test]
async fn test_remove_liquidity_one_token() -> Result<(), Box<dyn Error>> {
    let setup = setup_test_environment(2);
    let pool = load_pool(&setup).await?;
    setup
        .ledger
        .set_committed_logs(&[r#"Program log: GetWithdrawalAmount: {"amount": 42}"#]);

    let result = pool
        .remove_liquidity_one_token(
            &setup.user,
            &setup.user_token_accounts[1],
            &setup.user_lp,
            50,
            40,
            vec![],
        )
        .await?;
    assert_eq!(result.quote.amount, 42);

    let ixs = decompile(&setup.ledger.sent()[0]);
    assert_eq!(approved_amount(&ixs[0]), Some(50));
    assert_eq!(
        SwapInstruction::unpack(&ixs[1].data)?,
        SwapInstruction::RemoveLiquidityOneToken {
            unmint_amount: 50,
            minimum_out_amount: 40
        }
    );
    Ok(())
}

#[tokio::test]
async fn test_prefix_instructions_run_first() -> Result<(), Box<dyn Error>> {
    let setup = setup_test_environment(2);
    let pool = load_pool(&setup).await?;
    setup
        .ledger
        .set_committed_logs(&[r#"GetDyUnderlying: {"dy": 7}"#]);

    let prefix: Vec<Instruction> = vec![
        spl_associated_token_account::instruction::create_associated_token_account_idempotent(
            &setup.user.pubkey(),
            &setup.user.pubkey(),
            &setup.mints[1],
            &spl_token::id(),
        ),
    ];
    pool.exchange(
        &setup.user,
        &setup.user_token_accounts[0],
        &setup.user_token_accounts[1],
        10,
        0,
        prefix,
    )
    .await?;

    let ixs = decompile(&setup.ledger.sent()[0]);
    assert_eq!(ixs.len(), 4);
    assert_eq!(ixs[0].program_id, spl_associated_token_account::id());
    assert_eq!(approved_amount(&ixs[1]), Some(10));
    assert!(is_revoke(&ixs[3]));
    Ok(())
}

#[tokio::test]
async fn test_withdrawal_quotes() -> Result<(), Box<dyn Error>> {
    let setup = setup_test_environment(3);
    let pool = load_pool(&setup).await?;

    setup
        .ledger
        .set_simulation_logs(&[r#"GetWithdrawalAmounts: {"amounts": [1, 2, 3]}"#]);
    let quote = pool.get_withdrawal_amounts(6).await?;
    assert_eq!(quote.amounts, vec![1, 2, 3]);

    let ixs = decompile(&setup.ledger.simulated()[0]);
    assert_eq!(
        SwapInstruction::unpack(&ixs[0].data)?,
        SwapInstruction::RemoveLiquidity {
            unmint_amount: 6,
            minimum_amounts: vec![0, 0, 0]
        }
    );

    // One amount per active asset.
    setup
        .ledger
        .set_simulation_logs(&[r#"GetWithdrawalAmounts: {"amounts": [1, 2]}"#]);
    assert!(matches!(
        pool.get_withdrawal_amounts(6).await,
        Err(ClientError::MalformedQuote {
            operation: QuoteKind::GetWithdrawalAmounts,
            ..
        })
    ));

    setup
        .ledger
        .set_simulation_logs(&[r#"GetWithdrawalAmount: {"amount": 5}"#]);
    let single = pool.get_withdrawal_amount(&setup.mints[1], 6).await?;
    assert_eq!(single.amount, 5);
    Ok(())
}

#[tokio::test]
async fn test_mint_amount_and_virtual_price() -> Result<(), Box<dyn Error>> {
    let setup = setup_test_environment(2);
    let pool = load_pool(&setup).await?;

    setup
        .ledger
        .set_simulation_logs(&[r#"GetMintAmount: {"mintAmount": 300}"#]);
    assert_eq!(pool.get_mint_amount(&[100, 200]).await?.mint_amount, 300);

    setup
        .ledger
        .set_simulation_logs(&[r#"Program log: GetVirtualPrice: {"price": 1000123}"#]);
    assert_eq!(pool.get_virtual_price().await?.price, 1_000_123);

    let simulated = setup.ledger.simulated();
    let ixs = decompile(&simulated[1]);
    assert_eq!(ixs[0].data, vec![5]);
    // The virtual price call does not require the caller's signature.
    assert_eq!(simulated[1].message.header.num_required_signatures, 1);
    Ok(())
}

#[tokio::test]
async fn test_create_pool() -> Result<(), Box<dyn Error>> {
    let _ = env_logger::builder().is_test(true).try_init();

    let ledger = Arc::new(MockLedger::default());
    let config = ClientConfig::new(Pubkey::new_unique()).with_settle_delay_ms(0);
    let payer = Keypair::new();
    let pool_keypair = Keypair::new();
    let pool_address = pool_keypair.pubkey();
    let (authority, nonce) = find_authority_address(&config.program_id, &pool_address);

    let mints: Vec<Pubkey> = (0..2).map(|_| Pubkey::new_unique()).collect();
    let vaults: Vec<Pubkey> = (0..2).map(|_| Pubkey::new_unique()).collect();
    for (vault, mint) in vaults.iter().zip(&mints) {
        ledger.set_account(*vault, token_account(mint, &authority, 0));
    }
    let pool_mint = Pubkey::new_unique();

    // The program writes the state during the create transaction.
    let state = pool_state(&vaults, &pool_mint, nonce);
    ledger
        .pending_accounts
        .lock()
        .unwrap()
        .push((pool_address, program_account(&config.program_id, &state)));

    let pool = StableSwapPool::create(
        Arc::clone(&ledger),
        config.clone(),
        &payer,
        CreatePoolParams {
            pool_account: &pool_keypair,
            token_accounts: vaults.clone(),
            pool_mint,
            admin_token_mint: state.admin_token_mint,
            amplification_coefficient: 100,
            fee_numerator: 4_000_000,
            admin_fee_numerator: 0,
            add_liquidity_enabled: true,
            simulation_funder: None,
        },
    )
    .await?;
    assert_eq!(pool.pool_account(), &pool_address);
    assert_eq!(pool.token_mints(), mints.as_slice());
    assert_eq!(pool.nonce(), nonce);

    let sent = ledger.sent();
    assert_eq!(sent.len(), 1);
    let ixs = decompile(&sent[0]);
    assert_eq!(ixs.len(), 2);

    let expected_create = system_instruction::create_account(
        &payer.pubkey(),
        &pool_address,
        rent_for(POOL_STATE_LEN),
        265,
        &config.program_id,
    );
    assert_eq!(ixs[0].program_id, system_program::id());
    assert_eq!(ixs[0].data, expected_create.data);

    assert_eq!(ixs[1].program_id, config.program_id);
    assert_eq!(ixs[1].accounts[0], pool_address);
    assert_eq!(ixs[1].accounts[1], authority);
    assert_eq!(
        SwapInstruction::unpack(&ixs[1].data)?,
        SwapInstruction::Initialize {
            nonce,
            amplification_coefficient: 100,
            fee_numerator: 4_000_000,
            admin_fee_numerator: 0,
            admin_settings: AdminSettings {
                swap_enabled: true,
                add_liquidity_enabled: true
            },
        }
    );
    // Payer and pool keypair.
    assert_eq!(sent[0].signatures.len(), 2);
    Ok(())
}

#[tokio::test]
async fn test_create_rejects_bad_token_count() {
    let ledger = Arc::new(MockLedger::default());
    let config = ClientConfig::new(Pubkey::new_unique()).with_settle_delay_ms(0);
    let payer = Keypair::new();
    let pool_keypair = Keypair::new();

    let result = StableSwapPool::create(
        Arc::clone(&ledger),
        config,
        &payer,
        CreatePoolParams {
            pool_account: &pool_keypair,
            token_accounts: (0..5).map(|_| Pubkey::new_unique()).collect(),
            pool_mint: Pubkey::new_unique(),
            admin_token_mint: Pubkey::new_unique(),
            amplification_coefficient: 1,
            fee_numerator: 0,
            admin_fee_numerator: 0,
            add_liquidity_enabled: true,
            simulation_funder: None,
        },
    )
    .await;
    assert!(matches!(result, Err(ClientError::InvalidTokenCount(5))));
    assert!(ledger.sent().is_empty());
}

#[tokio::test]
async fn test_create_provisions_simulation_identity() -> Result<(), Box<dyn Error>> {
    let ledger = Arc::new(MockLedger::default());
    let config = ClientConfig::new(Pubkey::new_unique()).with_settle_delay_ms(0);
    let payer = Keypair::new();
    let pool_keypair = Keypair::new();
    let (authority, nonce) = find_authority_address(&config.program_id, &pool_keypair.pubkey());

    let mint = Pubkey::new_unique();
    let vault = Pubkey::new_unique();
    ledger.set_account(vault, token_account(&mint, &authority, 0));
    let pool_mint = Pubkey::new_unique();
    let state = pool_state(&[vault], &pool_mint, nonce);

    // The simulation identity already holds an account for the asset mint.
    let existing = get_associated_token_address(&config.simulation_user, &mint);
    ledger.set_account(existing, token_account(&mint, &config.simulation_user, 0));

    ledger
        .pending_accounts
        .lock()
        .unwrap()
        .push((pool_keypair.pubkey(), program_account(&config.program_id, &state)));

    StableSwapPool::create(
        Arc::clone(&ledger),
        config.clone(),
        &payer,
        CreatePoolParams {
            pool_account: &pool_keypair,
            token_accounts: vec![vault],
            pool_mint,
            admin_token_mint: state.admin_token_mint,
            amplification_coefficient: 10,
            fee_numerator: 0,
            admin_fee_numerator: 0,
            add_liquidity_enabled: false,
            simulation_funder: Some(&payer),
        },
    )
    .await?;

    // Funding transfer, LP account creation, pool creation.
    let sent = ledger.sent();
    assert_eq!(sent.len(), 3);
    let transfer = decompile(&sent[0]);
    assert_eq!(transfer[0].program_id, system_program::id());
    assert_eq!(transfer[0].accounts[1], config.simulation_user);

    let create_lp = decompile(&sent[1]);
    assert_eq!(create_lp[0].program_id, spl_associated_token_account::id());
    assert_eq!(
        create_lp[0].accounts[1],
        get_associated_token_address(&config.simulation_user, &pool_mint)
    );
    Ok(())
}
