use solana_program::pubkey::Pubkey;

/// Maximum number of assets a pool can hold.
pub const MAX_N_COINS: usize = 4;

/// Serialized size of the on-chain pool state record.
///
/// version(1) + is_initialized(1) + nonce(1) + amplification_coefficient(8)
/// + fee_numerator(8) + admin_fee_numerator(8) + token_accounts_length(4)
/// + precision_factor(8) + precision_multipliers(8 * 4)
/// + token_accounts(32 * 4) + pool_mint(32) + admin_token_mint(32)
/// + admin_settings(2)
pub const POOL_STATE_LEN: usize = 265;

/// Denominator applied to `fee_numerator` and `admin_fee_numerator`.
pub const FEE_DENOMINATOR: u64 = 10_000_000_000;

/// Well-known address used as fee payer and owner for dry-run execution.
pub const SIMULATION_USER: Pubkey = solana_program::pubkey!("2YbB88p9EBTJijsxAkmaUjenTXJnmrJvp6MRyT5LiBiM");

/// Lamports sent to the simulation user when it is provisioned with a funder.
pub const SIMULATION_BOOTSTRAP_LAMPORTS: u64 = 100_000_000;

/// Wait after pool creation before the first load.
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 2_000;

/// Prefix the runtime puts in front of program `msg!` output.
pub const PROGRAM_LOG_PREFIX: &str = "Program log: ";
