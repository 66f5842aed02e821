use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::pubkey::Pubkey;

use crate::constants::{MAX_N_COINS, POOL_STATE_LEN};
use crate::error::LayoutError;

/// Admin-controlled feature flags stored at the tail of the pool record.
#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AdminSettings {
    /// Whether `exchange` is accepted by the program.
    pub swap_enabled: bool,
    /// Whether `add_liquidity` is accepted by the program.
    pub add_liquidity_enabled: bool,
}

/// A fixed-capacity array paired with the number of slots in use.
///
/// The on-chain record always stores `N` slots; only the first `len` are
/// meaningful. The remaining slots are kept so a decoded record can be
/// re-encoded byte for byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FixedSlots<T, const N: usize> {
    slots: [T; N],
    len: usize,
}

fn saturating_u32(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX)
}

impl<T: Copy + Default, const N: usize> FixedSlots<T, N> {
    pub fn new(slots: [T; N], len: usize) -> Result<Self, LayoutError> {
        if len > N {
            return Err(LayoutError::TokenAccountsLengthOutOfBounds(saturating_u32(len)));
        }
        Ok(Self { slots, len })
    }

    /// Builds a sequence from its active prefix, zero-filling the padding.
    pub fn from_active(active: &[T]) -> Result<Self, LayoutError> {
        if active.len() > N {
            return Err(LayoutError::TokenAccountsLengthOutOfBounds(saturating_u32(
                active.len(),
            )));
        }
        let mut slots = [T::default(); N];
        slots[..active.len()].copy_from_slice(active);
        Ok(Self {
            slots,
            len: active.len(),
        })
    }

    /// The meaningful prefix.
    pub fn active(&self) -> &[T] {
        &self.slots[..self.len]
    }

    /// Every slot, padding included.
    pub fn slots(&self) -> &[T; N] {
        &self.slots
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub const fn capacity() -> usize {
        N
    }
}

impl<T: Copy + Default, const N: usize> Default for FixedSlots<T, N> {
    fn default() -> Self {
        Self {
            slots: [T::default(); N],
            len: 0,
        }
    }
}

/// Decoded stable-swap pool record.
///
/// Written only by the pool program; the client decodes it to learn the
/// pool's vaults, mints and curve parameters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PoolState {
    /// Layout version of the record.
    pub version: u8,
    /// Set by the program once `initialize` has run.
    pub is_initialized: bool,
    /// Bump seed of the pool's derived authority.
    pub nonce: u8,
    /// Curve amplification coefficient (A).
    pub amplification_coefficient: u64,
    /// Trade fee, over `FEE_DENOMINATOR`.
    pub fee_numerator: u64,
    /// Share of the trade fee kept by the admin, over `FEE_DENOMINATOR`.
    pub admin_fee_numerator: u64,
    /// Common precision the per-asset amounts are scaled to.
    pub precision_factor: u64,
    /// Per-asset scaling factors, aligned with `token_accounts`.
    pub precision_multipliers: FixedSlots<u64, MAX_N_COINS>,
    /// Vault token accounts; the active length is `token_accounts_length` on the wire.
    pub token_accounts: FixedSlots<Pubkey, MAX_N_COINS>,
    /// LP token mint.
    pub pool_mint: Pubkey,
    /// Mint the admin fee is collected in.
    pub admin_token_mint: Pubkey,
    pub admin_settings: AdminSettings,
}

// Field order and widths are the program's account layout.
#[derive(BorshSerialize, BorshDeserialize)]
struct PoolStateRecord {
    version: u8,
    is_initialized: bool,
    nonce: u8,
    amplification_coefficient: u64,
    fee_numerator: u64,
    admin_fee_numerator: u64,
    token_accounts_length: u32,
    precision_factor: u64,
    precision_multipliers: [u64; MAX_N_COINS],
    token_accounts: [Pubkey; MAX_N_COINS],
    pool_mint: Pubkey,
    admin_token_mint: Pubkey,
    admin_settings: AdminSettings,
}

impl PoolState {
    pub const LEN: usize = POOL_STATE_LEN;

    /// Decodes the fixed-span record from the start of `data`.
    ///
    /// Bytes past the span are ignored. Both per-asset sequences come back
    /// with their active length set to `token_accounts_length`.
    pub fn decode(data: &[u8]) -> Result<Self, LayoutError> {
        if data.len() < POOL_STATE_LEN {
            return Err(LayoutError::BufferTooShort {
                expected: POOL_STATE_LEN,
                actual: data.len(),
            });
        }
        let record = PoolStateRecord::deserialize(&mut &data[..POOL_STATE_LEN])
            .map_err(|e| LayoutError::Malformed(e.to_string()))?;

        let len = record.token_accounts_length as usize;
        if len > MAX_N_COINS {
            return Err(LayoutError::TokenAccountsLengthOutOfBounds(
                record.token_accounts_length,
            ));
        }

        Ok(Self {
            version: record.version,
            is_initialized: record.is_initialized,
            nonce: record.nonce,
            amplification_coefficient: record.amplification_coefficient,
            fee_numerator: record.fee_numerator,
            admin_fee_numerator: record.admin_fee_numerator,
            precision_factor: record.precision_factor,
            precision_multipliers: FixedSlots::new(record.precision_multipliers, len)?,
            token_accounts: FixedSlots::new(record.token_accounts, len)?,
            pool_mint: record.pool_mint,
            admin_token_mint: record.admin_token_mint,
            admin_settings: record.admin_settings,
        })
    }

    /// Encodes the record into a buffer of exactly `POOL_STATE_LEN` bytes.
    ///
    /// All slots are written, padding included. `token_accounts_length` is
    /// taken from `token_accounts.len()`, which must match
    /// `precision_multipliers.len()`.
    pub fn encode(&self) -> Result<Vec<u8>, LayoutError> {
        let mut buf = vec![0u8; POOL_STATE_LEN];
        self.pack_into_slice(&mut buf)?;
        Ok(buf)
    }

    /// Writes the record into the first `POOL_STATE_LEN` bytes of `dst`.
    pub fn pack_into_slice(&self, dst: &mut [u8]) -> Result<(), LayoutError> {
        if dst.len() < POOL_STATE_LEN {
            return Err(LayoutError::BufferTooShort {
                expected: POOL_STATE_LEN,
                actual: dst.len(),
            });
        }
        if self.precision_multipliers.len() != self.token_accounts.len() {
            return Err(LayoutError::Malformed(format!(
                "{} precision multipliers for {} token accounts",
                self.precision_multipliers.len(),
                self.token_accounts.len()
            )));
        }

        let record = PoolStateRecord {
            version: self.version,
            is_initialized: self.is_initialized,
            nonce: self.nonce,
            amplification_coefficient: self.amplification_coefficient,
            fee_numerator: self.fee_numerator,
            admin_fee_numerator: self.admin_fee_numerator,
            token_accounts_length: self.token_accounts.len() as u32,
            precision_factor: self.precision_factor,
            precision_multipliers: *self.precision_multipliers.slots(),
            token_accounts: *self.token_accounts.slots(),
            pool_mint: self.pool_mint,
            admin_token_mint: self.admin_token_mint,
            admin_settings: self.admin_settings,
        };
        record
            .serialize(&mut &mut dst[..POOL_STATE_LEN])
            .map_err(|e| LayoutError::Malformed(e.to_string()))
    }

    /// Active vault token accounts.
    pub fn token_accounts(&self) -> &[Pubkey] {
        self.token_accounts.active()
    }

    /// Active precision multipliers, aligned with `token_accounts()`.
    pub fn precision_multipliers(&self) -> &[u64] {
        self.precision_multipliers.active()
    }
}
