pub mod config;
pub mod connection;
pub mod constants;
pub mod delegate;
pub mod error;
pub mod instruction;
pub mod pda;
pub mod pool;
pub mod quote;
pub mod simulation;
pub mod state;

pub use solana_program;
pub use constants::*;

pub use config::ClientConfig;
pub use connection::{LedgerConnection, SimulationOutcome};
pub use error::{ClientError, Result};
pub use pool::{CreatePoolParams, StableSwapPool, TxResult};
