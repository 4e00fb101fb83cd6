//! # System Program Client
//!
//! Native value transfers and balance decoding. Instruction payloads are
//! the bincode encoding of `SystemInstruction`, so `Transfer` is encoded as
//! `u32 LE 2` followed by `u64 LE lamports`.

use std::fmt;

use lf_02_account_sync::{AccountDecoder, DecodeError};
use serde::{Deserialize, Serialize};
use shared_types::{AccountInfo, AccountMeta, Address, Instruction, LedgerError};

/// Address of the system program.
pub const SYSTEM_PROGRAM_ID: Address = Address::new([0u8; 32]);

/// Smallest units per whole token.
pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

/// System program instructions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SystemInstruction {
    /// Create a new account.
    CreateAccount {
        /// Initial balance
        lamports: u64,
        /// Data size
        space: u64,
        /// Owning program
        owner: Address,
    },
    /// Assign an account to a program.
    Assign {
        /// New owning program
        owner: Address,
    },
    /// Move lamports between accounts.
    Transfer {
        /// Amount
        lamports: u64,
    },
}

impl SystemInstruction {
    /// Instruction payload bytes.
    pub fn encode(&self) -> Result<Vec<u8>, LedgerError> {
        Ok(bincode::serialize(self)?)
    }

    /// Parse an instruction payload.
    pub fn decode(data: &[u8]) -> Option<Self> {
        bincode::deserialize(data).ok()
    }
}

/// Transfer `lamports` from `from` (signer) to `to`.
pub fn transfer(from: Address, to: Address, lamports: u64) -> Result<Instruction, LedgerError> {
    Ok(Instruction::new(
        SYSTEM_PROGRAM_ID,
        vec![AccountMeta::writable(from, true), AccountMeta::writable(to, false)],
        SystemInstruction::Transfer { lamports }.encode()?,
    ))
}

/// Convert a whole-token amount to lamports.
///
/// `None` for negative, non-finite or overflowing amounts.
pub fn sol_to_lamports(amount: f64) -> Option<u64> {
    if !amount.is_finite() || amount < 0.0 {
        return None;
    }
    let lamports = (amount * LAMPORTS_PER_SOL as f64).round();
    if lamports >= u64::MAX as f64 {
        return None;
    }
    Some(lamports as u64)
}

/// Native balance of an account.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Balance {
    /// Balance in lamports.
    pub lamports: u64,
}

impl Balance {
    /// Balance in whole tokens.
    pub fn as_sol(&self) -> f64 {
        self.lamports as f64 / LAMPORTS_PER_SOL as f64
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} SOL", self.as_sol())
    }
}

/// Decoder reading the native balance of any account.
#[derive(Clone, Copy, Debug, Default)]
pub struct BalanceDecoder;

impl AccountDecoder for BalanceDecoder {
    type Output = Balance;

    fn decode(&self, _address: &Address, info: &AccountInfo) -> Result<Balance, DecodeError> {
        Ok(Balance {
            lamports: info.lamports,
        })
    }
}
