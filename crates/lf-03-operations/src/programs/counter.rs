//! # Counter Program Client
//!
//! Follows the interface-description layout of the counter program:
//!
//! ```text
//! instruction data = sha256("global:<name>")[..8]
//! account data     = sha256("account:Counter")[..8] || count (u64 LE)
//! ```
//!
//! | Instruction | Accounts |
//! |-------------|----------|
//! | `initialize` | counter (writable, signer), payer (writable, signer), system program |
//! | `increment` | counter (writable) |

use lf_02_account_sync::{AccountDecoder, DecodeError};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use shared_types::{AccountInfo, AccountMeta, Address, Instruction};

use super::system::SYSTEM_PROGRAM_ID;

/// Address of the deployed counter program.
pub const COUNTER_PROGRAM_ID: Address = Address::new(*b"counter_program_v1______________");

/// Discriminator length in bytes.
pub const DISCRIMINATOR_LEN: usize = 8;

/// Size of a counter account's data.
pub const COUNTER_ACCOUNT_SPACE: usize = DISCRIMINATOR_LEN + 8;

fn discriminator(namespace: &str, name: &str) -> [u8; DISCRIMINATOR_LEN] {
    let digest = Sha256::digest(format!("{namespace}:{name}").as_bytes());
    let mut out = [0u8; DISCRIMINATOR_LEN];
    out.copy_from_slice(&digest[..DISCRIMINATOR_LEN]);
    out
}

/// Discriminator of the `Counter` account type.
pub fn account_discriminator() -> [u8; DISCRIMINATOR_LEN] {
    discriminator("account", "Counter")
}

/// Counter program instructions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CounterInstruction {
    /// Create a counter account holding zero.
    Initialize,
    /// Add one to the count.
    Increment,
}

impl CounterInstruction {
    /// Method name in the interface description.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Initialize => "initialize",
            Self::Increment => "increment",
        }
    }

    /// Leading payload bytes selecting this instruction.
    pub fn discriminator(&self) -> [u8; DISCRIMINATOR_LEN] {
        discriminator("global", self.name())
    }

    /// Identify the instruction from its payload.
    pub fn decode(data: &[u8]) -> Option<Self> {
        let head = data.get(..DISCRIMINATOR_LEN)?;
        [Self::Initialize, Self::Increment]
            .into_iter()
            .find(|ix| ix.discriminator() == head)
    }
}

/// `initialize` instruction creating `counter`, paid by `payer`.
pub fn initialize(payer: Address, counter: Address) -> Instruction {
    Instruction::new(
        COUNTER_PROGRAM_ID,
        vec![
            AccountMeta::writable(counter, true),
            AccountMeta::writable(payer, true),
            AccountMeta::readonly(SYSTEM_PROGRAM_ID, false),
        ],
        CounterInstruction::Initialize.discriminator().to_vec(),
    )
}

/// `increment` instruction for `counter`.
pub fn increment(counter: Address) -> Instruction {
    Instruction::new(
        COUNTER_PROGRAM_ID,
        vec![AccountMeta::writable(counter, false)],
        CounterInstruction::Increment.discriminator().to_vec(),
    )
}

/// Decoded counter account state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterAccount {
    /// Account address.
    pub address: Address,
    /// Current count.
    pub count: u64,
}

impl CounterAccount {
    /// Account data for a counter holding `count`.
    pub fn encode_data(count: u64) -> Vec<u8> {
        let mut data = Vec::with_capacity(COUNTER_ACCOUNT_SPACE);
        data.extend_from_slice(&account_discriminator());
        data.extend_from_slice(&count.to_le_bytes());
        data
    }

    /// Decode raw account contents.
    pub fn decode(address: Address, info: &AccountInfo) -> Result<Self, DecodeError> {
        if info.owner != COUNTER_PROGRAM_ID {
            return Err(DecodeError::WrongOwner {
                expected: COUNTER_PROGRAM_ID,
                actual: info.owner,
            });
        }
        if info.data.len() < COUNTER_ACCOUNT_SPACE {
            return Err(DecodeError::TooShort {
                expected: COUNTER_ACCOUNT_SPACE,
                actual: info.data.len(),
            });
        }
        if info.data[..DISCRIMINATOR_LEN] != account_discriminator() {
            return Err(DecodeError::BadDiscriminator);
        }
        let mut count = [0u8; 8];
        count.copy_from_slice(&info.data[DISCRIMINATOR_LEN..COUNTER_ACCOUNT_SPACE]);
        Ok(Self {
            address,
            count: u64::from_le_bytes(count),
        })
    }
}

/// Decoder plugging counter accounts into account sync.
#[derive(Clone, Copy, Debug, Default)]
pub struct CounterDecoder;

impl AccountDecoder for CounterDecoder {
    type Output = CounterAccount;

    fn decode(&self, address: &Address, info: &AccountInfo) -> Result<CounterAccount, DecodeError> {
        CounterAccount::decode(*address, info)
    }
}
