//! # Core Ledger Entities
//!
//! Defines the values a client exchanges with the ledger.
//!
//! ## Clusters
//!
//! - **Identity**: `Address`, `Signature`
//! - **Freshness**: `Blockhash`, `FreshnessToken`
//! - **Transactions**: `AccountMeta`, `Instruction`, `UnsignedTransaction`,
//!   `SignedTransaction`
//! - **State**: `AccountInfo`

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, Bytes};

use crate::capabilities::CoSigner;
use crate::errors::{LedgerError, ParseAddressError};
use crate::keypair::verify_signature;

/// Length of an address in bytes.
pub const ADDRESS_LEN: usize = 32;

/// Length of a signature in bytes.
pub const SIGNATURE_LEN: usize = 64;

// =============================================================================
// IDENTITY
// =============================================================================

/// A 32-byte public identifier of a ledger account.
///
/// The canonical text encoding is lowercase hex.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Address(pub [u8; ADDRESS_LEN]);

impl Address {
    /// Create from raw bytes.
    #[must_use]
    pub const fn new(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }

    /// Get raw bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({}..)", &hex::encode(&self.0[..4]))
    }
}

impl FromStr for Address {
    type Err = ParseAddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes =
            hex::decode(s.trim()).map_err(|e| ParseAddressError::InvalidEncoding(e.to_string()))?;
        let array: [u8; ADDRESS_LEN] =
            bytes
                .as_slice()
                .try_into()
                .map_err(|_| ParseAddressError::InvalidLength {
                    expected: ADDRESS_LEN,
                    actual: bytes.len(),
                })?;
        Ok(Self(array))
    }
}

/// A 64-byte Ed25519 signature over a transaction message.
///
/// The fee payer's signature doubles as the transaction identifier.
#[serde_as]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Signature(#[serde_as(as = "Bytes")] pub [u8; SIGNATURE_LEN]);

impl Signature {
    /// Create from raw bytes.
    #[must_use]
    pub const fn new(bytes: [u8; SIGNATURE_LEN]) -> Self {
        Self(bytes)
    }

    /// Get raw bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; SIGNATURE_LEN] {
        &self.0
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({}..)", &hex::encode(&self.0[..6]))
    }
}

// =============================================================================
// FRESHNESS
// =============================================================================

/// Reference to a recent block, used to make a transaction unique and
/// time-bounded.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Blockhash(pub [u8; 32]);

impl fmt::Display for Blockhash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for Blockhash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Blockhash({}..)", &hex::encode(&self.0[..4]))
    }
}

/// Freshness metadata fetched once per transaction build.
///
/// Valid while the ledger height is at or below `last_valid_block_height`.
/// A token is never reused across retries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreshnessToken {
    /// Recent block reference.
    pub blockhash: Blockhash,
    /// Last ledger height at which the token is still accepted.
    pub last_valid_block_height: u64,
}

impl FreshnessToken {
    /// Create a new token.
    #[must_use]
    pub fn new(blockhash: Blockhash, last_valid_block_height: u64) -> Self {
        Self {
            blockhash,
            last_valid_block_height,
        }
    }

    /// Whether the token is still accepted at `height`.
    #[must_use]
    pub fn is_valid_at(&self, height: u64) -> bool {
        height <= self.last_valid_block_height
    }
}

// =============================================================================
// TRANSACTIONS
// =============================================================================

/// Access role of an account within an instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccountRole {
    /// Account is only read.
    Readonly,
    /// Account may be mutated.
    Writable,
}

/// One account reference inside an instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountMeta {
    /// Referenced account.
    pub address: Address,
    /// Access role.
    pub role: AccountRole,
    /// Whether the account must sign the transaction.
    pub signer: bool,
}

impl AccountMeta {
    /// A writable account reference.
    #[must_use]
    pub fn writable(address: Address, signer: bool) -> Self {
        Self {
            address,
            role: AccountRole::Writable,
            signer,
        }
    }

    /// A read-only account reference.
    #[must_use]
    pub fn readonly(address: Address, signer: bool) -> Self {
        Self {
            address,
            role: AccountRole::Readonly,
            signer,
        }
    }

    /// Whether the account may be mutated.
    #[must_use]
    pub fn is_writable(&self) -> bool {
        self.role == AccountRole::Writable
    }
}

/// One program invocation. Immutable once constructed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    /// Program that executes this instruction.
    pub program_id: Address,
    /// Ordered account references.
    pub accounts: Vec<AccountMeta>,
    /// Opaque program payload.
    pub data: Vec<u8>,
}

impl Instruction {
    /// Create a new instruction.
    #[must_use]
    pub fn new(program_id: Address, accounts: Vec<AccountMeta>, data: Vec<u8>) -> Self {
        Self {
            program_id,
            accounts,
            data,
        }
    }

    /// Addresses this instruction marks as `signer`.
    pub fn signer_addresses(&self) -> impl Iterator<Item = Address> + '_ {
        self.accounts
            .iter()
            .filter(|meta| meta.signer)
            .map(|meta| meta.address)
    }
}

/// A fully assembled transaction awaiting signatures.
///
/// Instructions execute sequentially and atomically, in order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsignedTransaction {
    /// Account that pays the fee and signs first.
    pub fee_payer: Address,
    /// Freshness metadata fetched for this build.
    pub freshness: FreshnessToken,
    /// Ordered instructions.
    pub instructions: Vec<Instruction>,
}

impl UnsignedTransaction {
    /// Create a new unsigned transaction.
    #[must_use]
    pub fn new(
        fee_payer: Address,
        freshness: FreshnessToken,
        instructions: Vec<Instruction>,
    ) -> Self {
        Self {
            fee_payer,
            freshness,
            instructions,
        }
    }

    /// Every address whose signature is required, fee payer first, in
    /// first-appearance order without duplicates.
    #[must_use]
    pub fn required_signers(&self) -> Vec<Address> {
        let mut signers = vec![self.fee_payer];
        for address in self.instructions.iter().flat_map(Instruction::signer_addresses) {
            if !signers.contains(&address) {
                signers.push(address);
            }
        }
        signers
    }

    /// The exact bytes every signer signs.
    pub fn message_bytes(&self) -> Result<Vec<u8>, LedgerError> {
        Ok(bincode::serialize(self)?)
    }
}

/// A transaction together with the signatures collected so far.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTransaction {
    /// The signed message.
    pub message: UnsignedTransaction,
    /// Collected `(signer, signature)` pairs.
    pub signatures: Vec<(Address, Signature)>,
}

impl SignedTransaction {
    /// Wrap a message with no signatures yet.
    #[must_use]
    pub fn new(message: UnsignedTransaction) -> Self {
        Self {
            message,
            signatures: Vec::new(),
        }
    }

    /// Attach a signature, replacing any earlier one from the same signer.
    pub fn add_signature(&mut self, signer: Address, signature: Signature) {
        self.signatures.retain(|(address, _)| *address != signer);
        self.signatures.push((signer, signature));
    }

    /// Sign the message with a local co-signer.
    pub fn sign_with(&mut self, signer: &dyn CoSigner) -> Result<(), LedgerError> {
        let message = self.message.message_bytes()?;
        let signature = signer.sign_message(&message);
        self.add_signature(signer.address(), signature);
        Ok(())
    }

    /// Signature produced by `signer`, if any.
    #[must_use]
    pub fn signature_of(&self, signer: &Address) -> Option<Signature> {
        self.signatures
            .iter()
            .find(|(address, _)| address == signer)
            .map(|(_, signature)| *signature)
    }

    /// The transaction identifier: the fee payer's signature.
    #[must_use]
    pub fn signature(&self) -> Option<Signature> {
        self.signature_of(&self.message.fee_payer)
    }

    /// Required signers that have not signed yet.
    #[must_use]
    pub fn missing_signers(&self) -> Vec<Address> {
        self.message
            .required_signers()
            .into_iter()
            .filter(|signer| self.signature_of(signer).is_none())
            .collect()
    }

    /// Whether every required signer has signed.
    #[must_use]
    pub fn is_fully_signed(&self) -> bool {
        self.missing_signers().is_empty()
    }

    /// Check every attached signature against the message bytes.
    pub fn verify_signatures(&self) -> Result<(), LedgerError> {
        let message = self.message.message_bytes()?;
        for (signer, signature) in &self.signatures {
            if !verify_signature(signer, &message, signature) {
                return Err(LedgerError::Rejected(format!(
                    "invalid signature for {signer}"
                )));
            }
        }
        Ok(())
    }

    /// Encode for broadcast.
    pub fn to_wire_bytes(&self) -> Result<Vec<u8>, LedgerError> {
        Ok(bincode::serialize(self)?)
    }

    /// Decode a broadcast payload.
    pub fn from_wire_bytes(bytes: &[u8]) -> Result<Self, LedgerError> {
        Ok(bincode::deserialize(bytes)?)
    }
}

// =============================================================================
// STATE
// =============================================================================

/// Raw account contents as returned by the ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountInfo {
    /// Native balance.
    pub lamports: u64,
    /// Program that owns the account.
    pub owner: Address,
    /// Program-defined bytes.
    pub data: Vec<u8>,
}
