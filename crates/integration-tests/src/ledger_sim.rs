//! # Simulated Ledger
//!
//! An in-process `LedgerConnection` that executes the system and counter
//! programs. It enforces what a real cluster enforces on a client:
//!
//! - every signature verifies against the message bytes
//! - the blockhash is known and not past its last valid height
//! - a signature is processed at most once
//! - the fee payer covers `FEE_PER_SIGNATURE` per signature
//! - instructions execute atomically
//!
//! With preflight, a failing transaction is refused at broadcast. With
//! `skip_preflight` it lands, pays its fee, and fails at confirmation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use lf_03_operations::programs::counter::{CounterInstruction, COUNTER_ACCOUNT_SPACE};
use lf_03_operations::programs::{
    CounterAccount, SystemInstruction, COUNTER_PROGRAM_ID, SYSTEM_PROGRAM_ID,
};
use parking_lot::RwLock;
use sha2::{Digest, Sha256};
use shared_types::{
    AccountInfo, Address, Blockhash, FreshnessToken, Instruction, LedgerConnection, LedgerError,
    SendOptions, Signature, SignedTransaction,
};
use tracing::debug;

/// Fee charged per signature.
pub const FEE_PER_SIGNATURE: u64 = 5_000;

/// Lamports moved into a new counter account.
pub const COUNTER_RENT: u64 = 1_000_000;

/// Slots a blockhash stays valid for.
pub const BLOCKHASH_VALIDITY: u64 = 150;

type Accounts = HashMap<Address, AccountInfo>;

#[derive(Default)]
struct LedgerState {
    height: u64,
    sequence: u64,
    accounts: Accounts,
    blockhashes: HashMap<Blockhash, u64>,
    processed: HashMap<Signature, Result<(), String>>,
}

/// In-process ledger.
pub struct SimulatedLedger {
    endpoint: String,
    state: RwLock<LedgerState>,
    fail_reads: AtomicBool,
    fail_freshness: AtomicBool,
    fail_sends: AtomicBool,
    fail_confirms: AtomicBool,
    broadcasts: AtomicU64,
}

impl SimulatedLedger {
    /// Create an empty ledger.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            state: RwLock::new(LedgerState::default()),
            fail_reads: AtomicBool::new(false),
            fail_freshness: AtomicBool::new(false),
            fail_sends: AtomicBool::new(false),
            fail_confirms: AtomicBool::new(false),
            broadcasts: AtomicU64::new(0),
        }
    }

    /// Credit `lamports` to `address`, creating a system account if needed.
    pub fn airdrop(&self, address: Address, lamports: u64) {
        let mut state = self.state.write();
        let account = state.accounts.entry(address).or_insert_with(|| AccountInfo {
            lamports: 0,
            owner: SYSTEM_PROGRAM_ID,
            data: Vec::new(),
        });
        account.lamports = account.lamports.saturating_add(lamports);
    }

    /// Produce `slots` empty blocks.
    pub fn advance_slots(&self, slots: u64) {
        self.state.write().height += slots;
    }

    /// Current block height.
    pub fn height(&self) -> u64 {
        self.state.read().height
    }

    /// Account contents, bypassing fault injection.
    pub fn account(&self, address: &Address) -> Option<AccountInfo> {
        self.state.read().accounts.get(address).cloned()
    }

    /// Lamports held by `address` (zero when absent).
    pub fn lamports(&self, address: &Address) -> u64 {
        self.account(address).map_or(0, |a| a.lamports)
    }

    /// Outcome of a processed transaction.
    pub fn status(&self, signature: &Signature) -> Option<Result<(), String>> {
        self.state.read().processed.get(signature).cloned()
    }

    /// Number of `send_raw` calls received.
    pub fn broadcasts(&self) -> u64 {
        self.broadcasts.load(Ordering::SeqCst)
    }

    /// Number of transactions that landed (successful or failed).
    pub fn processed_count(&self) -> usize {
        self.state.read().processed.len()
    }

    /// Make account reads fail.
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make freshness fetches fail.
    pub fn set_fail_freshness(&self, fail: bool) {
        self.fail_freshness.store(fail, Ordering::SeqCst);
    }

    /// Drop the connection at broadcast.
    pub fn set_fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    /// Drop the connection while waiting for confirmation.
    pub fn set_fail_confirms(&self, fail: bool) {
        self.fail_confirms.store(fail, Ordering::SeqCst);
    }
}

impl Default for SimulatedLedger {
    fn default() -> Self {
        Self::new("sim://localnet")
    }
}

#[async_trait]
impl LedgerConnection for SimulatedLedger {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn get_freshness(&self) -> Result<FreshnessToken, LedgerError> {
        if self.fail_freshness.load(Ordering::SeqCst) {
            return Err(LedgerError::Connection("freshness unavailable".to_string()));
        }
        let mut state = self.state.write();
        state.sequence += 1;

        let mut hasher = Sha256::new();
        hasher.update(state.height.to_le_bytes());
        hasher.update(state.sequence.to_le_bytes());
        let digest = hasher.finalize();
        let mut hash = [0u8; 32];
        hash.copy_from_slice(&digest);

        let blockhash = Blockhash(hash);
        let last_valid = state.height + BLOCKHASH_VALIDITY;
        state.blockhashes.insert(blockhash, last_valid);
        Ok(FreshnessToken::new(blockhash, last_valid))
    }

    async fn get_account(&self, address: &Address) -> Result<Option<AccountInfo>, LedgerError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(LedgerError::Connection("account read failed".to_string()));
        }
        Ok(self.account(address))
    }

    async fn send_raw(&self, wire: &[u8], options: SendOptions) -> Result<Signature, LedgerError> {
        self.broadcasts.fetch_add(1, Ordering::SeqCst);
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(LedgerError::Connection("broadcast failed".to_string()));
        }

        let tx = SignedTransaction::from_wire_bytes(wire)
            .map_err(|e| LedgerError::Rejected(format!("malformed transaction: {e}")))?;
        if !tx.is_fully_signed() {
            return Err(LedgerError::Rejected("missing signature".to_string()));
        }
        tx.verify_signatures()?;
        let signature = tx
            .signature()
            .ok_or_else(|| LedgerError::Rejected("missing fee payer signature".to_string()))?;

        let mut state = self.state.write();
        if state.processed.contains_key(&signature) {
            return Err(LedgerError::Rejected("already processed".to_string()));
        }
        match state.blockhashes.get(&tx.message.freshness.blockhash) {
            None => return Err(LedgerError::Rejected("blockhash not found".to_string())),
            Some(last_valid) if state.height > *last_valid => {
                return Err(LedgerError::Rejected("blockhash expired".to_string()))
            }
            Some(_) => {}
        }

        let fee = FEE_PER_SIGNATURE * tx.signatures.len() as u64;
        let mut working = state.accounts.clone();
        debit(&mut working, &tx.message.fee_payer, fee)
            .map_err(|e| LedgerError::Rejected(format!("fee: {e}")))?;
        let after_fee = working.clone();

        match execute(&mut working, &tx) {
            Ok(()) => {
                state.accounts = working;
                state.processed.insert(signature, Ok(()));
            }
            Err(e) if options.skip_preflight => {
                debug!(signature = %signature, "Simulated ledger: landed with error {}", e);
                state.accounts = after_fee;
                state.processed.insert(signature, Err(e));
            }
            Err(e) => return Err(LedgerError::Rejected(format!("simulation failed: {e}"))),
        }
        Ok(signature)
    }

    async fn confirm_transaction(
        &self,
        signature: &Signature,
        _freshness: &FreshnessToken,
    ) -> Result<(), LedgerError> {
        if self.fail_confirms.load(Ordering::SeqCst) {
            return Err(LedgerError::Connection("connection lost".to_string()));
        }
        match self.state.read().processed.get(signature) {
            Some(Ok(())) => Ok(()),
            Some(Err(e)) => Err(LedgerError::Rejected(e.clone())),
            None => Err(LedgerError::Rejected("transaction not found".to_string())),
        }
    }
}

// =============================================================================
// Program execution
// =============================================================================

fn execute(accounts: &mut Accounts, tx: &SignedTransaction) -> Result<(), String> {
    for ix in &tx.message.instructions {
        if ix.program_id == SYSTEM_PROGRAM_ID {
            execute_system(accounts, ix)?;
        } else if ix.program_id == COUNTER_PROGRAM_ID {
            execute_counter(accounts, ix)?;
        } else {
            return Err(format!("unknown program {}", ix.program_id));
        }
    }
    Ok(())
}

fn account_at(ix: &Instruction, index: usize, signer: bool) -> Result<Address, String> {
    let meta = ix
        .accounts
        .get(index)
        .ok_or_else(|| format!("missing account #{index}"))?;
    if signer && !meta.signer {
        return Err(format!("account {} must sign", meta.address));
    }
    Ok(meta.address)
}

fn debit(accounts: &mut Accounts, address: &Address, lamports: u64) -> Result<(), String> {
    let account = accounts
        .get_mut(address)
        .ok_or_else(|| format!("account {address} not found"))?;
    account.lamports = account
        .lamports
        .checked_sub(lamports)
        .ok_or_else(|| format!("insufficient funds in {address}"))?;
    Ok(())
}

fn credit(accounts: &mut Accounts, address: Address, lamports: u64) -> Result<(), String> {
    let account = accounts.entry(address).or_insert_with(|| AccountInfo {
        lamports: 0,
        owner: SYSTEM_PROGRAM_ID,
        data: Vec::new(),
    });
    account.lamports = account
        .lamports
        .checked_add(lamports)
        .ok_or_else(|| "balance overflow".to_string())?;
    Ok(())
}

fn execute_system(accounts: &mut Accounts, ix: &Instruction) -> Result<(), String> {
    let instruction =
        SystemInstruction::decode(&ix.data).ok_or_else(|| "invalid system instruction".to_string())?;
    match instruction {
        SystemInstruction::Transfer { lamports } => {
            let from = account_at(ix, 0, true)?;
            let to = account_at(ix, 1, false)?;
            debit(accounts, &from, lamports)?;
            credit(accounts, to, lamports)
        }
        other => Err(format!("unsupported system instruction {other:?}")),
    }
}

fn execute_counter(accounts: &mut Accounts, ix: &Instruction) -> Result<(), String> {
    match CounterInstruction::decode(&ix.data) {
        Some(CounterInstruction::Initialize) => {
            let counter = account_at(ix, 0, true)?;
            let payer = account_at(ix, 1, true)?;
            if accounts.contains_key(&counter) {
                return Err(format!("account {counter} already in use"));
            }
            debit(accounts, &payer, COUNTER_RENT)?;
            let mut data = CounterAccount::encode_data(0);
            data.resize(COUNTER_ACCOUNT_SPACE, 0);
            accounts.insert(
                counter,
                AccountInfo {
                    lamports: COUNTER_RENT,
                    owner: COUNTER_PROGRAM_ID,
                    data,
                },
            );
            Ok(())
        }
        Some(CounterInstruction::Increment) => {
            let counter = account_at(ix, 0, false)?;
            let info = accounts
                .get_mut(&counter)
                .ok_or_else(|| format!("account {counter} not found"))?;
            let state = CounterAccount::decode(counter, info).map_err(|e| e.to_string())?;
            let count = state
                .count
                .checked_add(1)
                .ok_or_else(|| "counter overflow".to_string())?;
            info.data = CounterAccount::encode_data(count);
            Ok(())
        }
        None => Err("invalid counter instruction".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lf_01_transaction_lifecycle::LocalWallet;
    use lf_03_operations::programs::{counter, system};
    use shared_types::{Keypair, SigningIdentity, UnsignedTransaction};

    async fn signed(
        ledger: &SimulatedLedger,
        wallet: &LocalWallet,
        instructions: Vec<Instruction>,
    ) -> SignedTransaction {
        let freshness = ledger.get_freshness().await.unwrap();
        let tx = UnsignedTransaction::new(wallet.address(), freshness, instructions);
        wallet.authorize(tx).await.unwrap()
    }

    #[tokio::test]
    async fn test_transfer_moves_lamports_and_charges_fee() {
        let ledger = SimulatedLedger::default();
        let wallet = LocalWallet::generate();
        let to = Address::new([7u8; 32]);
        ledger.airdrop(wallet.address(), 1_000_000);

        let tx = signed(
            &ledger,
            &wallet,
            vec![system::transfer(wallet.address(), to, 400_000).unwrap()],
        )
        .await;
        let sig = ledger
            .send_raw(&tx.to_wire_bytes().unwrap(), SendOptions::default())
            .await
            .unwrap();

        assert_eq!(ledger.lamports(&to), 400_000);
        assert_eq!(ledger.lamports(&wallet.address()), 1_000_000 - 400_000 - FEE_PER_SIGNATURE);
        assert_eq!(ledger.status(&sig), Some(Ok(())));
    }

    #[tokio::test]
    async fn test_duplicate_signature_rejected() {
        let ledger = SimulatedLedger::default();
        let wallet = LocalWallet::generate();
        ledger.airdrop(wallet.address(), 1_000_000);

        let tx = signed(
            &ledger,
            &wallet,
            vec![system::transfer(wallet.address(), Address::new([7u8; 32]), 1).unwrap()],
        )
        .await;
        let wire = tx.to_wire_bytes().unwrap();

        assert!(ledger.send_raw(&wire, SendOptions::default()).await.is_ok());
        assert_eq!(
            ledger.send_raw(&wire, SendOptions::default()).await,
            Err(LedgerError::Rejected("already processed".to_string()))
        );
    }

    #[tokio::test]
    async fn test_failing_transaction_with_preflight_is_refused() {
        let ledger = SimulatedLedger::default();
        let wallet = LocalWallet::generate();
        ledger.airdrop(wallet.address(), 1_000_000);

        let tx = signed(&ledger, &wallet, vec![counter::increment(Address::new([5u8; 32]))]).await;
        let result = ledger
            .send_raw(&tx.to_wire_bytes().unwrap(), SendOptions::default())
            .await;

        assert!(matches!(result, Err(LedgerError::Rejected(_))));
        assert_eq!(ledger.processed_count(), 0);
        assert_eq!(ledger.lamports(&wallet.address()), 1_000_000);
    }

    #[tokio::test]
    async fn test_failing_transaction_without_preflight_fails_at_confirmation() {
        let ledger = SimulatedLedger::default();
        let wallet = LocalWallet::generate();
        ledger.airdrop(wallet.address(), 1_000_000);

        let tx = signed(&ledger, &wallet, vec![counter::increment(Address::new([5u8; 32]))]).await;
        let freshness = tx.message.freshness;
        let sig = ledger
            .send_raw(
                &tx.to_wire_bytes().unwrap(),
                SendOptions {
                    skip_preflight: true,
                },
            )
            .await
            .unwrap();

        assert!(matches!(
            ledger.confirm_transaction(&sig, &freshness).await,
            Err(LedgerError::Rejected(_))
        ));
        assert_eq!(ledger.lamports(&wallet.address()), 1_000_000 - FEE_PER_SIGNATURE);
    }

    #[tokio::test]
    async fn test_counter_initialize_and_increment() {
        let ledger = SimulatedLedger::default();
        let wallet = LocalWallet::generate();
        let counter_key = Keypair::generate();
        ledger.airdrop(wallet.address(), 10_000_000);

        let mut tx = signed(
            &ledger,
            &wallet,
            vec![counter::initialize(wallet.address(), counter_key.address())],
        )
        .await;
        tx.sign_with(&counter_key).unwrap();
        ledger
            .send_raw(&tx.to_wire_bytes().unwrap(), SendOptions::default())
            .await
            .unwrap();

        let tx = signed(&ledger, &wallet, vec![counter::increment(counter_key.address())]).await;
        ledger
            .send_raw(&tx.to_wire_bytes().unwrap(), SendOptions::default())
            .await
            .unwrap();

        let info = ledger.account(&counter_key.address()).unwrap();
        assert_eq!(
            CounterAccount::decode(counter_key.address(), &info).unwrap().count,
            1
        );
    }

    #[tokio::test]
    async fn test_only_transfer_is_executed_by_system_program() {
        let ledger = SimulatedLedger::default();
        let wallet = LocalWallet::generate();
        ledger.airdrop(wallet.address(), 1_000_000);

        let assign = Instruction::new(
            SYSTEM_PROGRAM_ID,
            vec![shared_types::AccountMeta::writable(wallet.address(), true)],
            SystemInstruction::Assign {
                owner: COUNTER_PROGRAM_ID,
            }
            .encode()
            .unwrap(),
        );
        let tx = signed(&ledger, &wallet, vec![assign]).await;
        let result = ledger
            .send_raw(&tx.to_wire_bytes().unwrap(), SendOptions::default())
            .await;

        assert!(matches!(result, Err(LedgerError::Rejected(msg)) if msg.contains("unsupported")));
        assert_eq!(ledger.account(&wallet.address()).unwrap().owner, SYSTEM_PROGRAM_ID);
    }

    #[tokio::test]
    async fn test_expired_blockhash_rejected() {
        let ledger = SimulatedLedger::default();
        let wallet = LocalWallet::generate();
        ledger.airdrop(wallet.address(), 1_000_000);

        let tx = signed(
            &ledger,
            &wallet,
            vec![system::transfer(wallet.address(), Address::new([7u8; 32]), 1).unwrap()],
        )
        .await;
        ledger.advance_slots(BLOCKHASH_VALIDITY + 1);

        assert_eq!(
            ledger
                .send_raw(&tx.to_wire_bytes().unwrap(), SendOptions::default())
                .await,
            Err(LedgerError::Rejected("blockhash expired".to_string()))
        );
    }
}
