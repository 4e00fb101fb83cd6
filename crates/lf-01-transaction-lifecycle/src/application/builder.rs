//! # Transaction Builder
//!
//! Pure assembly of an unsigned transaction. The freshness fetch is the
//! only side effect.

use shared_types::{Address, Instruction, LedgerConnection, UnsignedTransaction};
use tracing::debug;

use crate::domain::LifecycleError;

/// Assembles instructions, a fee payer and freshness metadata.
#[derive(Clone, Copy, Debug, Default)]
pub struct TransactionBuilder;

impl TransactionBuilder {
    /// Create a new builder.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Build an unsigned transaction.
    ///
    /// Input is validated before the freshness fetch, so an invalid call
    /// never touches the connection.
    pub async fn build(
        &self,
        fee_payer: Option<Address>,
        instructions: Vec<Instruction>,
        connection: &dyn LedgerConnection,
    ) -> Result<UnsignedTransaction, LifecycleError> {
        let fee_payer = fee_payer
            .ok_or_else(|| LifecycleError::InvalidInput("fee payer is not set".to_string()))?;
        if instructions.is_empty() {
            return Err(LifecycleError::InvalidInput(
                "instruction list is empty".to_string(),
            ));
        }

        let freshness = connection
            .get_freshness()
            .await
            .map_err(|e| LifecycleError::Connection(e.to_string()))?;

        debug!(
            "[lf-01] Built transaction: fee_payer={} instructions={} blockhash={} valid_until={}",
            fee_payer,
            instructions.len(),
            freshness.blockhash,
            freshness.last_valid_block_height
        );

        Ok(UnsignedTransaction::new(fee_payer, freshness, instructions))
    }
}
