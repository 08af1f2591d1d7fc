//! Transfer orchestration: business rules up front, then a single call into
//! the store's atomic transfer primitive.

use std::sync::Arc;
use tracing::info;

use super::store::AccountStore;
use super::types::{Account, TransferIntent};
use crate::error::BankError;

#[derive(Clone)]
pub struct TransferOrchestrator {
    store: Arc<dyn AccountStore>,
}

impl TransferOrchestrator {
    pub fn new(store: Arc<dyn AccountStore>) -> Self {
        Self { store }
    }

    /// Execute one transfer for a caller already authorized on `source_id`.
    /// Returns the source account view with the debit applied locally; the
    /// store holds the authoritative persisted state.
    pub async fn execute(
        &self,
        source_id: i64,
        intent: &TransferIntent,
    ) -> Result<Account, BankError> {
        if intent.amount <= 0 {
            return Err(BankError::InvalidRequest("amount must be positive".into()));
        }
        if intent.to_account_number == 0 {
            return Err(BankError::InvalidRequest(
                "destination account number is required".into(),
            ));
        }

        let mut source = self.store.get(source_id).await?;

        if source.account_number == intent.to_account_number {
            return Err(BankError::InvalidRequest(
                "cannot transfer to own account".into(),
            ));
        }

        // Advisory short-circuit only. The authoritative check is the
        // conditional debit inside the store transaction.
        if source.balance < intent.amount {
            return Err(BankError::InsufficientFunds);
        }

        self.store
            .transfer(source_id, intent.to_account_number, intent.amount)
            .await?;

        info!(
            source_id,
            to = intent.to_account_number,
            amount = intent.amount,
            "transfer committed"
        );

        source.balance -= intent.amount;
        Ok(source)
    }
}
