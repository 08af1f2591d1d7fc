//! Account storage: trait plus the Postgres and in-memory backends.
//!
//! The transfer primitive is the only multi-row mutation. It runs the debit as
//! a single conditional UPDATE (never read-then-write) so concurrent transfers
//! against the same source serialize at the store, then credits the
//! destination, all inside one transaction. Either both adjustments become
//! visible or neither does.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};

use super::types::Account;
use crate::error::BankError;

/// Storage backend selection, resolved once at startup.
#[derive(Clone)]
pub enum StorageConfig {
    /// Process-memory backend with the same conditional-update semantics.
    /// Used by tests and local development.
    Memory,
    /// Authoritative PostgreSQL backend.
    Postgres { database_url: String },
}

// Manual Debug: postgres urls routinely embed credentials, so the url is
// elided from any formatted output.
impl fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory => f.write_str("Memory"),
            Self::Postgres { .. } => f
                .debug_struct("Postgres")
                .field("database_url", &"<redacted>")
                .finish(),
        }
    }
}

#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Persist a new record, returning it with its assigned internal id.
    async fn create(&self, account: Account) -> Result<Account, BankError>;
    async fn get(&self, id: i64) -> Result<Account, BankError>;
    async fn get_by_account_number(&self, number: i64) -> Result<Account, BankError>;
    async fn list(&self) -> Result<Vec<Account>, BankError>;
    async fn delete(&self, id: i64) -> Result<(), BankError>;
    /// Atomically move `amount` from the account with internal id `source_id`
    /// to the account addressed by `dest_number`.
    async fn transfer(&self, source_id: i64, dest_number: i64, amount: i64)
        -> Result<(), BankError>;
}

/// Connect the configured backend and make sure its schema exists.
pub async fn bootstrap(config: &StorageConfig) -> Result<Arc<dyn AccountStore>, BankError> {
    match config {
        StorageConfig::Memory => {
            info!("using in-memory account store");
            Ok(Arc::new(MemoryStore::new()))
        }
        StorageConfig::Postgres { database_url } => {
            let store = PgAccountStore::connect(database_url).await?;
            store.ensure_schema().await?;
            info!("connected to postgres account store");
            Ok(Arc::new(store))
        }
    }
}

// --- Postgres backend ---

pub struct PgAccountStore {
    pool: PgPool,
}

impl PgAccountStore {
    pub async fn connect(database_url: &str) -> Result<Self, BankError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .map_err(|e| BankError::StoreFailure(format!("postgres connect failed: {e}")))?;

        Ok(Self { pool })
    }

    /// Idempotent table bootstrap. The UNIQUE constraint on account_number is
    /// what lets the credit UPDATE match at most one row.
    pub async fn ensure_schema(&self) -> Result<(), BankError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS account (
                id BIGSERIAL PRIMARY KEY,
                first_name VARCHAR(50) NOT NULL,
                last_name VARCHAR(50) NOT NULL,
                account_number BIGINT NOT NULL UNIQUE,
                password_hash VARCHAR(100) NOT NULL,
                balance BIGINT NOT NULL CHECK (balance >= 0),
                created_at TIMESTAMPTZ NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| BankError::StoreFailure(format!("schema create failed: {e}")))?;

        Ok(())
    }
}

fn account_from_row(row: &PgRow) -> Result<Account, BankError> {
    let decode = |e: sqlx::Error| BankError::StoreFailure(format!("row decode failed: {e}"));
    Ok(Account {
        id: row.try_get("id").map_err(decode)?,
        first_name: row.try_get("first_name").map_err(decode)?,
        last_name: row.try_get("last_name").map_err(decode)?,
        account_number: row.try_get("account_number").map_err(decode)?,
        password_hash: row.try_get("password_hash").map_err(decode)?,
        balance: row.try_get("balance").map_err(decode)?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at").map_err(decode)?,
    })
}

#[async_trait]
impl AccountStore for PgAccountStore {
    async fn create(&self, account: Account) -> Result<Account, BankError> {
        let row = sqlx::query(
            r#"
            INSERT INTO account
                (first_name, last_name, account_number, password_hash, balance, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(&account.first_name)
        .bind(&account.last_name)
        .bind(account.account_number)
        .bind(&account.password_hash)
        .bind(account.balance)
        .bind(account.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| BankError::StoreFailure(format!("insert failed: {e}")))?;

        let id: i64 = row
            .try_get("id")
            .map_err(|e| BankError::StoreFailure(format!("row decode failed: {e}")))?;

        Ok(Account { id, ..account })
    }

    async fn get(&self, id: i64) -> Result<Account, BankError> {
        let row = sqlx::query("SELECT * FROM account WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| BankError::StoreFailure(format!("select failed: {e}")))?
            .ok_or_else(|| BankError::NotFound(format!("account {id}")))?;

        account_from_row(&row)
    }

    async fn get_by_account_number(&self, number: i64) -> Result<Account, BankError> {
        let row = sqlx::query("SELECT * FROM account WHERE account_number = $1")
            .bind(number)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| BankError::StoreFailure(format!("select failed: {e}")))?
            .ok_or_else(|| BankError::NotFound(format!("account number [{number}]")))?;

        account_from_row(&row)
    }

    async fn list(&self) -> Result<Vec<Account>, BankError> {
        let rows = sqlx::query("SELECT * FROM account ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| BankError::StoreFailure(format!("select failed: {e}")))?;

        rows.iter().map(account_from_row).collect()
    }

    async fn delete(&self, id: i64) -> Result<(), BankError> {
        let result = sqlx::query("DELETE FROM account WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| BankError::StoreFailure(format!("delete failed: {e}")))?;

        if result.rows_affected() == 0 {
            return Err(BankError::NotFound(format!("account {id}")));
        }
        Ok(())
    }

    async fn transfer(
        &self,
        source_id: i64,
        dest_number: i64,
        amount: i64,
    ) -> Result<(), BankError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| BankError::StoreFailure(format!("begin failed: {e}")))?;

        // Conditional debit: zero rows affected means the balance check (or
        // the row itself) did not hold at execution time.
        let debited = sqlx::query(
            r#"
            UPDATE account
            SET balance = balance - $1
            WHERE id = $2
            AND balance >= $1
            "#,
        )
        .bind(amount)
        .bind(source_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| BankError::StoreFailure(format!("debit failed: {e}")))?;

        if debited.rows_affected() == 0 {
            debug!(source_id, amount, "conditional debit matched no rows");
            return Err(BankError::InsufficientFunds);
        }

        let credited = sqlx::query(
            r#"
            UPDATE account
            SET balance = balance + $1
            WHERE account_number = $2
            "#,
        )
        .bind(amount)
        .bind(dest_number)
        .execute(&mut *tx)
        .await
        .map_err(|e| BankError::StoreFailure(format!("credit failed: {e}")))?;

        if credited.rows_affected() == 0 {
            return Err(BankError::DestinationNotFound(dest_number));
        }

        tx.commit()
            .await
            .map_err(|e| BankError::StoreFailure(format!("commit failed: {e}")))?;

        Ok(())
    }
}

// --- In-memory backend ---

/// HashMap-backed store. One mutex around the whole map makes every operation
/// an atomic unit, matching the transactional semantics of the Postgres
/// backend.
pub struct MemoryStore {
    accounts: Mutex<HashMap<i64, Account>>,
    next_id: AtomicI64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            accounts: Mutex::new(HashMap::new()),
            next_id: AtomicI64::new(1),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<i64, Account>>, BankError> {
        self.accounts
            .lock()
            .map_err(|_| BankError::StoreFailure("account map lock poisoned".into()))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn create(&self, account: Account) -> Result<Account, BankError> {
        let mut accounts = self.lock()?;
        if accounts
            .values()
            .any(|a| a.account_number == account.account_number)
        {
            return Err(BankError::StoreFailure(format!(
                "duplicate account number [{}]",
                account.account_number
            )));
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let account = Account { id, ..account };
        accounts.insert(id, account.clone());
        Ok(account)
    }

    async fn get(&self, id: i64) -> Result<Account, BankError> {
        self.lock()?
            .get(&id)
            .cloned()
            .ok_or_else(|| BankError::NotFound(format!("account {id}")))
    }

    async fn get_by_account_number(&self, number: i64) -> Result<Account, BankError> {
        self.lock()?
            .values()
            .find(|a| a.account_number == number)
            .cloned()
            .ok_or_else(|| BankError::NotFound(format!("account number [{number}]")))
    }

    async fn list(&self) -> Result<Vec<Account>, BankError> {
        let mut accounts: Vec<Account> = self.lock()?.values().cloned().collect();
        accounts.sort_by_key(|a| a.id);
        Ok(accounts)
    }

    async fn delete(&self, id: i64) -> Result<(), BankError> {
        self.lock()?
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| BankError::NotFound(format!("account {id}")))
    }

    async fn transfer(
        &self,
        source_id: i64,
        dest_number: i64,
        amount: i64,
    ) -> Result<(), BankError> {
        // All checks happen before the first mutation so a failure at any
        // stage leaves every balance untouched.
        let mut accounts = self.lock()?;

        let source_balance = match accounts.get(&source_id) {
            Some(source) if source.balance >= amount => source.balance,
            // Matches the conditional-UPDATE behavior: a missing row and an
            // underfunded row are both "zero rows affected".
            _ => return Err(BankError::InsufficientFunds),
        };

        let dest = accounts
            .values()
            .find(|a| a.account_number == dest_number)
            .ok_or(BankError::DestinationNotFound(dest_number))?;
        let dest_id = dest.id;

        // Both new balances are computed before either account is written, so
        // an arithmetic failure leaves no partial effect.
        let debited = source_balance
            .checked_sub(amount)
            .ok_or_else(|| BankError::StoreFailure("balance underflow".into()))?;
        // A same-row transfer credits the already-debited balance, like the
        // two sequential UPDATEs of the SQL backend.
        let credit_base = if dest_id == source_id {
            debited
        } else {
            dest.balance
        };
        let credited = credit_base
            .checked_add(amount)
            .ok_or_else(|| BankError::StoreFailure("balance overflow".into()))?;

        if let Some(source) = accounts.get_mut(&source_id) {
            source.balance = debited;
        }
        if let Some(dest) = accounts.get_mut(&dest_id) {
            dest.balance = credited;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seeded(store: &MemoryStore, first: &str, deposit: i64) -> Account {
        store
            .create(Account::new(first.into(), "Tester".into(), "hash".into(), deposit))
            .await
            .unwrap()
    }

    async fn balance_sum(store: &MemoryStore) -> i64 {
        store.list().await.unwrap().iter().map(|a| a.balance).sum()
    }

    #[tokio::test]
    async fn create_assigns_distinct_ids() {
        let store = MemoryStore::new();
        let a = seeded(&store, "a", 0).await;
        let b = seeded(&store, "b", 0).await;
        assert_ne!(a.id, b.id);
    }

    #[tokio::test]
    async fn create_rejects_duplicate_account_number() {
        let store = MemoryStore::new();
        let a = seeded(&store, "a", 0).await;

        let mut clash = Account::new("c".into(), "d".into(), "hash".into(), 0);
        clash.account_number = a.account_number;
        assert!(matches!(
            store.create(clash).await,
            Err(BankError::StoreFailure(_))
        ));
    }

    #[tokio::test]
    async fn repeated_get_returns_identical_values() {
        let store = MemoryStore::new();
        let a = seeded(&store, "a", 250).await;

        let first = store.get(a.id).await.unwrap();
        let second = store.get(a.id).await.unwrap();
        assert_eq!(first.balance, second.balance);
        assert_eq!(first.account_number, second.account_number);
        assert_eq!(first.created_at, second.created_at);
    }

    #[tokio::test]
    async fn delete_then_get_is_not_found() {
        let store = MemoryStore::new();
        let a = seeded(&store, "a", 0).await;

        store.delete(a.id).await.unwrap();
        assert!(matches!(store.get(a.id).await, Err(BankError::NotFound(_))));
        assert!(matches!(
            store.delete(a.id).await,
            Err(BankError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn transfer_moves_funds_and_conserves_sum() {
        let store = MemoryStore::new();
        let a = seeded(&store, "a", 1_000).await;
        let b = seeded(&store, "b", 0).await;

        store.transfer(a.id, b.account_number, 400).await.unwrap();

        assert_eq!(store.get(a.id).await.unwrap().balance, 600);
        assert_eq!(store.get(b.id).await.unwrap().balance, 400);
        assert_eq!(balance_sum(&store).await, 1_000);
    }

    #[tokio::test]
    async fn transfer_fails_on_insufficient_funds_without_side_effect() {
        let store = MemoryStore::new();
        let a = seeded(&store, "a", 600).await;
        let b = seeded(&store, "b", 400).await;

        let result = store.transfer(a.id, b.account_number, 1_500).await;
        assert!(matches!(result, Err(BankError::InsufficientFunds)));
        assert_eq!(store.get(a.id).await.unwrap().balance, 600);
        assert_eq!(store.get(b.id).await.unwrap().balance, 400);
    }

    #[tokio::test]
    async fn transfer_to_unknown_destination_leaves_source_unchanged() {
        let store = MemoryStore::new();
        let a = seeded(&store, "a", 500).await;

        let result = store.transfer(a.id, 42, 100).await;
        assert!(matches!(result, Err(BankError::DestinationNotFound(42))));
        assert_eq!(store.get(a.id).await.unwrap().balance, 500);
    }

    #[tokio::test]
    async fn credit_overflow_leaves_both_balances_untouched() {
        let store = MemoryStore::new();
        let a = seeded(&store, "a", 100).await;
        let b = seeded(&store, "b", i64::MAX).await;

        let result = store.transfer(a.id, b.account_number, 50).await;
        assert!(matches!(result, Err(BankError::StoreFailure(_))));
        // No debit without a matching credit.
        assert_eq!(store.get(a.id).await.unwrap().balance, 100);
        assert_eq!(store.get(b.id).await.unwrap().balance, i64::MAX);
    }

    #[tokio::test]
    async fn concurrent_transfers_never_overdraw() {
        let store = Arc::new(MemoryStore::new());
        let a = seeded(&store, "a", 500).await;
        let b = seeded(&store, "b", 0).await;

        let mut handles = Vec::new();
        for _ in 0..10 {
            let store = store.clone();
            let dest = b.account_number;
            handles.push(tokio::spawn(
                async move { store.transfer(a.id, dest, 100).await },
            ));
        }

        let mut succeeded = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                succeeded += 1;
            }
        }

        // Only five debits of 100 fit into a balance of 500.
        assert_eq!(succeeded, 5);
        assert_eq!(store.get(a.id).await.unwrap().balance, 0);
        assert_eq!(store.get(b.id).await.unwrap().balance, 500);
        assert_eq!(balance_sum(&store).await, 500);
    }
}
