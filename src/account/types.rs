//! Account type definitions

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// A single account record. The store exclusively owns these; everything else
/// works on transient copies.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    /// Internal storage key (serial primary key). Zero until persisted.
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    /// Externally addressable selector, distinct from `id`. Assigned at
    /// creation, used as the transfer destination.
    pub account_number: i64,
    /// Argon2id hash. Never serialized outward.
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    /// Balance in minor units. Non-negative at rest.
    pub balance: i64,
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Build a fresh, unpersisted record with a random account number.
    /// The store assigns `id` on insert.
    pub fn new(first_name: String, last_name: String, password_hash: String, deposit: i64) -> Self {
        Self {
            id: 0,
            first_name,
            last_name,
            account_number: rand::thread_rng().gen_range(100_000..1_000_000_000),
            password_hash,
            balance: deposit,
            created_at: Utc::now(),
        }
    }
}

/// One transfer request, alive for a single orchestrator invocation.
#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct TransferIntent {
    pub to_account_number: i64,
    pub amount: i64,
}
