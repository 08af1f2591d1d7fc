//! Account domain: records, storage backends, and the transfer orchestrator.

pub mod store;
pub mod transfer;
pub mod types;

pub use store::{AccountStore, MemoryStore, StorageConfig};
pub use transfer::TransferOrchestrator;
pub use types::{Account, TransferIntent};
