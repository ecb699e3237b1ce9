//! Persistence contracts consumed by the engine.
//!
//! The engine never talks to a database handle directly: it holds the stores
//! behind these traits, so the sqlite backend and the in-memory backend are
//! interchangeable.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{ResultEngine, Transaction, TransactionPatch, Wallet, WalletPatch};

mod database;
mod memory;

pub use database::SeaOrmStore;
pub use memory::MemoryStore;

/// Wallet persistence.
#[async_trait]
pub trait WalletStore: Send + Sync {
    /// Fetch a wallet by id.
    async fn wallet(&self, id: Uuid) -> ResultEngine<Option<Wallet>>;

    /// List the wallets owned by `uid`.
    async fn wallets_by_owner(&self, uid: &str) -> ResultEngine<Vec<Wallet>>;

    /// Store a new wallet.
    async fn insert_wallet(&self, wallet: &Wallet) -> ResultEngine<()>;

    /// Conditional write of balance fields.
    ///
    /// Applies `patch` and bumps the version only if the stored version still
    /// equals `expected_version`. Returns `false` on a version mismatch and
    /// `WalletNotFound` if the wallet is gone.
    async fn update_wallet(
        &self,
        id: Uuid,
        expected_version: i64,
        patch: &WalletPatch,
    ) -> ResultEngine<bool>;
}

/// Transaction document persistence.
#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Fetch a transaction by id.
    async fn transaction(&self, id: Uuid) -> ResultEngine<Option<Transaction>>;

    /// Insert or overwrite the whole document, returning its id.
    async fn put_transaction(&self, transaction: &Transaction) -> ResultEngine<Uuid>;

    /// Overwrite non-financial fields. `TransactionNotFound` if absent.
    async fn update_transaction(&self, id: Uuid, patch: &TransactionPatch) -> ResultEngine<()>;

    /// Remove a transaction. Removing a missing id is not an error.
    async fn delete_transaction(&self, id: Uuid) -> ResultEngine<()>;

    /// Transactions of `uid` dated in `[from, to)`, newest first.
    async fn transactions_in_range(
        &self,
        uid: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> ResultEngine<Vec<Transaction>>;

    /// All transactions of `uid`, newest first.
    async fn transactions_by_owner(&self, uid: &str) -> ResultEngine<Vec<Transaction>>;
}
