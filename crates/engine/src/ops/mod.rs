use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, Mutex, PoisonError},
};

use sea_orm::DatabaseConnection;
use tokio::sync::OwnedMutexGuard;
use uuid::Uuid;

use crate::{
    EngineError, ResultEngine, Wallet,
    store::{SeaOrmStore, TransactionStore, WalletStore},
    uploader::{DisabledUploader, ImageUploader},
};

mod balances;
mod statistics;
mod transactions;
mod wallets;

/// Default number of read-compute-write rounds before a wallet write gives up.
pub const DEFAULT_MAX_WRITE_ATTEMPTS: u32 = 5;

pub struct Engine {
    wallets: Arc<dyn WalletStore>,
    transactions: Arc<dyn TransactionStore>,
    uploader: Arc<dyn ImageUploader>,
    locks: WalletLocks,
    max_write_attempts: u32,
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("max_write_attempts", &self.max_write_attempts)
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    async fn require_wallet(&self, wallet_id: Uuid) -> ResultEngine<Wallet> {
        self.wallets
            .wallet(wallet_id)
            .await?
            .ok_or_else(|| EngineError::WalletNotFound(wallet_id.to_string()))
    }
}

/// Per-wallet async mutexes.
///
/// Serializes read-modify-write cycles on the same wallet inside this
/// process. Cross-process races are caught by the store's version check.
#[derive(Debug, Default)]
struct WalletLocks {
    inner: Mutex<HashMap<Uuid, Arc<tokio::sync::Mutex<()>>>>,
}

impl WalletLocks {
    async fn lock(&self, wallet_id: Uuid) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            // Drop entries nobody holds or waits on.
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            Arc::clone(locks.entry(wallet_id).or_default())
        };
        lock.lock_owned().await
    }
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    wallets: Option<Arc<dyn WalletStore>>,
    transactions: Option<Arc<dyn TransactionStore>>,
    uploader: Option<Arc<dyn ImageUploader>>,
    max_write_attempts: Option<u32>,
}

impl EngineBuilder {
    /// Use the sqlite database for both wallets and transactions.
    pub fn database(self, db: DatabaseConnection) -> EngineBuilder {
        self.store(Arc::new(SeaOrmStore::new(db)))
    }

    /// Use one backend for both wallets and transactions.
    pub fn store<S>(mut self, store: Arc<S>) -> EngineBuilder
    where
        S: WalletStore + TransactionStore + 'static,
    {
        self.wallets = Some(store.clone() as Arc<dyn WalletStore>);
        self.transactions = Some(store as Arc<dyn TransactionStore>);
        self
    }

    pub fn wallets(mut self, wallets: Arc<dyn WalletStore>) -> EngineBuilder {
        self.wallets = Some(wallets);
        self
    }

    pub fn transactions(mut self, transactions: Arc<dyn TransactionStore>) -> EngineBuilder {
        self.transactions = Some(transactions);
        self
    }

    /// Image uploader. Without one, attaching a local image fails.
    pub fn uploader(mut self, uploader: Arc<dyn ImageUploader>) -> EngineBuilder {
        self.uploader = Some(uploader);
        self
    }

    pub fn max_write_attempts(mut self, attempts: u32) -> EngineBuilder {
        self.max_write_attempts = Some(attempts);
        self
    }

    /// Construct `Engine`
    pub fn build(self) -> ResultEngine<Engine> {
        let wallets = self.wallets.ok_or_else(|| {
            EngineError::StoreUnavailable("wallet store not configured".to_string())
        })?;
        let transactions = self.transactions.ok_or_else(|| {
            EngineError::StoreUnavailable("transaction store not configured".to_string())
        })?;
        Ok(Engine {
            wallets,
            transactions,
            uploader: self
                .uploader
                .unwrap_or_else(|| Arc::new(DisabledUploader)),
            locks: WalletLocks::default(),
            max_write_attempts: self
                .max_write_attempts
                .unwrap_or(DEFAULT_MAX_WRITE_ATTEMPTS)
                .max(1),
        })
    }
}
