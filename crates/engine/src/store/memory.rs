//! In-memory stores, mostly useful in tests.

use std::{
    collections::HashMap,
    sync::atomic::{AtomicBool, Ordering},
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{EngineError, ResultEngine, Transaction, TransactionPatch, Wallet, WalletPatch};

use super::{TransactionStore, WalletStore};

/// Wallets and transactions kept in process memory.
///
/// Transaction writes can be made to fail on demand, which is how the
/// partial-failure paths of the engine are exercised.
#[derive(Debug, Default)]
pub struct MemoryStore {
    wallets: RwLock<HashMap<Uuid, Wallet>>,
    transactions: RwLock<HashMap<Uuid, Transaction>>,
    failing_transaction_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later transaction put/update/delete fail with
    /// `StoreUnavailable` (or succeed again with `false`).
    pub fn fail_transaction_writes(&self, failing: bool) {
        self.failing_transaction_writes
            .store(failing, Ordering::SeqCst);
    }

    fn check_transaction_writes(&self) -> ResultEngine<()> {
        if self.failing_transaction_writes.load(Ordering::SeqCst) {
            return Err(EngineError::StoreUnavailable(
                "transaction store unreachable".to_string(),
            ));
        }
        Ok(())
    }
}

fn newest_first(mut items: Vec<Transaction>) -> Vec<Transaction> {
    items.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| b.id.cmp(&a.id)));
    items
}

#[async_trait]
impl WalletStore for MemoryStore {
    async fn wallet(&self, id: Uuid) -> ResultEngine<Option<Wallet>> {
        Ok(self.wallets.read().await.get(&id).cloned())
    }

    async fn wallets_by_owner(&self, uid: &str) -> ResultEngine<Vec<Wallet>> {
        let mut wallets: Vec<Wallet> = self
            .wallets
            .read()
            .await
            .values()
            .filter(|w| w.uid == uid)
            .cloned()
            .collect();
        wallets.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(wallets)
    }

    async fn insert_wallet(&self, wallet: &Wallet) -> ResultEngine<()> {
        let mut wallets = self.wallets.write().await;
        if wallets.contains_key(&wallet.id) {
            return Err(EngineError::StoreUnavailable(format!(
                "wallet {} already exists",
                wallet.id
            )));
        }
        wallets.insert(wallet.id, wallet.clone());
        Ok(())
    }

    async fn update_wallet(
        &self,
        id: Uuid,
        expected_version: i64,
        patch: &WalletPatch,
    ) -> ResultEngine<bool> {
        let mut wallets = self.wallets.write().await;
        let wallet = wallets
            .get_mut(&id)
            .ok_or_else(|| EngineError::WalletNotFound(id.to_string()))?;
        if wallet.version != expected_version {
            return Ok(false);
        }
        *wallet = wallet.patched(patch);
        Ok(true)
    }
}

#[async_trait]
impl TransactionStore for MemoryStore {
    async fn transaction(&self, id: Uuid) -> ResultEngine<Option<Transaction>> {
        Ok(self.transactions.read().await.get(&id).cloned())
    }

    async fn put_transaction(&self, transaction: &Transaction) -> ResultEngine<Uuid> {
        self.check_transaction_writes()?;
        self.transactions
            .write()
            .await
            .insert(transaction.id, transaction.clone());
        Ok(transaction.id)
    }

    async fn update_transaction(&self, id: Uuid, patch: &TransactionPatch) -> ResultEngine<()> {
        self.check_transaction_writes()?;
        let mut transactions = self.transactions.write().await;
        let transaction = transactions
            .get_mut(&id)
            .ok_or_else(|| EngineError::TransactionNotFound(id.to_string()))?;
        if let Some(date) = patch.date {
            transaction.date = date;
        }
        if let Some(description) = &patch.description {
            transaction.description = description.clone();
        }
        if let Some(category) = &patch.category {
            transaction.category = category.clone();
        }
        if let Some(image) = &patch.image {
            transaction.image = image.clone();
        }
        Ok(())
    }

    async fn delete_transaction(&self, id: Uuid) -> ResultEngine<()> {
        self.check_transaction_writes()?;
        self.transactions.write().await.remove(&id);
        Ok(())
    }

    async fn transactions_in_range(
        &self,
        uid: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> ResultEngine<Vec<Transaction>> {
        let items = self
            .transactions
            .read()
            .await
            .values()
            .filter(|t| t.uid == uid && t.date >= from && t.date < to)
            .cloned()
            .collect();
        Ok(newest_first(items))
    }

    async fn transactions_by_owner(&self, uid: &str) -> ResultEngine<Vec<Transaction>> {
        let items = self
            .transactions
            .read()
            .await
            .values()
            .filter(|t| t.uid == uid)
            .cloned()
            .collect();
        Ok(newest_first(items))
    }
}

#[cfg(test)]
mod tests {
    use crate::MoneyCents;

    use super::*;

    #[tokio::test]
    async fn stale_version_is_rejected() {
        let store = MemoryStore::new();
        let wallet = Wallet::new("alice", "Cash");
        store.insert_wallet(&wallet).await.unwrap();

        let patch = WalletPatch {
            amount: MoneyCents::new(100),
            ..Default::default()
        };
        assert!(store.update_wallet(wallet.id, 0, &patch).await.unwrap());
        assert!(!store.update_wallet(wallet.id, 0, &patch).await.unwrap());

        let stored = store.wallet(wallet.id).await.unwrap().unwrap();
        assert_eq!(stored.version, 1);
        assert_eq!(stored.amount, MoneyCents::new(100));
    }

    #[tokio::test]
    async fn updating_a_missing_wallet_fails() {
        let store = MemoryStore::new();
        let err = store
            .update_wallet(Uuid::new_v4(), 0, &WalletPatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::WalletNotFound(_)));
    }
}
