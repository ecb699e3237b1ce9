use uuid::Uuid;

use crate::{EngineError, ResultEngine, Wallet};

use super::Engine;

fn normalize_required_name(value: &str) -> ResultEngine<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EngineError::Validation(
            "wallet name must not be empty".to_string(),
        ));
    }
    Ok(trimmed.to_string())
}

impl Engine {
    /// Return a wallet snapshot from the store.
    pub async fn wallet(&self, wallet_id: Uuid) -> ResultEngine<Wallet> {
        self.require_wallet(wallet_id).await
    }

    /// Wallets owned by `uid`, sorted by name.
    pub async fn wallets(&self, uid: &str) -> ResultEngine<Vec<Wallet>> {
        self.wallets.wallets_by_owner(uid).await
    }

    /// Add an empty wallet for `uid`.
    ///
    /// Balance and totals start at zero; only transactions move them.
    pub async fn new_wallet(&self, uid: &str, name: &str) -> ResultEngine<Wallet> {
        if uid.trim().is_empty() {
            return Err(EngineError::Validation("owner is required".to_string()));
        }
        let name = normalize_required_name(name)?;
        let wallet = Wallet::new(uid, name);
        self.wallets.insert_wallet(&wallet).await?;
        tracing::info!(wallet_id = %wallet.id, uid, "created wallet");
        Ok(wallet)
    }
}
