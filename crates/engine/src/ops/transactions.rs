use uuid::Uuid;

use crate::{
    Effect, EngineError, Image, ResultEngine, Transaction, TransactionCmd, TransactionPatch,
    uploader::TRANSACTIONS_FOLDER, util::normalize_optional_text,
};

use super::Engine;

/// Checks caller input before any side effect happens.
fn validate_cmd(cmd: &TransactionCmd) -> ResultEngine<Effect> {
    if cmd.uid.trim().is_empty() {
        return Err(EngineError::Validation("owner is required".to_string()));
    }
    if cmd.wallet_id.is_nil() {
        return Err(EngineError::Validation("wallet is required".to_string()));
    }
    Effect::new(cmd.kind, cmd.amount)
}

fn build_transaction(id: Uuid, cmd: &TransactionCmd, image: Option<String>) -> Transaction {
    Transaction {
        id,
        uid: cmd.uid.clone(),
        kind: cmd.kind,
        amount: cmd.amount,
        wallet_id: cmd.wallet_id,
        date: cmd.date,
        description: cmd
            .description
            .as_deref()
            .map(str::trim)
            .unwrap_or_default()
            .to_string(),
        category: normalize_optional_text(cmd.category.as_deref()),
        image,
    }
}

/// Wraps the error of a failed compensation after a committed wallet write.
fn partial_failure(what: &str, cause: &EngineError, compensation: &EngineError) -> EngineError {
    tracing::error!("{what}: {cause}; compensation failed: {compensation}");
    EngineError::PartialFailure(format!(
        "{what}: {cause}; wallet compensation failed: {compensation}"
    ))
}

impl Engine {
    /// Fetch a transaction by id.
    pub async fn transaction(&self, transaction_id: Uuid) -> ResultEngine<Transaction> {
        self.transactions
            .transaction(transaction_id)
            .await?
            .ok_or_else(|| EngineError::TransactionNotFound(transaction_id.to_string()))
    }

    /// Creates a transaction and applies its effect to the wallet.
    ///
    /// Nothing is written if the wallet cannot afford an expense. If the
    /// image upload or the document write fails after the wallet was
    /// adjusted, the effect is reverted and the original error returned; if
    /// that revert fails too, the result is `PartialFailure`.
    pub async fn create_transaction(&self, cmd: TransactionCmd) -> ResultEngine<Transaction> {
        let effect = validate_cmd(&cmd)?;
        self.apply_effect(cmd.wallet_id, effect).await?;

        match self.persist_new(&cmd).await {
            Ok(transaction) => {
                tracing::info!(
                    transaction_id = %transaction.id,
                    wallet_id = %transaction.wallet_id,
                    kind = transaction.kind.as_str(),
                    amount = %transaction.amount,
                    "created transaction"
                );
                Ok(transaction)
            }
            Err(err) => {
                tracing::warn!(wallet_id = %cmd.wallet_id, "create failed after wallet update: {err}");
                match self.revert_effect(cmd.wallet_id, effect).await {
                    Ok(_) => Err(err),
                    Err(compensation) => Err(partial_failure(
                        "transaction not saved",
                        &err,
                        &compensation,
                    )),
                }
            }
        }
    }

    async fn persist_new(&self, cmd: &TransactionCmd) -> ResultEngine<Transaction> {
        let image = self.resolve_image(cmd.image.clone()).await?;
        let transaction = build_transaction(Uuid::new_v4(), cmd, image);
        self.transactions.put_transaction(&transaction).await?;
        Ok(transaction)
    }

    /// Replaces a transaction with `cmd`.
    ///
    /// When kind, amount and wallet are unchanged only the descriptive fields
    /// are rewritten. Otherwise the old effect is reverted and the new one
    /// applied (see [`Engine::move_effect`]); if the new effect does not fit,
    /// `InsufficientBalance` is returned, the document keeps its old content
    /// and the revert stays committed.
    pub async fn update_transaction(
        &self,
        transaction_id: Uuid,
        cmd: TransactionCmd,
    ) -> ResultEngine<Transaction> {
        let new_effect = validate_cmd(&cmd)?;
        let existing = self.transaction(transaction_id).await?;
        if existing.uid != cmd.uid {
            return Err(EngineError::TransactionNotFound(transaction_id.to_string()));
        }
        let old_effect = existing.effect()?;

        if old_effect == new_effect && existing.wallet_id == cmd.wallet_id {
            let image = self.resolve_image(cmd.image.clone()).await?;
            let updated = build_transaction(transaction_id, &cmd, image);
            let patch = TransactionPatch {
                date: Some(updated.date),
                description: Some(updated.description.clone()),
                category: Some(updated.category.clone()),
                image: Some(updated.image.clone()),
            };
            self.transactions
                .update_transaction(transaction_id, &patch)
                .await?;
            tracing::info!(%transaction_id, "updated transaction details");
            return Ok(updated);
        }

        self.move_effect(existing.wallet_id, old_effect, cmd.wallet_id, new_effect)
            .await?;

        let persisted = async {
            let image = self.resolve_image(cmd.image.clone()).await?;
            let updated = build_transaction(transaction_id, &cmd, image);
            self.transactions.put_transaction(&updated).await?;
            Ok::<_, EngineError>(updated)
        }
        .await;

        match persisted {
            Ok(updated) => {
                tracing::info!(
                    %transaction_id,
                    from_wallet = %existing.wallet_id,
                    to_wallet = %updated.wallet_id,
                    amount = %updated.amount,
                    "updated transaction"
                );
                Ok(updated)
            }
            Err(err) => {
                tracing::warn!(%transaction_id, "update failed after wallet move: {err}");
                match self
                    .move_effect(cmd.wallet_id, new_effect, existing.wallet_id, old_effect)
                    .await
                {
                    Ok(_) => Err(err),
                    Err(compensation) => Err(partial_failure(
                        "transaction not updated",
                        &err,
                        &compensation,
                    )),
                }
            }
        }
    }

    /// Deletes a transaction of `uid` and reverts its effect.
    ///
    /// A transaction owned by someone else is reported as missing, as in
    /// [`Engine::update_transaction`]. Returns the removed transaction. If the
    /// document cannot be deleted the effect is re-applied; if that fails
    /// too, the result is `PartialFailure`.
    pub async fn delete_transaction(
        &self,
        uid: &str,
        transaction_id: Uuid,
    ) -> ResultEngine<Transaction> {
        let existing = self.transaction(transaction_id).await?;
        if existing.uid != uid {
            return Err(EngineError::TransactionNotFound(transaction_id.to_string()));
        }
        let effect = existing.effect()?;

        self.revert_effect(existing.wallet_id, effect).await?;

        if let Err(err) = self.transactions.delete_transaction(transaction_id).await {
            tracing::warn!(%transaction_id, "delete failed after wallet revert: {err}");
            return match self.apply_effect(existing.wallet_id, effect).await {
                Ok(_) => Err(err),
                Err(compensation) => Err(partial_failure(
                    "transaction not deleted",
                    &err,
                    &compensation,
                )),
            };
        }

        tracing::info!(
            %transaction_id,
            wallet_id = %existing.wallet_id,
            "deleted transaction"
        );
        Ok(existing)
    }

    /// Turns the incoming image field into the stored reference.
    ///
    /// Only a local payload reaches the uploader.
    async fn resolve_image(&self, image: Option<Image>) -> ResultEngine<Option<String>> {
        match image {
            None => Ok(None),
            Some(Image::Stored(reference)) => Ok(Some(reference)),
            Some(Image::Local(local)) => self
                .uploader
                .upload(&local, TRANSACTIONS_FOLDER)
                .await
                .map(Some)
                .map_err(|err| match err {
                    EngineError::UploadFailed(_) => err,
                    other => EngineError::UploadFailed(other.to_string()),
                }),
        }
    }
}
