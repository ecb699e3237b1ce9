use uuid::Uuid;

use crate::{Effect, EngineError, ResultEngine, Wallet};

use super::Engine;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Direction {
    Apply,
    Revert,
}

impl Engine {
    /// Applies `effect` to a wallet.
    ///
    /// Income raises `amount` and `total_income`; expense lowers `amount` and
    /// raises `total_expenses`. An expense that would leave the wallet below
    /// zero fails with `InsufficientBalance` and writes nothing.
    ///
    /// Returns the wallet as committed.
    pub async fn apply_effect(&self, wallet_id: Uuid, effect: Effect) -> ResultEngine<Wallet> {
        let _guard = self.locks.lock(wallet_id).await;
        self.write_effect(wallet_id, effect, Direction::Apply, None)
            .await
    }

    /// Undoes a previously applied `effect`.
    ///
    /// Never fails on balance grounds; totals are clamped at zero.
    pub async fn revert_effect(&self, wallet_id: Uuid, effect: Effect) -> ResultEngine<Wallet> {
        let _guard = self.locks.lock(wallet_id).await;
        self.write_effect(wallet_id, effect, Direction::Revert, None)
            .await
    }

    /// Reverts `old` on `old_wallet_id`, then applies `new` on
    /// `new_wallet_id`.
    ///
    /// The sufficiency check for `new` runs against the post-revert state of
    /// the target wallet: the just-reverted snapshot when both ids match, a
    /// fresh read otherwise. If that check fails the revert stays committed
    /// and `InsufficientBalance` is returned. An unknown target wallet is
    /// rejected before anything is written; any other failure of the apply
    /// step puts `old` back on its wallet.
    ///
    /// Returns the target wallet as committed.
    pub async fn move_effect(
        &self,
        old_wallet_id: Uuid,
        old: Effect,
        new_wallet_id: Uuid,
        new: Effect,
    ) -> ResultEngine<Wallet> {
        if old_wallet_id == new_wallet_id {
            let _guard = self.locks.lock(old_wallet_id).await;
            let reverted = self
                .write_effect(old_wallet_id, old, Direction::Revert, None)
                .await?;
            return match self
                .write_effect(new_wallet_id, new, Direction::Apply, Some(reverted))
                .await
            {
                Ok(wallet) => Ok(wallet),
                Err(err) => Err(self.undo_revert(old_wallet_id, old, err).await),
            };
        }

        self.require_wallet(new_wallet_id).await?;

        {
            let _guard = self.locks.lock(old_wallet_id).await;
            self.write_effect(old_wallet_id, old, Direction::Revert, None)
                .await?;
        }

        let applied = {
            let _guard = self.locks.lock(new_wallet_id).await;
            self.write_effect(new_wallet_id, new, Direction::Apply, None)
                .await
        };
        match applied {
            Ok(wallet) => Ok(wallet),
            Err(err) => {
                let _guard = self.locks.lock(old_wallet_id).await;
                Err(self.undo_revert(old_wallet_id, old, err).await)
            }
        }
    }

    /// Handles a failed apply step of [`Engine::move_effect`]. Callers must
    /// hold the lock of `wallet_id`.
    ///
    /// `InsufficientBalance` leaves the revert committed. Anything else
    /// re-applies `old`; if that fails too the result is `PartialFailure`.
    async fn undo_revert(&self, wallet_id: Uuid, old: Effect, err: EngineError) -> EngineError {
        if matches!(err, EngineError::InsufficientBalance(_)) {
            tracing::warn!(%wallet_id, "reapply rejected, revert stays committed: {err}");
            return err;
        }

        match self
            .write_effect(wallet_id, old, Direction::Apply, None)
            .await
        {
            Ok(_) => {
                tracing::warn!(%wallet_id, "reapply failed, restored reverted effect: {err}");
                err
            }
            Err(compensation) => {
                tracing::error!(%wallet_id, "reapply failed: {err}; restore failed: {compensation}");
                EngineError::PartialFailure(format!(
                    "wallet move failed: {err}; restoring wallet {wallet_id} failed: {compensation}"
                ))
            }
        }
    }

    /// One retryable read-compute-write unit.
    ///
    /// `snapshot` seeds the first round instead of a read; later rounds always
    /// re-read. Callers must hold the wallet lock.
    async fn write_effect(
        &self,
        wallet_id: Uuid,
        effect: Effect,
        direction: Direction,
        mut snapshot: Option<Wallet>,
    ) -> ResultEngine<Wallet> {
        for attempt in 1..=self.max_write_attempts {
            let wallet = match snapshot.take() {
                Some(wallet) => wallet,
                None => self.require_wallet(wallet_id).await?,
            };
            let patch = match direction {
                Direction::Apply => wallet.applied(effect)?,
                Direction::Revert => wallet.reverted(effect)?,
            };
            tracing::debug!(
                %wallet_id,
                ?direction,
                kind = effect.kind.as_str(),
                amount = %effect.amount,
                from = %wallet.amount,
                to = %patch.amount,
                "adjusting wallet"
            );

            if self
                .wallets
                .update_wallet(wallet_id, wallet.version, &patch)
                .await?
            {
                return Ok(wallet.patched(&patch));
            }
            tracing::warn!(%wallet_id, attempt, "wallet changed underneath, retrying");
        }

        Err(EngineError::Conflict(format!(
            "wallet {wallet_id} kept changing after {} attempts",
            self.max_write_attempts
        )))
    }
}
