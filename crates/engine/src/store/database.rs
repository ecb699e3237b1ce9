//! sea-orm backed stores.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveValue, DatabaseConnection, QueryFilter, QueryOrder, prelude::*,
    sea_query::{Expr, OnConflict},
};
use uuid::Uuid;

use crate::{
    EngineError, ResultEngine, Transaction, TransactionPatch, Wallet, WalletPatch, transactions,
    wallets,
};

use super::{TransactionStore, WalletStore};

/// Both stores on top of a single sea-orm connection.
#[derive(Clone, Debug)]
pub struct SeaOrmStore {
    database: DatabaseConnection,
}

impl SeaOrmStore {
    pub fn new(database: DatabaseConnection) -> Self {
        Self { database }
    }
}

#[async_trait]
impl WalletStore for SeaOrmStore {
    async fn wallet(&self, id: Uuid) -> ResultEngine<Option<Wallet>> {
        wallets::Entity::find_by_id(id.to_string())
            .one(&self.database)
            .await?
            .map(Wallet::try_from)
            .transpose()
    }

    async fn wallets_by_owner(&self, uid: &str) -> ResultEngine<Vec<Wallet>> {
        wallets::Entity::find()
            .filter(wallets::Column::Uid.eq(uid))
            .order_by_asc(wallets::Column::Name)
            .all(&self.database)
            .await?
            .into_iter()
            .map(Wallet::try_from)
            .collect()
    }

    async fn insert_wallet(&self, wallet: &Wallet) -> ResultEngine<()> {
        wallets::ActiveModel::from(wallet)
            .insert(&self.database)
            .await?;
        Ok(())
    }

    async fn update_wallet(
        &self,
        id: Uuid,
        expected_version: i64,
        patch: &WalletPatch,
    ) -> ResultEngine<bool> {
        let mut update = wallets::Entity::update_many()
            .col_expr(wallets::Column::Amount, Expr::value(patch.amount.cents()))
            .col_expr(wallets::Column::Version, Expr::value(expected_version + 1));
        if let Some(total) = patch.total_income {
            update = update.col_expr(wallets::Column::TotalIncome, Expr::value(total.cents()));
        }
        if let Some(total) = patch.total_expenses {
            update = update.col_expr(wallets::Column::TotalExpenses, Expr::value(total.cents()));
        }

        let result = update
            .filter(wallets::Column::Id.eq(id.to_string()))
            .filter(wallets::Column::Version.eq(expected_version))
            .exec(&self.database)
            .await?;
        if result.rows_affected > 0 {
            return Ok(true);
        }

        // Nothing matched: either the version moved or the row is gone.
        let exists = wallets::Entity::find_by_id(id.to_string())
            .one(&self.database)
            .await?
            .is_some();
        if !exists {
            return Err(EngineError::WalletNotFound(id.to_string()));
        }
        Ok(false)
    }
}

#[async_trait]
impl TransactionStore for SeaOrmStore {
    async fn transaction(&self, id: Uuid) -> ResultEngine<Option<Transaction>> {
        transactions::Entity::find_by_id(id.to_string())
            .one(&self.database)
            .await?
            .map(Transaction::try_from)
            .transpose()
    }

    async fn put_transaction(&self, transaction: &Transaction) -> ResultEngine<Uuid> {
        transactions::Entity::insert(transactions::ActiveModel::from(transaction))
            .on_conflict(
                OnConflict::column(transactions::Column::Id)
                    .update_columns([
                        transactions::Column::Uid,
                        transactions::Column::Kind,
                        transactions::Column::Amount,
                        transactions::Column::WalletId,
                        transactions::Column::Date,
                        transactions::Column::Description,
                        transactions::Column::Category,
                        transactions::Column::Image,
                    ])
                    .to_owned(),
            )
            .exec(&self.database)
            .await?;
        Ok(transaction.id)
    }

    async fn update_transaction(&self, id: Uuid, patch: &TransactionPatch) -> ResultEngine<()> {
        let exists = transactions::Entity::find_by_id(id.to_string())
            .one(&self.database)
            .await?
            .is_some();
        if !exists {
            return Err(EngineError::TransactionNotFound(id.to_string()));
        }
        if patch == &TransactionPatch::default() {
            return Ok(());
        }

        let mut active = transactions::ActiveModel {
            id: ActiveValue::Unchanged(id.to_string()),
            ..Default::default()
        };
        if let Some(date) = patch.date {
            active.date = ActiveValue::Set(date);
        }
        if let Some(description) = &patch.description {
            active.description = ActiveValue::Set(description.clone());
        }
        if let Some(category) = &patch.category {
            active.category = ActiveValue::Set(category.clone());
        }
        if let Some(image) = &patch.image {
            active.image = ActiveValue::Set(image.clone());
        }
        active.update(&self.database).await?;
        Ok(())
    }

    async fn delete_transaction(&self, id: Uuid) -> ResultEngine<()> {
        transactions::Entity::delete_by_id(id.to_string())
            .exec(&self.database)
            .await?;
        Ok(())
    }

    async fn transactions_in_range(
        &self,
        uid: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> ResultEngine<Vec<Transaction>> {
        transactions::Entity::find()
            .filter(transactions::Column::Uid.eq(uid))
            .filter(transactions::Column::Date.gte(from))
            .filter(transactions::Column::Date.lt(to))
            .order_by_desc(transactions::Column::Date)
            .order_by_desc(transactions::Column::Id)
            .all(&self.database)
            .await?
            .into_iter()
            .map(Transaction::try_from)
            .collect()
    }

    async fn transactions_by_owner(&self, uid: &str) -> ResultEngine<Vec<Transaction>> {
        transactions::Entity::find()
            .filter(transactions::Column::Uid.eq(uid))
            .order_by_desc(transactions::Column::Date)
            .order_by_desc(transactions::Column::Id)
            .all(&self.database)
            .await?
            .into_iter()
            .map(Transaction::try_from)
            .collect()
    }
}
