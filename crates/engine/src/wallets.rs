//! The module contains `Wallet` struct and its balance arithmetic.

use sea_orm::entity::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    EngineError, MoneyCents, ResultEngine,
    transactions::{Effect, TransactionType},
    util::parse_uuid,
};

/// A wallet.
///
/// A wallet is a money container (cash, a bank account, ...) with a running
/// balance and the cumulative income/expense totals applied to it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    /// Stable identifier for this wallet.
    pub id: Uuid,
    /// Owner of the wallet.
    pub uid: String,
    pub name: String,
    /// Current balance.
    pub amount: MoneyCents,
    /// Sum of all income amounts applied to this wallet.
    ///
    /// `None` for legacy wallets created before totals were tracked; treated
    /// as zero by the arithmetic.
    pub total_income: Option<MoneyCents>,
    /// Sum of all expense amounts applied to this wallet. See `total_income`.
    pub total_expenses: Option<MoneyCents>,
    /// Optimistic concurrency token, bumped by every engine write.
    pub version: i64,
}

/// New field values produced by a single balance adjustment.
///
/// A total left to `None` is not written.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WalletPatch {
    pub amount: MoneyCents,
    pub total_income: Option<MoneyCents>,
    pub total_expenses: Option<MoneyCents>,
}

impl Wallet {
    pub fn new(uid: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            uid: uid.into(),
            name: name.into(),
            amount: MoneyCents::ZERO,
            total_income: Some(MoneyCents::ZERO),
            total_expenses: Some(MoneyCents::ZERO),
            version: 0,
        }
    }

    /// Income total, with a missing field read as zero.
    pub fn income(&self) -> MoneyCents {
        self.total_income.unwrap_or(MoneyCents::ZERO)
    }

    /// Expense total, with a missing field read as zero.
    pub fn expenses(&self) -> MoneyCents {
        self.total_expenses.unwrap_or(MoneyCents::ZERO)
    }

    /// Computes the fields after applying `effect`.
    ///
    /// Expenses that would push the balance below zero are rejected; an
    /// expense that exactly empties the wallet is allowed.
    pub fn applied(&self, effect: Effect) -> ResultEngine<WalletPatch> {
        match effect.kind {
            TransactionType::Income => Ok(WalletPatch {
                amount: checked(self.amount.checked_add(effect.amount))?,
                total_income: Some(checked(self.income().checked_add(effect.amount))?),
                total_expenses: None,
            }),
            TransactionType::Expense => {
                let amount = checked(self.amount.checked_sub(effect.amount))?;
                if amount.is_negative() {
                    return Err(EngineError::InsufficientBalance(format!(
                        "wallet {} has {}, expense needs {}",
                        self.id, self.amount, effect.amount
                    )));
                }
                Ok(WalletPatch {
                    amount,
                    total_income: None,
                    total_expenses: Some(checked(self.expenses().checked_add(effect.amount))?),
                })
            }
        }
    }

    /// Computes the fields after undoing `effect`.
    ///
    /// No sufficiency check: a revert only gives capacity back. Totals are
    /// clamped at zero to absorb drift in historical data.
    pub fn reverted(&self, effect: Effect) -> ResultEngine<WalletPatch> {
        match effect.kind {
            TransactionType::Income => Ok(WalletPatch {
                amount: checked(self.amount.checked_sub(effect.amount))?,
                total_income: Some(self.income().saturating_sub_to_zero(effect.amount)),
                total_expenses: None,
            }),
            TransactionType::Expense => Ok(WalletPatch {
                amount: checked(self.amount.checked_add(effect.amount))?,
                total_income: None,
                total_expenses: Some(self.expenses().saturating_sub_to_zero(effect.amount)),
            }),
        }
    }

    /// Returns the wallet as it looks once `patch` is committed.
    pub fn patched(&self, patch: &WalletPatch) -> Self {
        Self {
            amount: patch.amount,
            total_income: patch.total_income.or(self.total_income),
            total_expenses: patch.total_expenses.or(self.total_expenses),
            version: self.version + 1,
            ..self.clone()
        }
    }
}

fn checked(value: Option<MoneyCents>) -> ResultEngine<MoneyCents> {
    value.ok_or_else(|| EngineError::Validation("amount too large".to_string()))
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "wallets")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub uid: String,
    pub name: String,
    pub amount: i64,
    pub total_income: Option<i64>,
    pub total_expenses: Option<i64>,
    pub version: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::transactions::Entity")]
    Transactions,
}

impl Related<super::transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Wallet> for ActiveModel {
    fn from(value: &Wallet) -> Self {
        Self {
            id: ActiveValue::Set(value.id.to_string()),
            uid: ActiveValue::Set(value.uid.clone()),
            name: ActiveValue::Set(value.name.clone()),
            amount: ActiveValue::Set(value.amount.cents()),
            total_income: ActiveValue::Set(value.total_income.map(MoneyCents::cents)),
            total_expenses: ActiveValue::Set(value.total_expenses.map(MoneyCents::cents)),
            version: ActiveValue::Set(value.version),
        }
    }
}

impl TryFrom<Model> for Wallet {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "wallet")?,
            uid: model.uid,
            name: model.name,
            amount: MoneyCents::new(model.amount),
            total_income: model.total_income.map(MoneyCents::new),
            total_expenses: model.total_expenses.map(MoneyCents::new),
            version: model.version,
        })
    }
}
