//! Transaction primitives.
//!
//! A `Transaction` is a single income or expense event tied to exactly one
//! wallet. Its effect on that wallet is fully determined by `(kind, amount)`.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, MoneyCents, ResultEngine, util::parse_uuid};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Income,
    Expense,
}

impl TransactionType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }
}

impl TryFrom<&str> for TransactionType {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "income" => Ok(Self::Income),
            "expense" => Ok(Self::Expense),
            other => Err(EngineError::Validation(format!(
                "invalid transaction type: {other}"
            ))),
        }
    }
}

/// The balance change a transaction implies for its wallet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Effect {
    pub kind: TransactionType,
    pub amount: MoneyCents,
}

impl Effect {
    pub fn new(kind: TransactionType, amount: MoneyCents) -> ResultEngine<Self> {
        if !amount.is_positive() {
            return Err(EngineError::Validation("amount must be > 0".to_string()));
        }
        Ok(Self { kind, amount })
    }
}

/// A receipt image that still has to be uploaded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LocalImage {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Incoming image field of a transaction write.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Image {
    /// Reference returned by a previous upload, written as-is.
    Stored(String),
    /// Raw payload, uploaded before the transaction document is written.
    Local(LocalImage),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub uid: String,
    pub kind: TransactionType,
    pub amount: MoneyCents,
    pub wallet_id: Uuid,
    pub date: DateTime<Utc>,
    pub description: String,
    pub category: Option<String>,
    pub image: Option<String>,
}

impl Transaction {
    pub fn effect(&self) -> ResultEngine<Effect> {
        Effect::new(self.kind, self.amount)
    }
}

/// Partial write touching only fields that do not affect balances.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TransactionPatch {
    pub date: Option<DateTime<Utc>>,
    pub description: Option<String>,
    pub category: Option<Option<String>>,
    pub image: Option<Option<String>>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub uid: String,
    pub kind: String,
    pub amount: i64,
    pub wallet_id: String,
    pub date: DateTimeUtc,
    pub description: String,
    pub category: Option<String>,
    pub image: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::wallets::Entity",
        from = "Column::WalletId",
        to = "super::wallets::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Wallets,
}

impl Related<super::wallets::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Wallets.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Transaction> for ActiveModel {
    fn from(tx: &Transaction) -> Self {
        Self {
            id: ActiveValue::Set(tx.id.to_string()),
            uid: ActiveValue::Set(tx.uid.clone()),
            kind: ActiveValue::Set(tx.kind.as_str().to_string()),
            amount: ActiveValue::Set(tx.amount.cents()),
            wallet_id: ActiveValue::Set(tx.wallet_id.to_string()),
            date: ActiveValue::Set(tx.date),
            description: ActiveValue::Set(tx.description.clone()),
            category: ActiveValue::Set(tx.category.clone()),
            image: ActiveValue::Set(tx.image.clone()),
        }
    }
}

impl TryFrom<Model> for Transaction {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "transaction")?,
            uid: model.uid,
            kind: TransactionType::try_from(model.kind.as_str())?,
            amount: MoneyCents::new(model.amount),
            wallet_id: parse_uuid(&model.wallet_id, "wallet")?,
            date: model.date,
            description: model.description,
            category: model.category,
            image: model.image,
        })
    }
}
