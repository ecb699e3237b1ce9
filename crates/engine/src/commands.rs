//! Command structs for engine operations.
//!
//! `TransactionCmd` carries the full caller-supplied state of a transaction,
//! used both to create one and to replace an existing one.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{Image, LocalImage, MoneyCents, TransactionType};

/// Create or replace a transaction.
#[derive(Clone, Debug)]
pub struct TransactionCmd {
    pub uid: String,
    pub kind: TransactionType,
    pub amount: MoneyCents,
    pub wallet_id: Uuid,
    pub date: DateTime<Utc>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub image: Option<Image>,
}

impl TransactionCmd {
    #[must_use]
    pub fn new(
        uid: impl Into<String>,
        kind: TransactionType,
        amount: MoneyCents,
        wallet_id: Uuid,
        date: DateTime<Utc>,
    ) -> Self {
        Self {
            uid: uid.into(),
            kind,
            amount,
            wallet_id,
            date,
            description: None,
            category: None,
            image: None,
        }
    }

    #[must_use]
    pub fn income(
        uid: impl Into<String>,
        amount: MoneyCents,
        wallet_id: Uuid,
        date: DateTime<Utc>,
    ) -> Self {
        Self::new(uid, TransactionType::Income, amount, wallet_id, date)
    }

    #[must_use]
    pub fn expense(
        uid: impl Into<String>,
        amount: MoneyCents,
        wallet_id: Uuid,
        date: DateTime<Utc>,
    ) -> Self {
        Self::new(uid, TransactionType::Expense, amount, wallet_id, date)
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Keep an image that was already uploaded.
    #[must_use]
    pub fn stored_image(mut self, reference: impl Into<String>) -> Self {
        self.image = Some(Image::Stored(reference.into()));
        self
    }

    /// Attach a raw image to upload with the write.
    #[must_use]
    pub fn local_image(mut self, file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.image = Some(Image::Local(LocalImage {
            file_name: file_name.into(),
            bytes,
        }));
        self
    }

    #[must_use]
    pub fn wallet_id(mut self, wallet_id: Uuid) -> Self {
        self.wallet_id = wallet_id;
        self
    }

    #[must_use]
    pub fn amount(mut self, amount: MoneyCents) -> Self {
        self.amount = amount;
        self
    }

    #[must_use]
    pub fn kind(mut self, kind: TransactionType) -> Self {
        self.kind = kind;
        self
    }

    #[must_use]
    pub fn date(mut self, date: DateTime<Utc>) -> Self {
        self.date = date;
        self
    }
}
