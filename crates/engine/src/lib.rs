//! Wallet ledger engine.
//!
//! Keeps each wallet's `amount`, `total_income` and `total_expenses` derived
//! from the live set of income/expense transactions, and aggregates those
//! transactions into weekly, monthly and yearly reports.

pub use commands::TransactionCmd;
pub use error::{EngineError, ErrorKind};
pub use money::MoneyCents;
pub use ops::{DEFAULT_MAX_WRITE_ATTEMPTS, Engine, EngineBuilder};
pub use response::Response;
pub use statistics::{Statistics, StatsBucket, StatsPeriod, StatsTotals};
pub use transactions::{
    Effect, Image, LocalImage, Transaction, TransactionPatch, TransactionType,
};
pub use uploader::{DirectoryUploader, DisabledUploader, ImageUploader, TRANSACTIONS_FOLDER};
pub use wallets::{Wallet, WalletPatch};

mod commands;
mod error;
mod money;
mod ops;
mod response;
mod statistics;
pub mod store;
mod transactions;
mod uploader;
mod util;
mod wallets;

pub type ResultEngine<T> = Result<T, EngineError>;
