use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use sea_orm::{Database, DatabaseConnection};
use uuid::Uuid;

use engine::{
    Engine, EngineError, ErrorKind, ImageUploader, LocalImage, MoneyCents, Response,
    ResultEngine, StatsPeriod, Transaction, TransactionCmd, TransactionType, Wallet,
    WalletPatch,
    store::{MemoryStore, SeaOrmStore, TransactionStore, WalletStore},
};
use migration::MigratorTrait;

async fn database() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    db
}

async fn engine_with_db() -> (Engine, DatabaseConnection) {
    let db = database().await;
    let engine = Engine::builder().database(db.clone()).build().unwrap();
    (engine, db)
}

/// Inserts a wallet holding `amount` cents as if it had been topped up before.
async fn seed_wallet(db: &DatabaseConnection, name: &str, amount: i64) -> Uuid {
    let wallet = Wallet {
        amount: MoneyCents::new(amount),
        total_income: Some(MoneyCents::new(amount)),
        ..Wallet::new("alice", name)
    };
    SeaOrmStore::new(db.clone())
        .insert_wallet(&wallet)
        .await
        .unwrap();
    wallet.id
}

fn cents(value: i64) -> MoneyCents {
    MoneyCents::new(value)
}

fn march(day: u32) -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, day, 12, 0, 0).unwrap()
}

fn expense(wallet_id: Uuid, amount: i64) -> TransactionCmd {
    TransactionCmd::expense("alice", cents(amount), wallet_id, march(5)).category("Food")
}

fn income(wallet_id: Uuid, amount: i64) -> TransactionCmd {
    TransactionCmd::income("alice", cents(amount), wallet_id, march(5))
}

fn assert_amount_invariant(wallet: &Wallet) {
    assert_eq!(Some(wallet.amount), wallet.income().checked_sub(wallet.expenses()));
}

#[tokio::test]
async fn create_income_and_expense_moves_balance_and_totals() {
    let (engine, _db) = engine_with_db().await;
    let wallet = engine.new_wallet("alice", "Cash").await.unwrap();

    engine.create_transaction(income(wallet.id, 10_000)).await.unwrap();
    let created = engine
        .create_transaction(expense(wallet.id, 2_550).description("  groceries "))
        .await
        .unwrap();

    assert_eq!(created.description, "groceries");
    assert_eq!(created.category.as_deref(), Some("Food"));

    let wallet = engine.wallet(wallet.id).await.unwrap();
    assert_eq!(wallet.amount, cents(7_450));
    assert_eq!(wallet.total_income, Some(cents(10_000)));
    assert_eq!(wallet.total_expenses, Some(cents(2_550)));
    assert_amount_invariant(&wallet);

    assert_eq!(engine.transaction(created.id).await.unwrap(), created);
}

#[tokio::test]
async fn expense_above_balance_is_rejected_without_writes() {
    let (engine, db) = engine_with_db().await;
    let wallet_id = seed_wallet(&db, "Cash", 100).await;

    let err = engine
        .create_transaction(expense(wallet_id, 150))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InsufficientBalance(_)));

    let wallet = engine.wallet(wallet_id).await.unwrap();
    assert_eq!(wallet.amount, cents(100));
    assert_eq!(wallet.total_expenses, Some(MoneyCents::ZERO));

    let stats = engine
        .statistics("alice", StatsPeriod::Yearly)
        .await
        .unwrap();
    assert!(stats.transactions.is_empty());

    let response: Response<()> = Err(err).into();
    assert_eq!(
        response.msg.as_deref(),
        Some("Selected wallet doesn't have enough balance")
    );
}

#[tokio::test]
async fn expense_equal_to_balance_empties_the_wallet() {
    let (engine, db) = engine_with_db().await;
    let wallet_id = seed_wallet(&db, "Cash", 100).await;

    engine.create_transaction(expense(wallet_id, 100)).await.unwrap();

    let wallet = engine.wallet(wallet_id).await.unwrap();
    assert_eq!(wallet.amount, MoneyCents::ZERO);
    assert_amount_invariant(&wallet);
}

#[tokio::test]
async fn non_positive_amounts_are_validation_errors() {
    let (engine, db) = engine_with_db().await;
    let wallet_id = seed_wallet(&db, "Cash", 100).await;

    for amount in [0, -5] {
        let err = engine
            .create_transaction(income(wallet_id, amount))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationError);
    }
    assert_eq!(engine.wallet(wallet_id).await.unwrap().amount, cents(100));
}

#[tokio::test]
async fn unknown_wallet_is_reported() {
    let (engine, _db) = engine_with_db().await;

    let err = engine
        .create_transaction(income(Uuid::new_v4(), 10))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::WalletNotFound(_)));
}

#[tokio::test]
async fn create_then_delete_restores_the_wallet() {
    let (engine, db) = engine_with_db().await;
    let wallet_id = seed_wallet(&db, "Cash", 5_000).await;
    let before = engine.wallet(wallet_id).await.unwrap();

    let created = engine
        .create_transaction(expense(wallet_id, 1_200))
        .await
        .unwrap();
    let deleted = engine.delete_transaction("alice", created.id).await.unwrap();
    assert_eq!(deleted.id, created.id);

    let after = engine.wallet(wallet_id).await.unwrap();
    assert_eq!(after.amount, before.amount);
    assert_eq!(after.total_income, before.total_income);
    assert_eq!(after.total_expenses, before.total_expenses);

    let err = engine.transaction(created.id).await.unwrap_err();
    assert!(matches!(err, EngineError::TransactionNotFound(_)));
}

#[tokio::test]
async fn deleting_income_may_leave_a_negative_balance() {
    let (engine, _db) = engine_with_db().await;
    let wallet = engine.new_wallet("alice", "Cash").await.unwrap();

    let salary = engine
        .create_transaction(income(wallet.id, 1_000))
        .await
        .unwrap();
    engine.create_transaction(expense(wallet.id, 600)).await.unwrap();
    engine.delete_transaction("alice", salary.id).await.unwrap();

    let wallet = engine.wallet(wallet.id).await.unwrap();
    assert_eq!(wallet.amount, cents(-600));
    assert_eq!(wallet.total_income, Some(MoneyCents::ZERO));
    assert_eq!(wallet.total_expenses, Some(cents(600)));
}

#[tokio::test]
async fn missing_transactions_are_reported() {
    let (engine, db) = engine_with_db().await;
    let wallet_id = seed_wallet(&db, "Cash", 100).await;

    let err = engine.delete_transaction("alice", Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, EngineError::TransactionNotFound(_)));

    let err = engine
        .update_transaction(Uuid::new_v4(), income(wallet_id, 10))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::TransactionNotFound(_)));
}

#[tokio::test]
async fn updates_from_another_owner_are_not_found() {
    let (engine, db) = engine_with_db().await;
    let wallet_id = seed_wallet(&db, "Cash", 100).await;
    let created = engine.create_transaction(income(wallet_id, 10)).await.unwrap();

    let mut cmd = income(wallet_id, 20);
    cmd.uid = "mallory".to_string();
    let err = engine.update_transaction(created.id, cmd).await.unwrap_err();
    assert!(matches!(err, EngineError::TransactionNotFound(_)));
    assert_eq!(engine.wallet(wallet_id).await.unwrap().amount, cents(110));
}

#[tokio::test]
async fn deletes_from_another_owner_are_not_found() {
    let (engine, db) = engine_with_db().await;
    let wallet_id = seed_wallet(&db, "Cash", 100).await;
    let created = engine.create_transaction(income(wallet_id, 10)).await.unwrap();

    let err = engine
        .delete_transaction("mallory", created.id)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::TransactionNotFound(_)));
    assert_eq!(engine.wallet(wallet_id).await.unwrap().amount, cents(110));
    assert_eq!(engine.transaction(created.id).await.unwrap(), created);
}

#[tokio::test]
async fn description_only_update_leaves_wallet_alone() {
    let (engine, db) = engine_with_db().await;
    let wallet_id = seed_wallet(&db, "Cash", 1_000).await;
    let created = engine
        .create_transaction(expense(wallet_id, 300).description("lunch"))
        .await
        .unwrap();
    let before = engine.wallet(wallet_id).await.unwrap();

    let updated = engine
        .update_transaction(
            created.id,
            expense(wallet_id, 300)
                .description("team lunch")
                .category("Work"),
        )
        .await
        .unwrap();

    assert_eq!(updated.description, "team lunch");
    assert_eq!(updated.category.as_deref(), Some("Work"));
    assert_eq!(engine.wallet(wallet_id).await.unwrap(), before);
    assert_eq!(engine.transaction(created.id).await.unwrap(), updated);
}

#[tokio::test]
async fn changing_kind_reverts_then_applies() {
    let (engine, db) = engine_with_db().await;
    let wallet_id = seed_wallet(&db, "Cash", 1_000).await;
    let created = engine
        .create_transaction(expense(wallet_id, 300))
        .await
        .unwrap();

    let updated = engine
        .update_transaction(created.id, income(wallet_id, 300))
        .await
        .unwrap();
    assert_eq!(updated.kind, TransactionType::Income);

    let wallet = engine.wallet(wallet_id).await.unwrap();
    assert_eq!(wallet.amount, cents(1_300));
    assert_eq!(wallet.total_income, Some(cents(1_300)));
    assert_eq!(wallet.total_expenses, Some(MoneyCents::ZERO));
    assert_amount_invariant(&wallet);
}

#[tokio::test]
async fn moving_to_a_wallet_that_cannot_afford_it_keeps_the_revert() {
    let (engine, db) = engine_with_db().await;
    let a = seed_wallet(&db, "A", 280).await;
    let b = seed_wallet(&db, "B", 50).await;

    let created = engine.create_transaction(expense(a, 80)).await.unwrap();
    assert_eq!(engine.wallet(a).await.unwrap().amount, cents(200));

    let err = engine
        .update_transaction(created.id, expense(b, 80))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InsufficientBalance(_)));

    // The revert on A stays committed; B and the document are untouched.
    assert_eq!(engine.wallet(a).await.unwrap().amount, cents(280));
    assert_eq!(engine.wallet(b).await.unwrap().amount, cents(50));
    assert_eq!(engine.transaction(created.id).await.unwrap(), created);
}

#[tokio::test]
async fn moving_a_seeded_expense_checks_the_target_wallet() {
    let (engine, db) = engine_with_db().await;
    let store = SeaOrmStore::new(db.clone());
    let a = Wallet {
        amount: cents(200),
        ..Wallet::new("alice", "A")
    };
    let b = Wallet {
        amount: cents(50),
        ..Wallet::new("alice", "B")
    };
    store.insert_wallet(&a).await.unwrap();
    store.insert_wallet(&b).await.unwrap();

    let existing = Transaction {
        id: Uuid::new_v4(),
        uid: "alice".to_string(),
        kind: TransactionType::Expense,
        amount: cents(80),
        wallet_id: a.id,
        date: march(1),
        description: String::new(),
        category: Some("Food".to_string()),
        image: None,
    };
    store.put_transaction(&existing).await.unwrap();

    let err = engine
        .update_transaction(existing.id, expense(b.id, 80))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InsufficientBalance(_)));

    let reverted = engine.wallet(a.id).await.unwrap();
    assert_eq!(reverted.amount, cents(280));
    assert_eq!(reverted.total_expenses, Some(MoneyCents::ZERO));
    assert_eq!(engine.wallet(b.id).await.unwrap().amount, cents(50));
    assert_eq!(engine.transaction(existing.id).await.unwrap().wallet_id, a.id);
}

#[tokio::test]
async fn moving_to_an_unknown_wallet_changes_nothing() {
    let (engine, _db) = engine_with_db().await;
    let wallet = engine.new_wallet("alice", "Cash").await.unwrap();
    engine.create_transaction(income(wallet.id, 1_000)).await.unwrap();
    let spent = engine
        .create_transaction(expense(wallet.id, 300))
        .await
        .unwrap();
    let before = engine.wallet(wallet.id).await.unwrap();

    let err = engine
        .update_transaction(spent.id, expense(Uuid::new_v4(), 300))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::WalletNotFound(_)));
    assert_eq!(engine.wallet(wallet.id).await.unwrap(), before);
    assert_eq!(engine.transaction(spent.id).await.unwrap().wallet_id, wallet.id);

    // The ledger still adds up once the transaction is gone.
    engine.delete_transaction("alice", spent.id).await.unwrap();
    let wallet = engine.wallet(wallet.id).await.unwrap();
    assert_eq!(wallet.amount, cents(1_000));
    assert_eq!(wallet.total_expenses, Some(MoneyCents::ZERO));
    assert_amount_invariant(&wallet);
}

#[tokio::test]
async fn moving_between_wallets_updates_both() {
    let (engine, db) = engine_with_db().await;
    let a = seed_wallet(&db, "A", 280).await;
    let b = seed_wallet(&db, "B", 500).await;

    let created = engine.create_transaction(expense(a, 80)).await.unwrap();
    let updated = engine
        .update_transaction(created.id, expense(b, 120))
        .await
        .unwrap();
    assert_eq!(updated.wallet_id, b);

    let a = engine.wallet(a).await.unwrap();
    let b = engine.wallet(b).await.unwrap();
    assert_eq!(a.amount, cents(280));
    assert_eq!(a.total_expenses, Some(MoneyCents::ZERO));
    assert_eq!(b.amount, cents(380));
    assert_eq!(b.total_expenses, Some(cents(120)));
    assert_amount_invariant(&a);
    assert_amount_invariant(&b);
}

#[tokio::test]
async fn wallets_without_totals_are_read_as_zero() {
    let (engine, db) = engine_with_db().await;
    let legacy = Wallet {
        total_income: None,
        total_expenses: None,
        ..Wallet::new("alice", "Old")
    };
    SeaOrmStore::new(db.clone())
        .insert_wallet(&legacy)
        .await
        .unwrap();

    let created = engine
        .create_transaction(income(legacy.id, 500))
        .await
        .unwrap();
    let wallet = engine.wallet(legacy.id).await.unwrap();
    assert_eq!(wallet.amount, cents(500));
    assert_eq!(wallet.total_income, Some(cents(500)));

    engine.delete_transaction("alice", created.id).await.unwrap();
    let wallet = engine.wallet(legacy.id).await.unwrap();
    assert_eq!(wallet.amount, MoneyCents::ZERO);
    assert_eq!(wallet.income(), MoneyCents::ZERO);
    assert_eq!(wallet.expenses(), MoneyCents::ZERO);
}

#[tokio::test]
async fn wallets_are_listed_per_owner() {
    let (engine, _db) = engine_with_db().await;
    engine.new_wallet("alice", "Savings").await.unwrap();
    engine.new_wallet("alice", " Cash ").await.unwrap();
    engine.new_wallet("bob", "Cash").await.unwrap();

    let names: Vec<String> = engine
        .wallets("alice")
        .await
        .unwrap()
        .into_iter()
        .map(|wallet| wallet.name)
        .collect();
    assert_eq!(names, vec!["Cash", "Savings"]);

    let err = engine.new_wallet("alice", "   ").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ValidationError);
}

#[derive(Default)]
struct RecordingUploader {
    uploads: AtomicUsize,
}

#[async_trait]
impl ImageUploader for RecordingUploader {
    async fn upload(&self, image: &LocalImage, folder: &str) -> ResultEngine<String> {
        self.uploads.fetch_add(1, Ordering::SeqCst);
        Ok(format!("{folder}/{}", image.file_name))
    }
}

#[tokio::test]
async fn local_images_are_uploaded_and_stored_images_kept() {
    let db = database().await;
    let uploader = Arc::new(RecordingUploader::default());
    let engine = Engine::builder()
        .database(db.clone())
        .uploader(uploader.clone())
        .build()
        .unwrap();
    let wallet_id = seed_wallet(&db, "Cash", 1_000).await;

    let created = engine
        .create_transaction(expense(wallet_id, 100).local_image("receipt.jpg", vec![1, 2, 3]))
        .await
        .unwrap();
    assert_eq!(created.image.as_deref(), Some("transactions/receipt.jpg"));

    let updated = engine
        .update_transaction(
            created.id,
            expense(wallet_id, 100).stored_image("transactions/receipt.jpg"),
        )
        .await
        .unwrap();
    assert_eq!(updated.image, created.image);
    assert_eq!(uploader.uploads.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn failed_upload_reverts_the_wallet() {
    let (engine, db) = engine_with_db().await;
    let wallet_id = seed_wallet(&db, "Cash", 1_000).await;

    // Without an uploader configured every local image is refused.
    let err = engine
        .create_transaction(expense(wallet_id, 100).local_image("receipt.jpg", vec![1]))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UploadFailed);

    let wallet = engine.wallet(wallet_id).await.unwrap();
    assert_eq!(wallet.amount, cents(1_000));
    assert_eq!(wallet.total_expenses, Some(MoneyCents::ZERO));
}

async fn memory_engine(amount: i64) -> (Engine, Arc<MemoryStore>, Uuid) {
    let store = Arc::new(MemoryStore::new());
    let wallet = Wallet {
        amount: cents(amount),
        total_income: Some(cents(amount)),
        ..Wallet::new("alice", "Cash")
    };
    store.insert_wallet(&wallet).await.unwrap();
    let engine = Engine::builder().store(store.clone()).build().unwrap();
    (engine, store, wallet.id)
}

#[tokio::test]
async fn failed_document_writes_are_compensated() {
    let (engine, store, wallet_id) = memory_engine(1_000).await;
    let kept = engine
        .create_transaction(expense(wallet_id, 200))
        .await
        .unwrap();
    let before = engine.wallet(wallet_id).await.unwrap();

    store.fail_transaction_writes(true);

    let err = engine
        .create_transaction(expense(wallet_id, 100))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::StoreUnavailable);

    let err = engine
        .update_transaction(kept.id, expense(wallet_id, 500))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::StoreUnavailable);

    let err = engine.delete_transaction("alice", kept.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::StoreUnavailable);

    let after = engine.wallet(wallet_id).await.unwrap();
    assert_eq!(after.amount, before.amount);
    assert_eq!(after.total_income, before.total_income);
    assert_eq!(after.total_expenses, before.total_expenses);

    store.fail_transaction_writes(false);
    assert_eq!(engine.transaction(kept.id).await.unwrap(), kept);
}

/// Wallet store that accepts a fixed number of writes and then fails.
struct FlakyWallets {
    inner: Arc<MemoryStore>,
    writes_left: AtomicUsize,
}

#[async_trait]
impl WalletStore for FlakyWallets {
    async fn wallet(&self, id: Uuid) -> ResultEngine<Option<Wallet>> {
        self.inner.wallet(id).await
    }

    async fn wallets_by_owner(&self, uid: &str) -> ResultEngine<Vec<Wallet>> {
        self.inner.wallets_by_owner(uid).await
    }

    async fn insert_wallet(&self, wallet: &Wallet) -> ResultEngine<()> {
        self.inner.insert_wallet(wallet).await
    }

    async fn update_wallet(
        &self,
        id: Uuid,
        expected_version: i64,
        patch: &WalletPatch,
    ) -> ResultEngine<bool> {
        let left = self.writes_left.load(Ordering::SeqCst);
        if left == 0 {
            return Err(EngineError::StoreUnavailable("wallet store down".to_string()));
        }
        self.writes_left.store(left - 1, Ordering::SeqCst);
        self.inner.update_wallet(id, expected_version, patch).await
    }
}

#[tokio::test]
async fn failed_compensation_is_a_partial_failure() {
    let (_engine, store, wallet_id) = memory_engine(1_000).await;
    let engine = Engine::builder()
        .wallets(Arc::new(FlakyWallets {
            inner: store.clone(),
            writes_left: AtomicUsize::new(1),
        }))
        .transactions(store.clone())
        .build()
        .unwrap();
    store.fail_transaction_writes(true);

    let err = engine
        .create_transaction(expense(wallet_id, 100))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PartialFailure);

    // The applied effect could not be undone.
    assert_eq!(engine.wallet(wallet_id).await.unwrap().amount, cents(900));
}
