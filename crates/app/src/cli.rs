//! Command line surface.
//!
//! Every command prints a single JSON `Response` on stdout.
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use engine::{
    Engine, EngineError, Image, LocalImage, MoneyCents, Response, Statistics, StatsBucket,
    StatsPeriod, StatsTotals, Transaction, TransactionCmd, TransactionType,
};
use serde::Serialize;
use uuid::Uuid;

/// Transactions shown with a statistics report unless `--limit` says otherwise.
const DEFAULT_REPORT_LIMIT: usize = 30;

#[derive(Parser, Debug)]
#[command(name = "tally")]
#[command(about = "Wallet balances, transactions and spending reports")]
pub struct Cli {
    /// Settings file (defaults to `settings.toml` if present).
    #[arg(long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    Wallet(WalletArgs),
    Tx(TxArgs),
    Stats(StatsArgs),
}

#[derive(Args, Debug)]
pub struct WalletArgs {
    #[command(subcommand)]
    command: WalletCommand,
}

#[derive(Subcommand, Debug)]
enum WalletCommand {
    Create {
        #[arg(long)]
        uid: String,
        #[arg(long)]
        name: String,
    },
    Show {
        #[arg(long)]
        id: Uuid,
    },
    List {
        #[arg(long)]
        uid: String,
    },
}

#[derive(Args, Debug)]
pub struct TxArgs {
    #[command(subcommand)]
    command: TxCommand,
}

#[derive(Subcommand, Debug)]
enum TxCommand {
    Create(TxCreateArgs),
    Update(TxUpdateArgs),
    Delete {
        #[arg(long)]
        id: Uuid,
        #[arg(long)]
        uid: String,
    },
    Show {
        #[arg(long)]
        id: Uuid,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Kind {
    Income,
    Expense,
}

impl From<Kind> for TransactionType {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::Income => TransactionType::Income,
            Kind::Expense => TransactionType::Expense,
        }
    }
}

#[derive(Args, Debug)]
struct TxCreateArgs {
    #[arg(long)]
    uid: String,
    #[arg(long = "type", value_enum)]
    kind: Kind,
    /// Amount such as `12.50` or `12,50`.
    #[arg(long)]
    amount: MoneyCents,
    #[arg(long)]
    wallet: Uuid,
    /// `YYYY-MM-DD` or RFC 3339; defaults to now.
    #[arg(long, value_parser = parse_date)]
    date: Option<DateTime<Utc>>,
    #[arg(long)]
    description: Option<String>,
    /// Required for expenses.
    #[arg(long)]
    category: Option<String>,
    /// Receipt image to upload.
    #[arg(long, conflicts_with = "image_ref")]
    image: Option<PathBuf>,
    /// Reference of an image that was already uploaded.
    #[arg(long)]
    image_ref: Option<String>,
}

#[derive(Args, Debug)]
struct TxUpdateArgs {
    #[arg(long)]
    id: Uuid,
    #[arg(long)]
    uid: String,
    #[arg(long = "type", value_enum)]
    kind: Option<Kind>,
    #[arg(long)]
    amount: Option<MoneyCents>,
    #[arg(long)]
    wallet: Option<Uuid>,
    #[arg(long, value_parser = parse_date)]
    date: Option<DateTime<Utc>>,
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    category: Option<String>,
    #[arg(long, conflicts_with = "no_image")]
    image: Option<PathBuf>,
    /// Drop the attached image.
    #[arg(long)]
    no_image: bool,
}

#[derive(Args, Debug)]
pub struct StatsArgs {
    #[arg(long)]
    uid: String,
    /// `weekly`, `monthly` or `yearly`.
    #[arg(long, default_value = "weekly")]
    period: StatsPeriod,
    /// Reference day instead of today (`YYYY-MM-DD`).
    #[arg(long)]
    today: Option<NaiveDate>,
    #[arg(long, default_value_t = DEFAULT_REPORT_LIMIT)]
    limit: usize,
}

#[derive(Serialize, Debug)]
struct Report {
    period: StatsPeriod,
    buckets: Vec<ReportBucket>,
    totals: StatsTotals,
    transactions: Vec<Transaction>,
    more: usize,
}

#[derive(Serialize, Debug)]
struct ReportBucket {
    key: String,
    label: String,
    stacks: [MoneyCents; 2],
}

impl From<&StatsBucket> for ReportBucket {
    fn from(bucket: &StatsBucket) -> Self {
        Self {
            key: bucket.key.clone(),
            label: bucket.label.clone(),
            stacks: bucket.stacks(),
        }
    }
}

impl Report {
    fn new(statistics: Statistics, limit: usize) -> Self {
        let totals = statistics.totals();
        let more = statistics.transactions.len().saturating_sub(limit);
        let mut transactions = statistics.transactions;
        transactions.truncate(limit);
        Self {
            period: statistics.period,
            buckets: statistics.buckets.iter().map(ReportBucket::from).collect(),
            totals,
            transactions,
            more,
        }
    }
}

fn parse_date(value: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(date) = DateTime::parse_from_rfc3339(value) {
        return Ok(date.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|day| day.and_hms_opt(0, 0, 0))
        .map(|midnight| midnight.and_utc())
        .ok_or_else(|| format!("invalid date `{value}`, expected YYYY-MM-DD or RFC 3339"))
}

/// Expenses must be filed under a category; the engine itself does not care.
fn require_category(kind: TransactionType, category: Option<&str>) -> Result<(), EngineError> {
    let missing = category.is_none_or(|category| category.trim().is_empty());
    if kind == TransactionType::Expense && missing {
        return Err(EngineError::Validation(
            "expenses need a category".to_string(),
        ));
    }
    Ok(())
}

async fn read_image(path: &Path) -> Result<Image, EngineError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|err| EngineError::UploadFailed(format!("{}: {err}", path.display())))?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    Ok(Image::Local(LocalImage { file_name, bytes }))
}

async fn create_transaction(
    engine: &Engine,
    args: TxCreateArgs,
) -> Result<Transaction, EngineError> {
    let kind = TransactionType::from(args.kind);
    require_category(kind, args.category.as_deref())?;

    let mut cmd = TransactionCmd::new(
        args.uid,
        kind,
        args.amount,
        args.wallet,
        args.date.unwrap_or_else(Utc::now),
    );
    cmd.description = args.description;
    cmd.category = args.category;
    cmd.image = match (args.image, args.image_ref) {
        (Some(path), _) => Some(read_image(&path).await?),
        (None, Some(reference)) => Some(Image::Stored(reference)),
        (None, None) => None,
    };
    engine.create_transaction(cmd).await
}

/// Fields not given on the command line keep their current value.
async fn update_transaction(
    engine: &Engine,
    args: TxUpdateArgs,
) -> Result<Transaction, EngineError> {
    let existing = engine.transaction(args.id).await?;
    let kind = args.kind.map_or(existing.kind, TransactionType::from);
    let category = args.category.or(existing.category);
    require_category(kind, category.as_deref())?;

    let mut cmd = TransactionCmd::new(
        args.uid,
        kind,
        args.amount.unwrap_or(existing.amount),
        args.wallet.unwrap_or(existing.wallet_id),
        args.date.unwrap_or(existing.date),
    );
    cmd.description = Some(args.description.unwrap_or(existing.description));
    cmd.category = category;
    cmd.image = match (args.image, args.no_image) {
        (Some(path), _) => Some(read_image(&path).await?),
        (None, true) => None,
        (None, false) => existing.image.map(Image::Stored),
    };
    engine.update_transaction(args.id, cmd).await
}

async fn statistics(engine: &Engine, args: StatsArgs) -> Result<Report, EngineError> {
    let statistics = match args.today {
        Some(today) => engine.statistics_at(&args.uid, args.period, today).await?,
        None => engine.statistics(&args.uid, args.period).await?,
    };
    Ok(Report::new(statistics, args.limit))
}

fn print<T: Serialize>(result: Result<T, EngineError>) -> Result<bool, serde_json::Error> {
    if let Err(err) = &result {
        tracing::error!("{err}");
    }
    let response = Response::from(result);
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(response.success)
}

/// Runs `command` and prints its response. Returns whether it succeeded.
pub async fn run(engine: &Engine, command: Command) -> Result<bool, serde_json::Error> {
    match command {
        Command::Wallet(WalletArgs { command }) => match command {
            WalletCommand::Create { uid, name } => print(engine.new_wallet(&uid, &name).await),
            WalletCommand::Show { id } => print(engine.wallet(id).await),
            WalletCommand::List { uid } => print(engine.wallets(&uid).await),
        },
        Command::Tx(TxArgs { command }) => match command {
            TxCommand::Create(args) => print(create_transaction(engine, args).await),
            TxCommand::Update(args) => print(update_transaction(engine, args).await),
            TxCommand::Delete { id, uid } => print(engine.delete_transaction(&uid, id).await),
            TxCommand::Show { id } => print(engine.transaction(id).await),
        },
        Command::Stats(args) => print(statistics(engine, args).await),
    }
}
