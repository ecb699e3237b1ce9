//! Time-bucketed income/expense statistics.
//!
//! Buckets are laid out up front, zero-filled, and transactions are folded
//! into the bucket whose key matches their date. Every report queries exactly
//! the days its buckets cover; a transaction without a matching bucket is
//! skipped all the same.

use std::{collections::HashMap, str::FromStr};

use chrono::{DateTime, Datelike, Days, Months, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{EngineError, MoneyCents, ResultEngine, Transaction, TransactionType};

/// How far back the weekly report reaches. The window `[today - 7, today]`
/// is inclusive at both ends.
pub const WEEKLY_DAYS_BACK: u64 = 7;
/// Months shown by the monthly report.
pub const MONTHLY_BUCKETS: u32 = 12;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatsPeriod {
    Weekly,
    Monthly,
    Yearly,
}

impl StatsPeriod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
        }
    }

    fn key(self, date: NaiveDate) -> String {
        match self {
            Self::Weekly => date.format("%Y-%m-%d").to_string(),
            Self::Monthly => date.format("%b %y").to_string(),
            Self::Yearly => date.year().to_string(),
        }
    }

    fn label(self, date: NaiveDate) -> String {
        match self {
            Self::Weekly => date.format("%a").to_string(),
            Self::Monthly => date.format("%b").to_string(),
            Self::Yearly => date.year().to_string(),
        }
    }
}

impl FromStr for StatsPeriod {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            "yearly" => Ok(Self::Yearly),
            other => Err(EngineError::Validation(format!(
                "invalid statistics period: {other}"
            ))),
        }
    }
}

/// One slot of a report.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsBucket {
    /// Matching key (`2025-03-01`, `Mar 25`, `2025`).
    pub key: String,
    /// Display label (`Sat`, `Mar`, `2025`).
    pub label: String,
    pub income: MoneyCents,
    pub expense: MoneyCents,
}

impl StatsBucket {
    fn empty(period: StatsPeriod, date: NaiveDate) -> Self {
        Self {
            key: period.key(date),
            label: period.label(date),
            income: MoneyCents::ZERO,
            expense: MoneyCents::ZERO,
        }
    }

    /// `[income, expense]`, the two stacks of a bar.
    pub fn stacks(&self) -> [MoneyCents; 2] {
        [self.income, self.expense]
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsTotals {
    pub income: MoneyCents,
    pub expense: MoneyCents,
    pub net: MoneyCents,
}

/// A report: ordered buckets plus the transactions that fed them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statistics {
    pub period: StatsPeriod,
    pub buckets: Vec<StatsBucket>,
    /// Every transaction of the queried range, newest first.
    pub transactions: Vec<Transaction>,
}

impl Statistics {
    pub fn totals(&self) -> StatsTotals {
        let (income, expense) = self
            .buckets
            .iter()
            .fold((MoneyCents::ZERO, MoneyCents::ZERO), |(income, expense), b| {
                (income.saturating_add(b.income), expense.saturating_add(b.expense))
            });
        StatsTotals {
            income,
            expense,
            net: income.checked_sub(expense).unwrap_or(MoneyCents::ZERO),
        }
    }
}

fn out_of_range() -> EngineError {
    EngineError::Validation("date out of range".to_string())
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// One daily bucket per day of `[today - 7, today]`.
pub(crate) fn weekly_buckets(today: NaiveDate) -> ResultEngine<Vec<StatsBucket>> {
    (0..=WEEKLY_DAYS_BACK)
        .rev()
        .map(|back| {
            today
                .checked_sub_days(Days::new(back))
                .map(|day| StatsBucket::empty(StatsPeriod::Weekly, day))
                .ok_or_else(out_of_range)
        })
        .collect()
}

/// Twelve monthly buckets ending with the current month.
pub(crate) fn monthly_buckets(today: NaiveDate) -> ResultEngine<Vec<StatsBucket>> {
    let first = first_of_month(today)?;
    (0..MONTHLY_BUCKETS)
        .rev()
        .map(|back| {
            first
                .checked_sub_months(Months::new(back))
                .map(|month| StatsBucket::empty(StatsPeriod::Monthly, month))
                .ok_or_else(out_of_range)
        })
        .collect()
}

/// One bucket per year in `first_year..=current_year`.
pub(crate) fn yearly_buckets(first_year: i32, current_year: i32) -> ResultEngine<Vec<StatsBucket>> {
    (first_year.min(current_year)..=current_year)
        .map(|year| {
            NaiveDate::from_ymd_opt(year, 1, 1)
                .map(|date| StatsBucket::empty(StatsPeriod::Yearly, date))
                .ok_or_else(out_of_range)
        })
        .collect()
}

fn first_of_month(date: NaiveDate) -> ResultEngine<NaiveDate> {
    date.with_day(1).ok_or_else(out_of_range)
}

/// Query window `[from, to)` of a report, `None` for the whole history.
///
/// Both start on the first day of the oldest bucket and end with today, so
/// every returned transaction lands in a bucket.
pub(crate) fn query_range(
    period: StatsPeriod,
    today: NaiveDate,
) -> ResultEngine<Option<(DateTime<Utc>, DateTime<Utc>)>> {
    let from = match period {
        StatsPeriod::Weekly => today.checked_sub_days(Days::new(WEEKLY_DAYS_BACK)),
        StatsPeriod::Monthly => {
            first_of_month(today)?.checked_sub_months(Months::new(MONTHLY_BUCKETS - 1))
        }
        StatsPeriod::Yearly => return Ok(None),
    }
    .ok_or_else(out_of_range)?;
    let to = today.succ_opt().ok_or_else(out_of_range)?;
    Ok(Some((start_of_day(from), start_of_day(to))))
}

/// Adds every transaction to the bucket matching its date.
pub(crate) fn fold_into(
    period: StatsPeriod,
    buckets: &mut [StatsBucket],
    transactions: &[Transaction],
) {
    let index: HashMap<String, usize> = buckets
        .iter()
        .enumerate()
        .map(|(i, bucket)| (bucket.key.clone(), i))
        .collect();

    for transaction in transactions {
        let key = period.key(transaction.date.date_naive());
        let Some(&i) = index.get(&key) else {
            continue;
        };
        let bucket = &mut buckets[i];
        match transaction.kind {
            TransactionType::Income => {
                bucket.income = bucket.income.saturating_add(transaction.amount);
            }
            TransactionType::Expense => {
                bucket.expense = bucket.expense.saturating_add(transaction.amount);
            }
        }
    }
}
