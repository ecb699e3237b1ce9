use chrono::{Datelike, NaiveDate, Utc};

use crate::{
    ResultEngine, Statistics, StatsPeriod,
    statistics::{fold_into, monthly_buckets, query_range, weekly_buckets, yearly_buckets},
};

use super::Engine;

impl Engine {
    /// Builds the `period` report of `uid` for the current UTC date.
    pub async fn statistics(&self, uid: &str, period: StatsPeriod) -> ResultEngine<Statistics> {
        self.statistics_at(uid, period, Utc::now().date_naive())
            .await
    }

    /// Builds the `period` report of `uid` as seen on `today`.
    ///
    /// - weekly: one bucket per day for the last 7 days
    /// - monthly: one bucket per month for the last 12 months
    /// - yearly: one bucket per year from the oldest transaction of the user
    ///   (or the current year when there is none) to the current year
    pub async fn statistics_at(
        &self,
        uid: &str,
        period: StatsPeriod,
        today: NaiveDate,
    ) -> ResultEngine<Statistics> {
        let transactions = match query_range(period, today)? {
            Some((from, to)) => {
                self.transactions
                    .transactions_in_range(uid, from, to)
                    .await?
            }
            None => self.transactions.transactions_by_owner(uid).await?,
        };

        let mut buckets = match period {
            StatsPeriod::Weekly => weekly_buckets(today)?,
            StatsPeriod::Monthly => monthly_buckets(today)?,
            StatsPeriod::Yearly => {
                let first_year = transactions
                    .iter()
                    .map(|t| t.date.year())
                    .min()
                    .unwrap_or(today.year());
                yearly_buckets(first_year, today.year())?
            }
        };
        fold_into(period, &mut buckets, &transactions);

        tracing::debug!(
            uid,
            period = period.as_str(),
            buckets = buckets.len(),
            transactions = transactions.len(),
            "built statistics"
        );
        Ok(Statistics {
            period,
            buckets,
            transactions,
        })
    }
}
