//! Data-access seam between the engines and wherever the orders live.
//!
//! `AnalyticsStore` implements it over SQLite. `InMemorySource` serves a
//! fixed set of facts and backs tests and the demo dataset.

use crate::{
    error::AnalyticsResult,
    facts::{latest_purchase, OrderFact, OrderFilter},
    types::{CustomerId, Timestamp},
};
use chrono::{NaiveDate, NaiveTime};
use std::collections::HashSet;

pub trait OrderFactSource: Send {
    /// Name used in logs and upstream errors.
    fn name(&self) -> &str;

    /// Line-item facts matching `filter`, ordered by purchase time.
    fn fetch_order_facts(&self, filter: &OrderFilter) -> AnalyticsResult<Vec<OrderFact>>;

    /// Latest purchase across the whole dataset, regardless of any filter.
    /// Recency is measured against this instant.
    fn latest_purchase(&self) -> AnalyticsResult<Option<Timestamp>>;

    /// Customers with at least one order (any status) strictly before `day`.
    fn customers_before(&self, day: NaiveDate) -> AnalyticsResult<HashSet<CustomerId>>;
}

#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    facts: Vec<OrderFact>,
}

impl InMemorySource {
    pub fn new(mut facts: Vec<OrderFact>) -> Self {
        facts.sort_by(|a, b| {
            a.purchased_at
                .cmp(&b.purchased_at)
                .then_with(|| a.order_id.cmp(&b.order_id))
        });
        Self { facts }
    }

    pub fn facts(&self) -> &[OrderFact] {
        &self.facts
    }
}

impl OrderFactSource for InMemorySource {
    fn name(&self) -> &str {
        "memory"
    }

    fn fetch_order_facts(&self, filter: &OrderFilter) -> AnalyticsResult<Vec<OrderFact>> {
        Ok(self
            .facts
            .iter()
            .filter(|f| filter.matches(f))
            .cloned()
            .collect())
    }

    fn latest_purchase(&self) -> AnalyticsResult<Option<Timestamp>> {
        Ok(latest_purchase(&self.facts))
    }

    fn customers_before(&self, day: NaiveDate) -> AnalyticsResult<HashSet<CustomerId>> {
        let cutoff = day.and_time(NaiveTime::MIN);
        Ok(self
            .facts
            .iter()
            .filter(|f| f.purchased_at < cutoff)
            .map(|f| f.customer_unique_id.clone())
            .collect())
    }
}
