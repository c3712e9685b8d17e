//! Order facts and the pure reshaping steps every engine starts from.
//!
//! A fact is one order line item joined with its order, customer identity,
//! seller and review. The data-access layer hands these rows over already filtered;
//! the helpers here only regroup them.

use crate::{
    error::{AnalyticsError, AnalyticsResult},
    types::{days_between, CustomerId, OrderId, Timestamp},
};
use chrono::{Datelike, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

pub const DELIVERED: &str = "delivered";

// ── Fact row ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderFact {
    pub order_id:              OrderId,
    pub customer_unique_id:    CustomerId,
    pub order_status:          String,
    pub purchased_at:          Timestamp,
    pub delivered_customer_at: Option<Timestamp>,
    pub estimated_delivery_at: Option<Timestamp>,
    pub product_category:      Option<String>,
    pub price:                 f64,
    pub freight_value:         f64,
    pub review_score:          Option<f64>,
    pub product_id:            Option<String>,
    pub seller_id:             Option<String>,
    pub seller_state:          Option<String>,
    pub customer_state:        Option<String>,
}

impl OrderFact {
    pub fn is_delivered(&self) -> bool {
        self.order_status == DELIVERED
    }

    /// Item price plus freight, as billed to the customer.
    pub fn billed_value(&self) -> f64 {
        self.price + self.freight_value
    }

    /// Delivered no later than the estimate. Missing dates count as not on time.
    pub fn delivered_on_time(&self) -> bool {
        match (self.delivered_customer_at, self.estimated_delivery_at) {
            (Some(actual), Some(estimate)) => actual <= estimate,
            _ => false,
        }
    }

    /// Fractional days from purchase to delivery, when delivered.
    pub fn delivery_days(&self) -> Option<f64> {
        self.delivered_customer_at
            .map(|d| days_between(&self.purchased_at, &d))
    }
}

// ── Filters ──────────────────────────────────────────────────────────────────

/// Inclusive calendar-date window. `end` covers the whole day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    start: NaiveDate,
    end:   NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> AnalyticsResult<Self> {
        if end < start {
            return Err(AnalyticsError::InvalidDateRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate { self.start }
    pub fn end(&self) -> NaiveDate { self.end }

    /// First instant inside the window.
    pub fn start_instant(&self) -> Timestamp {
        self.start.and_time(NaiveTime::MIN)
    }

    /// First instant after the window.
    pub fn end_exclusive(&self) -> Timestamp {
        let next = self.end.succ_opt().unwrap_or(self.end);
        next.and_time(NaiveTime::MIN)
    }

    pub fn contains(&self, ts: &Timestamp) -> bool {
        *ts >= self.start_instant() && *ts < self.end_exclusive()
    }
}

/// Structured filter handed to the data-access layer.
/// The core never builds SQL from it; the store does, with bound parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderFilter {
    /// Purchase-date window.
    pub range:           Option<DateRange>,
    /// Delivery-date window; orders without a delivery date never match.
    pub delivered_range: Option<DateRange>,
    pub categories:      BTreeSet<String>,
    pub delivered_only:  bool,
}

impl OrderFilter {
    /// Every order of every status.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn between(start: NaiveDate, end: NaiveDate) -> AnalyticsResult<Self> {
        Ok(Self {
            range: Some(DateRange::new(start, end)?),
            ..Self::default()
        })
    }

    pub fn with_range(mut self, range: DateRange) -> Self {
        self.range = Some(range);
        self
    }

    pub fn delivered_within(mut self, range: DateRange) -> Self {
        self.delivered_range = Some(range);
        self
    }

    pub fn delivered(mut self, delivered_only: bool) -> Self {
        self.delivered_only = delivered_only;
        self
    }

    pub fn with_categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories = categories.into_iter().map(Into::into).collect();
        self
    }

    pub fn matches(&self, fact: &OrderFact) -> bool {
        if self.delivered_only && !fact.is_delivered() {
            return false;
        }
        if let Some(range) = &self.range {
            if !range.contains(&fact.purchased_at) {
                return false;
            }
        }
        if let Some(range) = &self.delivered_range {
            match &fact.delivered_customer_at {
                Some(d) if range.contains(d) => {}
                _ => return false,
            }
        }
        if !self.categories.is_empty() {
            match &fact.product_category {
                Some(c) if self.categories.contains(c) => {}
                _ => return false,
            }
        }
        true
    }

    /// Canonical parameter tuple for cache keys. Categories are a BTreeSet,
    /// so the same selection in any order yields the same key.
    pub fn cache_key(&self) -> String {
        let window = |r: &Option<DateRange>| match r {
            Some(r) => format!("{}..={}", r.start, r.end),
            None => "*".to_string(),
        };
        let categories: Vec<&str> = self.categories.iter().map(String::as_str).collect();
        format!(
            "range={};delivered_range={};categories=[{}];delivered_only={}",
            window(&self.range),
            window(&self.delivered_range),
            categories.join(","),
            self.delivered_only
        )
    }
}

// ── Customer aggregate ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerAggregate {
    pub customer_unique_id: CustomerId,
    pub order_count:        u32,
    pub total_spend:        f64,
    pub first_purchase:     Timestamp,
    pub last_purchase:      Timestamp,
    /// Days from the last purchase to the reference instant.
    pub recency_days:       f64,
}

impl CustomerAggregate {
    pub fn frequency(&self) -> u32 { self.order_count }
    pub fn monetary_value(&self) -> f64 { self.total_spend }
}

/// Latest purchase instant among the facts.
pub fn latest_purchase(facts: &[OrderFact]) -> Option<Timestamp> {
    facts.iter().map(|f| f.purchased_at).max()
}

/// One row per customer, sorted by customer id.
///
/// `reference` is the dataset-wide latest purchase; recency is measured
/// against it rather than against the filtered window.
pub fn aggregate_customers(facts: &[OrderFact], reference: Timestamp) -> Vec<CustomerAggregate> {
    struct Acc<'a> {
        orders: HashSet<&'a str>,
        spend:  f64,
        first:  Timestamp,
        last:   Timestamp,
    }

    let mut by_customer: BTreeMap<&str, Acc> = BTreeMap::new();
    for fact in facts {
        let acc = by_customer
            .entry(fact.customer_unique_id.as_str())
            .or_insert_with(|| Acc {
                orders: HashSet::new(),
                spend:  0.0,
                first:  fact.purchased_at,
                last:   fact.purchased_at,
            });
        acc.orders.insert(fact.order_id.as_str());
        acc.spend += fact.price;
        acc.first = acc.first.min(fact.purchased_at);
        acc.last = acc.last.max(fact.purchased_at);
    }

    by_customer
        .into_iter()
        .map(|(id, acc)| CustomerAggregate {
            customer_unique_id: id.to_string(),
            order_count:        acc.orders.len() as u32,
            total_spend:        acc.spend,
            first_purchase:     acc.first,
            last_purchase:      acc.last,
            recency_days:       days_between(&acc.last, &reference).max(0.0),
        })
        .collect()
}

// ── Order activity ───────────────────────────────────────────────────────────

/// One purchase by one customer, with the summed item prices of that order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerActivity {
    pub customer_unique_id: CustomerId,
    pub purchased_at:       Timestamp,
    pub revenue:            f64,
}

/// Collapse line items to one activity row per order, ordered by time.
pub fn order_activity(facts: &[OrderFact]) -> Vec<CustomerActivity> {
    let mut by_order: HashMap<&str, CustomerActivity> = HashMap::new();
    for fact in facts {
        by_order
            .entry(fact.order_id.as_str())
            .and_modify(|a| a.revenue += fact.price)
            .or_insert_with(|| CustomerActivity {
                customer_unique_id: fact.customer_unique_id.clone(),
                purchased_at:       fact.purchased_at,
                revenue:            fact.price,
            });
    }
    let mut rows: Vec<CustomerActivity> = by_order.into_values().collect();
    rows.sort_by(|a, b| {
        a.purchased_at
            .cmp(&b.purchased_at)
            .then_with(|| a.customer_unique_id.cmp(&b.customer_unique_id))
    });
    rows
}

// ── Histories ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyHistory {
    pub year:    i32,
    pub month:   u32,
    pub revenue: f64,
    pub orders:  u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyHistory {
    pub date:    NaiveDate,
    pub revenue: f64,
    pub orders:  u32,
}

/// Revenue (item prices) and distinct orders per (year, month), chronological.
pub fn monthly_history(facts: &[OrderFact]) -> Vec<MonthlyHistory> {
    let mut buckets: BTreeMap<(i32, u32), (f64, HashSet<&str>)> = BTreeMap::new();
    for fact in facts {
        let date = fact.purchased_at.date();
        let entry = buckets.entry((date.year(), date.month())).or_default();
        entry.0 += fact.price;
        entry.1.insert(fact.order_id.as_str());
    }
    buckets
        .into_iter()
        .map(|((year, month), (revenue, orders))| MonthlyHistory {
            year,
            month,
            revenue,
            orders: orders.len() as u32,
        })
        .collect()
}

/// Revenue and distinct orders per calendar day, from the first to the last
/// purchase day. Days without orders inside that span are emitted as zeros.
pub fn daily_history(facts: &[OrderFact]) -> Vec<DailyHistory> {
    let mut buckets: BTreeMap<NaiveDate, (f64, HashSet<&str>)> = BTreeMap::new();
    for fact in facts {
        let entry = buckets.entry(fact.purchased_at.date()).or_default();
        entry.0 += fact.price;
        entry.1.insert(fact.order_id.as_str());
    }
    let (Some(&first), Some(&last)) = (buckets.keys().next(), buckets.keys().next_back()) else {
        return Vec::new();
    };

    first
        .iter_days()
        .take_while(|d| *d <= last)
        .map(|date| match buckets.get(&date) {
            Some((revenue, orders)) => DailyHistory {
                date,
                revenue: *revenue,
                orders:  orders.len() as u32,
            },
            None => DailyHistory {
                date,
                revenue: 0.0,
                orders:  0,
            },
        })
        .collect()
}
