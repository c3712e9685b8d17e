//! Customer lifetime value engine.
//!
//! Per customer: lifespan, average order value, monthly purchase frequency and
//! an annualized value estimate, bucketed into value segments. Also groups
//! customers by how many orders they placed.

use crate::{
    config::CustomerValueConfig,
    facts::CustomerAggregate,
    types::{days_between, round2, round_to, CustomerId, Timestamp},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const DAYS_PER_MONTH: f64 = 30.0;

// ── Public types ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ValueSegment {
    #[serde(rename = "Premium")]
    Premium,
    #[serde(rename = "High Value")]
    HighValue,
    #[serde(rename = "Medium Value")]
    MediumValue,
    #[serde(rename = "Standard")]
    Standard,
}

impl ValueSegment {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Premium     => "Premium",
            Self::HighValue   => "High Value",
            Self::MediumValue => "Medium Value",
            Self::Standard    => "Standard",
        }
    }

    pub fn classify(estimated_annual_value: f64, config: &CustomerValueConfig) -> Self {
        if estimated_annual_value > config.premium_threshold {
            Self::Premium
        } else if estimated_annual_value > config.high_value_threshold {
            Self::HighValue
        } else if estimated_annual_value > config.medium_value_threshold {
            Self::MediumValue
        } else {
            Self::Standard
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerLifetimeValue {
    pub customer_unique_id:         CustomerId,
    pub order_count:                u32,
    pub total_spend:                f64,
    pub first_purchase:             Timestamp,
    pub last_purchase:              Timestamp,
    pub customer_lifespan_days:     f64,
    pub average_order_value:        f64,
    pub purchase_frequency_monthly: f64,
    pub estimated_annual_value:     f64,
    pub customer_segment:           ValueSegment,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueSegmentSummary {
    pub customer_segment:       ValueSegment,
    pub customer_count:         usize,
    pub avg_orders:             f64,
    pub avg_total_spend:        f64,
    pub avg_lifespan_days:      f64,
    pub avg_order_value:        f64,
    pub avg_purchase_frequency: f64,
    pub avg_annual_value:       f64,
    pub total_annual_value:     f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FrequencyBucket {
    #[serde(rename = "One-time")]
    OneTime,
    #[serde(rename = "2-3 orders")]
    TwoToThree,
    #[serde(rename = "4-6 orders")]
    FourToSix,
    #[serde(rename = "7+ orders")]
    SevenPlus,
}

impl FrequencyBucket {
    pub fn for_orders(order_count: u32) -> Self {
        match order_count {
            0 | 1 => Self::OneTime,
            2..=3 => Self::TwoToThree,
            4..=6 => Self::FourToSix,
            _     => Self::SevenPlus,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::OneTime    => "One-time",
            Self::TwoToThree => "2-3 orders",
            Self::FourToSix  => "4-6 orders",
            Self::SevenPlus  => "7+ orders",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrequencyBucketSummary {
    pub purchase_frequency: FrequencyBucket,
    pub customer_count:     usize,
    pub avg_lifespan_days:  f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CustomerValueReport {
    pub customers: Vec<CustomerLifetimeValue>,
    pub segments:  Vec<ValueSegmentSummary>,
    pub frequency: Vec<FrequencyBucketSummary>,
}

// ── Engine ───────────────────────────────────────────────────────────────────

pub fn lifetime_value(c: &CustomerAggregate, config: &CustomerValueConfig) -> CustomerLifetimeValue {
    let orders = c.order_count.max(1) as f64;
    let lifespan = days_between(&c.first_purchase, &c.last_purchase).max(1.0);
    let average_order_value = c.total_spend / orders;

    let (frequency, annual) = if c.order_count <= 1 {
        (1.0, c.total_spend)
    } else {
        let frequency = orders / (lifespan / DAYS_PER_MONTH);
        (frequency, average_order_value * frequency * 12.0)
    };

    CustomerLifetimeValue {
        customer_unique_id:         c.customer_unique_id.clone(),
        order_count:                c.order_count,
        total_spend:                round2(c.total_spend),
        first_purchase:             c.first_purchase,
        last_purchase:              c.last_purchase,
        customer_lifespan_days:     round2(lifespan),
        average_order_value:        round2(average_order_value),
        purchase_frequency_monthly: round_to(frequency, 4),
        estimated_annual_value:     round2(annual),
        customer_segment:           ValueSegment::classify(annual, config),
    }
}

/// Score every customer, summarize per value segment and per order-count bucket.
pub fn compute_customer_value(
    customers: &[CustomerAggregate],
    config: &CustomerValueConfig,
) -> CustomerValueReport {
    let mut values: Vec<CustomerLifetimeValue> =
        customers.iter().map(|c| lifetime_value(c, config)).collect();
    values.sort_by(|a, b| {
        b.estimated_annual_value
            .total_cmp(&a.estimated_annual_value)
            .then_with(|| a.customer_unique_id.cmp(&b.customer_unique_id))
    });

    let segments = summarize_value_segments(&values);
    let frequency = summarize_frequency(&values);
    log::info!(
        "customer_value: {} customers, {} segments",
        values.len(),
        segments.len()
    );

    CustomerValueReport { customers: values, segments, frequency }
}

fn summarize_value_segments(values: &[CustomerLifetimeValue]) -> Vec<ValueSegmentSummary> {
    let mut groups: BTreeMap<ValueSegment, Vec<&CustomerLifetimeValue>> = BTreeMap::new();
    for v in values {
        groups.entry(v.customer_segment).or_default().push(v);
    }

    let mut out: Vec<ValueSegmentSummary> = groups
        .into_iter()
        .map(|(segment, members)| {
            let n = members.len() as f64;
            let avg = |f: fn(&CustomerLifetimeValue) -> f64| members.iter().map(|m| f(m)).sum::<f64>() / n;
            ValueSegmentSummary {
                customer_segment:       segment,
                customer_count:         members.len(),
                avg_orders:             round2(avg(|m| m.order_count as f64)),
                avg_total_spend:        round2(avg(|m| m.total_spend)),
                avg_lifespan_days:      round2(avg(|m| m.customer_lifespan_days)),
                avg_order_value:        round2(avg(|m| m.average_order_value)),
                avg_purchase_frequency: round_to(avg(|m| m.purchase_frequency_monthly), 4),
                avg_annual_value:       round2(avg(|m| m.estimated_annual_value)),
                total_annual_value:     round2(members.iter().map(|m| m.estimated_annual_value).sum()),
            }
        })
        .collect();

    out.sort_by(|a, b| b.avg_annual_value.total_cmp(&a.avg_annual_value));
    out
}

fn summarize_frequency(values: &[CustomerLifetimeValue]) -> Vec<FrequencyBucketSummary> {
    let mut groups: BTreeMap<FrequencyBucket, Vec<f64>> = BTreeMap::new();
    for v in values {
        groups
            .entry(FrequencyBucket::for_orders(v.order_count))
            .or_default()
            .push(v.customer_lifespan_days);
    }
    groups
        .into_iter()
        .map(|(bucket, lifespans)| FrequencyBucketSummary {
            purchase_frequency: bucket,
            customer_count:     lifespans.len(),
            avg_lifespan_days:  round2(lifespans.iter().sum::<f64>() / lifespans.len() as f64),
        })
        .collect()
}
