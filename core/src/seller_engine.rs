//! Seller performance engine — per-seller KPIs, percentile ranks and tiers.
//!
//! This engine:
//!   1. Aggregates line items per seller (orders, revenue, delivery, reviews)
//!   2. Drops sellers below the configured order count
//!   3. Ranks the rest with PERCENT_RANK on revenue, review and on-time rate,
//!      best first, so 0.0 is the top of each axis
//!   4. Assigns a tier from an ordered rule table (first match wins)
//!
//! RULE: Averages and rates are taken over line items, not orders. Review
//! rates only count items whose order carries a review. A seller with no
//! review at all ranks last on the review axis.

use crate::{
    config::SellerConfig,
    facts::OrderFact,
    types::{first_of_month, mean, round2},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use std::fmt;

// ── Tiers ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SellerTier {
    #[serde(rename = "Elite")]
    Elite,
    #[serde(rename = "High Performer")]
    HighPerformer,
    #[serde(rename = "Good")]
    Good,
    #[serde(rename = "Average")]
    Average,
    #[serde(rename = "Needs Improvement")]
    NeedsImprovement,
}

/// (ceiling, tier): every percentile must be at or under the ceiling.
const TIER_RULES: [(f64, SellerTier); 4] = [
    (0.2, SellerTier::Elite),
    (0.4, SellerTier::HighPerformer),
    (0.6, SellerTier::Good),
    (0.8, SellerTier::Average),
];

impl SellerTier {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Elite            => "Elite",
            Self::HighPerformer    => "High Performer",
            Self::Good             => "Good",
            Self::Average          => "Average",
            Self::NeedsImprovement => "Needs Improvement",
        }
    }

    /// Percentiles are fractions in [0, 1], 0 being the best seller.
    pub fn from_percentiles(revenue: f64, review: f64, delivery: f64) -> Self {
        TIER_RULES
            .iter()
            .find(|(ceiling, _)| revenue <= *ceiling && review <= *ceiling && delivery <= *ceiling)
            .map(|(_, tier)| *tier)
            .unwrap_or(Self::NeedsImprovement)
    }
}

impl fmt::Display for SellerTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ── Public types ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SellerPerformance {
    pub seller_id:                   String,
    pub seller_state:                Option<String>,
    pub total_orders:                usize,
    pub unique_products:             usize,
    pub product_categories:          usize,
    pub total_revenue:               f64,
    pub average_price:               f64,
    pub avg_delivery_time:           Option<f64>,
    pub avg_review:                  Option<f64>,
    pub on_time_delivery_percentage: f64,
    pub positive_review_percentage:  Option<f64>,
    pub negative_review_percentage:  Option<f64>,
    /// Percent ranks scaled to 0..=100.
    pub revenue_percentile:          f64,
    pub review_percentile:           f64,
    pub delivery_percentile:         f64,
    pub performance_category:        SellerTier,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SellerTierSummary {
    pub performance_category: SellerTier,
    pub seller_count:         usize,
    pub total_revenue:        f64,
    pub avg_review:           Option<f64>,
    pub avg_on_time_rate:     f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SellerReport {
    /// Ordered by mean percentile, best first.
    pub sellers: Vec<SellerPerformance>,
    /// Tier order, empty tiers omitted.
    pub tiers:   Vec<SellerTierSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SellerMonthlyTrend {
    pub seller_id:          String,
    pub order_month:        NaiveDate,
    pub monthly_orders:     usize,
    pub monthly_revenue:    f64,
    pub monthly_avg_review: Option<f64>,
}

// ── Percent rank ─────────────────────────────────────────────────────────────

/// PERCENT_RANK over rows sorted best first by `cmp`:
/// (rank - 1) / (n - 1), with tied rows sharing the lowest rank.
/// A single row ranks 0. The result is indexed like the input.
pub fn percent_rank<T, F>(rows: &[T], mut cmp: F) -> Vec<f64>
where
    F: FnMut(&T, &T) -> Ordering,
{
    let n = rows.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| cmp(&rows[a], &rows[b]));

    let mut out = vec![0.0; n];
    if n < 2 {
        return out;
    }
    let mut rank_start = 0;
    for (position, &row) in order.iter().enumerate() {
        if position > 0 && cmp(&rows[order[position - 1]], &rows[row]) != Ordering::Equal {
            rank_start = position;
        }
        out[row] = rank_start as f64 / (n - 1) as f64;
    }
    out
}

/// Descending, with missing values after every present one.
fn desc_missing_last(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

// ── Engine ───────────────────────────────────────────────────────────────────

#[derive(Default)]
struct SellerAcc<'a> {
    state:      Option<&'a str>,
    orders:     HashSet<&'a str>,
    products:   HashSet<&'a str>,
    categories: HashSet<&'a str>,
    prices:     Vec<f64>,
    delivery:   Vec<f64>,
    reviews:    Vec<f64>,
    on_time:    usize,
}

fn percentage(part: usize, whole: usize) -> Option<f64> {
    (whole > 0).then(|| round2(part as f64 / whole as f64 * 100.0))
}

/// Rank every seller with at least `config.min_orders` distinct orders.
/// Items without a seller are ignored.
pub fn compute_seller_performance(facts: &[OrderFact], config: &SellerConfig) -> SellerReport {
    let mut by_seller: BTreeMap<&str, SellerAcc> = BTreeMap::new();
    for fact in facts {
        let Some(seller) = fact.seller_id.as_deref() else {
            continue;
        };
        let acc = by_seller.entry(seller).or_default();
        acc.state = acc.state.or(fact.seller_state.as_deref());
        acc.orders.insert(fact.order_id.as_str());
        if let Some(p) = fact.product_id.as_deref() {
            acc.products.insert(p);
        }
        if let Some(c) = fact.product_category.as_deref() {
            acc.categories.insert(c);
        }
        acc.prices.push(fact.price);
        if let Some(days) = fact.delivery_days() {
            acc.delivery.push(days);
        }
        if let Some(score) = fact.review_score {
            acc.reviews.push(score);
        }
        if fact.delivered_on_time() {
            acc.on_time += 1;
        }
    }

    let eligible: Vec<(&str, SellerAcc)> = by_seller
        .into_iter()
        .filter(|(_, acc)| acc.orders.len() >= config.min_orders)
        .collect();
    if eligible.is_empty() {
        return SellerReport::default();
    }

    let revenue: Vec<f64> = eligible.iter().map(|(_, a)| a.prices.iter().sum()).collect();
    let review: Vec<Option<f64>> = eligible.iter().map(|(_, a)| mean(&a.reviews)).collect();
    let on_time: Vec<f64> = eligible
        .iter()
        .map(|(_, a)| a.on_time as f64 / a.prices.len() as f64 * 100.0)
        .collect();

    let revenue_rank = percent_rank(&revenue, |a, b| b.total_cmp(a));
    let review_rank = percent_rank(&review, |a, b| desc_missing_last(*a, *b));
    let delivery_rank = percent_rank(&on_time, |a, b| b.total_cmp(a));

    let mut ranked: Vec<(f64, SellerPerformance)> = eligible
        .iter()
        .enumerate()
        .map(|(i, (seller, acc))| {
            let (r, v, d) = (revenue_rank[i], review_rank[i], delivery_rank[i]);
            let reviewed = acc.reviews.len();
            let performance = SellerPerformance {
                seller_id:                   seller.to_string(),
                seller_state:                acc.state.map(str::to_string),
                total_orders:                acc.orders.len(),
                unique_products:             acc.products.len(),
                product_categories:          acc.categories.len(),
                total_revenue:               round2(revenue[i]),
                average_price:               mean(&acc.prices).map(round2).unwrap_or(0.0),
                avg_delivery_time:           mean(&acc.delivery).map(round2),
                avg_review:                  review[i].map(round2),
                on_time_delivery_percentage: round2(on_time[i]),
                positive_review_percentage:  percentage(
                    acc.reviews.iter().filter(|s| **s >= 4.0).count(),
                    reviewed,
                ),
                negative_review_percentage:  percentage(
                    acc.reviews.iter().filter(|s| **s <= 2.0).count(),
                    reviewed,
                ),
                revenue_percentile:          round2(r * 100.0),
                review_percentile:           round2(v * 100.0),
                delivery_percentile:         round2(d * 100.0),
                performance_category:        SellerTier::from_percentiles(r, v, d),
            };
            ((r + v + d) / 3.0, performance)
        })
        .collect();

    ranked.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.seller_id.cmp(&b.1.seller_id)));
    let sellers: Vec<SellerPerformance> = ranked.into_iter().map(|(_, s)| s).collect();
    let tiers = summarize_tiers(&sellers);

    log::info!(
        "sellers: ranked {} sellers (min {} orders) into {} tiers",
        sellers.len(),
        config.min_orders,
        tiers.len()
    );
    SellerReport { sellers, tiers }
}

pub fn summarize_tiers(sellers: &[SellerPerformance]) -> Vec<SellerTierSummary> {
    let mut groups: BTreeMap<SellerTier, Vec<&SellerPerformance>> = BTreeMap::new();
    for s in sellers {
        groups.entry(s.performance_category).or_default().push(s);
    }
    groups
        .into_iter()
        .map(|(tier, members)| {
            let reviews: Vec<f64> = members.iter().filter_map(|s| s.avg_review).collect();
            let on_time: Vec<f64> = members.iter().map(|s| s.on_time_delivery_percentage).collect();
            SellerTierSummary {
                performance_category: tier,
                seller_count:         members.len(),
                total_revenue:        round2(members.iter().map(|s| s.total_revenue).sum()),
                avg_review:           mean(&reviews).map(round2),
                avg_on_time_rate:     mean(&on_time).map(round2).unwrap_or(0.0),
            }
        })
        .collect()
}

/// Orders, revenue and review per (seller, purchase month), by seller then month.
pub fn compute_seller_trends(facts: &[OrderFact]) -> Vec<SellerMonthlyTrend> {
    let mut buckets: BTreeMap<(&str, NaiveDate), (HashSet<&str>, f64, Vec<f64>)> = BTreeMap::new();
    for fact in facts {
        let Some(seller) = fact.seller_id.as_deref() else {
            continue;
        };
        let month = first_of_month(fact.purchased_at.date());
        let entry = buckets.entry((seller, month)).or_default();
        entry.0.insert(fact.order_id.as_str());
        entry.1 += fact.price;
        if let Some(score) = fact.review_score {
            entry.2.push(score);
        }
    }
    buckets
        .into_iter()
        .map(|((seller, month), (orders, revenue, reviews))| SellerMonthlyTrend {
            seller_id:          seller.to_string(),
            order_month:        month,
            monthly_orders:     orders.len(),
            monthly_revenue:    round2(revenue),
            monthly_avg_review: mean(&reviews).map(round2),
        })
        .collect()
}
