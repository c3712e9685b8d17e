//! Product category performance and monthly category trends.
//!
//! Line items without a category are left out.

use crate::{
    facts::OrderFact,
    types::{first_of_month, mean, round2},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryPerformance {
    pub category_name:     String,
    pub order_count:       usize,
    pub items_sold:        usize,
    pub total_revenue:     f64,
    pub avg_price:         f64,
    pub avg_freight_value: f64,
    pub avg_review_score:  Option<f64>,
    /// Share of the revenue of every categorized item, 0..=100.
    pub revenue_share:     f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryMonthlyTrend {
    pub order_month:   NaiveDate,
    pub category_name: String,
    pub order_count:   usize,
    pub total_revenue: f64,
}

#[derive(Default)]
struct CategoryAcc<'a> {
    orders:  HashSet<&'a str>,
    prices:  Vec<f64>,
    freight: Vec<f64>,
    reviews: Vec<f64>,
}

/// One row per category, highest revenue first.
pub fn compute_category_performance(facts: &[OrderFact]) -> Vec<CategoryPerformance> {
    let mut by_category: BTreeMap<&str, CategoryAcc> = BTreeMap::new();
    for fact in facts {
        let Some(category) = fact.product_category.as_deref() else {
            continue;
        };
        let acc = by_category.entry(category).or_default();
        acc.orders.insert(fact.order_id.as_str());
        acc.prices.push(fact.price);
        acc.freight.push(fact.freight_value);
        if let Some(score) = fact.review_score {
            acc.reviews.push(score);
        }
    }

    let grand_total: f64 = by_category
        .values()
        .map(|a| a.prices.iter().sum::<f64>())
        .sum();

    let mut rows: Vec<CategoryPerformance> = by_category
        .into_iter()
        .map(|(category, acc)| {
            let revenue: f64 = acc.prices.iter().sum();
            CategoryPerformance {
                category_name:     category.to_string(),
                order_count:       acc.orders.len(),
                items_sold:        acc.prices.len(),
                total_revenue:     round2(revenue),
                avg_price:         mean(&acc.prices).map(round2).unwrap_or(0.0),
                avg_freight_value: mean(&acc.freight).map(round2).unwrap_or(0.0),
                avg_review_score:  mean(&acc.reviews).map(round2),
                revenue_share:     if grand_total > 0.0 {
                    round2(revenue / grand_total * 100.0)
                } else {
                    0.0
                },
            }
        })
        .collect();

    rows.sort_by(|a, b| {
        b.total_revenue
            .total_cmp(&a.total_revenue)
            .then_with(|| a.category_name.cmp(&b.category_name))
    });
    log::debug!("categories: {} categories", rows.len());
    rows
}

/// Orders and revenue per (purchase month, category), chronological, then by name.
pub fn compute_category_trends(facts: &[OrderFact]) -> Vec<CategoryMonthlyTrend> {
    let mut buckets: BTreeMap<(NaiveDate, &str), (HashSet<&str>, f64)> = BTreeMap::new();
    for fact in facts {
        let Some(category) = fact.product_category.as_deref() else {
            continue;
        };
        let month = first_of_month(fact.purchased_at.date());
        let entry = buckets.entry((month, category)).or_default();
        entry.0.insert(fact.order_id.as_str());
        entry.1 += fact.price;
    }
    buckets
        .into_iter()
        .map(|((month, category), (orders, revenue))| CategoryMonthlyTrend {
            order_month:   month,
            category_name: category.to_string(),
            order_count:   orders.len(),
            total_revenue: round2(revenue),
        })
        .collect()
}
