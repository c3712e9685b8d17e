//! Customer and seller geography, rolled up by Brazilian state.
//!
//! RULE: customers are counted once per (customer_unique_id, state). Rows
//! without a state are left out.

use crate::{
    facts::OrderFact,
    types::{mean, round2},
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerStateSummary {
    pub customer_state:    String,
    pub customer_count:    usize,
    pub avg_orders:        f64,
    pub avg_total_spend:   f64,
    pub avg_order_value:   f64,
    pub total_state_spend: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SellerStateSummary {
    pub seller_state:  String,
    pub seller_count:  usize,
    pub total_orders:  usize,
    pub total_revenue: f64,
    pub avg_review:    Option<f64>,
}

/// Per-state customer spend, highest total first.
pub fn compute_customer_geography(facts: &[OrderFact]) -> Vec<CustomerStateSummary> {
    // (state, customer) → (orders, spend)
    let mut customers: HashMap<(&str, &str), (HashSet<&str>, f64)> = HashMap::new();
    for fact in facts {
        let Some(state) = fact.customer_state.as_deref() else {
            continue;
        };
        let entry = customers
            .entry((state, fact.customer_unique_id.as_str()))
            .or_default();
        entry.0.insert(fact.order_id.as_str());
        entry.1 += fact.price;
    }

    // state → per-customer (order count, spend, average order value)
    let mut states: BTreeMap<&str, Vec<(f64, f64, f64)>> = BTreeMap::new();
    for ((state, _), (orders, spend)) in customers {
        let n = orders.len() as f64;
        states.entry(state).or_default().push((n, spend, spend / n));
    }

    let mut rows: Vec<CustomerStateSummary> = states
        .into_iter()
        .map(|(state, members)| {
            let column = |f: fn(&(f64, f64, f64)) -> f64| members.iter().map(f).collect::<Vec<_>>();
            let spend = column(|m| m.1);
            CustomerStateSummary {
                customer_state:    state.to_string(),
                customer_count:    members.len(),
                avg_orders:        mean(&column(|m| m.0)).map(round2).unwrap_or(0.0),
                avg_total_spend:   mean(&spend).map(round2).unwrap_or(0.0),
                avg_order_value:   mean(&column(|m| m.2)).map(round2).unwrap_or(0.0),
                total_state_spend: round2(spend.iter().sum()),
            }
        })
        .collect();

    rows.sort_by(|a, b| {
        b.total_state_spend
            .total_cmp(&a.total_state_spend)
            .then_with(|| a.customer_state.cmp(&b.customer_state))
    });
    log::debug!("geography: {} customer states", rows.len());
    rows
}

/// Per-state seller volume, highest revenue first.
pub fn compute_seller_geography(facts: &[OrderFact]) -> Vec<SellerStateSummary> {
    #[derive(Default)]
    struct Acc<'a> {
        sellers: HashSet<&'a str>,
        orders:  HashSet<&'a str>,
        revenue: f64,
        reviews: Vec<f64>,
    }

    let mut states: BTreeMap<&str, Acc> = BTreeMap::new();
    for fact in facts {
        let (Some(seller), Some(state)) = (fact.seller_id.as_deref(), fact.seller_state.as_deref())
        else {
            continue;
        };
        let acc = states.entry(state).or_default();
        acc.sellers.insert(seller);
        acc.orders.insert(fact.order_id.as_str());
        acc.revenue += fact.price;
        if let Some(score) = fact.review_score {
            acc.reviews.push(score);
        }
    }

    let mut rows: Vec<SellerStateSummary> = states
        .into_iter()
        .map(|(state, acc)| SellerStateSummary {
            seller_state:  state.to_string(),
            seller_count:  acc.sellers.len(),
            total_orders:  acc.orders.len(),
            total_revenue: round2(acc.revenue),
            avg_review:    mean(&acc.reviews).map(round2),
        })
        .collect();

    rows.sort_by(|a, b| {
        b.total_revenue
            .total_cmp(&a.total_revenue)
            .then_with(|| a.seller_state.cmp(&b.seller_state))
    });
    rows
}
