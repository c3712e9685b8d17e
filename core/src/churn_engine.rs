//! Churn risk engine — buckets customers by likelihood of not returning.
//!
//! Score is a weighted sum in [0, 1]:
//!   recency      days since last purchase over the horizon, capped at 1
//!   frequency    1 / orders (one-time buyers score highest)
//!   satisfaction distance of the average review from 5, over 4
//!
//! Levels come from config thresholds: Élevé ≥ high, Moyen ≥ medium, else Faible.

use crate::{
    config::ChurnRiskConfig,
    facts::{aggregate_customers, OrderFact},
    types::{mean, round2, round_to, CustomerId, Timestamp},
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Satisfaction component used when a customer left no review.
const NEUTRAL_SATISFACTION: f64 = 0.5;

// ── Public types ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChurnRiskInput {
    pub customer_unique_id:       CustomerId,
    pub days_since_last_purchase: f64,
    pub total_orders:             u32,
    pub avg_review_score:         Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ChurnRiskLevel {
    #[serde(rename = "Élevé")]
    High,
    #[serde(rename = "Moyen")]
    Medium,
    #[serde(rename = "Faible")]
    Low,
}

impl ChurnRiskLevel {
    pub fn label(&self) -> &'static str {
        match self {
            Self::High   => "Élevé",
            Self::Medium => "Moyen",
            Self::Low    => "Faible",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChurnRisk {
    pub customer_unique_id:       CustomerId,
    pub days_since_last_purchase: f64,
    pub total_orders:             u32,
    pub avg_review_score:         Option<f64>,
    // Components
    pub recency_component:        f64,
    pub frequency_component:      f64,
    pub satisfaction_component:   f64,
    pub churn_risk_score:         f64,
    pub churn_risk_level:         ChurnRiskLevel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChurnRiskSummary {
    pub churn_risk_level:        ChurnRiskLevel,
    pub customer_count:          usize,
    pub avg_risk_score:          f64,
    pub avg_days_since_purchase: f64,
    pub avg_orders:              f64,
    /// `None` when nobody in the level left a review.
    pub avg_satisfaction:        Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChurnRiskReport {
    /// Highest score first.
    pub customers: Vec<ChurnRisk>,
    pub levels:    Vec<ChurnRiskSummary>,
}

/// Inputs, scoring and per-level summary in one pass.
pub fn compute_churn_risk(
    facts: &[OrderFact],
    reference: Timestamp,
    config: &ChurnRiskConfig,
) -> ChurnRiskReport {
    let mut customers = score_churn_risk(&churn_inputs(facts, reference), config);
    customers.sort_by(|a, b| {
        b.churn_risk_score
            .total_cmp(&a.churn_risk_score)
            .then_with(|| a.customer_unique_id.cmp(&b.customer_unique_id))
    });
    let levels = summarize_churn_risk(&customers);
    ChurnRiskReport { customers, levels }
}

// ── Inputs ───────────────────────────────────────────────────────────────────

/// One input per customer. Reviews are averaged once per order, not per item.
pub fn churn_inputs(facts: &[OrderFact], reference: Timestamp) -> Vec<ChurnRiskInput> {
    let mut review_by_order: HashMap<&str, (&str, f64)> = HashMap::new();
    for f in facts {
        if let Some(score) = f.review_score {
            review_by_order
                .entry(f.order_id.as_str())
                .or_insert((f.customer_unique_id.as_str(), score));
        }
    }
    let mut reviews: HashMap<&str, Vec<f64>> = HashMap::new();
    for (customer, score) in review_by_order.into_values() {
        reviews.entry(customer).or_default().push(score);
    }

    aggregate_customers(facts, reference)
        .into_iter()
        .map(|c| {
            let avg_review_score = reviews
                .get(c.customer_unique_id.as_str())
                .and_then(|scores| mean(scores));
            ChurnRiskInput {
                days_since_last_purchase: c.recency_days,
                total_orders:             c.order_count,
                avg_review_score,
                customer_unique_id:       c.customer_unique_id,
            }
        })
        .collect()
}

// ── Scoring ──────────────────────────────────────────────────────────────────

pub fn score_churn_risk(inputs: &[ChurnRiskInput], config: &ChurnRiskConfig) -> Vec<ChurnRisk> {
    let scored: Vec<ChurnRisk> = inputs.iter().map(|i| score_one(i, config)).collect();
    log::info!("churn: scored {} customers", scored.len());
    scored
}

fn score_one(input: &ChurnRiskInput, config: &ChurnRiskConfig) -> ChurnRisk {
    let recency_component = (input.days_since_last_purchase.max(0.0)
        / config.recency_horizon_days)
        .min(1.0);
    let frequency_component = 1.0 / input.total_orders.max(1) as f64;
    let satisfaction_component = input
        .avg_review_score
        .map(|s| ((5.0 - s) / 4.0).clamp(0.0, 1.0))
        .unwrap_or(NEUTRAL_SATISFACTION);

    let churn_risk_score = (config.recency_weight * recency_component
        + config.frequency_weight * frequency_component
        + config.satisfaction_weight * satisfaction_component)
        .clamp(0.0, 1.0);

    let churn_risk_level = if churn_risk_score >= config.high_threshold {
        ChurnRiskLevel::High
    } else if churn_risk_score >= config.medium_threshold {
        ChurnRiskLevel::Medium
    } else {
        ChurnRiskLevel::Low
    };

    ChurnRisk {
        customer_unique_id: input.customer_unique_id.clone(),
        days_since_last_purchase: input.days_since_last_purchase,
        total_orders: input.total_orders,
        avg_review_score: input.avg_review_score,
        recency_component,
        frequency_component,
        satisfaction_component,
        churn_risk_score,
        churn_risk_level,
    }
}

/// Per-level aggregation ordered Élevé, Moyen, Faible. Empty levels are omitted.
pub fn summarize_churn_risk(scored: &[ChurnRisk]) -> Vec<ChurnRiskSummary> {
    let mut groups: BTreeMap<ChurnRiskLevel, Vec<&ChurnRisk>> = BTreeMap::new();
    for s in scored {
        groups.entry(s.churn_risk_level).or_default().push(s);
    }

    groups
        .into_iter()
        .map(|(level, members)| {
            let n = members.len() as f64;
            let reviews: Vec<f64> = members.iter().filter_map(|m| m.avg_review_score).collect();
            ChurnRiskSummary {
                churn_risk_level:        level,
                customer_count:          members.len(),
                avg_risk_score:          round2(members.iter().map(|m| m.churn_risk_score).sum::<f64>() / n),
                avg_days_since_purchase: round_to(
                    members.iter().map(|m| m.days_since_last_purchase).sum::<f64>() / n,
                    0,
                ),
                avg_orders:              round_to(members.iter().map(|m| m.total_orders as f64).sum::<f64>() / n, 1),
                avg_satisfaction:        mean(&reviews).map(round2),
            }
        })
        .collect()
}
