use olist_core::{
    churn_engine::{churn_inputs, compute_churn_risk, score_churn_risk, ChurnRiskInput, ChurnRiskLevel},
    config::AnalyticsConfig,
    facts::OrderFact,
};
use chrono::{Duration, NaiveDate, NaiveDateTime};

// ── Helpers ──────────────────────────────────────────────────────────────────

fn reference() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2018, 9, 1).unwrap().and_hms_opt(0, 0, 0).unwrap()
}

fn input(id: &str, days: f64, orders: u32, review: Option<f64>) -> ChurnRiskInput {
    ChurnRiskInput {
        customer_unique_id:       id.to_string(),
        days_since_last_purchase: days,
        total_orders:             orders,
        avg_review_score:         review,
    }
}

fn fact(order: &str, customer: &str, days_ago: i64, review: Option<f64>) -> OrderFact {
    OrderFact {
        order_id:              order.to_string(),
        customer_unique_id:    customer.to_string(),
        order_status:          "delivered".to_string(),
        purchased_at:          reference() - Duration::days(days_ago),
        delivered_customer_at: None,
        estimated_delivery_at: None,
        product_category:      None,
        price:                 50.0,
        freight_value:         10.0,
        review_score:          review,
        product_id:            None,
        seller_id:             None,
        seller_state:          None,
        customer_state:        None,
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

/// Long-gone one-time unhappy buyers are high risk; recent loyal happy ones low.
#[test]
fn extremes_land_in_expected_levels() {
    let config = AnalyticsConfig::default_test().churn_risk;
    let scored = score_churn_risk(
        &[
            input("gone", 400.0, 1, Some(1.0)),
            input("loyal", 5.0, 8, Some(5.0)),
            input("middle", 200.0, 2, None),
        ],
        &config,
    );

    let level = |id: &str| scored.iter().find(|s| s.customer_unique_id == id).unwrap().churn_risk_level;
    assert_eq!(level("gone"), ChurnRiskLevel::High);
    assert_eq!(level("loyal"), ChurnRiskLevel::Low);
    assert_eq!(level("middle"), ChurnRiskLevel::Medium);
}

/// Scores and components stay within [0, 1].
#[test]
fn scores_are_bounded() {
    let config = AnalyticsConfig::default_test().churn_risk;
    let inputs: Vec<ChurnRiskInput> = (0..40)
        .map(|i| input(&format!("c{i}"), (i * 30) as f64, 1 + i % 5, Some(1.0 + (i % 5) as f64)))
        .collect();
    for s in score_churn_risk(&inputs, &config) {
        for v in [s.churn_risk_score, s.recency_component, s.frequency_component, s.satisfaction_component] {
            assert!((0.0..=1.0).contains(&v), "{} has out-of-range value {v}", s.customer_unique_id);
        }
    }
}

/// A missing review counts as neutral satisfaction, between best and worst.
#[test]
fn missing_review_is_neutral() {
    let config = AnalyticsConfig::default_test().churn_risk;
    let scored = score_churn_risk(
        &[
            input("happy", 100.0, 2, Some(5.0)),
            input("silent", 100.0, 2, None),
            input("angry", 100.0, 2, Some(1.0)),
        ],
        &config,
    );
    assert!(scored[0].churn_risk_score < scored[1].churn_risk_score);
    assert!(scored[1].churn_risk_score < scored[2].churn_risk_score);
    assert_eq!(scored[1].satisfaction_component, 0.5);
}

/// Reviews are averaged once per order, not once per line item.
#[test]
fn inputs_count_reviews_per_order() {
    let facts = vec![
        fact("o1", "x", 10, Some(5.0)),
        fact("o1", "x", 10, Some(5.0)),
        fact("o1", "x", 10, Some(5.0)),
        fact("o2", "x", 40, Some(2.0)),
        fact("o3", "y", 90, None),
    ];
    let inputs = churn_inputs(&facts, reference());

    let x = inputs.iter().find(|i| i.customer_unique_id == "x").unwrap();
    assert_eq!(x.total_orders, 2);
    assert_eq!(x.avg_review_score, Some(3.5));
    assert!((x.days_since_last_purchase - 10.0).abs() < 1e-9);

    let y = inputs.iter().find(|i| i.customer_unique_id == "y").unwrap();
    assert_eq!(y.avg_review_score, None);
}

/// Full report: customers by descending score, levels in Élevé, Moyen, Faible
/// order, counts summing to the population.
#[test]
fn report_levels_ordered_and_complete() {
    let facts = vec![
        fact("a1", "a", 3, Some(5.0)),
        fact("a2", "a", 30, Some(5.0)),
        fact("a3", "a", 60, Some(4.0)),
        fact("b1", "b", 420, Some(1.0)),
        fact("c1", "c", 200, None),
        fact("d1", "d", 380, Some(2.0)),
    ];
    let report = compute_churn_risk(&facts, reference(), &AnalyticsConfig::default_test().churn_risk);

    assert_eq!(report.customers.len(), 4);
    for pair in report.customers.windows(2) {
        assert!(pair[0].churn_risk_score >= pair[1].churn_risk_score);
    }

    let levels: Vec<ChurnRiskLevel> = report.levels.iter().map(|l| l.churn_risk_level).collect();
    let mut sorted = levels.clone();
    sorted.sort();
    assert_eq!(levels, sorted, "levels must be ordered high to low risk");
    assert_eq!(report.levels.iter().map(|l| l.customer_count).sum::<usize>(), 4);

    let high = report.levels.iter().find(|l| l.churn_risk_level == ChurnRiskLevel::High).unwrap();
    assert_eq!(high.customer_count, 2);
    assert_eq!(high.avg_satisfaction, Some(1.5));
    assert_eq!(high.avg_orders, 1.0);
}

/// No facts, no report rows.
#[test]
fn empty_input() {
    let report = compute_churn_risk(&[], reference(), &AnalyticsConfig::default_test().churn_risk);
    assert!(report.customers.is_empty());
    assert!(report.levels.is_empty());
}
