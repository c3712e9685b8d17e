use olist_core::{
    compute_rfm_segments,
    facts::{aggregate_customers, OrderFact},
    rfm_engine::{RfmInput, RfmSegment},
};
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::HashSet;

// ── Helpers ──────────────────────────────────────────────────────────────────

fn input(id: &str, recency_days: f64, frequency: u32, monetary_value: f64) -> RfmInput {
    RfmInput {
        customer_unique_id: id.to_string(),
        recency_days,
        frequency,
        monetary_value,
    }
}

fn ts(y: i32, m: u32, d: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(12, 0, 0).unwrap()
}

fn fact(order: &str, customer: &str, at: NaiveDateTime, price: f64) -> OrderFact {
    OrderFact {
        order_id:              order.to_string(),
        customer_unique_id:    customer.to_string(),
        order_status:          "delivered".to_string(),
        purchased_at:          at,
        delivered_customer_at: None,
        estimated_delivery_at: None,
        product_category:      None,
        price,
        freight_value:         0.0,
        review_score:          None,
        product_id:            None,
        seller_id:             None,
        seller_state:          None,
        customer_state:        None,
    }
}

/// 50 customers with spread-out recency, frequency and spend.
fn population() -> Vec<RfmInput> {
    (0..50)
        .map(|i| {
            input(
                &format!("c{i:02}"),
                (i * 7) as f64,
                1 + (i % 6) as u32,
                10.0 + ((i * 37) % 50) as f64 * 12.5,
            )
        })
        .collect()
}

// ── Tests ────────────────────────────────────────────────────────────────────

/// Every customer gets exactly one score per axis, each in 1..=5.
#[test]
fn every_customer_scored_once_in_range() {
    let customers = population();
    let report = compute_rfm_segments(&customers);

    assert_eq!(report.customers.len(), customers.len());
    let ids: HashSet<&str> = report.customers.iter().map(|c| c.customer_unique_id.as_str()).collect();
    assert_eq!(ids.len(), customers.len(), "duplicate customer in output");

    for c in &report.customers {
        for score in [c.r_score, c.f_score, c.m_score] {
            assert!((1..=5).contains(&score), "{} has score {score}", c.customer_unique_id);
        }
        assert_eq!(c.rfm_code().len(), 3);
    }
}

/// With 50 customers, each quintile holds exactly 10 of them.
#[test]
fn quintiles_are_balanced() {
    let report = compute_rfm_segments(&population());
    for bucket in 1..=5u8 {
        let n = report.customers.iter().filter(|c| c.r_score == bucket).count();
        assert_eq!(n, 10, "r bucket {bucket} has {n} customers");
    }
}

/// The most recent buyer lands in R bucket 5, the least recent in bucket 1.
#[test]
fn recency_scores_most_recent_highest() {
    let report = compute_rfm_segments(&population());
    let newest = report.customers.iter().find(|c| c.customer_unique_id == "c00").unwrap();
    let oldest = report.customers.iter().find(|c| c.customer_unique_id == "c49").unwrap();
    assert_eq!(newest.r_score, 5);
    assert_eq!(oldest.r_score, 1);
}

/// Segment customer counts add up to the number of distinct customers.
#[test]
fn segment_counts_sum_to_population() {
    let customers = population();
    let report = compute_rfm_segments(&customers);

    let total: usize = report.segments.iter().map(|s| s.customer_count).sum();
    assert_eq!(total, customers.len());

    let pct: f64 = report.segments.iter().map(|s| s.percentage).sum();
    assert!((pct - 100.0).abs() < 0.1, "percentages sum to {pct}");
}

/// Segments are listed by revenue share, largest first.
#[test]
fn segments_ordered_by_revenue_share() {
    let report = compute_rfm_segments(&population());
    for pair in report.segments.windows(2) {
        assert!(
            pair[0].revenue_percentage >= pair[1].revenue_percentage,
            "{} ({}) before {} ({})",
            pair[0].customer_segment,
            pair[0].revenue_percentage,
            pair[1].customer_segment,
            pair[1].revenue_percentage
        );
    }
}

/// Rule table precedence: the first matching rule decides.
#[test]
fn segment_rules_first_match_wins() {
    assert_eq!(RfmSegment::from_scores(5, 5, 5), RfmSegment::Champions);
    assert_eq!(RfmSegment::from_scores(3, 3, 3), RfmSegment::LoyalCustomers);
    assert_eq!(RfmSegment::from_scores(4, 1, 2), RfmSegment::PotentialLoyalists);
    assert_eq!(RfmSegment::from_scores(5, 1, 1), RfmSegment::NewCustomers);
    assert_eq!(RfmSegment::from_scores(2, 5, 5), RfmSegment::AtRisk);
    assert_eq!(RfmSegment::from_scores(2, 3, 3), RfmSegment::NeedAttention);
    // (1,4,4) matches "At Risk" first, so "Cannot Lose Them" is unreachable there.
    assert_eq!(RfmSegment::from_scores(1, 4, 4), RfmSegment::AtRisk);
    assert_eq!(RfmSegment::from_scores(1, 2, 3), RfmSegment::Hibernating);
    assert_eq!(RfmSegment::from_scores(1, 1, 1), RfmSegment::Lost);
    assert_eq!(RfmSegment::from_scores(2, 2, 2), RfmSegment::Others);
}

/// A: frequent, recent, big spender. B: one old small order. C: in between.
/// With three customers the quintiles collapse to buckets 1..=3.
#[test]
fn three_customer_example() {
    let reference = ts(2018, 8, 31);
    let mut facts = Vec::new();
    for n in 0..5 {
        facts.push(fact(&format!("a{n}"), "A", reference - chrono::Duration::days(2 + n * 30), 200.0));
    }
    facts.push(fact("b0", "B", reference - chrono::Duration::days(300), 50.0));
    for n in 0..3 {
        facts.push(fact(&format!("c{n}"), "C", reference - chrono::Duration::days(60 + n * 20), 400.0 / 3.0));
    }

    let aggregates = aggregate_customers(&facts, reference);
    let inputs: Vec<RfmInput> = aggregates.iter().map(RfmInput::from).collect();
    let report = compute_rfm_segments(&inputs);

    let get = |id: &str| report.customers.iter().find(|c| c.customer_unique_id == id).unwrap();
    let a = get("A");
    let b = get("B");
    assert_eq!((a.r_score, a.f_score, a.m_score), (3, 3, 3));
    assert!(
        matches!(a.customer_segment, RfmSegment::Champions | RfmSegment::LoyalCustomers),
        "A segmented as {}",
        a.customer_segment
    );
    assert_eq!((b.r_score, b.f_score, b.m_score), (1, 1, 1));
    assert!(
        matches!(b.customer_segment, RfmSegment::Lost | RfmSegment::Hibernating),
        "B segmented as {}",
        b.customer_segment
    );
    assert!((a.recency_days - 2.0).abs() < 1e-9);
    assert_eq!(a.frequency, 5);
}

/// Empty population yields an empty report, not an error.
#[test]
fn empty_population() {
    let report = compute_rfm_segments(&[]);
    assert!(report.customers.is_empty());
    assert!(report.segments.is_empty());
}

/// A single customer gets the lowest bucket on every axis.
#[test]
fn single_customer_degenerate() {
    let report = compute_rfm_segments(&[input("solo", 10.0, 1, 99.0)]);
    let c = &report.customers[0];
    assert_eq!((c.r_score, c.f_score, c.m_score), (1, 1, 1));
    assert_eq!(report.segments.len(), 1);
    assert_eq!(report.segments[0].percentage, 100.0);
}
