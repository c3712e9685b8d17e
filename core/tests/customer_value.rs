use olist_core::{
    config::AnalyticsConfig,
    customer_value_engine::{compute_customer_value, lifetime_value, FrequencyBucket, ValueSegment},
    facts::CustomerAggregate,
};
use chrono::{Duration, NaiveDate, NaiveDateTime};

// ── Helpers ──────────────────────────────────────────────────────────────────

fn t0() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2017, 6, 1).unwrap().and_hms_opt(9, 0, 0).unwrap()
}

fn customer(id: &str, orders: u32, spend: f64, lifespan_days: i64) -> CustomerAggregate {
    CustomerAggregate {
        customer_unique_id: id.to_string(),
        order_count:        orders,
        total_spend:        spend,
        first_purchase:     t0(),
        last_purchase:      t0() + Duration::days(lifespan_days),
        recency_days:       0.0,
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

/// Repeat buyer: value = average order × monthly frequency × 12.
#[test]
fn repeat_buyer_annualized() {
    let config = AnalyticsConfig::default_test().customer_value;
    let v = lifetime_value(&customer("p", 2, 300.0, 30), &config);

    assert_eq!(v.customer_lifespan_days, 30.0);
    assert_eq!(v.average_order_value, 150.0);
    assert_eq!(v.purchase_frequency_monthly, 2.0);
    assert_eq!(v.estimated_annual_value, 3_600.0);
    assert_eq!(v.customer_segment, ValueSegment::Premium);
}

/// One-time buyer: annual value is what they spent, frequency is 1.
#[test]
fn one_time_buyer_is_spend() {
    let config = AnalyticsConfig::default_test().customer_value;
    let v = lifetime_value(&customer("s", 1, 80.0, 0), &config);
    assert_eq!(v.purchase_frequency_monthly, 1.0);
    assert_eq!(v.estimated_annual_value, 80.0);
    assert_eq!(v.customer_lifespan_days, 1.0, "lifespan floors at one day");
    assert_eq!(v.customer_segment, ValueSegment::Standard);
}

/// Thresholds are strict: exactly 100 is still Standard.
#[test]
fn segment_thresholds() {
    let config = AnalyticsConfig::default_test().customer_value;
    assert_eq!(ValueSegment::classify(100.0, &config), ValueSegment::Standard);
    assert_eq!(ValueSegment::classify(100.01, &config), ValueSegment::MediumValue);
    assert_eq!(ValueSegment::classify(250.0, &config), ValueSegment::HighValue);
    assert_eq!(ValueSegment::classify(500.5, &config), ValueSegment::Premium);
}

/// Report: customers by value, segments by average value, frequency buckets.
#[test]
fn report_groups_and_orders() {
    let config = AnalyticsConfig::default_test().customer_value;
    let customers = vec![
        customer("p", 2, 300.0, 30),
        customer("h", 1, 250.0, 0),
        customer("m", 1, 150.0, 0),
        customer("s", 1, 80.0, 0),
        customer("t", 4, 90.0, 360),
    ];
    let report = compute_customer_value(&customers, &config);

    assert_eq!(report.customers[0].customer_unique_id, "p");
    for pair in report.customers.windows(2) {
        assert!(pair[0].estimated_annual_value >= pair[1].estimated_annual_value);
    }
    for pair in report.segments.windows(2) {
        assert!(pair[0].avg_annual_value >= pair[1].avg_annual_value);
    }
    assert_eq!(report.segments.iter().map(|s| s.customer_count).sum::<usize>(), 5);

    let one_time = report
        .frequency
        .iter()
        .find(|f| f.purchase_frequency == FrequencyBucket::OneTime)
        .unwrap();
    assert_eq!(one_time.customer_count, 3);
    assert_eq!(one_time.avg_lifespan_days, 1.0);

    let buckets: Vec<&str> = report.frequency.iter().map(|f| f.purchase_frequency.label()).collect();
    assert_eq!(buckets, vec!["One-time", "2-3 orders", "4-6 orders"]);
}

/// Order-count buckets follow the dashboard's boundaries.
#[test]
fn frequency_bucket_boundaries() {
    assert_eq!(FrequencyBucket::for_orders(1), FrequencyBucket::OneTime);
    assert_eq!(FrequencyBucket::for_orders(3), FrequencyBucket::TwoToThree);
    assert_eq!(FrequencyBucket::for_orders(4), FrequencyBucket::FourToSix);
    assert_eq!(FrequencyBucket::for_orders(7), FrequencyBucket::SevenPlus);
}

/// Empty population, empty report.
#[test]
fn empty_population() {
    let report = compute_customer_value(&[], &AnalyticsConfig::default_test().customer_value);
    assert!(report.customers.is_empty());
    assert!(report.segments.is_empty());
    assert!(report.frequency.is_empty());
}
