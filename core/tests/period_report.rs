use olist_core::{
    facts::{DateRange, OrderFact},
    report_engine::compute_period_report,
};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use std::collections::HashSet;

// ── Helpers ──────────────────────────────────────────────────────────────────

fn day(m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2018, m, d).unwrap()
}

fn at(m: u32, d: u32) -> NaiveDateTime {
    day(m, d).and_hms_opt(14, 0, 0).unwrap()
}

#[allow(clippy::too_many_arguments)]
fn fact(
    order: &str,
    customer: &str,
    purchased: NaiveDateTime,
    status: &str,
    delivery_days: Option<i64>,
    estimate_days: i64,
    price: f64,
    review: Option<f64>,
) -> OrderFact {
    OrderFact {
        order_id:              order.to_string(),
        customer_unique_id:    customer.to_string(),
        order_status:          status.to_string(),
        purchased_at:          purchased,
        delivered_customer_at: delivery_days.map(|d| purchased + Duration::days(d)),
        estimated_delivery_at: Some(purchased + Duration::days(estimate_days)),
        product_category:      None,
        price,
        freight_value:         10.0,
        review_score:          review,
        product_id:            None,
        seller_id:             None,
        seller_state:          None,
        customer_state:        None,
    }
}

fn march() -> DateRange {
    DateRange::new(day(3, 1), day(3, 31)).unwrap()
}

fn sample() -> Vec<OrderFact> {
    vec![
        // Two items in one order, on time, 5 stars.
        fact("o1", "old", at(3, 2), "delivered", Some(5), 10, 100.0, Some(5.0)),
        fact("o1", "old", at(3, 2), "delivered", Some(5), 10, 50.0, Some(5.0)),
        // Late delivery, 1 star, delivered on the 25th.
        fact("o2", "new1", at(3, 5), "delivered", Some(20), 12, 80.0, Some(1.0)),
        // Canceled, still counted as an order.
        fact("o3", "new2", at(3, 31), "canceled", None, 10, 40.0, None),
        // Outside the window.
        fact("o4", "new3", at(4, 1), "delivered", Some(3), 10, 999.0, Some(3.0)),
    ]
}

// ── Tests ────────────────────────────────────────────────────────────────────

/// Sales counts every status inside the window; the last day is included.
#[test]
fn sales_metrics() {
    let returning: HashSet<String> = ["old".to_string()].into_iter().collect();
    let r = compute_period_report(&sample(), &sample(), march(), &returning);

    assert_eq!(r.report_start_date, day(3, 1));
    assert_eq!(r.report_end_date, day(3, 31));
    assert_eq!(r.total_orders, 3);
    assert_eq!(r.unique_customers, 3);
    assert_eq!(r.total_revenue, 310.0, "price plus freight of four items");
    assert_eq!(r.avg_item_value, Some(77.5));
    assert_eq!(r.new_customer_count, 2);
}

/// Delivery metrics look at delivered orders once each.
#[test]
fn delivery_metrics() {
    let r = compute_period_report(&sample(), &sample(), march(), &HashSet::new());
    assert_eq!(r.total_delivered, 2);
    assert_eq!(r.late_deliveries, 1);
    assert_eq!(r.avg_delivery_days, Some(12.5));
}

/// Deliveries are selected by delivery date: an order bought in February and
/// delivered in March counts for March, not for February.
#[test]
fn deliveries_follow_delivery_date() {
    let feb_order = vec![fact("o9", "late", at(2, 25), "delivered", Some(8), 10, 60.0, None)];

    let r = compute_period_report(&[], &feb_order, march(), &HashSet::new());
    assert_eq!(r.total_delivered, 1);
    assert_eq!(r.late_deliveries, 0);
    assert_eq!(r.avg_delivery_days, Some(8.0));
    assert_eq!(r.total_orders, 0, "the sale itself belongs to February");

    let february = DateRange::new(day(2, 1), day(2, 28)).unwrap();
    let r = compute_period_report(&feb_order, &feb_order, february, &HashSet::new());
    assert_eq!(r.total_orders, 1);
    assert_eq!(r.total_delivered, 0, "not yet delivered in February");
    assert_eq!(r.avg_delivery_days, None);
}

/// Reviews are counted per order, split into positive and negative.
#[test]
fn satisfaction_metrics() {
    let r = compute_period_report(&sample(), &sample(), march(), &HashSet::new());
    assert_eq!(r.total_reviews, 2);
    assert_eq!(r.avg_review_score, Some(3.0));
    assert_eq!(r.positive_reviews, 1);
    assert_eq!(r.negative_reviews, 1);
}

/// An empty window reports zeros and no averages.
#[test]
fn empty_window() {
    let window = DateRange::new(day(1, 1), day(1, 31)).unwrap();
    let r = compute_period_report(&sample(), &sample(), window, &HashSet::new());
    assert_eq!(r.total_orders, 0);
    assert_eq!(r.total_revenue, 0.0);
    assert_eq!(r.avg_item_value, None);
    assert_eq!(r.avg_delivery_days, None);
    assert_eq!(r.avg_review_score, None);
}

/// A reversed range cannot be built.
#[test]
fn reversed_range_rejected() {
    let err = DateRange::new(day(3, 31), day(3, 1)).unwrap_err();
    assert!(err.is_invalid_parameter());
}
