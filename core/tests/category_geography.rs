use olist_core::{
    category_engine::{compute_category_performance, compute_category_trends},
    facts::OrderFact,
    geography_engine::{compute_customer_geography, compute_seller_geography},
};
use chrono::{NaiveDate, NaiveDateTime};

// ── Helpers ──────────────────────────────────────────────────────────────────

fn at(m: u32, d: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2018, m, d).unwrap().and_hms_opt(9, 30, 0).unwrap()
}

fn month(m: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2018, m, 1).unwrap()
}

struct Line {
    order:    &'static str,
    customer: &'static str,
    state:    Option<&'static str>,
    when:     NaiveDateTime,
    category: Option<&'static str>,
    price:    f64,
    freight:  f64,
    review:   Option<f64>,
    seller:   Option<(&'static str, &'static str)>,
}

impl Line {
    fn fact(&self) -> OrderFact {
        OrderFact {
            order_id:              self.order.to_string(),
            customer_unique_id:    self.customer.to_string(),
            order_status:          "delivered".to_string(),
            purchased_at:          self.when,
            delivered_customer_at: None,
            estimated_delivery_at: None,
            product_category:      self.category.map(str::to_string),
            price:                 self.price,
            freight_value:         self.freight,
            review_score:          self.review,
            product_id:            None,
            seller_id:             self.seller.map(|(id, _)| id.to_string()),
            seller_state:          self.seller.map(|(_, state)| state.to_string()),
            customer_state:        self.state.map(str::to_string),
        }
    }
}

const BED: Option<&str> = Some("cama_mesa_banho");
const BEAUTY: Option<&str> = Some("beleza_saude");

/// u1 (SP) buys twice, u2 (RJ) once, u3 (SP) once without a category,
/// u4 has no known state. Sellers s1 in SP and s2 in RJ.
fn sample() -> Vec<OrderFact> {
    let s1 = Some(("s1", "SP"));
    let s2 = Some(("s2", "RJ"));
    [
        Line { order: "o1", customer: "u1", state: Some("SP"), when: at(1, 5), category: BED, price: 100.0, freight: 10.0, review: Some(5.0), seller: s1 },
        Line { order: "o1", customer: "u1", state: Some("SP"), when: at(1, 5), category: BEAUTY, price: 50.0, freight: 20.0, review: Some(5.0), seller: s2 },
        Line { order: "o2", customer: "u1", state: Some("SP"), when: at(2, 3), category: BED, price: 60.0, freight: 10.0, review: Some(3.0), seller: s1 },
        Line { order: "o3", customer: "u2", state: Some("RJ"), when: at(1, 20), category: BEAUTY, price: 40.0, freight: 0.0, review: None, seller: s2 },
        Line { order: "o4", customer: "u3", state: Some("SP"), when: at(2, 10), category: None, price: 30.0, freight: 5.0, review: Some(4.0), seller: None },
        Line { order: "o5", customer: "u4", state: None, when: at(2, 20), category: BED, price: 10.0, freight: 4.0, review: None, seller: s1 },
    ]
    .iter()
    .map(Line::fact)
    .collect()
}

// ── Tests ────────────────────────────────────────────────────────────────────

/// Categories rank by revenue; uncategorized items are left out.
#[test]
fn category_performance_by_revenue() {
    let rows = compute_category_performance(&sample());
    let names: Vec<&str> = rows.iter().map(|r| r.category_name.as_str()).collect();
    assert_eq!(names, vec!["cama_mesa_banho", "beleza_saude"]);

    let bed = &rows[0];
    assert_eq!(bed.order_count, 3);
    assert_eq!(bed.items_sold, 3);
    assert_eq!(bed.total_revenue, 170.0);
    assert_eq!(bed.avg_price, 56.67);
    assert_eq!(bed.avg_freight_value, 8.0);
    assert_eq!(bed.avg_review_score, Some(4.0), "unreviewed o5 does not weigh in");
    assert_eq!(bed.revenue_share, 65.38);

    let beauty = &rows[1];
    assert_eq!(beauty.order_count, 2);
    assert_eq!(beauty.avg_review_score, Some(5.0));
    assert_eq!(beauty.revenue_share, 34.62);
}

/// Trends bucket by (purchase month, category), month first.
#[test]
fn category_trends_by_month() {
    let trends = compute_category_trends(&sample());
    let keys: Vec<(NaiveDate, &str)> = trends
        .iter()
        .map(|t| (t.order_month, t.category_name.as_str()))
        .collect();
    assert_eq!(
        keys,
        vec![
            (month(1), "beleza_saude"),
            (month(1), "cama_mesa_banho"),
            (month(2), "cama_mesa_banho"),
        ]
    );
    assert_eq!(trends[0].order_count, 2);
    assert_eq!(trends[0].total_revenue, 90.0);
    assert_eq!(trends[2].order_count, 2);
    assert_eq!(trends[2].total_revenue, 70.0);
}

/// Customers roll up per state; each counts once with their own averages.
#[test]
fn customer_geography_by_state() {
    let rows = compute_customer_geography(&sample());
    let states: Vec<&str> = rows.iter().map(|r| r.customer_state.as_str()).collect();
    assert_eq!(states, vec!["SP", "RJ"], "highest total spend first; no-state rows dropped");

    let sp = &rows[0];
    assert_eq!(sp.customer_count, 2);
    assert_eq!(sp.avg_orders, 1.5);
    assert_eq!(sp.avg_total_spend, 120.0);
    // u1: 210 over two orders, u3: 30 over one.
    assert_eq!(sp.avg_order_value, 67.5);
    assert_eq!(sp.total_state_spend, 240.0);

    let rj = &rows[1];
    assert_eq!(rj.customer_count, 1);
    assert_eq!(rj.total_state_spend, 40.0);
}

/// Sellers roll up per seller state; items without a seller are left out.
#[test]
fn seller_geography_by_state() {
    let rows = compute_seller_geography(&sample());
    assert_eq!(rows.len(), 2);

    let sp = &rows[0];
    assert_eq!(sp.seller_state, "SP");
    assert_eq!(sp.seller_count, 1);
    assert_eq!(sp.total_orders, 3);
    assert_eq!(sp.total_revenue, 170.0);
    assert_eq!(sp.avg_review, Some(4.0));

    let rj = &rows[1];
    assert_eq!(rj.seller_state, "RJ");
    assert_eq!(rj.total_orders, 2);
    assert_eq!(rj.total_revenue, 90.0);
    assert_eq!(rj.avg_review, Some(5.0));
}

/// No facts: every rollup is empty.
#[test]
fn empty_input() {
    assert!(compute_category_performance(&[]).is_empty());
    assert!(compute_category_trends(&[]).is_empty());
    assert!(compute_customer_geography(&[]).is_empty());
    assert!(compute_seller_geography(&[]).is_empty());
}
