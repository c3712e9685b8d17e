//! Period business report — one row of headline KPIs for a date window.
//!
//! Sales, new customers and reviews cover orders *purchased* in the window,
//! whatever their status. Delivery performance covers delivered orders whose
//! delivery date falls in the window, whenever they were bought. Reviews and
//! deliveries are counted once per order, even though facts arrive one row
//! per line item.

use crate::{
    facts::{DateRange, OrderFact},
    types::{mean, round2, CustomerId},
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodReport {
    pub report_start_date:  chrono::NaiveDate,
    pub report_end_date:    chrono::NaiveDate,
    // Sales
    pub total_orders:       usize,
    pub total_revenue:      f64,
    pub unique_customers:   usize,
    pub avg_item_value:     Option<f64>,
    pub new_customer_count: usize,
    // Delivery
    pub total_delivered:    usize,
    pub late_deliveries:    usize,
    pub avg_delivery_days:  Option<f64>,
    // Satisfaction
    pub avg_review_score:   Option<f64>,
    pub total_reviews:      usize,
    pub positive_reviews:   usize,
    pub negative_reviews:   usize,
}

/// Build the report for `window`.
///
/// `facts` feeds sales and reviews and `deliveries` feeds delivery
/// performance; rows of either slice outside their own window are ignored,
/// so both may be the same superset. `returning_customers` holds everyone
/// who ordered before the window starts; the rest of the window's customers
/// count as new.
pub fn compute_period_report(
    facts: &[OrderFact],
    deliveries: &[OrderFact],
    window: DateRange,
    returning_customers: &HashSet<CustomerId>,
) -> PeriodReport {
    let in_window: Vec<&OrderFact> = facts
        .iter()
        .filter(|f| window.contains(&f.purchased_at))
        .collect();

    let mut orders: HashMap<&str, &OrderFact> = HashMap::new();
    let mut customers: HashSet<&str> = HashSet::new();
    let mut revenue = 0.0;
    let mut item_values = Vec::with_capacity(in_window.len());
    for &f in &in_window {
        orders.entry(f.order_id.as_str()).or_insert(f);
        customers.insert(f.customer_unique_id.as_str());
        revenue += f.billed_value();
        item_values.push(f.billed_value());
    }

    let new_customer_count = customers
        .iter()
        .filter(|c| !returning_customers.contains(**c))
        .count();

    let mut delivered: HashMap<&str, &OrderFact> = HashMap::new();
    for d in deliveries {
        let arrived = d
            .delivered_customer_at
            .map_or(false, |at| window.contains(&at));
        if d.is_delivered() && arrived {
            delivered.entry(d.order_id.as_str()).or_insert(d);
        }
    }
    let late_deliveries = delivered
        .values()
        .filter(|o| match (o.delivered_customer_at, o.estimated_delivery_at) {
            (Some(actual), Some(estimate)) => actual > estimate,
            _ => false,
        })
        .count();
    let delivery_days: Vec<f64> = delivered.values().filter_map(|o| o.delivery_days()).collect();

    let reviews: Vec<f64> = orders.values().filter_map(|o| o.review_score).collect();

    let report = PeriodReport {
        report_start_date:  window.start(),
        report_end_date:    window.end(),
        total_orders:       orders.len(),
        total_revenue:      round2(revenue),
        unique_customers:   customers.len(),
        avg_item_value:     mean(&item_values).map(round2),
        new_customer_count,
        total_delivered:    delivered.len(),
        late_deliveries,
        avg_delivery_days:  mean(&delivery_days).map(round2),
        avg_review_score:   mean(&reviews).map(round2),
        total_reviews:      reviews.len(),
        positive_reviews:   reviews.iter().filter(|s| **s >= 4.0).count(),
        negative_reviews:   reviews.iter().filter(|s| **s <= 2.0).count(),
    };

    log::info!(
        "report: {}..={} orders={} customers={} new={}",
        report.report_start_date,
        report.report_end_date,
        report.total_orders,
        report.unique_customers,
        report.new_customer_count
    );
    report
}
