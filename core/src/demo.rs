//! Synthetic Olist-shaped dataset for the runner and for end-to-end tests.
//!
//! This generator:
//!   1. Draws customers and their first purchase, weighted by a fixed
//!      monthly seasonality curve (November peak)
//!   2. Gives a minority of customers repeat orders spaced by Pareto gaps
//!   3. Adds one to three line items per order, each sold by a seller drawn
//!      with Pareto weights so a few sellers carry most of the volume
//!   4. Gives each order a status and delivery dates
//!   5. Reviews most delivered orders, worse scores for late deliveries
//!
//! Same seed, same dataset.

use crate::{
    error::AnalyticsResult,
    facts::{OrderFact, DELIVERED},
    rng::{DemoRng, DemoStream},
    store::{
        AnalyticsStore, CustomerRow, OrderItemRow, OrderRow, ProductRow, ReviewRow, SellerRow,
    },
    types::Timestamp,
};
use chrono::{Datelike, Duration, NaiveDate, NaiveTime};
use std::collections::HashMap;

/// Relative order volume per calendar month, January first.
const MONTH_WEIGHTS: [f64; 12] = [0.85, 0.80, 0.95, 0.90, 1.00, 0.95, 1.00, 1.05, 0.95, 1.00, 1.45, 1.10];

const CATEGORIES: [&str; 8] = [
    "cama_mesa_banho",
    "beleza_saude",
    "esporte_lazer",
    "informatica_acessorios",
    "moveis_decoracao",
    "utilidades_domesticas",
    "relogios_presentes",
    "brinquedos",
];

const STATES: [(&str, &str); 5] = [
    ("sao paulo", "SP"),
    ("rio de janeiro", "RJ"),
    ("belo horizonte", "MG"),
    ("curitiba", "PR"),
    ("porto alegre", "RS"),
];

#[derive(Debug, Clone, PartialEq)]
pub struct DemoOptions {
    pub seed:      u64,
    pub customers: usize,
    pub start:     NaiveDate,
    pub months:    u32,
    /// Probability of each further order after the previous one.
    pub repeat_rate: f64,
    pub sellers:     usize,
}

impl Default for DemoOptions {
    fn default() -> Self {
        Self {
            seed:        42,
            customers:   2_000,
            start:       NaiveDate::from_ymd_opt(2017, 1, 1).unwrap_or_default(),
            months:      24,
            repeat_rate: 0.30,
            sellers:     40,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DemoDataset {
    pub customers: Vec<CustomerRow>,
    pub products:  Vec<ProductRow>,
    pub sellers:   Vec<SellerRow>,
    pub orders:    Vec<OrderRow>,
    pub items:     Vec<OrderItemRow>,
    pub reviews:   Vec<ReviewRow>,
}

fn hex_id(rng: &mut DemoRng) -> String {
    uuid::Builder::from_random_bytes(rng.bytes16())
        .into_uuid()
        .simple()
        .to_string()
}

fn window_end(start: NaiveDate, months: u32) -> NaiveDate {
    start
        .checked_add_months(chrono::Months::new(months.max(1)))
        .unwrap_or(start)
}

/// Purchase instant inside [start, end), accepted with the month's weight.
fn seasonal_instant(rng: &mut DemoRng, start: NaiveDate, end: NaiveDate) -> Timestamp {
    let span_days = (end - start).num_days().max(1);
    let max_weight = MONTH_WEIGHTS.iter().cloned().fold(0.0, f64::max);
    loop {
        let day = start + Duration::days(rng.below(span_days as u64) as i64);
        let weight = MONTH_WEIGHTS[day.month0() as usize];
        if rng.chance(weight / max_weight) {
            let secs = rng.below(86_400) as i64;
            return day.and_time(NaiveTime::MIN) + Duration::seconds(secs);
        }
    }
}

pub fn generate(options: &DemoOptions) -> DemoDataset {
    let mut customer_rng = DemoRng::new(options.seed, DemoStream::Customers);
    let mut order_rng = DemoRng::new(options.seed, DemoStream::Orders);
    let mut item_rng = DemoRng::new(options.seed, DemoStream::Items);
    let mut review_rng = DemoRng::new(options.seed, DemoStream::Reviews);
    let mut seller_rng = DemoRng::new(options.seed, DemoStream::Sellers);

    let start = options.start;
    let end = window_end(start, options.months);
    let end_instant = end.and_time(NaiveTime::MIN);
    let mut data = DemoDataset::default();

    let mut product_category: Vec<(String, &str)> = Vec::new();
    for category in CATEGORIES {
        for _ in 0..4 {
            let product_id = hex_id(&mut item_rng);
            data.products.push(ProductRow {
                product_id:            product_id.clone(),
                product_category_name: Some(category.to_string()),
            });
            product_category.push((product_id, category));
        }
    }

    let mut seller_weights = Vec::with_capacity(options.sellers.max(1));
    for _ in 0..options.sellers.max(1) {
        let (city, state) = STATES[seller_rng.below(STATES.len() as u64) as usize];
        data.sellers.push(SellerRow {
            seller_id:              hex_id(&mut seller_rng),
            seller_zip_code_prefix: Some(format!("{:05}", seller_rng.below(100_000))),
            seller_city:            Some(city.to_string()),
            seller_state:           Some(state.to_string()),
        });
        seller_weights.push(seller_rng.pareto(1.0, 1.2).min(50.0));
    }
    let sellers = DemoSellers {
        ids:     data.sellers.iter().map(|s| s.seller_id.clone()).collect(),
        weights: seller_weights,
    };

    for _ in 0..options.customers {
        let unique_id = hex_id(&mut customer_rng);
        let (city, state) = STATES[customer_rng.below(STATES.len() as u64) as usize];
        let zip = format!("{:05}", customer_rng.below(100_000));

        let mut purchased_at = seasonal_instant(&mut order_rng, start, end);
        loop {
            // Olist issues a fresh customer_id per order; the unique id is stable.
            let customer_id = hex_id(&mut customer_rng);
            data.customers.push(CustomerRow {
                customer_id:              customer_id.clone(),
                customer_unique_id:       unique_id.clone(),
                customer_zip_code_prefix: Some(zip.clone()),
                customer_city:            Some(city.to_string()),
                customer_state:           Some(state.to_string()),
            });

            let order_id = hex_id(&mut order_rng);
            let order = demo_order(&mut order_rng, order_id.clone(), customer_id, purchased_at, end_instant);
            demo_items(&mut item_rng, &order_id, purchased_at, &product_category, &sellers, &mut data.items);
            if let Some(review) = demo_review(&mut review_rng, &order) {
                data.reviews.push(review);
            }
            data.orders.push(order);

            if !order_rng.chance(options.repeat_rate) {
                break;
            }
            let gap_days = order_rng.pareto(15.0, 1.3).min(400.0);
            purchased_at += Duration::seconds((gap_days * 86_400.0) as i64);
            if purchased_at >= end_instant {
                break;
            }
        }
    }

    log::info!(
        "demo: seed={} customers={} sellers={} orders={} items={} reviews={}",
        options.seed,
        options.customers,
        data.sellers.len(),
        data.orders.len(),
        data.items.len(),
        data.reviews.len()
    );
    data
}

fn demo_order(
    rng: &mut DemoRng,
    order_id: String,
    customer_id: String,
    purchased_at: Timestamp,
    cutoff: Timestamp,
) -> OrderRow {
    let estimated = purchased_at + Duration::days(rng.between(15, 30));
    let delivered_at = purchased_at
        + Duration::days(rng.between(3, 35))
        + Duration::seconds(rng.below(86_400) as i64);

    let status = match rng.weighted(&[0.94, 0.03, 0.02, 0.01]) {
        0 if delivered_at < cutoff => DELIVERED,
        0 | 1 => "shipped",
        2 => "canceled",
        _ => "unavailable",
    };
    let delivered = status == DELIVERED;

    OrderRow {
        order_id,
        customer_id,
        order_status: status.to_string(),
        order_purchase_timestamp: purchased_at,
        order_approved_at: Some(purchased_at + Duration::minutes(rng.between(5, 600))),
        order_delivered_carrier_date: (status != "canceled")
            .then(|| purchased_at + Duration::days(rng.between(1, 3))),
        order_delivered_customer_date: delivered.then_some(delivered_at),
        order_estimated_delivery_date: Some(estimated),
    }
}

struct DemoSellers {
    ids:     Vec<String>,
    weights: Vec<f64>,
}

fn demo_items(
    rng: &mut DemoRng,
    order_id: &str,
    purchased_at: Timestamp,
    products: &[(String, &str)],
    sellers: &DemoSellers,
    out: &mut Vec<OrderItemRow>,
) {
    let count = rng.weighted(&[0.85, 0.11, 0.04]) as u32 + 1;
    // One seller per order, as most Olist orders ship from a single seller.
    let seller_id = sellers.ids[rng.weighted(&sellers.weights)].clone();
    for n in 1..=count {
        let (product_id, _) = &products[rng.below(products.len() as u64) as usize];
        let price = (rng.pareto(25.0, 1.7).min(2_500.0) * 100.0).round() / 100.0;
        let freight = (rng.between(700, 4_500) as f64) / 100.0;
        out.push(OrderItemRow {
            order_id:            order_id.to_string(),
            order_item_id:       n,
            product_id:          Some(product_id.clone()),
            seller_id:           Some(seller_id.clone()),
            shipping_limit_date: Some(purchased_at + Duration::days(6)),
            price,
            freight_value:       freight,
        });
    }
}

fn demo_review(rng: &mut DemoRng, order: &OrderRow) -> Option<ReviewRow> {
    let delivered_at = order.order_delivered_customer_date?;
    if !rng.chance(0.85) {
        return None;
    }
    let late = order
        .order_estimated_delivery_date
        .map(|est| delivered_at > est)
        .unwrap_or(false);
    // Scores 1..=5.
    let weights: [f64; 5] = if late {
        [0.35, 0.15, 0.20, 0.15, 0.15]
    } else {
        [0.06, 0.03, 0.08, 0.20, 0.63]
    };
    let score = rng.weighted(&weights) as u8 + 1;
    Some(ReviewRow {
        review_id:            hex_id(rng),
        order_id:             order.order_id.clone(),
        review_score:         score,
        review_creation_date: Some(delivered_at + Duration::days(1)),
    })
}

impl DemoDataset {
    /// Write every row inside one transaction. Parents go first.
    pub fn load_into(&self, store: &AnalyticsStore) -> AnalyticsResult<()> {
        store.in_transaction(|s| {
            for c in &self.customers {
                s.insert_customer(c)?;
            }
            for p in &self.products {
                s.insert_product(p)?;
            }
            for seller in &self.sellers {
                s.insert_seller(seller)?;
            }
            for o in &self.orders {
                s.insert_order(o)?;
            }
            for i in &self.items {
                s.insert_order_item(i)?;
            }
            for r in &self.reviews {
                s.insert_review(r)?;
            }
            Ok(())
        })?;
        log::info!("demo: loaded {} orders into store", self.orders.len());
        Ok(())
    }

    /// The same rows joined into order facts, as the store would return them.
    pub fn to_facts(&self) -> Vec<OrderFact> {
        let customer_of: HashMap<&str, &CustomerRow> = self
            .customers
            .iter()
            .map(|c| (c.customer_id.as_str(), c))
            .collect();
        let seller_state_of: HashMap<&str, Option<&String>> = self
            .sellers
            .iter()
            .map(|s| (s.seller_id.as_str(), s.seller_state.as_ref()))
            .collect();
        let category_of: HashMap<&str, Option<&String>> = self
            .products
            .iter()
            .map(|p| (p.product_id.as_str(), p.product_category_name.as_ref()))
            .collect();
        let order_of: HashMap<&str, &OrderRow> =
            self.orders.iter().map(|o| (o.order_id.as_str(), o)).collect();

        let mut scores: HashMap<&str, Vec<f64>> = HashMap::new();
        for r in &self.reviews {
            scores
                .entry(r.order_id.as_str())
                .or_default()
                .push(r.review_score as f64);
        }

        self.items
            .iter()
            .filter_map(|item| {
                let order = order_of.get(item.order_id.as_str())?;
                let customer = customer_of.get(order.customer_id.as_str())?;
                let category = item
                    .product_id
                    .as_deref()
                    .and_then(|p| category_of.get(p).copied().flatten())
                    .cloned();
                Some(OrderFact {
                    order_id:              order.order_id.clone(),
                    customer_unique_id:    customer.customer_unique_id.clone(),
                    order_status:          order.order_status.clone(),
                    purchased_at:          order.order_purchase_timestamp,
                    delivered_customer_at: order.order_delivered_customer_date,
                    estimated_delivery_at: order.order_estimated_delivery_date,
                    product_category:      category,
                    price:                 item.price,
                    freight_value:         item.freight_value,
                    review_score:          scores
                        .get(order.order_id.as_str())
                        .and_then(|s| crate::types::mean(s)),
                    product_id:            item.product_id.clone(),
                    seller_id:             item.seller_id.clone(),
                    seller_state:          item
                        .seller_id
                        .as_deref()
                        .and_then(|s| seller_state_of.get(s).copied().flatten())
                        .cloned(),
                    customer_state:        customer.customer_state.clone(),
                })
            })
            .collect()
    }
}
