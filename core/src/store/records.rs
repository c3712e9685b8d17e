use super::{timestamp_to_sql, AnalyticsStore};
use crate::{error::AnalyticsResult, types::Timestamp};
use rusqlite::params;
use serde::{Deserialize, Serialize};

// ── Row types (one per table) ──────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerRow {
    pub customer_id:              String,
    pub customer_unique_id:       String,
    pub customer_zip_code_prefix: Option<String>,
    pub customer_city:            Option<String>,
    pub customer_state:           Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRow {
    pub product_id:            String,
    pub product_category_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SellerRow {
    pub seller_id:              String,
    pub seller_zip_code_prefix: Option<String>,
    pub seller_city:            Option<String>,
    pub seller_state:           Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRow {
    pub order_id:                      String,
    pub customer_id:                   String,
    pub order_status:                  String,
    pub order_purchase_timestamp:      Timestamp,
    pub order_approved_at:             Option<Timestamp>,
    pub order_delivered_carrier_date:  Option<Timestamp>,
    pub order_delivered_customer_date: Option<Timestamp>,
    pub order_estimated_delivery_date: Option<Timestamp>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItemRow {
    pub order_id:            String,
    pub order_item_id:       u32,
    pub product_id:          Option<String>,
    pub seller_id:           Option<String>,
    pub shipping_limit_date: Option<Timestamp>,
    pub price:               f64,
    pub freight_value:       f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewRow {
    pub review_id:            String,
    pub order_id:             String,
    pub review_score:         u8,
    pub review_creation_date: Option<Timestamp>,
}

fn opt_ts(ts: &Option<Timestamp>) -> Option<String> {
    ts.as_ref().map(timestamp_to_sql)
}

impl AnalyticsStore {
    // ── Inserts ────────────────────────────────────────────────
    //
    // Each insert ignores rows whose key already exists and returns the
    // number of rows written (0 or 1), so re-imports are idempotent.

    pub fn insert_customer(&self, c: &CustomerRow) -> AnalyticsResult<usize> {
        let n = self.conn.execute(
            "INSERT OR IGNORE INTO customers (
                customer_id, customer_unique_id, customer_zip_code_prefix,
                customer_city, customer_state
            ) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                &c.customer_id,
                &c.customer_unique_id,
                &c.customer_zip_code_prefix,
                &c.customer_city,
                &c.customer_state,
            ],
        )?;
        Ok(n)
    }

    pub fn insert_product(&self, p: &ProductRow) -> AnalyticsResult<usize> {
        let n = self.conn.execute(
            "INSERT OR IGNORE INTO products (product_id, product_category_name)
             VALUES (?1, ?2)",
            params![&p.product_id, &p.product_category_name],
        )?;
        Ok(n)
    }

    pub fn insert_seller(&self, s: &SellerRow) -> AnalyticsResult<usize> {
        let n = self.conn.execute(
            "INSERT OR IGNORE INTO sellers (
                seller_id, seller_zip_code_prefix, seller_city, seller_state
            ) VALUES (?1, ?2, ?3, ?4)",
            params![
                &s.seller_id,
                &s.seller_zip_code_prefix,
                &s.seller_city,
                &s.seller_state,
            ],
        )?;
        Ok(n)
    }

    pub fn insert_order(&self, o: &OrderRow) -> AnalyticsResult<usize> {
        let n = self.conn.execute(
            "INSERT OR IGNORE INTO orders (
                order_id, customer_id, order_status, order_purchase_timestamp,
                order_approved_at, order_delivered_carrier_date,
                order_delivered_customer_date, order_estimated_delivery_date
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                &o.order_id,
                &o.customer_id,
                &o.order_status,
                timestamp_to_sql(&o.order_purchase_timestamp),
                opt_ts(&o.order_approved_at),
                opt_ts(&o.order_delivered_carrier_date),
                opt_ts(&o.order_delivered_customer_date),
                opt_ts(&o.order_estimated_delivery_date),
            ],
        )?;
        Ok(n)
    }

    pub fn insert_order_item(&self, i: &OrderItemRow) -> AnalyticsResult<usize> {
        let n = self.conn.execute(
            "INSERT OR IGNORE INTO order_items (
                order_id, order_item_id, product_id, seller_id,
                shipping_limit_date, price, freight_value
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                &i.order_id,
                i.order_item_id as i64,
                &i.product_id,
                &i.seller_id,
                opt_ts(&i.shipping_limit_date),
                i.price,
                i.freight_value,
            ],
        )?;
        Ok(n)
    }

    pub fn insert_review(&self, r: &ReviewRow) -> AnalyticsResult<usize> {
        let n = self.conn.execute(
            "INSERT OR IGNORE INTO order_reviews (
                review_id, order_id, review_score, review_creation_date
            ) VALUES (?1, ?2, ?3, ?4)",
            params![
                &r.review_id,
                &r.order_id,
                r.review_score as i64,
                opt_ts(&r.review_creation_date),
            ],
        )?;
        Ok(n)
    }

    // ── Counts ─────────────────────────────────────────────────

    pub fn order_count(&self) -> AnalyticsResult<i64> {
        let n = self
            .conn
            .query_row("SELECT COUNT(*) FROM orders", [], |row| row.get(0))?;
        Ok(n)
    }

    pub fn customer_count(&self) -> AnalyticsResult<i64> {
        let n = self.conn.query_row(
            "SELECT COUNT(DISTINCT customer_unique_id) FROM customers",
            [],
            |row| row.get(0),
        )?;
        Ok(n)
    }

    pub fn seller_count(&self) -> AnalyticsResult<i64> {
        let n = self
            .conn
            .query_row("SELECT COUNT(*) FROM sellers", [], |row| row.get(0))?;
        Ok(n)
    }

    pub fn review_count(&self) -> AnalyticsResult<i64> {
        let n = self
            .conn
            .query_row("SELECT COUNT(*) FROM order_reviews", [], |row| row.get(0))?;
        Ok(n)
    }
}
