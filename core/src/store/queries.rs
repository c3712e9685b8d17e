use super::{optional_timestamp_column, timestamp_column, timestamp_to_sql, AnalyticsStore};
use crate::{
    error::{AnalyticsError, AnalyticsResult},
    facts::{OrderFact, OrderFilter, DELIVERED},
    source::OrderFactSource,
    types::{CustomerId, Timestamp},
};
use chrono::{NaiveDate, NaiveTime};
use rusqlite::ToSql;
use std::collections::HashSet;

/// One row per order line item. Reviews are averaged per order because the
/// dataset can carry several reviews for the same order.
const FACT_SELECT: &str = "
    SELECT o.order_id,
           c.customer_unique_id,
           o.order_status,
           o.order_purchase_timestamp,
           o.order_delivered_customer_date,
           o.order_estimated_delivery_date,
           p.product_category_name,
           i.price,
           i.freight_value,
           (SELECT AVG(r.review_score) FROM order_reviews r WHERE r.order_id = o.order_id),
           i.product_id,
           i.seller_id,
           s.seller_state,
           c.customer_state
      FROM orders o
      JOIN customers   c ON c.customer_id = o.customer_id
      JOIN order_items i ON i.order_id    = o.order_id
      LEFT JOIN products p ON p.product_id = i.product_id
      LEFT JOIN sellers  s ON s.seller_id  = i.seller_id
     WHERE 1=1";

impl AnalyticsStore {
    /// Every filter value is bound as a parameter; nothing from the filter
    /// is spliced into the SQL text.
    fn append_filter_clauses(
        sql: &mut String,
        params: &mut Vec<Box<dyn ToSql>>,
        filter: &OrderFilter,
    ) {
        if let Some(range) = &filter.range {
            sql.push_str(" AND o.order_purchase_timestamp >= ?");
            params.push(Box::new(timestamp_to_sql(&range.start_instant())));
            sql.push_str(" AND o.order_purchase_timestamp < ?");
            params.push(Box::new(timestamp_to_sql(&range.end_exclusive())));
        }
        if let Some(range) = &filter.delivered_range {
            sql.push_str(" AND o.order_delivered_customer_date >= ?");
            params.push(Box::new(timestamp_to_sql(&range.start_instant())));
            sql.push_str(" AND o.order_delivered_customer_date < ?");
            params.push(Box::new(timestamp_to_sql(&range.end_exclusive())));
        }
        if filter.delivered_only {
            sql.push_str(" AND o.order_status = ?");
            params.push(Box::new(DELIVERED.to_string()));
        }
        if !filter.categories.is_empty() {
            let placeholders = vec!["?"; filter.categories.len()].join(", ");
            sql.push_str(&format!(" AND p.product_category_name IN ({placeholders})"));
            for category in &filter.categories {
                params.push(Box::new(category.clone()));
            }
        }
    }

    pub fn order_facts(&self, filter: &OrderFilter) -> AnalyticsResult<Vec<OrderFact>> {
        let mut sql = FACT_SELECT.to_string();
        let mut params_vec: Vec<Box<dyn ToSql>> = Vec::new();
        Self::append_filter_clauses(&mut sql, &mut params_vec, filter);
        sql.push_str(" ORDER BY o.order_purchase_timestamp, o.order_id, i.order_item_id");

        let params_refs: Vec<&dyn ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_refs.as_slice(), |row| {
            Ok(OrderFact {
                order_id:              row.get(0)?,
                customer_unique_id:    row.get(1)?,
                order_status:          row.get(2)?,
                purchased_at:          timestamp_column(row, 3)?,
                delivered_customer_at: optional_timestamp_column(row, 4)?,
                estimated_delivery_at: optional_timestamp_column(row, 5)?,
                product_category:      row.get(6)?,
                price:                 row.get(7)?,
                freight_value:         row.get(8)?,
                review_score:          row.get(9)?,
                product_id:            row.get(10)?,
                seller_id:             row.get(11)?,
                seller_state:          row.get(12)?,
                customer_state:        row.get(13)?,
            })
        })?;
        let facts = rows.collect::<Result<Vec<_>, _>>()?;
        log::debug!("store: {} facts for {}", facts.len(), filter.cache_key());
        Ok(facts)
    }

    /// First and last purchase day in the dataset, if any order exists.
    pub fn date_range(&self) -> AnalyticsResult<Option<(NaiveDate, NaiveDate)>> {
        let mut stmt = self.conn.prepare(
            "SELECT MIN(order_purchase_timestamp), MAX(order_purchase_timestamp) FROM orders",
        )?;
        let bounds = stmt.query_row([], |row| {
            Ok((
                optional_timestamp_column(row, 0)?,
                optional_timestamp_column(row, 1)?,
            ))
        })?;
        Ok(match bounds {
            (Some(first), Some(last)) => Some((first.date(), last.date())),
            _ => None,
        })
    }

    pub fn max_purchase(&self) -> AnalyticsResult<Option<Timestamp>> {
        let mut stmt = self
            .conn
            .prepare("SELECT MAX(order_purchase_timestamp) FROM orders")?;
        let latest = stmt.query_row([], |row| optional_timestamp_column(row, 0))?;
        Ok(latest)
    }

    pub fn customers_ordering_before(&self, day: NaiveDate) -> AnalyticsResult<HashSet<CustomerId>> {
        let cutoff = timestamp_to_sql(&day.and_time(NaiveTime::MIN));
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT c.customer_unique_id
               FROM orders o
               JOIN customers c ON c.customer_id = o.customer_id
              WHERE o.order_purchase_timestamp < ?1",
        )?;
        let rows = stmt.query_map([cutoff], |row| row.get::<_, String>(0))?;
        let customers = rows.collect::<Result<HashSet<_>, _>>()?;
        Ok(customers)
    }

    fn upstream(&self, e: AnalyticsError) -> AnalyticsError {
        match e {
            AnalyticsError::Database(inner) => AnalyticsError::UpstreamUnavailable {
                source_name: self.name().to_string(),
                reason:      inner.to_string(),
            },
            other => other,
        }
    }
}

impl OrderFactSource for AnalyticsStore {
    fn name(&self) -> &str {
        self.path.as_deref().unwrap_or(":memory:")
    }

    fn fetch_order_facts(&self, filter: &OrderFilter) -> AnalyticsResult<Vec<OrderFact>> {
        self.order_facts(filter).map_err(|e| self.upstream(e))
    }

    fn latest_purchase(&self) -> AnalyticsResult<Option<Timestamp>> {
        self.max_purchase().map_err(|e| self.upstream(e))
    }

    fn customers_before(&self, day: NaiveDate) -> AnalyticsResult<HashSet<CustomerId>> {
        self.customers_ordering_before(day).map_err(|e| self.upstream(e))
    }
}
