//! Loader for the public Olist CSV export.
//!
//! Files are read by header name, so column order does not matter and extra
//! columns are ignored. Parents load before children (customers, products,
//! sellers, orders, items, reviews) inside one transaction. A row that cannot be
//! parsed, or that references a missing parent, is skipped with a warning;
//! any other database failure aborts the whole import.

use crate::{
    error::{AnalyticsError, AnalyticsResult},
    store::{
        parse_timestamp, AnalyticsStore, CustomerRow, OrderItemRow, OrderRow, ProductRow,
        ReviewRow, SellerRow,
    },
    types::Timestamp,
};
use csv::{ReaderBuilder, StringRecord};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const CUSTOMERS_FILE: &str = "olist_customers_dataset.csv";
pub const PRODUCTS_FILE: &str = "olist_products_dataset.csv";
pub const SELLERS_FILE: &str = "olist_sellers_dataset.csv";
pub const ORDERS_FILE: &str = "olist_orders_dataset.csv";
pub const ITEMS_FILE: &str = "olist_order_items_dataset.csv";
pub const REVIEWS_FILE: &str = "olist_order_reviews_dataset.csv";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileImport {
    pub file:     String,
    pub table:    String,
    pub found:    bool,
    pub inserted: usize,
    /// Malformed rows, orphans and duplicates of already stored keys.
    pub skipped:  usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub files: Vec<FileImport>,
}

impl ImportSummary {
    pub fn inserted(&self) -> usize {
        self.files.iter().map(|f| f.inserted).sum()
    }

    pub fn skipped(&self) -> usize {
        self.files.iter().map(|f| f.skipped).sum()
    }

    pub fn file(&self, table: &str) -> Option<&FileImport> {
        self.files.iter().find(|f| f.table == table)
    }
}

// ── Row access ─────────────────────────────────────────────────────

struct Fields<'a> {
    headers: &'a StringRecord,
    record:  &'a StringRecord,
}

impl<'a> Fields<'a> {
    /// Trimmed value of the named column; empty cells read as `None`.
    fn get(&self, name: &str) -> Option<&'a str> {
        self.headers
            .iter()
            .position(|h| h.trim_start_matches('\u{FEFF}').eq_ignore_ascii_case(name))
            .and_then(|i| self.record.get(i))
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }

    fn required(&self, name: &str) -> Result<&'a str, String> {
        self.get(name).ok_or_else(|| format!("missing {name}"))
    }

    fn owned(&self, name: &str) -> Option<String> {
        self.get(name).map(str::to_string)
    }

    fn timestamp(&self, name: &str) -> Result<Option<Timestamp>, String> {
        self.get(name)
            .map(|v| parse_timestamp(v).map_err(|e| format!("{name}: {e}")))
            .transpose()
    }

    fn number<T: std::str::FromStr>(&self, name: &str) -> Result<T, String> {
        let raw = self.required(name)?;
        raw.parse::<T>().map_err(|_| format!("{name}: not a number: {raw}"))
    }
}

// ── Row parsers ────────────────────────────────────────────────────

fn customer_row(f: &Fields) -> Result<CustomerRow, String> {
    Ok(CustomerRow {
        customer_id:              f.required("customer_id")?.to_string(),
        customer_unique_id:       f.required("customer_unique_id")?.to_string(),
        customer_zip_code_prefix: f.owned("customer_zip_code_prefix"),
        customer_city:            f.owned("customer_city"),
        customer_state:           f.owned("customer_state"),
    })
}

fn product_row(f: &Fields) -> Result<ProductRow, String> {
    Ok(ProductRow {
        product_id:            f.required("product_id")?.to_string(),
        product_category_name: f.owned("product_category_name"),
    })
}

fn seller_row(f: &Fields) -> Result<SellerRow, String> {
    Ok(SellerRow {
        seller_id:              f.required("seller_id")?.to_string(),
        seller_zip_code_prefix: f.owned("seller_zip_code_prefix"),
        seller_city:            f.owned("seller_city"),
        seller_state:           f.owned("seller_state"),
    })
}

fn order_row(f: &Fields) -> Result<OrderRow, String> {
    Ok(OrderRow {
        order_id:                      f.required("order_id")?.to_string(),
        customer_id:                   f.required("customer_id")?.to_string(),
        order_status:                  f.required("order_status")?.to_string(),
        order_purchase_timestamp:      f
            .timestamp("order_purchase_timestamp")?
            .ok_or("missing order_purchase_timestamp")?,
        order_approved_at:             f.timestamp("order_approved_at")?,
        order_delivered_carrier_date:  f.timestamp("order_delivered_carrier_date")?,
        order_delivered_customer_date: f.timestamp("order_delivered_customer_date")?,
        order_estimated_delivery_date: f.timestamp("order_estimated_delivery_date")?,
    })
}

fn item_row(f: &Fields) -> Result<OrderItemRow, String> {
    Ok(OrderItemRow {
        order_id:            f.required("order_id")?.to_string(),
        order_item_id:       f.number("order_item_id")?,
        product_id:          f.owned("product_id"),
        seller_id:           f.owned("seller_id"),
        shipping_limit_date: f.timestamp("shipping_limit_date")?,
        price:               f.number("price")?,
        freight_value:       f.get("freight_value").map_or(Ok(0.0), |_| f.number("freight_value"))?,
    })
}

fn review_row(f: &Fields) -> Result<ReviewRow, String> {
    let review_score: u8 = f.number("review_score")?;
    if !(1..=5).contains(&review_score) {
        return Err(format!("review_score out of range: {review_score}"));
    }
    Ok(ReviewRow {
        review_id:            f.required("review_id")?.to_string(),
        order_id:             f.required("order_id")?.to_string(),
        review_score,
        review_creation_date: f.timestamp("review_creation_date")?,
    })
}

// ── Loader ─────────────────────────────────────────────────────────

fn is_constraint_violation(e: &AnalyticsError) -> bool {
    matches!(
        e,
        AnalyticsError::Database(rusqlite::Error::SqliteFailure(inner, _))
            if inner.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

fn load_file<T>(
    dir: &Path,
    file: &str,
    table: &str,
    parse: impl Fn(&Fields) -> Result<T, String>,
    mut insert: impl FnMut(&T) -> AnalyticsResult<usize>,
) -> AnalyticsResult<FileImport> {
    let mut result = FileImport {
        file:     file.to_string(),
        table:    table.to_string(),
        found:    false,
        inserted: 0,
        skipped:  0,
    };
    let path = dir.join(file);
    if !path.is_file() {
        log::warn!("import: {} not found, {table} left as is", path.display());
        return Ok(result);
    }
    result.found = true;

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(&path)?;
    let headers = reader.headers()?.clone();

    for (line, record) in reader.records().enumerate() {
        let record = match record {
            Ok(r) => r,
            Err(e) => {
                log::warn!("import: {file} row {}: malformed record: {e}", line + 1);
                result.skipped += 1;
                continue;
            }
        };
        let fields = Fields { headers: &headers, record: &record };
        let row = match parse(&fields) {
            Ok(row) => row,
            Err(reason) => {
                log::warn!("import: {file} row {}: {reason}", line + 1);
                result.skipped += 1;
                continue;
            }
        };
        match insert(&row) {
            Ok(0) => result.skipped += 1,
            Ok(_) => result.inserted += 1,
            Err(e) if is_constraint_violation(&e) => {
                log::warn!("import: {file} row {}: {e}", line + 1);
                result.skipped += 1;
            }
            Err(e) => return Err(e),
        }
    }

    log::info!(
        "import: {file} → {table}: {} inserted, {} skipped",
        result.inserted,
        result.skipped
    );
    Ok(result)
}

/// Import every known Olist file found in `dir` into `store`.
/// The store must already be migrated.
pub fn import_olist_csv(store: &AnalyticsStore, dir: &Path) -> AnalyticsResult<ImportSummary> {
    if !dir.is_dir() {
        return Err(AnalyticsError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("import directory {} does not exist", dir.display()),
        )));
    }

    let summary = store.in_transaction(|s| {
        let files = vec![
            load_file(dir, CUSTOMERS_FILE, "customers", customer_row, |r| s.insert_customer(r))?,
            load_file(dir, PRODUCTS_FILE, "products", product_row, |r| s.insert_product(r))?,
            load_file(dir, SELLERS_FILE, "sellers", seller_row, |r| s.insert_seller(r))?,
            load_file(dir, ORDERS_FILE, "orders", order_row, |r| s.insert_order(r))?,
            load_file(dir, ITEMS_FILE, "order_items", item_row, |r| s.insert_order_item(r))?,
            load_file(dir, REVIEWS_FILE, "order_reviews", review_row, |r| s.insert_review(r))?,
        ];
        Ok(ImportSummary { files })
    })?;

    log::info!(
        "import: {} rows inserted, {} skipped from {}",
        summary.inserted(),
        summary.skipped(),
        dir.display()
    );
    Ok(summary)
}
