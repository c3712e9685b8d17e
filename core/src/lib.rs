//! Olist storefront analytics core.
//!
//! Pure engines turn order facts into customer metrics:
//!   - rfm_engine            recency / frequency / monetary segmentation
//!   - cohort_engine         first-purchase cohorts and month-over-month retention
//!   - seasonal_engine       seasonal indices, projections and day-level prediction
//!   - churn_engine          churn risk scoring and buckets
//!   - customer_value_engine lifetime value segments and purchase frequency buckets
//!   - report_engine         period business report
//!   - seller_engine         seller KPIs, percentile ranks, tiers and monthly trends
//!   - category_engine       category performance and monthly category trends
//!   - geography_engine      customer and seller roll-ups by state
//!
//! RULE: engines never touch the database. They take rows in and hand rows
//! back. Data access lives behind `source::OrderFactSource`.

pub mod cache;
pub mod category_engine;
pub mod churn_engine;
pub mod cohort_engine;
pub mod config;
pub mod customer_value_engine;
pub mod demo;
pub mod engine;
pub mod error;
pub mod facts;
pub mod geography_engine;
pub mod import;
pub mod report_engine;
pub mod rfm_engine;
pub mod rng;
pub mod seasonal_engine;
pub mod seller_engine;
pub mod source;
pub mod store;
pub mod types;

pub use cohort_engine::compute_cohort_retention;
pub use rfm_engine::compute_rfm_segments;
pub use seasonal_engine::compute_seasonal_projection;
