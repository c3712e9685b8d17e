//! The analytics engine: one entry point per report.
//!
//! Each call:
//!   1. Builds the order filter (config decides `delivered_only`)
//!   2. Fetches facts through the source, memoized per filter key
//!   3. Reshapes them (aggregates, activity, histories)
//!   4. Runs the pure engine and returns its rows
//!
//! RULES:
//!   - Only fetched fact tables are cached. Derived outputs are recomputed.
//!   - Recency is always measured against the dataset-wide latest purchase,
//!     never against the filtered window.
//!   - Source failures propagate as `UpstreamUnavailable`; they are never
//!     turned into empty results.

use crate::{
    cache::ResultCache,
    category_engine::{
        compute_category_performance, compute_category_trends, CategoryMonthlyTrend,
        CategoryPerformance,
    },
    churn_engine::{compute_churn_risk, ChurnRiskReport},
    cohort_engine::{compute_cohort_retention, CohortTable},
    config::AnalyticsConfig,
    customer_value_engine::{compute_customer_value, CustomerValueReport},
    error::AnalyticsResult,
    facts::{
        aggregate_customers, daily_history, monthly_history, order_activity, DateRange,
        OrderFact, OrderFilter,
    },
    geography_engine::{
        compute_customer_geography, compute_seller_geography, CustomerStateSummary,
        SellerStateSummary,
    },
    report_engine::{compute_period_report, PeriodReport},
    rfm_engine::{compute_rfm_segments, RfmInput, RfmReport},
    seasonal_engine::{
        compute_daily_pattern, compute_seasonal_projection, DailySalesPattern, SalesPrediction,
        SalesProjection, SeasonalModel,
    },
    seller_engine::{compute_seller_performance, compute_seller_trends, SellerMonthlyTrend, SellerReport},
    source::OrderFactSource,
    types::Timestamp,
};
use chrono::NaiveDate;
use std::sync::Arc;
use std::time::Duration;

pub struct AnalyticsEngine {
    config:      AnalyticsConfig,
    source:      Box<dyn OrderFactSource>,
    facts_cache: ResultCache<Arc<Vec<OrderFact>>>,
}

impl AnalyticsEngine {
    pub fn new(config: AnalyticsConfig, source: Box<dyn OrderFactSource>) -> Self {
        let facts_cache = ResultCache::new(Duration::from_secs(config.cache.ttl_secs));
        Self {
            config,
            source,
            facts_cache,
        }
    }

    pub fn config(&self) -> &AnalyticsConfig {
        &self.config
    }

    pub fn source_name(&self) -> &str {
        self.source.name()
    }

    /// Filter over `range` with the configured status restriction.
    pub fn base_filter(&self, range: Option<DateRange>) -> OrderFilter {
        OrderFilter {
            range,
            ..OrderFilter::default()
        }
        .delivered(self.config.analysis.delivered_only)
    }

    /// Drop every cached fact table. Call after the underlying data changes.
    pub fn invalidate(&self) {
        self.facts_cache.clear();
        log::debug!("engine: fact cache cleared");
    }

    fn facts(&self, filter: &OrderFilter) -> AnalyticsResult<Arc<Vec<OrderFact>>> {
        let key = format!("order_facts:{}", filter.cache_key());
        self.facts_cache.get_or_try_insert(&key, || {
            let facts = self.source.fetch_order_facts(filter)?;
            log::debug!("engine: fetched {} facts from {}", facts.len(), self.source.name());
            Ok(Arc::new(facts))
        })
    }

    fn reference(&self) -> AnalyticsResult<Option<Timestamp>> {
        self.source.latest_purchase()
    }

    // ── Reports ────────────────────────────────────────────────────

    pub fn rfm_segments(&self, filter: &OrderFilter) -> AnalyticsResult<RfmReport> {
        let facts = self.facts(filter)?;
        let Some(reference) = self.reference()? else {
            return Ok(RfmReport::default());
        };
        let inputs: Vec<RfmInput> = aggregate_customers(&facts, reference)
            .iter()
            .map(RfmInput::from)
            .collect();
        Ok(compute_rfm_segments(&inputs))
    }

    /// `months_limit` falls back to the configured horizon when `None`.
    pub fn cohort_retention(
        &self,
        filter: &OrderFilter,
        months_limit: Option<i32>,
    ) -> AnalyticsResult<CohortTable> {
        let limit = months_limit.unwrap_or(self.config.analysis.months_limit);
        let facts = self.facts(filter)?;
        compute_cohort_retention(&order_activity(&facts), limit)
    }

    pub fn seasonal_model(&self, filter: &OrderFilter) -> AnalyticsResult<SeasonalModel> {
        let facts = self.facts(filter)?;
        compute_seasonal_projection(&monthly_history(&facts))
    }

    pub fn project_sales(
        &self,
        filter: &OrderFilter,
        target_month: u32,
        target_year: i32,
        base_monthly_revenue: f64,
    ) -> AnalyticsResult<SalesProjection> {
        self.seasonal_model(filter)?
            .project(target_month, target_year, base_monthly_revenue)
    }

    pub fn daily_pattern(&self, filter: &OrderFilter) -> AnalyticsResult<DailySalesPattern> {
        let facts = self.facts(filter)?;
        Ok(compute_daily_pattern(&daily_history(&facts), self.config.forecast))
    }

    pub fn predict_day(
        &self,
        filter: &OrderFilter,
        target_date: NaiveDate,
    ) -> AnalyticsResult<SalesPrediction> {
        self.daily_pattern(filter)?.predict(target_date)
    }

    pub fn churn_risk(&self, filter: &OrderFilter) -> AnalyticsResult<ChurnRiskReport> {
        let facts = self.facts(filter)?;
        let Some(reference) = self.reference()? else {
            return Ok(ChurnRiskReport::default());
        };
        Ok(compute_churn_risk(&facts, reference, &self.config.churn_risk))
    }

    pub fn customer_value(&self, filter: &OrderFilter) -> AnalyticsResult<CustomerValueReport> {
        let facts = self.facts(filter)?;
        // Lifetime value does not use recency; any reference works.
        let Some(reference) = facts.iter().map(|f| f.purchased_at).max() else {
            return Ok(CustomerValueReport::default());
        };
        let customers = aggregate_customers(&facts, reference);
        Ok(compute_customer_value(&customers, &self.config.customer_value))
    }

    // ── Sellers, categories, geography ─────────────────────────────

    pub fn seller_performance(&self, filter: &OrderFilter) -> AnalyticsResult<SellerReport> {
        let facts = self.facts(filter)?;
        Ok(compute_seller_performance(&facts, &self.config.sellers))
    }

    pub fn seller_trends(&self, filter: &OrderFilter) -> AnalyticsResult<Vec<SellerMonthlyTrend>> {
        let facts = self.facts(filter)?;
        Ok(compute_seller_trends(&facts))
    }

    pub fn category_performance(&self, filter: &OrderFilter) -> AnalyticsResult<Vec<CategoryPerformance>> {
        let facts = self.facts(filter)?;
        Ok(compute_category_performance(&facts))
    }

    pub fn category_trends(&self, filter: &OrderFilter) -> AnalyticsResult<Vec<CategoryMonthlyTrend>> {
        let facts = self.facts(filter)?;
        Ok(compute_category_trends(&facts))
    }

    pub fn customer_geography(&self, filter: &OrderFilter) -> AnalyticsResult<Vec<CustomerStateSummary>> {
        let facts = self.facts(filter)?;
        Ok(compute_customer_geography(&facts))
    }

    pub fn seller_geography(&self, filter: &OrderFilter) -> AnalyticsResult<Vec<SellerStateSummary>> {
        let facts = self.facts(filter)?;
        Ok(compute_seller_geography(&facts))
    }

    // ── Period report ──────────────────────────────────────────────

    /// Business report over `range`. Sales count every order status; "new"
    /// customers are those with no order of any status before the window.
    /// Deliveries are the delivered orders whose delivery date is in `range`.
    pub fn period_report(&self, range: DateRange) -> AnalyticsResult<PeriodReport> {
        let sales = self.facts(&OrderFilter::all().with_range(range))?;
        let deliveries = self.facts(&OrderFilter::all().delivered(true).delivered_within(range))?;
        let returning = self.source.customers_before(range.start())?;
        Ok(compute_period_report(&sales, &deliveries, range, &returning))
    }
}
