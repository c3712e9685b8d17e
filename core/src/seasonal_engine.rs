//! Seasonal projection engine.
//!
//! Monthly model:
//!   1. Average revenue and orders per calendar month across all years
//!   2. Index = month average / mean of the monthly averages (centered on 1.0)
//!   3. Projection = base monthly revenue × revenue index of the target month
//!
//! Day-level model:
//!   4. Average revenue and orders per (calendar month, day of week), with the
//!      number of observed days behind each bucket driving a confidence tier
//!
//! The index is year-agnostic. `target_year` is carried through projections
//! but no growth trend is applied.

use crate::{
    config::ForecastConfig,
    error::{AnalyticsError, AnalyticsResult},
    facts::{DailyHistory, MonthlyHistory},
    types::round2,
};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ── Public types ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonalIndex {
    pub month_number:           u32,
    pub avg_monthly_revenue:    f64,
    pub avg_monthly_orders:     f64,
    pub revenue_seasonal_index: f64,
    pub orders_seasonal_index:  f64,
    /// How many distinct years contributed to the averages.
    pub years_observed:         usize,
}

/// One row per calendar month that has history, ordered by month.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeasonalModel {
    indices: Vec<SeasonalIndex>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesProjection {
    pub target_month:           u32,
    pub target_year:            i32,
    pub base_monthly_revenue:   f64,
    pub revenue_seasonal_index: f64,
    pub projected_revenue:      f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfidenceLevel {
    #[serde(rename = "Élevé")]
    High,
    #[serde(rename = "Moyen")]
    Medium,
    #[serde(rename = "Faible")]
    Low,
}

impl ConfidenceLevel {
    pub fn label(&self) -> &'static str {
        match self {
            Self::High   => "Élevé",
            Self::Medium => "Moyen",
            Self::Low    => "Faible",
        }
    }

    /// More observed days behind a bucket → higher tier.
    pub fn from_samples(samples: usize, thresholds: &ForecastConfig) -> Self {
        if samples >= thresholds.high_min_samples {
            Self::High
        } else if samples >= thresholds.medium_min_samples {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyPatternRow {
    pub month:              u32,
    /// 0 = Sunday … 6 = Saturday.
    pub day_of_week:        u32,
    pub avg_revenue_by_day: f64,
    pub avg_orders_by_day:  f64,
    pub sample_days:        usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySalesPattern {
    rows:       Vec<DailyPatternRow>,
    thresholds: ForecastConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesPrediction {
    pub target_date:       NaiveDate,
    pub month:             u32,
    pub day_of_week:       u32,
    pub predicted_revenue: f64,
    pub predicted_orders:  f64,
    pub sample_days:       usize,
    pub confidence_level:  ConfidenceLevel,
}

// ── Monthly model ────────────────────────────────────────────────────────────

fn check_month(month: u32) -> AnalyticsResult<()> {
    if (1..=12).contains(&month) {
        Ok(())
    } else {
        Err(AnalyticsError::InvalidMonth { month })
    }
}

/// Build the seasonal index table. Empty history yields an empty model; a
/// single month of history yields a single index of 1.0.
pub fn compute_seasonal_projection(history: &[MonthlyHistory]) -> AnalyticsResult<SeasonalModel> {
    struct Acc {
        revenue: f64,
        orders:  f64,
        years:   std::collections::BTreeSet<i32>,
        samples: usize,
    }

    let mut by_month: BTreeMap<u32, Acc> = BTreeMap::new();
    for h in history {
        check_month(h.month)?;
        let acc = by_month.entry(h.month).or_insert_with(|| Acc {
            revenue: 0.0,
            orders:  0.0,
            years:   Default::default(),
            samples: 0,
        });
        acc.revenue += h.revenue;
        acc.orders += h.orders as f64;
        acc.years.insert(h.year);
        acc.samples += 1;
    }

    if by_month.is_empty() {
        return Ok(SeasonalModel::default());
    }

    let averages: Vec<(u32, f64, f64, usize)> = by_month
        .into_iter()
        .map(|(month, acc)| {
            let n = acc.samples as f64;
            (month, acc.revenue / n, acc.orders / n, acc.years.len())
        })
        .collect();

    let months = averages.len() as f64;
    let overall_revenue = averages.iter().map(|a| a.1).sum::<f64>() / months;
    let overall_orders = averages.iter().map(|a| a.2).sum::<f64>() / months;

    let indices = averages
        .into_iter()
        .map(|(month, revenue, orders, years)| SeasonalIndex {
            month_number:           month,
            avg_monthly_revenue:    revenue,
            avg_monthly_orders:     orders,
            revenue_seasonal_index: ratio_or_flat(revenue, overall_revenue),
            orders_seasonal_index:  ratio_or_flat(orders, overall_orders),
            years_observed:         years,
        })
        .collect::<Vec<_>>();

    log::info!("seasonal: {} monthly indices from {} history rows", indices.len(), history.len());
    Ok(SeasonalModel { indices })
}

/// All-zero history carries no seasonality; treat every month as average.
fn ratio_or_flat(value: f64, overall: f64) -> f64 {
    if overall == 0.0 {
        1.0
    } else {
        value / overall
    }
}

impl SeasonalModel {
    pub fn indices(&self) -> &[SeasonalIndex] {
        &self.indices
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn index_for(&self, month: u32) -> AnalyticsResult<&SeasonalIndex> {
        check_month(month)?;
        self.indices
            .iter()
            .find(|i| i.month_number == month)
            .ok_or(AnalyticsError::NoSeasonalHistory { month })
    }

    /// Scale a flat monthly revenue by the target month's seasonality.
    pub fn project(
        &self,
        target_month: u32,
        target_year: i32,
        base_monthly_revenue: f64,
    ) -> AnalyticsResult<SalesProjection> {
        let index = self.index_for(target_month)?;
        let projected_revenue = base_monthly_revenue * index.revenue_seasonal_index;
        log::debug!(
            "seasonal: project month={target_month} year={target_year} base={base_monthly_revenue:.2} → {projected_revenue:.2}"
        );
        Ok(SalesProjection {
            target_month,
            target_year,
            base_monthly_revenue,
            revenue_seasonal_index: index.revenue_seasonal_index,
            projected_revenue,
        })
    }
}

// ── Day-level model ──────────────────────────────────────────────────────────

fn day_of_week(date: NaiveDate) -> u32 {
    date.weekday().num_days_from_sunday()
}

pub fn compute_daily_pattern(history: &[DailyHistory], thresholds: ForecastConfig) -> DailySalesPattern {
    let mut buckets: BTreeMap<(u32, u32), (f64, f64, usize)> = BTreeMap::new();
    for day in history {
        let entry = buckets
            .entry((day.date.month(), day_of_week(day.date)))
            .or_default();
        entry.0 += day.revenue;
        entry.1 += day.orders as f64;
        entry.2 += 1;
    }

    let rows: Vec<DailyPatternRow> = buckets
        .into_iter()
        .map(|((month, dow), (revenue, orders, samples))| DailyPatternRow {
            month,
            day_of_week:        dow,
            avg_revenue_by_day: round2(revenue / samples as f64),
            avg_orders_by_day:  round2(orders / samples as f64),
            sample_days:        samples,
        })
        .collect();

    log::info!("seasonal: {} (month, weekday) buckets from {} days", rows.len(), history.len());
    DailySalesPattern { rows, thresholds }
}

impl DailySalesPattern {
    pub fn rows(&self) -> &[DailyPatternRow] {
        &self.rows
    }

    pub fn bucket(&self, month: u32, day_of_week: u32) -> Option<&DailyPatternRow> {
        self.rows
            .iter()
            .find(|r| r.month == month && r.day_of_week == day_of_week)
    }

    /// Predict one date from the average of its (month, weekday) bucket.
    pub fn predict(&self, target_date: NaiveDate) -> AnalyticsResult<SalesPrediction> {
        let month = target_date.month();
        let dow = day_of_week(target_date);
        let row = self
            .bucket(month, dow)
            .ok_or(AnalyticsError::NoDailyHistory { month, day_of_week: dow })?;

        Ok(SalesPrediction {
            target_date,
            month,
            day_of_week:       dow,
            predicted_revenue: row.avg_revenue_by_day,
            predicted_orders:  row.avg_orders_by_day,
            sample_days:       row.sample_days,
            confidence_level:  ConfidenceLevel::from_samples(row.sample_days, &self.thresholds),
        })
    }
}
