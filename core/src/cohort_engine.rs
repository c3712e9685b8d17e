//! Cohort retention engine — first-purchase cohorts tracked month over month.
//!
//! This engine:
//!   1. Assigns each customer to the month of their earliest purchase
//!   2. Offsets every later purchase by whole calendar months from that month
//!   3. Counts distinct active customers and revenue per (cohort, offset)
//!   4. Derives retention against the cohort's original size
//!   5. Pivots cohorts × offsets for heatmaps, optionally rolled up by period
//!
//! Month 0 retention is always 100: every member buys in their own cohort month.

use crate::{
    error::{AnalyticsError, AnalyticsResult},
    facts::CustomerActivity,
    types::{mean, month_start, months_between, round2},
};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

// ── Public types ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CohortRow {
    pub cohort_month:             NaiveDate,
    pub original_cohort_size:     usize,
    pub month_number:             u32,
    pub active_customers:         usize,
    pub cohort_revenue:           f64,
    pub retention_rate:           f64,
    /// `None` when no customer was active, never a division by zero.
    pub avg_revenue_per_customer: Option<f64>,
}

/// Rows ordered by (cohort_month, month_number).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CohortTable {
    pub rows:         Vec<CohortRow>,
    pub months_limit: u32,
}

/// Cohort × month_number grid of retention rates. Missing offsets are `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetentionPivot {
    pub rows:          Vec<PivotRow>,
    pub month_numbers: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PivotRow {
    /// First day of the period this row covers; rows sort on it.
    pub period_start: NaiveDate,
    pub label:        String,
    pub cells:        Vec<Option<f64>>,
}

impl RetentionPivot {
    pub fn cell(&self, period_start: NaiveDate, month_number: u32) -> Option<f64> {
        let col = self.month_numbers.iter().position(|m| *m == month_number)?;
        self.rows
            .iter()
            .find(|r| r.period_start == period_start)
            .and_then(|r| r.cells[col])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CohortPeriod {
    Month,
    Quarter,
    Semester,
    Year,
}

impl CohortPeriod {
    fn key(&self, cohort_month: NaiveDate) -> (NaiveDate, String) {
        let year = cohort_month.year();
        let month0 = cohort_month.month0();
        let (start_month0, label) = match self {
            Self::Month    => (month0, format!("{year}-{:02}", month0 + 1)),
            Self::Quarter  => (month0 / 3 * 3, format!("{year}-Q{}", month0 / 3 + 1)),
            Self::Semester => (month0 / 6 * 6, format!("{year}-S{}", month0 / 6 + 1)),
            Self::Year     => (0, format!("{year}")),
        };
        let start = NaiveDate::from_ymd_opt(year, start_month0 + 1, 1).unwrap_or(cohort_month);
        (start, label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CohortSummary {
    pub cohort_count:                     usize,
    pub total_customers:                  usize,
    pub avg_retention_month_1:            Option<f64>,
    pub avg_retention_month_3:            Option<f64>,
    pub avg_revenue_per_customer_month_0: Option<f64>,
}

// ── Engine ───────────────────────────────────────────────────────────────────

/// Build the cohort table from per-order activity.
///
/// Each customer's cohort is the month of their earliest activity in the
/// input, so offsets are never negative. Offsets beyond `months_limit` are
/// dropped.
pub fn compute_cohort_retention(
    activity: &[CustomerActivity],
    months_limit: i32,
) -> AnalyticsResult<CohortTable> {
    if months_limit <= 0 {
        return Err(AnalyticsError::InvalidMonthsLimit { months_limit });
    }
    let limit = months_limit as u32;

    let mut cohort_of: HashMap<&str, NaiveDate> = HashMap::new();
    for a in activity {
        let month = month_start(&a.purchased_at);
        cohort_of
            .entry(a.customer_unique_id.as_str())
            .and_modify(|m| *m = (*m).min(month))
            .or_insert(month);
    }

    let mut cohort_size: HashMap<NaiveDate, usize> = HashMap::new();
    for month in cohort_of.values() {
        *cohort_size.entry(*month).or_default() += 1;
    }

    struct Cell<'a> {
        customers: BTreeSet<&'a str>,
        revenue:   f64,
    }

    let mut cells: BTreeMap<(NaiveDate, u32), Cell> = BTreeMap::new();
    for a in activity {
        let cohort = cohort_of[a.customer_unique_id.as_str()];
        let offset = months_between(cohort, month_start(&a.purchased_at));
        // Cohort is the minimum month, so the offset cannot be negative.
        let offset = offset.max(0) as u32;
        if offset > limit {
            continue;
        }
        let cell = cells.entry((cohort, offset)).or_insert_with(|| Cell {
            customers: BTreeSet::new(),
            revenue:   0.0,
        });
        cell.customers.insert(a.customer_unique_id.as_str());
        cell.revenue += a.revenue;
    }

    let rows: Vec<CohortRow> = cells
        .into_iter()
        .map(|((cohort_month, month_number), cell)| {
            let original = cohort_size[&cohort_month];
            let active = cell.customers.len();
            CohortRow {
                cohort_month,
                original_cohort_size: original,
                month_number,
                active_customers: active,
                cohort_revenue: cell.revenue,
                retention_rate: round2(active as f64 / original as f64 * 100.0),
                avg_revenue_per_customer: safe_ratio(cell.revenue, active).map(round2),
            }
        })
        .collect();

    log::info!(
        "cohort: {} cohorts, {} rows (months_limit={limit})",
        cohort_size.len(),
        rows.len()
    );

    Ok(CohortTable { rows, months_limit: limit })
}

fn safe_ratio(numerator: f64, denominator: usize) -> Option<f64> {
    if denominator == 0 {
        None
    } else {
        Some(numerator / denominator as f64)
    }
}

impl CohortTable {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Distinct cohort months, chronological.
    pub fn cohorts(&self) -> Vec<NaiveDate> {
        let set: BTreeSet<NaiveDate> = self.rows.iter().map(|r| r.cohort_month).collect();
        set.into_iter().collect()
    }

    /// Retention heatmap with one row per cohort month.
    pub fn pivot(&self) -> RetentionPivot {
        self.pivot_by(CohortPeriod::Month)
    }

    /// Retention heatmap with cohorts rolled up into periods. A cell is the
    /// mean retention of the period's cohorts that reached that offset.
    pub fn pivot_by(&self, period: CohortPeriod) -> RetentionPivot {
        let month_numbers: Vec<u32> = self
            .rows
            .iter()
            .map(|r| r.month_number)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let mut grouped: BTreeMap<NaiveDate, (String, BTreeMap<u32, Vec<f64>>)> = BTreeMap::new();
        for row in &self.rows {
            let (start, label) = period.key(row.cohort_month);
            grouped
                .entry(start)
                .or_insert_with(|| (label, BTreeMap::new()))
                .1
                .entry(row.month_number)
                .or_default()
                .push(row.retention_rate);
        }

        let rows = grouped
            .into_iter()
            .map(|(period_start, (label, by_month))| PivotRow {
                period_start,
                label,
                cells: month_numbers
                    .iter()
                    .map(|m| by_month.get(m).and_then(|rates| mean(rates)).map(round2))
                    .collect(),
            })
            .collect();

        RetentionPivot { rows, month_numbers }
    }

    /// Keep only the `n` latest cohorts.
    pub fn most_recent(&self, n: usize) -> CohortTable {
        let cohorts = self.cohorts();
        let keep: BTreeSet<NaiveDate> = cohorts.iter().rev().take(n).copied().collect();
        CohortTable {
            rows: self
                .rows
                .iter()
                .filter(|r| keep.contains(&r.cohort_month))
                .cloned()
                .collect(),
            months_limit: self.months_limit,
        }
    }

    /// Headline metrics across cohorts.
    pub fn summary(&self) -> CohortSummary {
        let at = |month: u32| -> Vec<&CohortRow> {
            self.rows.iter().filter(|r| r.month_number == month).collect()
        };
        let month_0 = at(0);
        let avg_rate = |month: u32| -> Option<f64> {
            let rates: Vec<f64> = at(month).iter().map(|r| r.retention_rate).collect();
            mean(&rates).map(round2)
        };
        let revenue_m0: Vec<f64> = month_0
            .iter()
            .filter_map(|r| r.avg_revenue_per_customer)
            .collect();

        CohortSummary {
            cohort_count:                     month_0.len(),
            total_customers:                  month_0.iter().map(|r| r.original_cohort_size).sum(),
            avg_retention_month_1:            avg_rate(1),
            avg_retention_month_3:            avg_rate(3),
            avg_revenue_per_customer_month_0: mean(&revenue_m0).map(round2),
        }
    }
}
