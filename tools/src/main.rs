//! report-runner: headless analytics runner over an Olist database.
//!
//! Usage:
//!   report-runner --db olist.db --import-dir ./olist-csv --report all
//!   report-runner --demo --seed 7 --report cohort --months 12
//!   report-runner --db olist.db --start 2017-01-01 --end 2017-12-31 --report rfm --json
//!   report-runner --demo --report sellers

use anyhow::{bail, Context, Result};
use chrono::{Datelike, Duration, NaiveDate};
use olist_core::{
    category_engine::CategoryPerformance,
    churn_engine::ChurnRiskSummary,
    cohort_engine::{CohortPeriod, CohortSummary, RetentionPivot},
    config::AnalyticsConfig,
    customer_value_engine::{FrequencyBucketSummary, ValueSegmentSummary},
    demo::{generate, DemoOptions},
    engine::AnalyticsEngine,
    facts::DateRange,
    geography_engine::{CustomerStateSummary, SellerStateSummary},
    import::import_olist_csv,
    report_engine::PeriodReport,
    rfm_engine::SegmentSummary,
    seasonal_engine::{SalesPrediction, SalesProjection, SeasonalIndex, SeasonalModel},
    seller_engine::{SellerPerformance, SellerTierSummary},
    store::AnalyticsStore,
    types::mean,
};
use serde::Serialize;
use std::env;
use std::path::Path;

const REPORTS: [&str; 10] = [
    "rfm", "cohort", "seasonal", "forecast", "churn", "value", "sellers", "categories", "geography",
    "summary",
];
const TOP_SELLERS: usize = 10;

#[derive(Serialize, Default)]
struct Output {
    source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    rfm: Option<Vec<SegmentSummary>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cohort: Option<CohortOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    seasonal: Option<SeasonalOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    forecast: Option<Vec<SalesPrediction>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    churn: Option<Vec<ChurnRiskSummary>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<ValueOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sellers: Option<SellerOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    categories: Option<Vec<CategoryPerformance>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    geography: Option<GeographyOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<PeriodReport>,
}

#[derive(Serialize)]
struct SellerOutput {
    ranked: usize,
    tiers:  Vec<SellerTierSummary>,
    top:    Vec<SellerPerformance>,
}

#[derive(Serialize)]
struct GeographyOutput {
    customers: Vec<CustomerStateSummary>,
    sellers:   Vec<SellerStateSummary>,
}

#[derive(Serialize)]
struct CohortOutput {
    summary:   CohortSummary,
    monthly:   RetentionPivot,
    quarterly: RetentionPivot,
}

#[derive(Serialize)]
struct SeasonalOutput {
    indices:    Vec<SeasonalIndex>,
    projection: Option<SalesProjection>,
}

#[derive(Serialize)]
struct ValueOutput {
    segments:  Vec<ValueSegmentSummary>,
    frequency: Vec<FrequencyBucketSummary>,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let seed = parse_arg(&args, "--seed", 42u64);
    let demo = args.iter().any(|a| a == "--demo");
    let json = args.iter().any(|a| a == "--json");
    let db = flag_value(&args, "--db").unwrap_or(":memory:");
    let data_dir = flag_value(&args, "--data-dir").unwrap_or("./data");
    let import_dir = flag_value(&args, "--import-dir");
    let report = flag_value(&args, "--report").unwrap_or("all");
    let start = parse_date(&args, "--start")?;
    let end = parse_date(&args, "--end")?;

    if report != "all" && !REPORTS.contains(&report) {
        bail!("unknown report '{report}', expected one of: all, {}", REPORTS.join(", "));
    }

    let config = AnalyticsConfig::load(data_dir)?;
    let months = parse_arg(&args, "--months", config.analysis.months_limit);

    if !json {
        println!("Olist analytics: report-runner");
        println!("  db:        {db}");
        println!("  data_dir:  {data_dir}");
        println!("  report:    {report}");
        if demo {
            println!("  demo seed: {seed}");
        }
        println!();
    }

    let store = if db == ":memory:" {
        AnalyticsStore::in_memory()?
    } else if demo || import_dir.is_some() {
        AnalyticsStore::open(db)?
    } else {
        AnalyticsStore::open_existing(db)?
    };
    store.migrate()?;

    if let Some(dir) = import_dir {
        let summary = import_olist_csv(&store, Path::new(dir))?;
        if !json {
            for f in &summary.files {
                println!(
                    "  import {:<16} {:>8} inserted {:>6} skipped{}",
                    f.table,
                    f.inserted,
                    f.skipped,
                    if f.found { "" } else { "  (file missing)" }
                );
            }
            println!();
        }
    }
    if demo {
        let options = DemoOptions { seed, ..DemoOptions::default() };
        generate(&options).load_into(&store)?;
    }

    let Some((first_day, last_day)) = store.date_range()? else {
        bail!("no orders in {db}; use --import-dir or --demo");
    };
    log::info!("runner: dataset spans {first_day} .. {last_day}");
    let range = match (start, end) {
        (None, None) => None,
        (s, e) => Some(DateRange::new(s.unwrap_or(first_day), e.unwrap_or(last_day))?),
    };

    let engine = AnalyticsEngine::new(config, Box::new(store));
    let filter = engine.base_filter(range);
    let wants = |name: &str| report == "all" || report == name;
    let mut out = Output {
        source: engine.source_name().to_string(),
        ..Output::default()
    };

    if wants("rfm") {
        out.rfm = Some(engine.rfm_segments(&filter)?.segments);
    }
    if wants("cohort") {
        let table = engine.cohort_retention(&filter, Some(months))?;
        out.cohort = Some(CohortOutput {
            summary:   table.summary(),
            monthly:   table.pivot(),
            quarterly: table.pivot_by(CohortPeriod::Quarter),
        });
    }
    if wants("seasonal") {
        let model = engine.seasonal_model(&filter)?;
        out.seasonal = Some(SeasonalOutput {
            indices:    model.indices().to_vec(),
            projection: next_month_projection(&model, last_day),
        });
    }
    if wants("forecast") {
        let pattern = engine.daily_pattern(&filter)?;
        let predictions = (1..=7)
            .filter_map(|n| pattern.predict(last_day + Duration::days(n)).ok())
            .collect();
        out.forecast = Some(predictions);
    }
    if wants("churn") {
        out.churn = Some(engine.churn_risk(&filter)?.levels);
    }
    if wants("value") {
        let value = engine.customer_value(&filter)?;
        out.value = Some(ValueOutput {
            segments:  value.segments,
            frequency: value.frequency,
        });
    }
    if wants("sellers") {
        let report = engine.seller_performance(&filter)?;
        out.sellers = Some(SellerOutput {
            ranked: report.sellers.len(),
            tiers:  report.tiers,
            top:    report.sellers.into_iter().take(TOP_SELLERS).collect(),
        });
    }
    if wants("categories") {
        out.categories = Some(engine.category_performance(&filter)?);
    }
    if wants("geography") {
        out.geography = Some(GeographyOutput {
            customers: engine.customer_geography(&filter)?,
            sellers:   engine.seller_geography(&filter)?,
        });
    }
    if wants("summary") {
        let window = match range {
            Some(r) => r,
            None => DateRange::new(first_day, last_day)?,
        };
        out.summary = Some(engine.period_report(window)?);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        print_text(&out);
    }
    Ok(())
}

/// Project the month after `last_day` from the mean monthly revenue. A month
/// without history is logged and yields no projection.
fn next_month_projection(model: &SeasonalModel, last_day: NaiveDate) -> Option<SalesProjection> {
    let base = mean(&model.indices().iter().map(|i| i.avg_monthly_revenue).collect::<Vec<_>>())?;
    let next = last_day
        .with_day(1)
        .and_then(|d| d.checked_add_months(chrono::Months::new(1)))
        .unwrap_or(last_day);
    match model.project(next.month(), next.year(), base) {
        Ok(p) => Some(p),
        Err(e) => {
            log::warn!("runner: no projection for {}-{:02}: {e}", next.year(), next.month());
            None
        }
    }
}

fn print_text(out: &Output) {
    if let Some(segments) = &out.rfm {
        println!("=== RFM SEGMENTS ===");
        for s in segments {
            println!(
                "  {:<20} {:>6} cust {:>6.2}% | R {:>6.1}d F {:>4.2} M {:>9.2} | rev {:>6.2}%",
                s.customer_segment.label(),
                s.customer_count,
                s.percentage,
                s.avg_recency_days,
                s.avg_frequency,
                s.avg_monetary_value,
                s.revenue_percentage
            );
        }
        println!();
    }

    if let Some(cohort) = &out.cohort {
        println!("=== COHORT RETENTION (%) ===");
        let header: Vec<String> = cohort.monthly.month_numbers.iter().map(|m| format!("{m:>7}")).collect();
        println!("  {:<8}{}", "cohort", header.join(""));
        for row in &cohort.monthly.rows {
            let cells: Vec<String> = row
                .cells
                .iter()
                .map(|c| c.map_or_else(|| format!("{:>7}", "-"), |v| format!("{v:>7.2}")))
                .collect();
            println!("  {:<8}{}", row.label, cells.join(""));
        }
        let s = &cohort.summary;
        println!(
            "  cohorts: {} | customers: {} | month 1: {} | month 3: {}",
            s.cohort_count,
            s.total_customers,
            fmt_opt(s.avg_retention_month_1, "%"),
            fmt_opt(s.avg_retention_month_3, "%")
        );
        println!();
    }

    if let Some(seasonal) = &out.seasonal {
        println!("=== SEASONAL INDICES ===");
        for i in &seasonal.indices {
            println!(
                "  month {:>2} | revenue {:>11.2} | index {:>5.2} | years {}",
                i.month_number, i.avg_monthly_revenue, i.revenue_seasonal_index, i.years_observed
            );
        }
        if let Some(p) = &seasonal.projection {
            println!(
                "  projection {}-{:02}: base {:.2} × {:.2} = {:.2}",
                p.target_year, p.target_month, p.base_monthly_revenue, p.revenue_seasonal_index, p.projected_revenue
            );
        }
        println!();
    }

    if let Some(forecast) = &out.forecast {
        println!("=== NEXT 7 DAYS ===");
        for p in forecast {
            println!(
                "  {} | revenue {:>9.2} | orders {:>6.2} | {} ({} days)",
                p.target_date,
                p.predicted_revenue,
                p.predicted_orders,
                p.confidence_level.label(),
                p.sample_days
            );
        }
        println!();
    }

    if let Some(levels) = &out.churn {
        println!("=== CHURN RISK ===");
        for l in levels {
            println!(
                "  {:<7} {:>6} cust | score {:.2} | {:>4.0}d since purchase | {:.1} orders | satisfaction {}",
                l.churn_risk_level.label(),
                l.customer_count,
                l.avg_risk_score,
                l.avg_days_since_purchase,
                l.avg_orders,
                fmt_opt(l.avg_satisfaction, "")
            );
        }
        println!();
    }

    if let Some(value) = &out.value {
        println!("=== CUSTOMER VALUE ===");
        for s in &value.segments {
            println!(
                "  {:<13} {:>6} cust | annual {:>9.2} | total {:>12.2}",
                s.customer_segment.label(),
                s.customer_count,
                s.avg_annual_value,
                s.total_annual_value
            );
        }
        for f in &value.frequency {
            println!(
                "  {:<13} {:>6} cust | lifespan {:>7.1}d",
                f.purchase_frequency.label(),
                f.customer_count,
                f.avg_lifespan_days
            );
        }
        println!();
    }

    if let Some(sellers) = &out.sellers {
        println!("=== SELLERS ({} ranked) ===", sellers.ranked);
        for t in &sellers.tiers {
            println!(
                "  {:<17} {:>5} sellers | revenue {:>12.2} | review {} | on time {:>6.2}%",
                t.performance_category.label(),
                t.seller_count,
                t.total_revenue,
                fmt_opt(t.avg_review, ""),
                t.avg_on_time_rate
            );
        }
        for s in &sellers.top {
            println!(
                "  {} {:<3} {:>5} orders | revenue {:>10.2} | {}",
                s.seller_id.chars().take(8).collect::<String>(),
                s.seller_state.as_deref().unwrap_or("-"),
                s.total_orders,
                s.total_revenue,
                s.performance_category.label()
            );
        }
        println!();
    }

    if let Some(categories) = &out.categories {
        println!("=== CATEGORIES ===");
        for c in categories {
            println!(
                "  {:<24} {:>6} orders | revenue {:>11.2} ({:>5.2}%) | avg price {:>8.2} | review {}",
                c.category_name,
                c.order_count,
                c.total_revenue,
                c.revenue_share,
                c.avg_price,
                fmt_opt(c.avg_review_score, "")
            );
        }
        println!();
    }

    if let Some(geo) = &out.geography {
        println!("=== GEOGRAPHY ===");
        for g in &geo.customers {
            println!(
                "  customers {:<3} {:>6} | avg spend {:>8.2} | total {:>12.2}",
                g.customer_state, g.customer_count, g.avg_total_spend, g.total_state_spend
            );
        }
        for g in &geo.sellers {
            println!(
                "  sellers   {:<3} {:>6} | orders {:>6} | revenue {:>12.2}",
                g.seller_state, g.seller_count, g.total_orders, g.total_revenue
            );
        }
        println!();
    }

    if let Some(r) = &out.summary {
        println!("=== PERIOD REPORT {} .. {} ===", r.report_start_date, r.report_end_date);
        println!("  orders:          {}", r.total_orders);
        println!("  revenue:         {:.2}", r.total_revenue);
        println!("  customers:       {} ({} new)", r.unique_customers, r.new_customer_count);
        println!("  delivered:       {} ({} late)", r.total_delivered, r.late_deliveries);
        println!("  delivery days:   {}", fmt_opt(r.avg_delivery_days, ""));
        println!(
            "  reviews:         {} avg {} (+{} / -{})",
            r.total_reviews,
            fmt_opt(r.avg_review_score, ""),
            r.positive_reviews,
            r.negative_reviews
        );
    }
}

fn fmt_opt(value: Option<f64>, unit: &str) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{v:.2}{unit}"))
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    flag_value(args, flag)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_date(args: &[String], flag: &str) -> Result<Option<NaiveDate>> {
    flag_value(args, flag)
        .map(|v| {
            NaiveDate::parse_from_str(v, "%Y-%m-%d")
                .with_context(|| format!("{flag} expects YYYY-MM-DD, got '{v}'"))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use olist_core::{compute_seasonal_projection, facts::MonthlyHistory};

    fn history(months: &[u32]) -> Vec<MonthlyHistory> {
        months
            .iter()
            .map(|&month| MonthlyHistory { year: 2017, month, revenue: 1_000.0 * month as f64, orders: 10 })
            .collect()
    }

    #[test]
    fn projects_the_following_month() {
        let model = compute_seasonal_projection(&history(&[1, 2, 3])).unwrap();
        let p = next_month_projection(&model, NaiveDate::from_ymd_opt(2017, 2, 14).unwrap()).unwrap();
        assert_eq!((p.target_year, p.target_month), (2017, 3));
        assert!(p.projected_revenue > p.base_monthly_revenue);
    }

    /// A next month with no history gives no projection instead of an error.
    #[test]
    fn month_without_history_yields_none() {
        let model = compute_seasonal_projection(&history(&[1, 2, 3])).unwrap();
        assert!(next_month_projection(&model, NaiveDate::from_ymd_opt(2017, 3, 20).unwrap()).is_none());

        let empty = compute_seasonal_projection(&[]).unwrap();
        assert!(next_month_projection(&empty, NaiveDate::from_ymd_opt(2017, 3, 20).unwrap()).is_none());
    }
}
