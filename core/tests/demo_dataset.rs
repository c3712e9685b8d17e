use olist_core::{
    config::AnalyticsConfig,
    demo::{generate, DemoOptions},
    engine::AnalyticsEngine,
    facts::OrderFilter,
    source::{InMemorySource, OrderFactSource},
    store::AnalyticsStore,
};
use std::collections::HashSet;

// ── Helpers ──────────────────────────────────────────────────────────────────

fn small(seed: u64) -> DemoOptions {
    DemoOptions {
        seed,
        customers: 300,
        ..DemoOptions::default()
    }
}

fn loaded_store(options: &DemoOptions) -> AnalyticsStore {
    let store = AnalyticsStore::in_memory().unwrap();
    store.migrate().unwrap();
    generate(options).load_into(&store).unwrap();
    store
}

// ── Tests ────────────────────────────────────────────────────────────────────

/// Same seed → identical dataset. Different seed → different dataset.
#[test]
fn generation_is_deterministic() {
    let a = generate(&small(7));
    let b = generate(&small(7));
    let c = generate(&small(8));
    assert_eq!(a, b);
    assert_ne!(a.orders, c.orders);
}

/// Shape sanity: every customer orders, ids are unique, repeats exist.
#[test]
fn dataset_shape() {
    let data = generate(&small(11));
    let people: HashSet<&str> = data.customers.iter().map(|c| c.customer_unique_id.as_str()).collect();
    assert_eq!(people.len(), 300);
    assert_eq!(data.customers.len(), data.orders.len(), "one customer_id per order");
    assert!(data.orders.len() > 300, "some customers should repeat");

    let order_ids: HashSet<&str> = data.orders.iter().map(|o| o.order_id.as_str()).collect();
    assert_eq!(order_ids.len(), data.orders.len());
    assert!(data.reviews.iter().all(|r| (1..=5).contains(&r.review_score)));

    assert_eq!(data.sellers.len(), 40);
    let seller_ids: HashSet<&str> = data.sellers.iter().map(|s| s.seller_id.as_str()).collect();
    assert!(data
        .items
        .iter()
        .all(|i| i.seller_id.as_deref().is_some_and(|id| seller_ids.contains(id))));
}

/// The store returns the same facts the dataset builds in memory.
#[test]
fn store_and_memory_agree() {
    let options = small(3);
    let store = loaded_store(&options);
    let memory = InMemorySource::new(generate(&options).to_facts());

    let from_store = store.fetch_order_facts(&OrderFilter::all()).unwrap();
    let from_memory = memory.fetch_order_facts(&OrderFilter::all()).unwrap();
    assert_eq!(from_store.len(), from_memory.len());
    assert_eq!(store.latest_purchase().unwrap(), memory.latest_purchase().unwrap());

    let revenue = |facts: &[olist_core::facts::OrderFact]| facts.iter().map(|f| f.price).sum::<f64>();
    assert!((revenue(&from_store) - revenue(&from_memory)).abs() < 1e-6);

    let located = |facts: &[olist_core::facts::OrderFact]| {
        facts
            .iter()
            .filter(|f| f.seller_state.is_some() && f.customer_state.is_some())
            .count()
    };
    assert_eq!(located(&from_store), from_store.len());
    assert_eq!(located(&from_memory), from_memory.len());
}

/// End to end over SQLite: every report runs and satisfies its basic laws.
#[test]
fn all_reports_run_over_store() {
    let store = loaded_store(&DemoOptions { customers: 1_000, ..small(5) });
    let range = store.date_range().unwrap().unwrap();
    let engine = AnalyticsEngine::new(AnalyticsConfig::default_test(), Box::new(store));
    let filter = engine.base_filter(None);

    let rfm = engine.rfm_segments(&filter).unwrap();
    let total: usize = rfm.segments.iter().map(|s| s.customer_count).sum();
    assert_eq!(total, rfm.customers.len());

    let cohorts = engine.cohort_retention(&filter, Some(12)).unwrap();
    assert!(cohorts
        .rows
        .iter()
        .filter(|r| r.month_number == 0)
        .all(|r| r.retention_rate == 100.0));

    let seasonal = engine.seasonal_model(&filter).unwrap();
    let n = seasonal.indices().len() as f64;
    let mean = seasonal.indices().iter().map(|i| i.revenue_seasonal_index).sum::<f64>() / n;
    assert!((mean - 1.0).abs() < 1e-9);
    let nov = seasonal.index_for(11).unwrap();
    assert!(nov.orders_seasonal_index > 1.0, "November is the generated peak");

    assert!(!engine.daily_pattern(&filter).unwrap().rows().is_empty());
    assert_eq!(
        engine.churn_risk(&filter).unwrap().levels.iter().map(|l| l.customer_count).sum::<usize>(),
        rfm.customers.len()
    );
    assert!(!engine.customer_value(&filter).unwrap().segments.is_empty());

    let sellers = engine.seller_performance(&filter).unwrap();
    assert!(!sellers.sellers.is_empty());
    assert!(sellers.sellers.iter().all(|s| s.total_orders >= 5));
    assert_eq!(
        sellers.tiers.iter().map(|t| t.seller_count).sum::<usize>(),
        sellers.sellers.len()
    );

    let categories = engine.category_performance(&filter).unwrap();
    let share: f64 = categories.iter().map(|c| c.revenue_share).sum();
    assert!((share - 100.0).abs() < 0.1, "shares sum to {share}");

    let geography = engine.customer_geography(&filter).unwrap();
    assert_eq!(
        geography.iter().map(|g| g.customer_count).sum::<usize>(),
        rfm.customers.len(),
        "each demo customer lives in one state"
    );

    let window = olist_core::facts::DateRange::new(range.0, range.1).unwrap();
    let report = engine.period_report(window).unwrap();
    assert_eq!(report.new_customer_count, report.unique_customers, "nobody ordered before the first day");
}
