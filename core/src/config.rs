use serde::{Deserialize, Serialize};
use std::path::Path;

// ── Analysis window ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisConfig {
    /// Restrict revenue and retention metrics to delivered orders.
    pub delivered_only: bool,
    /// Default cohort horizon in months after acquisition.
    pub months_limit: i32,
}

// ── Forecast ───────────────────────────────────────────────────────

/// Sample-size cut-offs for the day-level prediction confidence tiers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ForecastConfig {
    pub high_min_samples: usize,
    pub medium_min_samples: usize,
}

// ── Churn risk ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChurnRiskConfig {
    pub recency_weight: f64,
    pub frequency_weight: f64,
    pub satisfaction_weight: f64,
    /// Days without purchase after which the recency component saturates.
    pub recency_horizon_days: f64,
    pub high_threshold: f64,
    pub medium_threshold: f64,
}

// ── Customer value ─────────────────────────────────────────────────

/// Estimated annual value thresholds (strictly greater than).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CustomerValueConfig {
    pub premium_threshold: f64,
    pub high_value_threshold: f64,
    pub medium_value_threshold: f64,
}

// ── Sellers ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SellerConfig {
    /// Sellers with fewer distinct orders are left out of the ranking.
    pub min_orders: usize,
}

// ── Cache ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheConfig {
    /// Zero disables the fact cache.
    pub ttl_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalyticsConfig {
    pub analysis: AnalysisConfig,
    pub forecast: ForecastConfig,
    pub churn_risk: ChurnRiskConfig,
    pub customer_value: CustomerValueConfig,
    pub sellers: SellerConfig,
    pub cache: CacheConfig,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            analysis: AnalysisConfig {
                delivered_only: true,
                months_limit: 6,
            },
            forecast: ForecastConfig {
                high_min_samples: 8,
                medium_min_samples: 4,
            },
            churn_risk: ChurnRiskConfig {
                recency_weight: 0.60,
                frequency_weight: 0.25,
                satisfaction_weight: 0.15,
                recency_horizon_days: 365.0,
                high_threshold: 0.70,
                medium_threshold: 0.40,
            },
            customer_value: CustomerValueConfig {
                premium_threshold: 500.0,
                high_value_threshold: 200.0,
                medium_value_threshold: 100.0,
            },
            sellers: SellerConfig { min_orders: 5 },
            cache: CacheConfig { ttl_secs: 3600 },
        }
    }
}

impl AnalyticsConfig {
    /// Load from `{data_dir}/analytics.json`, falling back to defaults when
    /// the file does not exist. In tests, use AnalyticsConfig::default_test().
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let path = format!("{data_dir}/analytics.json");
        if !Path::new(&path).exists() {
            log::info!("config: {path} not found, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults with the cache disabled so every call hits the source.
    pub fn default_test() -> Self {
        let mut config = Self::default();
        config.cache.ttl_secs = 0;
        config
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.analysis.months_limit <= 0 {
            anyhow::bail!("analysis.months_limit must be at least 1");
        }
        if self.forecast.medium_min_samples > self.forecast.high_min_samples {
            anyhow::bail!("forecast.medium_min_samples exceeds high_min_samples");
        }
        if self.churn_risk.medium_threshold > self.churn_risk.high_threshold {
            anyhow::bail!("churn_risk.medium_threshold exceeds high_threshold");
        }
        if self.churn_risk.recency_horizon_days <= 0.0 {
            anyhow::bail!("churn_risk.recency_horizon_days must be positive");
        }
        if self.sellers.min_orders == 0 {
            anyhow::bail!("sellers.min_orders must be at least 1");
        }
        let v = &self.customer_value;
        if !(v.premium_threshold >= v.high_value_threshold
            && v.high_value_threshold >= v.medium_value_threshold)
        {
            anyhow::bail!("customer_value thresholds must be descending");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AnalyticsConfig::load(dir.path().to_str().unwrap()).unwrap();
        assert_eq!(config, AnalyticsConfig::default());
    }

    #[test]
    fn file_overrides_are_read_and_validated() {
        let dir = tempfile::tempdir().unwrap();
        let mut custom = AnalyticsConfig::default();
        custom.analysis.months_limit = 12;
        std::fs::write(
            dir.path().join("analytics.json"),
            serde_json::to_string(&custom).unwrap(),
        )
        .unwrap();
        let loaded = AnalyticsConfig::load(dir.path().to_str().unwrap()).unwrap();
        assert_eq!(loaded.analysis.months_limit, 12);

        custom.analysis.months_limit = 0;
        std::fs::write(
            dir.path().join("analytics.json"),
            serde_json::to_string(&custom).unwrap(),
        )
        .unwrap();
        assert!(AnalyticsConfig::load(dir.path().to_str().unwrap()).is_err());
    }

    #[test]
    fn zero_seller_floor_is_rejected() {
        let mut config = AnalyticsConfig::default();
        assert_eq!(config.sellers.min_orders, 5);
        config.sellers.min_orders = 0;
        assert!(config.validate().is_err());
    }
}
