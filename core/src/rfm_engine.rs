//! RFM segmentation engine — recency / frequency / monetary scoring.
//!
//! This engine:
//!   1. Splits the population into quintiles along each axis (NTILE(5))
//!   2. Maps the three scores to a named segment via an ordered rule table
//!   3. Summarizes count, averages and revenue share per segment
//!
//! Scores are relative to the population passed in. A different date window
//! moves every threshold.

use crate::{
    facts::CustomerAggregate,
    types::{round2, CustomerId},
};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

pub const SCORE_BUCKETS: usize = 5;

// ── Public types ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RfmInput {
    pub customer_unique_id: CustomerId,
    pub recency_days:       f64,
    pub frequency:          u32,
    pub monetary_value:     f64,
}

impl From<&CustomerAggregate> for RfmInput {
    fn from(c: &CustomerAggregate) -> Self {
        Self {
            customer_unique_id: c.customer_unique_id.clone(),
            recency_days:       c.recency_days,
            frequency:          c.frequency(),
            monetary_value:     c.monetary_value(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RfmScore {
    pub customer_unique_id: CustomerId,
    pub recency_days:       f64,
    pub frequency:          u32,
    pub monetary_value:     f64,
    pub r_score:            u8,
    pub f_score:            u8,
    pub m_score:            u8,
    pub customer_segment:   RfmSegment,
}

impl RfmScore {
    /// Concatenated score, e.g. "545".
    pub fn rfm_code(&self) -> String {
        format!("{}{}{}", self.r_score, self.f_score, self.m_score)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RfmSegment {
    #[serde(rename = "Champions")]
    Champions,
    #[serde(rename = "Loyal Customers")]
    LoyalCustomers,
    #[serde(rename = "Potential Loyalists")]
    PotentialLoyalists,
    #[serde(rename = "New Customers")]
    NewCustomers,
    #[serde(rename = "At Risk Customers")]
    AtRisk,
    #[serde(rename = "Need Attention")]
    NeedAttention,
    #[serde(rename = "Cannot Lose Them")]
    CannotLoseThem,
    #[serde(rename = "Hibernating")]
    Hibernating,
    #[serde(rename = "Lost Customers")]
    Lost,
    #[serde(rename = "Others")]
    Others,
}

impl RfmSegment {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Champions          => "Champions",
            Self::LoyalCustomers     => "Loyal Customers",
            Self::PotentialLoyalists => "Potential Loyalists",
            Self::NewCustomers       => "New Customers",
            Self::AtRisk             => "At Risk Customers",
            Self::NeedAttention      => "Need Attention",
            Self::CannotLoseThem     => "Cannot Lose Them",
            Self::Hibernating        => "Hibernating",
            Self::Lost               => "Lost Customers",
            Self::Others             => "Others",
        }
    }

    /// First matching rule wins. Rules overlap, so order is part of the contract.
    pub fn from_scores(r: u8, f: u8, m: u8) -> Self {
        SEGMENT_RULES
            .iter()
            .find(|rule| rule.matches(r, f, m))
            .map(|rule| rule.segment)
            .unwrap_or(Self::Others)
    }
}

impl fmt::Display for RfmSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentSummary {
    pub customer_segment:     RfmSegment,
    pub customer_count:       usize,
    pub percentage:           f64,
    pub avg_recency_days:     f64,
    pub avg_frequency:        f64,
    pub avg_monetary_value:   f64,
    pub total_monetary_value: f64,
    pub revenue_percentage:   f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RfmReport {
    pub customers: Vec<RfmScore>,
    pub segments:  Vec<SegmentSummary>,
}

// ── Segment rules ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
struct Bound {
    min: u8,
    max: u8,
}

const fn at_least(min: u8) -> Bound { Bound { min, max: 5 } }
const fn at_most(max: u8) -> Bound { Bound { min: 1, max } }

impl Bound {
    fn holds(&self, score: u8) -> bool {
        score >= self.min && score <= self.max
    }
}

#[derive(Debug, Clone, Copy)]
struct SegmentRule {
    r:       Bound,
    f:       Bound,
    m:       Bound,
    segment: RfmSegment,
}

impl SegmentRule {
    fn matches(&self, r: u8, f: u8, m: u8) -> bool {
        self.r.holds(r) && self.f.holds(f) && self.m.holds(m)
    }
}

const SEGMENT_RULES: [SegmentRule; 9] = [
    SegmentRule { r: at_least(4), f: at_least(4), m: at_least(4), segment: RfmSegment::Champions },
    SegmentRule { r: at_least(3), f: at_least(3), m: at_least(3), segment: RfmSegment::LoyalCustomers },
    SegmentRule { r: at_least(3), f: at_least(1), m: at_least(2), segment: RfmSegment::PotentialLoyalists },
    SegmentRule { r: at_least(4), f: at_most(2),  m: at_most(2),  segment: RfmSegment::NewCustomers },
    SegmentRule { r: at_most(2),  f: at_least(4), m: at_least(4), segment: RfmSegment::AtRisk },
    SegmentRule { r: at_most(2),  f: at_least(3), m: at_least(3), segment: RfmSegment::NeedAttention },
    SegmentRule { r: at_most(1),  f: at_least(4), m: at_least(4), segment: RfmSegment::CannotLoseThem },
    SegmentRule { r: at_most(1),  f: at_most(2),  m: at_least(3), segment: RfmSegment::Hibernating },
    SegmentRule { r: at_most(1),  f: at_most(1),  m: at_most(1),  segment: RfmSegment::Lost },
];

// ── Quintiles ────────────────────────────────────────────────────────────────

/// NTILE-style bucket assignment.
///
/// Row indices are sorted with `cmp`, then cut into `buckets` groups as evenly
/// as possible; the first `len % buckets` groups take one extra row. The
/// result is indexed like the input. With fewer rows than buckets, buckets
/// 1..=len each hold a single row.
pub fn ntile<T, F>(rows: &[T], buckets: usize, mut cmp: F) -> Vec<u8>
where
    F: FnMut(&T, &T) -> Ordering,
{
    let n = rows.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| cmp(&rows[a], &rows[b]));

    let buckets = buckets.max(1);
    let base = n / buckets;
    let extra = n % buckets;

    let mut out = vec![0u8; n];
    let mut position = 0;
    for bucket in 0..buckets {
        let size = base + usize::from(bucket < extra);
        for &row in order.iter().skip(position).take(size) {
            out[row] = (bucket + 1) as u8;
        }
        position += size;
    }
    out
}

// ── Engine ───────────────────────────────────────────────────────────────────

/// Score every customer and summarize per segment. Empty input → empty report.
pub fn compute_rfm_segments(customers: &[RfmInput]) -> RfmReport {
    if customers.is_empty() {
        return RfmReport::default();
    }

    let by_id = |a: &RfmInput, b: &RfmInput| a.customer_unique_id.cmp(&b.customer_unique_id);

    // Oldest purchase first, so the most recent land in bucket 5.
    let r_scores = ntile(customers, SCORE_BUCKETS, |a, b| {
        b.recency_days.total_cmp(&a.recency_days).then_with(|| by_id(a, b))
    });
    let f_scores = ntile(customers, SCORE_BUCKETS, |a, b| {
        a.frequency.cmp(&b.frequency).then_with(|| by_id(a, b))
    });
    let m_scores = ntile(customers, SCORE_BUCKETS, |a, b| {
        a.monetary_value.total_cmp(&b.monetary_value).then_with(|| by_id(a, b))
    });

    let scored: Vec<RfmScore> = customers
        .iter()
        .enumerate()
        .map(|(i, c)| {
            let (r, f, m) = (r_scores[i], f_scores[i], m_scores[i]);
            RfmScore {
                customer_unique_id: c.customer_unique_id.clone(),
                recency_days:       c.recency_days,
                frequency:          c.frequency,
                monetary_value:     c.monetary_value,
                r_score:            r,
                f_score:            f,
                m_score:            m,
                customer_segment:   RfmSegment::from_scores(r, f, m),
            }
        })
        .collect();

    let segments = summarize_segments(&scored);
    log::info!(
        "rfm: scored {} customers into {} segments",
        scored.len(),
        segments.len()
    );

    RfmReport { customers: scored, segments }
}

/// Per-segment aggregation, ordered by revenue share descending.
pub fn summarize_segments(scored: &[RfmScore]) -> Vec<SegmentSummary> {
    let total_customers = scored.len();
    let total_monetary: f64 = scored.iter().map(|s| s.monetary_value).sum();

    let mut groups: std::collections::BTreeMap<RfmSegment, Vec<&RfmScore>> =
        std::collections::BTreeMap::new();
    for s in scored {
        groups.entry(s.customer_segment).or_default().push(s);
    }

    let mut summaries: Vec<SegmentSummary> = groups
        .into_iter()
        .map(|(segment, members)| {
            let count = members.len();
            let n = count as f64;
            let monetary: f64 = members.iter().map(|s| s.monetary_value).sum();
            let recency: f64 = members.iter().map(|s| s.recency_days).sum();
            let frequency: f64 = members.iter().map(|s| s.frequency as f64).sum();

            let percentage = if total_customers > 0 {
                count as f64 / total_customers as f64 * 100.0
            } else {
                0.0
            };
            let revenue_percentage = if total_monetary > 0.0 {
                monetary / total_monetary * 100.0
            } else {
                0.0
            };

            SegmentSummary {
                customer_segment:     segment,
                customer_count:       count,
                percentage:           round2(percentage),
                avg_recency_days:     round2(recency / n),
                avg_frequency:        round2(frequency / n),
                avg_monetary_value:   round2(monetary / n),
                total_monetary_value: round2(monetary),
                revenue_percentage:   round2(revenue_percentage),
            }
        })
        .collect();

    summaries.sort_by(|a, b| {
        b.revenue_percentage
            .total_cmp(&a.revenue_percentage)
            .then_with(|| a.customer_segment.cmp(&b.customer_segment))
    });
    summaries
}
