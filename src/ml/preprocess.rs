//! Turns the raw per-sale-event history of one SKU into a clean,
//! regularly-spaced, outlier-capped series at an auto-detected cadence.
//!
//! Missing periods are filled with zero: a day without sale events is a real
//! zero-demand day for this dashboard's feed, not absent data. This is a
//! stated policy of the pipeline, not an incidental default; it materially
//! affects model fit for sparse SKUs.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use tracing::warn;

use crate::config::ForecastConfig;
use crate::models::{Cadence, DemandSeries, SalesRecord};

/// IQR fence multiplier for outlier capping.
const IQR_MULTIPLIER: f64 = 1.5;

/// Median gap (in days) at or below which a series is treated as daily.
const DAILY_GAP_CUTOFF: f64 = 1.5;

/// Why a SKU cannot be modeled. Recoverable at batch level: the SKU is
/// reported and the batch proceeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkuRejection {
    pub reason: String,
}

impl SkuRejection {
    fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// A validated `(date, quantity)` observation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    pub date: NaiveDate,
    pub quantity: f64,
}

/// Parse and validate raw records, skipping (and logging) malformed ones.
///
/// A record is malformed when its date fails to parse or its quantity is
/// negative or non-finite. Returns the valid observations and the count of
/// skipped records.
pub fn clean_records(sku: &str, records: &[SalesRecord]) -> (Vec<Observation>, usize) {
    let mut valid = Vec::with_capacity(records.len());
    let mut skipped = 0usize;

    for record in records {
        let date = match parse_date(&record.date) {
            Some(d) => d,
            None => {
                warn!(sku, date = %record.date, "skipping record with unparseable date");
                skipped += 1;
                continue;
            }
        };
        if !record.quantity.is_finite() || record.quantity < 0.0 {
            warn!(sku, quantity = record.quantity, "skipping record with invalid quantity");
            skipped += 1;
            continue;
        }
        valid.push(Observation {
            date,
            quantity: record.quantity,
        });
    }

    (valid, skipped)
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    if let Ok(date) = raw.parse::<NaiveDate>() {
        return Some(date);
    }
    // Sales feeds sometimes ship full timestamps; accept those too.
    raw.parse::<DateTime<Utc>>().ok().map(|dt| dt.date_naive())
}

/// Sum quantities per calendar date. Distinct sale events on the same date
/// accumulate; nothing is overwritten.
pub fn aggregate_by_date(observations: &[Observation]) -> BTreeMap<NaiveDate, f64> {
    let mut by_date: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for obs in observations {
        *by_date.entry(obs.date).or_insert(0.0) += obs.quantity;
    }
    by_date
}

/// Detect the modeling cadence from the gaps between dates that actually
/// carry sales: median gap of at most 1.5 days means daily, anything
/// sparser is modeled weekly. A single-date history defaults to daily.
pub fn detect_cadence(dates: &BTreeMap<NaiveDate, f64>) -> Cadence {
    let days: Vec<NaiveDate> = dates.keys().copied().collect();
    if days.len() < 2 {
        return Cadence::Daily;
    }

    let mut gaps: Vec<f64> = days
        .windows(2)
        .map(|w| (w[1] - w[0]).num_days() as f64)
        .collect();
    gaps.sort_by(|a, b| a.partial_cmp(b).expect("gaps are finite"));

    if median_sorted(&gaps) <= DAILY_GAP_CUTOFF {
        Cadence::Daily
    } else {
        Cadence::Weekly
    }
}

/// Reindex to a complete calendar at the given cadence, filling missing
/// periods with zero. Weekly cadence buckets by ISO week (Monday start),
/// summing within each week.
pub fn fill_calendar(by_date: &BTreeMap<NaiveDate, f64>, cadence: Cadence) -> (NaiveDate, Vec<f64>) {
    let buckets: BTreeMap<NaiveDate, f64> = match cadence {
        Cadence::Daily => by_date.clone(),
        Cadence::Weekly => {
            let mut weekly: BTreeMap<NaiveDate, f64> = BTreeMap::new();
            for (date, qty) in by_date {
                *weekly.entry(week_start(*date)).or_insert(0.0) += qty;
            }
            weekly
        }
    };

    let first = *buckets.keys().next().expect("non-empty history");
    let last = *buckets.keys().next_back().expect("non-empty history");
    let step = cadence.step_days();

    let mut values = Vec::new();
    let mut current = first;
    while current <= last {
        values.push(buckets.get(&current).copied().unwrap_or(0.0));
        current += Duration::days(step);
    }

    (first, values)
}

/// Monday of the ISO week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

/// The IQR fence `[Q1 - 1.5*IQR, Q3 + 1.5*IQR]` of a series.
pub fn iqr_fence(values: &[f64]) -> (f64, f64) {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).expect("series values are finite"));
    let q1 = quantile_sorted(&sorted, 0.25);
    let q3 = quantile_sorted(&sorted, 0.75);
    let iqr = q3 - q1;
    (q1 - IQR_MULTIPLIER * iqr, q3 + IQR_MULTIPLIER * iqr)
}

/// Cap (never discard) values outside the IQR fence, so a single spike or
/// bulk return cannot dominate training while series length is preserved.
pub fn cap_outliers(values: &mut [f64]) {
    if values.is_empty() {
        return;
    }
    let (lower, upper) = iqr_fence(values);
    for v in values.iter_mut() {
        *v = v.clamp(lower, upper);
    }
}

/// Full preprocessing for one SKU: validate, aggregate, detect cadence,
/// fill the calendar, cap outliers, and enforce the minimum-history
/// threshold. Returns the series or a per-SKU rejection.
pub fn build_series(
    sku: &str,
    records: &[SalesRecord],
    config: &ForecastConfig,
) -> Result<DemandSeries, SkuRejection> {
    let (observations, skipped) = clean_records(sku, records);
    if observations.is_empty() {
        return Err(SkuRejection::new(if records.is_empty() {
            "no sales records".to_string()
        } else {
            format!("no valid sales records ({} malformed)", skipped)
        }));
    }

    let by_date = aggregate_by_date(&observations);
    let cadence = detect_cadence(&by_date);
    let (start, mut values) = fill_calendar(&by_date, cadence);
    cap_outliers(&mut values);

    let min_history = config.min_history(cadence);
    if values.len() < min_history {
        return Err(SkuRejection::new(format!(
            "insufficient history: {} {} periods (minimum {})",
            values.len(),
            cadence,
            min_history
        )));
    }

    Ok(DemandSeries {
        sku: sku.to_string(),
        cadence,
        start,
        values,
    })
}

/// Linear-interpolation quantile of an ascending slice.
fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let position = q * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    if lower == upper {
        sorted[lower]
    } else {
        let weight = position - lower as f64;
        sorted[lower] * (1.0 - weight) + sorted[upper] * weight
    }
}

fn median_sorted(sorted: &[f64]) -> f64 {
    quantile_sorted(sorted, 0.5)
}
