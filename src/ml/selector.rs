//! Holdout validation and winner selection across the model bank.
//!
//! The seasonal model gets first refusal: it is accepted whenever its
//! holdout MAPE clears a relatively loose bar (30%), because a
//! mediocre-but-principled seasonal fit usually beats a naive one. Only
//! when it misses the bar are the three fallbacks compared head-to-head.

use std::collections::HashMap;

use chrono::Utc;
use tracing::debug;

use crate::config::ForecastConfig;
use crate::ml::model_bank::FittedModel;
use crate::models::{DemandSeries, ModelKind, TrainedModelHandle};

/// Smallest holdout that still says anything about accuracy.
const HOLDOUT_MIN: usize = 4;

/// Fallbacks in decreasing order of informativeness; earlier entries win
/// MAPE ties.
const FALLBACK_ORDER: [ModelKind; 3] = [
    ModelKind::ExponentialSmoothing,
    ModelKind::MovingAverage,
    ModelKind::Naive,
];

/// Outcome of a selection run: the winning handle (refit on the full
/// series) plus every candidate's holdout MAPE.
#[derive(Debug, Clone)]
pub struct ModelSelection {
    pub handle: TrainedModelHandle,
    pub candidate_errors: HashMap<ModelKind, Option<f64>>,
}

/// Trailing holdout length for a series of `len` periods.
pub fn holdout_len(len: usize, config: &ForecastConfig) -> usize {
    (len / 5).max(HOLDOUT_MIN).min(config.holdout_max)
}

/// Mean Absolute Percentage Error over the holdout, masking zero actuals.
/// `None` when every actual is zero: the metric is undefined and the
/// series is treated as degenerate.
pub fn mape(actual: &[f64], predicted: &[f64]) -> Option<f64> {
    let mut total = 0.0;
    let mut counted = 0usize;
    for (a, p) in actual.iter().zip(predicted) {
        if *a != 0.0 {
            total += ((a - p) / a).abs();
            counted += 1;
        }
    }
    if counted == 0 {
        None
    } else {
        Some(total / counted as f64)
    }
}

/// Validate all candidates on a trailing holdout and refit the winner on
/// the full series. Never fails on an eligible series: a degenerate
/// holdout falls back to Naive with an unmeasured validation error.
pub fn select_model(series: &DemandSeries, config: &ForecastConfig) -> ModelSelection {
    let len = series.len();
    let holdout = holdout_len(len, config);
    let train = series.head(len - holdout);
    let actual = &series.values[len - holdout..];

    let mut candidate_errors: HashMap<ModelKind, Option<f64>> = HashMap::new();

    let seasonal_error = holdout_error(ModelKind::Seasonal, &train, actual);
    candidate_errors.insert(ModelKind::Seasonal, seasonal_error);

    let winner = if seasonal_error.is_some_and(|e| e <= config.mape_threshold) {
        ModelKind::Seasonal
    } else {
        let mut best: Option<(ModelKind, f64)> = None;
        for kind in FALLBACK_ORDER {
            let error = holdout_error(kind, &train, actual);
            candidate_errors.insert(kind, error);
            if let Some(e) = error {
                // Strict comparison keeps the earlier (more informative)
                // fallback on ties.
                if best.map_or(true, |(_, b)| e < b) {
                    best = Some((kind, e));
                }
            }
        }
        match best {
            Some((kind, _)) => kind,
            // Every candidate's MAPE was undefined: degenerate series,
            // last-resort model, flagged by the missing validation error.
            None => ModelKind::Naive,
        }
    };

    let validation_mape = candidate_errors.get(&winner).copied().flatten();
    debug!(
        sku = %series.sku,
        winner = %winner,
        mape = ?validation_mape,
        holdout,
        "model selected"
    );

    // Refit on the full series so the holdout is not wasted.
    let model = FittedModel::fit(winner, series);

    ModelSelection {
        handle: TrainedModelHandle {
            sku: series.sku.clone(),
            model,
            validation_mape,
            cadence: series.cadence,
            data_points: len,
            trained_at: Utc::now(),
        },
        candidate_errors,
    }
}

fn holdout_error(kind: ModelKind, train: &DemandSeries, actual: &[f64]) -> Option<f64> {
    let fitted = FittedModel::fit(kind, train);
    let band = fitted.forecast(actual.len());
    mape(actual, &band.point).filter(|e| e.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Cadence;
    use chrono::NaiveDate;

    fn daily_series(values: Vec<f64>) -> DemandSeries {
        DemandSeries {
            sku: "TEST".to_string(),
            cadence: Cadence::Daily,
            start: NaiveDate::from_ymd_opt(2024, 1, 1).expect("valid date"),
            values,
        }
    }

    #[test]
    fn holdout_is_bounded_on_both_sides() {
        let cfg = ForecastConfig::default();
        assert_eq!(holdout_len(90, &cfg), 18);
        assert_eq!(holdout_len(12, &cfg), 4);
        assert_eq!(holdout_len(400, &cfg), 30);
    }

    #[test]
    fn mape_masks_zero_actuals() {
        let actual = [0.0, 10.0, 20.0];
        let predicted = [5.0, 11.0, 18.0];
        let e = mape(&actual, &predicted).expect("defined");
        assert!((e - (0.1 + 0.1) / 2.0).abs() < 1e-9);
        assert_eq!(mape(&[0.0, 0.0], &[1.0, 2.0]), None);
    }

    #[test]
    fn accurate_seasonal_fit_is_selected() {
        let selection = select_model(&daily_series(vec![10.0; 90]), &ForecastConfig::default());
        assert_eq!(selection.handle.model_kind(), ModelKind::Seasonal);
        assert!(selection.handle.validation_mape.expect("measured") < 1e-9);
        assert_eq!(selection.handle.data_points, 90);
    }

    #[test]
    fn poor_seasonal_fit_falls_back_to_the_best_alternative() {
        // Period-2 oscillation defeats a trend+weekly-seasonality model.
        let values: Vec<f64> = (0..90)
            .map(|t| if t % 2 == 0 { 1.0 } else { 100.0 })
            .collect();
        let selection = select_model(&daily_series(values), &ForecastConfig::default());
        let seasonal_error = selection.candidate_errors[&ModelKind::Seasonal]
            .expect("seasonal error is measurable");
        assert!(seasonal_error > 0.3, "seasonal MAPE {seasonal_error}");
        assert_ne!(selection.handle.model_kind(), ModelKind::Seasonal);
        // All three fallbacks were scored.
        for kind in FALLBACK_ORDER {
            assert!(selection.candidate_errors.contains_key(&kind), "{kind}");
        }
    }

    #[test]
    fn all_zero_series_degenerates_to_naive_without_an_error() {
        let selection = select_model(&daily_series(vec![0.0; 90]), &ForecastConfig::default());
        assert_eq!(selection.handle.model_kind(), ModelKind::Naive);
        assert_eq!(selection.handle.validation_mape, None);
        let band = selection.handle.model.forecast(7);
        assert!(band.point.iter().all(|p| *p == 0.0));
    }

    #[test]
    fn winner_is_refit_on_the_full_series() {
        // Level shift inside the holdout: a winner refit on the full series
        // must see the shift that training data alone would miss.
        let mut values = vec![10.0; 72];
        values.extend_from_slice(&[30.0; 18]);
        let selection = select_model(&daily_series(values), &ForecastConfig::default());
        let (point, _, _) = selection.handle.model.forecast(7).per_period();
        assert!(point > 10.5, "full-series refit should lift the forecast, got {point}");
    }
}
