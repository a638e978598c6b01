//! The four interchangeable forecasting strategies.
//!
//! Each strategy fits on a [`DemandSeries`] and forecasts `horizon` periods
//! ahead with an 80% prediction interval. All of them accept series as short
//! as the minimum-history threshold and degrade to wider intervals instead
//! of failing: a fit never errors on a valid series.

use serde::{Deserialize, Serialize};

use crate::models::{Cadence, DemandSeries, ModelKind};

/// z-score of the 80% central prediction interval (matches the pipeline's
/// 80% target service level).
pub const INTERVAL_Z: f64 = 1.28;

/// Shrinkage applied to the fitted trend slope. Short retail series
/// over-state trend; the damped slope is the conservative choice.
const TREND_DAMPING: f64 = 0.9;

/// Shrinkage applied to weekly seasonal indices, for the same reason.
const SEASONAL_STRENGTH: f64 = 0.9;

/// Trailing window of the moving-average fallback, in periods.
pub const MOVING_AVERAGE_WINDOW: usize = 7;

/// Periods per seasonal cycle (weekday slots).
const WEEK_PERIODS: usize = 7;

/// Minimum series length before weekly seasonal indices are estimated;
/// below two full cycles the indices would just memorize noise.
const MIN_SEASONAL_PERIODS: usize = 2 * WEEK_PERIODS;

/// Additive trend plus weekly seasonality, both fitted conservatively.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeasonalFit {
    intercept: f64,
    slope: f64,
    /// Centered seasonal index per weekday slot (0 = Monday); empty when
    /// the cadence or series length does not support weekly seasonality.
    seasonal: Vec<f64>,
    /// Weekday slot of the first fitted period.
    first_weekday: usize,
    /// Number of fitted periods; forecasts continue from this index.
    n: usize,
    residual_std: f64,
}

/// Single-parameter smoothing of the level, flat-line forecast.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExponentialSmoothingFit {
    level: f64,
    alpha: f64,
    residual_std: f64,
}

/// Trailing mean, flat-line forecast.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovingAverageFit {
    mean: f64,
    residual_std: f64,
}

/// Last observed value repeated. The widest, least informative fallback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NaiveFit {
    last: f64,
    residual_std: f64,
}

/// A fitted forecasting model. Closed set: the pipeline branches over
/// exactly these four strategies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FittedModel {
    Seasonal(SeasonalFit),
    ExponentialSmoothing(ExponentialSmoothingFit),
    MovingAverage(MovingAverageFit),
    Naive(NaiveFit),
}

/// Point forecasts with an 80% prediction interval, one entry per horizon
/// period. All values are non-negative and `upper[i] >= lower[i]`.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastBand {
    pub point: Vec<f64>,
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
}

impl ForecastBand {
    /// Per-period summary across the horizon: mean point, lower, upper.
    pub fn per_period(&self) -> (f64, f64, f64) {
        let n = self.point.len().max(1) as f64;
        (
            self.point.iter().sum::<f64>() / n,
            self.lower.iter().sum::<f64>() / n,
            self.upper.iter().sum::<f64>() / n,
        )
    }
}

impl FittedModel {
    /// Fit the given strategy on a series.
    pub fn fit(kind: ModelKind, series: &DemandSeries) -> FittedModel {
        match kind {
            ModelKind::Seasonal => FittedModel::Seasonal(fit_seasonal(series)),
            ModelKind::ExponentialSmoothing => {
                FittedModel::ExponentialSmoothing(fit_exponential_smoothing(&series.values))
            }
            ModelKind::MovingAverage => {
                FittedModel::MovingAverage(fit_moving_average(&series.values))
            }
            ModelKind::Naive => FittedModel::Naive(fit_naive(&series.values)),
        }
    }

    pub fn kind(&self) -> ModelKind {
        match self {
            FittedModel::Seasonal(_) => ModelKind::Seasonal,
            FittedModel::ExponentialSmoothing(_) => ModelKind::ExponentialSmoothing,
            FittedModel::MovingAverage(_) => ModelKind::MovingAverage,
            FittedModel::Naive(_) => ModelKind::Naive,
        }
    }

    /// In-sample residual standard deviation, the demand-volatility input
    /// to the safety-stock formula.
    pub fn residual_std(&self) -> f64 {
        match self {
            FittedModel::Seasonal(fit) => fit.residual_std,
            FittedModel::ExponentialSmoothing(fit) => fit.residual_std,
            FittedModel::MovingAverage(fit) => fit.residual_std,
            FittedModel::Naive(fit) => fit.residual_std,
        }
    }

    /// Forecast `horizon` periods ahead.
    pub fn forecast(&self, horizon: usize) -> ForecastBand {
        match self {
            FittedModel::Seasonal(fit) => {
                let mut point = Vec::with_capacity(horizon);
                for i in 0..horizon {
                    let t = (fit.n + i) as f64;
                    let mut yhat = fit.intercept + fit.slope * t;
                    if !fit.seasonal.is_empty() {
                        yhat += fit.seasonal[(fit.first_weekday + fit.n + i) % WEEK_PERIODS];
                    }
                    point.push(yhat.max(0.0));
                }
                band_around(point, fit.residual_std)
            }
            FittedModel::ExponentialSmoothing(fit) => {
                band_around(vec![fit.level.max(0.0); horizon], fit.residual_std)
            }
            FittedModel::MovingAverage(fit) => {
                band_around(vec![fit.mean.max(0.0); horizon], fit.residual_std)
            }
            FittedModel::Naive(fit) => {
                band_around(vec![fit.last.max(0.0); horizon], fit.residual_std)
            }
        }
    }
}

fn band_around(point: Vec<f64>, residual_std: f64) -> ForecastBand {
    let half_width = INTERVAL_Z * residual_std;
    let lower = point.iter().map(|p| (p - half_width).max(0.0)).collect();
    let upper = point.iter().map(|p| p + half_width).collect();
    ForecastBand {
        point,
        lower,
        upper,
    }
}

fn fit_seasonal(series: &DemandSeries) -> SeasonalFit {
    let values = &series.values;
    let n = values.len();
    let (intercept, raw_slope) = least_squares_line(values);
    let slope = raw_slope * TREND_DAMPING;

    let detrended: Vec<f64> = values
        .iter()
        .enumerate()
        .map(|(t, y)| y - (intercept + slope * t as f64))
        .collect();

    // Weekly seasonality only makes sense on daily series with at least two
    // full cycles; weekly-cadence periods already span a whole week.
    let first_weekday = series.first_weekday();
    let seasonal = if series.cadence == Cadence::Daily && n >= MIN_SEASONAL_PERIODS {
        weekly_indices(&detrended, first_weekday)
    } else {
        Vec::new()
    };

    let residuals: Vec<f64> = detrended
        .iter()
        .enumerate()
        .map(|(t, d)| {
            if seasonal.is_empty() {
                *d
            } else {
                d - seasonal[(first_weekday + t) % WEEK_PERIODS]
            }
        })
        .collect();

    SeasonalFit {
        intercept,
        slope,
        seasonal,
        first_weekday,
        n,
        residual_std: std_dev(&residuals),
    }
}

/// Centered, shrunk mean of the detrended values in each weekday slot.
fn weekly_indices(detrended: &[f64], first_weekday: usize) -> Vec<f64> {
    let mut sums = [0.0f64; WEEK_PERIODS];
    let mut counts = [0usize; WEEK_PERIODS];
    for (t, d) in detrended.iter().enumerate() {
        let slot = (first_weekday + t) % WEEK_PERIODS;
        sums[slot] += d;
        counts[slot] += 1;
    }

    let mut indices: Vec<f64> = (0..WEEK_PERIODS)
        .map(|slot| {
            if counts[slot] == 0 {
                0.0
            } else {
                sums[slot] / counts[slot] as f64
            }
        })
        .collect();

    // Center so the indices redistribute demand within the week without
    // shifting its level, then shrink.
    let mean = indices.iter().sum::<f64>() / WEEK_PERIODS as f64;
    for index in indices.iter_mut() {
        *index = (*index - mean) * SEASONAL_STRENGTH;
    }
    indices
}

fn fit_exponential_smoothing(values: &[f64]) -> ExponentialSmoothingFit {
    // Grid search over the smoothing parameter, minimizing one-step-ahead
    // squared error. Deterministic and cheap at these series lengths.
    let mut best_alpha = 0.5;
    let mut best_sse = f64::INFINITY;

    for step in 1..=19 {
        let alpha = step as f64 * 0.05;
        let sse = one_step_sse(values, alpha);
        if sse < best_sse {
            best_sse = sse;
            best_alpha = alpha;
        }
    }

    let mut level = values[0];
    let mut errors = Vec::with_capacity(values.len().saturating_sub(1));
    for y in &values[1..] {
        errors.push(y - level);
        level = best_alpha * y + (1.0 - best_alpha) * level;
    }

    ExponentialSmoothingFit {
        level,
        alpha: best_alpha,
        residual_std: std_dev(&errors),
    }
}

fn one_step_sse(values: &[f64], alpha: f64) -> f64 {
    let mut level = values[0];
    let mut sse = 0.0;
    for y in &values[1..] {
        let err = y - level;
        sse += err * err;
        level = alpha * y + (1.0 - alpha) * level;
    }
    sse
}

fn fit_moving_average(values: &[f64]) -> MovingAverageFit {
    let window = MOVING_AVERAGE_WINDOW.min(values.len());
    let tail = &values[values.len() - window..];
    let mean = tail.iter().sum::<f64>() / window as f64;
    let deviations: Vec<f64> = tail.iter().map(|v| v - mean).collect();

    MovingAverageFit {
        mean,
        residual_std: std_dev(&deviations),
    }
}

fn fit_naive(values: &[f64]) -> NaiveFit {
    let last = *values.last().expect("fitted series is non-empty");
    let diffs: Vec<f64> = values.windows(2).map(|w| w[1] - w[0]).collect();

    NaiveFit {
        last,
        residual_std: std_dev(&diffs),
    }
}

/// Ordinary least squares of `values` against `0..n`, as (intercept, slope).
fn least_squares_line(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    if values.len() < 2 {
        return (values.first().copied().unwrap_or(0.0), 0.0);
    }

    let mean_t = (n - 1.0) / 2.0;
    let mean_y = values.iter().sum::<f64>() / n;

    let mut covariance = 0.0;
    let mut variance = 0.0;
    for (t, y) in values.iter().enumerate() {
        let dt = t as f64 - mean_t;
        covariance += dt * (y - mean_y);
        variance += dt * dt;
    }

    let slope = if variance > 0.0 { covariance / variance } else { 0.0 };
    (mean_y - slope * mean_t, slope)
}

/// Sample standard deviation; zero for fewer than two values.
pub fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    variance.sqrt()
}
