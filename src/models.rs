//! Domain types shared by the forecasting pipeline and the HTTP surface.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One sale event as ingested from the dashboard's sales feed.
///
/// Multiple records may share a `(date, sku)` pair; they represent distinct
/// sale events and are summed during aggregation. Dates arrive as strings so
/// that a single malformed record can be skipped instead of failing the
/// whole request at deserialization time.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SalesRecord {
    /// Calendar date of the sale (`YYYY-MM-DD`, RFC 3339 timestamps accepted).
    #[schema(example = "2024-03-01")]
    pub date: String,
    #[schema(example = "PROD001")]
    pub sku: String,
    /// Units sold in this event. Negative quantities are skipped per record.
    #[schema(example = 12.0)]
    pub quantity: f64,
}

/// Point-in-time stock level for one SKU, externally owned and refreshed.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct InventorySnapshot {
    #[schema(example = "PROD001")]
    pub sku: String,
    #[schema(example = 45)]
    pub current_stock: u32,
    #[schema(example = 599.99)]
    pub unit_price: f64,
    #[schema(example = "Electronics")]
    pub category: String,
}

/// The regular time spacing at which a SKU's series is modeled.
///
/// Cadence changes horizon semantics: a 7-period forecast means 7 days under
/// daily cadence and 7 weeks under weekly cadence.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Cadence {
    Daily,
    Weekly,
}

impl Cadence {
    /// Calendar days covered by one period at this cadence.
    pub fn step_days(&self) -> i64 {
        match self {
            Cadence::Daily => 1,
            Cadence::Weekly => 7,
        }
    }
}

/// A clean, regularly-spaced, outlier-capped series for one SKU.
///
/// Invariant: `values[i]` belongs to the period starting at
/// `start + i * cadence.step_days()`, with no gaps. Built fresh per
/// forecasting call by [`crate::ml::preprocess`]; never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct DemandSeries {
    pub sku: String,
    pub cadence: Cadence,
    pub start: NaiveDate,
    pub values: Vec<f64>,
}

impl DemandSeries {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Start date of the `i`-th period.
    pub fn period_start(&self, i: usize) -> NaiveDate {
        self.start + Duration::days(i as i64 * self.cadence.step_days())
    }

    /// Weekday slot (0 = Monday) of the first period. Only meaningful for
    /// daily cadence, where it anchors the weekly seasonal indices.
    pub fn first_weekday(&self) -> usize {
        self.start.weekday().num_days_from_monday() as usize
    }

    /// A copy truncated to the first `n` periods (training split).
    pub fn head(&self, n: usize) -> DemandSeries {
        DemandSeries {
            sku: self.sku.clone(),
            cadence: self.cadence,
            start: self.start,
            values: self.values[..n.min(self.values.len())].to_vec(),
        }
    }
}

/// The four interchangeable forecasting strategies.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    ToSchema,
    strum::Display,
)]
pub enum ModelKind {
    Seasonal,
    ExponentialSmoothing,
    MovingAverage,
    Naive,
}

/// Discrete restock recommendation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, strum::Display,
)]
pub enum StockAction {
    Increase,
    Maintain,
    Reduce,
}

/// Winner summary for one SKU in a training run.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TrainedSkuSummary {
    pub sku: String,
    pub model_used: ModelKind,
    /// Holdout MAPE of the selected model. `None` when the holdout was
    /// degenerate (all-zero actuals) and no error could be measured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_error: Option<f64>,
    /// Number of periods the winner was fitted on.
    pub data_points: usize,
}

/// A SKU that could not be processed, with a human-readable reason.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SkippedSku {
    pub sku: String,
    #[schema(example = "insufficient history: 30 daily periods (minimum 90)")]
    pub reason: String,
}

/// Response body for a training run.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TrainResponse {
    pub trained: Vec<TrainedSkuSummary>,
    pub skipped: Vec<SkippedSku>,
    /// True when the batch deadline fired and some SKUs were never processed.
    pub cancelled_early: bool,
}

/// Forecast plus recommendation for one SKU.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SkuPrediction {
    pub sku: String,
    /// Expected demand per period, averaged over the forecast horizon.
    pub point_forecast: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
    /// Interval-width based score in `[0, 1]`; narrower interval means
    /// higher confidence.
    pub confidence_score: f64,
    pub model_used: ModelKind,
    pub current_stock: u32,
    pub safety_stock: f64,
    pub recommendation: StockAction,
}

/// Response body for a prediction run (also used by the demo operation).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PredictResponse {
    pub results: Vec<SkuPrediction>,
    pub excluded: Vec<SkippedSku>,
    pub excluded_count: usize,
    pub cancelled_early: bool,
    /// Set when the batch was exercised with synthesized sample data.
    pub synthetic_data: bool,
}

/// Request body for `POST /api/v1/forecast/train`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct TrainRequest {
    pub sales: Vec<SalesRecord>,
}

/// Request body for `POST /api/v1/forecast/predict`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct PredictRequest {
    pub sales: Vec<SalesRecord>,
    pub inventory: Vec<InventorySnapshot>,
    /// Days between placing a restock order and its arrival (1-30).
    #[schema(example = 7)]
    pub lead_time_days: Option<u32>,
}

/// Request body for `POST /api/v1/forecast/demo`.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct DemoRequest {
    #[schema(example = 7)]
    pub lead_time_days: Option<u32>,
}

/// Timestamped record of a completed model fit, superseded by the next
/// training run for the same SKU. Stored in the injectable model store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainedModelHandle {
    pub sku: String,
    pub model: crate::ml::model_bank::FittedModel,
    /// Holdout MAPE of the selection run; `None` for a degenerate holdout.
    pub validation_mape: Option<f64>,
    pub cadence: Cadence,
    pub data_points: usize,
    pub trained_at: DateTime<Utc>,
}

impl TrainedModelHandle {
    pub fn model_kind(&self) -> ModelKind {
        self.model.kind()
    }
}
