//! Service wrapper around the forecasting pipeline: request validation,
//! event emission, and the demo data path.

use std::sync::Arc;

use tracing::{info, instrument};
use uuid::Uuid;

use crate::config::ForecastConfig;
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::ml::demo;
use crate::ml::pipeline::ForecastPipeline;
use crate::ml::store::ModelStore;
use crate::models::{
    InventorySnapshot, PredictResponse, SalesRecord, StockAction, TrainResponse,
};

/// Service for demand forecasting and stock recommendations
#[derive(Clone)]
pub struct ForecastingService {
    pipeline: Arc<ForecastPipeline>,
    config: ForecastConfig,
    event_sender: EventSender,
}

impl ForecastingService {
    /// Creates a new forecasting service instance
    pub fn new(
        store: Arc<dyn ModelStore>,
        config: ForecastConfig,
        event_sender: EventSender,
    ) -> Self {
        Self {
            pipeline: Arc::new(ForecastPipeline::new(store, config.clone())),
            config,
            event_sender,
        }
    }

    /// Number of trained model handles currently held by the store.
    pub async fn models_cached(&self) -> Result<usize, ServiceError> {
        self.pipeline.store().len().await
    }

    /// Train models for every eligible SKU in the sales history.
    #[instrument(skip(self, sales), fields(records = sales.len()))]
    pub async fn train(&self, sales: Vec<SalesRecord>) -> Result<TrainResponse, ServiceError> {
        let batch_id = Uuid::new_v4();
        info!(%batch_id, "training batch started");

        let outcome = self.pipeline.train(&sales).await?;

        for summary in &outcome.trained {
            self.event_sender
                .send(Event::ModelTrained {
                    batch_id,
                    sku: summary.sku.clone(),
                    model_kind: summary.model_used,
                    validation_mape: summary.validation_error,
                    trained_at: chrono::Utc::now(),
                })
                .await;
        }

        Ok(TrainResponse {
            trained: outcome.trained,
            skipped: outcome.skipped,
            cancelled_early: outcome.cancelled_early,
        })
    }

    /// Forecast demand and recommend stock actions for every SKU present
    /// in both inputs.
    #[instrument(skip(self, sales, inventory), fields(records = sales.len(), skus = inventory.len()))]
    pub async fn predict(
        &self,
        sales: Vec<SalesRecord>,
        inventory: Vec<InventorySnapshot>,
        lead_time_days: Option<u32>,
    ) -> Result<PredictResponse, ServiceError> {
        let lead_time_days = self.resolve_lead_time(lead_time_days)?;
        self.run_predict(&sales, &inventory, lead_time_days, false)
            .await
    }

    /// Exercise the full train + predict path on synthesized sample data.
    #[instrument(skip(self))]
    pub async fn demo(&self, lead_time_days: Option<u32>) -> Result<PredictResponse, ServiceError> {
        let lead_time_days = self.resolve_lead_time(lead_time_days)?;
        let sales = demo::sample_sales_history();
        let inventory = demo::sample_inventory();
        self.run_predict(&sales, &inventory, lead_time_days, true)
            .await
    }

    async fn run_predict(
        &self,
        sales: &[SalesRecord],
        inventory: &[InventorySnapshot],
        lead_time_days: u32,
        synthetic_data: bool,
    ) -> Result<PredictResponse, ServiceError> {
        let batch_id = Uuid::new_v4();
        info!(%batch_id, lead_time_days, synthetic_data, "prediction batch started");

        let outcome = self
            .pipeline
            .predict(sales, inventory, lead_time_days)
            .await?;

        for prediction in &outcome.results {
            // Maintain is the quiet steady state; the alerting collaborator
            // only reacts to the other two actions.
            if prediction.recommendation != StockAction::Maintain {
                self.event_sender
                    .send(Event::RecommendationIssued {
                        batch_id,
                        sku: prediction.sku.clone(),
                        action: prediction.recommendation,
                        current_stock: prediction.current_stock,
                        point_forecast: prediction.point_forecast,
                        safety_stock: prediction.safety_stock,
                    })
                    .await;
            }
        }
        self.event_sender
            .send(Event::ForecastBatchCompleted {
                batch_id,
                results: outcome.results.len(),
                excluded: outcome.excluded.len(),
                cancelled_early: outcome.cancelled_early,
                synthetic_data,
            })
            .await;

        Ok(PredictResponse {
            excluded_count: outcome.excluded.len(),
            results: outcome.results,
            excluded: outcome.excluded,
            cancelled_early: outcome.cancelled_early,
            synthetic_data,
        })
    }

    fn resolve_lead_time(&self, lead_time_days: Option<u32>) -> Result<u32, ServiceError> {
        let lead_time_days = lead_time_days.unwrap_or(self.config.default_lead_time_days);
        if lead_time_days < 1 || lead_time_days > self.config.max_lead_time_days {
            return Err(ServiceError::ValidationError(format!(
                "lead_time_days must be between 1 and {}",
                self.config.max_lead_time_days
            )));
        }
        Ok(lead_time_days)
    }
}
