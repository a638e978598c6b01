//! Batch orchestration across SKUs.
//!
//! Per-SKU work is embarrassingly parallel: each job touches only its own
//! series, handle, and result. Jobs run on a tokio `JoinSet` behind a
//! semaphore-bounded concurrency limit, every job is wrapped at the per-SKU
//! boundary (a panic becomes a failure entry, never a batch abort), and the
//! whole batch runs against a deadline that converts to partial results
//! plus a cancelled-early flag instead of an error.

use std::collections::{BTreeMap, HashSet};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::{timeout_at, Instant};
use tracing::{info, warn};

use crate::config::ForecastConfig;
use crate::errors::ServiceError;
use crate::ml::{preprocess, recommendation, selector};
use crate::ml::store::ModelStore;
use crate::models::{
    InventorySnapshot, SalesRecord, SkippedSku, SkuPrediction, TrainedModelHandle,
    TrainedSkuSummary,
};

/// Reason attached to SKUs the deadline cut off before processing.
pub const BATCH_CANCELLED: &str = "batch cancelled before processing";

/// Reason attached to inventory rows with no sales history.
pub const MISSING_SALES: &str = "missing sales history";

/// Reason attached to sold SKUs absent from the inventory snapshot.
pub const MISSING_INVENTORY: &str = "missing inventory";

/// Outcome of a training batch.
#[derive(Debug, Clone)]
pub struct TrainOutcome {
    pub trained: Vec<TrainedSkuSummary>,
    pub skipped: Vec<SkippedSku>,
    pub cancelled_early: bool,
}

/// Outcome of a prediction batch.
#[derive(Debug, Clone)]
pub struct PredictOutcome {
    pub results: Vec<SkuPrediction>,
    pub excluded: Vec<SkippedSku>,
    pub cancelled_early: bool,
}

/// Fans preprocessing, selection, forecasting, and recommendation out
/// across all SKUs in a batch.
pub struct ForecastPipeline {
    store: Arc<dyn ModelStore>,
    config: ForecastConfig,
}

impl ForecastPipeline {
    pub fn new(store: Arc<dyn ModelStore>, config: ForecastConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &ForecastConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn ModelStore> {
        &self.store
    }

    /// Train a model for every SKU with sufficient history and write the
    /// winning handles through the model store. SKUs that cannot be
    /// modeled are reported, not silently dropped.
    pub async fn train(&self, sales: &[SalesRecord]) -> Result<TrainOutcome, ServiceError> {
        let groups = group_by_sku(sales);
        let sku_universe: Vec<String> = groups.keys().cloned().collect();

        let mut jobs = Vec::with_capacity(groups.len());
        for (sku, records) in groups {
            let config = self.config.clone();
            let job_sku = sku.clone();
            jobs.push((
                sku,
                move || -> Result<(TrainedModelHandle, TrainedSkuSummary), String> {
                    let series = preprocess::build_series(&job_sku, &records, &config)
                        .map_err(|rejection| rejection.reason)?;
                    let selection = selector::select_model(&series, &config);
                    let summary = TrainedSkuSummary {
                        sku: job_sku.clone(),
                        model_used: selection.handle.model_kind(),
                        validation_error: selection.handle.validation_mape,
                        data_points: selection.handle.data_points,
                    };
                    Ok((selection.handle, summary))
                },
            ));
        }

        let (completed, cancelled_early) = self.run_batch(jobs).await;

        let mut trained = Vec::new();
        let mut skipped = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();

        for (sku, outcome) in completed {
            seen.insert(sku.clone());
            match outcome {
                Ok((handle, summary)) => {
                    self.store.put(handle).await?;
                    trained.push(summary);
                }
                Err(reason) => skipped.push(SkippedSku { sku, reason }),
            }
        }
        for sku in sku_universe {
            if !seen.contains(&sku) {
                skipped.push(SkippedSku {
                    sku,
                    reason: BATCH_CANCELLED.to_string(),
                });
            }
        }

        trained.sort_by(|a, b| a.sku.cmp(&b.sku));
        skipped.sort_by(|a, b| a.sku.cmp(&b.sku));

        info!(
            trained = trained.len(),
            skipped = skipped.len(),
            cancelled_early,
            "training batch finished"
        );
        Ok(TrainOutcome {
            trained,
            skipped,
            cancelled_early,
        })
    }

    /// Forecast demand and recommend a stock action for every SKU present
    /// in both the sales history and the inventory snapshot. SKUs missing
    /// from either side are excluded with an explicit reason.
    pub async fn predict(
        &self,
        sales: &[SalesRecord],
        inventory: &[InventorySnapshot],
        lead_time_days: u32,
    ) -> Result<PredictOutcome, ServiceError> {
        let sales_groups = group_by_sku(sales);
        // One row per SKU is the snapshot's contract; a duplicate row is a
        // refresh and the later one wins.
        let mut inventory_rows: BTreeMap<String, InventorySnapshot> = BTreeMap::new();
        for row in inventory {
            inventory_rows.insert(row.sku.clone(), row.clone());
        }

        let mut excluded: Vec<SkippedSku> = Vec::new();
        for sku in sales_groups.keys() {
            if !inventory_rows.contains_key(sku) {
                excluded.push(SkippedSku {
                    sku: sku.clone(),
                    reason: MISSING_INVENTORY.to_string(),
                });
            }
        }

        let mut jobs = Vec::new();
        let mut dispatched: Vec<String> = Vec::new();
        for (sku, snapshot) in &inventory_rows {
            let Some(records) = sales_groups.get(sku) else {
                excluded.push(SkippedSku {
                    sku: sku.clone(),
                    reason: MISSING_SALES.to_string(),
                });
                continue;
            };

            let stored = self.store.get(sku).await?;
            let config = self.config.clone();
            let job_sku = sku.clone();
            let records = records.clone();
            let snapshot = snapshot.clone();
            dispatched.push(sku.clone());

            jobs.push((
                sku.clone(),
                move || -> Result<(Option<TrainedModelHandle>, SkuPrediction), String> {
                    // Reuse the stored handle when one exists; otherwise
                    // train on demand from the supplied history.
                    let (handle, freshly_trained) = match stored {
                        Some(handle) => (handle, None),
                        None => {
                            let series = preprocess::build_series(&job_sku, &records, &config)
                                .map_err(|rejection| rejection.reason)?;
                            let handle = selector::select_model(&series, &config).handle;
                            (handle.clone(), Some(handle))
                        }
                    };

                    let band = handle.model.forecast(config.horizon_periods);
                    let (point_forecast, lower_bound, upper_bound) = band.per_period();
                    let safety_stock = recommendation::safety_stock(
                        handle.model.residual_std(),
                        lead_time_days,
                    );
                    let action = recommendation::recommend(
                        snapshot.current_stock as f64,
                        point_forecast,
                        safety_stock,
                    );
                    let mut confidence_score =
                        recommendation::confidence_score(point_forecast, lower_bound, upper_bound);
                    if handle.validation_mape.is_none() {
                        confidence_score =
                            confidence_score.min(recommendation::DEGENERATE_CONFIDENCE_CAP);
                    }

                    Ok((
                        freshly_trained,
                        SkuPrediction {
                            sku: job_sku.clone(),
                            point_forecast,
                            lower_bound,
                            upper_bound,
                            confidence_score,
                            model_used: handle.model_kind(),
                            current_stock: snapshot.current_stock,
                            safety_stock,
                            recommendation: action,
                        },
                    ))
                },
            ));
        }

        let (completed, cancelled_early) = self.run_batch(jobs).await;

        let mut results = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        for (sku, outcome) in completed {
            seen.insert(sku.clone());
            match outcome {
                Ok((freshly_trained, prediction)) => {
                    if let Some(handle) = freshly_trained {
                        self.store.put(handle).await?;
                    }
                    results.push(prediction);
                }
                Err(reason) => excluded.push(SkippedSku { sku, reason }),
            }
        }
        for sku in dispatched {
            if !seen.contains(&sku) {
                excluded.push(SkippedSku {
                    sku,
                    reason: BATCH_CANCELLED.to_string(),
                });
            }
        }

        results.sort_by(|a, b| a.sku.cmp(&b.sku));
        excluded.sort_by(|a, b| a.sku.cmp(&b.sku));

        info!(
            results = results.len(),
            excluded = excluded.len(),
            cancelled_early,
            "prediction batch finished"
        );
        Ok(PredictOutcome {
            results,
            excluded,
            cancelled_early,
        })
    }

    /// Run per-SKU jobs with bounded concurrency and a batch deadline.
    ///
    /// Returns the completed `(sku, outcome)` pairs and whether the
    /// deadline fired. Jobs the deadline cut off are simply absent from
    /// the completed list; callers reconcile them against the dispatched
    /// SKU set.
    async fn run_batch<T, F>(
        &self,
        jobs: Vec<(String, F)>,
    ) -> (Vec<(String, Result<T, String>)>, bool)
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, String> + Send + 'static,
    {
        let deadline = Instant::now() + Duration::from_secs(self.config.batch_timeout_secs);
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_skus));
        let mut tasks: JoinSet<(String, Result<T, String>)> = JoinSet::new();

        for (sku, job) in jobs {
            let semaphore = semaphore.clone();
            tasks.spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .expect("batch semaphore is never closed");
                if Instant::now() >= deadline {
                    return (sku, Err(BATCH_CANCELLED.to_string()));
                }
                // Per-SKU failure boundary: a panicking model fit must not
                // take the batch down with it.
                let outcome = match catch_unwind(AssertUnwindSafe(job)) {
                    Ok(result) => result,
                    Err(payload) => Err(format!("internal error: {}", panic_reason(&payload))),
                };
                (sku, outcome)
            });
        }

        let mut completed = Vec::new();
        let mut cancelled_early = false;
        loop {
            match timeout_at(deadline, tasks.join_next()).await {
                Ok(Some(Ok(entry))) => completed.push(entry),
                Ok(Some(Err(join_error))) => {
                    // Aborted tasks surface here; anything else is a bug in
                    // the runtime wiring, not the batch.
                    if join_error.is_panic() {
                        warn!(error = %join_error, "SKU task panicked outside the batch guard");
                    }
                }
                Ok(None) => break,
                Err(_elapsed) => {
                    cancelled_early = true;
                    tasks.abort_all();
                    while tasks.join_next().await.is_some() {}
                    break;
                }
            }
        }

        // Jobs that saw the deadline themselves also count as cancellation,
        // even when the collection loop never timed out.
        if completed
            .iter()
            .any(|(_, outcome)| matches!(outcome, Err(reason) if reason == BATCH_CANCELLED))
        {
            cancelled_early = true;
        }

        (completed, cancelled_early)
    }
}

fn group_by_sku(sales: &[SalesRecord]) -> BTreeMap<String, Vec<SalesRecord>> {
    let mut groups: BTreeMap<String, Vec<SalesRecord>> = BTreeMap::new();
    for record in sales {
        groups
            .entry(record.sku.clone())
            .or_default()
            .push(record.clone());
    }
    groups
}

fn panic_reason(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
