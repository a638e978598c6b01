//! Injectable key-value store for trained model handles.
//!
//! Training writes through this interface and prediction reads from it, so
//! model reuse across calls is a property of the store the caller wires in:
//! an in-memory map for tests and single-node deployments, a durable
//! backend for anything that must survive a restart. Handles are
//! independently owned per SKU; last-writer-wins is the intended semantics.

use async_trait::async_trait;
use dashmap::DashMap;

use crate::errors::ServiceError;
use crate::models::TrainedModelHandle;

#[async_trait]
pub trait ModelStore: Send + Sync {
    async fn get(&self, sku: &str) -> Result<Option<TrainedModelHandle>, ServiceError>;
    async fn put(&self, handle: TrainedModelHandle) -> Result<(), ServiceError>;
    async fn remove(&self, sku: &str) -> Result<(), ServiceError>;
    async fn clear(&self) -> Result<(), ServiceError>;
    async fn len(&self) -> Result<usize, ServiceError>;
}

/// Concurrent in-memory implementation.
#[derive(Debug, Default)]
pub struct InMemoryModelStore {
    models: DashMap<String, TrainedModelHandle>,
}

impl InMemoryModelStore {
    pub fn new() -> Self {
        Self {
            models: DashMap::new(),
        }
    }
}

#[async_trait]
impl ModelStore for InMemoryModelStore {
    async fn get(&self, sku: &str) -> Result<Option<TrainedModelHandle>, ServiceError> {
        Ok(self.models.get(sku).map(|entry| entry.value().clone()))
    }

    async fn put(&self, handle: TrainedModelHandle) -> Result<(), ServiceError> {
        self.models.insert(handle.sku.clone(), handle);
        Ok(())
    }

    async fn remove(&self, sku: &str) -> Result<(), ServiceError> {
        self.models.remove(sku);
        Ok(())
    }

    async fn clear(&self) -> Result<(), ServiceError> {
        self.models.clear();
        Ok(())
    }

    async fn len(&self) -> Result<usize, ServiceError> {
        Ok(self.models.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::model_bank::FittedModel;
    use crate::models::{Cadence, DemandSeries, ModelKind};
    use chrono::{NaiveDate, Utc};

    fn handle(sku: &str, data_points: usize) -> TrainedModelHandle {
        let series = DemandSeries {
            sku: sku.to_string(),
            cadence: Cadence::Daily,
            start: NaiveDate::from_ymd_opt(2024, 1, 1).expect("valid date"),
            values: vec![1.0; data_points.max(2)],
        };
        TrainedModelHandle {
            sku: sku.to_string(),
            model: FittedModel::fit(ModelKind::Naive, &series),
            validation_mape: Some(0.1),
            cadence: Cadence::Daily,
            data_points,
            trained_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn a_new_training_run_supersedes_the_old_handle() {
        let store = InMemoryModelStore::new();
        store.put(handle("A", 90)).await.unwrap();
        store.put(handle("A", 120)).await.unwrap();

        let stored = store.get("A").await.unwrap().expect("present");
        assert_eq!(stored.data_points, 120);
        assert_eq!(store.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn missing_sku_reads_as_none() {
        let store = InMemoryModelStore::new();
        assert!(store.get("nope").await.unwrap().is_none());
    }
}
