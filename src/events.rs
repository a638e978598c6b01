use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::{ModelKind, StockAction};

/// Events emitted by the forecasting service.
///
/// The channel is the seam for external collaborators: a persistence sink for
/// forecast history and an alert raiser that reacts to Increase/Reduce
/// recommendations against its own stock thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    ModelTrained {
        batch_id: Uuid,
        sku: String,
        model_kind: ModelKind,
        validation_mape: Option<f64>,
        trained_at: DateTime<Utc>,
    },
    ForecastBatchCompleted {
        batch_id: Uuid,
        results: usize,
        excluded: usize,
        cancelled_early: bool,
        synthetic_data: bool,
    },
    RecommendationIssued {
        batch_id: Uuid,
        sku: String,
        action: StockAction,
        current_stock: u32,
        point_forecast: f64,
        safety_stock: f64,
    },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously. Delivery is best-effort: a full or
    /// closed channel is logged, never propagated to the batch caller.
    pub async fn send(&self, event: Event) {
        if let Err(e) = self.sender.send(event).await {
            warn!("Failed to send event: {}", e);
        }
    }
}

/// Consume and log events until the channel closes. Downstream integrations
/// replace or wrap this loop.
pub async fn process_events(mut receiver: mpsc::Receiver<Event>) {
    while let Some(event) = receiver.recv().await {
        match &event {
            Event::ModelTrained {
                batch_id,
                sku,
                model_kind,
                validation_mape,
                ..
            } => {
                info!(
                    %batch_id,
                    %sku,
                    model = %model_kind,
                    mape = ?validation_mape,
                    "model trained"
                );
            }
            Event::ForecastBatchCompleted {
                batch_id,
                results,
                excluded,
                cancelled_early,
                synthetic_data,
            } => {
                info!(
                    %batch_id,
                    results = *results,
                    excluded = *excluded,
                    cancelled_early = *cancelled_early,
                    synthetic_data = *synthetic_data,
                    "forecast batch completed"
                );
            }
            Event::RecommendationIssued {
                batch_id,
                sku,
                action,
                current_stock,
                ..
            } => {
                info!(
                    %batch_id,
                    %sku,
                    action = %action,
                    current_stock = *current_stock,
                    "recommendation issued"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_after_receiver_dropped_does_not_panic() {
        let (tx, rx) = mpsc::channel(4);
        drop(rx);
        let sender = EventSender::new(tx);
        sender
            .send(Event::ForecastBatchCompleted {
                batch_id: Uuid::new_v4(),
                results: 0,
                excluded: 0,
                cancelled_early: false,
                synthetic_data: false,
            })
            .await;
    }
}
