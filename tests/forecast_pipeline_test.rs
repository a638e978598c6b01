//! End-to-end tests for the forecasting service: train, predict, demo,
//! cross-reference exclusion, and batch resilience.

use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use tokio::sync::mpsc;

use stocksight_forecast::config::ForecastConfig;
use stocksight_forecast::errors::ServiceError;
use stocksight_forecast::events::EventSender;
use stocksight_forecast::ml::store::InMemoryModelStore;
use stocksight_forecast::models::{
    InventorySnapshot, SalesRecord, StockAction,
};
use stocksight_forecast::services::forecasting::ForecastingService;

fn test_service() -> ForecastingService {
    let (tx, mut rx) = mpsc::channel(1024);
    tokio::spawn(async move { while rx.recv().await.is_some() {} });
    ForecastingService::new(
        Arc::new(InMemoryModelStore::new()),
        ForecastConfig::default(),
        EventSender::new(tx),
    )
}

fn history_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).expect("valid date")
}

fn constant_history(sku: &str, days: usize, quantity: f64) -> Vec<SalesRecord> {
    (0..days)
        .map(|i| SalesRecord {
            date: (history_start() + Duration::days(i as i64)).to_string(),
            sku: sku.to_string(),
            quantity,
        })
        .collect()
}

fn noisy_history(sku: &str, days: usize, mean: f64, std: f64, seed: u64) -> Vec<SalesRecord> {
    let mut rng = StdRng::seed_from_u64(seed);
    let noise = Normal::new(0.0, std).expect("positive std");
    (0..days)
        .map(|i| SalesRecord {
            date: (history_start() + Duration::days(i as i64)).to_string(),
            sku: sku.to_string(),
            quantity: (mean + noise.sample(&mut rng)).max(0.0),
        })
        .collect()
}

fn snapshot(sku: &str, current_stock: u32) -> InventorySnapshot {
    InventorySnapshot {
        sku: sku.to_string(),
        current_stock,
        unit_price: 19.99,
        category: "Test".to_string(),
    }
}

#[tokio::test]
async fn constant_demand_with_low_stock_recommends_increase() {
    // 90 days of exactly 10 units: the forecast should land on 10, the
    // safety stock on zero, and 5 units on hand cannot cover demand.
    let service = test_service();
    let sales = constant_history("P1", 90, 10.0);
    let inventory = vec![snapshot("P1", 5)];

    let response = service.predict(sales, inventory, Some(7)).await.unwrap();
    assert_eq!(response.results.len(), 1);
    assert!(!response.synthetic_data);

    let p1 = &response.results[0];
    assert!((p1.point_forecast - 10.0).abs() < 0.5, "forecast {}", p1.point_forecast);
    assert!(p1.safety_stock < 0.5, "safety stock {}", p1.safety_stock);
    assert_eq!(p1.recommendation, StockAction::Increase);
}

#[tokio::test]
async fn ample_stock_against_noisy_demand_recommends_reduce() {
    // Demand around 20 with std 4: forecast plus safety stock stays far
    // below 200 units on hand.
    let service = test_service();
    let sales = noisy_history("P2", 90, 20.0, 4.0, 42);
    let inventory = vec![snapshot("P2", 200)];

    let response = service.predict(sales, inventory, Some(7)).await.unwrap();
    assert_eq!(response.results.len(), 1);

    let p2 = &response.results[0];
    assert!(p2.point_forecast > 10.0 && p2.point_forecast < 30.0);
    assert_eq!(p2.recommendation, StockAction::Reduce);
}

#[tokio::test]
async fn sku_missing_from_inventory_is_excluded_with_reason() {
    let service = test_service();
    let mut sales = constant_history("IN_BOTH", 90, 10.0);
    sales.extend(constant_history("SALES_ONLY", 90, 8.0));
    let inventory = vec![snapshot("IN_BOTH", 40)];

    let response = service.predict(sales, inventory, None).await.unwrap();

    assert_eq!(response.results.len(), 1);
    assert_eq!(response.results[0].sku, "IN_BOTH");
    assert!(response.results.iter().all(|r| r.sku != "SALES_ONLY"));

    assert_eq!(response.excluded_count, 1);
    assert_eq!(response.excluded[0].sku, "SALES_ONLY");
    assert_eq!(response.excluded[0].reason, "missing inventory");
}

#[tokio::test]
async fn one_bad_sku_never_fails_the_batch() {
    let service = test_service();
    let mut sales = constant_history("OK1", 90, 10.0);
    sales.extend(constant_history("OK2", 90, 12.0));
    // A SKU whose every record is malformed.
    sales.push(SalesRecord {
        date: "yesterday-ish".to_string(),
        sku: "BROKEN".to_string(),
        quantity: 4.0,
    });

    let train = service.train(sales.clone()).await.unwrap();
    assert_eq!(train.trained.len(), 2);
    assert_eq!(train.skipped.len(), 1);
    assert_eq!(train.skipped[0].sku, "BROKEN");
    assert!(!train.cancelled_early);

    let inventory = vec![snapshot("OK1", 30), snapshot("OK2", 30), snapshot("BROKEN", 30)];
    let response = service.predict(sales, inventory, None).await.unwrap();
    assert_eq!(response.results.len(), 2);
    assert_eq!(response.excluded_count, 1);
    assert_eq!(response.excluded[0].sku, "BROKEN");
}

#[tokio::test]
async fn training_reports_insufficient_history_per_sku() {
    let service = test_service();
    let mut sales = constant_history("LONG", 90, 10.0);
    sales.extend(constant_history("SHORT", 30, 10.0));

    let train = service.train(sales).await.unwrap();
    assert_eq!(train.trained.len(), 1);
    assert_eq!(train.trained[0].sku, "LONG");
    assert_eq!(train.skipped.len(), 1);
    assert_eq!(train.skipped[0].sku, "SHORT");
    assert!(train.skipped[0].reason.contains("insufficient history"));
}

#[tokio::test]
async fn predict_reuses_models_trained_earlier() {
    let service = test_service();
    let sales = constant_history("P1", 90, 10.0);

    service.train(sales.clone()).await.unwrap();
    assert_eq!(service.models_cached().await.unwrap(), 1);

    let response = service
        .predict(sales, vec![snapshot("P1", 100)], Some(7))
        .await
        .unwrap();
    assert_eq!(response.results.len(), 1);
    // Still exactly one handle: predict reused it instead of retraining.
    assert_eq!(service.models_cached().await.unwrap(), 1);
}

#[tokio::test]
async fn all_zero_series_predicts_with_low_confidence_not_an_error() {
    let service = test_service();
    let sales = constant_history("GHOST", 90, 0.0);
    let response = service
        .predict(sales, vec![snapshot("GHOST", 3)], None)
        .await
        .unwrap();

    assert_eq!(response.results.len(), 1);
    let ghost = &response.results[0];
    assert_eq!(ghost.point_forecast, 0.0);
    assert!(ghost.confidence_score <= 0.25, "degenerate series must score low");
    assert_eq!(ghost.recommendation, StockAction::Reduce);
}

#[tokio::test]
async fn demo_exercises_the_full_pipeline() {
    let service = test_service();
    let response = service.demo(Some(7)).await.unwrap();

    assert!(response.synthetic_data);
    assert!(!response.results.is_empty());
    for result in &response.results {
        assert!(result.point_forecast >= 0.0);
        assert!(result.lower_bound >= 0.0);
        assert!(result.upper_bound >= result.lower_bound);
        assert!((0.0..=1.0).contains(&result.confidence_score));
        assert!(result.safety_stock >= 0.0);
    }
}

#[tokio::test]
async fn lead_time_bounds_are_enforced() {
    let service = test_service();
    for bad in [0u32, 31, 400] {
        let err = service.demo(Some(bad)).await.unwrap_err();
        assert!(matches!(err, ServiceError::ValidationError(_)), "{bad}");
    }
    // The documented default is in range and needs no argument.
    assert!(service.demo(None).await.is_ok());
}
