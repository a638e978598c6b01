/*!
 * # Forecasting Core
 *
 * Per-SKU demand forecasting and stock recommendation for the StockSight
 * dashboard: preprocessing, a bank of four interchangeable forecast models,
 * accuracy-gated model selection, a safety-stock decision rule, and the
 * batch pipeline that fans the whole thing out across SKUs.
 */

/// Raw sale events to a clean, gap-free, outlier-capped series
pub mod preprocess;

/// The four forecasting strategies behind one fit/forecast contract
pub mod model_bank;

/// Holdout validation and winner selection across the model bank
pub mod selector;

/// Safety stock, restock decision rule, and confidence scoring
pub mod recommendation;

/// Batch orchestration: train, predict, and per-SKU failure isolation
pub mod pipeline;

/// Injectable key-value store for trained model handles
pub mod store;

/// Synthetic multi-SKU sample data for the demo operation
pub mod demo;
