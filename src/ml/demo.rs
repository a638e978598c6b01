//! Synthetic multi-SKU sample data for the demo operation.
//!
//! The generated series carry the structure real SKUs show on the
//! dashboard: a base level, a weekly / monthly / weekday seasonal
//! component, a mild trend, bounded noise, and occasional zero-sales days.
//! Generation is seeded, so a demo run is reproducible end to end. The demo
//! operation feeds this data through the same train/predict path as real
//! data; nothing here shortcuts the pipeline.

use chrono::{Datelike, Duration, Utc};
use once_cell::sync::Lazy;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

use crate::models::{InventorySnapshot, SalesRecord};

const DEMO_SEED: u64 = 0x5716_c0de;

/// Days of history generated per SKU.
const HISTORY_DAYS: i64 = 180;

/// Chance of an in-range day recording zero sales anyway.
const ZERO_SALES_PROBABILITY: f64 = 0.05;

#[derive(Debug, Clone, Copy)]
enum SeasonalityProfile {
    /// Higher demand on Saturday and Sunday.
    WeekendBoost(f64),
    /// Higher demand during the first week of each month.
    FirstWeekBoost(f64),
    /// Higher demand Monday through Friday.
    WeekdayBoost(f64),
}

#[derive(Debug, Clone)]
struct DemoProduct {
    sku: &'static str,
    name: &'static str,
    category: &'static str,
    base_demand: f64,
    seasonality: SeasonalityProfile,
    daily_trend: f64,
    volatility: f64,
    unit_price: f64,
}

static CATALOG: Lazy<Vec<DemoProduct>> = Lazy::new(|| {
    vec![
        DemoProduct {
            sku: "PROD001",
            name: "Smartphone X",
            category: "Electronics",
            base_demand: 20.0,
            seasonality: SeasonalityProfile::WeekendBoost(10.0),
            daily_trend: 0.1,
            volatility: 5.0,
            unit_price: 599.99,
        },
        DemoProduct {
            sku: "PROD002",
            name: "Cotton T-Shirt",
            category: "Clothing",
            base_demand: 15.0,
            seasonality: SeasonalityProfile::FirstWeekBoost(8.0),
            daily_trend: 0.05,
            volatility: 3.0,
            unit_price: 24.99,
        },
        DemoProduct {
            sku: "PROD003",
            name: "Organic Apples",
            category: "Food",
            base_demand: 30.0,
            seasonality: SeasonalityProfile::WeekdayBoost(15.0),
            daily_trend: 0.02,
            volatility: 4.0,
            unit_price: 4.99,
        },
        DemoProduct {
            sku: "PROD004",
            name: "Gaming Laptop",
            category: "Electronics",
            base_demand: 8.0,
            seasonality: SeasonalityProfile::WeekendBoost(10.0),
            daily_trend: 0.15,
            volatility: 3.0,
            unit_price: 1299.99,
        },
        DemoProduct {
            sku: "PROD005",
            name: "Running Shoes",
            category: "Sports",
            base_demand: 12.0,
            seasonality: SeasonalityProfile::FirstWeekBoost(8.0),
            daily_trend: 0.08,
            volatility: 4.0,
            unit_price: 89.99,
        },
        DemoProduct {
            sku: "PROD006",
            name: "Coffee Beans",
            category: "Food",
            base_demand: 25.0,
            seasonality: SeasonalityProfile::WeekdayBoost(15.0),
            daily_trend: 0.03,
            volatility: 5.0,
            unit_price: 12.99,
        },
        DemoProduct {
            sku: "PROD007",
            name: "Wireless Headphones",
            category: "Electronics",
            base_demand: 18.0,
            seasonality: SeasonalityProfile::WeekendBoost(10.0),
            daily_trend: 0.12,
            volatility: 4.0,
            unit_price: 149.99,
        },
        DemoProduct {
            sku: "PROD008",
            name: "Denim Jeans",
            category: "Clothing",
            base_demand: 10.0,
            seasonality: SeasonalityProfile::FirstWeekBoost(8.0),
            daily_trend: 0.06,
            volatility: 3.0,
            unit_price: 59.99,
        },
    ]
});

/// Synthetic sales history for the whole demo catalog, ending yesterday.
pub fn sample_sales_history() -> Vec<SalesRecord> {
    let mut rng = StdRng::seed_from_u64(DEMO_SEED);
    let end = Utc::now().date_naive() - Duration::days(1);
    let start = end - Duration::days(HISTORY_DAYS - 1);

    let mut records = Vec::with_capacity(CATALOG.len() * HISTORY_DAYS as usize);
    for product in CATALOG.iter() {
        let noise = Normal::new(0.0, product.volatility).expect("volatility is positive");
        let mut date = start;
        let mut day_index = 0i64;
        while date <= end {
            let mut demand = product.base_demand;

            demand += match product.seasonality {
                SeasonalityProfile::WeekendBoost(boost) => {
                    if date.weekday().num_days_from_monday() >= 5 {
                        boost
                    } else {
                        0.0
                    }
                }
                SeasonalityProfile::FirstWeekBoost(boost) => {
                    if date.day() <= 7 {
                        boost
                    } else {
                        0.0
                    }
                }
                SeasonalityProfile::WeekdayBoost(boost) => {
                    if date.weekday().num_days_from_monday() < 5 {
                        boost
                    } else {
                        0.0
                    }
                }
            };

            demand += day_index as f64 * product.daily_trend;
            demand += noise.sample(&mut rng);

            let quantity = if rng.gen_bool(ZERO_SALES_PROBABILITY) {
                0.0
            } else {
                demand.max(0.0).floor()
            };

            records.push(SalesRecord {
                date: date.to_string(),
                sku: product.sku.to_string(),
                quantity,
            });

            date += Duration::days(1);
            day_index += 1;
        }
    }

    records
}

/// Stock snapshot for the demo catalog: two to five days of base demand,
/// jittered so the recommendations spread across all three actions.
pub fn sample_inventory() -> Vec<InventorySnapshot> {
    let mut rng = StdRng::seed_from_u64(DEMO_SEED ^ 0xffff);

    CATALOG
        .iter()
        .map(|product| {
            let days_of_stock = rng.gen_range(2.0..5.0);
            let jitter = Normal::new(0.0, product.base_demand * 0.3)
                .expect("base demand is positive")
                .sample(&mut rng);
            let current_stock = (product.base_demand * days_of_stock + jitter).max(0.0) as u32;

            InventorySnapshot {
                sku: product.sku.to_string(),
                current_stock,
                unit_price: product.unit_price,
                category: product.category.to_string(),
            }
        })
        .collect()
}

/// Names for dashboards that want to label demo SKUs.
pub fn product_name(sku: &str) -> Option<&'static str> {
    CATALOG.iter().find(|p| p.sku == sku).map(|p| p.name)
}
