//! Property-based tests for the forecasting core.
//!
//! These verify the preprocessing and recommendation invariants across a
//! wide range of inputs, catching edge cases the scenario tests miss.

use chrono::{Datelike, Duration, NaiveDate};
use proptest::collection::vec;
use proptest::prelude::*;

use stocksight_forecast::ml::preprocess::{
    aggregate_by_date, cap_outliers, clean_records, detect_cadence, fill_calendar, iqr_fence,
};
use stocksight_forecast::ml::recommendation::{confidence_score, recommend, safety_stock};
use stocksight_forecast::models::{Cadence, SalesRecord, StockAction};

fn base_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).expect("valid date")
}

/// Records on arbitrary day offsets, possibly with several events per day.
fn records_strategy() -> impl Strategy<Value = Vec<SalesRecord>> {
    vec((0i64..200, 0.0f64..500.0), 1..80).prop_map(|entries| {
        entries
            .into_iter()
            .map(|(offset, quantity)| SalesRecord {
                date: (base_date() + Duration::days(offset)).to_string(),
                sku: "PROP".to_string(),
                quantity,
            })
            .collect()
    })
}

proptest! {
    // Gap-filling invariant: the reindexed series covers every period
    // between its first and last date at the detected cadence.
    #[test]
    fn filled_series_has_no_gaps(records in records_strategy()) {
        let (observations, skipped) = clean_records("PROP", &records);
        prop_assert_eq!(skipped, 0);

        let by_date = aggregate_by_date(&observations);
        let cadence = detect_cadence(&by_date);
        let (start, values) = fill_calendar(&by_date, cadence);

        let first = *by_date.keys().next().unwrap();
        let last = *by_date.keys().next_back().unwrap();
        let expected_len = match cadence {
            Cadence::Daily => (last - first).num_days() + 1,
            Cadence::Weekly => {
                let week = |d: NaiveDate| {
                    d - Duration::days(d.weekday().num_days_from_monday() as i64)
                };
                (week(last) - week(first)).num_days() / 7 + 1
            }
        };
        prop_assert_eq!(values.len() as i64, expected_len);
        prop_assert!(start <= first);
    }

    // Aggregation invariant: each daily bucket equals the sum of all
    // record quantities on that date, before any capping.
    #[test]
    fn daily_buckets_sum_all_events(records in records_strategy()) {
        let (observations, _) = clean_records("PROP", &records);
        let by_date = aggregate_by_date(&observations);

        for (date, total) in &by_date {
            let expected: f64 = records
                .iter()
                .filter(|r| r.date == date.to_string())
                .map(|r| r.quantity)
                .sum();
            prop_assert!((total - expected).abs() < 1e-6);
        }
    }

    // Outlier-capping bound: after capping, every value lies inside the
    // IQR fence computed on the pre-capping series.
    #[test]
    fn capped_values_stay_inside_the_fence(values in vec(0.0f64..10_000.0, 4..120)) {
        let (lower, upper) = iqr_fence(&values);
        let mut capped = values.clone();
        cap_outliers(&mut capped);

        prop_assert_eq!(capped.len(), values.len());
        for v in &capped {
            prop_assert!(*v >= lower - 1e-9 && *v <= upper + 1e-9);
        }
    }

    // Recommendation ordering: stock below the raw forecast is always
    // Increase, no matter the safety stock.
    #[test]
    fn stock_below_forecast_is_always_increase(
        stock in 0.0f64..1_000.0,
        forecast in 0.0f64..1_000.0,
        safety in 0.0f64..1_000.0,
    ) {
        let action = recommend(stock, forecast, safety);
        if stock < forecast {
            prop_assert_eq!(action, StockAction::Increase);
        } else if stock < forecast + safety {
            prop_assert_eq!(action, StockAction::Maintain);
        } else {
            prop_assert_eq!(action, StockAction::Reduce);
        }
    }

    // Confidence monotonicity: for a fixed point forecast, a narrower
    // interval never scores lower, and every score stays in [0, 1].
    #[test]
    fn narrower_intervals_never_score_lower(
        point in 0.0f64..500.0,
        half_width in 0.0f64..500.0,
        extra in 0.0f64..500.0,
    ) {
        let narrow = confidence_score(point, point - half_width, point + half_width);
        let wide = confidence_score(
            point,
            point - half_width - extra,
            point + half_width + extra,
        );
        prop_assert!(narrow >= wide);
        prop_assert!((0.0..=1.0).contains(&narrow));
        prop_assert!((0.0..=1.0).contains(&wide));
    }

    // Safety stock is non-negative and monotone in volatility and lead time.
    #[test]
    fn safety_stock_is_monotone(
        std_a in 0.0f64..100.0,
        std_extra in 0.0f64..100.0,
        lead in 1u32..30,
    ) {
        let base = safety_stock(std_a, lead);
        prop_assert!(base >= 0.0);
        prop_assert!(safety_stock(std_a + std_extra, lead) >= base);
        prop_assert!(safety_stock(std_a, lead + 1) >= base);
    }
}
