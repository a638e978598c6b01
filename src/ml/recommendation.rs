//! Safety stock, the restock decision rule, and confidence scoring.

use crate::models::StockAction;

/// z-score for the 80% target service level. A documented constant of the
/// pipeline, not a per-call input.
pub const SERVICE_LEVEL_Z: f64 = 1.28;

/// Confidence ceiling applied when the winner's validation error could not
/// be measured (degenerate holdout): the interval formula alone would
/// overstate certainty for such series.
pub const DEGENERATE_CONFIDENCE_CAP: f64 = 0.25;

/// Buffer stock to absorb demand variability over the lead time:
/// `z * demand_std * sqrt(lead_time_days)`.
pub fn safety_stock(demand_std: f64, lead_time_days: u32) -> f64 {
    (SERVICE_LEVEL_Z * demand_std * (lead_time_days as f64).sqrt()).max(0.0)
}

/// Ternary restock decision.
///
/// The evaluation order matters: stock below the raw forecast is always
/// Increase, regardless of safety stock, because it cannot even cover
/// expected demand.
pub fn recommend(current_stock: f64, point_forecast: f64, safety_stock: f64) -> StockAction {
    if current_stock < point_forecast {
        StockAction::Increase
    } else if current_stock < point_forecast + safety_stock {
        StockAction::Maintain
    } else {
        StockAction::Reduce
    }
}

/// Interval-width confidence score in `[0, 1]`.
///
/// `1 - (upper - lower) / max(1, point)`: monotonic in relative interval
/// width, so a narrower interval always scores at least as high. The wide
/// intervals of the naive fallback drive this toward zero rather than
/// erroring.
pub fn confidence_score(point_forecast: f64, lower: f64, upper: f64) -> f64 {
    let relative_width = (upper - lower) / point_forecast.max(1.0);
    (1.0 - relative_width).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_volatility_means_zero_safety_stock() {
        assert_eq!(safety_stock(0.0, 7), 0.0);
    }

    #[test]
    fn safety_stock_grows_with_lead_time() {
        let short = safety_stock(4.0, 7);
        let long = safety_stock(4.0, 28);
        assert!((short - 1.28 * 4.0 * 7f64.sqrt()).abs() < 1e-9);
        assert!((long - 2.0 * short).abs() < 1e-9);
    }

    #[test]
    fn stock_below_forecast_is_always_increase() {
        assert_eq!(recommend(5.0, 10.0, 0.0), StockAction::Increase);
        assert_eq!(recommend(5.0, 10.0, 1000.0), StockAction::Increase);
    }

    #[test]
    fn stock_between_forecast_and_buffer_is_maintain() {
        assert_eq!(recommend(12.0, 10.0, 5.0), StockAction::Maintain);
        // Exactly at the forecast with a buffer left: covered but not padded.
        assert_eq!(recommend(10.0, 10.0, 5.0), StockAction::Maintain);
    }

    #[test]
    fn stock_at_or_above_forecast_plus_buffer_is_reduce() {
        assert_eq!(recommend(15.0, 10.0, 5.0), StockAction::Reduce);
        assert_eq!(recommend(200.0, 20.0, 13.5), StockAction::Reduce);
        // No buffer at all: matching the forecast exactly is already enough.
        assert_eq!(recommend(10.0, 10.0, 0.0), StockAction::Reduce);
    }

    #[test]
    fn narrower_intervals_score_higher() {
        let narrow = confidence_score(20.0, 18.0, 22.0);
        let wide = confidence_score(20.0, 5.0, 35.0);
        assert!(narrow > wide);
        assert!((0.0..=1.0).contains(&narrow));
        assert!((0.0..=1.0).contains(&wide));
    }

    #[test]
    fn huge_intervals_clamp_to_zero_not_negative() {
        assert_eq!(confidence_score(2.0, 0.0, 100.0), 0.0);
    }

    #[test]
    fn zero_forecast_uses_the_unit_floor() {
        // Denominator floors at 1 so all-zero series stay well-defined.
        assert_eq!(confidence_score(0.0, 0.0, 0.0), 1.0);
        assert!(confidence_score(0.0, 0.0, 0.5) < 1.0);
    }
}
