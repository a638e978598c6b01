use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::errors::ErrorResponse;
use crate::models::{
    Cadence, DemoRequest, InventorySnapshot, ModelKind, PredictRequest, PredictResponse,
    SalesRecord, SkippedSku, SkuPrediction, StockAction, TrainRequest, TrainResponse,
    TrainedSkuSummary,
};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "StockSight Forecast API",
        version = "0.1.0",
        description = r#"
# StockSight Demand Forecasting API

Per-SKU demand forecasting and stock recommendations for the StockSight
inventory dashboard.

## Operations

- **Train**: fit and select a forecasting model per SKU from raw sales history
- **Predict**: forecast demand with an uncertainty band and recommend a stock action per SKU
- **Demo**: exercise the full pipeline on synthesized multi-SKU sample data

## Batch Semantics

A batch never fails because one SKU cannot be modeled. Every response
enumerates successes alongside skipped or excluded SKUs, each with a
human-readable reason, and carries a `cancelled_early` flag when the batch
deadline cut processing short.
        "#,
        contact(
            name = "StockSight Team"
        ),
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    paths(
        crate::handlers::forecast::train_models,
        crate::handlers::forecast::predict_demand,
        crate::handlers::forecast::run_demo,
    ),
    components(schemas(
        SalesRecord,
        InventorySnapshot,
        Cadence,
        ModelKind,
        StockAction,
        TrainRequest,
        TrainResponse,
        TrainedSkuSummary,
        SkippedSku,
        PredictRequest,
        PredictResponse,
        SkuPrediction,
        DemoRequest,
        ErrorResponse,
    )),
    tags(
        (name = "Forecast", description = "Demand forecasting and stock recommendation endpoints")
    )
)]
pub struct ApiDoc;

/// Swagger UI mounted at `/swagger-ui`, serving the generated document.
pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi())
}
