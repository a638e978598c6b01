use axum::{extract::State, response::Json, routing::post, Router};

use crate::{
    errors::ServiceError,
    models::{DemoRequest, PredictRequest, PredictResponse, TrainRequest, TrainResponse},
    ApiResponse, AppState,
};

/// Build the forecast Router scoped under `/api/v1/forecast`.
pub fn forecast_routes() -> Router<AppState> {
    Router::new()
        .route("/train", post(train_models))
        .route("/predict", post(predict_demand))
        .route("/demo", post(run_demo))
}

/// Train forecasting models for every SKU with sufficient history
#[utoipa::path(
    post,
    path = "/api/v1/forecast/train",
    request_body = TrainRequest,
    responses(
        (status = 200, description = "Training batch completed", body = ApiResponse<TrainResponse>),
        (status = 400, description = "Malformed request body", body = crate::errors::ErrorResponse)
    ),
    tag = "Forecast"
)]
pub async fn train_models(
    State(state): State<AppState>,
    Json(request): Json<TrainRequest>,
) -> Result<Json<ApiResponse<TrainResponse>>, ServiceError> {
    let response = state.forecasting_service.train(request.sales).await?;
    Ok(Json(ApiResponse::success(response)))
}

/// Forecast demand and recommend stock actions
#[utoipa::path(
    post,
    path = "/api/v1/forecast/predict",
    request_body = PredictRequest,
    responses(
        (status = 200, description = "Prediction batch completed", body = ApiResponse<PredictResponse>),
        (status = 400, description = "Invalid lead time", body = crate::errors::ErrorResponse)
    ),
    tag = "Forecast"
)]
pub async fn predict_demand(
    State(state): State<AppState>,
    Json(request): Json<PredictRequest>,
) -> Result<Json<ApiResponse<PredictResponse>>, ServiceError> {
    let response = state
        .forecasting_service
        .predict(request.sales, request.inventory, request.lead_time_days)
        .await?;
    Ok(Json(ApiResponse::success(response)))
}

/// Exercise train + predict end to end on synthesized sample data
#[utoipa::path(
    post,
    path = "/api/v1/forecast/demo",
    request_body = DemoRequest,
    responses(
        (status = 200, description = "Demo batch completed on synthetic data", body = ApiResponse<PredictResponse>),
        (status = 400, description = "Invalid lead time", body = crate::errors::ErrorResponse)
    ),
    tag = "Forecast"
)]
pub async fn run_demo(
    State(state): State<AppState>,
    Json(request): Json<DemoRequest>,
) -> Result<Json<ApiResponse<PredictResponse>>, ServiceError> {
    let response = state
        .forecasting_service
        .demo(request.lead_time_days)
        .await?;
    Ok(Json(ApiResponse::success(response)))
}
