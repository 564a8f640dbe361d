use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};

use crate::{
    dto::checkout::{PromoValidation, ShippingMethodList, ValidatePromoRequest},
    error::AppResult,
    middleware::auth::AuthUser,
    response::ApiResponse,
    services::checkout_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/shipping-methods", get(list_shipping_methods))
        .route("/validate-promo", post(validate_promo))
}

#[utoipa::path(
    get,
    path = "/api/checkout/shipping-methods",
    responses(
        (status = 200, description = "Active shipping methods", body = ApiResponse<ShippingMethodList>)
    ),
    tag = "Checkout"
)]
pub async fn list_shipping_methods(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<ShippingMethodList>>> {
    let resp = checkout_service::list_shipping_methods(&state).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/checkout/validate-promo",
    request_body = ValidatePromoRequest,
    responses(
        (status = 200, description = "Discount for the given subtotal", body = ApiResponse<PromoValidation>),
        (status = 400, description = "Promo code cannot be applied"),
        (status = 404, description = "Promo code not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Checkout"
)]
pub async fn validate_promo(
    State(state): State<AppState>,
    _user: AuthUser,
    Json(payload): Json<ValidatePromoRequest>,
) -> AppResult<Json<ApiResponse<PromoValidation>>> {
    let resp = checkout_service::validate_promo(&state, payload).await?;
    Ok(Json(resp))
}
