use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
};
use serde_json::Value;
use uuid::Uuid;

use crate::{
    dto::users::{
        AddressList, AddressRequest, PaymentMethodList, PaymentMethodRequest, PreferencesPatch,
        UpdateProfileRequest,
    },
    error::AppResult,
    middleware::auth::AuthUser,
    models::{Address, PaymentMethod, User},
    response::ApiResponse,
    services::{address_service, payment_method_service, user_service},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/profile", get(get_profile).put(update_profile))
        .route("/preferences", put(update_preferences))
        .route("/account", axum::routing::delete(delete_account))
        .route("/addresses", get(list_addresses).post(create_address))
        .route("/addresses/{id}", put(update_address).delete(delete_address))
        .route("/addresses/{id}/default", put(set_default_address))
        .route(
            "/payment-methods",
            get(list_payment_methods).post(create_payment_method),
        )
        .route(
            "/payment-methods/{id}",
            put(update_payment_method).delete(delete_payment_method),
        )
        .route("/payment-methods/{id}/default", put(set_default_payment_method))
}

#[utoipa::path(
    get,
    path = "/api/users/profile",
    responses(
        (status = 200, description = "Current user profile", body = ApiResponse<User>),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn get_profile(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<User>>> {
    let resp = user_service::get_profile(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/users/profile",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = ApiResponse<User>),
        (status = 400, description = "Validation failed")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn update_profile(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> AppResult<Json<ApiResponse<User>>> {
    let resp = user_service::update_profile(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/users/preferences",
    request_body(content = serde_json::Value, description = "Preference keys to merge"),
    responses(
        (status = 200, description = "Merged preferences", body = ApiResponse<serde_json::Value>),
        (status = 400, description = "Validation failed")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn update_preferences(
    State(state): State<AppState>,
    user: AuthUser,
    Json(patch): Json<PreferencesPatch>,
) -> AppResult<Json<ApiResponse<Value>>> {
    let resp = user_service::update_preferences(&state, &user, patch).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/users/account",
    responses(
        (status = 200, description = "Account deleted", body = ApiResponse<serde_json::Value>)
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn delete_account(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<Value>>> {
    let resp = user_service::delete_account(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/users/addresses",
    responses(
        (status = 200, description = "Addresses, default first", body = ApiResponse<AddressList>)
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn list_addresses(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<AddressList>>> {
    let resp = address_service::list_addresses(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/users/addresses",
    request_body = AddressRequest,
    responses(
        (status = 201, description = "Address created", body = ApiResponse<Address>),
        (status = 400, description = "Validation failed")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn create_address(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<AddressRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Address>>)> {
    let resp = address_service::create_address(&state, &user, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    put,
    path = "/api/users/addresses/{id}",
    params(("id" = Uuid, Path, description = "Address ID")),
    request_body = AddressRequest,
    responses(
        (status = 200, description = "Address updated", body = ApiResponse<Address>),
        (status = 404, description = "Address not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn update_address(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<AddressRequest>,
) -> AppResult<Json<ApiResponse<Address>>> {
    let resp = address_service::update_address(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/users/addresses/{id}",
    params(("id" = Uuid, Path, description = "Address ID")),
    responses(
        (status = 200, description = "Address deleted", body = ApiResponse<serde_json::Value>),
        (status = 404, description = "Address not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn delete_address(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Value>>> {
    let resp = address_service::delete_address(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/users/addresses/{id}/default",
    params(("id" = Uuid, Path, description = "Address ID")),
    responses(
        (status = 200, description = "Default address set", body = ApiResponse<Address>),
        (status = 404, description = "Address not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn set_default_address(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Address>>> {
    let resp = address_service::set_default_address(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/users/payment-methods",
    responses(
        (status = 200, description = "Payment methods, default first", body = ApiResponse<PaymentMethodList>)
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn list_payment_methods(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<PaymentMethodList>>> {
    let resp = payment_method_service::list_payment_methods(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/users/payment-methods",
    request_body = PaymentMethodRequest,
    responses(
        (status = 201, description = "Payment method added", body = ApiResponse<PaymentMethod>),
        (status = 400, description = "Validation failed")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn create_payment_method(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<PaymentMethodRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<PaymentMethod>>)> {
    let resp = payment_method_service::create_payment_method(&state, &user, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    put,
    path = "/api/users/payment-methods/{id}",
    params(("id" = Uuid, Path, description = "Payment method ID")),
    request_body = PaymentMethodRequest,
    responses(
        (status = 200, description = "Payment method updated", body = ApiResponse<PaymentMethod>),
        (status = 404, description = "Payment method not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn update_payment_method(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<PaymentMethodRequest>,
) -> AppResult<Json<ApiResponse<PaymentMethod>>> {
    let resp = payment_method_service::update_payment_method(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/users/payment-methods/{id}",
    params(("id" = Uuid, Path, description = "Payment method ID")),
    responses(
        (status = 200, description = "Payment method deleted", body = ApiResponse<serde_json::Value>),
        (status = 404, description = "Payment method not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn delete_payment_method(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Value>>> {
    let resp = payment_method_service::delete_payment_method(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/users/payment-methods/{id}/default",
    params(("id" = Uuid, Path, description = "Payment method ID")),
    responses(
        (status = 200, description = "Default payment method set", body = ApiResponse<PaymentMethod>),
        (status = 404, description = "Payment method not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn set_default_payment_method(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<PaymentMethod>>> {
    let resp = payment_method_service::set_default_payment_method(&state, &user, id).await?;
    Ok(Json(resp))
}
