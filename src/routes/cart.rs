use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
};
use serde_json::Value;
use uuid::Uuid;

use crate::{
    dto::cart::{AddToCartRequest, SyncCartRequest, UpdateCartItemRequest},
    error::AppResult,
    middleware::auth::{AuthUser, CartOwner, GuestSession},
    models::{Cart, CartItem},
    response::ApiResponse,
    services::cart_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_cart).delete(clear_cart))
        .route("/items", post(add_item))
        .route("/items/{id}", put(update_item).delete(remove_item))
        .route("/sync", post(sync_cart))
}

#[utoipa::path(
    get,
    path = "/api/cart",
    params(("x-session-id" = Option<String>, Header, description = "Guest session id")),
    responses(
        (status = 200, description = "Cart with items and totals", body = ApiResponse<Cart>),
        (status = 400, description = "User ID or session ID is required")
    ),
    security((), ("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn get_cart(
    State(state): State<AppState>,
    owner: CartOwner,
) -> AppResult<Json<ApiResponse<Cart>>> {
    let resp = cart_service::get_cart(&state, &owner).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/cart/items",
    params(("x-session-id" = Option<String>, Header, description = "Guest session id")),
    request_body = AddToCartRequest,
    responses(
        (status = 201, description = "Item added to cart", body = ApiResponse<CartItem>),
        (status = 400, description = "Invalid quantity or insufficient stock"),
        (status = 404, description = "Product not found")
    ),
    security((), ("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn add_item(
    State(state): State<AppState>,
    owner: CartOwner,
    Json(payload): Json<AddToCartRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<CartItem>>)> {
    let resp = cart_service::add_item(&state, &owner, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    put,
    path = "/api/cart/items/{id}",
    params(
        ("id" = Uuid, Path, description = "Cart item ID"),
        ("x-session-id" = Option<String>, Header, description = "Guest session id")
    ),
    request_body = UpdateCartItemRequest,
    responses(
        (status = 200, description = "Cart item updated", body = ApiResponse<CartItem>),
        (status = 400, description = "Invalid quantity or insufficient stock"),
        (status = 404, description = "Cart item not found")
    ),
    security((), ("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn update_item(
    State(state): State<AppState>,
    owner: CartOwner,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCartItemRequest>,
) -> AppResult<Json<ApiResponse<CartItem>>> {
    let resp = cart_service::update_item(&state, &owner, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/cart/items/{id}",
    params(
        ("id" = Uuid, Path, description = "Cart item ID"),
        ("x-session-id" = Option<String>, Header, description = "Guest session id")
    ),
    responses(
        (status = 200, description = "Item removed from cart", body = ApiResponse<serde_json::Value>),
        (status = 404, description = "Cart item not found")
    ),
    security((), ("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn remove_item(
    State(state): State<AppState>,
    owner: CartOwner,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Value>>> {
    let resp = cart_service::remove_item(&state, &owner, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/cart",
    params(("x-session-id" = Option<String>, Header, description = "Guest session id")),
    responses(
        (status = 200, description = "Cart cleared", body = ApiResponse<serde_json::Value>),
        (status = 404, description = "Cart not found")
    ),
    security((), ("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn clear_cart(
    State(state): State<AppState>,
    owner: CartOwner,
) -> AppResult<Json<ApiResponse<Value>>> {
    let resp = cart_service::clear_cart(&state, &owner).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/cart/sync",
    params(("x-session-id" = Option<String>, Header, description = "Guest cart to merge")),
    request_body = SyncCartRequest,
    responses(
        (status = 200, description = "Merged cart", body = ApiResponse<Cart>),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn sync_cart(
    State(state): State<AppState>,
    user: AuthUser,
    GuestSession(session_id): GuestSession,
    Json(payload): Json<SyncCartRequest>,
) -> AppResult<Json<ApiResponse<Cart>>> {
    let resp = cart_service::sync_cart(&state, &user, session_id, payload).await?;
    Ok(Json(resp))
}
