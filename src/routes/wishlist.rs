use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
};
use serde_json::Value;
use uuid::Uuid;

use crate::{
    dto::wishlist::{AddWishlistItemRequest, WishlistStatus},
    error::AppResult,
    middleware::auth::AuthUser,
    models::{Wishlist, WishlistItem},
    response::ApiResponse,
    services::wishlist_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_wishlist).delete(clear_wishlist))
        .route("/items", post(add_item))
        .route("/items/{id}", delete(remove_item))
        .route("/items/{id}/move-to-cart", post(move_to_cart))
        .route("/products/{product_id}", delete(remove_by_product))
        .route("/check/{product_id}", get(check_product))
}

#[utoipa::path(
    get,
    path = "/api/wishlist",
    responses((status = 200, description = "Wishlist with items", body = ApiResponse<Wishlist>)),
    security(("bearer_auth" = [])),
    tag = "Wishlist"
)]
pub async fn get_wishlist(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<Wishlist>>> {
    let resp = wishlist_service::get_wishlist(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/wishlist/items",
    request_body = AddWishlistItemRequest,
    responses(
        (status = 201, description = "Item added to wishlist", body = ApiResponse<WishlistItem>),
        (status = 404, description = "Product not found"),
        (status = 409, description = "Product is already in wishlist")
    ),
    security(("bearer_auth" = [])),
    tag = "Wishlist"
)]
pub async fn add_item(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<AddWishlistItemRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<WishlistItem>>)> {
    let resp = wishlist_service::add_item(&state, &user, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    delete,
    path = "/api/wishlist/items/{id}",
    params(("id" = Uuid, Path, description = "Wishlist item ID")),
    responses(
        (status = 200, description = "Item removed", body = ApiResponse<serde_json::Value>),
        (status = 404, description = "Wishlist item not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Wishlist"
)]
pub async fn remove_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Value>>> {
    let resp = wishlist_service::remove_item(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/wishlist/products/{product_id}",
    params(("product_id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Item removed", body = ApiResponse<serde_json::Value>),
        (status = 404, description = "Product not found in wishlist")
    ),
    security(("bearer_auth" = [])),
    tag = "Wishlist"
)]
pub async fn remove_by_product(
    State(state): State<AppState>,
    user: AuthUser,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Value>>> {
    let resp = wishlist_service::remove_by_product(&state, &user, product_id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/wishlist",
    responses(
        (status = 200, description = "Wishlist cleared", body = ApiResponse<serde_json::Value>),
        (status = 404, description = "Wishlist not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Wishlist"
)]
pub async fn clear_wishlist(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<Value>>> {
    let resp = wishlist_service::clear_wishlist(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/wishlist/check/{product_id}",
    params(("product_id" = Uuid, Path, description = "Product ID")),
    responses((status = 200, description = "Wishlist membership", body = ApiResponse<WishlistStatus>)),
    security(("bearer_auth" = [])),
    tag = "Wishlist"
)]
pub async fn check_product(
    State(state): State<AppState>,
    user: AuthUser,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<WishlistStatus>>> {
    let resp = wishlist_service::check_product(&state, &user, product_id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/wishlist/items/{id}/move-to-cart",
    params(("id" = Uuid, Path, description = "Wishlist item ID")),
    responses(
        (status = 200, description = "Item moved to cart", body = ApiResponse<serde_json::Value>),
        (status = 400, description = "Product is out of stock"),
        (status = 404, description = "Wishlist item not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Wishlist"
)]
pub async fn move_to_cart(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Value>>> {
    let resp = wishlist_service::move_to_cart(&state, &user, id).await?;
    Ok(Json(resp))
}
