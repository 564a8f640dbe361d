use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use serde_json::Value;
use uuid::Uuid;

use crate::{
    dto::products::{ProductCardList, ProductDetail, ProductList, ReviewList, SuggestionList},
    error::AppResult,
    middleware::auth::{GuestSession, MaybeAuthUser},
    response::ApiResponse,
    routes::params::{LimitQuery, Pagination, ProductQuery, SearchQuery},
    services::product_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_products))
        .route("/search", get(search_products))
        .route("/autocomplete", get(autocomplete))
        .route("/trending", get(trending_products))
        .route("/slug/{slug}", get(get_product_by_slug))
        .route("/{id}", get(get_product))
        .route("/{id}/view", post(track_view))
        .route("/{id}/reviews", get(product_reviews))
        .route("/{id}/recommendations", get(related_products))
}

#[utoipa::path(
    get,
    path = "/api/products",
    params(ProductQuery),
    responses(
        (status = 200, description = "Filtered, paginated products", body = ApiResponse<ProductList>)
    ),
    tag = "Products"
)]
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> AppResult<Json<ApiResponse<ProductList>>> {
    let resp = product_service::list_products(&state, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/products/search",
    params(SearchQuery),
    responses(
        (status = 200, description = "Products matching the search term", body = ApiResponse<ProductCardList>),
        (status = 400, description = "Search query is required")
    ),
    tag = "Products"
)]
pub async fn search_products(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> AppResult<Json<ApiResponse<ProductCardList>>> {
    let resp = product_service::search_products(&state, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/products/autocomplete",
    params(SearchQuery),
    responses(
        (status = 200, description = "Name suggestions", body = ApiResponse<SuggestionList>)
    ),
    tag = "Products"
)]
pub async fn autocomplete(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> AppResult<Json<ApiResponse<SuggestionList>>> {
    let resp = product_service::autocomplete(&state, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/products/trending",
    params(LimitQuery),
    responses(
        (status = 200, description = "Most viewed products of the last week", body = ApiResponse<ProductCardList>)
    ),
    tag = "Products"
)]
pub async fn trending_products(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> AppResult<Json<ApiResponse<ProductCardList>>> {
    let resp = product_service::trending_products(&state, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/products/slug/{slug}",
    params(("slug" = String, Path, description = "Product slug")),
    responses(
        (status = 200, description = "Product detail", body = ApiResponse<ProductDetail>),
        (status = 404, description = "Product not found")
    ),
    tag = "Products"
)]
pub async fn get_product_by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    MaybeAuthUser(user): MaybeAuthUser,
    GuestSession(session_id): GuestSession,
) -> AppResult<Json<ApiResponse<ProductDetail>>> {
    let resp =
        product_service::get_product_by_slug(&state, &slug, user.as_ref(), session_id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/products/{id}",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product detail", body = ApiResponse<ProductDetail>),
        (status = 404, description = "Product not found")
    ),
    tag = "Products"
)]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    MaybeAuthUser(user): MaybeAuthUser,
    GuestSession(session_id): GuestSession,
) -> AppResult<Json<ApiResponse<ProductDetail>>> {
    let resp = product_service::get_product(&state, id, user.as_ref(), session_id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/products/{id}/view",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "View recorded", body = ApiResponse<serde_json::Value>),
        (status = 404, description = "Product not found")
    ),
    tag = "Products"
)]
pub async fn track_view(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    MaybeAuthUser(user): MaybeAuthUser,
    GuestSession(session_id): GuestSession,
) -> AppResult<Json<ApiResponse<Value>>> {
    let resp = product_service::track_view(&state, id, user.as_ref(), session_id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/products/{id}/reviews",
    params(("id" = Uuid, Path, description = "Product ID"), Pagination),
    responses(
        (status = 200, description = "Approved reviews, newest first", body = ApiResponse<ReviewList>),
        (status = 404, description = "Product not found")
    ),
    tag = "Products"
)]
pub async fn product_reviews(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<ApiResponse<ReviewList>>> {
    let resp = product_service::product_reviews(&state, id, pagination).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/products/{id}/recommendations",
    params(("id" = Uuid, Path, description = "Product ID"), LimitQuery),
    responses(
        (status = 200, description = "Products from the same category or brand", body = ApiResponse<ProductCardList>),
        (status = 404, description = "Product not found")
    ),
    tag = "Products"
)]
pub async fn related_products(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<LimitQuery>,
) -> AppResult<Json<ApiResponse<ProductCardList>>> {
    let resp = product_service::related_products(&state, id, query).await?;
    Ok(Json(resp))
}
