use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};

use crate::{
    dto::catalog::{BrandList, BrandProducts},
    error::AppResult,
    models::Brand,
    response::ApiResponse,
    routes::params::Pagination,
    services::brand_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_brands))
        .route("/{slug}", get(get_brand))
        .route("/{slug}/products", get(brand_products))
}

#[utoipa::path(
    get,
    path = "/api/brands",
    responses((status = 200, description = "Active brands", body = ApiResponse<BrandList>)),
    tag = "Brands"
)]
pub async fn list_brands(State(state): State<AppState>) -> AppResult<Json<ApiResponse<BrandList>>> {
    let resp = brand_service::list_brands(&state).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/brands/{slug}",
    params(("slug" = String, Path, description = "Brand slug")),
    responses(
        (status = 200, description = "Brand", body = ApiResponse<Brand>),
        (status = 404, description = "Brand not found")
    ),
    tag = "Brands"
)]
pub async fn get_brand(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> AppResult<Json<ApiResponse<Brand>>> {
    let resp = brand_service::get_brand(&state, &slug).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/brands/{slug}/products",
    params(("slug" = String, Path, description = "Brand slug"), Pagination),
    responses(
        (status = 200, description = "Paginated products of the brand", body = ApiResponse<BrandProducts>),
        (status = 404, description = "Brand not found")
    ),
    tag = "Brands"
)]
pub async fn brand_products(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<ApiResponse<BrandProducts>>> {
    let resp = brand_service::brand_products(&state, &slug, pagination).await?;
    Ok(Json(resp))
}
