use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};

use crate::{
    dto::catalog::{CategoryList, CategoryProducts},
    error::AppResult,
    models::CategoryDetail,
    response::ApiResponse,
    routes::params::Pagination,
    services::category_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_categories))
        .route("/{slug}", get(get_category))
        .route("/{slug}/products", get(category_products))
}

#[utoipa::path(
    get,
    path = "/api/categories",
    responses(
        (status = 200, description = "Active categories with product counts", body = ApiResponse<CategoryList>)
    ),
    tag = "Categories"
)]
pub async fn list_categories(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<CategoryList>>> {
    let resp = category_service::list_categories(&state).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/categories/{slug}",
    params(("slug" = String, Path, description = "Category slug")),
    responses(
        (status = 200, description = "Category with parent and children", body = ApiResponse<CategoryDetail>),
        (status = 404, description = "Category not found")
    ),
    tag = "Categories"
)]
pub async fn get_category(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> AppResult<Json<ApiResponse<CategoryDetail>>> {
    let resp = category_service::get_category(&state, &slug).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/categories/{slug}/products",
    params(("slug" = String, Path, description = "Category slug"), Pagination),
    responses(
        (status = 200, description = "Paginated products in the category", body = ApiResponse<CategoryProducts>),
        (status = 404, description = "Category not found")
    ),
    tag = "Categories"
)]
pub async fn category_products(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<ApiResponse<CategoryProducts>>> {
    let resp = category_service::category_products(&state, &slug, pagination).await?;
    Ok(Json(resp))
}
