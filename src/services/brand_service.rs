use std::collections::HashMap;

use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder};
use uuid::Uuid;

use crate::{
    db::DbPool,
    dto::catalog::{BrandList, BrandProducts},
    entity::{Brands, Products, brands, products},
    error::{AppError, AppResult},
    models::Brand,
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    services::product_service::{visible, with_refs},
    state::AppState,
};

async fn product_counts(pool: &DbPool) -> AppResult<HashMap<Uuid, i64>> {
    let rows: Vec<(Uuid, i64)> = sqlx::query_as(
        r#"
        SELECT brand_id, COUNT(*)
        FROM products
        WHERE is_active AND deleted_at IS NULL
        GROUP BY brand_id
        "#,
    )
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().collect())
}

async fn find_active(state: &AppState, slug: &str) -> AppResult<brands::Model> {
    Brands::find()
        .filter(brands::Column::Slug.eq(slug))
        .filter(brands::Column::IsActive.eq(true))
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("Brand"))
}

async fn visible_count(state: &AppState, brand_id: Uuid) -> AppResult<i64> {
    let count = Products::find()
        .filter(visible())
        .filter(products::Column::BrandId.eq(brand_id))
        .count(&state.orm)
        .await?;
    Ok(count as i64)
}

pub async fn list_brands(state: &AppState) -> AppResult<ApiResponse<BrandList>> {
    let rows = Brands::find()
        .filter(brands::Column::IsActive.eq(true))
        .order_by_asc(brands::Column::Name)
        .all(&state.orm)
        .await?;
    let counts = product_counts(&state.pool).await?;

    let items = rows
        .into_iter()
        .map(|b| {
            let count = counts.get(&b.id).copied().unwrap_or(0);
            Brand::from_entity(b, count)
        })
        .collect();

    Ok(ApiResponse::success(
        "Brands retrieved successfully",
        BrandList { items },
        Some(Meta::empty()),
    ))
}

pub async fn get_brand(state: &AppState, slug: &str) -> AppResult<ApiResponse<Brand>> {
    let brand = find_active(state, slug).await?;
    let count = visible_count(state, brand.id).await?;

    Ok(ApiResponse::success(
        "Brand retrieved successfully",
        Brand::from_entity(brand, count),
        Some(Meta::empty()),
    ))
}

pub async fn brand_products(
    state: &AppState,
    slug: &str,
    pagination: Pagination,
) -> AppResult<ApiResponse<BrandProducts>> {
    let (page, limit, _) = pagination.normalize(12);
    let brand = find_active(state, slug).await?;

    let paginator = Products::find()
        .filter(visible())
        .filter(products::Column::BrandId.eq(brand.id))
        .order_by_desc(products::Column::CreatedAt)
        .paginate(&state.orm, limit as u64);
    let total = paginator.num_items().await? as i64;
    let rows = paginator.fetch_page((page - 1) as u64).await?;
    let items = with_refs(&state.orm, rows).await?;

    Ok(ApiResponse::success(
        "Brand products retrieved successfully",
        BrandProducts {
            brand: Brand::from_entity(brand, total),
            products: items,
        },
        Some(Meta::new(page, limit, total)),
    ))
}
