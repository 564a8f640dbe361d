use std::collections::HashMap;

use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder};
use uuid::Uuid;

use crate::{
    db::DbPool,
    dto::catalog::{CategoryList, CategoryProducts},
    entity::{Categories, Products, categories, products},
    error::{AppError, AppResult},
    models::{Category, CategoryDetail},
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    services::product_service::{visible, with_refs},
    state::AppState,
};

/// Visible product count per category id.
async fn product_counts(pool: &DbPool) -> AppResult<HashMap<Uuid, i64>> {
    let rows: Vec<(Uuid, i64)> = sqlx::query_as(
        r#"
        SELECT category_id, COUNT(*)
        FROM products
        WHERE is_active AND deleted_at IS NULL
        GROUP BY category_id
        "#,
    )
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().collect())
}

fn build_detail(
    category: &categories::Model,
    all: &[categories::Model],
    counts: &HashMap<Uuid, i64>,
) -> CategoryDetail {
    let parent = category
        .parent_id
        .and_then(|id| all.iter().find(|c| c.id == id))
        .cloned()
        .map(Category::from);
    let children = all
        .iter()
        .filter(|c| c.parent_id == Some(category.id))
        .cloned()
        .map(Category::from)
        .collect();

    CategoryDetail {
        id: category.id,
        name: category.name.clone(),
        slug: category.slug.clone(),
        description: category.description.clone(),
        image: category.image.clone(),
        sort_order: category.sort_order,
        parent,
        children,
        product_count: counts.get(&category.id).copied().unwrap_or(0),
    }
}

async fn active_categories(state: &AppState) -> AppResult<Vec<categories::Model>> {
    let rows = Categories::find()
        .filter(categories::Column::IsActive.eq(true))
        .order_by_asc(categories::Column::SortOrder)
        .order_by_asc(categories::Column::Name)
        .all(&state.orm)
        .await?;
    Ok(rows)
}

pub async fn list_categories(state: &AppState) -> AppResult<ApiResponse<CategoryList>> {
    let all = active_categories(state).await?;
    let counts = product_counts(&state.pool).await?;

    let items = all.iter().map(|c| build_detail(c, &all, &counts)).collect();
    Ok(ApiResponse::success(
        "Categories retrieved successfully",
        CategoryList { items },
        Some(Meta::empty()),
    ))
}

pub async fn get_category(state: &AppState, slug: &str) -> AppResult<ApiResponse<CategoryDetail>> {
    let all = active_categories(state).await?;
    let category = all
        .iter()
        .find(|c| c.slug == slug)
        .ok_or_else(|| AppError::not_found("Category"))?;

    let mut detail = build_detail(category, &all, &HashMap::new());
    if detail.parent.is_none() {
        // Inactive parents are still shown.
        if let Some(parent_id) = category.parent_id {
            detail.parent = Categories::find_by_id(parent_id)
                .one(&state.orm)
                .await?
                .map(Category::from);
        }
    }
    detail.product_count = Products::find()
        .filter(visible())
        .filter(products::Column::CategoryId.eq(category.id))
        .count(&state.orm)
        .await? as i64;

    Ok(ApiResponse::success(
        "Category retrieved successfully",
        detail,
        Some(Meta::empty()),
    ))
}

pub async fn category_products(
    state: &AppState,
    slug: &str,
    pagination: Pagination,
) -> AppResult<ApiResponse<CategoryProducts>> {
    let (page, limit, _) = pagination.normalize(12);

    let category = Categories::find()
        .filter(categories::Column::Slug.eq(slug))
        .filter(categories::Column::IsActive.eq(true))
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("Category"))?;

    let paginator = Products::find()
        .filter(visible())
        .filter(products::Column::CategoryId.eq(category.id))
        .order_by_desc(products::Column::CreatedAt)
        .paginate(&state.orm, limit as u64);
    let total = paginator.num_items().await? as i64;
    let rows = paginator.fetch_page((page - 1) as u64).await?;
    let products = with_refs(&state.orm, rows).await?;

    Ok(ApiResponse::success(
        "Category products retrieved successfully",
        CategoryProducts {
            category: Category::from(category),
            products,
        },
        Some(Meta::new(page, limit, total)),
    ))
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn category(name: &str, parent_id: Option<Uuid>, sort_order: i32) -> categories::Model {
        let now = Utc::now().fixed_offset();
        categories::Model {
            id: Uuid::new_v4(),
            name: name.into(),
            slug: name.to_lowercase(),
            description: None,
            image: None,
            parent_id,
            sort_order,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn detail_links_parent_and_children() {
        let electronics = category("Electronics", None, 1);
        let phones = category("Phones", Some(electronics.id), 1);
        let laptops = category("Laptops", Some(electronics.id), 2);
        let all = vec![electronics.clone(), phones.clone(), laptops];
        let counts = HashMap::from([(electronics.id, 4)]);

        let detail = build_detail(&electronics, &all, &counts);
        assert!(detail.parent.is_none());
        assert_eq!(detail.children.len(), 2);
        assert_eq!(detail.product_count, 4);

        let child = build_detail(&phones, &all, &counts);
        assert_eq!(child.parent.map(|p| p.id), Some(electronics.id));
        assert!(child.children.is_empty());
        assert_eq!(child.product_count, 0);
    }
}
