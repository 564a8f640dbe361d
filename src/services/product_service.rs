use std::collections::HashMap;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, Order,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
    sea_query::{Expr, extension::postgres::PgExpr},
};
use uuid::Uuid;

use crate::{
    dto::products::{ProductCardList, ProductDetail, ProductList, ReviewList, Suggestion, SuggestionList},
    entity::{
        Brands, Categories, Products, Reviews, Users, brands, categories, product_views, products,
        reviews, users,
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{BrandRef, CategoryRef, Product, ProductCard, Review, ReviewAuthor},
    response::{ApiResponse, Meta},
    routes::params::{LimitQuery, Pagination, ProductQuery, ProductSortBy, SearchQuery, SortOrder},
    state::AppState,
};

const DETAIL_REVIEWS: u64 = 5;
const TRENDING_WINDOW_DAYS: i32 = 7;

/// Active and not soft-deleted.
pub(crate) fn visible() -> Condition {
    Condition::all()
        .add(products::Column::IsActive.eq(true))
        .add(products::Column::DeletedAt.is_null())
}

/// `%term%` with LIKE wildcards in the term escaped.
pub(crate) fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

fn matches_text(term: &str) -> Condition {
    let pattern = like_pattern(term);
    Condition::any()
        .add(Expr::col((products::Entity, products::Column::Name)).ilike(pattern.clone()))
        .add(Expr::col((products::Entity, products::Column::Description)).ilike(pattern))
}

async fn category_refs<C: ConnectionTrait>(
    conn: &C,
    rows: &[products::Model],
) -> AppResult<HashMap<Uuid, CategoryRef>> {
    let ids: Vec<Uuid> = rows.iter().map(|p| p.category_id).collect();
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let categories = Categories::find()
        .filter(categories::Column::Id.is_in(ids))
        .all(conn)
        .await?;
    Ok(categories
        .iter()
        .map(|c| (c.id, CategoryRef::from(c)))
        .collect())
}

async fn brand_refs<C: ConnectionTrait>(
    conn: &C,
    rows: &[products::Model],
) -> AppResult<HashMap<Uuid, BrandRef>> {
    let ids: Vec<Uuid> = rows.iter().map(|p| p.brand_id).collect();
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let brands = Brands::find()
        .filter(brands::Column::Id.is_in(ids))
        .all(conn)
        .await?;
    Ok(brands.iter().map(|b| (b.id, BrandRef::from(b))).collect())
}

/// Full product shapes with their category and brand refs.
pub(crate) async fn with_refs<C: ConnectionTrait>(
    conn: &C,
    rows: Vec<products::Model>,
) -> AppResult<Vec<Product>> {
    let categories = category_refs(conn, &rows).await?;
    let brands = brand_refs(conn, &rows).await?;
    Ok(rows
        .into_iter()
        .map(|p| {
            let category = categories.get(&p.category_id).cloned();
            let brand = brands.get(&p.brand_id).cloned();
            Product::from_entity(p, category, brand)
        })
        .collect())
}

pub(crate) async fn to_cards<C: ConnectionTrait>(
    conn: &C,
    rows: &[products::Model],
) -> AppResult<Vec<ProductCard>> {
    let categories = category_refs(conn, rows).await?;
    let brands = brand_refs(conn, rows).await?;
    Ok(rows
        .iter()
        .map(|p| {
            ProductCard::from_entity(
                p,
                brands.get(&p.brand_id).map(|b| b.name.clone()),
                categories.get(&p.category_id).map(|c| c.name.clone()),
            )
        })
        .collect())
}

/// Cards for the given product ids, keyed by id. Hidden products are included.
pub(crate) async fn cards_by_id<C: ConnectionTrait>(
    conn: &C,
    ids: Vec<Uuid>,
) -> AppResult<HashMap<Uuid, ProductCard>> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows = Products::find()
        .filter(products::Column::Id.is_in(ids))
        .all(conn)
        .await?;
    let cards = to_cards(conn, &rows).await?;
    Ok(cards.into_iter().map(|c| (c.id, c)).collect())
}

/// A visible product or `404 Product not found`.
pub(crate) async fn find_visible<C: ConnectionTrait>(
    conn: &C,
    product_id: Uuid,
) -> AppResult<products::Model> {
    Products::find_by_id(product_id)
        .filter(visible())
        .one(conn)
        .await?
        .ok_or_else(|| AppError::not_found("Product"))
}

fn sort_column(sort_by: ProductSortBy) -> products::Column {
    match sort_by {
        ProductSortBy::CreatedAt => products::Column::CreatedAt,
        ProductSortBy::Price => products::Column::Price,
        ProductSortBy::Rating => products::Column::Rating,
        ProductSortBy::Name => products::Column::Name,
    }
}

fn sort_direction(order: SortOrder) -> Order {
    match order {
        SortOrder::Asc => Order::Asc,
        SortOrder::Desc => Order::Desc,
    }
}

pub async fn list_products(
    state: &AppState,
    query: ProductQuery,
) -> AppResult<ApiResponse<ProductList>> {
    let (page, limit, _) = query.pagination().normalize(12);

    let mut cond = visible();
    if query.in_stock.unwrap_or(true) {
        cond = cond.add(products::Column::InStock.eq(true));
    }
    if let Some(slug) = query.category.as_deref().filter(|s| !s.is_empty()) {
        let category = Categories::find()
            .filter(categories::Column::Slug.eq(slug))
            .one(&state.orm)
            .await?;
        match category {
            Some(category) => cond = cond.add(products::Column::CategoryId.eq(category.id)),
            None => return Ok(empty_page(page, limit)),
        }
    }
    if let Some(slug) = query.brand.as_deref().filter(|s| !s.is_empty()) {
        let brand = Brands::find()
            .filter(brands::Column::Slug.eq(slug))
            .one(&state.orm)
            .await?;
        match brand {
            Some(brand) => cond = cond.add(products::Column::BrandId.eq(brand.id)),
            None => return Ok(empty_page(page, limit)),
        }
    }
    if let Some(min) = query.min_price {
        cond = cond.add(products::Column::Price.gte(min));
    }
    if let Some(max) = query.max_price {
        cond = cond.add(products::Column::Price.lte(max));
    }
    if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        cond = cond.add(matches_text(search));
    }

    let sort_by = sort_column(query.sort_by.unwrap_or(ProductSortBy::CreatedAt));
    let order = sort_direction(query.sort_order.unwrap_or(SortOrder::Desc));

    let paginator = Products::find()
        .filter(cond)
        .order_by(sort_by, order)
        .order_by_asc(products::Column::Id)
        .paginate(&state.orm, limit as u64);
    let total = paginator.num_items().await? as i64;
    let rows = paginator.fetch_page((page - 1) as u64).await?;

    let items = with_refs(&state.orm, rows).await?;
    Ok(ApiResponse::success(
        "Products retrieved successfully",
        ProductList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

fn empty_page(page: i64, limit: i64) -> ApiResponse<ProductList> {
    ApiResponse::success(
        "Products retrieved successfully",
        ProductList { items: Vec::new() },
        Some(Meta::new(page, limit, 0)),
    )
}

pub async fn search_products(
    state: &AppState,
    query: SearchQuery,
) -> AppResult<ApiResponse<ProductCardList>> {
    let Some(term) = query.term() else {
        return Ok(ApiResponse::success(
            "Search results",
            ProductCardList { items: Vec::new() },
            Some(Meta::empty()),
        ));
    };

    let rows = Products::find()
        .filter(visible())
        .filter(matches_text(term))
        .order_by_desc(products::Column::Rating)
        .limit(query.limit_or(10))
        .all(&state.orm)
        .await?;

    let cards = to_cards(&state.orm, &rows).await?;
    Ok(ApiResponse::success(
        "Search results",
        ProductCardList { items: cards },
        Some(Meta::empty()),
    ))
}

pub async fn autocomplete(
    state: &AppState,
    query: SearchQuery,
) -> AppResult<ApiResponse<SuggestionList>> {
    let Some(term) = query.term() else {
        return Ok(ApiResponse::success(
            "Suggestions",
            SuggestionList { items: Vec::new() },
            Some(Meta::empty()),
        ));
    };

    let rows = Products::find()
        .filter(visible())
        .filter(Expr::col((products::Entity, products::Column::Name)).ilike(like_pattern(term)))
        .order_by_desc(products::Column::Rating)
        .limit(query.limit_or(5))
        .all(&state.orm)
        .await?;

    let suggestions = rows
        .into_iter()
        .map(|p| Suggestion {
            id: p.id,
            value: p.name.clone(),
            label: p.name,
        })
        .collect();
    Ok(ApiResponse::success(
        "Suggestions",
        SuggestionList { items: suggestions },
        Some(Meta::empty()),
    ))
}

pub async fn trending_products(
    state: &AppState,
    query: LimitQuery,
) -> AppResult<ApiResponse<ProductCardList>> {
    let limit = query.limit_or(10) as i64;

    let ranked: Vec<(Uuid, i64)> = sqlx::query_as(
        r#"
        SELECT pv.product_id, COUNT(*) AS views
        FROM product_views pv
        JOIN products p ON p.id = pv.product_id
        WHERE pv.created_at >= NOW() - make_interval(days => $1)
          AND p.is_active AND p.deleted_at IS NULL
        GROUP BY pv.product_id
        ORDER BY views DESC, pv.product_id
        LIMIT $2
        "#,
    )
    .bind(TRENDING_WINDOW_DAYS)
    .bind(limit)
    .fetch_all(&state.pool)
    .await?;

    let ids: Vec<Uuid> = ranked.iter().map(|(id, _)| *id).collect();
    let mut cards = cards_by_id(&state.orm, ids.clone()).await?;
    let items = ids.iter().filter_map(|id| cards.remove(id)).collect();

    Ok(ApiResponse::success(
        "Trending products retrieved successfully",
        ProductCardList { items },
        Some(Meta::empty()),
    ))
}

fn to_reviews(rows: Vec<(reviews::Model, Option<users::Model>)>) -> Vec<Review> {
    rows.into_iter()
        .map(|(review, author)| Review {
            id: review.id,
            product_id: review.product_id,
            rating: review.rating,
            title: review.title,
            comment: review.comment,
            images: review.images,
            is_verified_purchase: review.is_verified_purchase,
            helpful_count: review.helpful_count,
            user: author.map(|u| ReviewAuthor {
                id: u.id,
                first_name: u.first_name,
                last_name: u.last_name,
                avatar: u.avatar,
            }),
            created_at: review.created_at.with_timezone(&Utc),
        })
        .collect()
}

async fn record_view(
    state: &AppState,
    product_id: Uuid,
    user: Option<&AuthUser>,
    session_id: Option<String>,
) -> AppResult<()> {
    let Some(user) = user else {
        return Ok(());
    };
    product_views::ActiveModel {
        id: Set(Uuid::new_v4()),
        product_id: Set(product_id),
        user_id: Set(Some(user.user_id)),
        session_id: Set(session_id),
        created_at: Set(Utc::now().fixed_offset()),
    }
    .insert(&state.orm)
    .await?;
    Ok(())
}

async fn detail(
    state: &AppState,
    product: products::Model,
    user: Option<&AuthUser>,
    session_id: Option<String>,
) -> AppResult<ApiResponse<ProductDetail>> {
    let product_id = product.id;
    let latest = Reviews::find()
        .filter(reviews::Column::ProductId.eq(product_id))
        .order_by_desc(reviews::Column::CreatedAt)
        .limit(DETAIL_REVIEWS)
        .find_also_related(Users)
        .all(&state.orm)
        .await?;
    let reviews = to_reviews(latest);

    let mut products = with_refs(&state.orm, vec![product]).await?;
    let product = products
        .pop()
        .ok_or_else(|| AppError::not_found("Product"))?;

    if let Err(err) = record_view(state, product_id, user, session_id).await {
        tracing::warn!(error = %err, %product_id, "failed to record product view");
    }

    Ok(ApiResponse::success(
        "Product retrieved successfully",
        ProductDetail { product, reviews },
        Some(Meta::empty()),
    ))
}

pub async fn get_product(
    state: &AppState,
    product_id: Uuid,
    user: Option<&AuthUser>,
    session_id: Option<String>,
) -> AppResult<ApiResponse<ProductDetail>> {
    let product = find_visible(&state.orm, product_id).await?;
    detail(state, product, user, session_id).await
}

pub async fn get_product_by_slug(
    state: &AppState,
    slug: &str,
    user: Option<&AuthUser>,
    session_id: Option<String>,
) -> AppResult<ApiResponse<ProductDetail>> {
    let product = Products::find()
        .filter(products::Column::Slug.eq(slug))
        .filter(visible())
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("Product"))?;
    detail(state, product, user, session_id).await
}

pub async fn track_view(
    state: &AppState,
    product_id: Uuid,
    user: Option<&AuthUser>,
    session_id: Option<String>,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let product = find_visible(&state.orm, product_id).await?;
    record_view(state, product.id, user, session_id).await?;
    Ok(ApiResponse::message("View tracked successfully"))
}

pub async fn product_reviews(
    state: &AppState,
    product_id: Uuid,
    pagination: Pagination,
) -> AppResult<ApiResponse<ReviewList>> {
    let (page, limit, offset) = pagination.normalize(10);

    let approved = Reviews::find()
        .filter(reviews::Column::ProductId.eq(product_id))
        .filter(reviews::Column::IsApproved.eq(true));

    let total = approved.clone().count(&state.orm).await? as i64;
    let rows = approved
        .order_by_desc(reviews::Column::CreatedAt)
        .offset(offset as u64)
        .limit(limit as u64)
        .find_also_related(Users)
        .all(&state.orm)
        .await?;

    let items = to_reviews(rows);
    Ok(ApiResponse::success(
        "Reviews retrieved successfully",
        ReviewList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn related_products(
    state: &AppState,
    product_id: Uuid,
    query: LimitQuery,
) -> AppResult<ApiResponse<ProductCardList>> {
    let product = Products::find_by_id(product_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("Product"))?;

    let rows = Products::find()
        .filter(visible())
        .filter(products::Column::Id.ne(product.id))
        .filter(
            Condition::any()
                .add(products::Column::CategoryId.eq(product.category_id))
                .add(products::Column::BrandId.eq(product.brand_id)),
        )
        .order_by_desc(products::Column::Rating)
        .limit(query.limit_or(8))
        .all(&state.orm)
        .await?;

    let cards = to_cards(&state.orm, &rows).await?;
    Ok(ApiResponse::success(
        "Related products retrieved successfully",
        ProductCardList { items: cards },
        Some(Meta::empty()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("phone"), "%phone%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }

    #[test]
    fn sort_defaults_map_to_columns() {
        assert!(matches!(sort_column(ProductSortBy::Price), products::Column::Price));
        assert!(matches!(sort_direction(SortOrder::Asc), Order::Asc));
    }
}
