mod common;

use sea_orm::{ActiveModelTrait, Set};
use shopmart_api::{
    error::AppError,
    routes::params::{LimitQuery, Pagination, ProductQuery, ProductSortBy, SearchQuery, SortOrder},
    services::{brand_service, category_service, product_service},
};

#[tokio::test]
async fn listing_filters_sorts_and_hides_deleted_products() -> anyhow::Result<()> {
    let Some(state) = common::setup_state().await? else {
        return Ok(());
    };
    let catalog = common::create_catalog(&state).await?;
    let cheap = common::create_product(&state, &catalog, "Budget Widget", 1_000, 5).await?;
    let pricey = common::create_product(&state, &catalog, "Premium Widget", 9_000, 5).await?;
    let empty = common::create_product(&state, &catalog, "Ghost Widget", 5_000, 0).await?;
    let gone = common::create_product(&state, &catalog, "Retired Widget", 4_000, 5).await?;

    let mut retired: shopmart_api::entity::products::ActiveModel = gone.clone().into();
    retired.deleted_at = Set(Some(chrono::Utc::now().fixed_offset()));
    retired.update(&state.orm).await?;

    let list = product_service::list_products(
        &state,
        ProductQuery {
            category: Some(catalog.category.slug.clone()),
            sort_by: Some(ProductSortBy::Price),
            sort_order: Some(SortOrder::Asc),
            ..Default::default()
        },
    )
    .await?;
    let ids: Vec<_> = list.data.unwrap().items.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![cheap.id, pricey.id]);
    let meta = list.meta.unwrap();
    assert_eq!(meta.total, Some(2));
    assert_eq!(meta.page, Some(1));

    // Sold-out products show up when in_stock=false.
    let all = product_service::list_products(
        &state,
        ProductQuery {
            brand: Some(catalog.brand.slug.clone()),
            in_stock: Some(false),
            min_price: Some(2_000),
            ..Default::default()
        },
    )
    .await?;
    let ids: Vec<_> = all.data.unwrap().items.iter().map(|p| p.id).collect();
    assert_eq!(ids.len(), 2);
    assert!(ids.contains(&pricey.id) && ids.contains(&empty.id));

    let unknown = product_service::list_products(
        &state,
        ProductQuery {
            category: Some(common::unique("missing")),
            ..Default::default()
        },
    )
    .await?;
    assert!(unknown.data.unwrap().items.is_empty());

    let hidden = product_service::get_product(&state, gone.id, None, None).await;
    assert!(matches!(hidden, Err(AppError::NotFound(_))));

    let detail = product_service::get_product_by_slug(&state, &cheap.slug, None, None)
        .await?
        .data
        .unwrap();
    assert_eq!(detail.product.id, cheap.id);
    assert_eq!(
        detail.product.category.as_ref().map(|c| c.slug.as_str()),
        Some(catalog.category.slug.as_str())
    );
    Ok(())
}

#[tokio::test]
async fn search_autocomplete_and_related() -> anyhow::Result<()> {
    let Some(state) = common::setup_state().await? else {
        return Ok(());
    };
    let catalog = common::create_catalog(&state).await?;
    let marker = common::unique("zephyr");
    let first = common::create_product(&state, &catalog, &format!("{marker} Speaker"), 7_500, 9).await?;
    let second = common::create_product(&state, &catalog, &format!("{marker} Soundbar"), 19_900, 3).await?;

    let results = product_service::search_products(
        &state,
        SearchQuery {
            q: Some(marker.to_uppercase()),
            limit: None,
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(results.items.len(), 2);

    // Wildcards in the term are literal.
    let literal = product_service::search_products(
        &state,
        SearchQuery {
            q: Some(format!("{marker}%xyz")),
            limit: None,
        },
    )
    .await?
    .data
    .unwrap();
    assert!(literal.items.is_empty());

    let suggestions = product_service::autocomplete(
        &state,
        SearchQuery {
            q: Some(marker.clone()),
            limit: Some(1),
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(suggestions.items.len(), 1);

    let related = product_service::related_products(&state, first.id, LimitQuery { limit: None })
        .await?
        .data
        .unwrap();
    let ids: Vec<_> = related.items.iter().map(|p| p.id).collect();
    assert!(ids.contains(&second.id));
    assert!(!ids.contains(&first.id));

    product_service::track_view(&state, first.id, None, Some(common::unique("session"))).await?;
    let reviews = product_service::product_reviews(&state, first.id, Pagination::new(1, 10))
        .await?
        .data
        .unwrap();
    assert!(reviews.items.is_empty());
    Ok(())
}

#[tokio::test]
async fn categories_and_brands_by_slug() -> anyhow::Result<()> {
    let Some(state) = common::setup_state().await? else {
        return Ok(());
    };
    let catalog = common::create_catalog(&state).await?;
    common::create_product(&state, &catalog, "Tablet", 30_000, 4).await?;
    common::create_product(&state, &catalog, "Stylus", 4_000, 40).await?;

    let detail = category_service::get_category(&state, &catalog.category.slug)
        .await?
        .data
        .unwrap();
    assert_eq!(detail.id, catalog.category.id);
    assert_eq!(detail.product_count, 2);

    let page = category_service::category_products(
        &state,
        &catalog.category.slug,
        Pagination::new(1, 1),
    )
    .await?;
    assert_eq!(page.data.unwrap().products.len(), 1);
    assert_eq!(page.meta.unwrap().total_pages, Some(2));

    let missing = category_service::get_category(&state, &common::unique("nope")).await;
    assert!(matches!(missing, Err(AppError::NotFound(_))));

    let brand = brand_service::get_brand(&state, &catalog.brand.slug)
        .await?
        .data
        .unwrap();
    assert_eq!(brand.product_count, 2);

    let products = brand_service::brand_products(&state, &catalog.brand.slug, Pagination::default())
        .await?
        .data
        .unwrap();
    assert_eq!(products.brand.id, catalog.brand.id);
    assert_eq!(products.products.len(), 2);

    let all = category_service::list_categories(&state).await?.data.unwrap();
    assert!(all.items.iter().any(|c| c.id == catalog.category.id));
    Ok(())
}
