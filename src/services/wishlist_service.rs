use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, ModelTrait, QueryFilter,
    QueryOrder, Set, SqlErr, TransactionTrait,
};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::{
    audit,
    dto::wishlist::{AddWishlistItemRequest, WishlistStatus},
    entity::{WishlistItems, Wishlists, wishlist_items, wishlists},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, CartOwner},
    models::{Wishlist, WishlistItem},
    response::{ApiResponse, Meta},
    services::{
        cart_service::{add_product, get_or_create_cart},
        product_service::{cards_by_id, find_visible},
    },
    state::AppState,
};

async fn find_wishlist<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
) -> AppResult<Option<wishlists::Model>> {
    let wishlist = Wishlists::find()
        .filter(wishlists::Column::UserId.eq(user_id))
        .one(conn)
        .await?;
    Ok(wishlist)
}

async fn get_or_create_wishlist<C: ConnectionTrait + TransactionTrait>(
    conn: &C,
    user_id: Uuid,
) -> AppResult<wishlists::Model> {
    if let Some(wishlist) = find_wishlist(conn, user_id).await? {
        return Ok(wishlist);
    }

    let savepoint = conn.begin().await?;
    let created = wishlists::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        created_at: Set(Utc::now().fixed_offset()),
    }
    .insert(&savepoint)
    .await;

    match created {
        Ok(wishlist) => {
            savepoint.commit().await?;
            Ok(wishlist)
        }
        Err(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
            savepoint.rollback().await?;
            find_wishlist(conn, user_id)
                .await?
                .ok_or_else(|| AppError::not_found("Wishlist"))
        }
        Err(err) => Err(err.into()),
    }
}

async fn wishlist_view<C: ConnectionTrait>(
    conn: &C,
    wishlist: wishlists::Model,
) -> AppResult<Wishlist> {
    let rows = WishlistItems::find()
        .filter(wishlist_items::Column::WishlistId.eq(wishlist.id))
        .order_by_desc(wishlist_items::Column::CreatedAt)
        .all(conn)
        .await?;
    let mut cards = cards_by_id(conn, rows.iter().map(|i| i.product_id).collect()).await?;

    let items = rows
        .into_iter()
        .map(|item| WishlistItem {
            id: item.id,
            wishlist_id: item.wishlist_id,
            product_id: item.product_id,
            product: cards.remove(&item.product_id),
            created_at: item.created_at.with_timezone(&Utc),
        })
        .collect();

    Ok(Wishlist {
        id: wishlist.id,
        user_id: wishlist.user_id,
        items,
    })
}

async fn owned_item<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
    item_id: Uuid,
) -> AppResult<wishlist_items::Model> {
    let not_found = || AppError::not_found("Wishlist item");
    let wishlist = find_wishlist(conn, user_id).await?.ok_or_else(not_found)?;
    WishlistItems::find_by_id(item_id)
        .filter(wishlist_items::Column::WishlistId.eq(wishlist.id))
        .one(conn)
        .await?
        .ok_or_else(not_found)
}

pub async fn get_wishlist(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<Wishlist>> {
    let wishlist = get_or_create_wishlist(&state.orm, user.user_id).await?;
    let view = wishlist_view(&state.orm, wishlist).await?;
    Ok(ApiResponse::success(
        "Wishlist retrieved successfully",
        view,
        Some(Meta::empty()),
    ))
}

pub async fn add_item(
    state: &AppState,
    user: &AuthUser,
    payload: AddWishlistItemRequest,
) -> AppResult<ApiResponse<WishlistItem>> {
    let product = find_visible(&state.orm, payload.product_id).await?;
    let wishlist = get_or_create_wishlist(&state.orm, user.user_id).await?;

    let existing = WishlistItems::find()
        .filter(wishlist_items::Column::WishlistId.eq(wishlist.id))
        .filter(wishlist_items::Column::ProductId.eq(product.id))
        .one(&state.orm)
        .await?;
    if existing.is_some() {
        return Err(AppError::Conflict("Product is already in wishlist".into()));
    }

    let item = wishlist_items::ActiveModel {
        id: Set(Uuid::new_v4()),
        wishlist_id: Set(wishlist.id),
        product_id: Set(product.id),
        created_at: Set(Utc::now().fixed_offset()),
    }
    .insert(&state.orm)
    .await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "wishlist_add",
        "wishlist_items",
        json!({ "product_id": product.id }),
    )
    .await;

    let mut cards = cards_by_id(&state.orm, vec![item.product_id]).await?;
    Ok(ApiResponse::success(
        "Item added to wishlist",
        WishlistItem {
            id: item.id,
            wishlist_id: item.wishlist_id,
            product_id: item.product_id,
            product: cards.remove(&item.product_id),
            created_at: item.created_at.with_timezone(&Utc),
        },
        None,
    ))
}

pub async fn remove_item(
    state: &AppState,
    user: &AuthUser,
    item_id: Uuid,
) -> AppResult<ApiResponse<Value>> {
    let item = owned_item(&state.orm, user.user_id, item_id).await?;
    item.delete(&state.orm).await?;
    Ok(ApiResponse::message("Item removed from wishlist"))
}

pub async fn remove_by_product(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
) -> AppResult<ApiResponse<Value>> {
    let not_found = || AppError::NotFound("Product not found in wishlist".into());
    let wishlist = find_wishlist(&state.orm, user.user_id)
        .await?
        .ok_or_else(not_found)?;

    let result = WishlistItems::delete_many()
        .filter(wishlist_items::Column::WishlistId.eq(wishlist.id))
        .filter(wishlist_items::Column::ProductId.eq(product_id))
        .exec(&state.orm)
        .await?;
    if result.rows_affected == 0 {
        return Err(not_found());
    }

    Ok(ApiResponse::message("Item removed from wishlist"))
}

pub async fn clear_wishlist(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<Value>> {
    let wishlist = find_wishlist(&state.orm, user.user_id)
        .await?
        .ok_or_else(|| AppError::not_found("Wishlist"))?;

    WishlistItems::delete_many()
        .filter(wishlist_items::Column::WishlistId.eq(wishlist.id))
        .exec(&state.orm)
        .await?;

    Ok(ApiResponse::message("Wishlist cleared successfully"))
}

pub async fn check_product(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
) -> AppResult<ApiResponse<WishlistStatus>> {
    let is_in_wishlist = match find_wishlist(&state.orm, user.user_id).await? {
        Some(wishlist) => WishlistItems::find()
            .filter(wishlist_items::Column::WishlistId.eq(wishlist.id))
            .filter(wishlist_items::Column::ProductId.eq(product_id))
            .one(&state.orm)
            .await?
            .is_some(),
        None => false,
    };

    Ok(ApiResponse::success(
        "Wishlist status retrieved",
        WishlistStatus { is_in_wishlist },
        Some(Meta::empty()),
    ))
}

/// Moves one wishlist row into the user's cart with quantity 1.
pub async fn move_to_cart(
    state: &AppState,
    user: &AuthUser,
    item_id: Uuid,
) -> AppResult<ApiResponse<Value>> {
    let txn = state.orm.begin().await?;
    let item = owned_item(&txn, user.user_id, item_id).await?;

    let product = find_visible(&txn, item.product_id).await?;
    if !product.in_stock || product.stock_count < 1 {
        return Err(AppError::BadRequest("Product is out of stock".into()));
    }

    let cart = get_or_create_cart(&txn, &CartOwner::User(user.user_id)).await?;
    add_product(&txn, cart.id, product.id, 1).await?;
    item.delete(&txn).await?;
    txn.commit().await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "wishlist_move_to_cart",
        "wishlist_items",
        json!({ "product_id": product.id, "cart_id": cart.id }),
    )
    .await;

    Ok(ApiResponse::message("Item moved to cart successfully"))
}
