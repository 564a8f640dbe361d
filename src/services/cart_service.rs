use chrono::{Duration, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, ModelTrait,
    QueryFilter, QueryOrder, Set, SqlErr, TransactionTrait,
};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::{
    audit,
    dto::cart::{AddToCartRequest, SyncCartRequest, UpdateCartItemRequest},
    entity::{CartItems, Carts, Products, cart_items, carts, products},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, CartOwner},
    models::{Cart, CartItem, ProductCard},
    response::{ApiResponse, Meta},
    services::product_service::{cards_by_id, find_visible},
    state::AppState,
};

pub const CART_TTL_DAYS: i64 = 30;

fn owner_filter(owner: &CartOwner) -> Condition {
    match owner {
        CartOwner::User(user_id) => Condition::all().add(carts::Column::UserId.eq(*user_id)),
        CartOwner::Guest(session_id) => {
            Condition::all().add(carts::Column::SessionId.eq(session_id.as_str()))
        }
    }
}

fn owner_key(owner: &CartOwner) -> Value {
    match owner {
        CartOwner::User(user_id) => json!({ "user_id": user_id }),
        CartOwner::Guest(session_id) => json!({ "session_id": session_id }),
    }
}

fn audit_user(owner: &CartOwner) -> Option<Uuid> {
    match owner {
        CartOwner::User(user_id) => Some(*user_id),
        CartOwner::Guest(_) => None,
    }
}

pub(crate) async fn find_cart<C: ConnectionTrait>(
    conn: &C,
    owner: &CartOwner,
) -> AppResult<Option<carts::Model>> {
    let cart = Carts::find().filter(owner_filter(owner)).one(conn).await?;
    Ok(cart)
}

/// The owner's cart, created on first use.
pub(crate) async fn get_or_create_cart<C: ConnectionTrait + TransactionTrait>(
    conn: &C,
    owner: &CartOwner,
) -> AppResult<carts::Model> {
    if let Some(cart) = find_cart(conn, owner).await? {
        return Ok(cart);
    }

    let now = Utc::now().fixed_offset();
    let (user_id, session_id) = match owner {
        CartOwner::User(user_id) => (Some(*user_id), None),
        CartOwner::Guest(session_id) => (None, Some(session_id.clone())),
    };
    // The insert runs in a savepoint so a lost race leaves an enclosing
    // transaction usable for the re-read below.
    let savepoint = conn.begin().await?;
    let created = carts::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        session_id: Set(session_id),
        expires_at: Set(now + Duration::days(CART_TTL_DAYS)),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&savepoint)
    .await;

    match created {
        Ok(cart) => {
            savepoint.commit().await?;
            Ok(cart)
        }
        // A concurrent request created it first.
        Err(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
            savepoint.rollback().await?;
            find_cart(conn, owner)
                .await?
                .ok_or_else(|| AppError::not_found("Cart"))
        }
        Err(err) => Err(err.into()),
    }
}

fn ensure_stock(product: &products::Model, quantity: i32, message: &str) -> AppResult<()> {
    if !product.in_stock || product.stock_count < quantity {
        return Err(AppError::BadRequest(message.to_string()));
    }
    Ok(())
}

fn ensure_quantity(quantity: i32) -> AppResult<()> {
    if quantity < 1 {
        return Err(AppError::BadRequest(
            "Quantity must be at least 1".to_string(),
        ));
    }
    Ok(())
}

/// Adds `quantity` of a product to a cart, summing with an existing row.
pub(crate) async fn add_product<C: ConnectionTrait>(
    conn: &C,
    cart_id: Uuid,
    product_id: Uuid,
    quantity: i32,
) -> AppResult<cart_items::Model> {
    ensure_quantity(quantity)?;
    let product = find_visible(conn, product_id).await?;
    ensure_stock(
        &product,
        quantity,
        "Product is out of stock or insufficient quantity",
    )?;

    let now = Utc::now().fixed_offset();
    let existing = CartItems::find()
        .filter(cart_items::Column::CartId.eq(cart_id))
        .filter(cart_items::Column::ProductId.eq(product_id))
        .one(conn)
        .await?;

    let item = match existing {
        Some(item) => {
            let total = item.quantity + quantity;
            ensure_stock(&product, total, "Insufficient stock for requested quantity")?;
            let mut active: cart_items::ActiveModel = item.into();
            active.quantity = Set(total);
            active.updated_at = Set(now);
            active.update(conn).await?
        }
        None => {
            cart_items::ActiveModel {
                id: Set(Uuid::new_v4()),
                cart_id: Set(cart_id),
                product_id: Set(product_id),
                quantity: Set(quantity),
                price_at_time: Set(product.price),
                created_at: Set(now),
                updated_at: Set(now),
            }
            .insert(conn)
            .await?
        }
    };

    Ok(item)
}

/// `(subtotal, item_count)` over `(price_at_time, quantity)` pairs.
pub fn cart_totals<I>(lines: I) -> (i64, i64)
where
    I: IntoIterator<Item = (i64, i32)>,
{
    lines
        .into_iter()
        .fold((0, 0), |(subtotal, count), (price, quantity)| {
            (subtotal + price * quantity as i64, count + quantity as i64)
        })
}

fn to_item(item: cart_items::Model, product: Option<ProductCard>) -> CartItem {
    CartItem {
        id: item.id,
        cart_id: item.cart_id,
        product_id: item.product_id,
        quantity: item.quantity,
        price_at_time: item.price_at_time,
        product,
        created_at: item.created_at.with_timezone(&Utc),
        updated_at: item.updated_at.with_timezone(&Utc),
    }
}

async fn item_view<C: ConnectionTrait>(conn: &C, item: cart_items::Model) -> AppResult<CartItem> {
    let mut cards = cards_by_id(conn, vec![item.product_id]).await?;
    let card = cards.remove(&item.product_id);
    Ok(to_item(item, card))
}

pub(crate) async fn cart_view<C: ConnectionTrait>(conn: &C, cart: carts::Model) -> AppResult<Cart> {
    let rows = CartItems::find()
        .filter(cart_items::Column::CartId.eq(cart.id))
        .order_by_asc(cart_items::Column::CreatedAt)
        .all(conn)
        .await?;

    let (subtotal, item_count) = cart_totals(rows.iter().map(|i| (i.price_at_time, i.quantity)));
    let mut cards = cards_by_id(conn, rows.iter().map(|i| i.product_id).collect()).await?;

    let items = rows
        .into_iter()
        .map(|item| {
            let card = cards.remove(&item.product_id);
            to_item(item, card)
        })
        .collect();

    Ok(Cart {
        id: cart.id,
        user_id: cart.user_id,
        session_id: cart.session_id,
        items,
        subtotal,
        item_count,
        expires_at: cart.expires_at.with_timezone(&Utc),
    })
}

/// The item with `item_id` if it sits in the owner's cart.
async fn owned_item<C: ConnectionTrait>(
    conn: &C,
    owner: &CartOwner,
    item_id: Uuid,
) -> AppResult<cart_items::Model> {
    let not_found = || AppError::not_found("Cart item");
    let cart = find_cart(conn, owner).await?.ok_or_else(not_found)?;
    CartItems::find_by_id(item_id)
        .filter(cart_items::Column::CartId.eq(cart.id))
        .one(conn)
        .await?
        .ok_or_else(not_found)
}

pub async fn get_cart(state: &AppState, owner: &CartOwner) -> AppResult<ApiResponse<Cart>> {
    let cart = get_or_create_cart(&state.orm, owner).await?;
    let view = cart_view(&state.orm, cart).await?;
    Ok(ApiResponse::success(
        "Cart retrieved successfully",
        view,
        Some(Meta::empty()),
    ))
}

pub async fn add_item(
    state: &AppState,
    owner: &CartOwner,
    payload: AddToCartRequest,
) -> AppResult<ApiResponse<CartItem>> {
    ensure_quantity(payload.quantity)?;
    let cart = get_or_create_cart(&state.orm, owner).await?;
    let item = add_product(&state.orm, cart.id, payload.product_id, payload.quantity).await?;

    let mut metadata = owner_key(owner);
    metadata["product_id"] = json!(payload.product_id);
    metadata["quantity"] = json!(payload.quantity);
    audit::record(&state.pool, audit_user(owner), "cart_add", "cart_items", metadata).await;

    let view = item_view(&state.orm, item).await?;
    Ok(ApiResponse::success("Item added to cart", view, None))
}

pub async fn update_item(
    state: &AppState,
    owner: &CartOwner,
    item_id: Uuid,
    payload: UpdateCartItemRequest,
) -> AppResult<ApiResponse<CartItem>> {
    ensure_quantity(payload.quantity)?;
    let item = owned_item(&state.orm, owner, item_id).await?;
    // Lines already in the cart stay editable after the product is hidden.
    let product = Products::find_by_id(item.product_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("Product"))?;
    ensure_stock(
        &product,
        payload.quantity,
        "Insufficient stock for requested quantity",
    )?;

    let mut active: cart_items::ActiveModel = item.into();
    active.quantity = Set(payload.quantity);
    active.updated_at = Set(Utc::now().fixed_offset());
    let updated = active.update(&state.orm).await?;

    let view = item_view(&state.orm, updated).await?;
    Ok(ApiResponse::success("Cart item updated", view, Some(Meta::empty())))
}

pub async fn remove_item(
    state: &AppState,
    owner: &CartOwner,
    item_id: Uuid,
) -> AppResult<ApiResponse<Value>> {
    let item = owned_item(&state.orm, owner, item_id).await?;
    let product_id = item.product_id;
    item.delete(&state.orm).await?;

    let mut metadata = owner_key(owner);
    metadata["product_id"] = json!(product_id);
    audit::record(&state.pool, audit_user(owner), "cart_remove", "cart_items", metadata).await;

    Ok(ApiResponse::message("Item removed from cart"))
}

pub async fn clear_cart(state: &AppState, owner: &CartOwner) -> AppResult<ApiResponse<Value>> {
    let cart = find_cart(&state.orm, owner)
        .await?
        .ok_or_else(|| AppError::not_found("Cart"))?;

    CartItems::delete_many()
        .filter(cart_items::Column::CartId.eq(cart.id))
        .exec(&state.orm)
        .await?;

    Ok(ApiResponse::message("Cart cleared successfully"))
}

/// Merges posted guest items, then any cart stored under `session_id`, into
/// the user's cart. All or nothing.
pub async fn sync_cart(
    state: &AppState,
    user: &AuthUser,
    session_id: Option<String>,
    payload: SyncCartRequest,
) -> AppResult<ApiResponse<Cart>> {
    let owner = CartOwner::User(user.user_id);
    let txn = state.orm.begin().await?;
    let cart = get_or_create_cart(&txn, &owner).await?;

    for item in &payload.items {
        add_product(&txn, cart.id, item.product_id, item.quantity).await?;
    }

    let mut merged_guest_items = 0usize;
    if let Some(session_id) = session_id {
        let guest = find_cart(&txn, &CartOwner::Guest(session_id)).await?;
        if let Some(guest) = guest.filter(|g| g.id != cart.id) {
            let rows = CartItems::find()
                .filter(cart_items::Column::CartId.eq(guest.id))
                .order_by_asc(cart_items::Column::CreatedAt)
                .all(&txn)
                .await?;
            merged_guest_items = rows.len();
            for row in rows {
                add_product(&txn, cart.id, row.product_id, row.quantity).await?;
            }
            guest.delete(&txn).await?;
        }
    }

    txn.commit().await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "cart_sync",
        "carts",
        json!({
            "cart_id": cart.id,
            "posted_items": payload.items.len(),
            "guest_items": merged_guest_items,
        }),
    )
    .await;

    let view = cart_view(&state.orm, cart).await?;
    Ok(ApiResponse::success(
        "Guest cart synced successfully",
        view,
        Some(Meta::empty()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn totals_sum_price_times_quantity() {
        let (subtotal, count) = cart_totals([(1999, 2), (500, 1), (250, 4)]);
        assert_eq!(subtotal, 1999 * 2 + 500 + 250 * 4);
        assert_eq!(count, 7);
    }

    #[test]
    fn empty_cart_totals_are_zero() {
        assert_eq!(cart_totals(std::iter::empty()), (0, 0));
    }

    #[test]
    fn quantity_must_be_positive() {
        assert!(ensure_quantity(1).is_ok());
        assert!(matches!(ensure_quantity(0), Err(AppError::BadRequest(_))));
        assert!(matches!(ensure_quantity(-3), Err(AppError::BadRequest(_))));
    }
}
