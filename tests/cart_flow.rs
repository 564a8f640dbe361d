mod common;

use std::time::Duration;

use chrono::Utc;
use sea_orm::{ActiveModelTrait, IntoActiveModel, Set, TransactionTrait};
use shopmart_api::{
    dto::cart::{AddToCartRequest, SyncCartRequest, UpdateCartItemRequest},
    entity::carts,
    error::AppError,
    middleware::auth::CartOwner,
    services::cart_service,
};
use uuid::Uuid;

// Guest adds items, logs in, and the guest cart is merged into the user's cart.
#[tokio::test]
async fn guest_cart_merges_into_user_cart_on_sync() -> anyhow::Result<()> {
    let Some(state) = common::setup_state().await? else {
        return Ok(());
    };
    let catalog = common::create_catalog(&state).await?;
    let phone = common::create_product(&state, &catalog, "Phone", 50_000, 10).await?;
    let case = common::create_product(&state, &catalog, "Phone Case", 1_500, 20).await?;
    let charger = common::create_product(&state, &catalog, "Charger", 2_500, 5).await?;

    let session_id = common::unique("session");
    let guest = CartOwner::Guest(session_id.clone());

    let added = cart_service::add_item(
        &state,
        &guest,
        AddToCartRequest {
            product_id: phone.id,
            quantity: 1,
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(added.price_at_time, 50_000);
    assert_eq!(added.product.as_ref().map(|p| p.id), Some(phone.id));

    cart_service::add_item(
        &state,
        &guest,
        AddToCartRequest {
            product_id: case.id,
            quantity: 2,
        },
    )
    .await?;

    let guest_cart = cart_service::get_cart(&state, &guest).await?.data.unwrap();
    assert_eq!(guest_cart.session_id.as_deref(), Some(session_id.as_str()));
    assert_eq!(guest_cart.item_count, 3);
    assert_eq!(guest_cart.subtotal, 50_000 + 2 * 1_500);

    let user = common::create_user(&state).await?;
    let owner = CartOwner::User(user.user_id);

    // The user already has one case in their own cart.
    cart_service::add_item(
        &state,
        &owner,
        AddToCartRequest {
            product_id: case.id,
            quantity: 1,
        },
    )
    .await?;

    let merged = cart_service::sync_cart(
        &state,
        &user,
        Some(session_id.clone()),
        SyncCartRequest {
            items: vec![AddToCartRequest {
                product_id: charger.id,
                quantity: 1,
            }],
        },
    )
    .await?
    .data
    .unwrap();

    assert_eq!(merged.user_id, Some(user.user_id));
    assert_eq!(merged.items.len(), 3);
    let case_line = merged
        .items
        .iter()
        .find(|i| i.product_id == case.id)
        .expect("case line");
    assert_eq!(case_line.quantity, 3);
    assert_eq!(merged.item_count, 1 + 3 + 1);
    assert_eq!(merged.subtotal, 50_000 + 3 * 1_500 + 2_500);

    // The guest cart is gone after the merge.
    let cleared = cart_service::clear_cart(&state, &guest).await;
    assert!(matches!(cleared, Err(AppError::NotFound(_))));

    Ok(())
}

#[tokio::test]
async fn stock_and_quantity_rules() -> anyhow::Result<()> {
    let Some(state) = common::setup_state().await? else {
        return Ok(());
    };
    let catalog = common::create_catalog(&state).await?;
    let limited = common::create_product(&state, &catalog, "Limited Edition", 9_900, 3).await?;
    let sold_out = common::create_product(&state, &catalog, "Sold Out", 4_900, 0).await?;

    let user = common::create_user(&state).await?;
    let owner = CartOwner::User(user.user_id);

    let zero = cart_service::add_item(
        &state,
        &owner,
        AddToCartRequest {
            product_id: limited.id,
            quantity: 0,
        },
    )
    .await;
    assert!(matches!(zero, Err(AppError::BadRequest(_))));

    let unavailable = cart_service::add_item(
        &state,
        &owner,
        AddToCartRequest {
            product_id: sold_out.id,
            quantity: 1,
        },
    )
    .await;
    assert!(matches!(unavailable, Err(AppError::BadRequest(_))));

    let item = cart_service::add_item(
        &state,
        &owner,
        AddToCartRequest {
            product_id: limited.id,
            quantity: 2,
        },
    )
    .await?
    .data
    .unwrap();

    // Adding again sums with the existing line and is checked against stock.
    let over = cart_service::add_item(
        &state,
        &owner,
        AddToCartRequest {
            product_id: limited.id,
            quantity: 2,
        },
    )
    .await;
    match over {
        Err(AppError::BadRequest(msg)) => assert_eq!(msg, "Insufficient stock for requested quantity"),
        other => panic!("expected insufficient stock, got {other:?}"),
    }

    let updated = cart_service::update_item(
        &state,
        &owner,
        item.id,
        UpdateCartItemRequest { quantity: 3 },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(updated.quantity, 3);

    let too_many = cart_service::update_item(
        &state,
        &owner,
        item.id,
        UpdateCartItemRequest { quantity: 4 },
    )
    .await;
    assert!(matches!(too_many, Err(AppError::BadRequest(_))));

    // Another owner cannot touch this line.
    let stranger = CartOwner::Guest(common::unique("session"));
    let foreign = cart_service::remove_item(&state, &stranger, item.id).await;
    assert!(matches!(foreign, Err(AppError::NotFound(_))));

    cart_service::remove_item(&state, &owner, item.id).await?;
    let cart = cart_service::get_cart(&state, &owner).await?.data.unwrap();
    assert!(cart.items.is_empty());
    assert_eq!(cart.subtotal, 0);

    Ok(())
}

// One invalid posted item aborts the whole sync: nothing is merged and the
// guest cart survives.
#[tokio::test]
async fn sync_rolls_back_when_any_item_lacks_stock() -> anyhow::Result<()> {
    let Some(state) = common::setup_state().await? else {
        return Ok(());
    };
    let catalog = common::create_catalog(&state).await?;
    let mouse = common::create_product(&state, &catalog, "Mouse", 2_000, 10).await?;
    let keyboard = common::create_product(&state, &catalog, "Keyboard", 6_000, 10).await?;
    let scarce = common::create_product(&state, &catalog, "Scarce Monitor", 30_000, 1).await?;

    let session_id = common::unique("session");
    let guest = CartOwner::Guest(session_id.clone());
    cart_service::add_item(
        &state,
        &guest,
        AddToCartRequest {
            product_id: mouse.id,
            quantity: 2,
        },
    )
    .await?;

    let user = common::create_user(&state).await?;
    let synced = cart_service::sync_cart(
        &state,
        &user,
        Some(session_id.clone()),
        SyncCartRequest {
            items: vec![
                AddToCartRequest {
                    product_id: keyboard.id,
                    quantity: 1,
                },
                AddToCartRequest {
                    product_id: scarce.id,
                    quantity: 5,
                },
            ],
        },
    )
    .await;
    assert!(matches!(synced, Err(AppError::BadRequest(_))));

    let owner = CartOwner::User(user.user_id);
    let user_cart = cart_service::get_cart(&state, &owner).await?.data.unwrap();
    assert!(user_cart.items.iter().all(|i| i.product_id != keyboard.id));
    assert_eq!(user_cart.item_count, 0);

    let guest_cart = cart_service::get_cart(&state, &guest).await?.data.unwrap();
    assert_eq!(guest_cart.items.len(), 1);
    assert_eq!(guest_cart.items[0].product_id, mouse.id);
    assert_eq!(guest_cart.items[0].quantity, 2);

    Ok(())
}

// Another connection creates the user's cart while sync is running; sync
// must reuse that cart instead of failing its transaction.
#[tokio::test]
async fn sync_survives_concurrent_cart_creation() -> anyhow::Result<()> {
    let Some(state) = common::setup_state().await? else {
        return Ok(());
    };
    let catalog = common::create_catalog(&state).await?;
    let lamp = common::create_product(&state, &catalog, "Desk Lamp", 3_500, 10).await?;
    let user = common::create_user(&state).await?;

    // Holds an uncommitted cart row so the sync's insert blocks on the unique index.
    let other = state.orm.begin().await?;
    let now = Utc::now().fixed_offset();
    let rival = carts::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(Some(user.user_id)),
        session_id: Set(None),
        expires_at: Set(now + chrono::Duration::days(cart_service::CART_TTL_DAYS)),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&other)
    .await?;

    let lamp_id = lamp.id;
    let sync_state = state.clone();
    let sync_user = user.clone();
    let sync = tokio::spawn(async move {
        cart_service::sync_cart(
            &sync_state,
            &sync_user,
            None,
            SyncCartRequest {
                items: vec![AddToCartRequest {
                    product_id: lamp_id,
                    quantity: 2,
                }],
            },
        )
        .await
    });

    tokio::time::sleep(Duration::from_millis(300)).await;
    other.commit().await?;

    let cart = sync.await??.data.unwrap();
    assert_eq!(cart.id, rival.id);
    assert_eq!(cart.item_count, 2);
    assert_eq!(cart.items[0].product_id, lamp_id);

    Ok(())
}

// A product hidden after it was added can still have its cart line edited.
#[tokio::test]
async fn hidden_product_line_can_still_be_updated() -> anyhow::Result<()> {
    let Some(state) = common::setup_state().await? else {
        return Ok(());
    };
    let catalog = common::create_catalog(&state).await?;
    let speaker = common::create_product(&state, &catalog, "Speaker", 12_000, 5).await?;
    let user = common::create_user(&state).await?;
    let owner = CartOwner::User(user.user_id);

    let item = cart_service::add_item(
        &state,
        &owner,
        AddToCartRequest {
            product_id: speaker.id,
            quantity: 1,
        },
    )
    .await?
    .data
    .unwrap();

    let mut hidden = speaker.into_active_model();
    hidden.is_active = Set(false);
    hidden.update(&state.orm).await?;

    let updated = cart_service::update_item(
        &state,
        &owner,
        item.id,
        UpdateCartItemRequest { quantity: 3 },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(updated.quantity, 3);

    // Stock is still enforced on the hidden product.
    let too_many = cart_service::update_item(
        &state,
        &owner,
        item.id,
        UpdateCartItemRequest { quantity: 6 },
    )
    .await;
    assert!(matches!(too_many, Err(AppError::BadRequest(_))));

    Ok(())
}
