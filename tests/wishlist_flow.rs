mod common;

use shopmart_api::{
    dto::wishlist::AddWishlistItemRequest,
    error::AppError,
    middleware::auth::CartOwner,
    services::{cart_service, wishlist_service},
};

#[tokio::test]
async fn wishlist_add_check_and_move_to_cart() -> anyhow::Result<()> {
    let Some(state) = common::setup_state().await? else {
        return Ok(());
    };
    let catalog = common::create_catalog(&state).await?;
    let lamp = common::create_product(&state, &catalog, "Desk Lamp", 3_999, 4).await?;
    let chair = common::create_product(&state, &catalog, "Chair", 12_999, 0).await?;
    let user = common::create_user(&state).await?;

    let item = wishlist_service::add_item(
        &state,
        &user,
        AddWishlistItemRequest { product_id: lamp.id },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(item.product.as_ref().map(|p| p.price), Some(3_999));

    let duplicate = wishlist_service::add_item(
        &state,
        &user,
        AddWishlistItemRequest { product_id: lamp.id },
    )
    .await;
    assert!(matches!(duplicate, Err(AppError::Conflict(_))));

    let status = wishlist_service::check_product(&state, &user, lamp.id)
        .await?
        .data
        .unwrap();
    assert!(status.is_in_wishlist);

    // Out-of-stock products can be wished for but not moved to the cart.
    let chair_item = wishlist_service::add_item(
        &state,
        &user,
        AddWishlistItemRequest {
            product_id: chair.id,
        },
    )
    .await?
    .data
    .unwrap();
    let blocked = wishlist_service::move_to_cart(&state, &user, chair_item.id).await;
    assert!(matches!(blocked, Err(AppError::BadRequest(_))));

    wishlist_service::move_to_cart(&state, &user, item.id).await?;
    let cart = cart_service::get_cart(&state, &CartOwner::User(user.user_id))
        .await?
        .data
        .unwrap();
    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.items[0].product_id, lamp.id);
    assert_eq!(cart.items[0].quantity, 1);

    let wishlist = wishlist_service::get_wishlist(&state, &user).await?.data.unwrap();
    assert_eq!(wishlist.items.len(), 1);
    assert_eq!(wishlist.items[0].product_id, chair.id);

    wishlist_service::remove_by_product(&state, &user, chair.id).await?;
    let missing = wishlist_service::remove_by_product(&state, &user, chair.id).await;
    assert!(matches!(missing, Err(AppError::NotFound(_))));

    let status = wishlist_service::check_product(&state, &user, chair.id)
        .await?
        .data
        .unwrap();
    assert!(!status.is_in_wishlist);

    wishlist_service::clear_wishlist(&state, &user).await?;
    Ok(())
}

#[tokio::test]
async fn wishlist_items_belong_to_their_owner() -> anyhow::Result<()> {
    let Some(state) = common::setup_state().await? else {
        return Ok(());
    };
    let catalog = common::create_catalog(&state).await?;
    let product = common::create_product(&state, &catalog, "Backpack", 5_999, 10).await?;
    let owner = common::create_user(&state).await?;
    let other = common::create_user(&state).await?;

    let item = wishlist_service::add_item(
        &state,
        &owner,
        AddWishlistItemRequest {
            product_id: product.id,
        },
    )
    .await?
    .data
    .unwrap();

    let foreign = wishlist_service::remove_item(&state, &other, item.id).await;
    assert!(matches!(foreign, Err(AppError::NotFound(_))));

    let no_wishlist = wishlist_service::clear_wishlist(&state, &other).await;
    assert!(matches!(no_wishlist, Err(AppError::NotFound(_))));

    wishlist_service::remove_item(&state, &owner, item.id).await?;
    Ok(())
}
