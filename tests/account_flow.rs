mod common;

use sea_orm::EntityTrait;
use serde_json::json;
use shopmart_api::{
    dto::users::{AddressRequest, PaymentMethodRequest, UpdateProfileRequest},
    entity::Users,
    error::AppError,
    middleware::auth::AuthUser,
    services::{address_service, payment_method_service, user_service},
    state::AppState,
};

fn address(line1: &str, is_default: bool) -> AddressRequest {
    AddressRequest {
        address_type: "HOME".into(),
        first_name: "Grace".into(),
        last_name: "Hopper".into(),
        company: None,
        address_line1: line1.into(),
        address_line2: None,
        city: "Arlington".into(),
        state: "VA".into(),
        postal_code: "22201".into(),
        country: "US".into(),
        phone: None,
        is_default,
    }
}

async fn default_addresses(state: &AppState, user: &AuthUser) -> anyhow::Result<usize> {
    let list = address_service::list_addresses(state, user).await?.data.unwrap();
    Ok(list.items.iter().filter(|a| a.is_default).count())
}

#[tokio::test]
async fn only_one_default_address_per_user() -> anyhow::Result<()> {
    let Some(state) = common::setup_state().await? else {
        return Ok(());
    };
    let user = common::create_user(&state).await?;

    let first = address_service::create_address(&state, &user, address("1 First Street", true))
        .await?
        .data
        .unwrap();
    let second = address_service::create_address(&state, &user, address("2 Second Street", true))
        .await?
        .data
        .unwrap();
    assert_eq!(default_addresses(&state, &user).await?, 1);

    // Default first in the listing.
    let list = address_service::list_addresses(&state, &user).await?.data.unwrap();
    assert_eq!(list.items[0].id, second.id);

    address_service::set_default_address(&state, &user, first.id).await?;
    assert_eq!(default_addresses(&state, &user).await?, 1);
    let list = address_service::list_addresses(&state, &user).await?.data.unwrap();
    assert_eq!(list.items[0].id, first.id);

    let invalid = address_service::create_address(&state, &user, address("x", false)).await;
    assert!(matches!(invalid, Err(AppError::Validation(_))));

    // Someone else's address is not found.
    let other = common::create_user(&state).await?;
    let foreign = address_service::delete_address(&state, &other, first.id).await;
    assert!(matches!(foreign, Err(AppError::NotFound(_))));

    address_service::delete_address(&state, &user, first.id).await?;
    assert_eq!(default_addresses(&state, &user).await?, 0);
    Ok(())
}

#[tokio::test]
async fn payment_methods_keep_a_single_default() -> anyhow::Result<()> {
    let Some(state) = common::setup_state().await? else {
        return Ok(());
    };
    let user = common::create_user(&state).await?;
    let card = |last4: &str, is_default: bool| PaymentMethodRequest {
        method_type: "CREDIT_CARD".into(),
        stripe_payment_method_id: Some(format!("pm_{last4}")),
        last4: Some(last4.into()),
        brand: Some("visa".into()),
        expiry_month: Some(12),
        expiry_year: Some(2030),
        is_default,
    };

    let visa = payment_method_service::create_payment_method(&state, &user, card("4242", true))
        .await?
        .data
        .unwrap();
    let amex = payment_method_service::create_payment_method(&state, &user, card("0005", false))
        .await?
        .data
        .unwrap();

    payment_method_service::set_default_payment_method(&state, &user, amex.id).await?;
    let list = payment_method_service::list_payment_methods(&state, &user)
        .await?
        .data
        .unwrap();
    let defaults: Vec<_> = list.items.iter().filter(|m| m.is_default).collect();
    assert_eq!(defaults.len(), 1);
    assert_eq!(defaults[0].id, amex.id);

    payment_method_service::delete_payment_method(&state, &user, visa.id).await?;
    let missing = payment_method_service::delete_payment_method(&state, &user, visa.id).await;
    assert!(matches!(missing, Err(AppError::NotFound(_))));
    Ok(())
}

#[tokio::test]
async fn profile_preferences_and_account_deletion() -> anyhow::Result<()> {
    let Some(state) = common::setup_state().await? else {
        return Ok(());
    };
    let user = common::create_user(&state).await?;

    let updated = user_service::update_profile(
        &state,
        &user,
        UpdateProfileRequest {
            first_name: Some("Katherine".into()),
            gender: Some("FEMALE".into()),
            ..Default::default()
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(updated.first_name, "Katherine");
    assert_eq!(updated.last_name, "User");

    let bad_gender = user_service::update_profile(
        &state,
        &user,
        UpdateProfileRequest {
            gender: Some("UNKNOWN".into()),
            ..Default::default()
        },
    )
    .await;
    assert!(matches!(bad_gender, Err(AppError::Validation(_))));

    let first = json!({ "theme": "dark", "newsletter": true });
    user_service::update_preferences(&state, &user, first.as_object().cloned().unwrap()).await?;
    let second = json!({ "currency": "EUR" });
    let merged = user_service::update_preferences(&state, &user, second.as_object().cloned().unwrap())
        .await?
        .data
        .unwrap();
    assert_eq!(merged, json!({ "theme": "dark", "newsletter": true, "currency": "EUR" }));

    let invalid = json!({ "theme": "neon" });
    let rejected =
        user_service::update_preferences(&state, &user, invalid.as_object().cloned().unwrap()).await;
    assert!(matches!(rejected, Err(AppError::Validation(_))));

    user_service::delete_account(&state, &user).await?;
    assert!(Users::find_by_id(user.user_id).one(&state.orm).await?.is_none());
    Ok(())
}
