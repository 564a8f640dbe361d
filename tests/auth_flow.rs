mod common;

use sea_orm::EntityTrait;
use shopmart_api::{
    dto::auth::{EmailRequest, LoginRequest, RefreshRequest, RegisterRequest, ResetPasswordRequest},
    entity::Users,
    error::AppError,
    middleware::auth::AuthUser,
    services::{auth_service, token_service},
};

// Register -> verify -> login -> refresh rotation -> logout revokes the refresh token.
#[tokio::test]
async fn register_login_refresh_and_logout_flow() -> anyhow::Result<()> {
    let Some(state) = common::setup_state().await? else {
        return Ok(());
    };
    let email = common::unique_email();

    let registered = auth_service::register(
        &state,
        RegisterRequest {
            email: email.to_uppercase(),
            password: common::PASSWORD.into(),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            phone: None,
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(registered.user.email, email);
    assert!(!registered.user.is_verified);
    assert_eq!(registered.tokens.token_type, "Bearer");

    let claims = token_service::verify_access_token(&state.config, &registered.tokens.access_token)?;
    assert_eq!(token_service::subject(&claims)?, registered.user.id);

    // Duplicate email is a conflict.
    let duplicate = auth_service::register(
        &state,
        RegisterRequest {
            email: email.clone(),
            password: common::PASSWORD.into(),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            phone: None,
        },
    )
    .await;
    assert!(matches!(duplicate, Err(AppError::Conflict(_))));

    // Verify email with the stored token.
    let stored = Users::find_by_id(registered.user.id).one(&state.orm).await?.unwrap();
    let token = stored.verification_token.clone().unwrap();
    auth_service::verify_email(&state, &token).await?;
    assert!(matches!(
        auth_service::verify_email(&state, &token).await,
        Err(AppError::BadRequest(_))
    ));
    assert!(matches!(
        auth_service::resend_verification(&state, EmailRequest { email: email.clone() }).await,
        Err(AppError::BadRequest(_))
    ));

    // Wrong password and unknown email look the same.
    let wrong = auth_service::login(
        &state,
        LoginRequest {
            email: email.clone(),
            password: "Wrong1234".into(),
        },
    )
    .await;
    let unknown = auth_service::login(
        &state,
        LoginRequest {
            email: common::unique_email(),
            password: common::PASSWORD.into(),
        },
    )
    .await;
    match (wrong, unknown) {
        (Err(AppError::Unauthorized(a)), Err(AppError::Unauthorized(b))) => assert_eq!(a, b),
        other => panic!("expected two unauthorized errors, got {other:?}"),
    }

    let session = auth_service::login(
        &state,
        LoginRequest {
            email: email.clone(),
            password: common::PASSWORD.into(),
        },
    )
    .await?
    .data
    .unwrap();
    assert!(session.user.is_verified);
    assert!(session.user.last_login_at.is_some());

    // Rotation: the new refresh token works once, the old one is rejected.
    let rotated = auth_service::refresh(
        &state,
        RefreshRequest {
            refresh_token: session.tokens.refresh_token.clone(),
        },
    )
    .await?
    .data
    .unwrap();
    let reused = auth_service::refresh(
        &state,
        RefreshRequest {
            refresh_token: session.tokens.refresh_token.clone(),
        },
    )
    .await;
    assert!(matches!(reused, Err(AppError::Unauthorized(_))));

    // An access token is not accepted as a refresh token.
    let wrong_kind = auth_service::refresh(
        &state,
        RefreshRequest {
            refresh_token: rotated.access_token.clone(),
        },
    )
    .await;
    assert!(matches!(wrong_kind, Err(AppError::Unauthorized(_))));

    let user = AuthUser {
        user_id: session.user.id,
        email: session.user.email.clone(),
    };
    auth_service::logout(&state, &user).await?;
    let after_logout = auth_service::refresh(
        &state,
        RefreshRequest {
            refresh_token: rotated.refresh_token,
        },
    )
    .await;
    assert!(matches!(after_logout, Err(AppError::Unauthorized(_))));

    Ok(())
}

#[tokio::test]
async fn password_reset_flow() -> anyhow::Result<()> {
    let Some(state) = common::setup_state().await? else {
        return Ok(());
    };
    let user = common::create_user(&state).await?;

    // Unknown emails get the same answer.
    let unknown = auth_service::forgot_password(
        &state,
        EmailRequest {
            email: common::unique_email(),
        },
    )
    .await?;
    let known = auth_service::forgot_password(
        &state,
        EmailRequest {
            email: user.email.clone(),
        },
    )
    .await?;
    assert_eq!(unknown.message, known.message);

    let stored = Users::find_by_id(user.user_id).one(&state.orm).await?.unwrap();
    let token = stored.reset_password_token.clone().unwrap();
    assert!(stored.reset_password_expires.is_some());

    let bad = auth_service::reset_password(
        &state,
        ResetPasswordRequest {
            token: "not-a-token".into(),
            password: "NewPassw0rd".into(),
        },
    )
    .await;
    assert!(matches!(bad, Err(AppError::BadRequest(_))));

    auth_service::reset_password(
        &state,
        ResetPasswordRequest {
            token: token.clone(),
            password: "NewPassw0rd".into(),
        },
    )
    .await?;

    // The token is single use.
    let again = auth_service::reset_password(
        &state,
        ResetPasswordRequest {
            token,
            password: "NewPassw0rd".into(),
        },
    )
    .await;
    assert!(matches!(again, Err(AppError::BadRequest(_))));

    let old = auth_service::login(
        &state,
        LoginRequest {
            email: user.email.clone(),
            password: common::PASSWORD.into(),
        },
    )
    .await;
    assert!(matches!(old, Err(AppError::Unauthorized(_))));
    auth_service::login(
        &state,
        LoginRequest {
            email: user.email,
            password: "NewPassw0rd".into(),
        },
    )
    .await?;

    Ok(())
}
