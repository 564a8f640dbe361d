use argon2::{
    Argon2, PasswordHasher,
    password_hash::{PasswordHash, PasswordVerifier, SaltString},
};
use chrono::{Duration, Utc};
use password_hash::rand_core::{OsRng, RngCore};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::{
    audit,
    dto::auth::{
        AuthSession, AuthTokens, EmailRequest, LoginRequest, RefreshRequest, RegisterRequest,
        ResetPasswordRequest,
    },
    entity::{Users, users},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::User,
    response::{ApiResponse, Meta},
    services::token_service::{issue_tokens, subject, verify_refresh_token},
    state::AppState,
    validation::{Validator, is_strong_password, normalize_email},
};

const RESET_TOKEN_TTL_MINUTES: i64 = 10;
const PASSWORD_RULE: &str =
    "Password must be at least 8 characters long and contain a letter and a number";

pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
}

fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("Invalid password hash")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// 32 random bytes, hex encoded.
fn random_token() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

async fn find_by_email(state: &AppState, email: &str) -> AppResult<Option<users::Model>> {
    let user = Users::find()
        .filter(users::Column::Email.eq(email))
        .one(&state.orm)
        .await?;
    Ok(user)
}

/// Signs a token pair and stores the refresh token id on the user.
async fn start_session(
    state: &AppState,
    user: users::Model,
    touch_login: bool,
) -> AppResult<(users::Model, AuthTokens)> {
    let issued = issue_tokens(&state.config, user.id, &user.email)?;
    let now = Utc::now().fixed_offset();

    let mut active: users::ActiveModel = user.into();
    active.refresh_token_id = Set(Some(issued.refresh_id));
    if touch_login {
        active.last_login_at = Set(Some(now));
    }
    active.updated_at = Set(now);
    let user = active.update(&state.orm).await?;

    Ok((user, issued.tokens))
}

pub async fn register(
    state: &AppState,
    payload: RegisterRequest,
) -> AppResult<ApiResponse<AuthSession>> {
    let email = normalize_email(&payload.email);

    let mut v = Validator::new();
    v.email("email", &email);
    v.check(is_strong_password(&payload.password), "password", PASSWORD_RULE);
    v.length(
        "first_name",
        &payload.first_name,
        2,
        50,
        "First name must be between 2 and 50 characters",
    );
    v.length(
        "last_name",
        &payload.last_name,
        2,
        50,
        "Last name must be between 2 and 50 characters",
    );
    v.phone("phone", payload.phone.as_deref());
    v.finish()?;

    if find_by_email(state, &email).await?.is_some() {
        return Err(AppError::Conflict(
            "User with this email already exists".into(),
        ));
    }

    let password_hash = hash_password(&payload.password)?;
    let now = Utc::now().fixed_offset();

    let user = users::ActiveModel {
        id: Set(Uuid::new_v4()),
        email: Set(email),
        password_hash: Set(password_hash),
        first_name: Set(payload.first_name.trim().to_string()),
        last_name: Set(payload.last_name.trim().to_string()),
        phone: Set(payload.phone),
        is_verified: Set(false),
        verification_token: Set(Some(random_token())),
        preferences: Set(json!({})),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&state.orm)
    .await?;

    let (user, tokens) = start_session(state, user, false).await?;

    audit::record(
        &state.pool,
        Some(user.id),
        "user_register",
        "users",
        json!({ "user_id": user.id }),
    )
    .await;
    tracing::info!(user_id = %user.id, "user registered");

    Ok(ApiResponse::success(
        "User registered successfully",
        AuthSession {
            user: User::from(user),
            tokens,
        },
        None,
    ))
}

pub async fn login(state: &AppState, payload: LoginRequest) -> AppResult<ApiResponse<AuthSession>> {
    let email = normalize_email(&payload.email);
    let invalid = || AppError::Unauthorized("Invalid email or password".into());

    let user = find_by_email(state, &email).await?.ok_or_else(invalid)?;
    if !verify_password(&payload.password, &user.password_hash)? {
        return Err(invalid());
    }

    let (user, tokens) = start_session(state, user, true).await?;

    audit::record(
        &state.pool,
        Some(user.id),
        "user_login",
        "users",
        json!({ "user_id": user.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Login successful",
        AuthSession {
            user: User::from(user),
            tokens,
        },
        Some(Meta::empty()),
    ))
}

pub async fn logout(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<Value>> {
    let found = Users::find_by_id(user.user_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("User"))?;

    let mut active: users::ActiveModel = found.into();
    active.refresh_token_id = Set(None);
    active.update(&state.orm).await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "user_logout",
        "users",
        json!({ "user_id": user.user_id }),
    )
    .await;

    Ok(ApiResponse::message("Logout successful"))
}

pub async fn refresh(
    state: &AppState,
    payload: RefreshRequest,
) -> AppResult<ApiResponse<AuthTokens>> {
    let invalid = || AppError::Unauthorized("Invalid refresh token".into());

    let claims = verify_refresh_token(&state.config, &payload.refresh_token)?;
    let user_id = subject(&claims)?;
    let jti = claims
        .jti
        .as_deref()
        .and_then(|jti| Uuid::parse_str(jti).ok())
        .ok_or_else(invalid)?;

    let user = Users::find_by_id(user_id)
        .one(&state.orm)
        .await?
        .ok_or_else(invalid)?;

    if user.refresh_token_id != Some(jti) {
        tracing::warn!(user_id = %user.id, "refresh token reuse or revoked token");
        return Err(invalid());
    }

    let (_, tokens) = start_session(state, user, false).await?;

    Ok(ApiResponse::success(
        "Token refreshed successfully",
        tokens,
        Some(Meta::empty()),
    ))
}

pub async fn forgot_password(
    state: &AppState,
    payload: EmailRequest,
) -> AppResult<ApiResponse<Value>> {
    let email = normalize_email(&payload.email);
    let mut v = Validator::new();
    v.email("email", &email);
    v.finish()?;

    if let Some(user) = find_by_email(state, &email).await? {
        let expires = Utc::now() + Duration::minutes(RESET_TOKEN_TTL_MINUTES);
        let user_id = user.id;

        let mut active: users::ActiveModel = user.into();
        active.reset_password_token = Set(Some(random_token()));
        active.reset_password_expires = Set(Some(expires.fixed_offset()));
        active.update(&state.orm).await?;

        audit::record(
            &state.pool,
            Some(user_id),
            "password_reset_requested",
            "users",
            json!({ "user_id": user_id }),
        )
        .await;
    }

    Ok(ApiResponse::message(
        "If an account with that email exists, a password reset link has been sent",
    ))
}

pub async fn reset_password(
    state: &AppState,
    payload: ResetPasswordRequest,
) -> AppResult<ApiResponse<Value>> {
    let mut v = Validator::new();
    v.check(!payload.token.trim().is_empty(), "token", "Reset token is required");
    v.check(is_strong_password(&payload.password), "password", PASSWORD_RULE);
    v.finish()?;

    let now = Utc::now().fixed_offset();
    let user = Users::find()
        .filter(users::Column::ResetPasswordToken.eq(payload.token.trim()))
        .filter(users::Column::ResetPasswordExpires.gt(now))
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::BadRequest("Invalid or expired reset token".into()))?;

    let user_id = user.id;
    let password_hash = hash_password(&payload.password)?;

    let mut active: users::ActiveModel = user.into();
    active.password_hash = Set(password_hash);
    active.reset_password_token = Set(None);
    active.reset_password_expires = Set(None);
    active.refresh_token_id = Set(None);
    active.updated_at = Set(now);
    active.update(&state.orm).await?;

    audit::record(
        &state.pool,
        Some(user_id),
        "password_reset",
        "users",
        json!({ "user_id": user_id }),
    )
    .await;

    Ok(ApiResponse::message("Password reset successfully"))
}

pub async fn verify_email(state: &AppState, token: &str) -> AppResult<ApiResponse<Value>> {
    let user = Users::find()
        .filter(users::Column::VerificationToken.eq(token))
        .filter(users::Column::IsVerified.eq(false))
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::BadRequest("Invalid verification token".into()))?;

    let user_id = user.id;
    let mut active: users::ActiveModel = user.into();
    active.is_verified = Set(true);
    active.verification_token = Set(None);
    active.updated_at = Set(Utc::now().fixed_offset());
    active.update(&state.orm).await?;

    audit::record(
        &state.pool,
        Some(user_id),
        "email_verified",
        "users",
        json!({ "user_id": user_id }),
    )
    .await;

    Ok(ApiResponse::message("Email verified successfully"))
}

pub async fn resend_verification(
    state: &AppState,
    payload: EmailRequest,
) -> AppResult<ApiResponse<Value>> {
    let email = normalize_email(&payload.email);
    let user = find_by_email(state, &email)
        .await?
        .ok_or_else(|| AppError::not_found("User"))?;

    if user.is_verified {
        return Err(AppError::BadRequest("Email is already verified".into()));
    }

    let mut active: users::ActiveModel = user.into();
    active.verification_token = Set(Some(random_token()));
    active.update(&state.orm).await?;

    Ok(ApiResponse::message("Verification email sent"))
}
