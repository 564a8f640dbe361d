use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use sea_orm::EntityTrait;
use uuid::Uuid;

use crate::{
    entity::Users,
    error::AppError,
    services::token_service::{subject, verify_access_token},
    state::AppState,
};

pub const SESSION_HEADER: &str = "x-session-id";

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub email: String,
}

fn bearer_token(parts: &Parts) -> Result<Option<&str>, AppError> {
    let Some(auth_header) = parts.headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };

    let auth_str = auth_header
        .to_str()
        .map_err(|_| AppError::Unauthorized("Invalid Authorization header".into()))?;

    let token = auth_str
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Unauthorized("Invalid Authorization scheme".into()))?
        .trim();

    Ok(Some(token).filter(|t| !t.is_empty()))
}

async fn authenticate(parts: &Parts, state: &AppState) -> Result<AuthUser, AppError> {
    let token = bearer_token(parts)?
        .ok_or_else(|| AppError::Unauthorized("Access token is required".into()))?;

    let claims = verify_access_token(&state.config, token)?;
    let user_id = subject(&claims)?;

    let user = Users::find_by_id(user_id).one(&state.orm).await?;
    let user = user.ok_or_else(|| AppError::Unauthorized("User not found".into()))?;

    Ok(AuthUser {
        user_id: user.id,
        email: user.email,
    })
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        authenticate(parts, state).await
    }
}

/// Authenticated user when a valid token is sent; anonymous otherwise.
#[derive(Debug, Clone)]
pub struct MaybeAuthUser(pub Option<AuthUser>);

impl FromRequestParts<AppState> for MaybeAuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match authenticate(parts, state).await {
            Ok(user) => Ok(MaybeAuthUser(Some(user))),
            Err(AppError::Unauthorized(_)) => Ok(MaybeAuthUser(None)),
            Err(err) => Err(err),
        }
    }
}

/// Guest session id from the `x-session-id` header.
#[derive(Debug, Clone)]
pub struct GuestSession(pub Option<String>);

impl<S> FromRequestParts<S> for GuestSession
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = parts
            .headers
            .get(SESSION_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string);
        Ok(GuestSession(session))
    }
}

/// Whose cart a request operates on: the signed-in user, else the guest session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartOwner {
    User(Uuid),
    Guest(String),
}

impl CartOwner {
    pub fn resolve(user: Option<&AuthUser>, session: Option<String>) -> Result<Self, AppError> {
        match (user, session) {
            (Some(user), _) => Ok(CartOwner::User(user.user_id)),
            (None, Some(session)) => Ok(CartOwner::Guest(session)),
            (None, None) => Err(AppError::BadRequest(
                "User ID or session ID is required".into(),
            )),
        }
    }
}

impl FromRequestParts<AppState> for CartOwner {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let MaybeAuthUser(user) = MaybeAuthUser::from_request_parts(parts, state).await?;
        let GuestSession(session) = GuestSession::from_request_parts(parts, state).await?;
        CartOwner::resolve(user.as_ref(), session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_in_user_wins_over_session() {
        let user = AuthUser {
            user_id: Uuid::new_v4(),
            email: "a@b.io".into(),
        };
        let owner = CartOwner::resolve(Some(&user), Some("guest-1".into())).unwrap();
        assert_eq!(owner, CartOwner::User(user.user_id));
    }

    #[test]
    fn session_used_for_guests() {
        let owner = CartOwner::resolve(None, Some("guest-1".into())).unwrap();
        assert_eq!(owner, CartOwner::Guest("guest-1".into()));
    }

    #[test]
    fn anonymous_without_session_is_rejected() {
        assert!(matches!(
            CartOwner::resolve(None, None),
            Err(AppError::BadRequest(_))
        ));
    }
}
