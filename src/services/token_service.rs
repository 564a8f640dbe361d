use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

use crate::{
    config::AppConfig,
    dto::auth::{AuthTokens, Claims, TokenKind},
    error::{AppError, AppResult},
};

/// A freshly signed access/refresh pair plus the refresh token id to persist.
pub struct IssuedTokens {
    pub tokens: AuthTokens,
    pub refresh_id: Uuid,
}

pub fn issue_tokens(config: &AppConfig, user_id: Uuid, email: &str) -> AppResult<IssuedTokens> {
    let now = Utc::now();
    let access_ttl = Duration::minutes(config.access_token_ttl_minutes);
    let refresh_ttl = Duration::days(config.refresh_token_ttl_days);
    let refresh_id = Uuid::new_v4();

    let access = Claims {
        sub: user_id.to_string(),
        email: email.to_string(),
        typ: TokenKind::Access,
        jti: None,
        iat: now.timestamp() as usize,
        exp: (now + access_ttl).timestamp() as usize,
    };
    let refresh = Claims {
        sub: user_id.to_string(),
        email: email.to_string(),
        typ: TokenKind::Refresh,
        jti: Some(refresh_id.to_string()),
        iat: now.timestamp() as usize,
        exp: (now + refresh_ttl).timestamp() as usize,
    };

    let access_token = sign(&access, &config.jwt_secret)?;
    let refresh_token = sign(&refresh, &config.jwt_refresh_secret)?;

    Ok(IssuedTokens {
        tokens: AuthTokens {
            access_token,
            refresh_token,
            token_type: "Bearer".into(),
            expires_in: access_ttl.num_seconds(),
        },
        refresh_id,
    })
}

fn sign(claims: &Claims, secret: &str) -> AppResult<String> {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
}

fn verify(token: &str, secret: &str, kind: TokenKind) -> AppResult<Claims> {
    let decoded = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::Unauthorized("Invalid or expired token".into()))?;

    if decoded.claims.typ != kind {
        return Err(AppError::Unauthorized("Invalid or expired token".into()));
    }
    Ok(decoded.claims)
}

pub fn verify_access_token(config: &AppConfig, token: &str) -> AppResult<Claims> {
    verify(token, &config.jwt_secret, TokenKind::Access)
}

pub fn verify_refresh_token(config: &AppConfig, token: &str) -> AppResult<Claims> {
    verify(token, &config.jwt_refresh_secret, TokenKind::Refresh)
}

pub fn subject(claims: &Claims) -> AppResult<Uuid> {
    Uuid::parse_str(&claims.sub)
        .map_err(|_| AppError::Unauthorized("Invalid user id in token".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AppConfig {
        AppConfig {
            database_url: String::new(),
            host: "127.0.0.1".into(),
            port: 0,
            jwt_secret: "access-secret".into(),
            jwt_refresh_secret: "refresh-secret".into(),
            access_token_ttl_minutes: 15,
            refresh_token_ttl_days: 7,
            frontend_url: "http://localhost:3000".into(),
        }
    }

    #[test]
    fn issued_pair_verifies_with_matching_secret() {
        let config = config();
        let user_id = Uuid::new_v4();
        let issued = issue_tokens(&config, user_id, "test@shopmart.com").unwrap();

        let access = verify_access_token(&config, &issued.tokens.access_token).unwrap();
        assert_eq!(subject(&access).unwrap(), user_id);
        assert_eq!(access.email, "test@shopmart.com");
        assert_eq!(issued.tokens.expires_in, 15 * 60);

        let refresh = verify_refresh_token(&config, &issued.tokens.refresh_token).unwrap();
        assert_eq!(refresh.jti, Some(issued.refresh_id.to_string()));
    }

    #[test]
    fn tokens_are_not_interchangeable() {
        let config = config();
        let issued = issue_tokens(&config, Uuid::new_v4(), "a@b.io").unwrap();

        assert!(verify_access_token(&config, &issued.tokens.refresh_token).is_err());
        assert!(verify_refresh_token(&config, &issued.tokens.access_token).is_err());
    }

    #[test]
    fn tampered_token_is_rejected() {
        let config = config();
        let issued = issue_tokens(&config, Uuid::new_v4(), "a@b.io").unwrap();
        let mut token = issued.tokens.access_token;
        token.push('x');
        assert!(matches!(
            verify_access_token(&config, &token),
            Err(AppError::Unauthorized(_))
        ));
    }
}
