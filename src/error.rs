use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::{DbErr, SqlErr};
use serde::Serialize;
use thiserror::Error;

use crate::{
    response::{ApiResponse, Meta},
    validation::FieldError,
};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("Validation failed")]
    Validation(Vec<FieldError>),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Database error")]
    DbError(#[from] sqlx::Error),

    #[error("ORM error")]
    OrmError(#[from] DbErr),

    #[error("Internal Server Error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn not_found(what: &str) -> Self {
        AppError::NotFound(format!("{what} not found"))
    }
}

#[derive(Serialize)]
struct ErrorData {
    error: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    fields: Vec<FieldError>,
}

fn classify_orm(err: &DbErr) -> (StatusCode, String) {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => (
            StatusCode::CONFLICT,
            "A record with this information already exists".into(),
        ),
        Some(SqlErr::ForeignKeyConstraintViolation(_)) => (
            StatusCode::BAD_REQUEST,
            "Invalid reference to related record".into(),
        ),
        _ => match err {
            DbErr::RecordNotFound(_) | DbErr::RecordNotUpdated => {
                (StatusCode::NOT_FOUND, "Record not found".into())
            }
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "ORM error".into()),
        },
    }
}

fn classify_sqlx(err: &sqlx::Error) -> (StatusCode, String) {
    match err {
        sqlx::Error::RowNotFound => (StatusCode::NOT_FOUND, "Record not found".into()),
        sqlx::Error::Database(db) if db.is_unique_violation() => (
            StatusCode::CONFLICT,
            "A record with this information already exists".into(),
        ),
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => (
            StatusCode::BAD_REQUEST,
            "Invalid reference to related record".into(),
        ),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "Database error".into()),
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            AppError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, self.to_string()),
            AppError::Conflict(_) => (StatusCode::CONFLICT, self.to_string()),
            AppError::DbError(err) => classify_sqlx(err),
            AppError::OrmError(err) => classify_orm(err),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
        };

        if status.is_server_error() {
            match &self {
                AppError::DbError(err) => tracing::error!(error = %err, "database error"),
                AppError::OrmError(err) => tracing::error!(error = %err, "orm error"),
                AppError::Internal(err) => tracing::error!(error = ?err, "internal error"),
                _ => tracing::error!(error = %self, "request failed"),
            }
        }

        let fields = match self {
            AppError::Validation(fields) => fields,
            _ => Vec::new(),
        };

        let body = ApiResponse {
            message: message.clone(),
            data: Some(ErrorData {
                error: message,
                fields,
            }),
            meta: Some(Meta::empty()),
        };

        (status, axum::Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        let cases = [
            (AppError::not_found("Cart item"), StatusCode::NOT_FOUND),
            (AppError::BadRequest("bad".into()), StatusCode::BAD_REQUEST),
            (AppError::Validation(vec![]), StatusCode::BAD_REQUEST),
            (AppError::Unauthorized("no".into()), StatusCode::UNAUTHORIZED),
            (AppError::Conflict("dup".into()), StatusCode::CONFLICT),
            (
                AppError::DbError(sqlx::Error::RowNotFound),
                StatusCode::NOT_FOUND,
            ),
            (
                AppError::OrmError(DbErr::RecordNotFound("x".into())),
                StatusCode::NOT_FOUND,
            ),
            (
                AppError::Internal(anyhow::anyhow!("boom")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }

    #[test]
    fn not_found_message() {
        assert_eq!(
            AppError::not_found("Wishlist item").to_string(),
            "Wishlist item not found"
        );
    }
}
