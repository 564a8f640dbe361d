use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, ModelTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait, sea_query::Expr,
};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::{
    audit,
    dto::users::{PaymentMethodList, PaymentMethodRequest},
    entity::{PaymentMethods, payment_methods},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::PaymentMethod,
    response::{ApiResponse, Meta},
    state::AppState,
    validation::Validator,
};

const METHOD_TYPES: &[&str] = &["CREDIT_CARD", "DEBIT_CARD", "PAYPAL", "BANK_TRANSFER"];

fn validate_payment_method(payload: &PaymentMethodRequest) -> AppResult<()> {
    let mut v = Validator::new();
    v.one_of(
        "type",
        &payload.method_type,
        METHOD_TYPES,
        "Payment type must be CREDIT_CARD, DEBIT_CARD, PAYPAL, or BANK_TRANSFER",
    );
    if let Some(last4) = payload.last4.as_deref() {
        v.check(
            last4.len() == 4 && last4.chars().all(|c| c.is_ascii_digit()),
            "last4",
            "last4 must be exactly 4 digits",
        );
    }
    if let Some(month) = payload.expiry_month {
        v.check(
            (1..=12).contains(&month),
            "expiry_month",
            "Expiry month must be between 1 and 12",
        );
    }
    if let Some(year) = payload.expiry_year {
        v.check(
            (2000..=2100).contains(&year),
            "expiry_year",
            "Expiry year is invalid",
        );
    }
    v.finish()
}

async fn clear_default<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
    keep: Option<Uuid>,
) -> AppResult<()> {
    let mut query = PaymentMethods::update_many()
        .col_expr(payment_methods::Column::IsDefault, Expr::value(false))
        .filter(payment_methods::Column::UserId.eq(user_id))
        .filter(payment_methods::Column::IsDefault.eq(true));
    if let Some(keep) = keep {
        query = query.filter(payment_methods::Column::Id.ne(keep));
    }
    query.exec(conn).await?;
    Ok(())
}

async fn find_owned<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
    method_id: Uuid,
) -> AppResult<payment_methods::Model> {
    PaymentMethods::find_by_id(method_id)
        .filter(payment_methods::Column::UserId.eq(user_id))
        .one(conn)
        .await?
        .ok_or_else(|| AppError::not_found("Payment method"))
}

pub async fn list_payment_methods(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<PaymentMethodList>> {
    let rows = PaymentMethods::find()
        .filter(payment_methods::Column::UserId.eq(user.user_id))
        .order_by_desc(payment_methods::Column::IsDefault)
        .order_by_desc(payment_methods::Column::CreatedAt)
        .all(&state.orm)
        .await?;

    let items = rows.into_iter().map(PaymentMethod::from).collect();
    Ok(ApiResponse::success(
        "Payment methods retrieved successfully",
        PaymentMethodList { items },
        Some(Meta::empty()),
    ))
}

pub async fn create_payment_method(
    state: &AppState,
    user: &AuthUser,
    payload: PaymentMethodRequest,
) -> AppResult<ApiResponse<PaymentMethod>> {
    validate_payment_method(&payload)?;

    let txn = state.orm.begin().await?;
    if payload.is_default {
        clear_default(&txn, user.user_id, None).await?;
    }

    let now = Utc::now().fixed_offset();
    let created = payment_methods::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.user_id),
        method_type: Set(payload.method_type),
        stripe_payment_method_id: Set(payload.stripe_payment_method_id),
        last4: Set(payload.last4),
        brand: Set(payload.brand),
        expiry_month: Set(payload.expiry_month),
        expiry_year: Set(payload.expiry_year),
        is_default: Set(payload.is_default),
        is_verified: Set(false),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&txn)
    .await?;
    txn.commit().await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "payment_method_create",
        "payment_methods",
        json!({ "payment_method_id": created.id, "type": created.method_type }),
    )
    .await;

    Ok(ApiResponse::success(
        "Payment method added successfully",
        PaymentMethod::from(created),
        None,
    ))
}

pub async fn update_payment_method(
    state: &AppState,
    user: &AuthUser,
    method_id: Uuid,
    payload: PaymentMethodRequest,
) -> AppResult<ApiResponse<PaymentMethod>> {
    validate_payment_method(&payload)?;

    let txn = state.orm.begin().await?;
    let existing = find_owned(&txn, user.user_id, method_id).await?;
    if payload.is_default {
        clear_default(&txn, user.user_id, Some(existing.id)).await?;
    }

    let mut active: payment_methods::ActiveModel = existing.into();
    active.method_type = Set(payload.method_type);
    if payload.stripe_payment_method_id.is_some() {
        active.stripe_payment_method_id = Set(payload.stripe_payment_method_id);
    }
    active.last4 = Set(payload.last4);
    active.brand = Set(payload.brand);
    active.expiry_month = Set(payload.expiry_month);
    active.expiry_year = Set(payload.expiry_year);
    active.is_default = Set(payload.is_default);
    active.updated_at = Set(Utc::now().fixed_offset());
    let updated = active.update(&txn).await?;
    txn.commit().await?;

    Ok(ApiResponse::success(
        "Payment method updated successfully",
        PaymentMethod::from(updated),
        Some(Meta::empty()),
    ))
}

pub async fn delete_payment_method(
    state: &AppState,
    user: &AuthUser,
    method_id: Uuid,
) -> AppResult<ApiResponse<Value>> {
    let existing = find_owned(&state.orm, user.user_id, method_id).await?;
    existing.delete(&state.orm).await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "payment_method_delete",
        "payment_methods",
        json!({ "payment_method_id": method_id }),
    )
    .await;

    Ok(ApiResponse::message("Payment method deleted successfully"))
}

pub async fn set_default_payment_method(
    state: &AppState,
    user: &AuthUser,
    method_id: Uuid,
) -> AppResult<ApiResponse<PaymentMethod>> {
    let txn = state.orm.begin().await?;
    let existing = find_owned(&txn, user.user_id, method_id).await?;
    clear_default(&txn, user.user_id, Some(existing.id)).await?;

    let mut active: payment_methods::ActiveModel = existing.into();
    active.is_default = Set(true);
    active.updated_at = Set(Utc::now().fixed_offset());
    let updated = active.update(&txn).await?;
    txn.commit().await?;

    Ok(ApiResponse::success(
        "Default payment method updated successfully",
        PaymentMethod::from(updated),
        Some(Meta::empty()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card() -> PaymentMethodRequest {
        PaymentMethodRequest {
            method_type: "CREDIT_CARD".into(),
            stripe_payment_method_id: Some("pm_test".into()),
            last4: Some("4242".into()),
            brand: Some("visa".into()),
            expiry_month: Some(12),
            expiry_year: Some(2030),
            is_default: false,
        }
    }

    #[test]
    fn card_details_are_checked() {
        assert!(validate_payment_method(&card()).is_ok());

        let mut bad = card();
        bad.last4 = Some("42a2".into());
        bad.expiry_month = Some(13);
        match validate_payment_method(&bad) {
            Err(AppError::Validation(fields)) => assert_eq!(fields.len(), 2),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn unknown_type_is_rejected() {
        let mut bad = card();
        bad.method_type = "CASH".into();
        assert!(validate_payment_method(&bad).is_err());
    }
}
