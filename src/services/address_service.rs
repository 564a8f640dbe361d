use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, ModelTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait, sea_query::Expr,
};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::{
    audit,
    dto::users::{AddressList, AddressRequest},
    entity::{Addresses, addresses},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::Address,
    response::{ApiResponse, Meta},
    state::AppState,
    validation::Validator,
};

const ADDRESS_TYPES: &[&str] = &["HOME", "WORK", "OTHER"];

fn validate_address(payload: &AddressRequest) -> AppResult<()> {
    let mut v = Validator::new();
    v.one_of(
        "type",
        &payload.address_type,
        ADDRESS_TYPES,
        "Address type must be HOME, WORK, or OTHER",
    );
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
    v.optional_length(
        "company",
        payload.company.as_deref(),
        0,
        100,
        "Company name cannot exceed 100 characters",
    );
    v.length(
        "address_line1",
        &payload.address_line1,
        5,
        100,
        "Address line 1 must be between 5 and 100 characters",
    );
    v.optional_length(
        "address_line2",
        payload.address_line2.as_deref(),
        0,
        100,
        "Address line 2 cannot exceed 100 characters",
    );
    v.length("city", &payload.city, 2, 50, "City must be between 2 and 50 characters");
    v.length("state", &payload.state, 2, 50, "State must be between 2 and 50 characters");
    v.length(
        "postal_code",
        &payload.postal_code,
        3,
        10,
        "Postal code must be between 3 and 10 characters",
    );
    v.length(
        "country",
        &payload.country,
        2,
        50,
        "Country must be between 2 and 50 characters",
    );
    v.phone("phone", payload.phone.as_deref());
    v.finish()
}

/// Clears `is_default` on every address of the user except `keep`.
async fn clear_default<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
    keep: Option<Uuid>,
) -> AppResult<()> {
    let mut query = Addresses::update_many()
        .col_expr(addresses::Column::IsDefault, Expr::value(false))
        .filter(addresses::Column::UserId.eq(user_id))
        .filter(addresses::Column::IsDefault.eq(true));
    if let Some(keep) = keep {
        query = query.filter(addresses::Column::Id.ne(keep));
    }
    query.exec(conn).await?;
    Ok(())
}

async fn find_owned<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
    address_id: Uuid,
) -> AppResult<addresses::Model> {
    Addresses::find_by_id(address_id)
        .filter(addresses::Column::UserId.eq(user_id))
        .one(conn)
        .await?
        .ok_or_else(|| AppError::not_found("Address"))
}

pub async fn list_addresses(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<AddressList>> {
    let rows = Addresses::find()
        .filter(addresses::Column::UserId.eq(user.user_id))
        .order_by_desc(addresses::Column::IsDefault)
        .order_by_desc(addresses::Column::CreatedAt)
        .all(&state.orm)
        .await?;

    let items = rows.into_iter().map(Address::from).collect();
    Ok(ApiResponse::success(
        "Addresses retrieved successfully",
        AddressList { items },
        Some(Meta::empty()),
    ))
}

pub async fn create_address(
    state: &AppState,
    user: &AuthUser,
    payload: AddressRequest,
) -> AppResult<ApiResponse<Address>> {
    validate_address(&payload)?;

    let txn = state.orm.begin().await?;
    if payload.is_default {
        clear_default(&txn, user.user_id, None).await?;
    }

    let now = Utc::now().fixed_offset();
    let created = addresses::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.user_id),
        address_type: Set(payload.address_type),
        is_default: Set(payload.is_default),
        first_name: Set(payload.first_name.trim().to_string()),
        last_name: Set(payload.last_name.trim().to_string()),
        company: Set(payload.company),
        address_line1: Set(payload.address_line1.trim().to_string()),
        address_line2: Set(payload.address_line2),
        city: Set(payload.city.trim().to_string()),
        state: Set(payload.state.trim().to_string()),
        postal_code: Set(payload.postal_code.trim().to_string()),
        country: Set(payload.country.trim().to_string()),
        phone: Set(payload.phone),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&txn)
    .await?;
    txn.commit().await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "address_create",
        "addresses",
        json!({ "address_id": created.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Address created successfully",
        Address::from(created),
        None,
    ))
}

pub async fn update_address(
    state: &AppState,
    user: &AuthUser,
    address_id: Uuid,
    payload: AddressRequest,
) -> AppResult<ApiResponse<Address>> {
    validate_address(&payload)?;

    let txn = state.orm.begin().await?;
    let existing = find_owned(&txn, user.user_id, address_id).await?;
    if payload.is_default {
        clear_default(&txn, user.user_id, Some(existing.id)).await?;
    }

    let mut active: addresses::ActiveModel = existing.into();
    active.address_type = Set(payload.address_type);
    active.is_default = Set(payload.is_default);
    active.first_name = Set(payload.first_name.trim().to_string());
    active.last_name = Set(payload.last_name.trim().to_string());
    active.company = Set(payload.company);
    active.address_line1 = Set(payload.address_line1.trim().to_string());
    active.address_line2 = Set(payload.address_line2);
    active.city = Set(payload.city.trim().to_string());
    active.state = Set(payload.state.trim().to_string());
    active.postal_code = Set(payload.postal_code.trim().to_string());
    active.country = Set(payload.country.trim().to_string());
    active.phone = Set(payload.phone);
    active.updated_at = Set(Utc::now().fixed_offset());
    let updated = active.update(&txn).await?;
    txn.commit().await?;

    Ok(ApiResponse::success(
        "Address updated successfully",
        Address::from(updated),
        Some(Meta::empty()),
    ))
}

pub async fn delete_address(
    state: &AppState,
    user: &AuthUser,
    address_id: Uuid,
) -> AppResult<ApiResponse<Value>> {
    let existing = find_owned(&state.orm, user.user_id, address_id).await?;
    existing.delete(&state.orm).await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "address_delete",
        "addresses",
        json!({ "address_id": address_id }),
    )
    .await;

    Ok(ApiResponse::message("Address deleted successfully"))
}

pub async fn set_default_address(
    state: &AppState,
    user: &AuthUser,
    address_id: Uuid,
) -> AppResult<ApiResponse<Address>> {
    let txn = state.orm.begin().await?;
    let existing = find_owned(&txn, user.user_id, address_id).await?;
    clear_default(&txn, user.user_id, Some(existing.id)).await?;

    let mut active: addresses::ActiveModel = existing.into();
    active.is_default = Set(true);
    active.updated_at = Set(Utc::now().fixed_offset());
    let updated = active.update(&txn).await?;
    txn.commit().await?;

    Ok(ApiResponse::success(
        "Default address updated successfully",
        Address::from(updated),
        Some(Meta::empty()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> AddressRequest {
        AddressRequest {
            address_type: "HOME".into(),
            first_name: "Test".into(),
            last_name: "User".into(),
            company: None,
            address_line1: "123 Main Street".into(),
            address_line2: None,
            city: "New York".into(),
            state: "NY".into(),
            postal_code: "10001".into(),
            country: "United States".into(),
            phone: Some("+1234567890".into()),
            is_default: true,
        }
    }

    #[test]
    fn valid_address_passes() {
        assert!(validate_address(&request()).is_ok());
    }

    #[test]
    fn invalid_fields_are_reported_together() {
        let mut payload = request();
        payload.address_type = "CASTLE".into();
        payload.postal_code = "1".into();

        match validate_address(&payload) {
            Err(AppError::Validation(fields)) => {
                let names: Vec<_> = fields.iter().map(|f| f.field.as_str()).collect();
                assert_eq!(names, ["type", "postal_code"]);
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }
}
