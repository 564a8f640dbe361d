use chrono::{DateTime, Utc};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};

use crate::{
    dto::checkout::{PromoValidation, ShippingMethodList, ValidatePromoRequest},
    entity::{PromoCodes, ShippingMethods, promo_codes, shipping_methods},
    error::{AppError, AppResult},
    models::ShippingMethod,
    response::{ApiResponse, Meta},
    state::AppState,
};

pub const PERCENTAGE: &str = "PERCENTAGE";
pub const FIXED: &str = "FIXED";

pub async fn list_shipping_methods(
    state: &AppState,
) -> AppResult<ApiResponse<ShippingMethodList>> {
    let rows = ShippingMethods::find()
        .filter(shipping_methods::Column::IsActive.eq(true))
        .order_by_asc(shipping_methods::Column::SortOrder)
        .all(&state.orm)
        .await?;

    let items = rows.into_iter().map(ShippingMethod::from).collect();
    Ok(ApiResponse::success(
        "Shipping methods retrieved successfully",
        ShippingMethodList { items },
        Some(Meta::empty()),
    ))
}

/// Discount in minor units. Percent values are whole percents; fixed
/// discounts never exceed the subtotal.
pub fn compute_discount(discount_type: &str, value: i64, subtotal: i64) -> i64 {
    let subtotal = subtotal.max(0);
    let discount = match discount_type {
        PERCENTAGE => {
            // Widened so large subtotals cannot overflow; the result is <= subtotal.
            (i128::from(subtotal) * i128::from(value.clamp(0, 100)) / 100) as i64
        }
        _ => value.max(0),
    };
    discount.min(subtotal)
}

/// Why a stored code cannot be applied right now, if it cannot.
pub fn unusable_reason(
    promo: &promo_codes::Model,
    subtotal: i64,
    now: DateTime<Utc>,
) -> Option<String> {
    if !promo.is_active {
        return Some("Promo code is not active".into());
    }
    if promo.starts_at.with_timezone(&Utc) > now {
        return Some("Promo code is not active yet".into());
    }
    if promo
        .expires_at
        .is_some_and(|expires| expires.with_timezone(&Utc) <= now)
    {
        return Some("Promo code has expired".into());
    }
    if promo
        .usage_limit
        .is_some_and(|limit| promo.usage_count >= limit)
    {
        return Some("Promo code usage limit reached".into());
    }
    if let Some(min) = promo.min_order_amount {
        if subtotal < min {
            return Some(format!("Minimum order amount of {min} required"));
        }
    }
    None
}

pub async fn validate_promo(
    state: &AppState,
    payload: ValidatePromoRequest,
) -> AppResult<ApiResponse<PromoValidation>> {
    let code = payload.code.trim().to_uppercase();
    if code.is_empty() {
        return Err(AppError::BadRequest("Promo code is required".into()));
    }
    if payload.subtotal < 0 {
        return Err(AppError::BadRequest("Subtotal cannot be negative".into()));
    }

    let promo = PromoCodes::find()
        .filter(promo_codes::Column::Code.eq(code.as_str()))
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("Promo code"))?;

    if let Some(reason) = unusable_reason(&promo, payload.subtotal, Utc::now()) {
        return Err(AppError::BadRequest(reason));
    }

    let discount = compute_discount(&promo.discount_type, promo.value, payload.subtotal);
    Ok(ApiResponse::success(
        "Promo code is valid",
        PromoValidation {
            id: promo.id,
            code: promo.code,
            discount_type: promo.discount_type,
            value: promo.value,
            discount,
            total_after_discount: payload.subtotal - discount,
            description: promo.description,
        },
        Some(Meta::empty()),
    ))
}
