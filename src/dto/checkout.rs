use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::ShippingMethod;

#[derive(Debug, Deserialize, ToSchema)]
pub struct ValidatePromoRequest {
    pub code: String,
    /// Order subtotal in minor units.
    pub subtotal: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PromoValidation {
    pub id: Uuid,
    pub code: String,
    #[serde(rename = "type")]
    pub discount_type: String,
    pub value: i64,
    pub discount: i64,
    pub total_after_discount: i64,
    pub description: Option<String>,
}

#[derive(Serialize, ToSchema)]
#[serde(transparent)]
pub struct ShippingMethodList {
    #[schema(value_type = Vec<ShippingMethod>)]
    pub items: Vec<ShippingMethod>,
}
