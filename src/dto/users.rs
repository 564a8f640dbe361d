use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

use crate::models::{Address, PaymentMethod};

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateProfileRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub avatar: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
}

/// Partial preferences object; keys are merged over the stored ones.
pub type PreferencesPatch = Map<String, Value>;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AddressRequest {
    #[serde(rename = "type")]
    pub address_type: String,
    pub first_name: String,
    pub last_name: String,
    pub company: Option<String>,
    pub address_line1: String,
    pub address_line2: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
    pub phone: Option<String>,
    #[serde(default)]
    pub is_default: bool,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct PaymentMethodRequest {
    #[serde(rename = "type")]
    pub method_type: String,
    pub stripe_payment_method_id: Option<String>,
    pub last4: Option<String>,
    pub brand: Option<String>,
    pub expiry_month: Option<i32>,
    pub expiry_year: Option<i32>,
    #[serde(default)]
    pub is_default: bool,
}

#[derive(Serialize, ToSchema)]
#[serde(transparent)]
pub struct AddressList {
    #[schema(value_type = Vec<Address>)]
    pub items: Vec<Address>,
}

#[derive(Serialize, ToSchema)]
#[serde(transparent)]
pub struct PaymentMethodList {
    #[schema(value_type = Vec<PaymentMethod>)]
    pub items: Vec<PaymentMethod>,
}
