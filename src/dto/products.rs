use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{Product, ProductCard, Review};

#[derive(Serialize, ToSchema)]
#[serde(transparent)]
pub struct ProductList {
    #[schema(value_type = Vec<Product>)]
    pub items: Vec<Product>,
}

#[derive(Serialize, ToSchema)]
#[serde(transparent)]
pub struct ProductCardList {
    #[schema(value_type = Vec<ProductCard>)]
    pub items: Vec<ProductCard>,
}

#[derive(Serialize, ToSchema)]
#[serde(transparent)]
pub struct ReviewList {
    #[schema(value_type = Vec<Review>)]
    pub items: Vec<Review>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: Product,
    pub reviews: Vec<Review>,
}

#[derive(Debug, Clone, Serialize, ToSchema, PartialEq)]
pub struct Suggestion {
    pub id: Uuid,
    pub value: String,
    pub label: String,
}

#[derive(Serialize, ToSchema)]
#[serde(transparent)]
pub struct SuggestionList {
    #[schema(value_type = Vec<Suggestion>)]
    pub items: Vec<Suggestion>,
}
