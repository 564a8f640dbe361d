use serde::Serialize;
use utoipa::ToSchema;

use crate::models::{Brand, Category, CategoryDetail, Product};

#[derive(Serialize, ToSchema)]
#[serde(transparent)]
pub struct CategoryList {
    #[schema(value_type = Vec<CategoryDetail>)]
    pub items: Vec<CategoryDetail>,
}

#[derive(Serialize, ToSchema)]
#[serde(transparent)]
pub struct BrandList {
    #[schema(value_type = Vec<Brand>)]
    pub items: Vec<Brand>,
}

/// One page of a category's products.
#[derive(Serialize, ToSchema)]
pub struct CategoryProducts {
    pub category: Category,
    pub products: Vec<Product>,
}

#[derive(Serialize, ToSchema)]
pub struct BrandProducts {
    pub brand: Brand,
    pub products: Vec<Product>,
}
