use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entity::{
    addresses, brands, categories, payment_methods, products, shipping_methods, users,
};

/// Public view of a user. Credentials and one-time tokens never leave the service.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub avatar: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub is_verified: bool,
    #[schema(value_type = Object)]
    pub preferences: Value,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<users::Model> for User {
    fn from(model: users::Model) -> Self {
        Self {
            id: model.id,
            email: model.email,
            first_name: model.first_name,
            last_name: model.last_name,
            phone: model.phone,
            avatar: model.avatar,
            date_of_birth: model.date_of_birth,
            gender: model.gender,
            is_verified: model.is_verified,
            preferences: model.preferences,
            last_login_at: model.last_login_at.map(|dt| dt.with_timezone(&Utc)),
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CategoryRef {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
}

impl From<&categories::Model> for CategoryRef {
    fn from(model: &categories::Model) -> Self {
        Self {
            id: model.id,
            name: model.name.clone(),
            slug: model.slug.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BrandRef {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub logo: Option<String>,
}

impl From<&brands::Model> for BrandRef {
    fn from(model: &brands::Model) -> Self {
        Self {
            id: model.id,
            name: model.name.clone(),
            slug: model.slug.clone(),
            logo: model.logo.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub price: i64,
    pub original_price: Option<i64>,
    pub sku: String,
    pub images: Vec<String>,
    #[schema(value_type = Object)]
    pub specifications: Value,
    pub features: Vec<String>,
    pub in_stock: bool,
    pub stock_count: i32,
    pub badge: Option<String>,
    pub rating: f64,
    pub review_count: i32,
    pub category: Option<CategoryRef>,
    pub brand: Option<BrandRef>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn from_entity(
        model: products::Model,
        category: Option<CategoryRef>,
        brand: Option<BrandRef>,
    ) -> Self {
        Self {
            id: model.id,
            name: model.name,
            slug: model.slug,
            description: model.description,
            price: model.price,
            original_price: model.original_price,
            sku: model.sku,
            images: model.images,
            specifications: model.specifications,
            features: model.features,
            in_stock: model.in_stock,
            stock_count: model.stock_count,
            badge: model.badge,
            rating: model.rating,
            review_count: model.review_count,
            category,
            brand,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

/// Compact product shape embedded in carts, wishlists and search results.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProductCard {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub price: i64,
    pub original_price: Option<i64>,
    pub images: Vec<String>,
    pub in_stock: bool,
    pub stock_count: i32,
    pub rating: f64,
    pub review_count: i32,
    pub badge: Option<String>,
    pub brand_name: Option<String>,
    pub category_name: Option<String>,
}

impl ProductCard {
    pub fn from_entity(
        model: &products::Model,
        brand_name: Option<String>,
        category_name: Option<String>,
    ) -> Self {
        Self {
            id: model.id,
            name: model.name.clone(),
            slug: model.slug.clone(),
            price: model.price,
            original_price: model.original_price,
            images: model.images.clone(),
            in_stock: model.in_stock,
            stock_count: model.stock_count,
            rating: model.rating,
            review_count: model.review_count,
            badge: model.badge.clone(),
            brand_name,
            category_name,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub image: Option<String>,
    pub parent_id: Option<Uuid>,
    pub sort_order: i32,
}

impl From<categories::Model> for Category {
    fn from(model: categories::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            slug: model.slug,
            description: model.description,
            image: model.image,
            parent_id: model.parent_id,
            sort_order: model.sort_order,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CategoryDetail {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub image: Option<String>,
    pub sort_order: i32,
    pub parent: Option<Category>,
    pub children: Vec<Category>,
    pub product_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Brand {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub logo: Option<String>,
    pub description: Option<String>,
    pub product_count: i64,
}

impl Brand {
    pub fn from_entity(model: brands::Model, product_count: i64) -> Self {
        Self {
            id: model.id,
            name: model.name,
            slug: model.slug,
            logo: model.logo,
            description: model.description,
            product_count,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReviewAuthor {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Review {
    pub id: Uuid,
    pub product_id: Uuid,
    pub rating: i32,
    pub title: String,
    pub comment: String,
    pub images: Vec<String>,
    pub is_verified_purchase: bool,
    pub helpful_count: i32,
    pub user: Option<ReviewAuthor>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CartItem {
    pub id: Uuid,
    pub cart_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub price_at_time: i64,
    pub product: Option<ProductCard>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Cart {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub session_id: Option<String>,
    pub items: Vec<CartItem>,
    pub subtotal: i64,
    pub item_count: i64,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WishlistItem {
    pub id: Uuid,
    pub wishlist_id: Uuid,
    pub product_id: Uuid,
    pub product: Option<ProductCard>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Wishlist {
    pub id: Uuid,
    pub user_id: Uuid,
    pub items: Vec<WishlistItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Address {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub address_type: String,
    pub is_default: bool,
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
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<addresses::Model> for Address {
    fn from(model: addresses::Model) -> Self {
        Self {
            id: model.id,
            address_type: model.address_type,
            is_default: model.is_default,
            first_name: model.first_name,
            last_name: model.last_name,
            company: model.company,
            address_line1: model.address_line1,
            address_line2: model.address_line2,
            city: model.city,
            state: model.state,
            postal_code: model.postal_code,
            country: model.country,
            phone: model.phone,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

/// Stored payment method. The processor token is intentionally absent.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PaymentMethod {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub method_type: String,
    pub last4: Option<String>,
    pub brand: Option<String>,
    pub expiry_month: Option<i32>,
    pub expiry_year: Option<i32>,
    pub is_default: bool,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
}

impl From<payment_methods::Model> for PaymentMethod {
    fn from(model: payment_methods::Model) -> Self {
        Self {
            id: model.id,
            method_type: model.method_type,
            last4: model.last4,
            brand: model.brand,
            expiry_month: model.expiry_month,
            expiry_year: model.expiry_year,
            is_default: model.is_default,
            is_verified: model.is_verified,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ShippingMethod {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: i64,
    pub estimated_days: String,
    pub icon: Option<String>,
}

impl From<shipping_methods::Model> for ShippingMethod {
    fn from(model: shipping_methods::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            description: model.description,
            price: model.price,
            estimated_days: model.estimated_days,
            icon: model.icon,
        }
    }
}
