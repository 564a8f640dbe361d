#![allow(dead_code)]

use chrono::Utc;
use sea_orm::{ActiveModelTrait, Set};
use serde_json::json;
use shopmart_api::{
    config::AppConfig,
    db::{create_orm_conn, run_migrations},
    entity::{brands, categories, products, users},
    middleware::auth::AuthUser,
    services::auth_service::hash_password,
    state::AppState,
};
use uuid::Uuid;

pub const PASSWORD: &str = "Passw0rd!";

/// Connects to the test database, or returns `None` so the caller can skip.
pub async fn setup_state() -> anyhow::Result<Option<AppState>> {
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!(
                "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests."
            );
            return Ok(None);
        }
    };

    let orm = create_orm_conn(&database_url).await?;
    run_migrations(&orm).await?;
    Ok(Some(AppState::new(orm, test_config(database_url))))
}

pub fn test_config(database_url: String) -> AppConfig {
    AppConfig {
        database_url,
        host: "127.0.0.1".into(),
        port: 0,
        jwt_secret: "test-access-secret".into(),
        jwt_refresh_secret: "test-refresh-secret".into(),
        access_token_ttl_minutes: 15,
        refresh_token_ttl_days: 7,
        frontend_url: "http://localhost:3000".into(),
    }
}

/// Short random suffix so concurrent tests never share rows.
pub fn unique(prefix: &str) -> String {
    format!("{prefix}-{}", &Uuid::new_v4().simple().to_string()[..12])
}

pub fn unique_email() -> String {
    format!("{}@example.com", unique("user"))
}

pub async fn create_user(state: &AppState) -> anyhow::Result<AuthUser> {
    let now = Utc::now().fixed_offset();
    let user = users::ActiveModel {
        id: Set(Uuid::new_v4()),
        email: Set(unique_email()),
        password_hash: Set(hash_password(PASSWORD)?),
        first_name: Set("Test".into()),
        last_name: Set("User".into()),
        is_verified: Set(true),
        preferences: Set(json!({})),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&state.orm)
    .await?;

    Ok(AuthUser {
        user_id: user.id,
        email: user.email,
    })
}

pub struct Catalog {
    pub category: categories::Model,
    pub brand: brands::Model,
}

pub async fn create_catalog(state: &AppState) -> anyhow::Result<Catalog> {
    let now = Utc::now().fixed_offset();
    let category = categories::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set("Gadgets".into()),
        slug: Set(unique("gadgets")),
        description: Set(None),
        image: Set(None),
        parent_id: Set(None),
        sort_order: Set(0),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&state.orm)
    .await?;

    let brand = brands::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set("Acme".into()),
        slug: Set(unique("acme")),
        logo: Set(None),
        description: Set(None),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&state.orm)
    .await?;

    Ok(Catalog { category, brand })
}

pub async fn create_product(
    state: &AppState,
    catalog: &Catalog,
    name: &str,
    price: i64,
    stock: i32,
) -> anyhow::Result<products::Model> {
    let now = Utc::now().fixed_offset();
    let slug = unique(&name.to_lowercase().replace(' ', "-"));
    let product = products::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.into()),
        sku: Set(slug.to_uppercase()),
        slug: Set(slug),
        description: Set(Some(format!("{name} for testing"))),
        price: Set(price),
        original_price: Set(None),
        category_id: Set(catalog.category.id),
        brand_id: Set(catalog.brand.id),
        images: Set(vec![]),
        specifications: Set(json!({})),
        features: Set(vec![]),
        in_stock: Set(stock > 0),
        stock_count: Set(stock),
        badge: Set(None),
        rating: Set(4.0),
        review_count: Set(0),
        is_active: Set(true),
        deleted_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&state.orm)
    .await?;
    Ok(product)
}
