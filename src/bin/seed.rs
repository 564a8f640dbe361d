use serde_json::json;
use shopmart_api::{
    config::AppConfig,
    db::{DbPool, create_orm_conn, pool_of, run_migrations},
    services::auth_service::hash_password,
};
use uuid::Uuid;

struct SeedProduct {
    name: &'static str,
    slug: &'static str,
    sku: &'static str,
    category: &'static str,
    brand: &'static str,
    price: i64,
    original_price: Option<i64>,
    stock: i32,
    badge: Option<&'static str>,
    rating: f64,
    features: &'static [&'static str],
}

const PRODUCTS: &[SeedProduct] = &[
    SeedProduct {
        name: "Galaxy S24 Ultra",
        slug: "galaxy-s24-ultra",
        sku: "SAM-S24U-256",
        category: "smartphones",
        brand: "samsung",
        price: 129_999,
        original_price: Some(139_999),
        stock: 25,
        badge: Some("Sale"),
        rating: 4.7,
        features: &["200MP camera", "S Pen included", "5000mAh battery"],
    },
    SeedProduct {
        name: "iPhone 15 Pro",
        slug: "iphone-15-pro",
        sku: "APL-IP15P-128",
        category: "smartphones",
        brand: "apple",
        price: 99_999,
        original_price: None,
        stock: 40,
        badge: Some("New"),
        rating: 4.8,
        features: &["A17 Pro chip", "Titanium design", "USB-C"],
    },
    SeedProduct {
        name: "MacBook Air 15",
        slug: "macbook-air-15",
        sku: "APL-MBA15-M3",
        category: "laptops",
        brand: "apple",
        price: 129_900,
        original_price: None,
        stock: 15,
        badge: None,
        rating: 4.9,
        features: &["M3 chip", "18-hour battery", "Liquid Retina display"],
    },
    SeedProduct {
        name: "XPS 13",
        slug: "dell-xps-13",
        sku: "DEL-XPS13-I7",
        category: "laptops",
        brand: "dell",
        price: 109_999,
        original_price: Some(119_999),
        stock: 10,
        badge: Some("Sale"),
        rating: 4.5,
        features: &["Intel Core i7", "InfinityEdge display"],
    },
    SeedProduct {
        name: "WH-1000XM5",
        slug: "sony-wh-1000xm5",
        sku: "SNY-WH1000XM5",
        category: "audio",
        brand: "sony",
        price: 34_999,
        original_price: Some(39_999),
        stock: 60,
        badge: Some("Best Seller"),
        rating: 4.6,
        features: &["Noise cancelling", "30-hour battery"],
    },
    SeedProduct {
        name: "AirPods Pro",
        slug: "airpods-pro",
        sku: "APL-APP-2",
        category: "audio",
        brand: "apple",
        price: 24_999,
        original_price: None,
        stock: 80,
        badge: None,
        rating: 4.7,
        features: &["Adaptive audio", "MagSafe case"],
    },
    SeedProduct {
        name: "Air Max 270",
        slug: "nike-air-max-270",
        sku: "NKE-AM270-42",
        category: "shoes",
        brand: "nike",
        price: 15_000,
        original_price: None,
        stock: 35,
        badge: None,
        rating: 4.4,
        features: &["Max Air unit", "Mesh upper"],
    },
    SeedProduct {
        name: "Ultraboost Light",
        slug: "adidas-ultraboost-light",
        sku: "ADI-UBL-42",
        category: "shoes",
        brand: "adidas",
        price: 18_000,
        original_price: Some(19_000),
        stock: 0,
        badge: Some("Sold Out"),
        rating: 4.3,
        features: &["Boost midsole", "Primeknit upper"],
    },
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let orm = create_orm_conn(&config.database_url).await?;
    run_migrations(&orm).await?;
    let pool = pool_of(&orm);

    let electronics = upsert_category(&pool, "Electronics", "electronics", None, 1).await?;
    let fashion = upsert_category(&pool, "Fashion", "fashion", None, 2).await?;
    upsert_category(&pool, "Smartphones", "smartphones", Some(electronics), 1).await?;
    upsert_category(&pool, "Laptops", "laptops", Some(electronics), 2).await?;
    upsert_category(&pool, "Audio", "audio", Some(electronics), 3).await?;
    upsert_category(&pool, "Shoes", "shoes", Some(fashion), 1).await?;
    println!("Seeded categories");

    for (name, slug) in [
        ("Apple", "apple"),
        ("Samsung", "samsung"),
        ("Dell", "dell"),
        ("Sony", "sony"),
        ("Nike", "nike"),
        ("Adidas", "adidas"),
    ] {
        upsert_brand(&pool, name, slug).await?;
    }
    println!("Seeded brands");

    let mut product_ids = Vec::with_capacity(PRODUCTS.len());
    for product in PRODUCTS {
        product_ids.push(upsert_product(&pool, product).await?);
    }
    println!("Seeded {} products", product_ids.len());

    seed_shipping_methods(&pool).await?;
    seed_promo_codes(&pool).await?;

    let user_id = ensure_test_user(&pool, "test@shopmart.com", "Test@123").await?;
    seed_address(&pool, user_id).await?;
    if let Some(product_id) = product_ids.first() {
        seed_review(&pool, *product_id, user_id).await?;
    }

    println!("Seed completed. Test user ID: {user_id}");
    Ok(())
}

async fn upsert_category(
    pool: &DbPool,
    name: &str,
    slug: &str,
    parent_id: Option<Uuid>,
    sort_order: i32,
) -> anyhow::Result<Uuid> {
    let (id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO categories (id, name, slug, description, parent_id, sort_order)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (slug) DO UPDATE
            SET name = EXCLUDED.name, parent_id = EXCLUDED.parent_id, sort_order = EXCLUDED.sort_order
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(name)
    .bind(slug)
    .bind(format!("Shop the latest {}", name.to_lowercase()))
    .bind(parent_id)
    .bind(sort_order)
    .fetch_one(pool)
    .await?;
    Ok(id)
}

async fn upsert_brand(pool: &DbPool, name: &str, slug: &str) -> anyhow::Result<Uuid> {
    let (id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO brands (id, name, slug, logo)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (slug) DO UPDATE SET name = EXCLUDED.name
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(name)
    .bind(slug)
    .bind(format!("/images/brands/{slug}.png"))
    .fetch_one(pool)
    .await?;
    Ok(id)
}

async fn upsert_product(pool: &DbPool, product: &SeedProduct) -> anyhow::Result<Uuid> {
    let features: Vec<String> = product.features.iter().map(|f| f.to_string()).collect();
    let images = vec![format!("/images/products/{}.jpg", product.slug)];

    let (id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO products (
            id, name, slug, description, price, original_price, sku,
            category_id, brand_id, images, specifications, features,
            in_stock, stock_count, badge, rating, review_count
        )
        SELECT $1, $2, $3, $4, $5, $6, $7, c.id, b.id, $8, $9, $10, $11, $12, $13, $14, 0
        FROM categories c, brands b
        WHERE c.slug = $15 AND b.slug = $16
        ON CONFLICT (slug) DO UPDATE
            SET price = EXCLUDED.price,
                original_price = EXCLUDED.original_price,
                stock_count = EXCLUDED.stock_count,
                in_stock = EXCLUDED.in_stock
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(product.name)
    .bind(product.slug)
    .bind(format!("{} with {}", product.name, product.features.join(", ")))
    .bind(product.price)
    .bind(product.original_price)
    .bind(product.sku)
    .bind(images)
    .bind(json!({ "sku": product.sku }))
    .bind(features)
    .bind(product.stock > 0)
    .bind(product.stock)
    .bind(product.badge)
    .bind(product.rating)
    .bind(product.category)
    .bind(product.brand)
    .fetch_one(pool)
    .await?;
    Ok(id)
}

async fn seed_shipping_methods(pool: &DbPool) -> anyhow::Result<()> {
    let methods = [
        ("Standard Shipping", "Delivered by ground", 599_i64, "5-7 business days", 1),
        ("Express Shipping", "Priority handling", 1_499, "2-3 business days", 2),
        ("Overnight Shipping", "Next business day", 2_999, "1 business day", 3),
    ];

    for (name, description, price, days, sort_order) in methods {
        sqlx::query(
            r#"
            INSERT INTO shipping_methods (id, name, description, price, estimated_days, sort_order)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (name) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(description)
        .bind(price)
        .bind(days)
        .bind(sort_order)
        .execute(pool)
        .await?;
    }

    println!("Seeded shipping methods");
    Ok(())
}

async fn seed_promo_codes(pool: &DbPool) -> anyhow::Result<()> {
    let codes = [
        ("WELCOME10", "PERCENTAGE", 10_i64, "10% off your first order", None),
        ("SAVE20", "FIXED", 2_000, "$20 off orders over $100", Some(10_000_i64)),
    ];

    for (code, discount_type, value, description, min_order_amount) in codes {
        sqlx::query(
            r#"
            INSERT INTO promo_codes (id, code, discount_type, value, description, min_order_amount)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (code) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(code)
        .bind(discount_type)
        .bind(value)
        .bind(description)
        .bind(min_order_amount)
        .execute(pool)
        .await?;
    }

    println!("Seeded promo codes");
    Ok(())
}

async fn ensure_test_user(pool: &DbPool, email: &str, password: &str) -> anyhow::Result<Uuid> {
    let password_hash = hash_password(password)?;

    let (id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO users (id, email, password_hash, first_name, last_name, is_verified)
        VALUES ($1, $2, $3, 'Test', 'User', TRUE)
        ON CONFLICT (email) DO UPDATE SET password_hash = EXCLUDED.password_hash
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(email)
    .bind(password_hash)
    .fetch_one(pool)
    .await?;

    println!("Ensured user {email}");
    Ok(id)
}

async fn seed_address(pool: &DbPool, user_id: Uuid) -> anyhow::Result<()> {
    let (existing,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM addresses WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(pool)
            .await?;
    if existing > 0 {
        return Ok(());
    }

    sqlx::query(
        r#"
        INSERT INTO addresses (
            id, user_id, address_type, is_default, first_name, last_name,
            address_line1, city, state, postal_code, country
        )
        VALUES ($1, $2, 'HOME', TRUE, 'Test', 'User', '123 Market Street', 'San Francisco', 'CA', '94105', 'US')
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .execute(pool)
    .await?;

    println!("Seeded address");
    Ok(())
}

async fn seed_review(pool: &DbPool, product_id: Uuid, user_id: Uuid) -> anyhow::Result<()> {
    let (existing,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM reviews WHERE product_id = $1 AND user_id = $2",
    )
    .bind(product_id)
    .bind(user_id)
    .fetch_one(pool)
    .await?;
    if existing > 0 {
        return Ok(());
    }

    sqlx::query(
        r#"
        INSERT INTO reviews (id, product_id, user_id, rating, title, comment, is_verified_purchase)
        VALUES ($1, $2, $3, 5, 'Fantastic phone', 'Great screen and battery life.', TRUE)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(product_id)
    .bind(user_id)
    .execute(pool)
    .await?;
    sqlx::query("UPDATE products SET review_count = review_count + 1 WHERE id = $1")
        .bind(product_id)
        .execute(pool)
        .await?;

    println!("Seeded review");
    Ok(())
}
