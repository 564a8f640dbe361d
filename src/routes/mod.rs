use axum::Router;

use crate::state::AppState;

pub mod auth;
pub mod brands;
pub mod cart;
pub mod categories;
pub mod checkout;
pub mod doc;
pub mod health;
pub mod params;
pub mod products;
pub mod users;
pub mod wishlist;

// Build the API router without binding state; it will be provided at the top level.
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/users", users::router())
        .nest("/products", products::router())
        .nest("/categories", categories::router())
        .nest("/brands", brands::router())
        .nest("/cart", cart::router())
        .nest("/wishlist", wishlist::router())
        .nest("/checkout", checkout::router())
}
