pub mod auth;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod products;
pub mod users;
pub mod wishlist;
