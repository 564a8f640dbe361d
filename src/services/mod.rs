pub mod address_service;
pub mod auth_service;
pub mod brand_service;
pub mod cart_service;
pub mod category_service;
pub mod checkout_service;
pub mod payment_method_service;
pub mod product_service;
pub mod token_service;
pub mod user_service;
pub mod wishlist_service;
