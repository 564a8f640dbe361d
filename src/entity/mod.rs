pub mod addresses;
pub mod brands;
pub mod cart_items;
pub mod carts;
pub mod categories;
pub mod payment_methods;
pub mod product_views;
pub mod products;
pub mod promo_codes;
pub mod reviews;
pub mod shipping_methods;
pub mod users;
pub mod wishlist_items;
pub mod wishlists;

pub use addresses::Entity as Addresses;
pub use brands::Entity as Brands;
pub use cart_items::Entity as CartItems;
pub use carts::Entity as Carts;
pub use categories::Entity as Categories;
pub use payment_methods::Entity as PaymentMethods;
pub use product_views::Entity as ProductViews;
pub use products::Entity as Products;
pub use promo_codes::Entity as PromoCodes;
pub use reviews::Entity as Reviews;
pub use shipping_methods::Entity as ShippingMethods;
pub use users::Entity as Users;
pub use wishlist_items::Entity as WishlistItems;
pub use wishlists::Entity as Wishlists;
