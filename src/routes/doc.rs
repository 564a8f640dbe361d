use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        auth::{AuthSession, AuthTokens, EmailRequest, LoginRequest, RefreshRequest, RegisterRequest, ResetPasswordRequest},
        cart::{AddToCartRequest, SyncCartRequest, UpdateCartItemRequest},
        catalog::{BrandList, BrandProducts, CategoryList, CategoryProducts},
        checkout::{PromoValidation, ShippingMethodList, ValidatePromoRequest},
        products::{ProductCardList, ProductDetail, ProductList, ReviewList, Suggestion, SuggestionList},
        users::{AddressList, AddressRequest, PaymentMethodList, PaymentMethodRequest, UpdateProfileRequest},
        wishlist::{AddWishlistItemRequest, WishlistStatus},
    },
    models::{
        Address, Brand, BrandRef, Cart, CartItem, Category, CategoryDetail, CategoryRef,
        PaymentMethod, Product, ProductCard, Review, ReviewAuthor, ShippingMethod, User, Wishlist,
        WishlistItem,
    },
    response::{ApiResponse, Meta},
    routes::{auth, brands, cart, categories, checkout, health, params, products, users, wishlist},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::register,
        auth::login,
        auth::logout,
        auth::refresh,
        auth::forgot_password,
        auth::reset_password,
        auth::verify_email,
        auth::resend_verification,
        users::get_profile,
        users::update_profile,
        users::update_preferences,
        users::delete_account,
        users::list_addresses,
        users::create_address,
        users::update_address,
        users::delete_address,
        users::set_default_address,
        users::list_payment_methods,
        users::create_payment_method,
        users::update_payment_method,
        users::delete_payment_method,
        users::set_default_payment_method,
        products::list_products,
        products::search_products,
        products::autocomplete,
        products::trending_products,
        products::get_product_by_slug,
        products::get_product,
        products::track_view,
        products::product_reviews,
        products::related_products,
        categories::list_categories,
        categories::get_category,
        categories::category_products,
        brands::list_brands,
        brands::get_brand,
        brands::brand_products,
        cart::get_cart,
        cart::add_item,
        cart::update_item,
        cart::remove_item,
        cart::clear_cart,
        cart::sync_cart,
        wishlist::get_wishlist,
        wishlist::add_item,
        wishlist::remove_item,
        wishlist::remove_by_product,
        wishlist::clear_wishlist,
        wishlist::check_product,
        wishlist::move_to_cart,
        checkout::list_shipping_methods,
        checkout::validate_promo
    ),
    components(
        schemas(
            User,
            Address,
            PaymentMethod,
            Product,
            ProductCard,
            CategoryRef,
            BrandRef,
            Category,
            CategoryDetail,
            Brand,
            Review,
            ReviewAuthor,
            Cart,
            CartItem,
            Wishlist,
            WishlistItem,
            ShippingMethod,
            RegisterRequest,
            LoginRequest,
            RefreshRequest,
            EmailRequest,
            ResetPasswordRequest,
            AuthTokens,
            AuthSession,
            UpdateProfileRequest,
            AddressRequest,
            PaymentMethodRequest,
            AddressList,
            PaymentMethodList,
            ProductList,
            ProductCardList,
            ProductDetail,
            ReviewList,
            Suggestion,
            SuggestionList,
            CategoryList,
            CategoryProducts,
            BrandList,
            BrandProducts,
            AddToCartRequest,
            UpdateCartItemRequest,
            SyncCartRequest,
            AddWishlistItemRequest,
            WishlistStatus,
            ValidatePromoRequest,
            PromoValidation,
            ShippingMethodList,
            params::Pagination,
            params::ProductQuery,
            params::SearchQuery,
            params::LimitQuery,
            params::SortOrder,
            params::ProductSortBy,
            Meta,
            ApiResponse<User>,
            ApiResponse<AuthSession>,
            ApiResponse<ProductList>,
            ApiResponse<ProductDetail>,
            ApiResponse<Cart>,
            ApiResponse<Wishlist>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Registration, login and token endpoints"),
        (name = "Users", description = "Profile, address and payment method endpoints"),
        (name = "Products", description = "Product catalog endpoints"),
        (name = "Categories", description = "Category endpoints"),
        (name = "Brands", description = "Brand endpoints"),
        (name = "Cart", description = "Cart endpoints for users and guest sessions"),
        (name = "Wishlist", description = "Wishlist endpoints"),
        (name = "Checkout", description = "Shipping method and promo code endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_route_group() {
        let doc = ApiDoc::openapi();
        let paths = &doc.paths.paths;
        for path in [
            "/health",
            "/api/auth/login",
            "/api/users/addresses/{id}/default",
            "/api/products/{id}/recommendations",
            "/api/categories/{slug}/products",
            "/api/brands/{slug}",
            "/api/cart/sync",
            "/api/wishlist/items/{id}/move-to-cart",
            "/api/checkout/validate-promo",
        ] {
            assert!(paths.contains_key(path), "missing {path}");
        }
    }
}
