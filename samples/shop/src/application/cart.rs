//! Cart use cases.

use storefront::prelude::*;
use uuid::Uuid;

use super::ShopPipeline;
use super::coupons::redeem;
use super::identity::customer_not_found;
use crate::domain::cart::{Cart, CartStatus};
use crate::domain::catalog::Variant;
use crate::domain::identity::Customer;

pub fn cart_not_found(cart_id: Uuid) -> ErrorInfo {
    ErrorInfo::not_found(format!("Cart {cart_id} was not found."))
}

fn update_cart<F>(cart_id: Uuid, transition: F) -> ShopPipeline<Cart>
where
    F: FnOnce(Cart) -> Fin<Cart> + Send + 'static,
{
    get_update_entity(
        move |cart: &Cart| cart.id == cart_id,
        cart_not_found(cart_id),
        QueryOptions::new(),
        [Transition::pure(transition)],
    )
}

/// Opens an empty cart. A customer has at most one active cart.
pub fn create_cart(customer_id: Uuid) -> ShopPipeline<Cart> {
    pipeline! {
        _ <= get_entity(
            move |customer: &Customer| customer.id == customer_id,
            customer_not_found(customer_id),
            QueryOptions::new().as_no_tracking(),
        );
        _ <= ensure_absent(
            move |cart: &Cart| cart.customer_id == customer_id && cart.status == CartStatus::Active,
            ErrorInfo::conflict(format!("Customer {customer_id} already has an active cart.")),
        );
        add_entity(Cart::open(customer_id))
    }
}

/// Adds `quantity` of a variant at its current price.
pub fn add_item(cart_id: Uuid, variant_id: Uuid, quantity: u32) -> ShopPipeline<Cart> {
    pipeline! {
        variant <= get_entity(
            move |variant: &Variant| variant.id == variant_id,
            ErrorInfo::not_found(format!("Variant {variant_id} was not found.")),
            QueryOptions::new().as_no_tracking(),
        );
        update_cart(cart_id, move |cart| cart.add_item(&variant, quantity))
    }
}

/// Redeems a coupon and applies its discount in one transaction.
///
/// When the cart rejects the coupon, the redemption is rolled back with it.
pub fn apply_coupon(cart_id: Uuid, code: &str) -> ShopPipeline<Cart> {
    pipeline! {
        coupon <= redeem(code);
        update_cart(cart_id, move |cart| cart.apply_coupon(&coupon))
    }
}

/// Checks the cart out, raising `CartCheckedOut` with its total.
pub fn checkout(cart_id: Uuid) -> ShopPipeline<Cart> {
    update_cart(cart_id, Cart::checkout)
}

/// Reads a cart.
pub fn get_cart(cart_id: Uuid) -> ShopPipeline<Cart> {
    get_entity(
        move |cart: &Cart| cart.id == cart_id,
        cart_not_found(cart_id),
        QueryOptions::new().as_no_tracking(),
    )
}
