//! Shared fixtures for the shop integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use rust_decimal::Decimal;
use shop::application::{cart, catalog, identity};
use shop::domain::cart::Cart;
use shop::domain::catalog::{NewProduct, NewVariant, Product};
use shop::domain::identity::{Customer, Registration};
use shop::infrastructure::{FakePaymentGateway, InMemoryImageStore, Shop};
use storefront::prelude::*;

pub const ACTOR: &str = "tester";

/// A shop plus handles on its concrete adapters.
pub struct Fixture {
    pub shop: Shop,
    pub images: InMemoryImageStore,
    pub gateway: FakePaymentGateway,
}

pub fn fixture() -> Fixture {
    let images = InMemoryImageStore::new("https://cdn.test");
    let gateway = FakePaymentGateway::new();
    let shop = Shop::with_adapters(
        PipelineConfig::default(),
        Arc::new(images.clone()),
        Arc::new(gateway.clone()),
        ActorSource::fixed(ACTOR),
    );
    Fixture { shop, images, gateway }
}

pub fn variant(sku: &str, cents: i64) -> NewVariant {
    NewVariant {
        sku: sku.to_owned(),
        name: sku.to_lowercase(),
        price: Decimal::new(cents, 2),
    }
}

/// A mug with a 12.50 and a 15.00 variant and a cover image.
pub fn mug(slug: &str) -> NewProduct {
    NewProduct {
        name: format!("Mug {slug}"),
        slug: slug.to_owned(),
        variants: vec![variant("MUG-S", 1250), variant("MUG-L", 1500)],
        cover_image: Some(vec![0x89, 0x50, 0x4e, 0x47]),
    }
}

pub async fn register(shop: &Shop, email: &str) -> Customer {
    shop.execute(identity::register_customer(Registration {
        name: "Grace Hopper".to_owned(),
        email: email.to_owned(),
    }))
    .await
    .unwrap()
}

pub async fn create_mug(shop: &Shop, slug: &str) -> Product {
    shop.execute(catalog::create_product(mug(slug), shop.images()))
        .await
        .unwrap()
}

/// A registered customer, a two-variant product and an empty active cart.
pub async fn empty_cart(shop: &Shop) -> (Customer, Product, Cart) {
    let customer = register(shop, "grace@example.com").await;
    let product = create_mug(shop, "mug").await;
    let cart = shop.execute(cart::create_cart(customer.id)).await.unwrap();
    (customer, product, cart)
}

pub fn count(names: &[String], name: &str) -> usize {
    names.iter().filter(|candidate| *candidate == name).count()
}
