//! Shop Sample Application Entry Point
//!
//! Runs one end-to-end purchase against the in-memory shop and logs every
//! step.

use rust_decimal::Decimal;
use shop::application::{cart, catalog, identity, orders, payments, shipments};
use shop::domain::catalog::{NewProduct, NewVariant, ProductStatus};
use shop::domain::identity::Registration;
use shop::domain::shipment::ShipmentStatus;
use shop::infrastructure::Shop;
use storefront::prelude::*;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Load .env before reading configuration
    if let Err(error) = dotenvy::dotenv() {
        eprintln!("No .env file loaded: {error}");
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,shop=debug,storefront=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Shop Sample Application...");

    let config = match PipelineConfig::from_env() {
        Ok(config) => {
            tracing::info!(
                "Configuration loaded: system_actor={}, max_page_size={}",
                config.system_actor,
                config.max_page_size
            );
            config
        }
        Err(e) => {
            tracing::warn!("Failed to load configuration from environment: {e}");
            tracing::info!("Using default configuration");
            PipelineConfig::default()
        }
    };

    let shop = Shop::new(config);
    if let Err(error) = run_purchase(&shop).await {
        tracing::error!(kind = %error.kind(), "purchase failed: {error}");
        std::process::exit(1);
    }

    tracing::info!(published = ?shop.outbox().names(), "Shop Sample Application finished");
}

async fn run_purchase(shop: &Shop) -> Fin<()> {
    let customer = shop
        .execute(identity::register_customer(Registration {
            name: "Ada Lovelace".to_owned(),
            email: "ada@example.com".to_owned(),
        }))
        .await?;

    let product = shop
        .execute(catalog::create_product(
            NewProduct {
                name: "Enamel Mug".to_owned(),
                slug: "enamel-mug".to_owned(),
                variants: vec![
                    NewVariant {
                        sku: "MUG-WHITE".to_owned(),
                        name: "White".to_owned(),
                        price: Decimal::new(1800, 2),
                    },
                    NewVariant {
                        sku: "MUG-BLUE".to_owned(),
                        name: "Blue".to_owned(),
                        price: Decimal::new(2000, 2),
                    },
                ],
                cover_image: Some(b"enamel-mug.png".to_vec()),
            },
            shop.images(),
        ))
        .await?;
    shop.execute(catalog::change_product_status(product.id, ProductStatus::Active))
        .await?;

    let listing = shop
        .query(catalog::list_products(
            catalog::ProductQuery {
                page: 1,
                size: 10,
                includes: "variants, images".to_owned(),
                ..catalog::ProductQuery::default()
            },
            shop.config(),
        ))
        .await?;
    tracing::info!(total = listing.total_count, "catalog listed");

    let variant_id = product.variants[0].id;
    let basket = shop.execute(cart::create_cart(customer.id)).await?;
    shop.execute(cart::add_item(basket.id, variant_id, 2)).await?;
    shop.checkout(basket.id).await?;

    let order = shop.execute(orders::place_order(basket.id)).await?;
    shop.execute(payments::capture_payment(order.id, shop.gateway()))
        .await?;

    let shipment = shop.execute(shipments::create_shipment(order.id)).await?;
    shop.execute(shipments::advance_shipment(
        shipment.id,
        ShipmentStatus::Shipped,
        Some("JP123456789".to_owned()),
    ))
    .await?;

    let order = shop.query(orders::get_order(order.id)).await?;
    tracing::info!(order_id = %order.id, status = %order.status, total = %order.total, "purchase complete");
    Ok(())
}
