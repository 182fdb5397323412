//! Dependency container for the shop.
//!
//! [`Shop`] owns the store, the transaction runner and the adapters, and is
//! the one place that knows how a handler's pipeline is executed.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use storefront::persistence::Tables;
use storefront::prelude::*;
use tracing::info;

use super::images::{ImageStore, InMemoryImageStore};
use super::messaging::{IntegrationEvent, IntegrationOutbox};
use super::payment_gateway::{FakePaymentGateway, PaymentGateway};
use crate::application::ShopPipeline;
use crate::application::cart;
use crate::domain::cart::Cart;
use crate::domain::catalog::{Product, ProductImage, Variant};

/// Registers the eager-load paths product queries may request.
pub fn register_includes(store: &MemoryStore) {
    store.register_include("variants", |product: &mut Product, tables: &Tables| {
        product.variants = tables
            .rows::<Variant>()
            .iter()
            .filter(|variant| variant.product_id == product.id)
            .cloned()
            .collect();
        Ok(())
    });
    store.register_include("images", |product: &mut Product, tables: &Tables| {
        let mut images: Vec<ProductImage> = tables
            .rows::<ProductImage>()
            .iter()
            .filter(|image| image.product_id == product.id)
            .cloned()
            .collect();
        images.sort_by_key(|image| image.position);
        product.images = images;
        Ok(())
    });
}

/// Receipt request published after a successful checkout.
#[derive(Debug, Clone, Serialize)]
struct ReceiptRequested {
    customer_id: uuid::Uuid,
    cart_id: uuid::Uuid,
    total: rust_decimal::Decimal,
    lines: usize,
}

/// The shop's wiring.
///
/// Cheap to clone; every clone shares the same store and adapters.
#[derive(Clone)]
pub struct Shop {
    store: MemoryStore,
    runner: TransactionRunner,
    images: Arc<dyn ImageStore>,
    gateway: Arc<dyn PaymentGateway>,
    outbox: IntegrationOutbox,
}

impl Shop {
    /// A shop with in-memory adapters.
    pub fn new(config: PipelineConfig) -> Self {
        Self::with_adapters(
            config,
            Arc::new(InMemoryImageStore::default()),
            Arc::new(FakePaymentGateway::new()),
            ActorSource::anonymous(),
        )
    }

    /// A shop with the given adapters and audit actor.
    pub fn with_adapters(
        config: PipelineConfig,
        images: Arc<dyn ImageStore>,
        gateway: Arc<dyn PaymentGateway>,
        actor: ActorSource,
    ) -> Self {
        let store = MemoryStore::new();
        register_includes(&store);
        let outbox = IntegrationOutbox::new();
        let runner = TransactionRunner::new(config)
            .with_actor_source(actor)
            .with_subscriber(outbox.clone());
        Self {
            store,
            runner,
            images,
            gateway,
            outbox,
        }
    }

    pub const fn store(&self) -> &MemoryStore {
        &self.store
    }

    pub const fn runner(&self) -> &TransactionRunner {
        &self.runner
    }

    pub fn config(&self) -> &PipelineConfig {
        self.runner.config()
    }

    pub fn images(&self) -> Arc<dyn ImageStore> {
        Arc::clone(&self.images)
    }

    pub fn gateway(&self) -> Arc<dyn PaymentGateway> {
        Arc::clone(&self.gateway)
    }

    pub const fn outbox(&self) -> &IntegrationOutbox {
        &self.outbox
    }

    /// Runs a write handler in its own transaction.
    ///
    /// # Errors
    ///
    /// Returns the handler's failure; nothing is committed in that case.
    pub async fn execute<T>(&self, pipeline: ShopPipeline<T>) -> Fin<T>
    where
        T: Send + 'static,
    {
        self.runner
            .run_save(pipeline, self.store.context(), CancellationToken::new())
            .await
    }

    /// Runs a read handler. Nothing is committed.
    ///
    /// # Errors
    ///
    /// Returns the handler's failure.
    pub async fn query<T>(&self, pipeline: ShopPipeline<T>) -> Fin<T>
    where
        T: Send + 'static,
    {
        self.runner
            .run(pipeline, self.store.context(), CancellationToken::new())
            .await
    }

    /// Checks a cart out, then asks for a receipt through the outbox.
    ///
    /// A failed receipt request is reported in `post_commit` and does not
    /// undo the checkout.
    ///
    /// # Errors
    ///
    /// Returns the checkout's failure.
    pub async fn checkout(&self, cart_id: uuid::Uuid) -> Fin<Committed<Cart>> {
        let outbox = self.outbox.clone();
        let committed = self
            .runner
            .run_save_and_raise(
                cart::checkout(cart_id),
                self.store.context(),
                CancellationToken::new(),
                move |cart: &Cart| {
                    let receipt = ReceiptRequested {
                        customer_id: cart.customer_id,
                        cart_id: cart.id,
                        total: cart.total(),
                        lines: cart.lines.len(),
                    };
                    match IntegrationEvent::new("notifications.receipt_requested", "Cart", cart.id.to_string(), &receipt) {
                        Ok(event) => outbox.publish(event),
                        Err(error) => Effect::fail(error),
                    }
                },
            )
            .await?;
        info!(cart_id = %cart_id, total = %committed.value.total(), "cart checked out");
        Ok(committed)
    }
}

impl fmt::Debug for Shop {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Shop")
            .field("store", &self.store)
            .field("images", &self.images)
            .field("gateway", &self.gateway)
            .finish_non_exhaustive()
    }
}
