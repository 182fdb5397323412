//! Infrastructure layer.
//!
//! In-process adapters for the ports the application layer calls, the
//! integration outbox, and the dependency container that wires them to a
//! store and a transaction runner.

pub mod dependencies;
pub mod images;
pub mod messaging;
pub mod payment_gateway;

pub use dependencies::{Shop, register_includes};
pub use images::{ImageStore, ImageStoreError, InMemoryImageStore};
pub use messaging::{IntegrationEvent, IntegrationOutbox, to_integration_event};
pub use payment_gateway::{CaptureRequest, FakePaymentGateway, GatewayError, GatewayReceipt, PaymentGateway};
