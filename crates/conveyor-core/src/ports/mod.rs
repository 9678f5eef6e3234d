//! Ports: interfaces to the external collaborators.
//!
//! Each trait hides one collaborator behind a narrow contract so the
//! engine and executors stay testable against in-memory fakes:
//! - [`ExecutionStore`]: execution records (the source of truth)
//! - [`ProductCatalog`]: price/stock lookups
//! - [`OrderStatusStore`]: the denormalized order table
//! - [`PaymentGateway`]: the payment collaborator
//! - [`NotificationSink`]: terminal-outcome publishing
//! - [`Clock`] / [`IdGenerator`]: time and ID minting

pub mod catalog;
pub mod clock;
pub mod execution_store;
pub mod id_generator;
pub mod order_store;
pub mod payment;
pub mod sink;

pub use self::catalog::{CatalogError, Product, ProductCatalog};
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::execution_store::ExecutionStore;
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::order_store::{OrderStatusStore, UpdateError};
pub use self::payment::{ChargeReceipt, ChargeRequest, PaymentError, PaymentGateway};
pub use self::sink::{NotificationSink, PublishError};
