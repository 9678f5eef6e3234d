//! In-memory implementations of the ports.
//!
//! Used by the test suites and the demo binary; production deployments
//! supply real adapters behind the same traits.

pub mod catalog;
pub mod gateway;
pub mod memory;
pub mod sink;

pub use self::catalog::InMemoryCatalog;
pub use self::gateway::MockPaymentGateway;
pub use self::memory::{InMemoryExecutionStore, InMemoryOrderStatusStore};
pub use self::sink::RecordingSink;
