//! Domain model (IDs, orders, outcomes, execution records, errors).

pub mod errors;
pub mod execution;
pub mod ids;
pub mod order;
pub mod outcome;

pub use errors::{EngineError, StoreError};
pub use execution::{Execution, ExecutionResult, HistoryEntry, StepRecord};
pub use ids::{ExecutionId, Id, IdMarker, OrderId};
pub use order::{Order, OrderItem, OrderStatus};
pub use outcome::{ERROR_TAG, ErrorClass, SUCCESS_TAG, StepError, StepOutcome};
