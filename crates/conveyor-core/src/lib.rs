//! Conveyor: a durable order-processing workflow engine.
//!
//! An order enters as a `PENDING` row and is driven through a declarative
//! state graph (validate, charge, persist, notify) by [`engine::WorkflowEngine`].
//! Each execution is recorded step by step in an append-only history with a
//! write-once terminal result, every store write is a conditional update,
//! and duplicate deliveries of the same order are rejected while a run is
//! in flight.
//!
//! Layout:
//! - [`domain`]: orders, executions, outcomes, errors
//! - [`ports`]: traits for the external collaborators
//! - [`executors`]: the pluggable units of work
//! - [`engine`]: definitions, retry policies, the driver, and the concrete
//!   order workflow
//! - [`impls`]: in-memory adapters for tests and the demo binary

pub mod domain;
pub mod engine;
pub mod executors;
pub mod impls;
pub mod ports;
