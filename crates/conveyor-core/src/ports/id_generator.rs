//! IdGenerator port: execution ID minting.
//!
//! ULIDs sort by timestamp and need no coordination between nodes. The
//! generator takes its timestamp from a [`Clock`] so tests with a pinned
//! clock get IDs with a pinned time component.

use ulid::Ulid;

use crate::domain::ids::ExecutionId;
use crate::ports::Clock;

pub trait IdGenerator: Send + Sync {
    fn execution_id(&self) -> ExecutionId;
}

/// ULID-based generator over a [`Clock`].
pub struct UlidGenerator<C> {
    clock: C,
}

impl<C: Clock> UlidGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }
}

impl<C: Clock> IdGenerator for UlidGenerator<C> {
    fn execution_id(&self) -> ExecutionId {
        let timestamp_ms = self.clock.now().timestamp_millis() as u64;
        ExecutionId::from(Ulid::from_parts(timestamp_ms, rand::random()))
    }
}
