//! Pipeline event port trait.
//!
//! Status transitions and pool membership changes are consumed by
//! external collectors; the core only emits them.

use crate::domain::strategy::Status;

pub trait EventPort: Send + Sync {
    fn status_changed(&self, strategy_id: &str, status: Status);

    fn pool_changed(&self, strategy_id: &str, admitted: bool, evicted: Option<&str>);
}

/// Drops every event; used where no collector is wired up.
pub struct NullEventSink;

impl EventPort for NullEventSink {
    fn status_changed(&self, _strategy_id: &str, _status: Status) {}

    fn pool_changed(&self, _strategy_id: &str, _admitted: bool, _evicted: Option<&str>) {}
}
