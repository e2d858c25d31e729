//! Event adapter emitting pipeline events as structured log records.

use crate::domain::strategy::Status;
use crate::ports::event_port::EventPort;
use tracing::info;

pub struct TraceEventAdapter;

impl EventPort for TraceEventAdapter {
    fn status_changed(&self, strategy_id: &str, status: Status) {
        info!(strategy = strategy_id, status = status.label(), "status changed");
    }

    fn pool_changed(&self, strategy_id: &str, admitted: bool, evicted: Option<&str>) {
        info!(strategy = strategy_id, admitted, evicted, "pool membership changed");
    }
}
