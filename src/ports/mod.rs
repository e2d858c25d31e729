//! Port traits decoupling the domain from adapters.

pub mod config_port;
pub mod data_port;
pub mod event_port;
