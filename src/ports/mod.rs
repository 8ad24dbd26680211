//! Ports: traits the domain needs the outside world to implement.

pub mod config_port;
pub mod data_port;
