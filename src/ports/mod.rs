//! Port traits the CLI drives; concrete implementations live in
//! [`crate::adapters`].

pub mod data_port;
pub mod signal_port;
