//! Domain building blocks for directory change notifications.
//!
//! Everything here is pure logic with no I/O: the event model, the
//! recipient policy, the key-mismatch suppression window and the
//! environment-driven configuration.

pub mod config;
pub mod error;
pub mod event;
pub mod policy;
pub mod privileges;
pub mod suppression;
pub mod types;
