//! Application Layer
//!
//! This layer orchestrates domain logic and infrastructure:
//! the manager, channel implementations, and configuration.

pub mod channel;
pub mod config;
pub mod manager;
