//! Infrastructure Layer - Storage and sink implementations

pub mod memory;
