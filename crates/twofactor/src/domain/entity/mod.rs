//! Domain Entities

pub mod enrollment;
