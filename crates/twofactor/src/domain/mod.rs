//! Domain Layer - Business logic and entities
//!
//! This layer contains:
//! - Domain entities (EnrollmentRecord, PendingChallenge)
//! - Domain value objects (UserId, Method, TotpSecret, Destination, BackupCode)
//! - Domain services (code generation, backup-code vault)
//! - Repository and audit traits (interfaces)

pub mod audit;
pub mod entity;
pub mod repository;
pub mod services;
pub mod value_object;
