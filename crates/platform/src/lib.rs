//! Platform Crate - Technical Infrastructure
//!
//! Shared technical foundations for the two-factor authentication backend:
//! - Cryptographic utilities (SHA-256, salted hashing, Base64)
//! - Random code generation (numeric and human-transcribable alphabets)

pub mod crypto;
