//! Domain Value Objects

pub mod backup_code;
pub mod destination;
pub mod method;
pub mod totp_secret;
pub mod user_id;

pub use backup_code::BackupCode;
pub use destination::Destination;
pub use method::Method;
pub use totp_secret::TotpSecret;
pub use user_id::UserId;
