//! Built-in handler variants.

pub mod send_email;
pub mod update_expiry;

pub use send_email::SendEmail;
pub use update_expiry::UpdateExpiryDate;
