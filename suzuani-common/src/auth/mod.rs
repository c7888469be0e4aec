//! Authentication primitives
//!
//! Pure functions only; HTTP wiring (cookies, extractors) lives in the web crate.
//!
//! - [`password`]: salted, iterated SHA-256 password digests
//! - [`otp`]: six-digit e-mail verification codes
//! - [`reset_token`]: HMAC-signed, time-limited password reset tokens
//! - [`session_token`]: opaque login session tokens

pub mod otp;
pub mod password;
pub mod reset_token;
pub mod session_token;

pub use otp::{generate_otp, otp_matches};
pub use password::{hash_password, verify_password, PasswordHash};
pub use reset_token::ResetTokenError;
