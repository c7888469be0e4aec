//! One-time passcodes for e-mail verification

use rand::Rng;
use subtle::ConstantTimeEq;

/// Number of digits in a passcode
pub const OTP_LENGTH: usize = 6;

/// Generate a six-digit passcode, uniform in 100000..=999999
pub fn generate_otp() -> String {
    rand::thread_rng().gen_range(100_000..=999_999u32).to_string()
}

/// Compare a stored passcode with user input.
///
/// Surrounding whitespace in the input is ignored; a missing stored code never matches.
pub fn otp_matches(stored: Option<&str>, provided: &str) -> bool {
    match stored {
        Some(stored) if stored.len() == OTP_LENGTH => {
            bool::from(stored.as_bytes().ct_eq(provided.trim().as_bytes()))
        }
        _ => false,
    }
}
