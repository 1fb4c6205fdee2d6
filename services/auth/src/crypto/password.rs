//! Password hashing and strength validation.
//!
//! Argon2id with fixed parameters and a fresh random salt per hash. The
//! encoded PHC string is self-describing (algorithm, version, parameters,
//! salt, digest), so verification always recomputes with the parameters
//! stored alongside the hash — never with whatever the current defaults
//! happen to be.

use argon2::{
    Algorithm, Argon2, Params, PasswordHasher, PasswordVerifier, Version,
    password_hash::{PasswordHash, SaltString, rand_core::OsRng},
};

use crate::error::{AuthError, PasswordPolicyViolation};

/// Argon2id memory cost in KiB.
const ARGON2_M_COST: u32 = 19_456;
/// Argon2id iterations.
const ARGON2_T_COST: u32 = 2;
/// Argon2id parallelism.
const ARGON2_P_COST: u32 = 1;
/// Digest length in bytes.
const ARGON2_OUTPUT_LEN: usize = 32;

const PASSWORD_MIN_LEN: usize = 8;
const PASSWORD_MAX_LEN: usize = 128;

fn hasher() -> Argon2<'static> {
    let params = Params::new(ARGON2_M_COST, ARGON2_T_COST, ARGON2_P_COST, Some(ARGON2_OUTPUT_LEN))
        .expect("argon2 params are compile-time constants");
    Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
}

/// Hash a password into a PHC-encoded Argon2id string.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = hasher()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("argon2 hash failure: {e}"))?;
    Ok(hash.to_string())
}

/// Verify a password against a stored encoded hash.
///
/// Parameters are decoded from the stored string; the underlying comparison
/// is constant-time. Outcomes are distinct: ok, `InvalidPassword`, or
/// `MalformedPasswordHash` when the stored string cannot be parsed.
pub fn verify_password(password: &str, encoded: &str) -> Result<(), AuthError> {
    let parsed = PasswordHash::new(encoded).map_err(|_| AuthError::MalformedPasswordHash)?;
    hasher()
        .verify_password(password.as_bytes(), &parsed)
        .map_err(|e| match e {
            argon2::password_hash::Error::Password => AuthError::InvalidPassword,
            _ => AuthError::MalformedPasswordHash,
        })
}

/// Enforce the password strength policy. Returns the first violation found,
/// checked in a stable order: length, uppercase, lowercase, digit, symbol.
pub fn validate_strength(password: &str) -> Result<(), PasswordPolicyViolation> {
    let len = password.chars().count();
    if len < PASSWORD_MIN_LEN {
        return Err(PasswordPolicyViolation::TooShort);
    }
    if len > PASSWORD_MAX_LEN {
        return Err(PasswordPolicyViolation::TooLong);
    }
    if !password.chars().any(|c| c.is_uppercase()) {
        return Err(PasswordPolicyViolation::MissingUppercase);
    }
    if !password.chars().any(|c| c.is_lowercase()) {
        return Err(PasswordPolicyViolation::MissingLowercase);
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(PasswordPolicyViolation::MissingDigit);
    }
    if !password.chars().any(|c| !c.is_alphanumeric() && !c.is_whitespace()) {
        return Err(PasswordPolicyViolation::MissingSymbol);
    }
    Ok(())
}
