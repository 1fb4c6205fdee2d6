//! sea-orm entities owned by the auth service.

pub mod audit_events;
pub mod backup_codes;
pub mod identities;
pub mod otp_codes;
pub mod otp_rate_limits;
pub mod refresh_tokens;
pub mod totp_attempts;
