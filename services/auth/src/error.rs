/// Password strength rule violations. Each variant is a stable kind so
/// callers can surface specific guidance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PasswordPolicyViolation {
    #[error("password must be at least 8 characters")]
    TooShort,
    #[error("password must be at most 128 characters")]
    TooLong,
    #[error("password must contain an uppercase letter")]
    MissingUppercase,
    #[error("password must contain a lowercase letter")]
    MissingLowercase,
    #[error("password must contain a digit")]
    MissingDigit,
    #[error("password must contain a symbol")]
    MissingSymbol,
}

/// Identity & session core error variants.
///
/// Every public operation returns one of these; callers map kinds 1:1 to
/// user-facing responses. The core never picks transport status codes.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    // identity
    #[error("user not found")]
    UserNotFound,
    #[error("account locked")]
    AccountLocked,
    #[error("account inactive")]
    AccountInactive,

    // credential
    #[error("invalid password")]
    InvalidPassword,
    #[error("malformed password hash")]
    MalformedPasswordHash,
    #[error(transparent)]
    PasswordPolicy(#[from] PasswordPolicyViolation),

    // access token
    #[error("token expired")]
    TokenExpired,
    #[error("token not yet valid")]
    TokenNotYetValid,
    #[error("token signing algorithm mismatch")]
    TokenAlgorithmMismatch,
    #[error("invalid token")]
    TokenInvalid,

    // otp
    #[error("otp expired")]
    OtpExpired,
    #[error("invalid otp code")]
    OtpInvalid,
    #[error("otp max attempts exceeded")]
    OtpMaxAttempts,
    #[error("otp rate limited")]
    OtpRateLimited,
    #[error("otp cooldown active")]
    OtpCooldown,
    #[error("invalid identifier")]
    InvalidIdentifier,
    #[error("otp delivery failed")]
    OtpSendFailed,

    // totp
    #[error("totp not set up")]
    TotpNotSetup,
    #[error("totp already enabled")]
    TotpAlreadyEnabled,
    #[error("totp not enabled")]
    TotpNotEnabled,
    #[error("invalid totp code")]
    TotpInvalidCode,
    #[error("totp rate limited")]
    TotpRateLimited,

    // refresh
    #[error("refresh token not found")]
    RefreshNotFound,
    #[error("refresh token expired")]
    RefreshExpired,
    #[error("refresh token revoked")]
    RefreshRevoked,

    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl AuthError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UserNotFound => "USER_NOT_FOUND",
            Self::AccountLocked => "ACCOUNT_LOCKED",
            Self::AccountInactive => "ACCOUNT_INACTIVE",
            Self::InvalidPassword => "INVALID_PASSWORD",
            Self::MalformedPasswordHash => "MALFORMED_PASSWORD_HASH",
            Self::PasswordPolicy(v) => match v {
                PasswordPolicyViolation::TooShort => "PASSWORD_TOO_SHORT",
                PasswordPolicyViolation::TooLong => "PASSWORD_TOO_LONG",
                PasswordPolicyViolation::MissingUppercase => "PASSWORD_MISSING_UPPERCASE",
                PasswordPolicyViolation::MissingLowercase => "PASSWORD_MISSING_LOWERCASE",
                PasswordPolicyViolation::MissingDigit => "PASSWORD_MISSING_DIGIT",
                PasswordPolicyViolation::MissingSymbol => "PASSWORD_MISSING_SYMBOL",
            },
            Self::TokenExpired => "TOKEN_EXPIRED",
            Self::TokenNotYetValid => "TOKEN_NOT_YET_VALID",
            Self::TokenAlgorithmMismatch => "TOKEN_ALGORITHM_MISMATCH",
            Self::TokenInvalid => "TOKEN_INVALID",
            Self::OtpExpired => "OTP_EXPIRED",
            Self::OtpInvalid => "OTP_INVALID",
            Self::OtpMaxAttempts => "OTP_MAX_ATTEMPTS",
            Self::OtpRateLimited => "OTP_RATE_LIMITED",
            Self::OtpCooldown => "OTP_COOLDOWN",
            Self::InvalidIdentifier => "INVALID_IDENTIFIER",
            Self::OtpSendFailed => "OTP_SEND_FAILED",
            Self::TotpNotSetup => "TOTP_NOT_SETUP",
            Self::TotpAlreadyEnabled => "TOTP_ALREADY_ENABLED",
            Self::TotpNotEnabled => "TOTP_NOT_ENABLED",
            Self::TotpInvalidCode => "TOTP_INVALID_CODE",
            Self::TotpRateLimited => "TOTP_RATE_LIMITED",
            Self::RefreshNotFound => "REFRESH_NOT_FOUND",
            Self::RefreshExpired => "REFRESH_EXPIRED",
            Self::RefreshRevoked => "REFRESH_REVOKED",
            Self::Internal(_) => "INTERNAL",
        }
    }
}
