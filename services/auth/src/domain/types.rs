use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

/// Account lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountStatus {
    Active,
    Inactive,
    Locked,
}

impl AccountStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Locked => "locked",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(Self::Active),
            "inactive" => Some(Self::Inactive),
            "locked" => Some(Self::Locked),
            _ => None,
        }
    }
}

/// What an OTP proves: a login, or ownership of a contact identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpPurpose {
    Login,
    Verify,
}

impl OtpPurpose {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::Verify => "verify",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "login" => Some(Self::Login),
            "verify" => Some(Self::Verify),
            _ => None,
        }
    }
}

/// Out-of-band delivery channel for OTPs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpChannel {
    Sms,
    Email,
}

impl OtpChannel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sms => "sms",
            Self::Email => "email",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "sms" => Some(Self::Sms),
            "email" => Some(Self::Email),
            _ => None,
        }
    }
}

/// Identity record as seen by the auth core.
///
/// `locked_until` and the 2FA fields keep "absent" distinct from any zero
/// value — an unset timestamp never means epoch.
#[derive(Debug, Clone)]
pub struct Identity {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub email: Option<String>,
    pub phone: Option<String>,
    /// PHC-encoded Argon2id hash; `None` for passwordless accounts.
    pub password_hash: Option<String>,
    pub status: AccountStatus,
    pub failed_attempts: i32,
    pub locked_until: Option<DateTime<Utc>>,
    pub totp_enabled: bool,
    /// Encrypted blob of the confirmed TOTP secret.
    pub totp_secret_enc: Option<String>,
    /// Encrypted secret awaiting first-code confirmation.
    pub totp_pending_secret_enc: Option<String>,
    pub totp_enabled_at: Option<DateTime<Utc>>,
    pub email_verified_at: Option<DateTime<Utc>>,
    pub phone_verified_at: Option<DateTime<Utc>>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Identity {
    /// Whether the account is currently locked. A `locked` status with a
    /// lapsed `locked_until` no longer counts.
    pub fn is_locked(&self, now: DateTime<Utc>) -> bool {
        match self.status {
            AccountStatus::Locked => self.locked_until.is_none_or(|until| until > now),
            _ => false,
        }
    }
}

/// Stored refresh token (hash only; the raw value never touches storage).
#[derive(Debug, Clone)]
pub struct RefreshTokenRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl RefreshTokenRecord {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Stored one-time passcode (hash only).
#[derive(Debug, Clone)]
pub struct OtpCode {
    pub id: Uuid,
    pub identifier: String,
    pub purpose: OtpPurpose,
    pub channel: OtpChannel,
    pub code_hash: String,
    pub expires_at: DateTime<Utc>,
    pub verified_at: Option<DateTime<Utc>>,
    pub attempts: i32,
    pub created_at: DateTime<Utc>,
}

impl OtpCode {
    /// Live = unexpired and not yet consumed.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.verified_at.is_none() && self.expires_at > now
    }
}

/// Outcome of an atomic rate-limit consume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed,
    /// Minimum interval between sends has not elapsed.
    Cooldown,
    /// Rolling-window cap exceeded.
    Limited,
}

/// OTP send limits: rolling-window cap plus minimum inter-send cooldown.
#[derive(Debug, Clone, Copy)]
pub struct RatePolicy {
    pub window_secs: i64,
    pub max_requests: i32,
    pub cooldown_secs: i64,
}

impl RatePolicy {
    /// Whether a window that started at `window_started_at` is over,
    /// meaning the next request begins a fresh one.
    pub fn window_lapsed(&self, window_started_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        now - window_started_at >= Duration::seconds(self.window_secs)
    }

    /// Whether the minimum inter-send interval since `last_request_at` has
    /// not yet elapsed.
    pub fn in_cooldown(&self, last_request_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        now - last_request_at < Duration::seconds(self.cooldown_secs)
    }

    /// Judge one request against recorded counter state. The cooldown is
    /// checked first: it binds between consecutive sends even when the
    /// rolling window lapses in between. A lapsed window admits the
    /// request and starts a fresh window; otherwise the count decides.
    pub fn evaluate(
        &self,
        request_count: i32,
        window_started_at: DateTime<Utc>,
        last_request_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> RateLimitDecision {
        if self.in_cooldown(last_request_at, now) {
            return RateLimitDecision::Cooldown;
        }
        if self.window_lapsed(window_started_at, now) {
            return RateLimitDecision::Allowed;
        }
        if request_count < self.max_requests {
            RateLimitDecision::Allowed
        } else {
            RateLimitDecision::Limited
        }
    }
}

impl Default for RatePolicy {
    fn default() -> Self {
        Self {
            window_secs: OTP_RATE_LIMIT_WINDOW_SECS,
            max_requests: OTP_RATE_LIMIT_MAX,
            cooldown_secs: OTP_COOLDOWN_SECS,
        }
    }
}

/// Single-use 2FA recovery code (hash only).
#[derive(Debug, Clone)]
pub struct BackupCode {
    pub id: Uuid,
    pub user_id: Uuid,
    pub code_hash: String,
    pub used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Append-only security audit event.
#[derive(Debug, Clone)]
pub struct AuditEvent {
    pub action: &'static str,
    pub user_id: Option<Uuid>,
    pub tenant_id: Option<Uuid>,
    pub ip: String,
    pub user_agent: String,
    pub timestamp: DateTime<Utc>,
}

/// Authenticated-session output: the only secrets this core hands outward.
#[derive(Debug, Clone)]
pub struct SessionTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

/// OTP code length in digits.
pub const OTP_CODE_LEN: usize = 6;

/// OTP time-to-live in seconds.
pub const OTP_TTL_SECS: i64 = 300;

/// Maximum verification attempts per OTP before it is permanently rejected.
pub const OTP_MAX_ATTEMPTS: i32 = 5;

/// OTP requests allowed per identifier + channel per rolling window.
pub const OTP_RATE_LIMIT_MAX: i32 = 5;

/// OTP rate-limit window in seconds (1 hour).
pub const OTP_RATE_LIMIT_WINDOW_SECS: i64 = 3600;

/// Minimum interval between consecutive OTP sends in seconds.
pub const OTP_COOLDOWN_SECS: i64 = 60;

/// Number of backup codes issued per set.
pub const BACKUP_CODE_COUNT: usize = 8;

/// Failed password attempts before the account locks.
pub const MAX_FAILED_LOGINS: i32 = 5;

/// Account lock duration after hitting the failure threshold, in seconds.
pub const LOCKOUT_SECS: i64 = 900;

/// TOTP login attempts allowed per user per rolling window.
pub const TOTP_ATTEMPTS_PER_USER: u64 = 10;

/// TOTP login attempts allowed per caller IP per rolling window.
pub const TOTP_ATTEMPTS_PER_IP: u64 = 20;

/// TOTP attempt rate-limit window in seconds (5 minutes).
pub const TOTP_ATTEMPT_WINDOW_SECS: i64 = 300;
