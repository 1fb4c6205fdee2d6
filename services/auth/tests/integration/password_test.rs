use chrono::{Duration, Utc};

use campus_auth::domain::types::{AccountStatus, MAX_FAILED_LOGINS};
use campus_auth::error::AuthError;
use campus_auth::usecase::password::{
    PasswordLoginInput, PasswordLoginOutcome, PasswordLoginUseCase,
};

use crate::helpers::{
    MockAuditSink, MockIdentityRepo, MockPermissions, MockRefreshRepo, TEST_TENANT,
    identity_with_password, test_identity, test_signer,
};

fn login_input(email: &str, password: &str) -> PasswordLoginInput {
    PasswordLoginInput {
        tenant_id: TEST_TENANT,
        email: email.to_owned(),
        password: password.to_owned(),
        ip: "203.0.113.10".to_owned(),
        user_agent: "integration-test".to_owned(),
    }
}

fn usecase(
    identities: MockIdentityRepo,
    refresh: MockRefreshRepo,
    audit: MockAuditSink,
) -> PasswordLoginUseCase<MockIdentityRepo, MockRefreshRepo, MockPermissions, MockAuditSink> {
    PasswordLoginUseCase {
        identities,
        refresh_tokens: refresh,
        permissions: MockPermissions::with(&["students:read"]),
        audit,
        signer: test_signer(),
    }
}

#[tokio::test]
async fn should_mint_session_for_valid_password() {
    let identity = identity_with_password("G00d&Enough");
    let identities = MockIdentityRepo::new(vec![identity.clone()]);
    let identities_handle = identities.handle();
    let refresh = MockRefreshRepo::empty();
    let refresh_handle = refresh.handle();
    let audit = MockAuditSink::new();

    let uc = usecase(identities, refresh, audit.clone());
    let outcome = uc
        .execute(login_input("user@example.com", "G00d&Enough"))
        .await
        .unwrap();

    let PasswordLoginOutcome::Session { user_id, tokens } = outcome else {
        panic!("expected a session outcome");
    };
    assert_eq!(user_id, identity.id);

    let claims = test_signer().validate_access_token(&tokens.access_token).unwrap();
    assert_eq!(claims.sub, identity.id.to_string());
    assert_eq!(claims.tid, TEST_TENANT.to_string());
    assert_eq!(claims.perms, vec!["students:read".to_owned()]);

    // Stored record holds the hash, never the raw refresh token.
    let stored = refresh_handle.lock().unwrap();
    assert_eq!(stored.len(), 1);
    assert_ne!(stored[0].token_hash, tokens.refresh_token);

    let identities = identities_handle.lock().unwrap();
    assert!(identities[0].last_login_at.is_some());
    assert!(audit.actions().contains(&"password_login_success"));
}

#[tokio::test]
async fn should_normalize_email_before_lookup() {
    let identity = identity_with_password("G00d&Enough");
    let uc = usecase(
        MockIdentityRepo::new(vec![identity]),
        MockRefreshRepo::empty(),
        MockAuditSink::new(),
    );

    let outcome = uc
        .execute(login_input("  User@Example.COM ", "G00d&Enough"))
        .await;
    assert!(outcome.is_ok(), "expected success, got {outcome:?}");
}

#[tokio::test]
async fn should_reject_wrong_password_and_count_failure() {
    let identity = identity_with_password("G00d&Enough");
    let identities = MockIdentityRepo::new(vec![identity]);
    let identities_handle = identities.handle();

    let uc = usecase(identities, MockRefreshRepo::empty(), MockAuditSink::new());
    let result = uc.execute(login_input("user@example.com", "Wr0ng&Pass")).await;

    assert!(
        matches!(result, Err(AuthError::InvalidPassword)),
        "expected InvalidPassword, got {result:?}"
    );
    assert_eq!(identities_handle.lock().unwrap()[0].failed_attempts, 1);
}

#[tokio::test]
async fn should_lock_account_after_repeated_failures() {
    let identity = identity_with_password("G00d&Enough");
    let identities = MockIdentityRepo::new(vec![identity]);
    let identities_handle = identities.handle();
    let audit = MockAuditSink::new();

    let uc = usecase(identities, MockRefreshRepo::empty(), audit.clone());
    for _ in 0..MAX_FAILED_LOGINS {
        let result = uc.execute(login_input("user@example.com", "Wr0ng&Pass")).await;
        assert!(matches!(result, Err(AuthError::InvalidPassword)));
    }

    {
        let identities = identities_handle.lock().unwrap();
        assert_eq!(identities[0].status, AccountStatus::Locked);
        assert!(identities[0].locked_until.is_some());
    }
    assert!(audit.actions().contains(&"account_locked"));

    // Even the correct password is refused while the lock holds.
    let result = uc.execute(login_input("user@example.com", "G00d&Enough")).await;
    assert!(
        matches!(result, Err(AuthError::AccountLocked)),
        "expected AccountLocked, got {result:?}"
    );
}

#[tokio::test]
async fn should_allow_login_after_lock_lapses() {
    let mut identity = identity_with_password("G00d&Enough");
    identity.status = AccountStatus::Locked;
    identity.failed_attempts = MAX_FAILED_LOGINS;
    identity.locked_until = Some(Utc::now() - Duration::seconds(10));

    let identities = MockIdentityRepo::new(vec![identity]);
    let identities_handle = identities.handle();

    let uc = usecase(identities, MockRefreshRepo::empty(), MockAuditSink::new());
    let outcome = uc.execute(login_input("user@example.com", "G00d&Enough")).await;
    assert!(outcome.is_ok(), "expected success, got {outcome:?}");

    let identities = identities_handle.lock().unwrap();
    assert_eq!(identities[0].status, AccountStatus::Active);
    assert_eq!(identities[0].failed_attempts, 0);
}

#[tokio::test]
async fn should_reject_unknown_user() {
    let uc = usecase(
        MockIdentityRepo::empty(),
        MockRefreshRepo::empty(),
        MockAuditSink::new(),
    );
    let result = uc.execute(login_input("nobody@example.com", "G00d&Enough")).await;
    assert!(
        matches!(result, Err(AuthError::UserNotFound)),
        "expected UserNotFound, got {result:?}"
    );
}

#[tokio::test]
async fn should_reject_inactive_account() {
    let mut identity = identity_with_password("G00d&Enough");
    identity.status = AccountStatus::Inactive;

    let uc = usecase(
        MockIdentityRepo::new(vec![identity]),
        MockRefreshRepo::empty(),
        MockAuditSink::new(),
    );
    let result = uc.execute(login_input("user@example.com", "G00d&Enough")).await;
    assert!(
        matches!(result, Err(AuthError::AccountInactive)),
        "expected AccountInactive, got {result:?}"
    );
}

#[tokio::test]
async fn should_reject_password_attempt_against_passwordless_account() {
    // Provisioned through OTP: no hash stored.
    let identity = test_identity();
    let identities = MockIdentityRepo::new(vec![identity]);
    let identities_handle = identities.handle();

    let uc = usecase(identities, MockRefreshRepo::empty(), MockAuditSink::new());
    let result = uc.execute(login_input("user@example.com", "Anything1!")).await;

    assert!(
        matches!(result, Err(AuthError::InvalidPassword)),
        "expected InvalidPassword, got {result:?}"
    );
    // Still charged against the lockout counter.
    assert_eq!(identities_handle.lock().unwrap()[0].failed_attempts, 1);
}

#[tokio::test]
async fn should_require_second_factor_when_totp_enabled() {
    let mut identity = identity_with_password("G00d&Enough");
    identity.totp_enabled = true;

    let refresh = MockRefreshRepo::empty();
    let refresh_handle = refresh.handle();

    let uc = usecase(
        MockIdentityRepo::new(vec![identity.clone()]),
        refresh,
        MockAuditSink::new(),
    );
    let outcome = uc
        .execute(login_input("user@example.com", "G00d&Enough"))
        .await
        .unwrap();

    assert!(
        matches!(outcome, PasswordLoginOutcome::SecondFactorRequired { user_id } if user_id == identity.id),
        "expected SecondFactorRequired, got {outcome:?}"
    );
    // No session exists until the second factor clears.
    assert!(refresh_handle.lock().unwrap().is_empty());
}

#[tokio::test]
async fn should_succeed_even_when_audit_sink_is_down() {
    let identity = identity_with_password("G00d&Enough");
    let uc = usecase(
        MockIdentityRepo::new(vec![identity]),
        MockRefreshRepo::empty(),
        MockAuditSink::failing(),
    );
    let outcome = uc.execute(login_input("user@example.com", "G00d&Enough")).await;
    assert!(outcome.is_ok(), "expected success, got {outcome:?}");
}
