use campus_auth::domain::types::{
    OTP_MAX_ATTEMPTS, OtpChannel, OtpPurpose, RateLimitDecision, RatePolicy,
};
use campus_auth::error::AuthError;
use campus_auth::usecase::otp::{
    RequestOtpInput, RequestOtpUseCase, VerifyOtpInput, VerifyOtpUseCase,
};

use crate::helpers::{
    MockAuditSink, MockIdentityRepo, MockNotifier, MockOtpRepo, MockPermissions,
    MockRateLimitRepo, MockRefreshRepo, TEST_TENANT, test_identity, test_signer,
};

fn request_input(identifier: &str, channel: OtpChannel) -> RequestOtpInput {
    RequestOtpInput {
        identifier: identifier.to_owned(),
        purpose: OtpPurpose::Login,
        channel,
        ip: "203.0.113.10".to_owned(),
        user_agent: "integration-test".to_owned(),
    }
}

fn verify_input(identifier: &str, code: &str, channel: OtpChannel) -> VerifyOtpInput {
    VerifyOtpInput {
        tenant_id: TEST_TENANT,
        identifier: identifier.to_owned(),
        code: code.to_owned(),
        purpose: OtpPurpose::Login,
        channel,
        ip: "203.0.113.10".to_owned(),
        user_agent: "integration-test".to_owned(),
    }
}

fn request_usecase(
    otps: MockOtpRepo,
    rate_limits: MockRateLimitRepo,
    notifier: MockNotifier,
) -> RequestOtpUseCase<MockOtpRepo, MockRateLimitRepo, MockNotifier, MockAuditSink> {
    RequestOtpUseCase {
        otps,
        rate_limits,
        notifier,
        audit: MockAuditSink::new(),
        policy: RatePolicy::default(),
    }
}

fn verify_usecase(
    otps: MockOtpRepo,
    identities: MockIdentityRepo,
) -> VerifyOtpUseCase<MockOtpRepo, MockIdentityRepo, MockRefreshRepo, MockPermissions, MockAuditSink>
{
    VerifyOtpUseCase {
        otps,
        identities,
        refresh_tokens: MockRefreshRepo::empty(),
        permissions: MockPermissions::none(),
        audit: MockAuditSink::new(),
        signer: test_signer(),
    }
}

#[tokio::test]
async fn should_issue_otp_and_dispatch_over_sms() {
    let otps = MockOtpRepo::empty();
    let codes_handle = otps.handle();
    let notifier = MockNotifier::new();
    let sent_handle = notifier.sent_handle();

    let uc = request_usecase(otps, MockRateLimitRepo::allowing(), notifier);
    let output = uc
        .execute(request_input("+1 415-555-2671", OtpChannel::Sms))
        .await
        .unwrap();

    assert_eq!(output.masked_identifier, "****2671");
    assert_eq!(output.expires_in_secs, 300);

    let codes = codes_handle.lock().unwrap();
    assert_eq!(codes.len(), 1);
    assert_eq!(codes[0].identifier, "+14155552671");
    // sha256 hex, not the raw digits.
    assert_eq!(codes[0].code_hash.len(), 64);

    let sent = sent_handle.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "+14155552671");
}

#[tokio::test]
async fn should_reject_malformed_identifier_without_consuming_rate_limit() {
    let rate_limits = MockRateLimitRepo::allowing();
    let consumed = rate_limits.consumed.clone();

    let uc = request_usecase(MockOtpRepo::empty(), rate_limits, MockNotifier::new());
    let result = uc.execute(request_input("not-a-phone", OtpChannel::Sms)).await;

    assert!(
        matches!(result, Err(AuthError::InvalidIdentifier)),
        "expected InvalidIdentifier, got {result:?}"
    );
    assert_eq!(*consumed.lock().unwrap(), 0);
}

#[tokio::test]
async fn should_surface_cooldown_and_window_limit() {
    let uc = request_usecase(
        MockOtpRepo::empty(),
        MockRateLimitRepo::with_decision(RateLimitDecision::Cooldown),
        MockNotifier::new(),
    );
    let result = uc.execute(request_input("jo@example.com", OtpChannel::Email)).await;
    assert!(matches!(result, Err(AuthError::OtpCooldown)));

    let uc = request_usecase(
        MockOtpRepo::empty(),
        MockRateLimitRepo::with_decision(RateLimitDecision::Limited),
        MockNotifier::new(),
    );
    let result = uc.execute(request_input("jo@example.com", OtpChannel::Email)).await;
    assert!(matches!(result, Err(AuthError::OtpRateLimited)));
}

#[tokio::test]
async fn should_invalidate_code_when_dispatch_fails() {
    let otps = MockOtpRepo::empty();
    let codes_handle = otps.handle();

    let uc = request_usecase(otps, MockRateLimitRepo::allowing(), MockNotifier::failing());
    let result = uc.execute(request_input("jo@example.com", OtpChannel::Email)).await;

    assert!(
        matches!(result, Err(AuthError::OtpSendFailed)),
        "expected OtpSendFailed, got {result:?}"
    );
    let codes = codes_handle.lock().unwrap();
    assert!(
        codes.iter().all(|c| !c.is_live(chrono::Utc::now())),
        "an undelivered code must not stay verifiable"
    );
}

#[tokio::test]
async fn should_invalidate_previous_code_on_resend() {
    let otps = MockOtpRepo::empty();
    let codes_handle = otps.handle();
    let notifier = MockNotifier::new();

    let uc = request_usecase(otps, MockRateLimitRepo::allowing(), notifier.clone());
    uc.execute(request_input("jo@example.com", OtpChannel::Email))
        .await
        .unwrap();
    let first_code = notifier.last_code();

    uc.resend(request_input("jo@example.com", OtpChannel::Email))
        .await
        .unwrap();
    let second_code = notifier.last_code();

    let now = chrono::Utc::now();
    let codes = codes_handle.lock().unwrap();
    assert_eq!(codes.len(), 2);
    assert_eq!(codes.iter().filter(|c| c.is_live(now)).count(), 1);
    drop(codes);

    // Only the newest code can still verify.
    let verify = verify_usecase(
        MockOtpRepo {
            codes: codes_handle,
        },
        MockIdentityRepo::empty(),
    );
    let result = verify
        .execute(verify_input("jo@example.com", &first_code, OtpChannel::Email))
        .await;
    assert!(result.is_err(), "stale code must not verify");
    let result = verify
        .execute(verify_input("jo@example.com", &second_code, OtpChannel::Email))
        .await;
    assert!(result.is_ok(), "fresh code must verify, got {result:?}");
}

#[tokio::test]
async fn should_verify_otp_and_provision_identity_on_first_login() {
    let otps = MockOtpRepo::empty();
    let notifier = MockNotifier::new();

    let request = request_usecase(otps.clone(), MockRateLimitRepo::allowing(), notifier.clone());
    request
        .execute(request_input("+14155552671", OtpChannel::Sms))
        .await
        .unwrap();
    let code = notifier.last_code();

    let identities = MockIdentityRepo::empty();
    let identities_handle = identities.handle();
    let verify = verify_usecase(otps, identities);

    let output = verify
        .execute(verify_input("+14155552671", &code, OtpChannel::Sms))
        .await
        .unwrap();

    let identities = identities_handle.lock().unwrap();
    assert_eq!(identities.len(), 1, "first login provisions the identity");
    assert_eq!(identities[0].id, output.user_id);
    assert_eq!(identities[0].phone.as_deref(), Some("+14155552671"));
    assert!(identities[0].phone_verified_at.is_some());
    assert!(identities[0].password_hash.is_none());

    let claims = test_signer()
        .validate_access_token(&output.tokens.access_token)
        .unwrap();
    assert_eq!(claims.sub, output.user_id.to_string());
}

#[tokio::test]
async fn should_fail_verify_purpose_for_unknown_identifier() {
    let otps = MockOtpRepo::empty();
    let notifier = MockNotifier::new();

    let request = RequestOtpUseCase {
        otps: otps.clone(),
        rate_limits: MockRateLimitRepo::allowing(),
        notifier: notifier.clone(),
        audit: MockAuditSink::new(),
        policy: RatePolicy::default(),
    };
    request
        .execute(RequestOtpInput {
            identifier: "jo@example.com".to_owned(),
            purpose: OtpPurpose::Verify,
            channel: OtpChannel::Email,
            ip: "203.0.113.10".to_owned(),
            user_agent: "integration-test".to_owned(),
        })
        .await
        .unwrap();

    let verify = verify_usecase(otps, MockIdentityRepo::empty());
    let result = verify
        .execute(VerifyOtpInput {
            tenant_id: TEST_TENANT,
            identifier: "jo@example.com".to_owned(),
            code: notifier.last_code(),
            purpose: OtpPurpose::Verify,
            channel: OtpChannel::Email,
            ip: "203.0.113.10".to_owned(),
            user_agent: "integration-test".to_owned(),
        })
        .await;

    assert!(
        matches!(result, Err(AuthError::UserNotFound)),
        "verification proof must not provision identities, got {result:?}"
    );
}

#[tokio::test]
async fn should_charge_attempts_and_exhaust_after_max() {
    let otps = MockOtpRepo::empty();
    let codes_handle = otps.handle();
    let notifier = MockNotifier::new();

    let request = request_usecase(otps.clone(), MockRateLimitRepo::allowing(), notifier.clone());
    request
        .execute(request_input("jo@example.com", OtpChannel::Email))
        .await
        .unwrap();
    let good_code = notifier.last_code();
    let wrong_code = if good_code == "000000" { "000001" } else { "000000" };

    let verify = verify_usecase(otps, MockIdentityRepo::empty());

    for attempt in 1..=OTP_MAX_ATTEMPTS {
        let result = verify
            .execute(verify_input("jo@example.com", wrong_code, OtpChannel::Email))
            .await;
        if attempt < OTP_MAX_ATTEMPTS {
            assert!(
                matches!(result, Err(AuthError::OtpInvalid)),
                "attempt {attempt}: expected OtpInvalid, got {result:?}"
            );
        } else {
            assert!(
                matches!(result, Err(AuthError::OtpMaxAttempts)),
                "attempt {attempt}: expected OtpMaxAttempts, got {result:?}"
            );
        }
    }
    assert_eq!(codes_handle.lock().unwrap()[0].attempts, OTP_MAX_ATTEMPTS);

    // Exhausted: even the correct code is refused now.
    let result = verify
        .execute(verify_input("jo@example.com", &good_code, OtpChannel::Email))
        .await;
    assert!(
        matches!(result, Err(AuthError::OtpMaxAttempts)),
        "expected OtpMaxAttempts, got {result:?}"
    );
}

#[tokio::test]
async fn should_consume_code_exactly_once() {
    let otps = MockOtpRepo::empty();
    let notifier = MockNotifier::new();

    let request = request_usecase(otps.clone(), MockRateLimitRepo::allowing(), notifier.clone());
    request
        .execute(request_input("jo@example.com", OtpChannel::Email))
        .await
        .unwrap();
    let code = notifier.last_code();

    let verify = verify_usecase(otps, MockIdentityRepo::new(vec![test_identity()]));
    verify
        .execute(verify_input("jo@example.com", &code, OtpChannel::Email))
        .await
        .unwrap();

    let result = verify
        .execute(verify_input("jo@example.com", &code, OtpChannel::Email))
        .await;
    assert!(
        matches!(result, Err(AuthError::OtpExpired)),
        "a consumed code must not verify again, got {result:?}"
    );
}

#[tokio::test]
async fn should_audit_each_verify_failure_with_its_reason() {
    let otps = MockOtpRepo::empty();
    let notifier = MockNotifier::new();
    let request = request_usecase(otps.clone(), MockRateLimitRepo::allowing(), notifier.clone());
    request
        .execute(request_input("jo@example.com", OtpChannel::Email))
        .await
        .unwrap();
    let code = notifier.last_code();
    let wrong_code = if code == "000000" { "000001" } else { "000000" };

    let audit = MockAuditSink::new();
    let verify = VerifyOtpUseCase {
        otps,
        identities: MockIdentityRepo::new(vec![test_identity()]),
        refresh_tokens: MockRefreshRepo::empty(),
        permissions: MockPermissions::none(),
        audit: audit.clone(),
        signer: test_signer(),
    };

    // Wrong code, then success, then a verify with no live code left.
    verify
        .execute(verify_input("jo@example.com", wrong_code, OtpChannel::Email))
        .await
        .unwrap_err();
    verify
        .execute(verify_input("jo@example.com", &code, OtpChannel::Email))
        .await
        .unwrap();
    verify
        .execute(verify_input("jo@example.com", wrong_code, OtpChannel::Email))
        .await
        .unwrap_err();

    let actions = audit.actions();
    assert_eq!(
        actions,
        vec!["otp_verify_invalid", "otp_login_success", "otp_verify_expired"],
        "each outcome must audit under its own action"
    );
}

#[tokio::test]
async fn should_reject_locked_account_after_consuming_code() {
    let mut identity = test_identity();
    identity.status = campus_auth::domain::types::AccountStatus::Locked;
    identity.locked_until = Some(chrono::Utc::now() + chrono::Duration::seconds(600));

    let otps = MockOtpRepo::empty();
    let notifier = MockNotifier::new();
    let request = request_usecase(otps.clone(), MockRateLimitRepo::allowing(), notifier.clone());
    request
        .execute(request_input("+14155552671", OtpChannel::Sms))
        .await
        .unwrap();

    let verify = verify_usecase(otps, MockIdentityRepo::new(vec![identity]));
    let result = verify
        .execute(verify_input("+14155552671", &notifier.last_code(), OtpChannel::Sms))
        .await;
    assert!(
        matches!(result, Err(AuthError::AccountLocked)),
        "expected AccountLocked, got {result:?}"
    );
}
