use chrono::{Duration, Utc};
use uuid::Uuid;

use campus_auth::crypto::token::hash_refresh_token;
use campus_auth::domain::types::{RefreshTokenRecord, SessionTokens};
use campus_auth::error::AuthError;
use campus_auth::usecase::session::{
    RefreshSessionInput, RefreshSessionUseCase, RevokeSessionInput, RevokeSessionUseCase,
    mint_session,
};

use crate::helpers::{
    MockAuditSink, MockIdentityRepo, MockPermissions, MockRefreshRepo, test_identity, test_signer,
};

fn refresh_input(raw: &str) -> RefreshSessionInput {
    RefreshSessionInput {
        raw_token: raw.to_owned(),
        ip: "203.0.113.10".to_owned(),
        user_agent: "integration-test".to_owned(),
    }
}

fn usecase(
    refresh: MockRefreshRepo,
    identities: MockIdentityRepo,
    audit: MockAuditSink,
) -> RefreshSessionUseCase<MockRefreshRepo, MockIdentityRepo, MockPermissions, MockAuditSink> {
    RefreshSessionUseCase {
        refresh_tokens: refresh,
        identities,
        permissions: MockPermissions::none(),
        audit,
        signer: test_signer(),
    }
}

async fn seeded_session(refresh: &MockRefreshRepo) -> SessionTokens {
    mint_session(&test_signer(), refresh, &test_identity(), vec![])
        .await
        .unwrap()
}

#[tokio::test]
async fn should_rotate_refresh_token() {
    let refresh = MockRefreshRepo::empty();
    let refresh_handle = refresh.handle();
    let identities = MockIdentityRepo::new(vec![test_identity()]);
    let audit = MockAuditSink::new();

    let session = seeded_session(&refresh).await;
    let uc = usecase(refresh, identities, audit.clone());

    let output = uc
        .execute(refresh_input(&session.refresh_token))
        .await
        .unwrap();
    assert_ne!(output.tokens.refresh_token, session.refresh_token);

    let stored = refresh_handle.lock().unwrap();
    assert_eq!(stored.len(), 2, "rotation appends a new record");
    let old = stored
        .iter()
        .find(|t| t.token_hash == hash_refresh_token(&session.refresh_token))
        .unwrap();
    assert!(old.revoked_at.is_some(), "old token must be revoked");
    let new = stored
        .iter()
        .find(|t| t.token_hash == hash_refresh_token(&output.tokens.refresh_token))
        .unwrap();
    assert!(new.revoked_at.is_none());
    assert!(audit.actions().contains(&"token_refresh"));
}

#[tokio::test]
async fn should_support_sequential_refresh_chain() {
    let refresh = MockRefreshRepo::empty();
    let refresh_handle = refresh.handle();
    let identities = MockIdentityRepo::new(vec![test_identity()]);

    let session = seeded_session(&refresh).await;
    let uc = usecase(refresh, identities, MockAuditSink::new());

    // T0 → T1 → T2: each raw token is good for exactly one rotation.
    let first = uc
        .execute(refresh_input(&session.refresh_token))
        .await
        .unwrap();
    let second = uc
        .execute(refresh_input(&first.tokens.refresh_token))
        .await
        .unwrap();
    assert_ne!(second.tokens.refresh_token, first.tokens.refresh_token);

    let stored = refresh_handle.lock().unwrap();
    assert_eq!(stored.len(), 3);
    assert_eq!(
        stored.iter().filter(|t| t.revoked_at.is_none()).count(),
        1,
        "only the newest token may remain active"
    );
}

#[tokio::test]
async fn should_reject_unknown_refresh_token() {
    let uc = usecase(
        MockRefreshRepo::empty(),
        MockIdentityRepo::new(vec![test_identity()]),
        MockAuditSink::new(),
    );
    let result = uc.execute(refresh_input("never-issued")).await;
    assert!(
        matches!(result, Err(AuthError::RefreshNotFound)),
        "expected RefreshNotFound, got {result:?}"
    );
}

#[tokio::test]
async fn should_reject_expired_refresh_token() {
    let identity = test_identity();
    let raw = "expired-raw-token";
    let refresh = MockRefreshRepo::empty();
    refresh.tokens.lock().unwrap().push(RefreshTokenRecord {
        id: Uuid::new_v4(),
        user_id: identity.id,
        token_hash: hash_refresh_token(raw),
        expires_at: Utc::now() - Duration::seconds(5),
        revoked_at: None,
        created_at: Utc::now() - Duration::days(8),
    });

    let uc = usecase(
        refresh,
        MockIdentityRepo::new(vec![identity]),
        MockAuditSink::new(),
    );
    let result = uc.execute(refresh_input(raw)).await;
    assert!(
        matches!(result, Err(AuthError::RefreshExpired)),
        "expected RefreshExpired, got {result:?}"
    );
}

#[tokio::test]
async fn should_contain_reuse_by_revoking_all_sessions() {
    let refresh = MockRefreshRepo::empty();
    let refresh_handle = refresh.handle();
    let identities = MockIdentityRepo::new(vec![test_identity()]);
    let audit = MockAuditSink::new();

    let session = seeded_session(&refresh).await;
    let uc = usecase(refresh, identities, audit.clone());

    // First rotation succeeds, then the old token is replayed.
    uc.execute(refresh_input(&session.refresh_token))
        .await
        .unwrap();
    let result = uc.execute(refresh_input(&session.refresh_token)).await;

    assert!(
        matches!(result, Err(AuthError::RefreshRevoked)),
        "expected RefreshRevoked, got {result:?}"
    );
    // Containment: the rotated-in token dies with the replayed one.
    let stored = refresh_handle.lock().unwrap();
    assert!(stored.iter().all(|t| t.revoked_at.is_some()));
    assert!(audit.actions().contains(&"token_refresh_reuse"));
}

#[tokio::test]
async fn should_allow_exactly_one_winner_in_concurrent_rotation() {
    let refresh = MockRefreshRepo::empty();
    let identities = MockIdentityRepo::new(vec![test_identity()]);

    let session = seeded_session(&refresh).await;
    let uc = usecase(refresh, identities, MockAuditSink::new());

    let (a, b) = tokio::join!(
        uc.execute(refresh_input(&session.refresh_token)),
        uc.execute(refresh_input(&session.refresh_token)),
    );

    let successes = [a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count();
    assert_eq!(successes, 1, "exactly one rotation may win");
    let loser = if a.is_ok() { b } else { a };
    assert!(
        matches!(loser, Err(AuthError::RefreshRevoked)),
        "expected RefreshRevoked for the loser, got {loser:?}"
    );
}

#[tokio::test]
async fn should_reject_refresh_for_locked_account() {
    let mut identity = test_identity();
    let refresh = MockRefreshRepo::empty();
    let session = seeded_session(&refresh).await;

    identity.status = campus_auth::domain::types::AccountStatus::Locked;
    identity.locked_until = Some(Utc::now() + Duration::seconds(600));

    let uc = usecase(
        refresh,
        MockIdentityRepo::new(vec![identity]),
        MockAuditSink::new(),
    );
    let result = uc.execute(refresh_input(&session.refresh_token)).await;
    assert!(
        matches!(result, Err(AuthError::AccountLocked)),
        "expected AccountLocked, got {result:?}"
    );
}

#[tokio::test]
async fn should_revoke_session_idempotently() {
    let refresh = MockRefreshRepo::empty();
    let refresh_handle = refresh.handle();
    let session = seeded_session(&refresh).await;

    let uc = RevokeSessionUseCase {
        refresh_tokens: refresh,
        audit: MockAuditSink::new(),
    };

    let input = || RevokeSessionInput {
        raw_token: session.refresh_token.clone(),
        ip: "203.0.113.10".to_owned(),
        user_agent: "integration-test".to_owned(),
    };
    uc.execute(input()).await.unwrap();
    assert!(refresh_handle.lock().unwrap()[0].revoked_at.is_some());

    // Logging out twice (or with a bogus token) is still fine.
    uc.execute(input()).await.unwrap();
    uc.execute(RevokeSessionInput {
        raw_token: "never-issued".to_owned(),
        ip: "203.0.113.10".to_owned(),
        user_agent: "integration-test".to_owned(),
    })
    .await
    .unwrap();
}
