//! Integration tests for the refresh-token session manager.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, TimeZone, Utc};
use pastcare_auth::config::AuthConfig;
use pastcare_auth::session::{Clock, SessionManager};
use pastcare_auth::token;
use pastcare_core::repository::RefreshTokenRepository;
use pastcare_db::repository::SurrealRefreshTokenRepository;
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use uuid::Uuid;

/// Test clock that only moves when told to.
#[derive(Clone)]
struct ManualClock(Arc<Mutex<DateTime<Utc>>>);

impl ManualClock {
    fn new() -> Self {
        Self(Arc::new(Mutex::new(
            Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap(),
        )))
    }

    fn advance(&self, by: Duration) {
        *self.0.lock().unwrap() += by;
    }

    fn set(&self, to: DateTime<Utc>) {
        *self.0.lock().unwrap() = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap()
    }
}

type Manager = SessionManager<SurrealRefreshTokenRepository<Db>, ManualClock>;

async fn setup(max_sessions: usize) -> (Manager, SurrealRefreshTokenRepository<Db>, ManualClock) {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    pastcare_db::run_migrations(&db).await.unwrap();

    let repo = SurrealRefreshTokenRepository::new(db);
    let clock = ManualClock::new();
    let config = AuthConfig {
        max_active_sessions_per_user: max_sessions,
        ..Default::default()
    };
    let manager = SessionManager::with_clock(repo.clone(), clock.clone(), &config);
    (manager, repo, clock)
}

#[tokio::test]
async fn created_session_is_valid_and_hashed() {
    let (manager, repo, clock) = setup(5).await;
    let user_id = Uuid::new_v4();
    let church_id = Uuid::new_v4();

    let issued = manager
        .create_session(
            user_id,
            Some(church_id),
            Some("41.66.1.2".into()),
            Some("Safari".into()),
        )
        .await
        .unwrap();

    assert_eq!(issued.token.issued_at, clock.now());
    assert_eq!(issued.token.last_used_at, clock.now());
    assert_eq!(issued.token.expires_at, clock.now() + Duration::days(30));
    assert_eq!(issued.token.church_id, Some(church_id));
    assert_ne!(issued.token.token_hash, issued.raw_token);
    assert_eq!(
        issued.token.token_hash,
        token::hash_refresh_token(&issued.raw_token)
    );

    let stored = repo
        .find_by_token_hash(&issued.token.token_hash)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.id, issued.token.id);

    let validated = manager.validate(&issued.raw_token).await.unwrap().unwrap();
    assert_eq!(validated.id, issued.token.id);
}

#[tokio::test]
async fn unvalidated_huge_lifetime_still_yields_live_session() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    pastcare_db::run_migrations(&db).await.unwrap();

    let clock = ManualClock::new();
    let config = AuthConfig {
        refresh_token_lifetime_secs: u64::MAX,
        ..Default::default()
    };
    let manager =
        SessionManager::with_clock(SurrealRefreshTokenRepository::new(db), clock.clone(), &config);

    let issued = manager
        .create_session(Uuid::new_v4(), None, None, None)
        .await
        .unwrap();

    assert!(issued.token.expires_at > clock.now());
    assert_eq!(
        issued.token.expires_at,
        clock.now() + Duration::seconds(315_360_000)
    );
    assert!(manager.validate(&issued.raw_token).await.unwrap().is_some());
}

#[tokio::test]
async fn expiry_past_the_calendar_is_an_error() {
    let (manager, _, clock) = setup(5).await;
    let user_id = Uuid::new_v4();
    clock.set(DateTime::<Utc>::MAX_UTC - Duration::days(1));

    let err = manager
        .create_session(user_id, None, None, None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        pastcare_core::error::CoreError::Internal(_)
    ));
}

#[tokio::test]
async fn cap_holds_after_many_logins() {
    let (manager, _repo, clock) = setup(5).await;
    let user_id = Uuid::new_v4();

    let mut issued = Vec::new();
    for _ in 0..6 {
        issued.push(manager.create_session(user_id, None, None, None).await.unwrap());
        clock.advance(Duration::seconds(1));
    }

    let active = manager.list_active_sessions(user_id).await.unwrap();
    assert_eq!(active.len(), 5);

    // The oldest, never-used session made room for the sixth.
    assert!(manager.validate(&issued[0].raw_token).await.unwrap().is_none());
    for session in &issued[1..] {
        assert!(manager.validate(&session.raw_token).await.unwrap().is_some());
    }
}

#[tokio::test]
async fn third_login_with_cap_two_evicts_first() {
    let (manager, _repo, clock) = setup(2).await;
    let user_id = Uuid::new_v4();

    let a = manager.create_session(user_id, None, None, None).await.unwrap();
    clock.advance(Duration::seconds(10));
    let b = manager.create_session(user_id, None, None, None).await.unwrap();
    clock.advance(Duration::seconds(10));
    let c = manager.create_session(user_id, None, None, None).await.unwrap();

    assert!(manager.validate(&a.raw_token).await.unwrap().is_none());
    assert!(manager.validate(&b.raw_token).await.unwrap().is_some());
    assert!(manager.validate(&c.raw_token).await.unwrap().is_some());
}

#[tokio::test]
async fn eviction_follows_last_use() {
    let (manager, _repo, clock) = setup(2).await;
    let user_id = Uuid::new_v4();

    let a = manager.create_session(user_id, None, None, None).await.unwrap();
    clock.advance(Duration::minutes(1));
    let b = manager.create_session(user_id, None, None, None).await.unwrap();
    clock.advance(Duration::minutes(1));

    // A is older but used more recently than B.
    let a_token = manager.validate(&a.raw_token).await.unwrap().unwrap();
    manager.touch(a_token).await.unwrap();
    clock.advance(Duration::minutes(1));

    let c = manager.create_session(user_id, None, None, None).await.unwrap();

    assert!(manager.validate(&a.raw_token).await.unwrap().is_some());
    assert!(manager.validate(&b.raw_token).await.unwrap().is_none());
    assert!(manager.validate(&c.raw_token).await.unwrap().is_some());
}

#[tokio::test]
async fn cap_is_per_user() {
    let (manager, _repo, _clock) = setup(1).await;
    let kofi = Uuid::new_v4();
    let esi = Uuid::new_v4();

    let first = manager.create_session(kofi, None, None, None).await.unwrap();
    let other = manager.create_session(esi, None, None, None).await.unwrap();
    let second = manager.create_session(kofi, None, None, None).await.unwrap();

    assert!(manager.validate(&first.raw_token).await.unwrap().is_none());
    assert!(manager.validate(&second.raw_token).await.unwrap().is_some());
    assert!(manager.validate(&other.raw_token).await.unwrap().is_some());
}

#[tokio::test]
async fn validate_rejects_unknown_expired_and_revoked() {
    let (manager, _repo, clock) = setup(5).await;
    let user_id = Uuid::new_v4();

    assert!(
        manager
            .validate("not-a-real-token")
            .await
            .unwrap()
            .is_none()
    );

    let revoked = manager.create_session(user_id, None, None, None).await.unwrap();
    manager.revoke(&revoked.raw_token).await.unwrap();
    assert!(manager.validate(&revoked.raw_token).await.unwrap().is_none());

    let expiring = manager.create_session(user_id, None, None, None).await.unwrap();
    clock.set(expiring.token.expires_at - Duration::seconds(1));
    assert!(manager.validate(&expiring.raw_token).await.unwrap().is_some());
    // Expiry is exclusive: at `expires_at` the token is already dead.
    clock.set(expiring.token.expires_at);
    assert!(manager.validate(&expiring.raw_token).await.unwrap().is_none());
}

#[tokio::test]
async fn validate_does_not_touch() {
    let (manager, repo, clock) = setup(5).await;
    let issued = manager
        .create_session(Uuid::new_v4(), None, None, None)
        .await
        .unwrap();

    clock.advance(Duration::hours(3));
    manager.validate(&issued.raw_token).await.unwrap().unwrap();

    let stored = repo
        .find_by_token_hash(&issued.token.token_hash)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.last_used_at, issued.token.issued_at);
}

#[tokio::test]
async fn touch_moves_last_used_forward_only() {
    let (manager, repo, clock) = setup(5).await;
    let issued = manager
        .create_session(Uuid::new_v4(), None, None, None)
        .await
        .unwrap();

    clock.advance(Duration::hours(1));
    let touched = manager.touch(issued.token.clone()).await.unwrap();
    assert_eq!(touched.last_used_at, clock.now());

    let later = clock.now();
    clock.set(later - Duration::minutes(30));
    let again = manager.touch(touched).await.unwrap();
    assert_eq!(again.last_used_at, later);

    let stored = repo
        .find_by_token_hash(&issued.token.token_hash)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.last_used_at, later);
    assert_eq!(stored.expires_at, issued.token.expires_at);
    assert!(!stored.revoked);
}

#[tokio::test]
async fn revoke_is_idempotent() {
    let (manager, repo, _clock) = setup(5).await;
    let issued = manager
        .create_session(Uuid::new_v4(), None, None, None)
        .await
        .unwrap();

    manager.revoke(&issued.raw_token).await.unwrap();
    manager.revoke(&issued.raw_token).await.unwrap();
    manager.revoke("never-issued").await.unwrap();

    let stored = repo
        .find_by_token_hash(&issued.token.token_hash)
        .await
        .unwrap()
        .unwrap();
    assert!(stored.revoked);
}

#[tokio::test]
async fn touch_cannot_resurrect_a_revoked_session() {
    let (manager, _repo, clock) = setup(5).await;
    let issued = manager
        .create_session(Uuid::new_v4(), None, None, None)
        .await
        .unwrap();

    // Snapshot taken before the revoke still says `revoked = false`.
    let stale = manager.validate(&issued.raw_token).await.unwrap().unwrap();
    manager.revoke(&issued.raw_token).await.unwrap();

    clock.advance(Duration::minutes(5));
    manager.touch(stale).await.unwrap();
    assert!(manager.validate(&issued.raw_token).await.unwrap().is_none());
}

#[tokio::test]
async fn revoke_all_counts_only_live_revocations() {
    let (manager, _repo, _clock) = setup(5).await;
    let user_id = Uuid::new_v4();
    let bystander = Uuid::new_v4();

    let mut issued = Vec::new();
    for _ in 0..4 {
        issued.push(manager.create_session(user_id, None, None, None).await.unwrap());
    }
    let kept = manager.create_session(bystander, None, None, None).await.unwrap();
    manager.revoke(&issued[0].raw_token).await.unwrap();

    assert_eq!(manager.revoke_all(user_id).await.unwrap(), 3);
    assert_eq!(manager.revoke_all(user_id).await.unwrap(), 0);
    assert!(manager.list_active_sessions(user_id).await.unwrap().is_empty());
    assert!(manager.validate(&kept.raw_token).await.unwrap().is_some());
}

#[tokio::test]
async fn list_active_sessions_orders_by_last_use() {
    let (manager, _repo, clock) = setup(5).await;
    let user_id = Uuid::new_v4();

    let first = manager.create_session(user_id, None, None, None).await.unwrap();
    clock.advance(Duration::minutes(1));
    let second = manager.create_session(user_id, None, None, None).await.unwrap();
    clock.advance(Duration::minutes(1));
    let third = manager.create_session(user_id, None, None, None).await.unwrap();
    clock.advance(Duration::minutes(1));
    manager.touch(first.token.clone()).await.unwrap();
    manager.revoke(&third.raw_token).await.unwrap();

    let ids: Vec<_> = manager
        .list_active_sessions(user_id)
        .await
        .unwrap()
        .into_iter()
        .map(|t| t.id)
        .collect();
    assert_eq!(ids, vec![first.token.id, second.token.id]);

    assert!(
        manager
            .list_active_sessions(Uuid::new_v4())
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn cleanup_keeps_recently_expired_sessions() {
    let (manager, repo, clock) = setup(5).await;
    let user_id = Uuid::new_v4();
    let start = clock.now();

    let old = manager.create_session(user_id, None, None, None).await.unwrap();
    clock.advance(Duration::days(2));
    let recent = manager.create_session(user_id, None, None, None).await.unwrap();

    // `old` expired 8 days ago, `recent` 6 days ago.
    clock.set(start + Duration::days(38));
    let live = manager.create_session(user_id, None, None, None).await.unwrap();

    let deleted = manager.cleanup_expired(Duration::days(7)).await.unwrap();
    assert_eq!(deleted, 1);

    assert!(
        repo.find_by_token_hash(&old.token.token_hash)
            .await
            .unwrap()
            .is_none()
    );
    assert!(
        repo.find_by_token_hash(&recent.token.token_hash)
            .await
            .unwrap()
            .is_some()
    );
    assert!(manager.validate(&live.raw_token).await.unwrap().is_some());

    assert_eq!(manager.cleanup_expired(Duration::days(7)).await.unwrap(), 0);
}
