//! Integration tests for the Church and User repositories.

use chrono::{Duration, Utc};
use pastcare_core::error::CoreError;
use pastcare_core::models::church::{CreateChurch, UpdateChurch};
use pastcare_core::models::user::{CreateUser, Role, UpdateUser};
use pastcare_core::repository::{ChurchRepository, UserRepository};
use pastcare_db::repository::{SurrealChurchRepository, SurrealUserRepository};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use uuid::Uuid;

async fn setup() -> Surreal<Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    pastcare_db::run_migrations(&db).await.unwrap();
    db
}

fn grace_chapel() -> CreateChurch {
    CreateChurch {
        name: "Grace Chapel".into(),
        email: Some("office@gracechapel.org".into()),
        phone_number: Some("+233201234567".into()),
        address: Some("12 Ring Road, Accra".into()),
        website: None,
    }
}

fn pastor(church_id: Uuid) -> CreateUser {
    CreateUser {
        church_id: Some(church_id),
        name: "Ama Mensah".into(),
        email: "Ama@GraceChapel.org".into(),
        phone_number: Some("+233201112222".into()),
        title: Some("Rev.".into()),
        role: Role::Pastor,
        password: "correct-horse-battery".into(),
    }
}

#[tokio::test]
async fn create_and_get_church() {
    let db = setup().await;
    let repo = SurrealChurchRepository::new(db);

    let church = repo.create(grace_chapel()).await.unwrap();
    assert_eq!(church.name, "Grace Chapel");
    assert!(church.active);

    let fetched = repo.get_by_id(church.id).await.unwrap();
    assert_eq!(fetched.id, church.id);
    assert_eq!(fetched.address.as_deref(), Some("12 Ring Road, Accra"));
}

#[tokio::test]
async fn update_church_clears_optional_fields() {
    let db = setup().await;
    let repo = SurrealChurchRepository::new(db);
    let church = repo.create(grace_chapel()).await.unwrap();

    let updated = repo
        .update(
            church.id,
            UpdateChurch {
                website: Some(Some("https://gracechapel.org".into())),
                address: Some(None),
                active: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.website.as_deref(), Some("https://gracechapel.org"));
    assert!(updated.address.is_none());
    assert!(!updated.active);
    assert_eq!(updated.name, "Grace Chapel");
}

#[tokio::test]
async fn missing_church_is_not_found() {
    let db = setup().await;
    let repo = SurrealChurchRepository::new(db);

    let err = repo.get_by_id(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, CoreError::NotFound { .. }));
}

#[tokio::test]
async fn church_name_lookup_ignores_case() {
    let db = setup().await;
    let repo = SurrealChurchRepository::new(db);
    assert!(!repo.exists_by_name("Grace Chapel").await.unwrap());

    let church = repo.create(grace_chapel()).await.unwrap();
    assert!(repo.exists_by_name("grace chapel").await.unwrap());
    assert!(repo.exists_by_name("  GRACE CHAPEL ").await.unwrap());
    assert!(!repo.exists_by_name("Grace Chapel East").await.unwrap());

    repo.update(
        church.id,
        UpdateChurch {
            name: Some("Grace Chapel East".into()),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert!(repo.exists_by_name("grace chapel east").await.unwrap());
    assert!(!repo.exists_by_name("Grace Chapel").await.unwrap());
}

#[tokio::test]
async fn duplicate_church_name_is_refused_by_the_store() {
    let db = setup().await;
    let repo = SurrealChurchRepository::new(db);
    repo.create(grace_chapel()).await.unwrap();

    let shouting = CreateChurch {
        name: "GRACE CHAPEL".into(),
        ..grace_chapel()
    };
    assert!(repo.create(shouting).await.is_err());
}

#[tokio::test]
async fn create_user_hashes_password_and_lowercases_email() {
    let db = setup().await;
    let church = SurrealChurchRepository::new(db.clone())
        .create(grace_chapel())
        .await
        .unwrap();
    let repo = SurrealUserRepository::new(db);

    let user = repo.create(pastor(church.id)).await.unwrap();
    assert_eq!(user.email, "ama@gracechapel.org");
    assert_eq!(user.role, Role::Pastor);
    assert_eq!(user.church_id, Some(church.id));
    assert_eq!(user.failed_login_attempts, 0);
    assert!(user.locked_until.is_none());
    assert!(user.password_hash.starts_with("$argon2id$"));
    assert_ne!(user.password_hash, "correct-horse-battery");

    let by_email = repo.get_by_email("AMA@gracechapel.org").await.unwrap();
    assert_eq!(by_email.id, user.id);

    let by_id = repo.get_by_id(user.id).await.unwrap();
    assert_eq!(by_id.email, user.email);
}

#[tokio::test]
async fn duplicate_email_is_rejected() {
    let db = setup().await;
    let church = SurrealChurchRepository::new(db.clone())
        .create(grace_chapel())
        .await
        .unwrap();
    let repo = SurrealUserRepository::new(db);

    repo.create(pastor(church.id)).await.unwrap();
    let err = repo.create(pastor(church.id)).await.unwrap_err();
    assert!(matches!(err, CoreError::AlreadyExists { .. }));
}

#[tokio::test]
async fn church_role_without_church_is_rejected() {
    let db = setup().await;
    let repo = SurrealUserRepository::new(db);

    let mut input = pastor(Uuid::new_v4());
    input.church_id = None;
    let err = repo.create(input).await.unwrap_err();
    assert!(matches!(err, CoreError::Validation { .. }));
}

#[tokio::test]
async fn super_admin_needs_no_church() {
    let db = setup().await;
    let repo = SurrealUserRepository::new(db);

    let user = repo
        .create(CreateUser {
            church_id: None,
            name: "Platform Ops".into(),
            email: "ops@pastcare.app".into(),
            phone_number: None,
            title: None,
            role: Role::SuperAdmin,
            password: "super-secret-pass".into(),
        })
        .await
        .unwrap();

    assert!(user.church_id.is_none());
}

#[tokio::test]
async fn update_user_sets_and_clears_lockout() {
    let db = setup().await;
    let church = SurrealChurchRepository::new(db.clone())
        .create(grace_chapel())
        .await
        .unwrap();
    let repo = SurrealUserRepository::new(db);
    let user = repo.create(pastor(church.id)).await.unwrap();

    let until = Utc::now() + Duration::minutes(15);
    let locked = repo
        .update(
            user.id,
            UpdateUser {
                failed_login_attempts: Some(5),
                locked_until: Some(Some(until)),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(locked.failed_login_attempts, 5);
    assert!(locked.is_locked(Utc::now()));

    let unlocked = repo
        .update(
            user.id,
            UpdateUser {
                failed_login_attempts: Some(0),
                locked_until: Some(None),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(unlocked.failed_login_attempts, 0);
    assert!(unlocked.locked_until.is_none());
    assert_eq!(unlocked.name, "Ama Mensah");
}

#[tokio::test]
async fn unknown_email_is_not_found() {
    let db = setup().await;
    let repo = SurrealUserRepository::new(db);

    let err = repo.get_by_email("nobody@example.com").await.unwrap_err();
    assert!(matches!(err, CoreError::NotFound { .. }));
}
