//! User domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Application roles, highest authority first.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Role {
    /// Platform operator; not bound to a church.
    SuperAdmin,
    Admin,
    Pastor,
    Treasurer,
    FellowshipHead,
    FellowshipLeader,
    MemberManager,
    Member,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "SuperAdmin",
            Role::Admin => "Admin",
            Role::Pastor => "Pastor",
            Role::Treasurer => "Treasurer",
            Role::FellowshipHead => "FellowshipHead",
            Role::FellowshipLeader => "FellowshipLeader",
            Role::MemberManager => "MemberManager",
            Role::Member => "Member",
        }
    }

    /// Every role except the platform operator must belong to a church.
    pub fn requires_church(&self) -> bool {
        !matches!(self, Role::SuperAdmin)
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SuperAdmin" => Ok(Role::SuperAdmin),
            "Admin" => Ok(Role::Admin),
            "Pastor" => Ok(Role::Pastor),
            "Treasurer" => Ok(Role::Treasurer),
            "FellowshipHead" => Ok(Role::FellowshipHead),
            "FellowshipLeader" => Ok(Role::FellowshipLeader),
            "MemberManager" => Ok(Role::MemberManager),
            "Member" => Ok(Role::Member),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    /// Owning church; `None` only for [`Role::SuperAdmin`].
    pub church_id: Option<Uuid>,
    pub name: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub title: Option<String>,
    pub role: Role,
    pub password_hash: String,
    pub failed_login_attempts: u32,
    pub locked_until: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Whether a lockout is still in force at `now`.
    pub fn is_locked(&self, now: DateTime<Utc>) -> bool {
        self.locked_until.is_some_and(|until| until > now)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUser {
    pub church_id: Option<Uuid>,
    pub name: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub title: Option<String>,
    pub role: Role,
    /// Raw password (will be hashed with Argon2id before storage).
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateUser {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<Option<String>>,
    pub title: Option<Option<String>>,
    pub role: Option<Role>,
    pub failed_login_attempts: Option<u32>,
    /// `Some(Some(ts))` = lock, `Some(None)` = unlock, `None` = no change.
    pub locked_until: Option<Option<DateTime<Utc>>>,
}

/// Public view of a user, safe to return to clients.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserProfile {
    pub id: Uuid,
    pub church_id: Option<Uuid>,
    pub name: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub title: Option<String>,
    pub role: Role,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            church_id: user.church_id,
            name: user.name.clone(),
            email: user.email.clone(),
            phone_number: user.phone_number.clone(),
            title: user.title.clone(),
            role: user.role,
        }
    }
}
