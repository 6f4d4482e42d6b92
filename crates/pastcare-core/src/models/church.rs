//! Church (tenant) domain model.
//!
//! A church is the tenant boundary: members, fellowships, users and
//! sessions are all scoped to one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Church {
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub address: Option<String>,
    pub website: Option<String>,
    /// Inactive churches cannot sign in.
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields required to register a new church.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateChurch {
    pub name: String,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub address: Option<String>,
    pub website: Option<String>,
}

/// Fields that can be updated on an existing church.
///
/// `Some(None)` clears an optional field, `None` leaves it unchanged.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateChurch {
    pub name: Option<String>,
    pub email: Option<Option<String>>,
    pub phone_number: Option<Option<String>>,
    pub address: Option<Option<String>>,
    pub website: Option<Option<String>>,
    pub active: Option<bool>,
}
