//! SurrealDB implementation of [`ChurchRepository`].

use chrono::{DateTime, Utc};
use pastcare_core::error::CoreResult;
use pastcare_core::models::church::{Church, CreateChurch, UpdateChurch};
use pastcare_core::repository::ChurchRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::CountRow;
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct ChurchRow {
    name: String,
    email: Option<String>,
    phone_number: Option<String>,
    address: Option<String>,
    website: Option<String>,
    active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ChurchRow {
    fn into_church(self, id: Uuid) -> Church {
        Church {
            id,
            name: self.name,
            email: self.email,
            phone_number: self.phone_number,
            address: self.address,
            website: self.website,
            active: self.active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// SurrealDB implementation of the Church repository.
#[derive(Clone)]
pub struct SurrealChurchRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealChurchRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> ChurchRepository for SurrealChurchRepository<C> {
    async fn create(&self, input: CreateChurch) -> CoreResult<Church> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('church', $id) SET \
                 name = $name, name_key = string::lowercase($name), \
                 email = $email, \
                 phone_number = $phone_number, \
                 address = $address, website = $website, \
                 active = true",
            )
            .bind(("id", id_str.clone()))
            .bind(("name", input.name.trim().to_string()))
            .bind(("email", input.email))
            .bind(("phone_number", input.phone_number))
            .bind(("address", input.address))
            .bind(("website", input.website))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::Migration(e.to_string()))?;

        let rows: Vec<ChurchRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "church".into(),
            id: id_str,
        })?;

        Ok(row.into_church(id))
    }

    async fn get_by_id(&self, id: Uuid) -> CoreResult<Church> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('church', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ChurchRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "church".into(),
            id: id_str,
        })?;

        Ok(row.into_church(id))
    }

    async fn update(&self, id: Uuid, input: UpdateChurch) -> CoreResult<Church> {
        let id_str = id.to_string();

        let mut sets = Vec::new();
        if input.name.is_some() {
            sets.push("name = $name, name_key = string::lowercase($name)");
        }
        if input.email.is_some() {
            sets.push("email = $email");
        }
        if input.phone_number.is_some() {
            sets.push("phone_number = $phone_number");
        }
        if input.address.is_some() {
            sets.push("address = $address");
        }
        if input.website.is_some() {
            sets.push("website = $website");
        }
        if input.active.is_some() {
            sets.push("active = $active");
        }
        sets.push("updated_at = time::now()");

        let query = format!("UPDATE type::record('church', $id) SET {}", sets.join(", "));

        let mut builder = self.db.query(&query).bind(("id", id_str.clone()));

        if let Some(name) = input.name {
            builder = builder.bind(("name", name.trim().to_string()));
        }
        if let Some(email) = input.email {
            builder = builder.bind(("email", email));
        }
        if let Some(phone_number) = input.phone_number {
            builder = builder.bind(("phone_number", phone_number));
        }
        if let Some(address) = input.address {
            builder = builder.bind(("address", address));
        }
        if let Some(website) = input.website {
            builder = builder.bind(("website", website));
        }
        if let Some(active) = input.active {
            builder = builder.bind(("active", active));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result
            .check()
            .map_err(|e| DbError::Migration(e.to_string()))?;

        let rows: Vec<ChurchRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "church".into(),
            id: id_str,
        })?;

        Ok(row.into_church(id))
    }

    async fn exists_by_name(&self, name: &str) -> CoreResult<bool> {
        let mut result = self
            .db
            .query(
                "SELECT count() AS total FROM church \
                 WHERE name_key = string::lowercase($name) \
                 GROUP ALL",
            )
            .bind(("name", name.trim().to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.first().is_some_and(|r| r.total > 0))
    }
}
