//! Warehouse directory lookups
//!
//! Warehouses are managed by the wider platform; booking operations only need
//! to confirm that the referenced warehouse exists.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use shared::Warehouse;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Warehouse directory service
#[derive(Clone)]
pub struct WarehouseService {
    db: PgPool,
}

#[derive(Debug, FromRow)]
struct WarehouseRow {
    id: Uuid,
    name: String,
    location: Option<String>,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl From<WarehouseRow> for Warehouse {
    fn from(row: WarehouseRow) -> Self {
        Warehouse {
            id: row.id,
            name: row.name,
            location: row.location,
            is_active: row.is_active,
            created_at: row.created_at,
        }
    }
}

/// Input for registering a warehouse in the directory
#[derive(Debug, Deserialize)]
pub struct RegisterWarehouseInput {
    pub name: String,
    pub location: Option<String>,
}

impl WarehouseService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Look up a warehouse by ID
    pub async fn find_by_id(&self, warehouse_id: Uuid) -> AppResult<Option<Warehouse>> {
        let row = sqlx::query_as::<_, WarehouseRow>(
            "SELECT id, name, location, is_active, created_at FROM warehouses WHERE id = $1",
        )
        .bind(warehouse_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(Into::into))
    }

    pub async fn exists(&self, warehouse_id: Uuid) -> AppResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM warehouses WHERE id = $1)",
        )
        .bind(warehouse_id)
        .fetch_one(&self.db)
        .await?;

        Ok(exists)
    }

    /// Fetch a warehouse or fail with not-found
    pub async fn require(&self, warehouse_id: Uuid) -> AppResult<Warehouse> {
        self.find_by_id(warehouse_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Warehouse".to_string()))
    }

    /// Register a warehouse (directory seeding)
    pub async fn register(&self, input: RegisterWarehouseInput) -> AppResult<Warehouse> {
        if input.name.trim().is_empty() {
            return Err(AppError::validation("name", "Warehouse name is required"));
        }

        let row = sqlx::query_as::<_, WarehouseRow>(
            r#"
            INSERT INTO warehouses (name, location)
            VALUES ($1, $2)
            RETURNING id, name, location, is_active, created_at
            "#,
        )
        .bind(input.name.trim())
        .bind(&input.location)
        .fetch_one(&self.db)
        .await?;

        Ok(row.into())
    }
}
