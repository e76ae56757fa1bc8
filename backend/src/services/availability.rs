//! Warehouse availability calendar
//!
//! Stores explicit per-date overrides. A date with no record is available.
//! Warehouse existence is checked by the caller, not here.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use shared::{classify_dates, resolve_availability, AvailabilityRecord, DateAvailability};
use sqlx::{postgres::PgExecutor, FromRow, PgPool};
use uuid::Uuid;

use crate::error::AppResult;

/// Availability calendar service
#[derive(Clone)]
pub struct AvailabilityService {
    db: PgPool,
}

#[derive(Debug, FromRow)]
struct AvailabilityRow {
    warehouse_id: Uuid,
    date: NaiveDate,
    is_available: bool,
    reason: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<AvailabilityRow> for AvailabilityRecord {
    fn from(row: AvailabilityRow) -> Self {
        AvailabilityRecord {
            warehouse_id: row.warehouse_id,
            date: row.date,
            is_available: row.is_available,
            reason: row.reason,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Input for setting availability on a single date
#[derive(Debug, Deserialize)]
pub struct SetAvailabilityInput {
    pub is_available: bool,
    pub reason: Option<String>,
}

/// Input for setting availability on many dates at once
#[derive(Debug, Deserialize)]
pub struct BulkAvailabilityInput {
    pub dates: Vec<NaiveDate>,
    pub is_available: bool,
    pub reason: Option<String>,
}

impl AvailabilityService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Write one override, replacing any existing record for the same date
    async fn upsert<'e, E: PgExecutor<'e>>(
        executor: E,
        warehouse_id: Uuid,
        date: NaiveDate,
        is_available: bool,
        reason: Option<&str>,
    ) -> AppResult<AvailabilityRecord> {
        let row = sqlx::query_as::<_, AvailabilityRow>(
            r#"
            INSERT INTO warehouse_availability (warehouse_id, date, is_available, reason)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (warehouse_id, date)
            DO UPDATE SET is_available = EXCLUDED.is_available,
                          reason = EXCLUDED.reason,
                          updated_at = NOW()
            RETURNING warehouse_id, date, is_available, reason, created_at, updated_at
            "#,
        )
        .bind(warehouse_id)
        .bind(date)
        .bind(is_available)
        .bind(reason)
        .fetch_one(executor)
        .await?;

        Ok(row.into())
    }

    /// Block a warehouse on a date
    pub async fn set_unavailable(
        &self,
        warehouse_id: Uuid,
        date: NaiveDate,
        reason: Option<String>,
    ) -> AppResult<AvailabilityRecord> {
        let record =
            Self::upsert(&self.db, warehouse_id, date, false, reason.as_deref()).await?;
        tracing::info!("Warehouse {} marked unavailable on {}", warehouse_id, date);
        Ok(record)
    }

    /// Re-open a warehouse on a date
    pub async fn set_available(
        &self,
        warehouse_id: Uuid,
        date: NaiveDate,
    ) -> AppResult<AvailabilityRecord> {
        let record = Self::upsert(&self.db, warehouse_id, date, true, None).await?;
        tracing::info!("Warehouse {} marked available on {}", warehouse_id, date);
        Ok(record)
    }

    /// Whether the warehouse accepts bookings on `date` (open unless blocked)
    pub async fn check_availability(&self, warehouse_id: Uuid, date: NaiveDate) -> AppResult<bool> {
        let explicit = sqlx::query_scalar::<_, bool>(
            "SELECT is_available FROM warehouse_availability WHERE warehouse_id = $1 AND date = $2",
        )
        .bind(warehouse_id)
        .bind(date)
        .fetch_optional(&self.db)
        .await?;

        Ok(resolve_availability(explicit))
    }

    /// Explicit overrides in an inclusive date range, ascending by date
    pub async fn get_availability_for_warehouse(
        &self,
        warehouse_id: Uuid,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> AppResult<Vec<AvailabilityRecord>> {
        let rows = sqlx::query_as::<_, AvailabilityRow>(
            r#"
            SELECT warehouse_id, date, is_available, reason, created_at, updated_at
            FROM warehouse_availability
            WHERE warehouse_id = $1 AND date BETWEEN $2 AND $3
            ORDER BY date ASC
            "#,
        )
        .bind(warehouse_id)
        .bind(start_date)
        .bind(end_date)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Apply the same override to many dates. All writes commit or none do.
    pub async fn bulk_set(
        &self,
        warehouse_id: Uuid,
        dates: &[NaiveDate],
        is_available: bool,
        reason: Option<String>,
    ) -> AppResult<Vec<AvailabilityRecord>> {
        // Sorted, de-duplicated order keeps row locks consistent across concurrent batches
        let mut dates = dates.to_vec();
        dates.sort_unstable();
        dates.dedup();

        let reason = if is_available { None } else { reason };

        let mut tx = self.db.begin().await?;
        let mut records = Vec::with_capacity(dates.len());
        for date in &dates {
            let record =
                Self::upsert(&mut *tx, warehouse_id, *date, is_available, reason.as_deref())
                    .await?;
            records.push(record);
        }
        tx.commit().await?;

        tracing::info!(
            "Warehouse {} availability set to {} on {} dates",
            warehouse_id,
            is_available,
            records.len()
        );

        Ok(records)
    }

    /// Split every day of the range into available and unavailable dates
    pub async fn get_available_dates_in_range(
        &self,
        warehouse_id: Uuid,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> AppResult<DateAvailability> {
        let overrides: HashMap<NaiveDate, bool> = self
            .get_availability_for_warehouse(warehouse_id, start_date, end_date)
            .await?
            .into_iter()
            .map(|record| (record.date, record.is_available))
            .collect();

        Ok(classify_dates(start_date, end_date, &overrides))
    }
}
