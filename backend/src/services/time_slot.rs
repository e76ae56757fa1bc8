//! Time slot registry
//!
//! Owns the per-warehouse, per-date slots and their booking counters. The
//! counter is only ever changed through the conditional updates below so
//! that `0 <= current_bookings <= max_bookings` holds under concurrency.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Deserialize;
use shared::{
    default_slot_plan, validate_max_bookings, validate_slot_times, TimeSlot, TimeSlotStatistics,
    DEFAULT_SLOT_CAPACITY,
};
use sqlx::{postgres::PgExecutor, FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Time slot registry service
#[derive(Clone)]
pub struct TimeSlotService {
    db: PgPool,
}

#[derive(Debug, FromRow)]
struct TimeSlotRow {
    id: Uuid,
    warehouse_id: Uuid,
    date: NaiveDate,
    start_time: NaiveTime,
    end_time: NaiveTime,
    is_available: bool,
    max_bookings: i32,
    current_bookings: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<TimeSlotRow> for TimeSlot {
    fn from(row: TimeSlotRow) -> Self {
        TimeSlot {
            id: row.id,
            warehouse_id: row.warehouse_id,
            date: row.date,
            start_time: row.start_time,
            end_time: row.end_time,
            is_available: row.is_available,
            max_bookings: row.max_bookings,
            current_bookings: row.current_bookings,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct StatisticsRow {
    total_slots: i64,
    available_slots: i64,
    total_bookings: i64,
    total_capacity: i64,
}

const SLOT_COLUMNS: &str = "id, warehouse_id, date, start_time, end_time, is_available, \
                            max_bookings, current_bookings, created_at, updated_at";

/// Input for creating a slot by hand
#[derive(Debug, Deserialize)]
pub struct CreateTimeSlotInput {
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub max_bookings: Option<i32>,
}

/// Input for adjusting an existing slot
#[derive(Debug, Default, Deserialize)]
pub struct UpdateTimeSlotInput {
    pub is_available: Option<bool>,
    pub max_bookings: Option<i32>,
}

impl TimeSlotService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create a slot. Overlapping slots on the same date are allowed.
    pub async fn create(&self, warehouse_id: Uuid, input: CreateTimeSlotInput) -> AppResult<TimeSlot> {
        validate_slot_times(input.start_time, input.end_time)
            .map_err(|msg| AppError::validation("end_time", msg))?;
        let max_bookings = input.max_bookings.unwrap_or(DEFAULT_SLOT_CAPACITY);
        validate_max_bookings(max_bookings)
            .map_err(|msg| AppError::validation("max_bookings", msg))?;

        let slot = Self::insert(
            &self.db,
            warehouse_id,
            input.date,
            input.start_time,
            input.end_time,
            max_bookings,
        )
        .await?;

        tracing::info!(
            "Created time slot {} for warehouse {} on {} ({}-{})",
            slot.id,
            warehouse_id,
            slot.date,
            slot.start_time,
            slot.end_time
        );

        Ok(slot)
    }

    async fn insert<'e, E: PgExecutor<'e>>(
        executor: E,
        warehouse_id: Uuid,
        date: NaiveDate,
        start_time: NaiveTime,
        end_time: NaiveTime,
        max_bookings: i32,
    ) -> AppResult<TimeSlot> {
        let row = sqlx::query_as::<_, TimeSlotRow>(&format!(
            r#"
            INSERT INTO time_slots (warehouse_id, date, start_time, end_time, max_bookings)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {SLOT_COLUMNS}
            "#
        ))
        .bind(warehouse_id)
        .bind(date)
        .bind(start_time)
        .bind(end_time)
        .bind(max_bookings)
        .fetch_one(executor)
        .await?;

        Ok(row.into())
    }

    pub async fn find_by_id(&self, slot_id: Uuid) -> AppResult<Option<TimeSlot>> {
        let row = sqlx::query_as::<_, TimeSlotRow>(&format!(
            "SELECT {SLOT_COLUMNS} FROM time_slots WHERE id = $1"
        ))
        .bind(slot_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Fetch a slot or fail with not-found
    pub async fn require(&self, slot_id: Uuid) -> AppResult<TimeSlot> {
        self.find_by_id(slot_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Time slot".to_string()))
    }

    /// Every slot for a warehouse day, including closed and full ones
    pub async fn list_for_date(&self, warehouse_id: Uuid, date: NaiveDate) -> AppResult<Vec<TimeSlot>> {
        let rows = sqlx::query_as::<_, TimeSlotRow>(&format!(
            r#"
            SELECT {SLOT_COLUMNS} FROM time_slots
            WHERE warehouse_id = $1 AND date = $2
            ORDER BY start_time ASC
            "#
        ))
        .bind(warehouse_id)
        .bind(date)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Slots that are switched on and still have capacity, by start time
    pub async fn get_available_slots(
        &self,
        warehouse_id: Uuid,
        date: NaiveDate,
    ) -> AppResult<Vec<TimeSlot>> {
        let rows = sqlx::query_as::<_, TimeSlotRow>(&format!(
            r#"
            SELECT {SLOT_COLUMNS} FROM time_slots
            WHERE warehouse_id = $1
              AND date = $2
              AND is_available = TRUE
              AND current_bookings < max_bookings
            ORDER BY start_time ASC
            "#
        ))
        .bind(warehouse_id)
        .bind(date)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Provision the default plan for a warehouse day that has no slots.
    ///
    /// Returns the number of slots created; zero when the day already had
    /// slots. Concurrent callers for the same day are serialized on a
    /// transaction-scoped advisory lock so the plan is created at most once.
    pub async fn ensure_default_slots(&self, warehouse_id: Uuid, date: NaiveDate) -> AppResult<u64> {
        let mut tx = self.db.begin().await?;

        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
            .bind(format!("time_slots:{}:{}", warehouse_id, date))
            .execute(&mut *tx)
            .await?;

        let existing = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM time_slots WHERE warehouse_id = $1 AND date = $2",
        )
        .bind(warehouse_id)
        .bind(date)
        .fetch_one(&mut *tx)
        .await?;

        if existing > 0 {
            tx.commit().await?;
            return Ok(0);
        }

        let mut created = 0u64;
        for window in default_slot_plan() {
            Self::insert(
                &mut *tx,
                warehouse_id,
                date,
                window.start_time,
                window.end_time,
                DEFAULT_SLOT_CAPACITY,
            )
            .await?;
            created += 1;
        }

        tx.commit().await?;

        tracing::info!(
            "Provisioned {} default slots for warehouse {} on {}",
            created,
            warehouse_id,
            date
        );

        Ok(created)
    }

    /// Reserve one unit of capacity. Returns `false` when the slot is full
    /// or missing; the counter never exceeds `max_bookings`.
    pub async fn increment_bookings_with<'e, E: PgExecutor<'e>>(
        executor: E,
        slot_id: Uuid,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE time_slots
            SET current_bookings = current_bookings + 1, updated_at = NOW()
            WHERE id = $1 AND current_bookings < max_bookings
            "#,
        )
        .bind(slot_id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Release one unit of capacity, floored at zero. Returns `false` when
    /// the slot does not exist.
    pub async fn decrement_bookings_with<'e, E: PgExecutor<'e>>(
        executor: E,
        slot_id: Uuid,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE time_slots
            SET current_bookings = GREATEST(current_bookings - 1, 0), updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(slot_id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn increment_bookings(&self, slot_id: Uuid) -> AppResult<bool> {
        Self::increment_bookings_with(&self.db, slot_id).await
    }

    pub async fn decrement_bookings(&self, slot_id: Uuid) -> AppResult<bool> {
        Self::decrement_bookings_with(&self.db, slot_id).await
    }

    /// Whether a slot is switched on and has spare capacity; `false` if missing
    pub async fn is_available(&self, slot_id: Uuid) -> AppResult<bool> {
        Ok(self
            .find_by_id(slot_id)
            .await?
            .map(|slot| slot.is_bookable())
            .unwrap_or(false))
    }

    /// Toggle a slot or change its capacity. Capacity may not drop below
    /// the number of bookings already holding the slot.
    pub async fn update(&self, slot_id: Uuid, input: UpdateTimeSlotInput) -> AppResult<TimeSlot> {
        if let Some(max_bookings) = input.max_bookings {
            validate_max_bookings(max_bookings)
                .map_err(|msg| AppError::validation("max_bookings", msg))?;
        }

        let row = sqlx::query_as::<_, TimeSlotRow>(&format!(
            r#"
            UPDATE time_slots
            SET is_available = COALESCE($2, is_available),
                max_bookings = COALESCE($3, max_bookings),
                updated_at = NOW()
            WHERE id = $1 AND COALESCE($3, max_bookings) >= current_bookings
            RETURNING {SLOT_COLUMNS}
            "#
        ))
        .bind(slot_id)
        .bind(input.is_available)
        .bind(input.max_bookings)
        .fetch_optional(&self.db)
        .await?;

        match row {
            Some(row) => Ok(row.into()),
            None => {
                let slot = self.require(slot_id).await?;
                Err(AppError::validation(
                    "max_bookings",
                    &format!(
                        "Capacity cannot be lower than current bookings ({})",
                        slot.current_bookings
                    ),
                ))
            }
        }
    }

    /// Delete a slot that no booking references.
    ///
    /// The slot row is locked before the bookings check. A booking being
    /// created holds the same row lock through its counter update, so the
    /// check runs after that booking commits and sees it.
    pub async fn delete(&self, slot_id: Uuid) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        let locked = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM time_slots WHERE id = $1 FOR UPDATE",
        )
        .bind(slot_id)
        .fetch_optional(&mut *tx)
        .await?;
        if locked.is_none() {
            tx.rollback().await?;
            return Err(AppError::NotFound("Time slot".to_string()));
        }

        let has_bookings = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM bookings WHERE time_slot_id = $1)",
        )
        .bind(slot_id)
        .fetch_one(&mut *tx)
        .await?;
        if has_bookings {
            tx.rollback().await?;
            return Err(AppError::Conflict(
                "Time slot has bookings and cannot be deleted".to_string(),
            ));
        }

        sqlx::query("DELETE FROM time_slots WHERE id = $1")
            .bind(slot_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!("Deleted time slot {}", slot_id);
        Ok(())
    }

    /// Aggregate slot figures over an inclusive date range
    pub async fn get_statistics(
        &self,
        warehouse_id: Option<Uuid>,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> AppResult<TimeSlotStatistics> {
        let row = sqlx::query_as::<_, StatisticsRow>(
            r#"
            SELECT
                COUNT(*)::BIGINT AS total_slots,
                COUNT(*) FILTER (WHERE is_available AND current_bookings < max_bookings)::BIGINT
                    AS available_slots,
                COALESCE(SUM(current_bookings), 0)::BIGINT AS total_bookings,
                COALESCE(SUM(max_bookings), 0)::BIGINT AS total_capacity
            FROM time_slots
            WHERE date BETWEEN $1 AND $2
              AND ($3::uuid IS NULL OR warehouse_id = $3)
            "#,
        )
        .bind(start_date)
        .bind(end_date)
        .bind(warehouse_id)
        .fetch_one(&self.db)
        .await?;

        Ok(TimeSlotStatistics {
            total_slots: row.total_slots,
            available_slots: row.available_slots,
            total_bookings: row.total_bookings,
            total_capacity: row.total_capacity,
        })
    }
}
