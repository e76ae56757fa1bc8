//! Booking ledger
//!
//! Persistence and queries for booking records. Lifecycle writes are
//! conditional on the current status so a transition applies at most once;
//! `None` from a transition means the guard did not match. Capacity is not
//! touched here: callers reserve or release it in the same transaction.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use shared::{
    Booking, BookingStatistics, BookingStatus, PaginatedResponse, Pagination,
};
use sqlx::{postgres::PgExecutor, FromRow, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::external::QrArtifact;

/// Booking ledger service
#[derive(Clone)]
pub struct BookingLedger {
    db: PgPool,
}

#[derive(Debug, FromRow)]
pub(crate) struct BookingRow {
    id: Uuid,
    farmer_id: Uuid,
    warehouse_id: Uuid,
    time_slot_id: Uuid,
    farmer_name: String,
    farmer_mobile: String,
    farmer_email: Option<String>,
    farmer_address: Option<String>,
    storage_requirements: Option<String>,
    status: String,
    admin_notes: Option<String>,
    rejection_reason: Option<String>,
    qr_code_url: Option<String>,
    qr_code_data: Option<String>,
    approved_by: Option<Uuid>,
    approved_at: Option<DateTime<Utc>>,
    picked_up_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<BookingRow> for Booking {
    type Error = AppError;

    fn try_from(row: BookingRow) -> Result<Self, Self::Error> {
        let status = BookingStatus::from_str(&row.status).ok_or_else(|| {
            AppError::Internal(format!(
                "Booking {} has unknown status '{}'",
                row.id, row.status
            ))
        })?;

        Ok(Booking {
            id: row.id,
            farmer_id: row.farmer_id,
            warehouse_id: row.warehouse_id,
            time_slot_id: row.time_slot_id,
            farmer_name: row.farmer_name,
            farmer_mobile: row.farmer_mobile,
            farmer_email: row.farmer_email,
            farmer_address: row.farmer_address,
            storage_requirements: row.storage_requirements,
            status,
            admin_notes: row.admin_notes,
            rejection_reason: row.rejection_reason,
            qr_code_url: row.qr_code_url,
            qr_code_data: row.qr_code_data,
            approved_by: row.approved_by,
            approved_at: row.approved_at,
            picked_up_at: row.picked_up_at,
            completed_at: row.completed_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Booking joined with its slot and warehouse for listings
#[derive(Debug, Clone, Serialize)]
pub struct BookingView {
    #[serde(flatten)]
    pub booking: Booking,
    pub slot_date: NaiveDate,
    pub slot_start_time: NaiveTime,
    pub slot_end_time: NaiveTime,
    pub warehouse_name: String,
}

#[derive(Debug, FromRow)]
struct BookingViewRow {
    #[sqlx(flatten)]
    booking: BookingRow,
    slot_date: NaiveDate,
    slot_start_time: NaiveTime,
    slot_end_time: NaiveTime,
    warehouse_name: String,
}

impl TryFrom<BookingViewRow> for BookingView {
    type Error = AppError;

    fn try_from(row: BookingViewRow) -> Result<Self, Self::Error> {
        Ok(BookingView {
            booking: row.booking.try_into()?,
            slot_date: row.slot_date,
            slot_start_time: row.slot_start_time,
            slot_end_time: row.slot_end_time,
            warehouse_name: row.warehouse_name,
        })
    }
}

#[derive(Debug, FromRow)]
struct StatisticsRow {
    total: i64,
    pending: i64,
    approved: i64,
    rejected: i64,
    completed: i64,
}

const BOOKING_COLUMNS: &str = "id, farmer_id, warehouse_id, time_slot_id, farmer_name, \
    farmer_mobile, farmer_email, farmer_address, storage_requirements, status, admin_notes, \
    rejection_reason, qr_code_url, qr_code_data, approved_by, approved_at, picked_up_at, \
    completed_at, created_at, updated_at";

const BOOKING_VIEW_SELECT: &str = r#"
    SELECT b.id, b.farmer_id, b.warehouse_id, b.time_slot_id, b.farmer_name,
           b.farmer_mobile, b.farmer_email, b.farmer_address, b.storage_requirements,
           b.status, b.admin_notes, b.rejection_reason, b.qr_code_url, b.qr_code_data,
           b.approved_by, b.approved_at, b.picked_up_at, b.completed_at,
           b.created_at, b.updated_at,
           ts.date AS slot_date, ts.start_time AS slot_start_time,
           ts.end_time AS slot_end_time, w.name AS warehouse_name
    FROM bookings b
    JOIN time_slots ts ON ts.id = b.time_slot_id
    JOIN warehouses w ON w.id = b.warehouse_id
"#;

/// Filter predicate shared by searches and listings. Dates apply to the slot date.
const BOOKING_FILTER: &str = r#"
    WHERE ($1::uuid IS NULL OR b.farmer_id = $1)
      AND ($2::uuid IS NULL OR b.warehouse_id = $2)
      AND ($3::text IS NULL OR b.status = $3)
      AND ($4::date IS NULL OR ts.date >= $4)
      AND ($5::date IS NULL OR ts.date <= $5)
"#;

/// Record for a new pending booking
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub farmer_id: Uuid,
    pub warehouse_id: Uuid,
    pub time_slot_id: Uuid,
    pub farmer_name: String,
    pub farmer_mobile: String,
    pub farmer_email: Option<String>,
    pub farmer_address: Option<String>,
    pub storage_requirements: Option<String>,
}

/// Editable farmer details and notes; status is never changed here
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateBookingInput {
    #[validate(length(min = 1, max = 100, message = "Farmer name must be 1-100 characters"))]
    pub farmer_name: Option<String>,
    #[validate(custom = "shared::validate_mobile_field")]
    pub farmer_mobile: Option<String>,
    #[validate(email(message = "Invalid email address"))]
    pub farmer_email: Option<String>,
    #[validate(length(max = 500, message = "Address must be at most 500 characters"))]
    pub farmer_address: Option<String>,
    #[validate(length(max = 1000, message = "Storage requirements must be at most 1000 characters"))]
    pub storage_requirements: Option<String>,
    #[validate(length(max = 1000, message = "Notes must be at most 1000 characters"))]
    pub admin_notes: Option<String>,
}

/// Search criteria; every field is optional
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookingFilter {
    pub farmer_id: Option<Uuid>,
    pub warehouse_id: Option<Uuid>,
    pub status: Option<BookingStatus>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl BookingLedger {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Insert a pending booking
    pub(crate) async fn create<'e, E: PgExecutor<'e>>(
        executor: E,
        new: &NewBooking,
    ) -> AppResult<Booking> {
        let row = sqlx::query_as::<_, BookingRow>(&format!(
            r#"
            INSERT INTO bookings (
                farmer_id, warehouse_id, time_slot_id, farmer_name, farmer_mobile,
                farmer_email, farmer_address, storage_requirements, status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'pending')
            RETURNING {BOOKING_COLUMNS}
            "#
        ))
        .bind(new.farmer_id)
        .bind(new.warehouse_id)
        .bind(new.time_slot_id)
        .bind(&new.farmer_name)
        .bind(&new.farmer_mobile)
        .bind(&new.farmer_email)
        .bind(&new.farmer_address)
        .bind(&new.storage_requirements)
        .fetch_one(executor)
        .await?;

        row.try_into()
    }

    pub async fn find_by_id(&self, booking_id: Uuid) -> AppResult<Option<Booking>> {
        let row = sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1"
        ))
        .bind(booking_id)
        .fetch_optional(&self.db)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Fetch a booking or fail with not-found
    pub async fn require(&self, booking_id: Uuid) -> AppResult<Booking> {
        self.find_by_id(booking_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Booking".to_string()))
    }

    /// Booking with slot and warehouse details
    pub async fn find_view(&self, booking_id: Uuid) -> AppResult<Option<BookingView>> {
        let row = sqlx::query_as::<_, BookingViewRow>(&format!(
            "{BOOKING_VIEW_SELECT} WHERE b.id = $1"
        ))
        .bind(booking_id)
        .fetch_optional(&self.db)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Patch farmer details or notes. Absent fields keep their value.
    ///
    /// With `required_status` set the write only lands while the booking is
    /// still in that status, so a concurrent transition cannot slip between
    /// the caller's read and this write.
    pub async fn update(
        &self,
        booking_id: Uuid,
        input: UpdateBookingInput,
        required_status: Option<BookingStatus>,
    ) -> AppResult<Booking> {
        input.validate()?;

        let row = sqlx::query_as::<_, BookingRow>(&format!(
            r#"
            UPDATE bookings
            SET farmer_name = COALESCE($2, farmer_name),
                farmer_mobile = COALESCE($3, farmer_mobile),
                farmer_email = COALESCE($4, farmer_email),
                farmer_address = COALESCE($5, farmer_address),
                storage_requirements = COALESCE($6, storage_requirements),
                admin_notes = COALESCE($7, admin_notes),
                updated_at = NOW()
            WHERE id = $1 AND ($8::text IS NULL OR status = $8)
            RETURNING {BOOKING_COLUMNS}
            "#
        ))
        .bind(booking_id)
        .bind(&input.farmer_name)
        .bind(&input.farmer_mobile)
        .bind(&input.farmer_email)
        .bind(&input.farmer_address)
        .bind(&input.storage_requirements)
        .bind(&input.admin_notes)
        .bind(required_status.map(|s| s.as_str()))
        .fetch_optional(&self.db)
        .await?;

        match row {
            Some(row) => row.try_into(),
            None => {
                let current = self.require(booking_id).await?;
                Err(AppError::InvalidStateTransition(format!(
                    "Only {} bookings can be edited, this one is {}",
                    required_status.unwrap_or(current.status).as_str(),
                    current.status.as_str()
                )))
            }
        }
    }

    /// pending -> approved, storing the audit fields and the pickup QR
    pub(crate) async fn approve<'e, E: PgExecutor<'e>>(
        executor: E,
        booking_id: Uuid,
        admin_id: Uuid,
        admin_notes: Option<&str>,
        pickup_qr: &QrArtifact,
    ) -> AppResult<Option<Booking>> {
        let row = sqlx::query_as::<_, BookingRow>(&format!(
            r#"
            UPDATE bookings
            SET status = 'approved',
                approved_by = $2,
                approved_at = NOW(),
                admin_notes = COALESCE($3, admin_notes),
                qr_code_data = $4,
                qr_code_url = $5,
                updated_at = NOW()
            WHERE id = $1 AND status = 'pending'
            RETURNING {BOOKING_COLUMNS}
            "#
        ))
        .bind(booking_id)
        .bind(admin_id)
        .bind(admin_notes)
        .bind(&pickup_qr.data)
        .bind(&pickup_qr.url)
        .fetch_optional(executor)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// pending -> rejected with the reason and the deciding admin
    pub(crate) async fn reject<'e, E: PgExecutor<'e>>(
        executor: E,
        booking_id: Uuid,
        admin_id: Uuid,
        reason: &str,
        admin_notes: Option<&str>,
    ) -> AppResult<Option<Booking>> {
        let row = sqlx::query_as::<_, BookingRow>(&format!(
            r#"
            UPDATE bookings
            SET status = 'rejected',
                rejection_reason = $3,
                approved_by = $2,
                approved_at = NOW(),
                admin_notes = COALESCE($4, admin_notes),
                updated_at = NOW()
            WHERE id = $1 AND status = 'pending'
            RETURNING {BOOKING_COLUMNS}
            "#
        ))
        .bind(booking_id)
        .bind(admin_id)
        .bind(reason)
        .bind(admin_notes)
        .fetch_optional(executor)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Record the pickup on an approved booking and swap in the return QR
    pub(crate) async fn confirm_pickup<'e, E: PgExecutor<'e>>(
        executor: E,
        booking_id: Uuid,
        return_qr: &QrArtifact,
    ) -> AppResult<Option<Booking>> {
        let row = sqlx::query_as::<_, BookingRow>(&format!(
            r#"
            UPDATE bookings
            SET qr_code_data = $2,
                qr_code_url = $3,
                picked_up_at = NOW(),
                updated_at = NOW()
            WHERE id = $1 AND status = 'approved'
            RETURNING {BOOKING_COLUMNS}
            "#
        ))
        .bind(booking_id)
        .bind(&return_qr.data)
        .bind(&return_qr.url)
        .fetch_optional(executor)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// approved -> completed
    pub(crate) async fn confirm_return<'e, E: PgExecutor<'e>>(
        executor: E,
        booking_id: Uuid,
    ) -> AppResult<Option<Booking>> {
        let row = sqlx::query_as::<_, BookingRow>(&format!(
            r#"
            UPDATE bookings
            SET status = 'completed',
                completed_at = NOW(),
                updated_at = NOW()
            WHERE id = $1 AND status = 'approved'
            RETURNING {BOOKING_COLUMNS}
            "#
        ))
        .bind(booking_id)
        .fetch_optional(executor)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Replace the pickup QR on an approved booking not yet picked up
    pub async fn update_pickup_qr_code(
        &self,
        booking_id: Uuid,
        artifact: &QrArtifact,
    ) -> AppResult<Option<Booking>> {
        self.replace_qr_code(booking_id, artifact, false).await
    }

    /// Replace the return QR on an approved booking already picked up
    pub async fn update_return_qr_code(
        &self,
        booking_id: Uuid,
        artifact: &QrArtifact,
    ) -> AppResult<Option<Booking>> {
        self.replace_qr_code(booking_id, artifact, true).await
    }

    async fn replace_qr_code(
        &self,
        booking_id: Uuid,
        artifact: &QrArtifact,
        picked_up: bool,
    ) -> AppResult<Option<Booking>> {
        let row = sqlx::query_as::<_, BookingRow>(&format!(
            r#"
            UPDATE bookings
            SET qr_code_data = $2,
                qr_code_url = $3,
                updated_at = NOW()
            WHERE id = $1
              AND status = 'approved'
              AND (picked_up_at IS NOT NULL) = $4
            RETURNING {BOOKING_COLUMNS}
            "#
        ))
        .bind(booking_id)
        .bind(&artifact.data)
        .bind(&artifact.url)
        .bind(picked_up)
        .fetch_optional(&self.db)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Paginated search, newest bookings first
    pub async fn search(
        &self,
        filter: &BookingFilter,
        pagination: &Pagination,
    ) -> AppResult<PaginatedResponse<BookingView>> {
        let total = sqlx::query_scalar::<_, i64>(&format!(
            r#"
            SELECT COUNT(*)
            FROM bookings b
            JOIN time_slots ts ON ts.id = b.time_slot_id
            {BOOKING_FILTER}
            "#
        ))
        .bind(filter.farmer_id)
        .bind(filter.warehouse_id)
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.start_date)
        .bind(filter.end_date)
        .fetch_one(&self.db)
        .await?;

        let rows = sqlx::query_as::<_, BookingViewRow>(&format!(
            "{BOOKING_VIEW_SELECT} {BOOKING_FILTER} ORDER BY b.created_at DESC LIMIT $6 OFFSET $7"
        ))
        .bind(filter.farmer_id)
        .bind(filter.warehouse_id)
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.start_date)
        .bind(filter.end_date)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        let data = rows
            .into_iter()
            .map(TryInto::try_into)
            .collect::<AppResult<Vec<BookingView>>>()?;

        Ok(PaginatedResponse::new(
            data,
            pagination,
            u64::try_from(total).unwrap_or(0),
        ))
    }

    /// Every booking matching the filter, ordered by slot date and time
    pub async fn list(&self, filter: &BookingFilter) -> AppResult<Vec<BookingView>> {
        let rows = sqlx::query_as::<_, BookingViewRow>(&format!(
            "{BOOKING_VIEW_SELECT} {BOOKING_FILTER} ORDER BY ts.date ASC, ts.start_time ASC, b.created_at ASC"
        ))
        .bind(filter.farmer_id)
        .bind(filter.warehouse_id)
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.start_date)
        .bind(filter.end_date)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    pub async fn find_by_farmer(&self, farmer_id: Uuid) -> AppResult<Vec<BookingView>> {
        self.list(&BookingFilter {
            farmer_id: Some(farmer_id),
            ..BookingFilter::default()
        })
        .await
    }

    pub async fn find_by_warehouse(&self, warehouse_id: Uuid) -> AppResult<Vec<BookingView>> {
        self.list(&BookingFilter {
            warehouse_id: Some(warehouse_id),
            ..BookingFilter::default()
        })
        .await
    }

    pub async fn find_by_status(&self, status: BookingStatus) -> AppResult<Vec<BookingView>> {
        self.list(&BookingFilter {
            status: Some(status),
            ..BookingFilter::default()
        })
        .await
    }

    /// Approved bookings whose slot falls on `today`
    pub async fn get_todays_bookings(
        &self,
        warehouse_id: Option<Uuid>,
        today: NaiveDate,
    ) -> AppResult<Vec<BookingView>> {
        self.list(&BookingFilter {
            warehouse_id,
            status: Some(BookingStatus::Approved),
            start_date: Some(today),
            end_date: Some(today),
            ..BookingFilter::default()
        })
        .await
    }

    /// Approved bookings whose slot date is before `today`
    pub async fn get_overdue_bookings(
        &self,
        warehouse_id: Option<Uuid>,
        today: NaiveDate,
    ) -> AppResult<Vec<BookingView>> {
        let rows = sqlx::query_as::<_, BookingViewRow>(&format!(
            r#"
            {BOOKING_VIEW_SELECT}
            WHERE b.status = 'approved'
              AND ts.date < $1
              AND ($2::uuid IS NULL OR b.warehouse_id = $2)
            ORDER BY ts.date ASC, ts.start_time ASC
            "#
        ))
        .bind(today)
        .bind(warehouse_id)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Counts by status, optionally scoped to a warehouse and slot date range
    pub async fn get_statistics(
        &self,
        warehouse_id: Option<Uuid>,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> AppResult<BookingStatistics> {
        let row = sqlx::query_as::<_, StatisticsRow>(
            r#"
            SELECT
                COUNT(*)::BIGINT AS total,
                COUNT(*) FILTER (WHERE b.status = 'pending')::BIGINT AS pending,
                COUNT(*) FILTER (WHERE b.status = 'approved')::BIGINT AS approved,
                COUNT(*) FILTER (WHERE b.status = 'rejected')::BIGINT AS rejected,
                COUNT(*) FILTER (WHERE b.status = 'completed')::BIGINT AS completed
            FROM bookings b
            JOIN time_slots ts ON ts.id = b.time_slot_id
            WHERE ($1::uuid IS NULL OR b.warehouse_id = $1)
              AND ($2::date IS NULL OR ts.date >= $2)
              AND ($3::date IS NULL OR ts.date <= $3)
            "#,
        )
        .bind(warehouse_id)
        .bind(start_date)
        .bind(end_date)
        .fetch_one(&self.db)
        .await?;

        Ok(BookingStatistics {
            total: row.total,
            pending: row.pending,
            approved: row.approved,
            rejected: row.rejected,
            completed: row.completed,
        })
    }
}
