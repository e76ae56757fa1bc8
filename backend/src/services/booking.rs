//! Booking orchestration
//!
//! Coordinates the warehouse directory, availability calendar, slot registry
//! and booking ledger. Every lifecycle transition goes through here so that a
//! slot's booking counter always matches the bookings holding it.

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use shared::{
    check_transition, validate_date_range, validate_reason, AvailabilityRecord, Booking,
    BookingAction, BookingStatistics, BookingStatus, DateAvailability, DateRange,
    PaginatedResponse, Pagination, QrPurpose, QrToken, TimeSlot, TimeSlotStatistics,
    TransitionError,
};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::external::QrCodeGenerator;
use crate::services::availability::AvailabilityService;
use crate::services::booking_ledger::{
    BookingFilter, BookingLedger, BookingView, NewBooking, UpdateBookingInput,
};
use crate::services::notification::NotificationService;
use crate::services::time_slot::{CreateTimeSlotInput, TimeSlotService, UpdateTimeSlotInput};
use crate::services::warehouse::WarehouseService;
use crate::AppState;

/// Booking orchestrator
#[derive(Clone)]
pub struct BookingService {
    db: PgPool,
    warehouses: WarehouseService,
    calendar: AvailabilityService,
    slots: TimeSlotService,
    ledger: BookingLedger,
    notifications: NotificationService,
    qr: QrCodeGenerator,
    max_range_days: i64,
}

/// Farmer's booking request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateBookingInput {
    pub warehouse_id: Uuid,
    pub time_slot_id: Uuid,
    #[validate(length(min = 1, max = 100, message = "Farmer name must be 1-100 characters"))]
    pub farmer_name: String,
    #[validate(custom = "shared::validate_mobile_field")]
    pub farmer_mobile: String,
    #[validate(email(message = "Invalid email address"))]
    pub farmer_email: Option<String>,
    #[validate(length(max = 500, message = "Address must be at most 500 characters"))]
    pub farmer_address: Option<String>,
    #[validate(length(max = 1000, message = "Storage requirements must be at most 1000 characters"))]
    pub storage_requirements: Option<String>,
}

/// Admin decision on a pending booking
#[derive(Debug, Default, Deserialize)]
pub struct ApproveBookingInput {
    pub admin_notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RejectBookingInput {
    pub reason: String,
    pub admin_notes: Option<String>,
}

/// Result of scanning a QR artifact at the warehouse gate
#[derive(Debug, Clone, Serialize)]
pub struct QrVerification {
    pub booking_id: Uuid,
    pub purpose: QrPurpose,
    pub status: BookingStatus,
    /// Token is the booking's current artifact and the booking is approved
    pub valid: bool,
    /// Step the gate should confirm when the token is valid
    pub next_action: Option<BookingAction>,
    pub message: String,
}

impl BookingService {
    pub fn new(db: PgPool, notifications: NotificationService, qr: QrCodeGenerator) -> Self {
        Self {
            warehouses: WarehouseService::new(db.clone()),
            calendar: AvailabilityService::new(db.clone()),
            slots: TimeSlotService::new(db.clone()),
            ledger: BookingLedger::new(db.clone()),
            db,
            notifications,
            qr,
            max_range_days: crate::config::BookingConfig::default().max_range_days,
        }
    }

    /// Build from shared application state
    pub fn from_state(state: &AppState) -> Self {
        Self::new(
            state.db.clone(),
            NotificationService::new(state.sms.clone()),
            QrCodeGenerator::new(&state.config.qr),
        )
        .with_max_range_days(state.config.booking.max_range_days)
    }

    pub fn with_max_range_days(mut self, max_range_days: i64) -> Self {
        self.max_range_days = max_range_days;
        self
    }

    pub fn ledger(&self) -> &BookingLedger {
        &self.ledger
    }

    pub fn slots(&self) -> &TimeSlotService {
        &self.slots
    }

    fn date_range(&self, start_date: NaiveDate, end_date: NaiveDate) -> AppResult<DateRange> {
        validate_date_range(start_date, end_date, self.max_range_days)
            .map_err(|msg| AppError::validation("end_date", msg))
    }

    // ========================================================================
    // Availability and slots
    // ========================================================================

    /// Bookable slots for a warehouse day, provisioning the default plan on
    /// first access. Empty when the warehouse is closed that day.
    pub async fn get_available_slots(
        &self,
        warehouse_id: Uuid,
        date: NaiveDate,
    ) -> AppResult<Vec<TimeSlot>> {
        self.warehouses.require(warehouse_id).await?;

        if !self.calendar.check_availability(warehouse_id, date).await? {
            tracing::debug!("Warehouse {} closed on {}, no slots offered", warehouse_id, date);
            return Ok(Vec::new());
        }

        self.slots.ensure_default_slots(warehouse_id, date).await?;
        self.slots.get_available_slots(warehouse_id, date).await
    }

    /// Every slot for a warehouse day, for administration
    pub async fn list_slots(&self, warehouse_id: Uuid, date: NaiveDate) -> AppResult<Vec<TimeSlot>> {
        self.warehouses.require(warehouse_id).await?;
        self.slots.list_for_date(warehouse_id, date).await
    }

    pub async fn create_time_slot(
        &self,
        warehouse_id: Uuid,
        input: CreateTimeSlotInput,
    ) -> AppResult<TimeSlot> {
        self.warehouses.require(warehouse_id).await?;
        self.slots.create(warehouse_id, input).await
    }

    /// Provision the default plan explicitly; returns the day's slots
    pub async fn provision_default_slots(
        &self,
        warehouse_id: Uuid,
        date: NaiveDate,
    ) -> AppResult<Vec<TimeSlot>> {
        self.warehouses.require(warehouse_id).await?;
        self.slots.ensure_default_slots(warehouse_id, date).await?;
        self.slots.list_for_date(warehouse_id, date).await
    }

    pub async fn update_time_slot(
        &self,
        slot_id: Uuid,
        input: UpdateTimeSlotInput,
    ) -> AppResult<TimeSlot> {
        self.slots.update(slot_id, input).await
    }

    pub async fn delete_time_slot(&self, slot_id: Uuid) -> AppResult<()> {
        self.slots.delete(slot_id).await
    }

    pub async fn get_slot_statistics(
        &self,
        warehouse_id: Option<Uuid>,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> AppResult<TimeSlotStatistics> {
        let range = self.date_range(start_date, end_date)?;
        if let Some(warehouse_id) = warehouse_id {
            self.warehouses.require(warehouse_id).await?;
        }
        self.slots
            .get_statistics(warehouse_id, range.start, range.end)
            .await
    }

    pub async fn get_availability(
        &self,
        warehouse_id: Uuid,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> AppResult<Vec<AvailabilityRecord>> {
        let range = self.date_range(start_date, end_date)?;
        self.warehouses.require(warehouse_id).await?;
        self.calendar
            .get_availability_for_warehouse(warehouse_id, range.start, range.end)
            .await
    }

    pub async fn get_available_dates(
        &self,
        warehouse_id: Uuid,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> AppResult<DateAvailability> {
        let range = self.date_range(start_date, end_date)?;
        self.warehouses.require(warehouse_id).await?;
        self.calendar
            .get_available_dates_in_range(warehouse_id, range.start, range.end)
            .await
    }

    /// Open or close a warehouse on one date
    pub async fn set_availability(
        &self,
        warehouse_id: Uuid,
        date: NaiveDate,
        is_available: bool,
        reason: Option<String>,
    ) -> AppResult<AvailabilityRecord> {
        self.warehouses.require(warehouse_id).await?;
        if is_available {
            self.calendar.set_available(warehouse_id, date).await
        } else {
            validate_optional_reason(reason.as_deref())?;
            self.calendar.set_unavailable(warehouse_id, date, reason).await
        }
    }

    pub async fn bulk_set_availability(
        &self,
        warehouse_id: Uuid,
        dates: &[NaiveDate],
        is_available: bool,
        reason: Option<String>,
    ) -> AppResult<Vec<AvailabilityRecord>> {
        if dates.is_empty() {
            return Err(AppError::validation("dates", "At least one date is required"));
        }
        if let (Some(first), Some(last)) = (dates.iter().min(), dates.iter().max()) {
            self.date_range(*first, *last)
                .map_err(|_| AppError::validation("dates", "Dates span too long a range"))?;
        }
        if !is_available {
            validate_optional_reason(reason.as_deref())?;
        }
        self.warehouses.require(warehouse_id).await?;
        self.calendar
            .bulk_set(warehouse_id, dates, is_available, reason)
            .await
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Create a pending booking and reserve one unit of slot capacity
    pub async fn create_booking(
        &self,
        farmer_id: Uuid,
        input: CreateBookingInput,
    ) -> AppResult<Booking> {
        input.validate()?;
        if input.farmer_name.trim().is_empty() {
            return Err(AppError::validation("farmer_name", "Farmer name is required"));
        }

        let warehouse = self.warehouses.require(input.warehouse_id).await?;
        let slot = self.slots.require(input.time_slot_id).await?;

        if slot.warehouse_id != warehouse.id {
            return Err(AppError::validation(
                "time_slot_id",
                "Time slot does not belong to this warehouse",
            ));
        }
        if !slot.is_available {
            return Err(AppError::SlotUnavailable);
        }
        if !slot.has_capacity() {
            return Err(AppError::SlotFullyBooked);
        }
        if !self
            .calendar
            .check_availability(warehouse.id, slot.date)
            .await?
        {
            return Err(AppError::WarehouseUnavailable(slot.date));
        }

        let new = NewBooking {
            farmer_id,
            warehouse_id: warehouse.id,
            time_slot_id: slot.id,
            farmer_name: input.farmer_name.trim().to_string(),
            farmer_mobile: input.farmer_mobile.trim().to_string(),
            farmer_email: input.farmer_email,
            farmer_address: input.farmer_address,
            storage_requirements: input.storage_requirements,
        };

        let mut tx = self.db.begin().await?;

        // Capacity first; a lost race leaves no booking row behind
        if !TimeSlotService::increment_bookings_with(&mut *tx, slot.id).await? {
            tx.rollback().await?;
            return Err(AppError::SlotFullyBooked);
        }
        let booking = BookingLedger::create(&mut *tx, &new).await?;

        tx.commit().await?;

        tracing::info!(
            "Booking {} created by farmer {} for slot {} on {}",
            booking.id,
            farmer_id,
            slot.id,
            slot.date
        );

        Ok(booking)
    }

    /// pending -> approved; issues the pickup QR and notifies the farmer
    pub async fn approve_booking(
        &self,
        booking_id: Uuid,
        admin_id: Uuid,
        admin_notes: Option<String>,
    ) -> AppResult<Booking> {
        let pickup_qr = self.qr.artifact(&QrToken::pickup(booking_id, Utc::now()));

        let Some(booking) = BookingLedger::approve(
            &self.db,
            booking_id,
            admin_id,
            admin_notes.as_deref(),
            &pickup_qr,
        )
        .await?
        else {
            return Err(self.transition_error(booking_id, BookingAction::Approve).await);
        };

        tracing::info!("Booking {} approved by {}", booking.id, admin_id);

        let slot_date = match self.slots.find_by_id(booking.time_slot_id).await {
            Ok(slot) => slot.map(|s| s.date),
            Err(e) => {
                tracing::warn!("Could not load slot for booking {}: {}", booking.id, e);
                None
            }
        };
        self.notifications.notify_approved(&booking, slot_date).await;

        Ok(booking)
    }

    /// pending -> rejected; releases the slot capacity
    pub async fn reject_booking(
        &self,
        booking_id: Uuid,
        admin_id: Uuid,
        reason: &str,
        admin_notes: Option<String>,
    ) -> AppResult<Booking> {
        validate_reason(reason).map_err(|msg| AppError::validation("reason", msg))?;

        let mut tx = self.db.begin().await?;

        let Some(booking) = BookingLedger::reject(
            &mut *tx,
            booking_id,
            admin_id,
            reason.trim(),
            admin_notes.as_deref(),
        )
        .await?
        else {
            tx.rollback().await?;
            return Err(self.transition_error(booking_id, BookingAction::Reject).await);
        };
        TimeSlotService::decrement_bookings_with(&mut *tx, booking.time_slot_id).await?;

        tx.commit().await?;

        tracing::info!("Booking {} rejected by {}", booking.id, admin_id);

        self.notifications.notify_rejected(&booking).await;

        Ok(booking)
    }

    /// Record the pickup; the booking stays approved and gets its return QR
    pub async fn confirm_pickup(&self, booking_id: Uuid) -> AppResult<Booking> {
        let return_qr = self.qr.artifact(&QrToken::return_of(booking_id, Utc::now()));

        let Some(booking) = BookingLedger::confirm_pickup(&self.db, booking_id, &return_qr).await?
        else {
            return Err(self
                .transition_error(booking_id, BookingAction::ConfirmPickup)
                .await);
        };

        tracing::info!("Booking {} picked up", booking.id);
        Ok(booking)
    }

    /// approved -> completed; releases the slot capacity
    pub async fn confirm_return(&self, booking_id: Uuid) -> AppResult<Booking> {
        let mut tx = self.db.begin().await?;

        let Some(booking) = BookingLedger::confirm_return(&mut *tx, booking_id).await? else {
            tx.rollback().await?;
            return Err(self
                .transition_error(booking_id, BookingAction::ConfirmReturn)
                .await);
        };
        TimeSlotService::decrement_bookings_with(&mut *tx, booking.time_slot_id).await?;

        tx.commit().await?;

        tracing::info!("Booking {} completed", booking.id);
        Ok(booking)
    }

    /// Issue a fresh QR for the current leg of an approved booking
    pub async fn reissue_qr(&self, booking_id: Uuid) -> AppResult<Booking> {
        let booking = self.ledger.require(booking_id).await?;
        if booking.status != BookingStatus::Approved {
            return Err(TransitionError::NotInRequiredStatus {
                required: BookingStatus::Approved,
                actual: booking.status,
            }
            .into());
        }

        let now = Utc::now();
        let updated = if booking.picked_up_at.is_some() {
            let artifact = self.qr.artifact(&QrToken::return_of(booking_id, now));
            self.ledger.update_return_qr_code(booking_id, &artifact).await?
        } else {
            let artifact = self.qr.artifact(&QrToken::pickup(booking_id, now));
            self.ledger.update_pickup_qr_code(booking_id, &artifact).await?
        };

        let booking = updated.ok_or_else(|| {
            AppError::Conflict("Booking changed while reissuing its QR code".to_string())
        })?;
        tracing::info!("QR code reissued for booking {}", booking.id);
        Ok(booking)
    }

    /// Check a scanned QR token against the booking it names
    pub async fn verify_qr(&self, raw: &str) -> AppResult<QrVerification> {
        let raw = raw.trim();
        let token = QrToken::parse(raw)
            .map_err(|e| AppError::validation("qr_code_data", &e.to_string()))?;
        let booking = self.ledger.require(token.booking_id).await?;

        let is_current = booking.qr_code_data.as_deref() == Some(raw);
        let approved = booking.status == BookingStatus::Approved;
        let action = match token.purpose {
            QrPurpose::Pickup => BookingAction::ConfirmPickup,
            QrPurpose::Return => BookingAction::ConfirmReturn,
        };

        let message = if !approved {
            format!("Booking is {}", booking.status)
        } else if !is_current {
            "QR code has been superseded".to_string()
        } else {
            format!("QR code is valid for {}", token.purpose.as_str().to_lowercase())
        };

        let valid = approved && is_current;
        Ok(QrVerification {
            booking_id: booking.id,
            purpose: token.purpose,
            status: booking.status,
            valid,
            next_action: valid.then_some(action),
            message,
        })
    }

    /// Explain why a guarded transition matched no row
    async fn transition_error(&self, booking_id: Uuid, action: BookingAction) -> AppError {
        match self.ledger.find_by_id(booking_id).await {
            Ok(None) => AppError::NotFound("Booking".to_string()),
            Ok(Some(booking)) => match check_transition(booking.status, action) {
                Err(e) => e.into(),
                Ok(_) => AppError::Conflict(format!(
                    "Booking {} changed during {}",
                    booking_id,
                    action.as_str()
                )),
            },
            Err(e) => e,
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub async fn get_booking(&self, booking_id: Uuid) -> AppResult<BookingView> {
        self.ledger
            .find_view(booking_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Booking".to_string()))
    }

    /// Staff edit: any field, any status
    pub async fn update_booking(
        &self,
        booking_id: Uuid,
        input: UpdateBookingInput,
    ) -> AppResult<Booking> {
        self.ledger.update(booking_id, input, None).await
    }

    /// Farmer edit of their own booking while it is still pending.
    /// Admin notes stay staff-only.
    pub async fn amend_pending_booking(
        &self,
        farmer_id: Uuid,
        booking_id: Uuid,
        input: UpdateBookingInput,
    ) -> AppResult<Booking> {
        let booking = self.ledger.require(booking_id).await?;
        if booking.farmer_id != farmer_id {
            return Err(AppError::NotFound("Booking".to_string()));
        }
        if input.admin_notes.is_some() {
            return Err(AppError::InsufficientPermissions);
        }

        let booking = self
            .ledger
            .update(booking_id, input, Some(BookingStatus::Pending))
            .await?;
        tracing::info!("Farmer {} amended booking {}", farmer_id, booking_id);
        Ok(booking)
    }

    pub async fn search_bookings(
        &self,
        filter: &BookingFilter,
        pagination: &Pagination,
    ) -> AppResult<PaginatedResponse<BookingView>> {
        if let (Some(start), Some(end)) = (filter.start_date, filter.end_date) {
            self.date_range(start, end)?;
        }
        self.ledger.search(filter, pagination).await
    }

    pub async fn get_farmer_bookings(&self, farmer_id: Uuid) -> AppResult<Vec<BookingView>> {
        self.ledger.find_by_farmer(farmer_id).await
    }

    pub async fn get_todays_bookings(
        &self,
        warehouse_id: Option<Uuid>,
    ) -> AppResult<Vec<BookingView>> {
        self.ledger
            .get_todays_bookings(warehouse_id, Utc::now().date_naive())
            .await
    }

    pub async fn get_overdue_bookings(
        &self,
        warehouse_id: Option<Uuid>,
    ) -> AppResult<Vec<BookingView>> {
        self.ledger
            .get_overdue_bookings(warehouse_id, Utc::now().date_naive())
            .await
    }

    pub async fn get_booking_statistics(
        &self,
        warehouse_id: Option<Uuid>,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> AppResult<BookingStatistics> {
        if let (Some(start), Some(end)) = (start_date, end_date) {
            self.date_range(start, end)?;
        }
        self.ledger
            .get_statistics(warehouse_id, start_date, end_date)
            .await
    }
}

fn validate_optional_reason(reason: Option<&str>) -> AppResult<()> {
    match reason {
        Some(reason) => validate_reason(reason).map_err(|msg| AppError::validation("reason", msg)),
        None => Ok(()),
    }
}
