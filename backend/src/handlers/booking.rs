//! HTTP handlers for booking endpoints

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use shared::{Booking, BookingStatistics, BookingStatus, PaginatedResponse, Pagination};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::extractors::{AppJson, AppPath, AppQuery};
use crate::middleware::{AuthUser, CurrentUser, UserRole};
use crate::services::booking::{
    ApproveBookingInput, BookingService, CreateBookingInput, QrVerification, RejectBookingInput,
};
use crate::services::booking_ledger::{BookingFilter, BookingView, UpdateBookingInput};
use crate::services::reporting::ReportingService;
use crate::AppState;

const STAFF: &[UserRole] = &[UserRole::Admin, UserRole::FieldOfficer];

/// Query parameters for searching bookings
#[derive(Debug, Deserialize)]
pub struct BookingSearchQuery {
    pub farmer_id: Option<Uuid>,
    pub warehouse_id: Option<Uuid>,
    pub status: Option<BookingStatus>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl BookingSearchQuery {
    /// Farmers only ever see their own bookings
    fn filter_for(&self, user: &AuthUser) -> BookingFilter {
        BookingFilter {
            farmer_id: if user.is_staff() {
                self.farmer_id
            } else {
                Some(user.user_id)
            },
            warehouse_id: self.warehouse_id,
            status: self.status,
            start_date: self.start_date,
            end_date: self.end_date,
        }
    }
}

/// Query parameters for warehouse-scoped listings
#[derive(Debug, Deserialize)]
pub struct WarehouseScopeQuery {
    pub warehouse_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct BookingStatisticsQuery {
    pub warehouse_id: Option<Uuid>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct VerifyQrInput {
    pub qr_code_data: String,
}

fn ensure_can_view(user: &AuthUser, booking: &Booking) -> AppResult<()> {
    if user.is_staff() || booking.farmer_id == user.user_id {
        Ok(())
    } else {
        // Do not reveal other farmers' booking IDs
        Err(AppError::NotFound("Booking".to_string()))
    }
}

// ============================================================================
// Farmer operations
// ============================================================================

/// Request a booking for a time slot
pub async fn create_booking(
    State(state): State<AppState>,
    current_user: CurrentUser,
    AppJson(input): AppJson<CreateBookingInput>,
) -> AppResult<(StatusCode, Json<Booking>)> {
    current_user.0.require_role(&[UserRole::Farmer])?;

    let service = BookingService::from_state(&state);
    let booking = service.create_booking(current_user.0.user_id, input).await?;
    Ok((StatusCode::CREATED, Json(booking)))
}

/// Bookings of the calling farmer
pub async fn my_bookings(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<BookingView>>> {
    let service = BookingService::from_state(&state);
    let bookings = service.get_farmer_bookings(current_user.0.user_id).await?;
    Ok(Json(bookings))
}

/// Get a booking by ID
pub async fn get_booking(
    State(state): State<AppState>,
    current_user: CurrentUser,
    AppPath(booking_id): AppPath<Uuid>,
) -> AppResult<Json<BookingView>> {
    let service = BookingService::from_state(&state);
    let view = service.get_booking(booking_id).await?;
    ensure_can_view(&current_user.0, &view.booking)?;
    Ok(Json(view))
}

/// Update contact details or notes.
/// Admins edit any booking; farmers amend their own pending bookings.
pub async fn update_booking(
    State(state): State<AppState>,
    current_user: CurrentUser,
    AppPath(booking_id): AppPath<Uuid>,
    AppJson(input): AppJson<UpdateBookingInput>,
) -> AppResult<Json<Booking>> {
    let service = BookingService::from_state(&state);
    let user = &current_user.0;

    let booking = match user.role {
        UserRole::Admin => service.update_booking(booking_id, input).await?,
        UserRole::Farmer => {
            service
                .amend_pending_booking(user.user_id, booking_id, input)
                .await?
        }
        UserRole::FieldOfficer => return Err(AppError::InsufficientPermissions),
    };
    Ok(Json(booking))
}

// ============================================================================
// Admin decisions
// ============================================================================

/// Approve a pending booking
pub async fn approve_booking(
    State(state): State<AppState>,
    current_user: CurrentUser,
    AppPath(booking_id): AppPath<Uuid>,
    input: Option<AppJson<ApproveBookingInput>>,
) -> AppResult<Json<Booking>> {
    current_user.0.require_role(&[UserRole::Admin])?;

    let admin_notes = input.and_then(|AppJson(input)| input.admin_notes);
    let service = BookingService::from_state(&state);
    let booking = service
        .approve_booking(booking_id, current_user.0.user_id, admin_notes)
        .await?;
    Ok(Json(booking))
}

/// Reject a pending booking
pub async fn reject_booking(
    State(state): State<AppState>,
    current_user: CurrentUser,
    AppPath(booking_id): AppPath<Uuid>,
    AppJson(input): AppJson<RejectBookingInput>,
) -> AppResult<Json<Booking>> {
    current_user.0.require_role(&[UserRole::Admin])?;

    let service = BookingService::from_state(&state);
    let booking = service
        .reject_booking(
            booking_id,
            current_user.0.user_id,
            &input.reason,
            input.admin_notes,
        )
        .await?;
    Ok(Json(booking))
}

// ============================================================================
// Gate handshake
// ============================================================================

/// Confirm the farmer collected storage access
pub async fn confirm_pickup(
    State(state): State<AppState>,
    current_user: CurrentUser,
    AppPath(booking_id): AppPath<Uuid>,
) -> AppResult<Json<Booking>> {
    current_user.0.require_role(STAFF)?;

    let service = BookingService::from_state(&state);
    let booking = service.confirm_pickup(booking_id).await?;
    Ok(Json(booking))
}

/// Confirm the return and complete the booking
pub async fn confirm_return(
    State(state): State<AppState>,
    current_user: CurrentUser,
    AppPath(booking_id): AppPath<Uuid>,
) -> AppResult<Json<Booking>> {
    current_user.0.require_role(STAFF)?;

    let service = BookingService::from_state(&state);
    let booking = service.confirm_return(booking_id).await?;
    Ok(Json(booking))
}

/// Check a scanned QR code
pub async fn verify_qr(
    State(state): State<AppState>,
    current_user: CurrentUser,
    AppJson(input): AppJson<VerifyQrInput>,
) -> AppResult<Json<QrVerification>> {
    current_user.0.require_role(STAFF)?;

    let service = BookingService::from_state(&state);
    let verification = service.verify_qr(&input.qr_code_data).await?;
    Ok(Json(verification))
}

/// Replace a lost QR code for the current leg
pub async fn reissue_qr(
    State(state): State<AppState>,
    current_user: CurrentUser,
    AppPath(booking_id): AppPath<Uuid>,
) -> AppResult<Json<Booking>> {
    current_user.0.require_role(STAFF)?;

    let service = BookingService::from_state(&state);
    let booking = service.reissue_qr(booking_id).await?;
    Ok(Json(booking))
}

// ============================================================================
// Listings
// ============================================================================

/// Search bookings with pagination
pub async fn search_bookings(
    State(state): State<AppState>,
    current_user: CurrentUser,
    AppQuery(query): AppQuery<BookingSearchQuery>,
) -> AppResult<Json<PaginatedResponse<BookingView>>> {
    let filter = query.filter_for(&current_user.0);
    let pagination = Pagination::new(query.page, query.per_page);

    let service = BookingService::from_state(&state);
    let page = service.search_bookings(&filter, &pagination).await?;
    Ok(Json(page))
}

/// Export a booking search as CSV
pub async fn export_bookings(
    State(state): State<AppState>,
    current_user: CurrentUser,
    AppQuery(query): AppQuery<BookingSearchQuery>,
) -> AppResult<impl IntoResponse> {
    current_user.0.require_role(&[UserRole::Admin])?;

    let filter = query.filter_for(&current_user.0);
    let service = ReportingService::new(state.db)
        .with_max_range_days(state.config.booking.max_range_days);
    let csv = service.export_bookings(&filter).await?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"bookings.csv\"",
            ),
        ],
        csv,
    ))
}

/// Approved bookings scheduled for today
pub async fn todays_bookings(
    State(state): State<AppState>,
    current_user: CurrentUser,
    AppQuery(query): AppQuery<WarehouseScopeQuery>,
) -> AppResult<Json<Vec<BookingView>>> {
    current_user.0.require_role(STAFF)?;

    let service = BookingService::from_state(&state);
    let bookings = service.get_todays_bookings(query.warehouse_id).await?;
    Ok(Json(bookings))
}

/// Approved bookings whose slot date has passed
pub async fn overdue_bookings(
    State(state): State<AppState>,
    current_user: CurrentUser,
    AppQuery(query): AppQuery<WarehouseScopeQuery>,
) -> AppResult<Json<Vec<BookingView>>> {
    current_user.0.require_role(STAFF)?;

    let service = BookingService::from_state(&state);
    let bookings = service.get_overdue_bookings(query.warehouse_id).await?;
    Ok(Json(bookings))
}

/// Booking counts by status
pub async fn booking_statistics(
    State(state): State<AppState>,
    current_user: CurrentUser,
    AppQuery(query): AppQuery<BookingStatisticsQuery>,
) -> AppResult<Json<BookingStatistics>> {
    current_user.0.require_role(&[UserRole::Admin])?;

    let service = BookingService::from_state(&state);
    let stats = service
        .get_booking_statistics(query.warehouse_id, query.start_date, query.end_date)
        .await?;
    Ok(Json(stats))
}
