//! HTTP handlers for time slot endpoints

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use shared::{TimeSlot, TimeSlotStatistics};
use uuid::Uuid;

use crate::error::AppResult;
use crate::extractors::{AppJson, AppPath, AppQuery};
use crate::middleware::{CurrentUser, UserRole};
use crate::services::booking::BookingService;
use crate::services::time_slot::{CreateTimeSlotInput, UpdateTimeSlotInput};
use crate::AppState;

/// Query parameters selecting one warehouse day
#[derive(Debug, Deserialize)]
pub struct SlotDateQuery {
    pub date: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub struct SlotStatisticsQuery {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub warehouse_id: Option<Uuid>,
}

/// Bookable slots for a warehouse day
pub async fn get_available_slots(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    AppPath(warehouse_id): AppPath<Uuid>,
    AppQuery(query): AppQuery<SlotDateQuery>,
) -> AppResult<Json<Vec<TimeSlot>>> {
    let service = BookingService::from_state(&state);
    let slots = service.get_available_slots(warehouse_id, query.date).await?;
    Ok(Json(slots))
}

/// Every slot for a warehouse day, including closed and full ones
pub async fn list_slots(
    State(state): State<AppState>,
    current_user: CurrentUser,
    AppPath(warehouse_id): AppPath<Uuid>,
    AppQuery(query): AppQuery<SlotDateQuery>,
) -> AppResult<Json<Vec<TimeSlot>>> {
    current_user.0.require_role(&[UserRole::Admin])?;

    let service = BookingService::from_state(&state);
    let slots = service.list_slots(warehouse_id, query.date).await?;
    Ok(Json(slots))
}

/// Create a slot by hand
pub async fn create_slot(
    State(state): State<AppState>,
    current_user: CurrentUser,
    AppPath(warehouse_id): AppPath<Uuid>,
    AppJson(input): AppJson<CreateTimeSlotInput>,
) -> AppResult<(StatusCode, Json<TimeSlot>)> {
    current_user.0.require_role(&[UserRole::Admin])?;

    let service = BookingService::from_state(&state);
    let slot = service.create_time_slot(warehouse_id, input).await?;
    Ok((StatusCode::CREATED, Json(slot)))
}

/// Provision the default slot plan for a day
pub async fn provision_slots(
    State(state): State<AppState>,
    current_user: CurrentUser,
    AppPath(warehouse_id): AppPath<Uuid>,
    AppQuery(query): AppQuery<SlotDateQuery>,
) -> AppResult<Json<Vec<TimeSlot>>> {
    current_user.0.require_role(&[UserRole::Admin])?;

    let service = BookingService::from_state(&state);
    let slots = service
        .provision_default_slots(warehouse_id, query.date)
        .await?;
    Ok(Json(slots))
}

/// Toggle a slot or change its capacity
pub async fn update_slot(
    State(state): State<AppState>,
    current_user: CurrentUser,
    AppPath(slot_id): AppPath<Uuid>,
    AppJson(input): AppJson<UpdateTimeSlotInput>,
) -> AppResult<Json<TimeSlot>> {
    current_user.0.require_role(&[UserRole::Admin])?;

    let service = BookingService::from_state(&state);
    let slot = service.update_time_slot(slot_id, input).await?;
    Ok(Json(slot))
}

/// Delete a slot with no bookings
pub async fn delete_slot(
    State(state): State<AppState>,
    current_user: CurrentUser,
    AppPath(slot_id): AppPath<Uuid>,
) -> AppResult<StatusCode> {
    current_user.0.require_role(&[UserRole::Admin])?;

    let service = BookingService::from_state(&state);
    service.delete_time_slot(slot_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Slot capacity figures for a date range
pub async fn slot_statistics(
    State(state): State<AppState>,
    current_user: CurrentUser,
    AppQuery(query): AppQuery<SlotStatisticsQuery>,
) -> AppResult<Json<TimeSlotStatistics>> {
    current_user.0.require_role(&[UserRole::Admin])?;

    let service = BookingService::from_state(&state);
    let stats = service
        .get_slot_statistics(query.warehouse_id, query.start_date, query.end_date)
        .await?;
    Ok(Json(stats))
}
