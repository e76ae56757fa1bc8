//! HTTP handlers for the warehouse availability calendar

use axum::{
    extract::State,
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use shared::{AvailabilityRecord, DateAvailability};
use uuid::Uuid;

use crate::error::AppResult;
use crate::extractors::{AppJson, AppPath, AppQuery};
use crate::middleware::{CurrentUser, UserRole};
use crate::services::availability::{BulkAvailabilityInput, SetAvailabilityInput};
use crate::services::booking::BookingService;
use crate::AppState;

/// Inclusive date range query
#[derive(Debug, Deserialize)]
pub struct DateRangeQuery {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// Explicit availability overrides in a range
pub async fn get_availability(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    AppPath(warehouse_id): AppPath<Uuid>,
    AppQuery(query): AppQuery<DateRangeQuery>,
) -> AppResult<Json<Vec<AvailabilityRecord>>> {
    let service = BookingService::from_state(&state);
    let records = service
        .get_availability(warehouse_id, query.start_date, query.end_date)
        .await?;
    Ok(Json(records))
}

/// Every date in a range split into open and closed
pub async fn get_available_dates(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    AppPath(warehouse_id): AppPath<Uuid>,
    AppQuery(query): AppQuery<DateRangeQuery>,
) -> AppResult<Json<DateAvailability>> {
    let service = BookingService::from_state(&state);
    let dates = service
        .get_available_dates(warehouse_id, query.start_date, query.end_date)
        .await?;
    Ok(Json(dates))
}

/// Open or close a warehouse on one date
pub async fn set_availability(
    State(state): State<AppState>,
    current_user: CurrentUser,
    AppPath((warehouse_id, date)): AppPath<(Uuid, NaiveDate)>,
    AppJson(input): AppJson<SetAvailabilityInput>,
) -> AppResult<Json<AvailabilityRecord>> {
    current_user.0.require_role(&[UserRole::Admin])?;

    let service = BookingService::from_state(&state);
    let record = service
        .set_availability(warehouse_id, date, input.is_available, input.reason)
        .await?;
    Ok(Json(record))
}

/// Open or close a warehouse on many dates at once
pub async fn bulk_set_availability(
    State(state): State<AppState>,
    current_user: CurrentUser,
    AppPath(warehouse_id): AppPath<Uuid>,
    AppJson(input): AppJson<BulkAvailabilityInput>,
) -> AppResult<Json<Vec<AvailabilityRecord>>> {
    current_user.0.require_role(&[UserRole::Admin])?;

    let service = BookingService::from_state(&state);
    let records = service
        .bulk_set_availability(warehouse_id, &input.dates, input.is_available, input.reason)
        .await?;
    Ok(Json(records))
}
