//! Admin dashboard and warehouse directory handlers

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use shared::Warehouse;
use uuid::Uuid;

use crate::error::AppResult;
use crate::extractors::{AppJson, AppQuery};
use crate::middleware::{CurrentUser, UserRole};
use crate::services::reporting::{ReportingService, WarehouseDashboard};
use crate::services::warehouse::{RegisterWarehouseInput, WarehouseService};
use crate::AppState;

#[derive(Deserialize)]
pub struct DashboardQuery {
    pub warehouse_id: Option<Uuid>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// Get dashboard metrics
pub async fn get_dashboard(
    State(state): State<AppState>,
    current_user: CurrentUser,
    AppQuery(query): AppQuery<DashboardQuery>,
) -> AppResult<Json<WarehouseDashboard>> {
    current_user.0.require_role(&[UserRole::Admin])?;

    if let Some(warehouse_id) = query.warehouse_id {
        WarehouseService::new(state.db.clone())
            .require(warehouse_id)
            .await?;
    }

    let service = ReportingService::new(state.db)
        .with_max_range_days(state.config.booking.max_range_days);
    let dashboard = service
        .get_dashboard(query.warehouse_id, query.start_date, query.end_date)
        .await?;
    Ok(Json(dashboard))
}

/// Register a warehouse in the directory
pub async fn register_warehouse(
    State(state): State<AppState>,
    current_user: CurrentUser,
    AppJson(input): AppJson<RegisterWarehouseInput>,
) -> AppResult<(StatusCode, Json<Warehouse>)> {
    current_user.0.require_role(&[UserRole::Admin])?;

    let service = WarehouseService::new(state.db);
    let warehouse = service.register(input).await?;
    Ok((StatusCode::CREATED, Json(warehouse)))
}
