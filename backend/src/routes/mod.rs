//! Route definitions for the warehouse booking service

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Protected routes - warehouse calendar and slots
        .nest("/warehouses", warehouse_routes(state.clone()))
        // Protected routes - slot administration
        .nest("/slots", slot_routes(state.clone()))
        // Protected routes - booking lifecycle
        .nest("/bookings", booking_routes(state.clone()))
        // Protected routes - admin dashboard
        .nest("/reports", report_routes(state))
}

/// Warehouse-scoped routes (protected)
fn warehouse_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::register_warehouse))
        .route("/:warehouse_id/slots", get(handlers::get_available_slots).post(handlers::create_slot))
        .route("/:warehouse_id/slots/all", get(handlers::list_slots))
        .route("/:warehouse_id/slots/provision", post(handlers::provision_slots))
        .route("/:warehouse_id/availability", get(handlers::get_availability))
        .route("/:warehouse_id/availability/dates", get(handlers::get_available_dates))
        .route("/:warehouse_id/availability/bulk", post(handlers::bulk_set_availability))
        .route("/:warehouse_id/availability/:date", put(handlers::set_availability))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Slot administration routes (protected)
fn slot_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/statistics", get(handlers::slot_statistics))
        .route(
            "/:slot_id",
            put(handlers::update_slot).delete(handlers::delete_slot),
        )
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Booking routes (protected)
fn booking_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::search_bookings).post(handlers::create_booking))
        .route("/export", get(handlers::export_bookings))
        .route("/today", get(handlers::todays_bookings))
        .route("/overdue", get(handlers::overdue_bookings))
        .route("/statistics", get(handlers::booking_statistics))
        .route("/mine", get(handlers::my_bookings))
        .route("/verify-qr", post(handlers::verify_qr))
        .route(
            "/:booking_id",
            get(handlers::get_booking).put(handlers::update_booking),
        )
        .route("/:booking_id/approve", post(handlers::approve_booking))
        .route("/:booking_id/reject", post(handlers::reject_booking))
        .route("/:booking_id/pickup", post(handlers::confirm_pickup))
        .route("/:booking_id/return", post(handlers::confirm_return))
        .route("/:booking_id/qr/reissue", post(handlers::reissue_qr))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Reporting routes (protected)
fn report_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(handlers::get_dashboard))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}
