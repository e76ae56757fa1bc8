//! Reporting service for the admin dashboard and booking export

use chrono::{NaiveDate, NaiveTime, Utc};
use serde::Serialize;
use shared::{validate_date_range, BookingStatistics, DateRange, TimeSlotStatistics};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::booking_ledger::{BookingFilter, BookingLedger, BookingView};
use crate::services::time_slot::TimeSlotService;

/// Reporting service
#[derive(Clone)]
pub struct ReportingService {
    ledger: BookingLedger,
    slots: TimeSlotService,
    max_range_days: i64,
}

/// One CSV line of the booking export
#[derive(Debug, Serialize, PartialEq)]
pub struct BookingExportRow {
    pub booking_id: Uuid,
    pub warehouse: String,
    pub slot_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub farmer_name: String,
    pub farmer_mobile: String,
    pub status: String,
    pub storage_requirements: Option<String>,
    pub rejection_reason: Option<String>,
    pub created_at: String,
}

impl From<&BookingView> for BookingExportRow {
    fn from(view: &BookingView) -> Self {
        let booking = &view.booking;
        Self {
            booking_id: booking.id,
            warehouse: view.warehouse_name.clone(),
            slot_date: view.slot_date,
            start_time: view.slot_start_time,
            end_time: view.slot_end_time,
            farmer_name: booking.farmer_name.clone(),
            farmer_mobile: booking.farmer_mobile.clone(),
            status: booking.status.as_str().to_string(),
            storage_requirements: booking.storage_requirements.clone(),
            rejection_reason: booking.rejection_reason.clone(),
            created_at: booking.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

/// Dashboard figures for a warehouse (or all warehouses) over a date range
#[derive(Debug, Serialize)]
pub struct WarehouseDashboard {
    pub bookings: BookingStatistics,
    pub slots: TimeSlotStatistics,
    pub utilization_percent: f64,
    pub todays_bookings: usize,
    pub overdue_bookings: usize,
}

impl ReportingService {
    pub fn new(db: PgPool) -> Self {
        Self {
            ledger: BookingLedger::new(db.clone()),
            slots: TimeSlotService::new(db),
            max_range_days: crate::config::BookingConfig::default().max_range_days,
        }
    }

    pub fn with_max_range_days(mut self, max_range_days: i64) -> Self {
        self.max_range_days = max_range_days;
        self
    }

    fn date_range(&self, start_date: NaiveDate, end_date: NaiveDate) -> AppResult<DateRange> {
        validate_date_range(start_date, end_date, self.max_range_days)
            .map_err(|msg| AppError::validation("end_date", msg))
    }

    /// Dashboard metrics over an inclusive slot-date range
    pub async fn get_dashboard(
        &self,
        warehouse_id: Option<Uuid>,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> AppResult<WarehouseDashboard> {
        let range = self.date_range(start_date, end_date)?;
        let today = Utc::now().date_naive();

        let bookings = self
            .ledger
            .get_statistics(warehouse_id, Some(range.start), Some(range.end))
            .await?;
        let slots = self
            .slots
            .get_statistics(warehouse_id, range.start, range.end)
            .await?;
        let todays_bookings = self
            .ledger
            .get_todays_bookings(warehouse_id, today)
            .await?
            .len();
        let overdue_bookings = self
            .ledger
            .get_overdue_bookings(warehouse_id, today)
            .await?
            .len();

        Ok(WarehouseDashboard {
            utilization_percent: slots.utilization_percent(),
            bookings,
            slots,
            todays_bookings,
            overdue_bookings,
        })
    }

    /// Export every booking matching the filter as CSV
    pub async fn export_bookings(&self, filter: &BookingFilter) -> AppResult<String> {
        if let (Some(start), Some(end)) = (filter.start_date, filter.end_date) {
            self.date_range(start, end)?;
        }

        let views = self.ledger.list(filter).await?;
        let rows: Vec<BookingExportRow> = views.iter().map(Into::into).collect();
        Self::export_to_csv(&rows)
    }

    /// Export report data as CSV
    pub fn export_to_csv<T: Serialize>(data: &[T]) -> AppResult<String> {
        let mut wtr = csv::Writer::from_writer(vec![]);
        for record in data {
            wtr.serialize(record)
                .map_err(|e| AppError::Internal(format!("CSV serialization error: {}", e)))?;
        }
        let bytes = wtr
            .into_inner()
            .map_err(|e| AppError::Internal(format!("CSV writer error: {}", e)))?;
        String::from_utf8(bytes)
            .map_err(|e| AppError::Internal(format!("UTF-8 conversion error: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{Booking, BookingStatus};

    fn view() -> BookingView {
        let now = Utc::now();
        BookingView {
            booking: Booking {
                id: Uuid::new_v4(),
                farmer_id: Uuid::new_v4(),
                warehouse_id: Uuid::new_v4(),
                time_slot_id: Uuid::new_v4(),
                farmer_name: "Lakshmi, K".to_string(),
                farmer_mobile: "9876543210".to_string(),
                farmer_email: None,
                farmer_address: None,
                storage_requirements: Some("20 bags paddy".to_string()),
                status: BookingStatus::Pending,
                admin_notes: None,
                rejection_reason: None,
                qr_code_url: None,
                qr_code_data: None,
                approved_by: None,
                approved_at: None,
                picked_up_at: None,
                completed_at: None,
                created_at: now,
                updated_at: now,
            },
            slot_date: NaiveDate::from_ymd_opt(2024, 6, 10).unwrap(),
            slot_start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            slot_end_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            warehouse_name: "Guntur Central".to_string(),
        }
    }

    #[test]
    fn test_export_has_header_and_quotes_commas() {
        let rows = vec![BookingExportRow::from(&view())];
        let csv = ReportingService::export_to_csv(&rows).unwrap();
        let mut lines = csv.lines();

        let header = lines.next().unwrap();
        assert!(header.starts_with("booking_id,warehouse,slot_date,start_time,end_time"));

        let line = lines.next().unwrap();
        assert!(line.contains("\"Lakshmi, K\""));
        assert!(line.contains("2024-06-10,09:00:00,10:00:00"));
        assert!(line.contains(",pending,"));
        assert!(lines.next().is_none());
    }

    #[test]
    fn test_export_empty() {
        let rows: Vec<BookingExportRow> = Vec::new();
        assert_eq!(ReportingService::export_to_csv(&rows).unwrap(), "");
    }
}
