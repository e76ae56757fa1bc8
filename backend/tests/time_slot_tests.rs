//! Time slot registry tests
//!
//! Property-based and unit tests for:
//! - Default slot plan shape
//! - Capacity helpers on a single slot
//! - Slot input validation
//! - Slot statistics and pagination arithmetic

use chrono::{NaiveDate, NaiveTime, Timelike, Utc};
use proptest::prelude::*;
use shared::{
    default_slot_plan, validate_max_bookings, validate_slot_times, PaginatedResponse, Pagination,
    TimeSlot, TimeSlotStatistics, DEFAULT_SLOT_CAPACITY, MAX_PER_PAGE,
};
use uuid::Uuid;

// ============================================================================
// Property Test Strategies
// ============================================================================

/// (max_bookings, current_bookings) respecting the counter invariant
fn capacity_strategy() -> impl Strategy<Value = (i32, i32)> {
    (1i32..50).prop_flat_map(|max| (Just(max), 0..=max))
}

fn time_strategy() -> impl Strategy<Value = NaiveTime> {
    (0u32..24, 0u32..60).prop_map(|(h, m)| NaiveTime::from_hms_opt(h, m, 0).unwrap())
}

fn slot(max_bookings: i32, current_bookings: i32, is_available: bool) -> TimeSlot {
    TimeSlot {
        id: Uuid::new_v4(),
        warehouse_id: Uuid::new_v4(),
        date: NaiveDate::from_ymd_opt(2024, 6, 10).unwrap(),
        start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
        end_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
        is_available,
        max_bookings,
        current_bookings,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Property: a slot is bookable iff it is switched on and below capacity
    #[test]
    fn test_bookable_rule(
        (max, current) in capacity_strategy(),
        is_available in any::<bool>(),
    ) {
        let s = slot(max, current, is_available);
        prop_assert_eq!(s.is_bookable(), is_available && current < max);
        prop_assert_eq!(s.remaining_capacity(), max - current);
        prop_assert!(s.remaining_capacity() >= 0);
    }

    /// Property: slot times are accepted iff the end is after the start
    #[test]
    fn test_slot_time_validation(
        start in time_strategy(),
        end in time_strategy(),
    ) {
        prop_assert_eq!(validate_slot_times(start, end).is_ok(), end > start);
    }

    /// Property: capacity must be at least one
    #[test]
    fn test_capacity_validation(
        max_bookings in -10i32..100,
    ) {
        prop_assert_eq!(validate_max_bookings(max_bookings).is_ok(), max_bookings >= 1);
    }

    /// Property: utilization is a percentage of booked over total capacity
    #[test]
    fn test_utilization_bounds(
        slots in prop::collection::vec(capacity_strategy(), 1..20),
    ) {
        let stats = TimeSlotStatistics {
            total_slots: slots.len() as i64,
            available_slots: slots.iter().filter(|(m, c)| c < m).count() as i64,
            total_bookings: slots.iter().map(|(_, c)| i64::from(*c)).sum(),
            total_capacity: slots.iter().map(|(m, _)| i64::from(*m)).sum(),
        };
        let pct = stats.utilization_percent();

        prop_assert!((0.0..=100.0).contains(&pct));
        prop_assert_eq!(pct == 100.0, stats.available_slots == 0);
    }

    /// Property: pagination is clamped and pages cover every item exactly once
    #[test]
    fn test_pagination_covers_items(
        page in proptest::option::of(0u32..50),
        per_page in proptest::option::of(0u32..500),
        total in 0u64..5000,
    ) {
        let pagination = Pagination::new(page, per_page);
        prop_assert!(pagination.page >= 1);
        prop_assert!((1..=MAX_PER_PAGE).contains(&pagination.per_page));

        let response = PaginatedResponse::<u8>::new(Vec::new(), &pagination, total);
        let pages = u64::from(response.pagination.total_pages);
        let per = u64::from(pagination.per_page);
        prop_assert!(pages * per >= total);
        prop_assert!(pages == 0 || (pages - 1) * per < total);
        prop_assert_eq!(pagination.offset(), i64::from(pagination.page - 1) * pagination.limit());
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod default_plan_tests {
    use super::*;

    #[test]
    fn test_eight_hourly_windows_from_nine_to_five() {
        let plan = default_slot_plan();
        assert_eq!(plan.len(), 8);

        let starts: Vec<u32> = plan.iter().map(|w| w.start_time.hour()).collect();
        assert_eq!(starts, vec![9, 10, 11, 12, 13, 14, 15, 16]);

        for window in &plan {
            assert_eq!(window.end_time.hour(), window.start_time.hour() + 1);
            assert!(validate_slot_times(window.start_time, window.end_time).is_ok());
        }
    }

    #[test]
    fn test_default_capacity_is_one() {
        assert_eq!(DEFAULT_SLOT_CAPACITY, 1);
        assert!(validate_max_bookings(DEFAULT_SLOT_CAPACITY).is_ok());
    }
}

#[cfg(test)]
mod slot_tests {
    use super::*;

    #[test]
    fn test_full_slot() {
        let s = slot(1, 1, true);
        assert!(!s.has_capacity());
        assert!(!s.is_bookable());
        assert_eq!(s.remaining_capacity(), 0);
    }

    #[test]
    fn test_switched_off_slot_with_capacity() {
        let s = slot(4, 1, false);
        assert!(s.has_capacity());
        assert!(!s.is_bookable());
        assert_eq!(s.remaining_capacity(), 3);
    }

    #[test]
    fn test_empty_statistics() {
        let stats = TimeSlotStatistics::default();
        assert_eq!(stats.utilization_percent(), 0.0);
    }

    #[test]
    fn test_statistics_half_booked() {
        let stats = TimeSlotStatistics {
            total_slots: 8,
            available_slots: 4,
            total_bookings: 4,
            total_capacity: 8,
        };
        assert_eq!(stats.utilization_percent(), 50.0);
    }
}
