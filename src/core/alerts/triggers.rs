// Derivation rules for the three alert sources.
//
// Each rule looks at one normalized record and decides whether it belongs in
// the bell. Dismissal filtering happens in the engine.

use chrono::{DateTime, Utc};

use crate::core::model::{ApiAlert, InventoryItem};

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Server alert types that duplicate locally derived categories.
pub const DEFAULT_SUPPRESSED_TYPES: [&str; 2] = ["low_stock", "expiry_risk"];

/// Default expiry window in days, inclusive.
pub const DEFAULT_EXPIRY_WINDOW_DAYS: i64 = 30;

/// Item is at or below its reorder level.
///
/// Missing numbers have been defaulted to zero, so an item with no data is
/// flagged (0 <= 0).
pub fn is_low_stock(item: &InventoryItem) -> bool {
    item.quantity <= item.reorder_level
}

/// Whole days from `now` until `expires_at`, rounded up.
pub fn days_left(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let millis = (expires_at - now).num_milliseconds();
    let days = millis.div_euclid(MILLIS_PER_DAY);
    if millis.rem_euclid(MILLIS_PER_DAY) == 0 {
        days
    } else {
        days + 1
    }
}

/// Batch falls inside the window. There is no lower bound.
pub fn is_expiring(days_left: i64, window_days: i64) -> bool {
    days_left <= window_days
}

/// Alert is a server-side copy of a category derived locally.
pub fn is_suppressed_type(alert: &ApiAlert, suppressed: &[String]) -> bool {
    alert
        .alert_type
        .as_deref()
        .is_some_and(|t| suppressed.iter().any(|s| s == t))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 14, 9, 30, 0).unwrap()
    }

    fn item(quantity: f64, reorder_level: f64) -> InventoryItem {
        InventoryItem {
            name: Some("Gauze".into()),
            branch: None,
            quantity,
            reorder_level,
        }
    }

    #[test]
    fn test_low_stock_boundary() {
        assert!(is_low_stock(&item(2.0, 5.0)));
        assert!(is_low_stock(&item(5.0, 5.0)));
        assert!(!is_low_stock(&item(6.0, 5.0)));
        // No data at all still counts as low
        assert!(is_low_stock(&item(0.0, 0.0)));
    }

    #[test]
    fn test_days_left_rounds_up() {
        assert_eq!(days_left(now() + Duration::days(10), now()), 10);
        assert_eq!(days_left(now() + Duration::hours(1), now()), 1);
        assert_eq!(days_left(now() + Duration::days(9) + Duration::minutes(1), now()), 10);
        assert_eq!(days_left(now(), now()), 0);
        assert_eq!(days_left(now() - Duration::hours(1), now()), 0);
        assert_eq!(days_left(now() - Duration::days(5), now()), -5);
        assert_eq!(days_left(now() - Duration::days(5) + Duration::hours(2), now()), -4);
    }

    #[test]
    fn test_expiry_window_inclusive() {
        assert!(is_expiring(30, DEFAULT_EXPIRY_WINDOW_DAYS));
        assert!(!is_expiring(31, DEFAULT_EXPIRY_WINDOW_DAYS));
        assert!(is_expiring(-5, DEFAULT_EXPIRY_WINDOW_DAYS));
    }

    #[test]
    fn test_suppressed_types() {
        let suppressed: Vec<String> =
            DEFAULT_SUPPRESSED_TYPES.iter().map(|s| s.to_string()).collect();
        let alert = |t: Option<&str>| ApiAlert {
            id: Some("a".into()),
            title: None,
            alert_type: t.map(str::to_owned),
            severity: None,
            description: None,
            branch: None,
        };

        assert!(is_suppressed_type(&alert(Some("low_stock")), &suppressed));
        assert!(is_suppressed_type(&alert(Some("expiry_risk")), &suppressed));
        assert!(!is_suppressed_type(&alert(Some("maintenance")), &suppressed));
        assert!(!is_suppressed_type(&alert(None), &suppressed));
    }
}
