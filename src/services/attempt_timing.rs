use time::{Duration, PrimitiveDateTime};

/// The deterministic expiry boundary: always `started_at + duration`,
/// recomputed from the stored start on every check, never cached.
pub(crate) fn deadline(started_at: PrimitiveDateTime, duration_seconds: i32) -> PrimitiveDateTime {
    started_at + Duration::seconds(i64::from(duration_seconds))
}

/// Equality counts as expired so a request arriving exactly on the boundary
/// is handled the same way everywhere.
pub(crate) fn is_expired(
    now: PrimitiveDateTime,
    started_at: PrimitiveDateTime,
    duration_seconds: i32,
) -> bool {
    now >= deadline(started_at, duration_seconds)
}

pub(crate) fn remaining_seconds(
    now: PrimitiveDateTime,
    started_at: PrimitiveDateTime,
    duration_seconds: i32,
) -> i64 {
    let boundary = deadline(started_at, duration_seconds);
    if now >= boundary {
        return 0;
    }
    (boundary - now).whole_seconds()
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    const STARTED: PrimitiveDateTime = datetime!(2025-03-01 10:00:00);

    #[test]
    fn deadline_is_start_plus_duration() {
        assert_eq!(deadline(STARTED, 1800), datetime!(2025-03-01 10:30:00));
    }

    #[test]
    fn boundary_equality_counts_as_expired() {
        assert!(is_expired(datetime!(2025-03-01 10:30:00), STARTED, 1800));
    }

    #[test]
    fn one_second_before_boundary_is_not_expired() {
        assert!(!is_expired(datetime!(2025-03-01 10:29:59), STARTED, 1800));
    }

    #[test]
    fn remaining_counts_down_and_clamps_at_zero() {
        assert_eq!(remaining_seconds(datetime!(2025-03-01 10:00:00), STARTED, 1800), 1800);
        assert_eq!(remaining_seconds(datetime!(2025-03-01 10:29:00), STARTED, 1800), 60);
        assert_eq!(remaining_seconds(datetime!(2025-03-01 10:30:00), STARTED, 1800), 0);
        assert_eq!(remaining_seconds(datetime!(2025-03-01 11:00:00), STARTED, 1800), 0);
    }
}
