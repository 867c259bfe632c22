use std::sync::{Arc, Mutex};

use time::{Duration, PrimitiveDateTime};

use crate::core::time::primitive_now_utc;

/// Wall-clock source for every attempt-deadline decision. Handlers and the
/// expiry sweeper read this handle instead of the system clock directly so
/// tests can pin time and drive the boundary cases deterministically.
#[derive(Clone)]
pub(crate) struct Clock {
    inner: ClockInner,
}

#[derive(Clone)]
enum ClockInner {
    System,
    Fixed(Arc<Mutex<PrimitiveDateTime>>),
}

impl Clock {
    pub(crate) fn system() -> Self {
        Self { inner: ClockInner::System }
    }

    #[allow(dead_code)]
    pub(crate) fn fixed(at: PrimitiveDateTime) -> Self {
        Self { inner: ClockInner::Fixed(Arc::new(Mutex::new(at))) }
    }

    pub(crate) fn now(&self) -> PrimitiveDateTime {
        match &self.inner {
            ClockInner::System => primitive_now_utc(),
            ClockInner::Fixed(instant) => *instant.lock().unwrap_or_else(|e| e.into_inner()),
        }
    }

    /// Advances a fixed clock; no-op on the system clock.
    #[allow(dead_code)]
    pub(crate) fn advance(&self, by: Duration) {
        if let ClockInner::Fixed(instant) = &self.inner {
            let mut guard = instant.lock().unwrap_or_else(|e| e.into_inner());
            *guard = *guard + by;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn fixed_clock_holds_and_advances() {
        let clock = Clock::fixed(datetime!(2025-03-01 12:00:00));
        assert_eq!(clock.now(), datetime!(2025-03-01 12:00:00));
        assert_eq!(clock.now(), datetime!(2025-03-01 12:00:00));

        clock.advance(Duration::seconds(90));
        assert_eq!(clock.now(), datetime!(2025-03-01 12:01:30));
    }

    #[test]
    fn system_clock_moves_forward() {
        let clock = Clock::system();
        let first = clock.now();
        let second = clock.now();
        assert!(second >= first);
    }
}
