use chrono::{DateTime, Duration, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

/// A venue's local-time offset, resolved once at startup. DST transitions are out of
/// scope; the offset is a fixed value for the process lifetime, matching the original
/// `core::TzClock`'s simple offset model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TzClock {
    offset_seconds: i32,
}

impl TzClock {
    pub fn utc() -> Self {
        Self { offset_seconds: 0 }
    }

    pub fn fixed_offset_hours(hours: i32) -> Self {
        Self {
            offset_seconds: hours * 3600,
        }
    }

    pub fn offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.offset_seconds).expect("offset out of range")
    }

    pub fn local_of(&self, instant: DateTime<Utc>) -> DateTime<FixedOffset> {
        instant.with_timezone(&self.offset())
    }

    /// Time-of-day as a [`Duration`] since local midnight, for [`crate::PhaseSchedule::select`].
    pub fn time_of_day(&self, instant: DateTime<Utc>) -> Duration {
        let local = self.local_of(instant);
        local.time() - chrono::NaiveTime::MIN
    }
}

impl Default for TzClock {
    fn default() -> Self {
        Self::utc()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn utc_time_of_day_matches_wall_clock() {
        let clock = TzClock::utc();
        let instant = Utc.with_ymd_and_hms(2026, 7, 27, 14, 30, 0).unwrap();
        assert_eq!(clock.time_of_day(instant), Duration::hours(14) + Duration::minutes(30));
    }

    #[test]
    fn offset_shifts_time_of_day() {
        let clock = TzClock::fixed_offset_hours(-5);
        let instant = Utc.with_ymd_and_hms(2026, 7, 27, 1, 0, 0).unwrap();
        assert_eq!(clock.time_of_day(instant), Duration::hours(20));
    }
}
