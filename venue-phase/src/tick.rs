use crate::tz_clock::TzClock;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Produced once per loop iteration. `is_new_sys_day`/`is_new_tz_day` are set when the
/// UTC/configured-timezone date advances between successive ticks; the first tick
/// produced by a fresh [`TickEventFactory`] has both false.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickEvent {
    pub sys_tick_time: DateTime<Utc>,
    pub tz_tick_time: DateTime<chrono::FixedOffset>,
    pub is_new_sys_day: bool,
    pub is_new_tz_day: bool,
}

/// Stateful: remembers the previous tick's system and timezone dates so it can detect
/// day rollover (invariant 7 in the testable-properties list).
#[derive(Debug, Default)]
pub struct TickEventFactory {
    last_sys_date: Option<NaiveDate>,
    last_tz_date: Option<NaiveDate>,
}

impl TickEventFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn produce(&mut self, now: DateTime<Utc>, tz_clock: &TzClock) -> TickEvent {
        let sys_date = now.date_naive();
        let local = tz_clock.local_of(now);
        let tz_date = local.date_naive();

        let is_new_sys_day = self.last_sys_date.is_some_and(|prev| sys_date > prev);
        let is_new_tz_day = self.last_tz_date.is_some_and(|prev| tz_date > prev);

        self.last_sys_date = Some(sys_date);
        self.last_tz_date = Some(tz_date);

        TickEvent {
            sys_tick_time: now,
            tz_tick_time: local,
            is_new_sys_day,
            is_new_tz_day,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn first_tick_never_reports_new_day() {
        let mut factory = TickEventFactory::new();
        let tick = factory.produce(Utc.with_ymd_and_hms(2026, 7, 27, 0, 0, 0).unwrap(), &TzClock::utc());
        assert!(!tick.is_new_sys_day);
        assert!(!tick.is_new_tz_day);
    }

    #[test]
    fn reports_new_day_on_date_rollover() {
        let mut factory = TickEventFactory::new();
        let clock = TzClock::utc();
        let t0 = Utc.with_ymd_and_hms(2026, 7, 27, 23, 59, 59).unwrap();
        factory.produce(t0, &clock);
        let t1 = t0 + Duration::seconds(2);
        let tick = factory.produce(t1, &clock);
        assert!(tick.is_new_sys_day);
        assert!(tick.is_new_tz_day);
    }

    #[test]
    fn no_rollover_within_same_day() {
        let mut factory = TickEventFactory::new();
        let clock = TzClock::utc();
        let t0 = Utc.with_ymd_and_hms(2026, 7, 27, 10, 0, 0).unwrap();
        factory.produce(t0, &clock);
        let tick = factory.produce(t0 + Duration::seconds(1), &clock);
        assert!(!tick.is_new_sys_day);
    }
}
