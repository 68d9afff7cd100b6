use crate::phase::{Phase, Settings, TradingPhase, TradingStatus};
use chrono::Duration;
use serde::{Deserialize, Serialize};

/// A [`PhaseRecord`] is either a base-layer [`TradingPhase`] or a halt-status overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PhaseRecordKind {
    Base(TradingPhase),
    HaltOverlay,
}

/// One row of the venue's trading-phase calendar. `begin`/`end` are times-of-day
/// (duration since local midnight); the record is active for `begin <= t < end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseRecord {
    pub begin: Duration,
    pub end: Duration,
    pub end_range: Duration,
    pub kind: PhaseRecordKind,
    pub allow_cancels_on_halt: bool,
}

impl PhaseRecord {
    pub fn base(begin: Duration, end: Duration, phase: TradingPhase) -> Self {
        Self {
            begin,
            end,
            end_range: Duration::zero(),
            kind: PhaseRecordKind::Base(phase),
            allow_cancels_on_halt: false,
        }
    }

    pub fn halt_overlay(begin: Duration, end: Duration, allow_cancels: bool) -> Self {
        Self {
            begin,
            end,
            end_range: Duration::zero(),
            kind: PhaseRecordKind::HaltOverlay,
            allow_cancels_on_halt: allow_cancels,
        }
    }

    fn covers(&self, t: Duration) -> bool {
        self.begin <= t && t < self.end
    }
}

/// The full set of [`PhaseRecord`]s for a venue. Selection depends only on
/// `t mod 24h` and the record set (invariant 8 in the testable-properties list).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PhaseSchedule {
    records: Vec<PhaseRecord>,
}

impl PhaseSchedule {
    pub fn new() -> Self {
        Self { records: Vec::new() }
    }

    pub fn add(&mut self, record: PhaseRecord) {
        self.records.push(record);
    }

    /// Picks the candidate with the latest `begin`, breaking ties by the lowest `end`.
    fn select_latest<'a, I: Iterator<Item = &'a PhaseRecord>>(
        candidates: I,
    ) -> Option<&'a PhaseRecord> {
        candidates.fold(None, |best, candidate| match best {
            None => Some(candidate),
            Some(current) => {
                if candidate.begin > current.begin
                    || (candidate.begin == current.begin && candidate.end < current.end)
                {
                    Some(candidate)
                } else {
                    Some(current)
                }
            }
        })
    }

    /// Evaluates the schedule at time-of-day `t` (taken modulo 24h).
    pub fn select(&self, t: Duration) -> Phase {
        let day = Duration::hours(24);
        let t = ((t % day) + day) % day;

        let base_candidate = Self::select_latest(
            self.records
                .iter()
                .filter(|r| matches!(r.kind, PhaseRecordKind::Base(_)) && r.covers(t)),
        );

        let base_phase = match base_candidate {
            None => TradingPhase::Open,
            Some(record) => match record.kind {
                PhaseRecordKind::Base(phase) => phase,
                PhaseRecordKind::HaltOverlay => unreachable!("filtered to Base above"),
            },
        };

        let base_status = if base_phase == TradingPhase::Closed {
            TradingStatus::Halt
        } else {
            TradingStatus::Resume
        };

        let mut phase = Phase::new(base_phase, base_status, None);

        if base_phase != TradingPhase::Closed {
            let overlay = Self::select_latest(
                self.records
                    .iter()
                    .filter(|r| matches!(r.kind, PhaseRecordKind::HaltOverlay) && r.covers(t)),
            );
            if let Some(overlay) = overlay {
                phase = Phase::new(
                    base_phase,
                    TradingStatus::Halt,
                    Some(Settings {
                        allow_cancels: overlay.allow_cancels_on_halt,
                    }),
                );
            }
        }

        phase
    }
}
