use crate::phase::{Phase, TradingPhase, TradingStatus};
use crate::schedule::PhaseSchedule;
use crate::tick::{TickEvent, TickEventFactory};
use crate::tz_clock::TzClock;
use chrono::{DateTime, FixedOffset, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HaltRequest {
    pub allow_cancels: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HaltReply {
    Halted,
    AlreadyHaltedByRequest,
    UnableToHalt,
    Resumed,
    NoRequestedHalt,
    NoActivePhase,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseTransition {
    pub tz_time_point: DateTime<FixedOffset>,
    pub phase: Phase,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ControllerState {
    Open { phase: Phase, halted_by_request: bool },
    Closed,
}

/// Owns the [`PhaseSchedule`], [`TzClock`], tick factory, and the admin halt/resume
/// state machine from spec §4.2. All state transitions are serialized on an internal
/// mutex.
///
/// `last_scheduled` tracks the scheduled phase last delivered by `PhaseSchedule::select`,
/// separately from the live `state` (which may carry an admin halt the schedule knows
/// nothing about). A tick only forwards to the state machine when the freshly computed
/// scheduled phase differs from `last_scheduled` — mirroring the original
/// `PhaseScheduler::update`'s `scheduled != *current_phase_` guard — so that an
/// unrelated tick, recomputing the same unchanged scheduled phase, never clobbers a
/// live admin halt.
pub struct TradingPhaseController {
    schedule: PhaseSchedule,
    tz_clock: TzClock,
    tick_factory: Mutex<TickEventFactory>,
    state: Mutex<Option<ControllerState>>,
    last_scheduled: Mutex<Option<Phase>>,
}

impl TradingPhaseController {
    pub fn new(schedule: PhaseSchedule, tz_clock: TzClock) -> Self {
        Self {
            schedule,
            tz_clock,
            tick_factory: Mutex::new(TickEventFactory::new()),
            state: Mutex::new(None),
            last_scheduled: Mutex::new(None),
        }
    }

    pub fn halt(&self, request: HaltRequest) -> HaltReply {
        let mut guard = self.state.lock();
        match &*guard {
            None => HaltReply::NoActivePhase,
            Some(ControllerState::Closed) => HaltReply::UnableToHalt,
            Some(ControllerState::Open {
                phase,
                halted_by_request,
            }) => {
                if phase.status == TradingStatus::Resume {
                    let new_phase = Phase::halted(phase.phase, request.allow_cancels);
                    *guard = Some(ControllerState::Open {
                        phase: new_phase,
                        halted_by_request: true,
                    });
                    HaltReply::Halted
                } else if *halted_by_request {
                    HaltReply::AlreadyHaltedByRequest
                } else {
                    HaltReply::UnableToHalt
                }
            }
        }
    }

    pub fn resume(&self) -> HaltReply {
        let mut guard = self.state.lock();
        match &*guard {
            None => HaltReply::NoRequestedHalt,
            Some(ControllerState::Closed) => HaltReply::NoRequestedHalt,
            Some(ControllerState::Open {
                phase,
                halted_by_request,
            }) => {
                if *halted_by_request && phase.status == TradingStatus::Halt {
                    *guard = Some(ControllerState::Open {
                        phase: Phase::new(phase.phase, TradingStatus::Resume, None),
                        halted_by_request: false,
                    });
                    HaltReply::Resumed
                } else {
                    HaltReply::NoRequestedHalt
                }
            }
        }
    }

    /// Current live phase, or `None` before the first tick has been processed.
    pub fn current_phase(&self) -> Option<Phase> {
        match &*self.state.lock() {
            None => None,
            Some(ControllerState::Closed) => Some(Phase::closed()),
            Some(ControllerState::Open { phase, .. }) => Some(*phase),
        }
    }

    /// Produces the tick event for `now` and applies any scheduled transition,
    /// returning the tick and the transition if the live phase changed.
    pub fn tick(&self, now: DateTime<Utc>) -> (TickEvent, Option<PhaseTransition>) {
        let tick = self.tick_factory.lock().produce(now, &self.tz_clock);
        let time_of_day = tick.tz_tick_time.time() - chrono::NaiveTime::MIN;
        let scheduled = self.schedule.select(time_of_day);
        let transition = self.apply_scheduled(scheduled, tick.tz_tick_time);
        (tick, transition)
    }

    fn apply_scheduled(
        &self,
        scheduled: Phase,
        tz_time_point: DateTime<FixedOffset>,
    ) -> Option<PhaseTransition> {
        let mut last_scheduled = self.last_scheduled.lock();
        let is_scheduled_transition_candidate = *last_scheduled != Some(scheduled);
        *last_scheduled = Some(scheduled);
        drop(last_scheduled);

        if !is_scheduled_transition_candidate {
            return None;
        }

        let mut guard = self.state.lock();
        let next = match &*guard {
            None => Some(if scheduled.phase == TradingPhase::Closed {
                ControllerState::Closed
            } else {
                ControllerState::Open {
                    phase: scheduled,
                    halted_by_request: false,
                }
            }),
            Some(ControllerState::Open { .. }) => {
                if scheduled.phase == TradingPhase::Closed {
                    Some(ControllerState::Closed)
                } else {
                    Some(ControllerState::Open {
                        phase: scheduled,
                        halted_by_request: false,
                    })
                }
            }
            Some(ControllerState::Closed) => {
                if scheduled.phase == TradingPhase::Open {
                    Some(ControllerState::Open {
                        phase: scheduled,
                        halted_by_request: false,
                    })
                } else {
                    None
                }
            }
        };

        match next {
            None => None,
            Some(state) => {
                let phase = match state {
                    ControllerState::Closed => Phase::closed(),
                    ControllerState::Open { phase, .. } => phase,
                };
                *guard = Some(state);
                Some(PhaseTransition {
                    tz_time_point,
                    phase,
                })
            }
        }
    }
}
