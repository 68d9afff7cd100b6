//! Wires configuration, instruments, and the runtime fabric into a running venue:
//! one [`EngineHandle`] per instrument behind an [`EngineRepository`], a
//! [`TradingPhaseController`] driving every engine's phase, and a [`OneSecondLoop`]
//! producing the tick that both drives `tick()` and applies scheduled phase
//! transitions.

use crate::config::Config;
use std::sync::Arc;
use thiserror::Error;
use venue_engine::{EngineHandle, TradingEngine};
use venue_persistence::PersistenceError;
use venue_phase::{Phase, TradingPhaseController};
use venue_repository::{EngineRepository, RepositoryError};
use venue_runtime::{OneSecondLoop, Service, ThreadPool};

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

/// A running venue: the engine repository, the phase controller driving it, and the
/// tick loop. Dropping this stops the tick loop and joins the worker pool.
pub struct App {
    pub repository: Arc<EngineRepository>,
    pub phase_controller: Arc<TradingPhaseController>,
    pub tick_loop: OneSecondLoop,
    config: Config,
    pool: Arc<dyn Service>,
}

impl App {
    pub fn build(config: Config, worker_threads: usize) -> Result<Self, AppError> {
        let pool: Arc<dyn Service> = Arc::new(ThreadPool::new(worker_threads.max(1)));
        let mut repository = EngineRepository::new();

        for instrument in &config.instruments {
            let engine = TradingEngine::new(instrument.clone(), config.engine);
            let handle = Arc::new(EngineHandle::new(Arc::clone(&pool), engine));
            repository.add_engine(instrument.id, handle)?;
        }

        let phase_controller = Arc::new(TradingPhaseController::new(
            config.phase_schedule.clone(),
            config.tz_clock,
        ));

        Ok(Self {
            repository: Arc::new(repository),
            phase_controller,
            tick_loop: OneSecondLoop::new(),
            config,
            pool,
        })
    }

    /// Restores persisted engine state, if persistence is enabled and a snapshot file
    /// exists at the configured path.
    pub fn recover(&self) -> Result<(), AppError> {
        if !self.config.persistence_enabled {
            return Ok(());
        }
        let Some(path) = &self.config.persistence_file_path else {
            return Ok(());
        };
        if !std::path::Path::new(path).exists() {
            return Ok(());
        }
        venue_persistence::read_from_path(&self.repository, path)?;
        Ok(())
    }

    pub fn persist(&self) -> Result<(), AppError> {
        if !self.config.persistence_enabled {
            return Ok(());
        }
        if let Some(path) = &self.config.persistence_file_path {
            venue_persistence::write_to_path(&self.repository, path)?;
        }
        Ok(())
    }

    /// Registers the per-second callback that drives every engine's `tick` and
    /// applies scheduled phase transitions, then starts the tick thread. Must be
    /// called at most once.
    pub fn start(&self) {
        let repository = Arc::clone(&self.repository);
        let phase_controller = Arc::clone(&self.phase_controller);

        self.tick_loop.add_callback(move || {
            let now = chrono::Utc::now();
            let (tick, transition) = phase_controller.tick(now);

            repository.for_each(|instrument_id, handle| {
                let outcome = handle.tick(tick);
                if !outcome.reports.is_empty() {
                    tracing::debug!(instrument = %instrument_id, expired = outcome.reports.len(), "tick expiry");
                }
            });

            if let Some(transition) = transition {
                apply_phase_transition(&repository, transition.phase);
            }
        });

        self.tick_loop.start();
    }

    pub fn worker_pool(&self) -> Arc<dyn Service> {
        Arc::clone(&self.pool)
    }
}

fn apply_phase_transition(repository: &EngineRepository, phase: Phase) {
    repository.for_each(|instrument_id, handle| {
        let (outcome, status) = handle.phase_transition(phase);
        tracing::info!(
            instrument = %instrument_id,
            phase = ?status.phase.phase,
            status = ?status.phase.status,
            cancelled = outcome.reports.len(),
            "phase transition applied"
        );
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config;

    const SAMPLE: &str = r#"
    {
        "phase_schedule": [
            {"begin_minutes": 0, "end_minutes": 1440, "kind": "base", "phase": "open"}
        ],
        "instruments": [
            {
                "id": 1,
                "symbol": "AAPL",
                "security_type": "common_stock",
                "price_currency": "USD",
                "price_tick": "0.01",
                "quantity_tick": "1",
                "min_quantity": "1",
                "max_quantity": "1000000"
            }
        ]
    }
    "#;

    #[test]
    fn builds_one_engine_per_configured_instrument() {
        let config = config::parse(SAMPLE).unwrap();
        let app = App::build(config, 2).unwrap();
        assert_eq!(app.repository.len(), 1);
    }

    #[test]
    fn duplicate_instrument_ids_in_config_are_rejected() {
        let mut config = config::parse(SAMPLE).unwrap();
        let duplicate = config.instruments[0].clone();
        config.instruments.push(duplicate);
        let result = App::build(config, 2);
        assert!(result.is_err());
    }
}
