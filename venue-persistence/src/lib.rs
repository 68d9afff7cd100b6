#![warn(unused, rust_2018_idioms)]

//! JSON snapshotting of every engine in a [`venue_repository::EngineRepository`]: the
//! `StoreState`/`RecoverState` pair from spec §4.7, generalized across all registered
//! instruments instead of one at a time.

use serde::{Deserialize, Serialize};
use std::io;
use std::path::Path;
use thiserror::Error;
use venue_engine::EngineSnapshot;
use venue_instrument::InstrumentId;
use venue_repository::{EngineRepository, RepositoryError};

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("failed to read snapshot file: {0}")]
    Read(#[source] io::Error),
    #[error("failed to write snapshot file: {0}")]
    Write(#[source] io::Error),
    #[error("failed to deserialize snapshot: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("failed to serialize snapshot: {0}")]
    Encode(#[source] serde_json::Error),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// A full-repository point-in-time snapshot: one [`EngineSnapshot`] per registered
/// instrument, keyed so recovery can be applied to a repository whose engines were
/// registered in a different order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositorySnapshot {
    pub instruments: Vec<InstrumentState>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstrumentState {
    pub instrument_id: InstrumentId,
    pub engine: EngineSnapshot,
}

/// Captures every engine's current state (spec §4.7 `StoreState`, applied repository-wide).
pub fn capture(repository: &EngineRepository) -> RepositorySnapshot {
    let mut instruments = Vec::with_capacity(repository.len());
    repository.for_each(|instrument_id, handle| {
        instruments.push(InstrumentState {
            instrument_id,
            engine: handle.capture_snapshot(),
        });
    });
    RepositorySnapshot { instruments }
}

/// Restores every snapshot entry into the matching engine (spec §4.7 `RecoverState`).
/// Every instrument named in `snapshot` must already be registered in `repository`;
/// instruments registered but absent from `snapshot` are left untouched, matching a
/// recovery after an instrument was added since the snapshot was taken.
pub fn restore(repository: &EngineRepository, snapshot: RepositorySnapshot) -> Result<(), PersistenceError> {
    for state in snapshot.instruments {
        let handle = repository.find(state.instrument_id)?;
        handle.recover_state(state.engine);
    }
    Ok(())
}

pub fn to_json(snapshot: &RepositorySnapshot) -> Result<String, PersistenceError> {
    serde_json::to_string_pretty(snapshot).map_err(PersistenceError::Encode)
}

pub fn from_json(json: &str) -> Result<RepositorySnapshot, PersistenceError> {
    serde_json::from_str(json).map_err(PersistenceError::Decode)
}

pub fn write_to_path(repository: &EngineRepository, path: impl AsRef<Path>) -> Result<(), PersistenceError> {
    let snapshot = capture(repository);
    let json = to_json(&snapshot)?;
    std::fs::write(path, json).map_err(PersistenceError::Write)
}

pub fn read_from_path(repository: &EngineRepository, path: impl AsRef<Path>) -> Result<(), PersistenceError> {
    let json = std::fs::read_to_string(path).map_err(PersistenceError::Read)?;
    let snapshot = from_json(&json)?;
    restore(repository, snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use std::sync::Arc;
    use venue_engine::{ClientOrderId, EngineConfig, EngineHandle, PlaceOrderRequest, SessionId, Side, TimeInForce, TradingEngine};
    use venue_instrument::{Currency, SecurityType, Symbol};
    use venue_phase::Phase;
    use venue_runtime::{Service, ThreadPool};

    fn instrument(id: u64) -> venue_instrument::Instrument {
        venue_instrument::Instrument {
            id: InstrumentId(id),
            symbol: Symbol::new("AAPL"),
            security_type: SecurityType::CommonStock,
            price_currency: Currency::new("USD"),
            base_currency: Currency::new("USD"),
            security_exchange: None,
            cusip: None,
            sedol: None,
            isin: None,
            ric: None,
            exchange_id: None,
            bloomberg_id: None,
            owner: None,
            database_id: None,
            price_tick: dec!(0.01),
            quantity_tick: dec!(1),
            min_quantity: dec!(1),
            max_quantity: dec!(1_000_000),
        }
    }

    fn repository_with_one_resting_order() -> EngineRepository {
        let pool: Arc<dyn Service> = Arc::new(ThreadPool::new(2));
        let mut engine = TradingEngine::new(instrument(1), EngineConfig::default());
        engine.phase_transition(Phase::open_resume());
        let handle = Arc::new(EngineHandle::new(pool, engine));
        handle
            .place_order(
                PlaceOrderRequest {
                    client_order_id: ClientOrderId::new("O1"),
                    session: SessionId::new("S1"),
                    owner: None,
                    side: Side::Buy,
                    price: Some(dec!(10.00)),
                    quantity: dec!(25),
                    time_in_force: TimeInForce::Day,
                    expire_time: None,
                },
                Utc::now(),
            )
            .unwrap();

        let mut repo = EngineRepository::new();
        repo.add_engine(InstrumentId(1), handle).unwrap();
        repo
    }

    #[test]
    fn json_round_trip_preserves_resting_order() {
        let repo = repository_with_one_resting_order();
        let snapshot = capture(&repo);
        let json = to_json(&snapshot).unwrap();
        let decoded = from_json(&json).unwrap();
        assert_eq!(decoded.instruments.len(), 1);
        assert_eq!(decoded.instruments[0].engine.orders.len(), 1);
        assert_eq!(decoded.instruments[0].engine.orders[0].leaves_quantity, dec!(25));
    }

    #[test]
    fn restore_into_fresh_repository_recovers_resting_order() {
        let source = repository_with_one_resting_order();
        let snapshot = capture(&source);

        let pool: Arc<dyn Service> = Arc::new(ThreadPool::new(2));
        let fresh_engine = TradingEngine::new(instrument(1), EngineConfig::default());
        let fresh_handle = Arc::new(EngineHandle::new(pool, fresh_engine));
        let mut fresh_repo = EngineRepository::new();
        fresh_repo.add_engine(InstrumentId(1), Arc::clone(&fresh_handle)).unwrap();

        restore(&fresh_repo, snapshot).unwrap();
        let recovered = fresh_handle.capture_snapshot();
        assert_eq!(recovered.orders.len(), 1);
        assert_eq!(recovered.orders[0].leaves_quantity, dec!(25));
    }

    #[test]
    fn restore_rejects_unknown_instrument() {
        let snapshot = RepositorySnapshot {
            instruments: vec![InstrumentState {
                instrument_id: InstrumentId(42),
                engine: EngineSnapshot {
                    instrument: instrument(42),
                    orders: Vec::new(),
                    next_order_id: 1,
                },
            }],
        };
        let repo = EngineRepository::new();
        assert!(matches!(restore(&repo, snapshot), Err(PersistenceError::Repository(_))));
    }
}
