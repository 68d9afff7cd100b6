#![warn(unused, rust_2018_idioms)]

//! Multiplexes every configured instrument's [`venue_engine::EngineHandle`] behind a
//! single lookup table, and fans session-termination out to every engine so
//! cancel-on-disconnect (spec §4.4) runs regardless of which instrument the session
//! last traded (spec §4.5/§5).

use std::sync::Arc;
use thiserror::Error;
use venue_engine::EngineHandle;
use venue_engine::{CommandOutcome, SessionId};
use venue_instrument::InstrumentId;

pub type FnvIndexMap<K, V> = indexmap::IndexMap<K, V, fnv::FnvBuildHasher>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RepositoryError {
    #[error("instrument {0} is not registered with this repository")]
    UnknownInstrument(InstrumentId),
    #[error("instrument {0} is already registered with this repository")]
    DuplicateInstrument(InstrumentId),
}

/// The owning map from instrument to engine. One process hosts one repository; engines
/// are added once at startup (from configuration) and never removed while the process
/// runs (spec §4.5 Non-goals: no live instrument addition/removal).
#[derive(Default)]
pub struct EngineRepository {
    engines: FnvIndexMap<InstrumentId, Arc<EngineHandle>>,
}

impl EngineRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_engine(&mut self, instrument_id: InstrumentId, handle: Arc<EngineHandle>) -> Result<(), RepositoryError> {
        if self.engines.contains_key(&instrument_id) {
            return Err(RepositoryError::DuplicateInstrument(instrument_id));
        }
        self.engines.insert(instrument_id, handle);
        Ok(())
    }

    pub fn find(&self, instrument_id: InstrumentId) -> Result<Arc<EngineHandle>, RepositoryError> {
        self.engines
            .get(&instrument_id)
            .cloned()
            .ok_or(RepositoryError::UnknownInstrument(instrument_id))
    }

    pub fn len(&self) -> usize {
        self.engines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.engines.is_empty()
    }

    pub fn instrument_ids(&self) -> impl Iterator<Item = InstrumentId> + '_ {
        self.engines.keys().copied()
    }

    /// Invokes `f` against every registered engine, in registration order.
    pub fn for_each(&self, mut f: impl FnMut(InstrumentId, &Arc<EngineHandle>)) {
        for (id, handle) in self.engines.iter() {
            f(*id, handle);
        }
    }

    /// Broadcasts cancel-on-disconnect to every engine. A session only rests orders on
    /// the instruments it has traded, so engines with nothing to cancel return an
    /// empty [`CommandOutcome`]; callers interested in the reports should filter those
    /// out themselves.
    pub fn notify_session_terminated(&self, session: SessionId) -> Vec<(InstrumentId, CommandOutcome)> {
        let mut results = Vec::with_capacity(self.engines.len());
        for (id, handle) in self.engines.iter() {
            let outcome = handle.notify_client_disconnected(session.clone());
            if !outcome.reports.is_empty() {
                tracing::debug!(instrument = %id, session = %session, cancelled = outcome.reports.len(), "cancel-on-disconnect");
            }
            results.push((*id, outcome));
        }
        results
    }
}

/// A thin routing wrapper for code that already knows which instrument it wants:
/// unicast to one engine, or broadcast to all.
pub struct RepositoryAccessor<'a> {
    repository: &'a EngineRepository,
}

impl<'a> RepositoryAccessor<'a> {
    pub fn new(repository: &'a EngineRepository) -> Self {
        Self { repository }
    }

    pub fn unicast(&self, instrument_id: InstrumentId) -> Result<Arc<EngineHandle>, RepositoryError> {
        self.repository.find(instrument_id)
    }

    pub fn broadcast(&self, f: impl FnMut(InstrumentId, &Arc<EngineHandle>)) {
        self.repository.for_each(f);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use venue_engine::{ClientOrderId, EngineConfig, PlaceOrderRequest, Side, TimeInForce, TradingEngine};
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

    fn handle(id: u64, pool: &Arc<dyn Service>) -> Arc<EngineHandle> {
        let mut engine = TradingEngine::new(instrument(id), EngineConfig {
            cod_enabled: true,
            ..EngineConfig::default()
        });
        engine.phase_transition(Phase::open_resume());
        Arc::new(EngineHandle::new(Arc::clone(pool), engine))
    }

    #[test]
    fn duplicate_registration_rejected() {
        let pool: Arc<dyn Service> = Arc::new(ThreadPool::new(2));
        let mut repo = EngineRepository::new();
        repo.add_engine(InstrumentId(1), handle(1, &pool)).unwrap();
        assert_eq!(
            repo.add_engine(InstrumentId(1), handle(1, &pool)),
            Err(RepositoryError::DuplicateInstrument(InstrumentId(1)))
        );
    }

    #[test]
    fn lookup_of_unknown_instrument_fails() {
        let repo = EngineRepository::new();
        assert_eq!(repo.find(InstrumentId(99)), Err(RepositoryError::UnknownInstrument(InstrumentId(99))));
    }

    #[test]
    fn session_termination_fans_out_to_every_engine() {
        let pool: Arc<dyn Service> = Arc::new(ThreadPool::new(4));
        let mut repo = EngineRepository::new();
        repo.add_engine(InstrumentId(1), handle(1, &pool)).unwrap();
        repo.add_engine(InstrumentId(2), handle(2, &pool)).unwrap();

        let target = repo.find(InstrumentId(1)).unwrap();
        target
            .place_order(
                PlaceOrderRequest {
                    client_order_id: ClientOrderId::new("O1"),
                    session: SessionId::new("S1"),
                    owner: None,
                    side: Side::Buy,
                    price: Some(dec!(10.00)),
                    quantity: dec!(10),
                    time_in_force: TimeInForce::Day,
                    expire_time: None,
                },
                Utc::now(),
            )
            .unwrap();

        let results = repo.notify_session_terminated(SessionId::new("S1"));
        assert_eq!(results.len(), 2);
        let cancelled_on_one = results
            .iter()
            .find(|(id, _)| *id == InstrumentId(1))
            .map(|(_, outcome)| outcome.reports.len())
            .unwrap();
        assert_eq!(cancelled_on_one, 1);
        let cancelled_on_two = results
            .iter()
            .find(|(id, _)| *id == InstrumentId(2))
            .map(|(_, outcome)| outcome.reports.len())
            .unwrap();
        assert_eq!(cancelled_on_two, 0);
    }
}
