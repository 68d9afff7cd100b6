use crate::book::{OrderBook, OrderBookNotification};
use crate::command::{AmendOrderRequest, CancelOrderRequest, MarketDataRequest, PlaceOrderRequest, SecurityStatusRequest};
use crate::config::EngineConfig;
use crate::error::{AmendReject, CancelReject, OrderPlacementReject};
use crate::market_data::{MarketDataFacade, MarketDataSnapshot, MarketDataUpdate, SecurityStatus};
use crate::order::{ExecutionReport, ExecutionReportKind, Order, OrderId, SessionId, TimeInForce};
use crate::trade::Trade;
use crate::validate::{self, PlacementFields};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::mpsc;
use std::sync::Arc;
use venue_instrument::Instrument;
use venue_phase::{Phase, TickEvent, TradingPhase};
use venue_runtime::ChainedMux;

/// Everything produced by one engine command: client-facing execution reports, trades
/// (for the tape/downstream consumers), raw book deltas, and the incremental
/// market-data updates fanned out to subscribers. Mirrors the "client-notification
/// cache flushed after the command returns" design from spec §4.4.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CommandOutcome {
    pub reports: Vec<ExecutionReport>,
    pub trades: Vec<Trade>,
    pub book_notifications: Vec<OrderBookNotification>,
    pub market_data: Vec<(SessionId, MarketDataUpdate)>,
}

impl CommandOutcome {
    fn publish(&mut self, book: &OrderBook, facade: &MarketDataFacade, config: &EngineConfig) {
        if !self.book_notifications.is_empty() {
            self.market_data
                .extend(facade.publish_changes(self.book_notifications.clone(), book, config));
        }
    }
}

/// A point-in-time, serializable view of one instrument's engine state: resting
/// orders, instrument header, and the next order-id seed (spec §4.7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSnapshot {
    pub instrument: Instrument,
    pub orders: Vec<Order>,
    pub next_order_id: u64,
}

/// The order system, market-data facade, and current phase for one instrument. Every
/// method here is `&mut self`; serialization across concurrent callers is the job of
/// [`EngineHandle`], not this type.
pub struct TradingEngine {
    instrument: Instrument,
    config: EngineConfig,
    book: OrderBook,
    market_data: MarketDataFacade,
    phase: Phase,
    next_order_id: u64,
}

impl TradingEngine {
    pub fn new(instrument: Instrument, config: EngineConfig) -> Self {
        let id = instrument.id;
        Self {
            instrument,
            config,
            book: OrderBook::new(),
            market_data: MarketDataFacade::new(id),
            phase: Phase::closed(),
            next_order_id: 1,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn book(&self) -> &OrderBook {
        &self.book
    }

    fn next_id(&mut self) -> OrderId {
        let id = OrderId(self.next_order_id);
        self.next_order_id += 1;
        id
    }

    pub fn place_order(
        &mut self,
        request: PlaceOrderRequest,
        now: DateTime<Utc>,
    ) -> Result<CommandOutcome, OrderPlacementReject> {
        let fields = PlacementFields {
            price: request.price,
            quantity: request.quantity,
            time_in_force: request.time_in_force,
        };
        validate::validate_placement(&fields, &self.instrument, &self.config, &self.phase)?;

        if request.time_in_force == TimeInForce::Fok {
            let crossable = self.book.crossable_quantity(request.side, request.price);
            if crossable < request.quantity {
                return Err(OrderPlacementReject::FokUnfilled);
            }
        }

        let mut taker = Order {
            id: self.next_id(),
            client_order_id: request.client_order_id.clone(),
            session: request.session.clone(),
            owner: request.owner.clone(),
            side: request.side,
            price: request.price,
            quantity: request.quantity,
            leaves_quantity: request.quantity,
            cum_quantity: Decimal::ZERO,
            time_in_force: request.time_in_force,
            expire_time: request.expire_time,
            created_at: now,
        };

        let mut outcome = CommandOutcome::default();
        let match_outcome = self.book.match_taker(&mut taker, now, self.phase.phase);

        for fill in &match_outcome.fills {
            outcome.trades.push(fill.trade.clone());
            outcome.reports.push(ExecutionReport {
                order_id: Some(fill.maker_order_id),
                client_order_id: fill.maker_client_order_id.clone(),
                session: fill.maker_session.clone(),
                kind: if fill.maker_removed {
                    ExecutionReportKind::Filled
                } else {
                    ExecutionReportKind::PartialFill
                },
                leaves_quantity: fill.maker_leaves_after,
                cum_quantity: fill.maker_cum_after,
                last_price: Some(fill.trade.price),
                last_quantity: Some(fill.trade.quantity),
                reason: None,
            });
            outcome.reports.push(ExecutionReport {
                order_id: Some(taker.id),
                client_order_id: taker.client_order_id.clone(),
                session: taker.session.clone(),
                kind: if fill.taker_leaves_after.is_zero() {
                    ExecutionReportKind::Filled
                } else {
                    ExecutionReportKind::PartialFill
                },
                leaves_quantity: fill.taker_leaves_after,
                cum_quantity: fill.taker_cum_after,
                last_price: Some(fill.trade.price),
                last_quantity: Some(fill.trade.quantity),
                reason: None,
            });
        }
        outcome.book_notifications.extend(match_outcome.notifications);
        self.market_data.record_trades(&outcome.trades, &self.config);

        if taker.leaves_quantity.is_zero() {
            // Fully filled by the walk above; nothing rests, no further report needed
            // beyond the per-fill reports already pushed.
        } else if taker.time_in_force.is_immediate() {
            outcome.reports.push(ExecutionReport {
                order_id: Some(taker.id),
                client_order_id: taker.client_order_id.clone(),
                session: taker.session.clone(),
                kind: ExecutionReportKind::Cancelled,
                leaves_quantity: taker.leaves_quantity,
                cum_quantity: taker.cum_quantity,
                last_price: None,
                last_quantity: None,
                reason: Some("immediate-or-cancel residual expired".to_string()),
            });
        } else {
            let added = self.book.insert_resting(taker.clone());
            outcome.book_notifications.push(added);
            outcome.reports.push(ExecutionReport {
                order_id: Some(taker.id),
                client_order_id: taker.client_order_id.clone(),
                session: taker.session.clone(),
                kind: if taker.cum_quantity.is_zero() {
                    ExecutionReportKind::New
                } else {
                    ExecutionReportKind::PartialFill
                },
                leaves_quantity: taker.leaves_quantity,
                cum_quantity: taker.cum_quantity,
                last_price: None,
                last_quantity: None,
                reason: None,
            });
        }

        outcome.publish(&self.book, &self.market_data, &self.config);
        Ok(outcome)
    }

    pub fn amend_order(&mut self, request: AmendOrderRequest) -> Result<CommandOutcome, AmendReject> {
        let order_id = self
            .book
            .find_by_client(&request.session, &request.orig_client_order_id)
            .ok_or(AmendReject::UnknownOrder)?;
        let existing = self.book.get(order_id).ok_or(AmendReject::UnknownOrder)?;
        if existing.session != request.session {
            return Err(AmendReject::OwnerMismatch);
        }

        let is_quantity_only_reduction = request.new_price == existing.price
            && request.new_quantity < existing.leaves_quantity
            && request.new_quantity >= existing.cum_quantity;

        if is_quantity_only_reduction {
            if !validate::phase_allows_amend_down(&self.phase, &self.config) {
                return Err(AmendReject::PhaseRejectsAmend);
            }
            validate::validate_amend_quantity(request.new_quantity, &self.instrument)?;

            let mut outcome = CommandOutcome::default();
            let notification = self
                .book
                .reduce_in_place(order_id, request.new_quantity)
                .expect("order located above");
            outcome.book_notifications.push(notification);
            let updated = self.book.get(order_id).expect("order located above");
            outcome.reports.push(ExecutionReport {
                order_id: Some(order_id),
                client_order_id: request.new_client_order_id.clone(),
                session: request.session.clone(),
                kind: ExecutionReportKind::PartialFill,
                leaves_quantity: updated.leaves_quantity,
                cum_quantity: updated.cum_quantity,
                last_price: None,
                last_quantity: None,
                reason: None,
            });
            outcome.publish(&self.book, &self.market_data, &self.config);
            return Ok(outcome);
        }

        if !validate::phase_allows_new_order(&self.phase) {
            return Err(AmendReject::PhaseRejectsAmend);
        }
        if let Some(price) = request.new_price {
            validate::validate_amend_price(price, &self.instrument)?;
        }
        validate::validate_amend_quantity(request.new_quantity, &self.instrument)?;

        let removed = self.book.remove(order_id).expect("order located above");
        let mut outcome = CommandOutcome::default();
        outcome.book_notifications.push(OrderBookNotification::Removed {
            side: removed.side,
            price: removed.price.expect("resting order carries a price"),
            order_id,
            session: removed.session.clone(),
        });

        let replacement = PlaceOrderRequest {
            client_order_id: request.new_client_order_id,
            session: request.session,
            owner: removed.owner,
            side: removed.side,
            price: request.new_price.or(removed.price),
            quantity: request.new_quantity,
            time_in_force: removed.time_in_force,
            expire_time: removed.expire_time,
        };
        let replacement_outcome = self
            .place_order(replacement, removed.created_at)
            .map_err(|_| AmendReject::BadQuantity)?;

        outcome.reports.extend(replacement_outcome.reports);
        outcome.trades.extend(replacement_outcome.trades);
        outcome.book_notifications.extend(replacement_outcome.book_notifications);
        outcome.market_data.extend(replacement_outcome.market_data);
        Ok(outcome)
    }

    pub fn cancel_order(&mut self, request: CancelOrderRequest) -> Result<CommandOutcome, CancelReject> {
        let order_id = self
            .book
            .find_by_client(&request.session, &request.orig_client_order_id)
            .ok_or(CancelReject::UnknownOrder)?;
        let existing = self.book.get(order_id).ok_or(CancelReject::UnknownOrder)?;
        if existing.session != request.session {
            return Err(CancelReject::OwnerMismatch);
        }
        if !validate::phase_allows_cancel(&self.phase) {
            return Err(CancelReject::UnknownOrder);
        }

        let removed = self.book.remove(order_id).expect("order located above");
        let mut outcome = CommandOutcome::default();
        outcome.book_notifications.push(OrderBookNotification::Removed {
            side: removed.side,
            price: removed.price.expect("resting order carries a price"),
            order_id,
            session: removed.session.clone(),
        });
        outcome.reports.push(ExecutionReport {
            order_id: Some(order_id),
            client_order_id: removed.client_order_id,
            session: removed.session,
            kind: ExecutionReportKind::Cancelled,
            leaves_quantity: Decimal::ZERO,
            cum_quantity: removed.cum_quantity,
            last_price: None,
            last_quantity: None,
            reason: None,
        });
        outcome.publish(&self.book, &self.market_data, &self.config);
        Ok(outcome)
    }

    pub fn market_data_request(&mut self, request: MarketDataRequest) -> MarketDataSnapshot {
        self.market_data.subscribe(
            request.session,
            request.snapshot_only,
            request.depth,
            &self.book,
            &self.config,
        )
    }

    pub fn security_status_request(&mut self, _request: SecurityStatusRequest) -> SecurityStatus {
        self.market_data.security_status(self.phase)
    }

    /// Cancels every resting order owned by `session`, if cancel-on-disconnect is
    /// enabled for this venue.
    pub fn notify_client_disconnected(&mut self, session: &SessionId) -> CommandOutcome {
        let mut outcome = CommandOutcome::default();
        if !self.config.cod_enabled {
            return outcome;
        }
        let order_ids: Vec<OrderId> = self
            .book
            .resting_orders()
            .filter(|order| &order.session == session)
            .map(|order| order.id)
            .collect();

        for order_id in order_ids {
            let removed = self.book.remove(order_id).expect("order_id came from this book");
            outcome.book_notifications.push(OrderBookNotification::Removed {
                side: removed.side,
                price: removed.price.expect("resting order carries a price"),
                order_id,
                session: removed.session.clone(),
            });
            outcome.reports.push(ExecutionReport {
                order_id: Some(order_id),
                client_order_id: removed.client_order_id,
                session: removed.session,
                kind: ExecutionReportKind::Cancelled,
                leaves_quantity: Decimal::ZERO,
                cum_quantity: removed.cum_quantity,
                last_price: None,
                last_quantity: None,
                reason: Some("session disconnected".to_string()),
            });
        }
        outcome.publish(&self.book, &self.market_data, &self.config);
        outcome
    }

    /// Expires Day orders on a new timezone day and GTD orders whose `expire_time` has
    /// passed, then republishes staged market data.
    pub fn tick(&mut self, event: TickEvent) -> CommandOutcome {
        let mut outcome = CommandOutcome::default();

        let mut expiring: Vec<OrderId> = Vec::new();
        if event.is_new_tz_day {
            expiring.extend(
                self.book
                    .resting_orders()
                    .filter(|o| o.time_in_force == TimeInForce::Day)
                    .map(|o| o.id),
            );
        }
        expiring.extend(
            self.book
                .resting_orders()
                .filter(|o| o.time_in_force == TimeInForce::Gtd)
                .filter(|o| o.expire_time.is_some_and(|expiry| expiry <= event.sys_tick_time))
                .map(|o| o.id),
        );
        expiring.sort_unstable();
        expiring.dedup();

        for order_id in expiring {
            let Some(removed) = self.book.remove(order_id) else {
                continue;
            };
            outcome.book_notifications.push(OrderBookNotification::Removed {
                side: removed.side,
                price: removed.price.expect("resting order carries a price"),
                order_id,
                session: removed.session.clone(),
            });
            outcome.reports.push(ExecutionReport {
                order_id: Some(order_id),
                client_order_id: removed.client_order_id,
                session: removed.session,
                kind: ExecutionReportKind::Expired,
                leaves_quantity: Decimal::ZERO,
                cum_quantity: removed.cum_quantity,
                last_price: None,
                last_quantity: None,
                reason: Some("expired".to_string()),
            });
        }

        outcome.publish(&self.book, &self.market_data, &self.config);
        outcome
    }

    /// Applies a phase transition: records the new phase, optionally cancels resting
    /// orders on entry to `Closed`, and publishes a security status update.
    pub fn phase_transition(&mut self, phase: Phase) -> (CommandOutcome, SecurityStatus) {
        self.phase = phase;
        let mut outcome = CommandOutcome::default();

        if phase.phase == TradingPhase::Closed && self.config.cancel_resting_on_close {
            let order_ids: Vec<OrderId> = self.book.resting_orders().map(|o| o.id).collect();
            for order_id in order_ids {
                let removed = self.book.remove(order_id).expect("order_id came from this book");
                outcome.book_notifications.push(OrderBookNotification::Removed {
                    side: removed.side,
                    price: removed.price.expect("resting order carries a price"),
                    order_id,
                    session: removed.session.clone(),
                });
                outcome.reports.push(ExecutionReport {
                    order_id: Some(order_id),
                    client_order_id: removed.client_order_id,
                    session: removed.session,
                    kind: ExecutionReportKind::Cancelled,
                    leaves_quantity: Decimal::ZERO,
                    cum_quantity: removed.cum_quantity,
                    last_price: None,
                    last_quantity: None,
                    reason: Some("venue closed".to_string()),
                });
            }
        }

        outcome.publish(&self.book, &self.market_data, &self.config);
        let status = self.market_data.security_status(self.phase);
        (outcome, status)
    }

    pub fn capture_snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            instrument: self.instrument.clone(),
            orders: self.book.resting_orders().cloned().collect(),
            next_order_id: self.next_order_id,
        }
    }

    /// Re-installs orders, instrument header, and the next-id seed from a snapshot.
    pub fn restore_snapshot(&mut self, snapshot: EngineSnapshot) {
        self.instrument = snapshot.instrument;
        self.book = OrderBook::new();
        for order in snapshot.orders {
            self.book.insert_resting(order);
        }
        self.next_order_id = snapshot.next_order_id;
    }
}

/// The actor wrapper: every public method posts a job onto a per-instrument
/// [`ChainedMux`] and blocks on a one-shot channel for the reply, giving the FIFO
/// single-flight guarantee from spec §4.4/§5 without the caller managing any locking.
pub struct EngineHandle {
    mux: ChainedMux,
    engine: Arc<parking_lot::Mutex<TradingEngine>>,
}

impl EngineHandle {
    pub fn new(pool: Arc<dyn venue_runtime::Service>, engine: TradingEngine) -> Self {
        Self {
            mux: ChainedMux::new(pool),
            engine: Arc::new(parking_lot::Mutex::new(engine)),
        }
    }

    fn call<T, F>(&self, f: F) -> T
    where
        T: Send + 'static,
        F: FnOnce(&mut TradingEngine) -> T + Send + 'static,
    {
        let engine = Arc::clone(&self.engine);
        let (tx, rx) = mpsc::channel();
        self.mux.post(Box::new(move || {
            let result = f(&mut engine.lock());
            let _ = tx.send(result);
        }));
        rx.recv().expect("engine worker dropped the reply channel")
    }

    pub fn place_order(&self, request: PlaceOrderRequest, now: DateTime<Utc>) -> Result<CommandOutcome, OrderPlacementReject> {
        self.call(move |engine| engine.place_order(request, now))
    }

    pub fn amend_order(&self, request: AmendOrderRequest) -> Result<CommandOutcome, AmendReject> {
        self.call(move |engine| engine.amend_order(request))
    }

    pub fn cancel_order(&self, request: CancelOrderRequest) -> Result<CommandOutcome, CancelReject> {
        self.call(move |engine| engine.cancel_order(request))
    }

    pub fn market_data_request(&self, request: MarketDataRequest) -> MarketDataSnapshot {
        self.call(move |engine| engine.market_data_request(request))
    }

    pub fn security_status_request(&self, request: SecurityStatusRequest) -> SecurityStatus {
        self.call(move |engine| engine.security_status_request(request))
    }

    pub fn notify_client_disconnected(&self, session: SessionId) -> CommandOutcome {
        self.call(move |engine| engine.notify_client_disconnected(&session))
    }

    pub fn tick(&self, event: TickEvent) -> CommandOutcome {
        self.call(move |engine| engine.tick(event))
    }

    pub fn phase_transition(&self, phase: Phase) -> (CommandOutcome, SecurityStatus) {
        self.call(move |engine| engine.phase_transition(phase))
    }

    pub fn capture_snapshot(&self) -> EngineSnapshot {
        self.call(|engine| engine.capture_snapshot())
    }

    pub fn store_state(&self) -> EngineSnapshot {
        self.capture_snapshot()
    }

    pub fn recover_state(&self, snapshot: EngineSnapshot) {
        self.call(move |engine| engine.restore_snapshot(snapshot))
    }
}
