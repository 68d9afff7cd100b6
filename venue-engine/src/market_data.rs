use crate::book::{OrderBook, OrderBookNotification};
use crate::config::EngineConfig;
use crate::order::{SessionId, Side};
use crate::trade::Trade;
use crate::FnvIndexMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use venue_instrument::{InstrumentId, PartyId};
use venue_phase::Phase;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceLevel {
    pub price: Decimal,
    pub quantity: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketDataSnapshot {
    pub instrument_id: InstrumentId,
    pub bids: Vec<PriceLevel>,
    pub asks: Vec<PriceLevel>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketDataUpdate {
    pub instrument_id: InstrumentId,
    pub changes: Vec<OrderBookNotification>,
}

/// One trade-tape entry; fields are populated per the venue's streaming flags
/// (spec §4.4 "Trade streaming flags").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeTapeEntry {
    pub price: Decimal,
    pub quantity: Option<Decimal>,
    pub buyer: Option<PartyId>,
    pub seller: Option<PartyId>,
    pub aggressor_side: Option<Side>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityStatus {
    pub instrument_id: InstrumentId,
    pub phase: Phase,
}

struct Subscription {
    snapshot_only: bool,
    depth: u32,
}

/// Book view, aggregated depth, trade tape, and security status, per spec §4.4.
/// Maintains the subscriber set for one instrument and decides, after each mutating
/// command, who receives an incremental update versus a one-shot snapshot.
pub struct MarketDataFacade {
    instrument_id: InstrumentId,
    subscriptions: FnvIndexMap<SessionId, Subscription>,
    trade_tape: Vec<TradeTapeEntry>,
}

const TRADE_TAPE_CAPACITY: usize = 256;

impl MarketDataFacade {
    pub fn new(instrument_id: InstrumentId) -> Self {
        Self {
            instrument_id,
            subscriptions: FnvIndexMap::default(),
            trade_tape: Vec::new(),
        }
    }

    pub fn subscribe(
        &mut self,
        session: SessionId,
        snapshot_only: bool,
        depth: u32,
        book: &OrderBook,
        config: &EngineConfig,
    ) -> MarketDataSnapshot {
        let snapshot = self.snapshot(&session, depth, book, config);
        if !snapshot_only {
            self.subscriptions
                .insert(session, Subscription { snapshot_only, depth });
        }
        snapshot
    }

    pub fn snapshot(
        &self,
        session: &SessionId,
        depth: u32,
        book: &OrderBook,
        config: &EngineConfig,
    ) -> MarketDataSnapshot {
        let exclude = config.depth_orders_exclusion_enabled.then_some(session);
        MarketDataSnapshot {
            instrument_id: self.instrument_id,
            bids: book
                .depth(Side::Buy, depth, exclude)
                .into_iter()
                .map(|(price, quantity)| PriceLevel { price, quantity })
                .collect(),
            asks: book
                .depth(Side::Sell, depth, exclude)
                .into_iter()
                .map(|(price, quantity)| PriceLevel { price, quantity })
                .collect(),
        }
    }

    /// Records `trades` on the tape, masking fields per the venue's streaming flags.
    pub fn record_trades(&mut self, trades: &[Trade], config: &EngineConfig) {
        if !config.trade_streaming_enabled {
            return;
        }
        for trade in trades {
            let entry = TradeTapeEntry {
                price: trade.price,
                quantity: config.trade_volume_streaming_enabled.then_some(trade.quantity),
                buyer: config
                    .trade_parties_streaming_enabled
                    .then(|| trade.buyer.clone())
                    .flatten(),
                seller: config
                    .trade_parties_streaming_enabled
                    .then(|| trade.seller.clone())
                    .flatten(),
                aggressor_side: config.trade_aggressor_streaming_enabled.then_some(trade.aggressor_side),
            };
            self.trade_tape.push(entry);
        }
        let overflow = self.trade_tape.len().saturating_sub(TRADE_TAPE_CAPACITY);
        if overflow > 0 {
            self.trade_tape.drain(0..overflow);
        }
    }

    pub fn trade_tape(&self) -> &[TradeTapeEntry] {
        &self.trade_tape
    }

    /// For every subscriber whose filter includes the change, returns the incremental
    /// update to deliver, trimmed to that subscription's depth window and, when the
    /// venue has own-order exclusion enabled, stripped of that subscriber's own
    /// orders (mirroring `snapshot`'s `exclude_session`). Snapshot-only subscriptions
    /// never appear here; they were already served their one-shot snapshot at
    /// subscribe time. A subscriber left with no changes in its window is omitted.
    pub fn publish_changes(
        &self,
        changes: Vec<OrderBookNotification>,
        book: &OrderBook,
        config: &EngineConfig,
    ) -> Vec<(SessionId, MarketDataUpdate)> {
        if changes.is_empty() {
            return Vec::new();
        }
        self.subscriptions
            .iter()
            .filter(|(_, sub)| !sub.snapshot_only)
            .filter_map(|(session, sub)| {
                let visible: Vec<OrderBookNotification> = changes
                    .iter()
                    .filter(|change| book.level_rank(change.side(), change.price()) < sub.depth)
                    .filter(|change| {
                        !(config.depth_orders_exclusion_enabled && change.session() == session)
                    })
                    .cloned()
                    .collect();
                if visible.is_empty() {
                    None
                } else {
                    Some((
                        session.clone(),
                        MarketDataUpdate {
                            instrument_id: self.instrument_id,
                            changes: visible,
                        },
                    ))
                }
            })
            .collect()
    }

    pub fn security_status(&self, phase: Phase) -> SecurityStatus {
        SecurityStatus {
            instrument_id: self.instrument_id,
            phase,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::{ClientOrderId, Order, OrderId, TimeInForce};
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn resting(id: u64, side: Side, price: Decimal, qty: Decimal, session: &str) -> Order {
        Order {
            id: OrderId(id),
            client_order_id: ClientOrderId::new(format!("C{id}")),
            session: SessionId::new(session),
            owner: None,
            side,
            price: Some(price),
            quantity: qty,
            leaves_quantity: qty,
            cum_quantity: Decimal::ZERO,
            time_in_force: TimeInForce::Day,
            expire_time: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn snapshot_reports_top_of_book() {
        let mut book = OrderBook::new();
        book.insert_resting(resting(1, Side::Buy, dec!(10.00), dec!(50), "S1"));
        book.insert_resting(resting(2, Side::Sell, dec!(10.50), dec!(30), "S2"));

        let facade = MarketDataFacade::new(InstrumentId(1));
        let snapshot = facade.snapshot(&SessionId::new("S3"), 5, &book, &EngineConfig::default());
        assert_eq!(snapshot.bids[0], PriceLevel { price: dec!(10.00), quantity: dec!(50) });
        assert_eq!(snapshot.asks[0], PriceLevel { price: dec!(10.50), quantity: dec!(30) });
    }

    #[test]
    fn exclude_own_orders_hides_subscribers_own_quantity() {
        let mut book = OrderBook::new();
        book.insert_resting(resting(1, Side::Buy, dec!(10.00), dec!(50), "S1"));

        let facade = MarketDataFacade::new(InstrumentId(1));
        let mut config = EngineConfig::default();
        config.depth_orders_exclusion_enabled = true;
        let snapshot = facade.snapshot(&SessionId::new("S1"), 5, &book, &config);
        assert!(snapshot.bids.is_empty());
    }

    #[test]
    fn subscribers_receive_incremental_changes_unless_snapshot_only() {
        let mut book = OrderBook::new();
        book.insert_resting(resting(1, Side::Buy, dec!(10.00), dec!(10), "taker"));
        let mut facade = MarketDataFacade::new(InstrumentId(1));
        facade.subscribe(SessionId::new("live"), false, 5, &book, &EngineConfig::default());
        facade.subscribe(SessionId::new("once"), true, 5, &book, &EngineConfig::default());

        let changes = vec![OrderBookNotification::Added {
            side: Side::Buy,
            price: dec!(10.00),
            order_id: OrderId(1),
            quantity: dec!(10),
            session: SessionId::new("taker"),
        }];
        let updates = facade.publish_changes(changes, &book, &EngineConfig::default());
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].0, SessionId::new("live"));
    }

    #[test]
    fn incremental_changes_are_trimmed_to_each_subscriptions_depth() {
        let mut book = OrderBook::new();
        book.insert_resting(resting(1, Side::Buy, dec!(10.00), dec!(10), "maker1"));
        book.insert_resting(resting(2, Side::Buy, dec!(9.00), dec!(10), "maker2"));

        let mut facade = MarketDataFacade::new(InstrumentId(1));
        facade.subscribe(SessionId::new("shallow"), false, 1, &book, &EngineConfig::default());
        facade.subscribe(SessionId::new("deep"), false, 5, &book, &EngineConfig::default());

        // A new resting order at 9.00 is rank 1 (one better level, at 10.00, already resting).
        let changes = vec![OrderBookNotification::Added {
            side: Side::Buy,
            price: dec!(9.00),
            order_id: OrderId(2),
            quantity: dec!(10),
            session: SessionId::new("maker2"),
        }];
        let updates = facade.publish_changes(changes, &book, &EngineConfig::default());
        let sessions: Vec<&SessionId> = updates.iter().map(|(session, _)| session).collect();
        assert!(!sessions.contains(&&SessionId::new("shallow")));
        assert!(sessions.contains(&&SessionId::new("deep")));
    }

    #[test]
    fn incremental_changes_hide_subscribers_own_orders_when_exclusion_enabled() {
        let mut book = OrderBook::new();
        book.insert_resting(resting(1, Side::Buy, dec!(10.00), dec!(10), "maker1"));

        let mut facade = MarketDataFacade::new(InstrumentId(1));
        let mut config = EngineConfig::default();
        config.depth_orders_exclusion_enabled = true;
        facade.subscribe(SessionId::new("maker1"), false, 5, &book, &config);
        facade.subscribe(SessionId::new("observer"), false, 5, &book, &config);

        let changes = vec![OrderBookNotification::Added {
            side: Side::Buy,
            price: dec!(10.00),
            order_id: OrderId(1),
            quantity: dec!(10),
            session: SessionId::new("maker1"),
        }];
        let updates = facade.publish_changes(changes, &book, &config);
        let sessions: Vec<&SessionId> = updates.iter().map(|(session, _)| session).collect();
        assert!(!sessions.contains(&&SessionId::new("maker1")));
        assert!(sessions.contains(&&SessionId::new("observer")));
    }
}
