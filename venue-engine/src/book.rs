use crate::order::{ClientOrderId, Order, OrderId, SessionId, Side};
use crate::trade::Trade;
use crate::FnvIndexMap;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::{BTreeMap, VecDeque};
use venue_phase::TradingPhase;

/// Emitted whenever a resting order is added, partially matched, or removed, feeding
/// the market-data facade's book-state cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OrderBookNotification {
    Added {
        side: Side,
        price: Decimal,
        order_id: OrderId,
        quantity: Decimal,
        session: SessionId,
    },
    Reduced {
        side: Side,
        price: Decimal,
        order_id: OrderId,
        quantity: Decimal,
        session: SessionId,
    },
    Removed {
        side: Side,
        price: Decimal,
        order_id: OrderId,
        session: SessionId,
    },
}

impl OrderBookNotification {
    pub fn side(&self) -> Side {
        match self {
            Self::Added { side, .. } | Self::Reduced { side, .. } | Self::Removed { side, .. } => *side,
        }
    }

    pub fn price(&self) -> Decimal {
        match self {
            Self::Added { price, .. } | Self::Reduced { price, .. } | Self::Removed { price, .. } => *price,
        }
    }

    pub fn session(&self) -> &SessionId {
        match self {
            Self::Added { session, .. } | Self::Reduced { session, .. } | Self::Removed { session, .. } => session,
        }
    }
}

/// One resting-order fill produced during matching, paired with everything needed to
/// notify the maker's session.
#[derive(Debug, Clone, PartialEq)]
pub struct Fill {
    pub trade: Trade,
    pub maker_order_id: OrderId,
    pub maker_session: SessionId,
    pub maker_client_order_id: ClientOrderId,
    pub maker_leaves_after: Decimal,
    pub maker_cum_after: Decimal,
    pub maker_removed: bool,
    pub taker_leaves_after: Decimal,
    pub taker_cum_after: Decimal,
}

#[derive(Debug, Default)]
pub struct MatchOutcome {
    pub fills: Vec<Fill>,
    pub notifications: Vec<OrderBookNotification>,
}

/// Per-instrument order book: two price-ordered sequences (bids descending, offers
/// ascending), FIFO per level. No `Ioc`/`Fok`/market order is ever resting here
/// (invariant 2).
#[derive(Debug, Default, Clone)]
pub struct OrderBook {
    bids: BTreeMap<Reverse<Decimal>, VecDeque<OrderId>>,
    asks: BTreeMap<Decimal, VecDeque<OrderId>>,
    orders: FnvIndexMap<OrderId, Order>,
    by_client: FnvIndexMap<(SessionId, ClientOrderId), OrderId>,
}

impl OrderBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn best_bid(&self) -> Option<Decimal> {
        self.bids.keys().next().map(|Reverse(p)| *p)
    }

    pub fn best_ask(&self) -> Option<Decimal> {
        self.asks.keys().next().copied()
    }

    pub fn get(&self, id: OrderId) -> Option<&Order> {
        self.orders.get(&id)
    }

    pub fn find_by_client(&self, session: &SessionId, client_order_id: &ClientOrderId) -> Option<OrderId> {
        self.by_client
            .get(&(session.clone(), client_order_id.clone()))
            .copied()
    }

    pub fn resting_orders(&self) -> impl Iterator<Item = &Order> {
        self.orders.values()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Inserts `order` at the tail of its level's FIFO. The caller has already ensured
    /// `order` is not `Ioc`/`Fok`/market.
    pub fn insert_resting(&mut self, order: Order) -> OrderBookNotification {
        let notification = OrderBookNotification::Added {
            side: order.side,
            price: order.price.expect("resting order must carry a price"),
            order_id: order.id,
            quantity: order.leaves_quantity,
            session: order.session.clone(),
        };
        let price = order.price.expect("resting order must carry a price");
        let key = (order.session.clone(), order.client_order_id.clone());
        let id = order.id;

        match order.side {
            Side::Buy => self.bids.entry(Reverse(price)).or_default().push_back(id),
            Side::Sell => self.asks.entry(price).or_default().push_back(id),
        }
        self.by_client.insert(key, id);
        self.orders.insert(id, order);
        notification
    }

    /// Removes a resting order wholesale (cancel, full fill, or expiry).
    pub fn remove(&mut self, id: OrderId) -> Option<Order> {
        let order = self.orders.shift_remove(&id)?;
        self.by_client
            .shift_remove(&(order.session.clone(), order.client_order_id.clone()));

        let price = order.price.expect("resting order must carry a price");
        let emptied = match order.side {
            Side::Buy => {
                if let Some(queue) = self.bids.get_mut(&Reverse(price)) {
                    queue.retain(|&queued| queued != id);
                    queue.is_empty()
                } else {
                    false
                }
            }
            Side::Sell => {
                if let Some(queue) = self.asks.get_mut(&price) {
                    queue.retain(|&queued| queued != id);
                    queue.is_empty()
                } else {
                    false
                }
            }
        };
        if emptied {
            match order.side {
                Side::Buy => {
                    self.bids.remove(&Reverse(price));
                }
                Side::Sell => {
                    self.asks.remove(&price);
                }
            }
        }
        Some(order)
    }

    /// In-place quantity reduction preserving time priority (used by amend-down).
    pub fn reduce_in_place(&mut self, id: OrderId, new_quantity: Decimal) -> Option<OrderBookNotification> {
        let order = self.orders.get_mut(&id)?;
        let delta = order.leaves_quantity - new_quantity;
        order.leaves_quantity = new_quantity;
        order.quantity -= delta;
        Some(OrderBookNotification::Reduced {
            side: order.side,
            price: order.price.expect("resting order must carry a price"),
            order_id: id,
            quantity: order.leaves_quantity,
            session: order.session.clone(),
        })
    }

    /// Total resting quantity available at prices that would cross against `side` at
    /// `limit_price` (`None` = market, crosses any level). Used for FOK precompute.
    pub fn crossable_quantity(&self, side: Side, limit_price: Option<Decimal>) -> Decimal {
        let mut total = Decimal::ZERO;
        match side {
            Side::Buy => {
                for (&price, queue) in self.asks.iter() {
                    if !crosses(side, limit_price, price) {
                        break;
                    }
                    total += queue
                        .iter()
                        .filter_map(|id| self.orders.get(id))
                        .map(|o| o.leaves_quantity)
                        .sum::<Decimal>();
                }
            }
            Side::Sell => {
                for (&Reverse(price), queue) in self.bids.iter() {
                    if !crosses(side, limit_price, price) {
                        break;
                    }
                    total += queue
                        .iter()
                        .filter_map(|id| self.orders.get(id))
                        .map(|o| o.leaves_quantity)
                        .sum::<Decimal>();
                }
            }
        }
        total
    }

    /// Top `depth` price levels on `side`, aggregated. If `exclude_session` is set,
    /// that session's own resting quantity at each level is subtracted (the "exclude
    /// own orders" market-data flag).
    pub fn depth(&self, side: Side, depth: u32, exclude_session: Option<&SessionId>) -> Vec<(Decimal, Decimal)> {
        let mut levels = Vec::new();
        match side {
            Side::Buy => {
                for (&Reverse(price), queue) in self.bids.iter() {
                    if levels.len() as u32 >= depth {
                        break;
                    }
                    if let Some(qty) = self.level_quantity(queue, exclude_session) {
                        levels.push((price, qty));
                    }
                }
            }
            Side::Sell => {
                for (&price, queue) in self.asks.iter() {
                    if levels.len() as u32 >= depth {
                        break;
                    }
                    if let Some(qty) = self.level_quantity(queue, exclude_session) {
                        levels.push((price, qty));
                    }
                }
            }
        }
        levels
    }

    /// 0-based rank of `price` among `side`'s currently-resting levels, counting only
    /// levels strictly better than `price`. Used to bound an incremental notification
    /// to a subscriber's depth window; works for a level that has just been removed
    /// from the book too, since removing a level never changes the rank of any level
    /// better than it.
    pub fn level_rank(&self, side: Side, price: Decimal) -> u32 {
        match side {
            Side::Buy => self.bids.keys().take_while(|&&Reverse(p)| p > price).count() as u32,
            Side::Sell => self.asks.keys().take_while(|&&p| p < price).count() as u32,
        }
    }

    fn level_quantity(&self, queue: &VecDeque<OrderId>, exclude_session: Option<&SessionId>) -> Option<Decimal> {
        let total: Decimal = queue
            .iter()
            .filter_map(|id| self.orders.get(id))
            .filter(|order| exclude_session.is_none_or(|s| &order.session != s))
            .map(|order| order.leaves_quantity)
            .sum();
        if total.is_zero() {
            None
        } else {
            Some(total)
        }
    }

    /// Walks the opposite side against `taker`, filling at maker prices, in
    /// price-time priority. Mutates `taker.leaves_quantity`/`cum_quantity` in place.
    pub fn match_taker(&mut self, taker: &mut Order, now: DateTime<Utc>, phase: TradingPhase) -> MatchOutcome {
        let mut outcome = MatchOutcome::default();

        loop {
            if taker.leaves_quantity.is_zero() {
                break;
            }
            let level_price = match taker.side {
                Side::Buy => self.asks.keys().next().copied(),
                Side::Sell => self.bids.keys().next().map(|Reverse(p)| *p),
            };
            let Some(level_price) = level_price else {
                break;
            };
            if !crosses(taker.side, taker.price, level_price) {
                break;
            }

            self.drain_level(taker, level_price, now, phase, &mut outcome);
        }

        outcome
    }

    fn drain_level(
        &mut self,
        taker: &mut Order,
        level_price: Decimal,
        now: DateTime<Utc>,
        phase: TradingPhase,
        outcome: &mut MatchOutcome,
    ) {
        loop {
            if taker.leaves_quantity.is_zero() {
                return;
            }
            let maker_side = taker.side.opposite();
            let maker_id = match maker_side {
                Side::Buy => self.bids.get(&Reverse(level_price)).and_then(|q| q.front().copied()),
                Side::Sell => self.asks.get(&level_price).and_then(|q| q.front().copied()),
            };
            let Some(maker_id) = maker_id else {
                self.drop_level_if_empty(maker_side, level_price);
                return;
            };

            let fill_quantity = {
                let maker = self.orders.get(&maker_id).expect("indexed order must exist");
                taker.leaves_quantity.min(maker.leaves_quantity)
            };

            taker.apply_fill(fill_quantity);
            let maker = self.orders.get_mut(&maker_id).expect("indexed order must exist");
            maker.apply_fill(fill_quantity);

            let (buyer, seller) = match taker.side {
                Side::Buy => (taker.owner.clone(), maker.owner.clone()),
                Side::Sell => (maker.owner.clone(), taker.owner.clone()),
            };
            let trade = Trade {
                buyer,
                seller,
                price: level_price,
                quantity: fill_quantity,
                aggressor_side: taker.side,
                time: now,
                phase,
            };

            let maker_removed = maker.is_fully_filled();
            let maker_session = maker.session.clone();
            let maker_client_order_id = maker.client_order_id.clone();
            let maker_leaves_after = maker.leaves_quantity;
            let maker_cum_after = maker.cum_quantity;

            outcome.fills.push(Fill {
                trade,
                maker_order_id: maker_id,
                maker_session: maker_session.clone(),
                maker_client_order_id,
                maker_leaves_after,
                maker_cum_after,
                maker_removed,
                taker_leaves_after: taker.leaves_quantity,
                taker_cum_after: taker.cum_quantity,
            });

            if maker_removed {
                self.remove(maker_id);
                outcome.notifications.push(OrderBookNotification::Removed {
                    side: maker_side,
                    price: level_price,
                    order_id: maker_id,
                    session: maker_session,
                });
            } else {
                outcome.notifications.push(OrderBookNotification::Reduced {
                    side: maker_side,
                    price: level_price,
                    order_id: maker_id,
                    quantity: maker_leaves_after,
                    session: maker_session,
                });
                // Partially filled maker keeps its place at the front of the FIFO;
                // stop draining this level until the taker sends more quantity.
                return;
            }
        }
    }

    fn drop_level_if_empty(&mut self, side: Side, price: Decimal) {
        match side {
            Side::Buy => {
                if self.bids.get(&Reverse(price)).is_some_and(|q| q.is_empty()) {
                    self.bids.remove(&Reverse(price));
                }
            }
            Side::Sell => {
                if self.asks.get(&price).is_some_and(|q| q.is_empty()) {
                    self.asks.remove(&price);
                }
            }
        }
    }
}

fn crosses(taker_side: Side, taker_price: Option<Decimal>, level_price: Decimal) -> bool {
    match taker_price {
        None => true,
        Some(price) => match taker_side {
            Side::Buy => price >= level_price,
            Side::Sell => price <= level_price,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::TimeInForce;
    use rust_decimal_macros::dec;

    fn order(id: u64, side: Side, price: Decimal, qty: Decimal) -> Order {
        Order {
            id: OrderId(id),
            client_order_id: ClientOrderId::new(format!("C{id}")),
            session: SessionId::new("S1"),
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
    fn fifo_priority_within_a_level() {
        let mut book = OrderBook::new();
        book.insert_resting(order(1, Side::Sell, dec!(10.00), dec!(50)));
        book.insert_resting(order(2, Side::Sell, dec!(10.00), dec!(50)));

        let mut taker = order(3, Side::Buy, dec!(10.00), dec!(60));
        taker.time_in_force = TimeInForce::Ioc;
        let outcome = book.match_taker(&mut taker, Utc::now(), TradingPhase::Open);

        assert_eq!(outcome.fills.len(), 2);
        assert_eq!(outcome.fills[0].maker_order_id, OrderId(1));
        assert_eq!(outcome.fills[0].maker_removed, true);
        assert_eq!(outcome.fills[1].maker_order_id, OrderId(2));
        assert_eq!(outcome.fills[1].maker_removed, false);
        assert_eq!(taker.leaves_quantity, Decimal::ZERO);
    }

    #[test]
    fn trade_price_is_maker_price() {
        let mut book = OrderBook::new();
        book.insert_resting(order(1, Side::Buy, dec!(10.00), dec!(100)));

        let mut taker = order(2, Side::Sell, dec!(10.00), dec!(60));
        taker.time_in_force = TimeInForce::Ioc;
        let outcome = book.match_taker(&mut taker, Utc::now(), TradingPhase::Open);
        assert_eq!(outcome.fills[0].trade.price, dec!(10.00));
    }

    #[test]
    fn no_cross_when_prices_do_not_overlap() {
        let mut book = OrderBook::new();
        book.insert_resting(order(1, Side::Sell, dec!(11.00), dec!(50)));

        let mut taker = order(2, Side::Buy, dec!(10.00), dec!(60));
        taker.time_in_force = TimeInForce::Ioc;
        let outcome = book.match_taker(&mut taker, Utc::now(), TradingPhase::Open);
        assert!(outcome.fills.is_empty());
        assert_eq!(taker.leaves_quantity, dec!(60));
    }

    #[test]
    fn crossable_quantity_sums_eligible_levels() {
        let mut book = OrderBook::new();
        book.insert_resting(order(1, Side::Sell, dec!(10.00), dec!(20)));
        book.insert_resting(order(2, Side::Sell, dec!(10.50), dec!(30)));
        book.insert_resting(order(3, Side::Sell, dec!(11.00), dec!(40)));

        assert_eq!(book.crossable_quantity(Side::Buy, Some(dec!(10.50))), dec!(50));
        assert_eq!(book.crossable_quantity(Side::Buy, None), dec!(90));
    }

    #[test]
    fn remove_drops_empty_level() {
        let mut book = OrderBook::new();
        book.insert_resting(order(1, Side::Buy, dec!(10.00), dec!(20)));
        assert!(book.best_bid().is_some());
        book.remove(OrderId(1));
        assert!(book.best_bid().is_none());
    }

    #[test]
    fn reduce_in_place_preserves_priority() {
        let mut book = OrderBook::new();
        book.insert_resting(order(1, Side::Sell, dec!(10.00), dec!(50)));
        book.insert_resting(order(2, Side::Sell, dec!(10.00), dec!(50)));
        book.reduce_in_place(OrderId(1), dec!(10));

        let mut taker = order(3, Side::Buy, dec!(10.00), dec!(15));
        taker.time_in_force = TimeInForce::Ioc;
        let outcome = book.match_taker(&mut taker, Utc::now(), TradingPhase::Open);
        assert_eq!(outcome.fills[0].maker_order_id, OrderId(1));
        assert_eq!(outcome.fills[0].trade.quantity, dec!(10));
    }
}
