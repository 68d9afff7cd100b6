use chrono::{DateTime, Utc};
use derive_more::{Display, From};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use venue_instrument::PartyId;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, From, Serialize, Deserialize,
)]
pub struct OrderId(pub u64);

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Display, From, Serialize, Deserialize)]
pub struct ClientOrderId(pub SmolStr);

impl ClientOrderId {
    pub fn new(value: impl AsRef<str>) -> Self {
        Self(SmolStr::new(value.as_ref()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Display, From, Serialize, Deserialize)]
pub struct SessionId(pub SmolStr);

impl SessionId {
    pub fn new(value: impl AsRef<str>) -> Self {
        Self(SmolStr::new(value.as_ref()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeInForce {
    Day,
    Ioc,
    Fok,
    Gtc,
    Gtd,
}

impl TimeInForce {
    pub fn is_immediate(self) -> bool {
        matches!(self, TimeInForce::Ioc | TimeInForce::Fok)
    }
}

/// A resting or in-flight order. `price = None` marks a market order, which must carry
/// `Ioc` or `Fok` (spec §3 invariant, enforced in `validate.rs`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub client_order_id: ClientOrderId,
    pub session: SessionId,
    pub owner: Option<PartyId>,
    pub side: Side,
    pub price: Option<Decimal>,
    pub quantity: Decimal,
    pub leaves_quantity: Decimal,
    pub cum_quantity: Decimal,
    pub time_in_force: TimeInForce,
    pub expire_time: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Order {
    pub fn is_fully_filled(&self) -> bool {
        self.leaves_quantity.is_zero()
    }

    /// `leaves + cum = quantity` at all times (invariant 1).
    fn invariant_holds(&self) -> bool {
        self.leaves_quantity + self.cum_quantity == self.quantity && self.leaves_quantity >= Decimal::ZERO
    }

    pub(crate) fn apply_fill(&mut self, fill_quantity: Decimal) {
        self.leaves_quantity -= fill_quantity;
        self.cum_quantity += fill_quantity;
        debug_assert!(self.invariant_holds(), "order {:?} violated leaves+cum=quantity after a fill", self.id);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionReportKind {
    New,
    PartialFill,
    Filled,
    Cancelled,
    Expired,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub order_id: Option<OrderId>,
    pub client_order_id: ClientOrderId,
    pub session: SessionId,
    pub kind: ExecutionReportKind,
    pub leaves_quantity: Decimal,
    pub cum_quantity: Decimal,
    pub last_price: Option<Decimal>,
    pub last_quantity: Option<Decimal>,
    pub reason: Option<String>,
}
