use crate::order::{ClientOrderId, Side, SessionId, TimeInForce};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use venue_instrument::PartyId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceOrderRequest {
    pub client_order_id: ClientOrderId,
    pub session: SessionId,
    pub owner: Option<PartyId>,
    pub side: Side,
    /// `None` marks a market order; must carry `Ioc` or `Fok`.
    pub price: Option<Decimal>,
    pub quantity: Decimal,
    pub time_in_force: TimeInForce,
    pub expire_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmendOrderRequest {
    pub orig_client_order_id: ClientOrderId,
    pub new_client_order_id: ClientOrderId,
    pub session: SessionId,
    pub new_price: Option<Decimal>,
    pub new_quantity: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CancelOrderRequest {
    pub orig_client_order_id: ClientOrderId,
    pub session: SessionId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketDataRequest {
    pub session: SessionId,
    /// `true`: one-shot snapshot only. `false`: snapshot, then subscribe to
    /// incremental updates.
    pub snapshot_only: bool,
    pub depth: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityStatusRequest {
    pub session: SessionId,
}
