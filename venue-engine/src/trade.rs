use crate::order::Side;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use venue_instrument::PartyId;
use venue_phase::TradingPhase;

/// Produced by the matcher. `buyer`/`seller` are absent when the corresponding
/// resting or aggressor order carries no owning party.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub buyer: Option<PartyId>,
    pub seller: Option<PartyId>,
    pub price: Decimal,
    pub quantity: Decimal,
    pub aggressor_side: Side,
    pub time: DateTime<Utc>,
    pub phase: TradingPhase,
}
