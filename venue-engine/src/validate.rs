use crate::config::EngineConfig;
use crate::error::{AmendReject, OrderPlacementReject};
use crate::order::TimeInForce;
use rust_decimal::Decimal;
use venue_instrument::Instrument;
use venue_phase::{Phase, TradingPhase, TradingStatus};

/// Fields of a placement request relevant to validation, independent of the concrete
/// request type so tests can exercise this module directly.
pub struct PlacementFields {
    pub price: Option<Decimal>,
    pub quantity: Decimal,
    pub time_in_force: TimeInForce,
}

/// Accept orders only in `(Open, Resume)`; in `(Open, Halt, allow_cancels)` reject all
/// new entry; any `Closed` rejects all order-entry (spec §4.4 validation rules).
pub fn phase_allows_new_order(phase: &Phase) -> bool {
    phase.phase == TradingPhase::Open && phase.status == TradingStatus::Resume
}

/// Under `(Open, Halt, allow_cancels=true)`, only cancels and (if configured)
/// amend-downs are permitted; resolves Open Question 1 from spec.md §9.
pub fn phase_allows_amend_down(phase: &Phase, config: &EngineConfig) -> bool {
    if phase_allows_new_order(phase) {
        return true;
    }
    phase.phase != TradingPhase::Closed && phase.is_halted() && phase.allow_cancels() && config.allow_amend_down_on_halt
}

pub fn phase_allows_cancel(phase: &Phase) -> bool {
    if phase_allows_new_order(phase) {
        return true;
    }
    phase.phase != TradingPhase::Closed && phase.is_halted() && phase.allow_cancels()
}

pub fn validate_placement(
    fields: &PlacementFields,
    instrument: &Instrument,
    config: &EngineConfig,
    phase: &Phase,
) -> Result<(), OrderPlacementReject> {
    if !phase_allows_new_order(phase) {
        return Err(OrderPlacementReject::PhaseRejectsNewOrder);
    }

    match fields.time_in_force {
        TimeInForce::Day if !config.support_day_orders => {
            return Err(OrderPlacementReject::UnsupportedTimeInForce)
        }
        TimeInForce::Ioc if !config.support_ioc_orders => {
            return Err(OrderPlacementReject::UnsupportedTimeInForce)
        }
        TimeInForce::Fok if !config.support_fok_orders => {
            return Err(OrderPlacementReject::UnsupportedTimeInForce)
        }
        TimeInForce::Gtd if fields.price.is_none() => {}
        _ => {}
    }

    match fields.price {
        None if !fields.time_in_force.is_immediate() => {
            return Err(OrderPlacementReject::MarketOrderRequiresImmediateTif)
        }
        Some(price) if !instrument.price_conforms(price) => {
            return Err(OrderPlacementReject::BadPrice)
        }
        _ => {}
    }

    if !instrument.quantity_conforms(fields.quantity) {
        return Err(OrderPlacementReject::BadQuantity);
    }

    Ok(())
}

pub fn validate_amend_quantity(
    new_quantity: Decimal,
    instrument: &Instrument,
) -> Result<(), AmendReject> {
    if !instrument.quantity_conforms(new_quantity) {
        return Err(AmendReject::BadQuantity);
    }
    Ok(())
}

pub fn validate_amend_price(new_price: Decimal, instrument: &Instrument) -> Result<(), AmendReject> {
    if !instrument.price_conforms(new_price) {
        return Err(AmendReject::BadPrice);
    }
    Ok(())
}
