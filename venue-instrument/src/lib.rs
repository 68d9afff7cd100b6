#![warn(unused, rust_2018_idioms)]

//! Instrument reference data and descriptor-based instrument lookup.
//!
//! An [`Instrument`] is created once at startup from the configuration store and never
//! mutated afterwards. [`lookup::find_instrument`] resolves a wire-level
//! [`InstrumentDescriptor`] to an [`InstrumentId`] by comparing every populated
//! descriptor attribute against the candidate instruments.

pub mod descriptor;
pub mod lookup;
pub mod security_type;

use derive_more::{Constructor, Display, From};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

pub use security_type::{determine_currency_category, CurrencyCategory, SecurityType};

/// Stable for the process lifetime; unique across all configured instruments.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, From, Serialize, Deserialize,
)]
pub struct InstrumentId(pub u64);

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Display, From, Serialize, Deserialize)]
pub struct Symbol(pub SmolStr);

impl Symbol {
    pub fn new(value: impl AsRef<str>) -> Self {
        Self(SmolStr::new(value.as_ref()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Display, From, Serialize, Deserialize)]
pub struct Currency(pub SmolStr);

impl Currency {
    pub fn new(value: impl AsRef<str>) -> Self {
        Self(SmolStr::new(value.as_ref()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Display, From, Serialize, Deserialize)]
pub struct PartyId(pub SmolStr);

impl PartyId {
    pub fn new(value: impl AsRef<str>) -> Self {
        Self(SmolStr::new(value.as_ref()))
    }
}

/// Role a [`PartyId`] plays against an instrument or order; kept small, matching the
/// original's enumerated-but-thin role model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PartyRole {
    ExecutingFirm,
    ClearingFirm,
    EnteringFirm,
    ClientId,
}

/// An alternate security identifier an [`InstrumentDescriptor`] may carry, paired with
/// the instrument field it is compared against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SecurityIdSource {
    Cusip,
    Sedol,
    Isin,
    Ric,
    ExchangeId,
    Bloomberg,
}

/// A reference entity created once at startup and never mutated.
#[derive(Debug, Clone, PartialEq, Constructor, Serialize, Deserialize)]
pub struct Instrument {
    pub id: InstrumentId,
    pub symbol: Symbol,
    pub security_type: SecurityType,
    pub price_currency: Currency,
    pub base_currency: Currency,
    pub security_exchange: Option<SmolStr>,
    pub cusip: Option<SmolStr>,
    pub sedol: Option<SmolStr>,
    pub isin: Option<SmolStr>,
    pub ric: Option<SmolStr>,
    pub exchange_id: Option<SmolStr>,
    pub bloomberg_id: Option<SmolStr>,
    pub owner: Option<(PartyId, PartyRole)>,
    pub database_id: Option<SmolStr>,
    pub price_tick: Decimal,
    pub quantity_tick: Decimal,
    pub min_quantity: Decimal,
    pub max_quantity: Decimal,
}

impl Instrument {
    /// The currency used for price comparisons, per the instrument's
    /// [`SecurityType`] → [`CurrencyCategory`] mapping.
    pub fn match_currency(&self) -> &Currency {
        match determine_currency_category(self.security_type) {
            CurrencyCategory::PriceCurrency => &self.price_currency,
            CurrencyCategory::BaseCurrency => &self.base_currency,
        }
    }

    /// Reads the alternate identifier selected by `source`.
    pub fn alt_id(&self, source: SecurityIdSource) -> Option<&SmolStr> {
        match source {
            SecurityIdSource::Cusip => self.cusip.as_ref(),
            SecurityIdSource::Sedol => self.sedol.as_ref(),
            SecurityIdSource::Isin => self.isin.as_ref(),
            SecurityIdSource::Ric => self.ric.as_ref(),
            SecurityIdSource::ExchangeId => self.exchange_id.as_ref(),
            SecurityIdSource::Bloomberg => self.bloomberg_id.as_ref(),
        }
    }

    /// Conforms `price` to [`Self::price_tick`] within a small epsilon tolerance.
    pub fn price_conforms(&self, price: Decimal) -> bool {
        tick_conforms(price, self.price_tick)
    }

    /// Conforms `quantity` to [`Self::quantity_tick`] and the min/max quantity bounds.
    pub fn quantity_conforms(&self, quantity: Decimal) -> bool {
        quantity >= self.min_quantity
            && quantity <= self.max_quantity
            && tick_conforms(quantity, self.quantity_tick)
    }
}

fn tick_conforms(value: Decimal, tick: Decimal) -> bool {
    if tick.is_zero() {
        return true;
    }
    (value % tick).is_zero()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instrument() -> Instrument {
        Instrument::new(
            InstrumentId(1),
            Symbol::new("AAPL"),
            SecurityType::CommonStock,
            Currency::new("USD"),
            Currency::new("USD"),
            Some(SmolStr::new("XNAS")),
            None,
            None,
            Some(SmolStr::new("US0378331005")),
            None,
            None,
            None,
            None,
            None,
            Decimal::new(1, 2),
            Decimal::new(1, 0),
            Decimal::new(1, 0),
            Decimal::new(1_000_000, 0),
        )
    }

    #[test]
    fn match_currency_uses_price_currency_for_common_stock() {
        let i = instrument();
        assert_eq!(i.match_currency(), &Currency::new("USD"));
    }

    #[test]
    fn tick_conformance() {
        let i = instrument();
        assert!(i.price_conforms(Decimal::new(1050, 2)));
        assert!(!i.price_conforms(Decimal::new(10505, 3)));
        assert!(i.quantity_conforms(Decimal::new(100, 0)));
        assert!(!i.quantity_conforms(Decimal::new(0, 0)));
    }
}
