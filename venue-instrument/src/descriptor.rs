use crate::{Currency, PartyId, PartyRole, SecurityIdSource, SecurityType, Symbol};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// A wire-level request to resolve an instrument, as carried by `NewOrderSingle`,
/// `MarketDataRequest`, etc. Every field is optional; a field left unset yields
/// [`crate::lookup::MatchRate::Unmatchable`] for the corresponding attribute rather
/// than disqualifying a candidate outright.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstrumentDescriptor {
    pub symbol: Option<Symbol>,
    pub security_id: Option<SmolStr>,
    pub id_source: Option<SecurityIdSource>,
    pub security_type: Option<SecurityType>,
    pub security_exchange: Option<SmolStr>,
    pub currency: Option<Currency>,
    pub parties: Vec<(PartyId, PartyRole)>,
}

impl InstrumentDescriptor {
    pub fn symbol(symbol: impl AsRef<str>) -> Self {
        Self {
            symbol: Some(Symbol::new(symbol)),
            ..Default::default()
        }
    }

    pub fn with_security_id(mut self, source: SecurityIdSource, id: impl AsRef<str>) -> Self {
        self.id_source = Some(source);
        self.security_id = Some(SmolStr::new(id.as_ref()));
        self
    }

    pub fn with_security_exchange(mut self, exchange: impl AsRef<str>) -> Self {
        self.security_exchange = Some(SmolStr::new(exchange.as_ref()));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_round_trip() {
        let descriptor = InstrumentDescriptor::symbol("AAPL")
            .with_security_id(SecurityIdSource::Isin, "US0378331005")
            .with_security_exchange("XNAS");

        let json = serde_json::to_string(&descriptor).unwrap();
        let restored: InstrumentDescriptor = serde_json::from_str(&json).unwrap();
        assert_eq!(descriptor, restored);
    }

    #[test]
    fn default_descriptor_round_trips() {
        let descriptor = InstrumentDescriptor::default();
        let json = serde_json::to_string(&descriptor).unwrap();
        let restored: InstrumentDescriptor = serde_json::from_str(&json).unwrap();
        assert_eq!(descriptor, restored);
    }
}
