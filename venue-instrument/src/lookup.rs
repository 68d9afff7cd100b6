use crate::{descriptor::InstrumentDescriptor, Instrument, InstrumentId};
use thiserror::Error;

/// Outcome of comparing one descriptor attribute against one candidate instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchRate {
    /// Both sides present and equal.
    Match,
    /// Descriptor field present, instrument field absent or unequal.
    NoMatch,
    /// Descriptor field absent (nothing to compare).
    Unmatchable,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LookupError {
    #[error("no instrument matches the descriptor")]
    InstrumentNotFound,
    #[error("{0} instruments match the descriptor")]
    AmbiguousInstrument(usize),
}

fn match_field<T: PartialEq>(descriptor: Option<&T>, instrument: Option<&T>) -> MatchRate {
    match (descriptor, instrument) {
        (None, _) => MatchRate::Unmatchable,
        (Some(_), None) => MatchRate::NoMatch,
        (Some(d), Some(i)) => {
            if d == i {
                MatchRate::Match
            } else {
                MatchRate::NoMatch
            }
        }
    }
}

fn match_party(descriptor: &InstrumentDescriptor, instrument: &Instrument) -> MatchRate {
    if descriptor.parties.is_empty() {
        return MatchRate::Unmatchable;
    }
    let Some((owner_id, owner_role)) = instrument.owner.as_ref() else {
        return MatchRate::Unmatchable;
    };
    let found = descriptor
        .parties
        .iter()
        .any(|(id, role)| id == owner_id && role == owner_role);
    if found {
        MatchRate::Match
    } else {
        // An original-C++ nuance: a party that fails to match is "unmatchable",
        // never a hard NoMatch, since party lists are frequently partial.
        MatchRate::Unmatchable
    }
}

fn attribute_rates(descriptor: &InstrumentDescriptor, instrument: &Instrument) -> Vec<MatchRate> {
    let alt_id_rate = match descriptor.id_source {
        None => MatchRate::Unmatchable,
        Some(source) => match_field(
            descriptor.security_id.as_ref(),
            instrument.alt_id(source),
        ),
    };

    vec![
        match_field(descriptor.symbol.as_ref(), Some(&instrument.symbol)),
        alt_id_rate,
        match_field(
            descriptor.security_type.as_ref(),
            Some(&instrument.security_type),
        ),
        match_field(
            descriptor.security_exchange.as_ref(),
            instrument.security_exchange.as_ref(),
        ),
        match_field(
            descriptor.currency.as_ref(),
            Some(instrument.match_currency()),
        ),
        match_party(descriptor, instrument),
    ]
}

fn qualifies(rates: &[MatchRate]) -> bool {
    let has_no_match = rates.iter().any(|r| *r == MatchRate::NoMatch);
    let has_match = rates.iter().any(|r| *r == MatchRate::Match);
    !has_no_match && has_match
}

/// Resolves `descriptor` against `instruments`, returning the unique qualifying
/// instrument id.
pub fn find_instrument(
    descriptor: &InstrumentDescriptor,
    instruments: &[Instrument],
) -> Result<InstrumentId, LookupError> {
    let mut qualifying = instruments
        .iter()
        .filter(|instrument| qualifies(&attribute_rates(descriptor, instrument)))
        .map(|instrument| instrument.id);

    let first = qualifying.next().ok_or(LookupError::InstrumentNotFound)?;
    match qualifying.next() {
        None => Ok(first),
        Some(_) => {
            let total = 2 + qualifying.count();
            Err(LookupError::AmbiguousInstrument(total))
        }
    }
}
