use serde::{Deserialize, Serialize};

/// The full enumeration from the data model; carried even though matching only
/// operates on a subset (multi-leg/synthetic/FX-NDF instruments are tracked but never
/// cross-matched, per the Non-goals).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SecurityType {
    CommonStock,
    Future,
    Option,
    MultiLeg,
    SyntheticMultiLeg,
    Warrant,
    MutualFund,
    CorporateBond,
    ConvertibleBond,
    RepurchaseAgreement,
    Index,
    ContractForDifference,
    Certificate,
    FxSpot,
    FxForward,
    Forward,
    FxNonDeliverableForward,
    FxSwap,
    FxNonDeliverableSwap,
}

/// Which currency field on an [`crate::Instrument`] is used for price comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CurrencyCategory {
    PriceCurrency,
    BaseCurrency,
}

/// `Fx*` and `Forward` instruments compare on `base_currency`; everything else compares
/// on `price_currency`.
pub fn determine_currency_category(security_type: SecurityType) -> CurrencyCategory {
    use SecurityType::*;
    match security_type {
        FxSpot | FxForward | Forward | FxNonDeliverableForward | FxSwap
        | FxNonDeliverableSwap => CurrencyCategory::BaseCurrency,
        CommonStock | Future | Option | MultiLeg | SyntheticMultiLeg | Warrant
        | MutualFund | CorporateBond | ConvertibleBond | RepurchaseAgreement | Index
        | ContractForDifference | Certificate => CurrencyCategory::PriceCurrency,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fx_and_forward_use_base_currency() {
        for st in [
            SecurityType::FxSpot,
            SecurityType::FxForward,
            SecurityType::Forward,
            SecurityType::FxNonDeliverableForward,
            SecurityType::FxSwap,
            SecurityType::FxNonDeliverableSwap,
        ] {
            assert_eq!(determine_currency_category(st), CurrencyCategory::BaseCurrency);
        }
    }

    #[test]
    fn everything_else_uses_price_currency() {
        for st in [
            SecurityType::CommonStock,
            SecurityType::Future,
            SecurityType::Option,
            SecurityType::Index,
            SecurityType::CorporateBond,
        ] {
            assert_eq!(determine_currency_category(st), CurrencyCategory::PriceCurrency);
        }
    }
}
