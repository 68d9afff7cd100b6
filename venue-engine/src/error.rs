use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum OrderPlacementReject {
    #[error("price does not conform to the instrument's price tick")]
    BadPrice,
    #[error("quantity does not conform to the instrument's quantity tick or bounds")]
    BadQuantity,
    #[error("time in force is not supported by this venue")]
    UnsupportedTimeInForce,
    #[error("a required field is missing")]
    MissingField,
    #[error("market orders must be IOC or FOK")]
    MarketOrderRequiresImmediateTif,
    #[error("the current trading phase rejects new order entry")]
    PhaseRejectsNewOrder,
    #[error("immediate-or-cancel order expired with no fill and FOK could not be filled in full")]
    FokUnfilled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AmendReject {
    #[error("no resting order matches the given client order id")]
    UnknownOrder,
    #[error("the requesting session does not own this order")]
    OwnerMismatch,
    #[error("the current trading phase rejects this amendment")]
    PhaseRejectsAmend,
    #[error("amended price does not conform to the instrument's price tick")]
    BadPrice,
    #[error("amended quantity does not conform to the instrument's quantity tick or bounds")]
    BadQuantity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CancelReject {
    #[error("no resting order matches the given client order id")]
    UnknownOrder,
    #[error("the requesting session does not own this order")]
    OwnerMismatch,
}
