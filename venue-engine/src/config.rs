use serde::{Deserialize, Serialize};

/// Venue-level behavior flags consumed by a single engine. A subset of the
/// application-wide `Config` the `venue` binary loads at startup (spec §6); kept
/// separate here so `venue-engine` has no dependency on the binary crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub support_day_orders: bool,
    pub support_ioc_orders: bool,
    pub support_fok_orders: bool,
    pub cod_enabled: bool,
    pub trade_streaming_enabled: bool,
    pub trade_volume_streaming_enabled: bool,
    pub trade_parties_streaming_enabled: bool,
    pub trade_aggressor_streaming_enabled: bool,
    pub depth_orders_exclusion_enabled: bool,
    /// Resolves Open Question 1 (spec.md §9): an amend that only reduces quantity,
    /// preserving time priority, is permitted under `(Open, Halt, allow_cancels=true)`.
    /// Disable for the stricter "cancels only" interpretation.
    pub allow_amend_down_on_halt: bool,
    /// Resolves Open Question 2 (spec.md §9): a scheduled transition into `Closed`
    /// always cancels resting orders. Disable to carry orders across the boundary.
    pub cancel_resting_on_close: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            support_day_orders: true,
            support_ioc_orders: true,
            support_fok_orders: true,
            cod_enabled: false,
            trade_streaming_enabled: false,
            trade_volume_streaming_enabled: false,
            trade_parties_streaming_enabled: false,
            trade_aggressor_streaming_enabled: false,
            depth_orders_exclusion_enabled: false,
            allow_amend_down_on_halt: true,
            cancel_resting_on_close: true,
        }
    }
}
