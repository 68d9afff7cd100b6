//! Minimal `serde_json`-based config loader, standing in for the out-of-scope
//! venue/listing/market-phase data store (spec §6). Reads one JSON document and
//! produces the `Config` and `Instrument` snapshots the core consumes at startup.

use rust_decimal::Decimal;
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;
use venue_engine::EngineConfig;
use venue_instrument::{Currency, Instrument, InstrumentId, PartyId, PartyRole, SecurityType, Symbol};
use venue_phase::{PhaseRecord, PhaseSchedule, TzClock};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Read(#[source] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[source] serde_json::Error),
}

/// Application-wide settings loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub engine: EngineConfig,
    pub persistence_enabled: bool,
    pub persistence_file_path: Option<String>,
    pub phase_schedule: PhaseSchedule,
    pub tz_clock: TzClock,
    pub instruments: Vec<Instrument>,
}

pub fn load(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(ConfigError::Read)?;
    parse(&text)
}

pub fn parse(json: &str) -> Result<Config, ConfigError> {
    let raw: RawConfig = serde_json::from_str(json).map_err(ConfigError::Parse)?;
    Ok(raw.into())
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawConfig {
    support_day: bool,
    support_ioc: bool,
    support_fok: bool,
    cod_enabled: bool,
    trade_streaming: bool,
    trade_volume_streaming: bool,
    trade_parties_streaming: bool,
    trade_aggressor_streaming: bool,
    depth_orders_exclusion: bool,
    allow_amend_down_on_halt: bool,
    cancel_resting_on_close: bool,
    persistence_enabled: bool,
    persistence_file_path: Option<String>,
    tz_offset_hours: i32,
    phase_schedule: Vec<RawPhaseRecord>,
    instruments: Vec<RawInstrument>,
}

impl Default for RawConfig {
    fn default() -> Self {
        Self {
            support_day: true,
            support_ioc: true,
            support_fok: true,
            cod_enabled: false,
            trade_streaming: false,
            trade_volume_streaming: false,
            trade_parties_streaming: false,
            trade_aggressor_streaming: false,
            depth_orders_exclusion: false,
            allow_amend_down_on_halt: true,
            cancel_resting_on_close: true,
            persistence_enabled: false,
            persistence_file_path: None,
            tz_offset_hours: 0,
            phase_schedule: Vec::new(),
            instruments: Vec::new(),
        }
    }
}

impl From<RawConfig> for Config {
    fn from(raw: RawConfig) -> Self {
        let mut schedule = PhaseSchedule::new();
        for record in &raw.phase_schedule {
            schedule.add(record.to_phase_record());
        }

        Config {
            engine: EngineConfig {
                support_day_orders: raw.support_day,
                support_ioc_orders: raw.support_ioc,
                support_fok_orders: raw.support_fok,
                cod_enabled: raw.cod_enabled,
                trade_streaming_enabled: raw.trade_streaming,
                trade_volume_streaming_enabled: raw.trade_volume_streaming,
                trade_parties_streaming_enabled: raw.trade_parties_streaming,
                trade_aggressor_streaming_enabled: raw.trade_aggressor_streaming,
                depth_orders_exclusion_enabled: raw.depth_orders_exclusion,
                allow_amend_down_on_halt: raw.allow_amend_down_on_halt,
                cancel_resting_on_close: raw.cancel_resting_on_close,
            },
            persistence_enabled: raw.persistence_enabled,
            persistence_file_path: raw.persistence_file_path,
            phase_schedule: schedule,
            tz_clock: TzClock::fixed_offset_hours(raw.tz_offset_hours),
            instruments: raw.instruments.into_iter().map(Instrument::from).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
enum RawPhaseKind {
    Base { phase: RawTradingPhase },
    HaltOverlay { allow_cancels: bool },
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(rename_all = "snake_case")]
enum RawTradingPhase {
    Open,
    Closed,
    PostTrading,
    OpeningAuction,
    ClosingAuction,
    IntradayAuction,
}

impl From<RawTradingPhase> for venue_phase::TradingPhase {
    fn from(phase: RawTradingPhase) -> Self {
        use venue_phase::TradingPhase::*;
        match phase {
            RawTradingPhase::Open => Open,
            RawTradingPhase::Closed => Closed,
            RawTradingPhase::PostTrading => PostTrading,
            RawTradingPhase::OpeningAuction => OpeningAuction,
            RawTradingPhase::ClosingAuction => ClosingAuction,
            RawTradingPhase::IntradayAuction => IntradayAuction,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawPhaseRecord {
    begin_minutes: i64,
    end_minutes: i64,
    #[serde(flatten)]
    kind: RawPhaseKind,
}

impl RawPhaseRecord {
    fn to_phase_record(&self) -> PhaseRecord {
        let begin = chrono::Duration::minutes(self.begin_minutes);
        let end = chrono::Duration::minutes(self.end_minutes);
        match self.kind {
            RawPhaseKind::Base { phase } => PhaseRecord::base(begin, end, phase.into()),
            RawPhaseKind::HaltOverlay { allow_cancels } => {
                PhaseRecord::halt_overlay(begin, end, allow_cancels)
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawInstrument {
    id: u64,
    symbol: String,
    security_type: RawSecurityType,
    price_currency: String,
    #[serde(default)]
    base_currency: Option<String>,
    #[serde(default)]
    security_exchange: Option<String>,
    #[serde(default)]
    cusip: Option<String>,
    #[serde(default)]
    sedol: Option<String>,
    #[serde(default)]
    isin: Option<String>,
    #[serde(default)]
    ric: Option<String>,
    #[serde(default)]
    exchange_id: Option<String>,
    #[serde(default)]
    bloomberg_id: Option<String>,
    #[serde(default)]
    owner_party: Option<String>,
    #[serde(default)]
    owner_role: Option<RawPartyRole>,
    #[serde(default)]
    database_id: Option<String>,
    price_tick: Decimal,
    quantity_tick: Decimal,
    min_quantity: Decimal,
    max_quantity: Decimal,
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(rename_all = "snake_case")]
enum RawSecurityType {
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

impl From<RawSecurityType> for SecurityType {
    fn from(value: RawSecurityType) -> Self {
        use SecurityType::*;
        match value {
            RawSecurityType::CommonStock => CommonStock,
            RawSecurityType::Future => Future,
            RawSecurityType::Option => Option,
            RawSecurityType::MultiLeg => MultiLeg,
            RawSecurityType::SyntheticMultiLeg => SyntheticMultiLeg,
            RawSecurityType::Warrant => Warrant,
            RawSecurityType::MutualFund => MutualFund,
            RawSecurityType::CorporateBond => CorporateBond,
            RawSecurityType::ConvertibleBond => ConvertibleBond,
            RawSecurityType::RepurchaseAgreement => RepurchaseAgreement,
            RawSecurityType::Index => Index,
            RawSecurityType::ContractForDifference => ContractForDifference,
            RawSecurityType::Certificate => Certificate,
            RawSecurityType::FxSpot => FxSpot,
            RawSecurityType::FxForward => FxForward,
            RawSecurityType::Forward => Forward,
            RawSecurityType::FxNonDeliverableForward => FxNonDeliverableForward,
            RawSecurityType::FxSwap => FxSwap,
            RawSecurityType::FxNonDeliverableSwap => FxNonDeliverableSwap,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(rename_all = "snake_case")]
enum RawPartyRole {
    ExecutingFirm,
    ClearingFirm,
    EnteringFirm,
    ClientId,
}

impl From<RawPartyRole> for PartyRole {
    fn from(value: RawPartyRole) -> Self {
        match value {
            RawPartyRole::ExecutingFirm => PartyRole::ExecutingFirm,
            RawPartyRole::ClearingFirm => PartyRole::ClearingFirm,
            RawPartyRole::EnteringFirm => PartyRole::EnteringFirm,
            RawPartyRole::ClientId => PartyRole::ClientId,
        }
    }
}

impl From<RawInstrument> for Instrument {
    fn from(raw: RawInstrument) -> Self {
        let price_currency = Currency::new(&raw.price_currency);
        let base_currency = raw
            .base_currency
            .map(|c| Currency::new(&c))
            .unwrap_or_else(|| price_currency.clone());

        Instrument {
            id: InstrumentId(raw.id),
            symbol: Symbol::new(&raw.symbol),
            security_type: raw.security_type.into(),
            price_currency,
            base_currency,
            security_exchange: raw.security_exchange.map(Into::into),
            cusip: raw.cusip.map(Into::into),
            sedol: raw.sedol.map(Into::into),
            isin: raw.isin.map(Into::into),
            ric: raw.ric.map(Into::into),
            exchange_id: raw.exchange_id.map(Into::into),
            bloomberg_id: raw.bloomberg_id.map(Into::into),
            owner: raw
                .owner_party
                .map(|party| (PartyId::new(&party), raw.owner_role.map(Into::into).unwrap_or(PartyRole::ClientId))),
            database_id: raw.database_id.map(Into::into),
            price_tick: raw.price_tick,
            quantity_tick: raw.quantity_tick,
            min_quantity: raw.min_quantity,
            max_quantity: raw.max_quantity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
    {
        "cod_enabled": true,
        "tz_offset_hours": -5,
        "phase_schedule": [
            {"begin_minutes": 0, "end_minutes": 540, "kind": "base", "phase": "closed"},
            {"begin_minutes": 540, "end_minutes": 1020, "kind": "base", "phase": "open"},
            {"begin_minutes": 1020, "end_minutes": 1440, "kind": "base", "phase": "closed"}
        ],
        "instruments": [
            {
                "id": 1,
                "symbol": "AAPL",
                "security_type": "common_stock",
                "price_currency": "USD",
                "price_tick": "0.01",
                "quantity_tick": "1",
                "min_quantity": "1",
                "max_quantity": "1000000"
            }
        ]
    }
    "#;

    #[test]
    fn parses_sample_config() {
        let config = parse(SAMPLE).unwrap();
        assert!(config.engine.cod_enabled);
        assert_eq!(config.instruments.len(), 1);
        assert_eq!(config.instruments[0].symbol, Symbol::new("AAPL"));
    }

    #[test]
    fn unset_flags_default_per_spec() {
        let config = parse(SAMPLE).unwrap();
        assert!(config.engine.support_day_orders);
        assert!(!config.engine.trade_streaming_enabled);
        assert!(!config.persistence_enabled);
        assert!(config.engine.allow_amend_down_on_halt);
        assert!(config.engine.cancel_resting_on_close);
    }

    #[test]
    fn phase_schedule_round_trips_through_selection() {
        let config = parse(SAMPLE).unwrap();
        let noon = chrono::Duration::hours(12);
        let phase = config.phase_schedule.select(noon);
        assert_eq!(phase.phase, venue_phase::TradingPhase::Open);
    }
}
