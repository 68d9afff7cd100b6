#![warn(unused, rust_2018_idioms)]
#![allow(clippy::too_many_arguments)]

//! The per-instrument trading engine: order book, matcher, validation, market-data
//! facade, and cancel-on-disconnect (spec §4.4). Every public [`TradingEngine`] method
//! is `&mut self` and pure with respect to the order book; ordering and single-flight
//! execution are the caller's ([`EngineHandle`]'s) responsibility, layered on
//! `venue-runtime`'s [`venue_runtime::ChainedMux`].

pub mod book;
pub mod command;
pub mod config;
pub mod engine;
pub mod error;
pub mod market_data;
pub mod order;
pub mod trade;
pub mod validate;

pub use book::{Fill, MatchOutcome, OrderBook, OrderBookNotification};
pub use command::{AmendOrderRequest, CancelOrderRequest, MarketDataRequest, PlaceOrderRequest, SecurityStatusRequest};
pub use config::EngineConfig;
pub use engine::{CommandOutcome, EngineHandle, EngineSnapshot, TradingEngine};
pub use error::{AmendReject, CancelReject, OrderPlacementReject};
pub use market_data::{MarketDataFacade, MarketDataSnapshot, MarketDataUpdate, PriceLevel, SecurityStatus, TradeTapeEntry};
pub use order::{ClientOrderId, ExecutionReport, ExecutionReportKind, Order, OrderId, Side, SessionId, TimeInForce};
pub use trade::Trade;

pub type FnvIndexMap<K, V> = indexmap::IndexMap<K, V, fnv::FnvBuildHasher>;
