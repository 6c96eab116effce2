//! Client-side interception layer for waystation.
//!
//! This crate provides the network fetch pipeline, the caching strategies,
//! the request interceptor and the version lifecycle controller shared by
//! the server.

pub mod fetch;
pub mod interceptor;
pub mod lifecycle;
pub mod strategy;

#[cfg(test)]
pub(crate) mod test_support;

pub use fetch::{FetchClient, FetchConfig, Network, UrlError, canonicalize};
pub use interceptor::{Interception, Interceptor, PassthroughReason, Served, Source};
pub use lifecycle::{
    ActivateReport, ClientId, ClientMessage, ClientRegistry, InstallReport, LifecycleController, LifecycleState,
    MessageError,
};
pub use strategy::{Resolution, Strategy, StrategyRunner, StrategyTable, strategy_for};
