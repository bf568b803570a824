//! routeguard: disruption-aware supply-chain routing.
//!
//! Given a parsed shipment requirement, the engine materializes routes for
//! the destination, resolves a live-or-static risk multiplier, prices every
//! route, selects a baseline and a risk-adjusted route, and reports the diff.

pub mod config;
pub mod cost;
pub mod disruption;
pub mod engine;
pub mod feed;
pub mod optimizer;
pub mod registry;
pub mod report;
pub mod risk;
