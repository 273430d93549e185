//! rebalancer: threshold portfolio rebalancer for Alpaca brokerage accounts.
//!
//! Reads target weights from a JSON file, fetches equity and positions from
//! Alpaca, and when any holding drifts more than 5% of equity away from its
//! target, sizes whole-share market orders and submits sells before buys.
//! Orders refused for insufficient buying power are retried one share
//! smaller each time. Every run is written to a JSONL audit trail.

pub mod allocation;
pub mod audit;
pub mod broker;
pub mod config;
pub mod deviation;
pub mod error;
pub mod execution;
pub mod executor;
pub mod notify;
pub mod orchestrator;
pub mod sizing;
