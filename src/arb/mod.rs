//! # Arbitrage Module
//!
//! This module contains the core arbitrage detection pipeline. It turns
//! venue quotes into a weighted rate graph, finds swap loops whose rates
//! compound above one, and simulates them into profit-quantified
//! strategies.

/// Fixed-point token amounts on the internal grid
pub mod amount;
/// Negative-cycle detection
pub mod detector;
/// The rate multigraph and its edges
pub mod graph;
/// The sweep and search orchestrator
pub mod search;
/// Dry-run execution of detected cycles
pub mod simulator;
/// Test helpers and utilities
mod test_helpers;
/// Token identity, decimals and pricing
pub mod token;
/// Search results and their presentation
pub mod types;
