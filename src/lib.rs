/*!
 * # Eddy - Multi-Hop Arbitrage Detection
 *
 * Eddy is a Rust-based system for detecting multi-hop arbitrage
 * opportunities across token exchanges. It probes venues for swap rates,
 * assembles a weighted rate graph, searches it for loops whose rates
 * compound above one and simulates each loop into a profit-quantified
 * strategy.
 *
 * ## Core Features
 *
 * - **Rate Collection**: Concurrent, rate-limited quoting of every venue
 *   pair in both directions
 * - **Cycle Detection**: Bellman-Ford negative-cycle search over negated
 *   log rates, deduplicated across start vertices
 * - **Cycle Simulation**: Dry-runs each detected loop at real capitals
 *   and reports token and dollar profits
 * - **Exchange Adapters**: One small async trait in front of every venue,
 *   with a deterministic paper implementation built in
 *
 * ## Module Structure
 *
 * - `arb`: Rate graph, detection, simulation and the search orchestrator
 * - `config`: Configuration from the environment
 * - `exchange`: Venue adapter traits and the paper venue
 * - `limiter`: Windowed scheduler for outbound venue calls
 * - `utils`: Utility functions and helpers
 */

/// Rate graph, detection, simulation and the search orchestrator
pub mod arb;
/// Configuration from the environment
pub mod config;
/// Venue adapter traits and the paper venue
pub mod exchange;
/// Windowed scheduler for outbound venue calls
pub mod limiter;
/// Utility functions and helpers
pub mod utils;
