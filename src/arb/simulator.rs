//! Dry-run execution of a detected cycle.
//!
//! A detected cycle only proves the probe-time rates compound above one.
//! The simulator walks the loop with an actual capital, quoting every hop
//! through its venue adapter, and reports what that capital would come
//! back as. Two rates fall out: the compounded rate carried over from the
//! probe edges, and the real rate the simulated amounts produced.

use alloy::primitives::{I256, U256};
use eyre::{bail, eyre, Result};
use itertools::Itertools;
use log::debug;

use crate::arb::amount::TokenAmount;
use crate::arb::graph::{RateEdge, RateGraph};
use crate::arb::token::TokenId;

/// One executed hop of a strategy.
#[derive(Debug, Clone)]
pub struct StrategyStep {
    /// The edge the hop rode, venue included
    edge: RateEdge,
    /// Amount paid into the venue
    from_amount: TokenAmount,
    /// Amount the venue quoted back
    to_amount: TokenAmount,
    /// Venue gas estimate for the hop, zero when unavailable
    gas: u64,
}

impl StrategyStep {
    /// The edge the hop rode.
    #[must_use]
    pub const fn edge(&self) -> &RateEdge {
        &self.edge
    }

    /// Amount paid into the venue.
    #[must_use]
    pub const fn from_amount(&self) -> &TokenAmount {
        &self.from_amount
    }

    /// Amount the venue quoted back.
    #[must_use]
    pub const fn to_amount(&self) -> &TokenAmount {
        &self.to_amount
    }

    /// Venue gas estimate for the hop.
    #[must_use]
    pub const fn gas(&self) -> u64 {
        self.gas
    }
}

/// The simulated outcome of one cycle at one capital.
#[derive(Debug, Clone)]
pub struct CycleReport {
    /// Cycle vertices in swap order, without the closing repetition
    cycle: Vec<TokenId>,
    /// One step per hop, in swap order
    steps: Vec<StrategyStep>,
    /// Starting capital, at the decimals the loop resolved to
    start_amount: TokenAmount,
    /// What the capital came back as
    end_amount: TokenAmount,
    /// Product of the probe-time edge ratios
    compounded_rate: f64,
    /// `end / start` from the simulated amounts
    real_rate: f64,
    /// Sum of per-hop gas estimates
    gas_total: u64,
}

impl CycleReport {
    /// Cycle vertices in swap order.
    #[must_use]
    pub fn cycle(&self) -> &[TokenId] {
        &self.cycle
    }

    /// Executed steps in swap order.
    #[must_use]
    pub fn steps(&self) -> &[StrategyStep] {
        &self.steps
    }

    /// Starting capital.
    #[must_use]
    pub const fn start_amount(&self) -> &TokenAmount {
        &self.start_amount
    }

    /// What the capital came back as.
    #[must_use]
    pub const fn end_amount(&self) -> &TokenAmount {
        &self.end_amount
    }

    /// Product of the probe-time edge ratios.
    #[must_use]
    pub const fn compounded_rate(&self) -> f64 {
        self.compounded_rate
    }

    /// Rate the simulated amounts actually produced.
    #[must_use]
    pub const fn real_rate(&self) -> f64 {
        self.real_rate
    }

    /// Sum of per-hop gas estimates.
    #[must_use]
    pub const fn gas_total(&self) -> u64 {
        self.gas_total
    }

    /// Signed profit on the internal grid, in the start token.
    #[must_use]
    pub fn profit_absolute(&self) -> I256 {
        I256::from_raw(self.end_amount.absolute())
            .saturating_sub(I256::from_raw(self.start_amount.absolute()))
    }

    /// Profit in whole start tokens.
    #[must_use]
    pub fn profit_tokens(&self) -> f64 {
        self.end_amount.to_f64() - self.start_amount.to_f64()
    }

    /// Profit as a percentage of the starting capital.
    #[must_use]
    pub fn profit_percent(&self) -> f64 {
        (self.real_rate - 1.0) * 100.0
    }

    /// Whether the loop came back with more than it started with.
    #[must_use]
    pub fn is_profitable(&self) -> bool {
        self.end_amount.absolute() > self.start_amount.absolute()
    }

    /// The closed path, `A > B > C > A` style.
    #[must_use]
    pub fn path(&self) -> String {
        let mut path = self.cycle.iter().join(" > ");
        if let Some(first) = self.cycle.first() {
            path.push_str(&format!(" > {first}"));
        }
        path
    }
}

/// Walks a cycle once with the given capital, quoting each hop live.
///
/// Each hop takes the lowest-weight edge between its endpoints, first
/// seen winning ties. The starting amount arrives as a bare value on the
/// internal grid; its decimals are taken from the final hop's result once
/// the loop closes, since both ends of the loop are the same token.
///
/// # Errors
///
/// Fails on a zero starting capital, on a hop with no edge in the graph
/// (the cycle came from this graph, so that is an internal inconsistency)
/// and on any venue quote failure.
pub async fn simulate(
    graph: &RateGraph,
    cycle: &[TokenId],
    start_absolute: U256,
) -> Result<CycleReport> {
    let Some(first) = cycle.first() else {
        bail!("Cannot simulate an empty cycle");
    };
    if start_absolute.is_zero() {
        bail!("Cannot simulate a zero starting amount");
    }

    let mut hops: Vec<(RateEdge, TokenAmount, u64)> = Vec::with_capacity(cycle.len());
    let mut compounded_rate = 1.0;
    let mut gas_total = 0u64;
    let mut current_absolute = start_absolute;

    for (cur, next) in cycle.iter().chain(std::iter::once(first)).tuple_windows() {
        let edge = best_edge(graph, cur, next)?;
        let quoted = edge.venue().quote(current_absolute, edge.direction()).await?;
        let gas = match edge
            .venue()
            .swap_gas(current_absolute, quoted.absolute(), edge.direction())
            .await
        {
            Ok(gas) => gas,
            Err(err) => {
                debug!("No gas estimate from {}: {err}", edge.venue().label());
                0
            }
        };
        compounded_rate *= edge.ratio();
        gas_total = gas_total.saturating_add(gas);
        current_absolute = quoted.absolute();
        hops.push((edge.clone(), quoted, gas));
    }

    // SAFETY: the cycle is non-empty, so at least one hop was recorded.
    #[allow(clippy::unwrap_used)]
    let end_amount = hops.last().map(|(_, to, _)| to.clone()).unwrap();

    // The start token's decimals are only knowable now: the loop ends in
    // the token it started from.
    let start_amount = TokenAmount::from_absolute(start_absolute, end_amount.decimals())?;
    let real_rate = end_amount.to_f64() / start_amount.to_f64();

    let mut from_amount = start_amount.clone();
    let steps = hops
        .into_iter()
        .map(|(edge, to_amount, gas)| {
            let step = StrategyStep {
                edge,
                from_amount: from_amount.clone(),
                to_amount: to_amount.clone(),
                gas,
            };
            from_amount = to_amount;
            step
        })
        .collect();

    Ok(CycleReport {
        cycle: cycle.to_vec(),
        steps,
        start_amount,
        end_amount,
        compounded_rate,
        real_rate,
        gas_total,
    })
}

/// Lowest-weight edge between two vertices, first seen winning ties.
fn best_edge<'graph>(
    graph: &'graph RateGraph,
    from: &TokenId,
    to: &TokenId,
) -> Result<&'graph RateEdge> {
    let mut best: Option<&RateEdge> = None;
    for edge in graph.edges_between(from, to) {
        match best {
            Some(current) if edge.weight() < current.weight() => best = Some(edge),
            None => best = Some(edge),
            Some(_) => {}
        }
    }
    best.ok_or_else(|| eyre!("No edge for cycle hop {from}>{to}"))
}
