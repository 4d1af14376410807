//! The rate multigraph one sweep searches over.
//!
//! Vertices are tokens, edges are observed venue rates. Parallel edges are
//! the norm: every venue quoting a pair contributes its own edge per
//! direction. Edge weights are negated log rates, so a cycle whose weights
//! sum below zero multiplies out above one.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use eyre::{bail, Result};

use crate::arb::amount::TokenAmount;
use crate::arb::token::TokenId;
use crate::exchange::{Direction, Exchange};

/// One observed conversion rate on one venue, in one direction.
///
/// Construction goes through [`RateEdge::observed`] so every edge in a
/// graph carries a finite weight derived from nonzero amounts.
#[derive(Clone)]
pub struct RateEdge {
    /// Token paid in
    from: TokenId,
    /// Token received
    to: TokenId,
    /// The probe amount the venue was quoted with
    from_amount: TokenAmount,
    /// The amount the venue quoted back
    to_amount: TokenAmount,
    /// Whole-token output per whole input token
    ratio: f64,
    /// Negated log of the ratio
    weight: f64,
    /// Venue the rate was observed on
    venue: Arc<dyn Exchange>,
    /// Direction of the quote on the venue's pair
    direction: Direction,
}

impl RateEdge {
    /// Records a quote as a weighted edge.
    ///
    /// # Errors
    ///
    /// Fails when either amount is zero. A zero input has no defined rate
    /// and a zero output would put an infinite weight in the graph.
    pub fn observed(
        venue: Arc<dyn Exchange>,
        direction: Direction,
        from_amount: TokenAmount,
        to_amount: TokenAmount,
    ) -> Result<Self> {
        if from_amount.absolute().is_zero() || to_amount.absolute().is_zero() {
            bail!(
                "Degenerate rate on {}: {} -> {}",
                venue.label(),
                from_amount,
                to_amount
            );
        }
        let ratio = to_amount.to_f64() / from_amount.to_f64();
        let weight = -ratio.ln();
        Ok(Self {
            from: venue.token_in(direction).clone(),
            to: venue.token_out(direction).clone(),
            from_amount,
            to_amount,
            ratio,
            weight,
            venue,
            direction,
        })
    }

    /// Token paid in.
    #[must_use]
    pub const fn from(&self) -> &TokenId {
        &self.from
    }

    /// Token received.
    #[must_use]
    pub const fn to(&self) -> &TokenId {
        &self.to
    }

    /// The probe amount behind this rate.
    #[must_use]
    pub const fn from_amount(&self) -> &TokenAmount {
        &self.from_amount
    }

    /// The quoted output behind this rate.
    #[must_use]
    pub const fn to_amount(&self) -> &TokenAmount {
        &self.to_amount
    }

    /// Whole-token output per whole input token.
    #[must_use]
    pub const fn ratio(&self) -> f64 {
        self.ratio
    }

    /// Negated log rate used for relaxation.
    #[must_use]
    pub const fn weight(&self) -> f64 {
        self.weight
    }

    /// Venue the rate was observed on.
    #[must_use]
    pub fn venue(&self) -> &Arc<dyn Exchange> {
        &self.venue
    }

    /// Direction of the quote on the venue's pair.
    #[must_use]
    pub const fn direction(&self) -> Direction {
        self.direction
    }
}

impl fmt::Debug for RateEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}[{}>{} @{:.6}]",
            self.venue.label(),
            self.from,
            self.to,
            self.ratio
        )
    }
}

/// Directed multigraph of observed rates.
///
/// Vertices keep insertion order, which makes relaxation sweeps and cycle
/// starts deterministic for a given build sequence.
#[derive(Debug, Default)]
pub struct RateGraph {
    /// Vertices in first-seen order
    order: Vec<TokenId>,
    /// Outgoing edges per vertex
    edges: HashMap<TokenId, Vec<RateEdge>>,
}

impl RateGraph {
    /// An empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an edge, creating its endpoints as needed.
    pub fn add_edge(&mut self, edge: RateEdge) {
        self.ensure_vertex(&edge.from);
        self.ensure_vertex(&edge.to);
        self.edges.entry(edge.from.clone()).or_default().push(edge);
    }

    fn ensure_vertex(&mut self, id: &TokenId) {
        if !self.edges.contains_key(id) {
            self.order.push(id.clone());
            self.edges.insert(id.clone(), Vec::new());
        }
    }

    /// Vertices in first-seen order.
    #[must_use]
    pub fn vertices(&self) -> &[TokenId] {
        &self.order
    }

    /// Number of vertices.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.order.len()
    }

    /// Number of edges across all vertices.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.values().map(Vec::len).sum()
    }

    /// Whether a token is a vertex of this graph.
    #[must_use]
    pub fn contains(&self, id: &TokenId) -> bool {
        self.edges.contains_key(id)
    }

    /// Outgoing edges of a vertex.
    ///
    /// # Errors
    ///
    /// Fails when the vertex is not part of the graph.
    pub fn edges_from(&self, id: &TokenId) -> Result<&[RateEdge]> {
        match self.edges.get(id) {
            Some(edges) => Ok(edges),
            None => bail!("Unknown vertex {id}"),
        }
    }

    /// All parallel edges from one vertex to another.
    #[must_use]
    pub fn edges_between(&self, from: &TokenId, to: &TokenId) -> Vec<&RateEdge> {
        self.edges
            .get(from)
            .map(|edges| edges.iter().filter(|e| e.to() == to).collect())
            .unwrap_or_default()
    }
}
