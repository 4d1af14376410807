//! The search orchestrator.
//!
//! One sweep probes every venue pair at a dollar capital, assembles the
//! rate graph, runs detection from every vertex and simulates each
//! distinct cycle found. A search fans sweeps out over all configured
//! capitals and ranks the rows by simulated dollar profit.

use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use std::sync::Arc;

use alloy::primitives::U256;
use bigdecimal::{BigDecimal, FromPrimitive, RoundingMode};
use eyre::{bail, eyre, Result};
use futures::future::join_all;
use itertools::Itertools;
use log::{debug, info, warn};

use crate::arb::amount::{TokenAmount, PRECISION};
use crate::arb::detector::{find_negative_cycle, Detection};
use crate::arb::graph::{RateEdge, RateGraph};
use crate::arb::simulator::simulate;
use crate::arb::token::{Token, TokenId};
use crate::arb::types::{usd, FoundResult, NotFoundResult, SearchResult};
use crate::exchange::{Direction, Exchange, ExchangeFactory};

/// Venue set and token universe a search runs over.
pub struct Searcher {
    /// Venues that passed setup
    venues: Vec<Arc<dyn Exchange>>,
    /// Token universe with decimals and dollar prices
    tokens: Vec<Token>,
}

impl Searcher {
    /// Wraps an already prepared venue set.
    #[must_use]
    pub fn new(venues: Vec<Arc<dyn Exchange>>, tokens: Vec<Token>) -> Self {
        Self { venues, tokens }
    }

    /// Discovers venues from every factory and runs their setups.
    ///
    /// Setups run concurrently. A venue that fails its setup is dropped
    /// with a warning; the search continues over the rest.
    ///
    /// # Errors
    ///
    /// Fails when a factory cannot enumerate its venues at all.
    pub async fn from_factories(
        factories: &[Box<dyn ExchangeFactory>],
        tokens: Vec<Token>,
    ) -> Result<Self> {
        let mut venues: Vec<Arc<dyn Exchange>> = Vec::new();
        for factory in factories {
            let discovered = factory.discover(&tokens).await?;
            info!("Factory {} offered {} venues", factory.name(), discovered.len());
            venues.extend(discovered);
        }

        let setups = join_all(venues.iter().map(|venue| venue.setup())).await;
        let venues = venues
            .into_iter()
            .zip(setups)
            .filter_map(|(venue, outcome)| match outcome {
                Ok(()) => Some(venue),
                Err(err) => {
                    warn!("Dropping venue {}: {err}", venue.label());
                    None
                }
            })
            .collect();
        Ok(Self::new(venues, tokens))
    }

    /// Venues participating in sweeps.
    #[must_use]
    pub fn venues(&self) -> &[Arc<dyn Exchange>] {
        &self.venues
    }

    /// The token universe.
    #[must_use]
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Runs one sweep per capital and ranks all rows by dollar profit.
    ///
    /// Sweeps run concurrently; venue schedulers decide the actual call
    /// pacing. Rows that lose money rank below the tokens that had no
    /// loop at all.
    ///
    /// # Errors
    ///
    /// Fails when any sweep fails.
    pub async fn search(&self, capitals_usd: &[f64]) -> Result<Vec<SearchResult>> {
        let sweeps = join_all(capitals_usd.iter().map(|capital| self.sweep(*capital))).await;
        let mut results = Vec::new();
        for outcome in sweeps {
            results.extend(outcome?);
        }
        results.sort_by(|a, b| {
            b.ranking_profit()
                .partial_cmp(&a.ranking_profit())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Ok(results)
    }

    /// Probes every venue at one capital, then detects and simulates.
    ///
    /// Each distinct cycle contributes one row regardless of how many
    /// start vertices rediscover it. Start vertices with no cycle
    /// contribute a miss row.
    ///
    /// # Errors
    ///
    /// Fails on detection errors and on simulation failures. Probe and
    /// quote failures are not errors here: they exclude the affected
    /// token or venue from the graph with a warning.
    pub async fn sweep(&self, capital_usd: f64) -> Result<Vec<SearchResult>> {
        let mut probes: HashMap<TokenId, TokenAmount> = HashMap::new();
        for token in &self.tokens {
            match probe_for(token, capital_usd) {
                Ok(probe) => {
                    probes.insert(token.id.clone(), probe);
                }
                Err(err) => warn!("Skipping {} at {}: {err}", token.id, usd(capital_usd)),
            }
        }

        let edges = self.collect_edges(&probes).await;
        let mut graph = RateGraph::new();
        for edge in edges {
            graph.add_edge(edge);
        }
        info!(
            "Sweep at {}: {} vertices, {} edges",
            usd(capital_usd),
            graph.vertex_count(),
            graph.edge_count()
        );

        let mut results = Vec::new();
        let mut seen = HashSet::new();
        for vertex in graph.vertices() {
            match find_negative_cycle(&graph, vertex)? {
                Detection::NoCycle { .. } => {
                    if let Some(capital) = probes.get(vertex) {
                        results.push(SearchResult::NotFound(NotFoundResult {
                            start_token: vertex.clone(),
                            capital: capital.clone(),
                            capital_usd,
                        }));
                    }
                }
                Detection::CycleFound { cycle } => {
                    if !seen.insert(cycle.iter().sorted().join(",")) {
                        continue;
                    }
                    debug!("Cycle from {vertex}: {}", cycle.iter().join(" > "));
                    let Some(start) = cycle.first() else {
                        continue;
                    };
                    let Some(start_token) = self.tokens.iter().find(|t| &t.id == start) else {
                        warn!("Cycle starts at {start}, which is outside the universe");
                        continue;
                    };
                    let Some(probe) = probes.get(start) else {
                        warn!("Cycle starts at {start}, which had no probe at this capital");
                        continue;
                    };
                    let report = simulate(&graph, &cycle, probe.absolute()).await?;
                    let profit_usd = report.profit_tokens() * start_token.usd_price;
                    results.push(SearchResult::Found(Box::new(FoundResult {
                        report,
                        capital_usd,
                        profit_usd,
                    })));
                }
            }
        }
        Ok(results)
    }

    /// Quotes every venue whose pair is fully probed, in both directions.
    ///
    /// Venues are queried concurrently; a failure on either direction
    /// excludes that venue's edges from this sweep.
    async fn collect_edges(&self, probes: &HashMap<TokenId, TokenAmount>) -> Vec<RateEdge> {
        let mut labels = Vec::new();
        let mut futures = Vec::new();
        for venue in &self.venues {
            let (Some(probe_x), Some(probe_y)) = (probes.get(venue.x()), probes.get(venue.y()))
            else {
                debug!("Venue {} has an unprobed side, skipping", venue.label());
                continue;
            };
            labels.push(venue.label());
            futures.push(venue_edges(
                Arc::clone(venue),
                probe_x.clone(),
                probe_y.clone(),
            ));
        }

        let mut edges = Vec::new();
        for (label, outcome) in labels.into_iter().zip(join_all(futures).await) {
            match outcome {
                Ok(mut pair) => edges.append(&mut pair),
                Err(err) => warn!("Excluding venue {label}: {err}"),
            }
        }
        edges
    }
}

/// Quotes one venue in both directions and records the edges.
async fn venue_edges(
    venue: Arc<dyn Exchange>,
    probe_x: TokenAmount,
    probe_y: TokenAmount,
) -> Result<Vec<RateEdge>> {
    let quoted_y = venue.quote(probe_x.absolute(), Direction::XToY).await?;
    let forward = RateEdge::observed(Arc::clone(&venue), Direction::XToY, probe_x, quoted_y)?;
    let quoted_x = venue.quote(probe_y.absolute(), Direction::YToX).await?;
    let backward = RateEdge::observed(venue, Direction::YToX, probe_y, quoted_x)?;
    Ok(vec![forward, backward])
}

/// Converts a dollar capital into a probe amount of one token.
///
/// The division runs in arbitrary precision and the result is snapped
/// down onto the token's own decimal grid, so the probe is always
/// representable by the venue.
///
/// # Errors
///
/// Fails on non-positive capitals or prices, on tokens finer than the
/// internal grid, and when the capital buys less than one grid step.
fn probe_for(token: &Token, capital_usd: f64) -> Result<TokenAmount> {
    if capital_usd <= 0.0 {
        bail!("Capital must be positive");
    }
    if token.usd_price <= 0.0 {
        bail!("Token {} has no dollar price", token.id);
    }
    if token.decimals > PRECISION {
        bail!(
            "Token decimals {} exceed the internal precision {PRECISION}",
            token.decimals
        );
    }

    let capital = BigDecimal::from_f64(capital_usd)
        .ok_or_else(|| eyre!("Capital {capital_usd} is not a number"))?;
    let price = BigDecimal::from_f64(token.usd_price)
        .ok_or_else(|| eyre!("Price {} is not a number", token.usd_price))?;
    let absolute = (capital / price * BigDecimal::from(10u64.pow(u32::from(PRECISION))))
        .with_scale_round(0, RoundingMode::Down);
    let raw = U256::from_str(&absolute.to_string())?;

    let step = U256::from(10).pow(U256::from(u64::from(PRECISION - token.decimals)));
    let snapped = raw - raw % step;
    if snapped.is_zero() {
        bail!(
            "Capital {} buys less than one grid step of {}",
            usd(capital_usd),
            token.id
        );
    }
    TokenAmount::from_absolute(snapped, token.decimals)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::arb::test_helpers::*;

    #[test]
    fn test_probe_lands_on_the_token_grid() {
        for (decimals, usd_price, capital, expected) in &[
            // decimals, price, capital, probe
            (6u8, 1.0, 100.0, "100"),
            (18, 2000.0, 100.0, "0.05"),
            (18, 3.0, 100.0, "33.333333333333333333"),
            (6, 3.0, 100.0, "33.333333"),
            (0, 3.0, 100.0, "33"),
        ] {
            let token = token("X", *decimals, *usd_price);
            let probe = probe_for(&token, *capital).unwrap();
            assert_eq!(probe.to_string(), *expected);
            assert_eq!(probe.decimals(), *decimals);
        }
    }

    #[test]
    fn test_probe_rejects_degenerate_inputs() {
        for (decimals, usd_price, capital, expected) in &[
            (18u8, 1.0, 0.0, "Capital must be positive"),
            (18, 1.0, -5.0, "Capital must be positive"),
            (18, 0.0, 100.0, "Token X has no dollar price"),
            (0, 1.0, 0.5, "Capital $0.50 buys less than one grid step of X"),
        ] {
            let token = token("X", *decimals, *usd_price);
            let err = probe_for(&token, *capital).err().unwrap();
            assert_eq!(err.to_string(), *expected);
        }
    }

    fn universe() -> Vec<Token> {
        ["A", "B", "C", "E", "F"]
            .into_iter()
            .map(|id| token(id, 18, 1.0))
            .collect()
    }

    // A>B doubles while every other rate is flat, so the one profitable
    // loop is {A, B, C}. E and F only trade with each other at par.
    fn flat_venues() -> Vec<Arc<dyn Exchange>> {
        let tokens = universe();
        let (a, b, c, e, f) = (
            tokens[0].clone(),
            tokens[1].clone(),
            tokens[2].clone(),
            tokens[3].clone(),
            tokens[4].clone(),
        );
        vec![
            Arc::new(StubVenue::new("v1", a.clone(), b.clone(), 2, 1)),
            Arc::new(StubVenue::new("v2", b, c.clone(), 1, 1)),
            Arc::new(StubVenue::new("v3", c, a, 1, 1)),
            Arc::new(StubVenue::new("v4", e, f, 1, 1)),
        ]
    }

    #[tokio::test]
    async fn test_sweep_finds_the_loop_once() {
        let searcher = Searcher::new(flat_venues(), universe());
        let results = searcher.sweep(100.0).await.unwrap();

        assert_eq!(results.len(), 3);
        let SearchResult::Found(found) = &results[0] else {
            panic!("Expected the loop first");
        };
        assert_eq!(found.report.path(), "C > A > B > C");
        assert_eq!(found.report.real_rate(), 2.0);
        assert_eq!(found.profit_usd, 100.0);
        assert_eq!(found.capital_usd, 100.0);

        // The loop was rediscovered from B and C too, but reported once.
        // The disconnected pair at par reports two misses.
        assert_eq!(results[1].to_string(), "NOT FOUND E: probed 100 E ($100.00)");
        assert_eq!(results[2].to_string(), "NOT FOUND F: probed 100 F ($100.00)");
    }

    #[tokio::test]
    async fn test_sweep_survives_failing_and_degenerate_venues() {
        let tokens = universe();
        let (a, b) = (tokens[0].clone(), tokens[1].clone());
        let mut venues: Vec<Arc<dyn Exchange>> = vec![
            // A better rate that never answers, and a dead quote.
            Arc::new(StubVenue::new("down", a.clone(), b.clone(), 3, 1).failing_quotes()),
            Arc::new(StubVenue::new("dead", a, b, 0, 1)),
        ];
        venues.extend(flat_venues());
        let searcher = Searcher::new(venues, universe());
        let results = searcher.sweep(100.0).await.unwrap();

        let SearchResult::Found(found) = &results[0] else {
            panic!("Expected the loop first");
        };
        // The x3 venue is down, so the surviving x2 edge sets the profit.
        assert_eq!(found.profit_usd, 100.0);
        assert_eq!(results.len(), 3);
    }

    #[tokio::test]
    async fn test_search_ranks_rows_across_capitals() {
        let searcher = Searcher::new(flat_venues(), universe());
        let results = searcher.search(&[100.0, 10_000.0]).await.unwrap();

        assert_eq!(results.len(), 6);
        assert_eq!(results[0].ranking_profit(), 10_000.0);
        assert_eq!(results[1].ranking_profit(), 100.0);
        assert!(results[2..].iter().all(|row| !row.is_found()));
    }

    struct ListFactory {
        venues: Vec<Arc<dyn Exchange>>,
    }

    #[async_trait]
    impl ExchangeFactory for ListFactory {
        fn name(&self) -> &str {
            "list"
        }

        async fn discover(&self, _tokens: &[Token]) -> Result<Vec<Arc<dyn Exchange>>> {
            Ok(self.venues.clone())
        }
    }

    #[tokio::test]
    async fn test_from_factories_drops_venues_that_fail_setup() {
        let tokens = universe();
        let (a, b, c) = (tokens[0].clone(), tokens[1].clone(), tokens[2].clone());
        let factory = ListFactory {
            venues: vec![
                Arc::new(StubVenue::new("ok", a.clone(), b.clone(), 2, 1)),
                Arc::new(StubVenue::new("broken", b, c, 2, 1).failing_setup()),
            ],
        };
        let searcher = Searcher::from_factories(&[Box::new(factory)], tokens)
            .await
            .unwrap();
        assert_eq!(searcher.venues().len(), 1);
        assert_eq!(searcher.venues()[0].label(), "ok");
    }
}
