//! A deterministic constant-product venue.
//!
//! Paper pools quote `x*y = k` swaps with a basis-point fee, entirely
//! in-process. They stand in for live exchange integrations in the demo
//! market and in tests, while still exercising the full adapter contract:
//! decimal bridging, the injected rate limiter, setup validation and gas
//! reporting.

use std::sync::Arc;

use alloy::primitives::U256;
use async_trait::async_trait;
use eyre::{bail, Result};
use log::debug;
use serde::{Deserialize, Serialize};

use super::{Direction, Exchange, ExchangeFactory};
use crate::arb::amount::TokenAmount;
use crate::arb::token::{Token, TokenId};
use crate::limiter::RateLimiter;

/// Flat gas figure every paper swap reports.
const SWAP_GAS: u64 = 90_000;

/// Declarative description of one paper pool, as found in a market file.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PaperPool {
    /// Venue label the pool trades under
    pub venue: String,
    /// Token key of the pair's X side
    pub x: String,
    /// Token key of the pair's Y side
    pub y: String,
    /// X-side reserve in the token's native units
    pub reserve_x: u128,
    /// Y-side reserve in the token's native units
    pub reserve_y: u128,
    /// Swap fee in basis points
    pub fee_bps: u32,
}

/// The pool set one [`PaperFactory`] serves.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PaperMarket {
    /// Pools quoted by the venue
    pub pools: Vec<PaperPool>,
}

impl PaperMarket {
    /// Parses a market file.
    ///
    /// # Errors
    ///
    /// Fails on malformed JSON.
    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}

/// One constant-product pool behind the [`Exchange`] contract.
pub struct PaperExchange {
    /// Venue label
    venue: String,
    /// The pair's X token record
    x: Token,
    /// The pair's Y token record
    y: Token,
    /// X-side reserve in native units
    reserve_x: U256,
    /// Y-side reserve in native units
    reserve_y: U256,
    /// Swap fee in basis points
    fee_bps: u32,
    /// Limiter every quote is scheduled through
    limiter: Arc<RateLimiter>,
}

impl PaperExchange {
    /// Builds a pool over two resolved universe tokens.
    #[must_use]
    pub fn new(
        venue: impl Into<String>,
        x: Token,
        y: Token,
        reserve_x: u128,
        reserve_y: u128,
        fee_bps: u32,
        limiter: Arc<RateLimiter>,
    ) -> Self {
        Self {
            venue: venue.into(),
            x,
            y,
            reserve_x: U256::from(reserve_x),
            reserve_y: U256::from(reserve_y),
            fee_bps,
            limiter,
        }
    }
}

#[async_trait]
impl Exchange for PaperExchange {
    fn x(&self) -> &TokenId {
        &self.x.id
    }

    fn y(&self) -> &TokenId {
        &self.y.id
    }

    fn label(&self) -> String {
        format!("{}({}/{})", self.venue, self.x.id, self.y.id)
    }

    async fn setup(&self) -> Result<()> {
        if self.x.id == self.y.id {
            bail!("Pool {} pairs a token with itself", self.label());
        }
        if self.fee_bps >= 10_000 {
            bail!("Pool {} fee {}bps eats the whole trade", self.label(), self.fee_bps);
        }
        if self.reserve_x.is_zero() || self.reserve_y.is_zero() {
            bail!("Pool {} has empty reserves", self.label());
        }
        Ok(())
    }

    async fn quote(&self, absolute_in: U256, direction: Direction) -> Result<TokenAmount> {
        let (token_in, token_out) = match direction {
            Direction::XToY => (&self.x, &self.y),
            Direction::YToX => (&self.y, &self.x),
        };
        let (reserve_in, reserve_out) = match direction {
            Direction::XToY => (self.reserve_x, self.reserve_y),
            Direction::YToX => (self.reserve_y, self.reserve_x),
        };
        let units_in = TokenAmount::from_absolute(absolute_in, token_in.decimals)?.units();
        let fee_bps = self.fee_bps;
        let out_decimals = token_out.decimals;
        self.limiter
            .schedule(async move {
                let units_out = amount_out(units_in, reserve_in, reserve_out, fee_bps)?;
                TokenAmount::from_units(units_out, out_decimals)
            })
            .await
    }

    async fn swap_gas(
        &self,
        _absolute_in: U256,
        _absolute_out: U256,
        _direction: Direction,
    ) -> Result<u64> {
        Ok(SWAP_GAS)
    }
}

/// Constant-product output: `in * (10000 - fee) * r_out` over
/// `r_in * 10000 + in * (10000 - fee)`, floored like the on-chain routers.
fn amount_out(units_in: U256, reserve_in: U256, reserve_out: U256, fee_bps: u32) -> Result<U256> {
    if reserve_in.is_zero() || reserve_out.is_zero() {
        bail!("Pool has empty reserves");
    }
    if fee_bps >= 10_000 {
        bail!("Fee {fee_bps}bps eats the whole trade");
    }
    let in_with_fee = units_in * U256::from(10_000 - fee_bps);
    let numerator = in_with_fee * reserve_out;
    let denominator = reserve_in * U256::from(10_000u32) + in_with_fee;
    Ok(numerator / denominator)
}

/// Builds [`PaperExchange`] adapters from a declared market.
pub struct PaperFactory {
    /// The declared pool set
    market: PaperMarket,
    /// Limiter injected into every adapter built
    limiter: Arc<RateLimiter>,
}

impl PaperFactory {
    /// Wraps a market and the limiter its pools will quote through.
    #[must_use]
    pub fn new(market: PaperMarket, limiter: Arc<RateLimiter>) -> Self {
        Self { market, limiter }
    }
}

#[async_trait]
impl ExchangeFactory for PaperFactory {
    fn name(&self) -> &str {
        "paper"
    }

    async fn discover(&self, tokens: &[Token]) -> Result<Vec<Arc<dyn Exchange>>> {
        let mut venues: Vec<Arc<dyn Exchange>> = Vec::with_capacity(self.market.pools.len());
        for pool in &self.market.pools {
            let x = tokens.iter().find(|t| t.id.as_str() == pool.x);
            let y = tokens.iter().find(|t| t.id.as_str() == pool.y);
            let (Some(x), Some(y)) = (x, y) else {
                debug!(
                    "Skipping pool {}: pair {}/{} not in the universe",
                    pool.venue, pool.x, pool.y
                );
                continue;
            };
            venues.push(Arc::new(PaperExchange::new(
                pool.venue.clone(),
                x.clone(),
                y.clone(),
                pool.reserve_x,
                pool.reserve_y,
                pool.fee_bps,
                Arc::clone(&self.limiter),
            )));
        }
        Ok(venues)
    }
}
