//! # Venue Adapters
//!
//! Every exchange integration sits behind one object-safe async contract:
//! given an amount and a direction through its token pair, an adapter answers
//! with the amount the venue would pay out. Venue families ship a factory
//! that discovers the tradable pairs and builds one adapter per pair, with
//! the shared rate limiter injected at construction.

use std::fmt::{self, Debug, Display};
use std::sync::Arc;

use alloy::primitives::U256;
use async_trait::async_trait;
use eyre::Result;

use crate::arb::amount::TokenAmount;
use crate::arb::token::{Token, TokenId};

/// Deterministic in-process constant-product venue
pub mod paper;

/// The direction of a quote through a venue's token pair.
#[derive(Clone, Copy, Eq, PartialEq, Hash)]
pub enum Direction {
    /// Swap the pair's X token into its Y token
    XToY,
    /// Swap the pair's Y token into its X token
    YToX,
}

impl Direction {
    /// The same pair traversed the other way.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::XToY => Self::YToX,
            Self::YToX => Self::XToY,
        }
    }
}

impl Debug for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::XToY => write!(f, "X>Y"),
            Self::YToX => write!(f, "Y>X"),
        }
    }
}

impl Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// A venue+pair adapter able to quote swaps between its two tokens.
///
/// One instance per tradable pair per venue; instances are immutable
/// snapshots of a pair and route every external call through the rate
/// limiter they were built with.
#[async_trait]
pub trait Exchange: Send + Sync {
    /// The pair's X token.
    fn x(&self) -> &TokenId;

    /// The pair's Y token.
    fn y(&self) -> &TokenId;

    /// Venue name plus pair, the way logs and result tables show it.
    fn label(&self) -> String;

    /// Validates the pair before first use.
    ///
    /// # Errors
    ///
    /// Fails when the pool or pair is invalid or unusable; the caller is
    /// expected to exclude the instance, not abort.
    async fn setup(&self) -> Result<()>;

    /// The amount received for `absolute_in` (at the internal precision)
    /// swapped along `direction`. A pure query; venue state never changes.
    ///
    /// # Errors
    ///
    /// Fails on invalid pool state or an amount the pair cannot represent.
    async fn quote(&self, absolute_in: U256, direction: Direction) -> Result<TokenAmount>;

    /// Best-effort gas estimate for one swap; callers treat failures as
    /// zero.
    ///
    /// # Errors
    ///
    /// Fails when the venue cannot estimate; never fatal to the pipeline.
    async fn swap_gas(
        &self,
        _absolute_in: U256,
        _absolute_out: U256,
        _direction: Direction,
    ) -> Result<u64> {
        Ok(0)
    }

    /// The token spent when swapping along `direction`.
    fn token_in(&self, direction: Direction) -> &TokenId {
        match direction {
            Direction::XToY => self.x(),
            Direction::YToX => self.y(),
        }
    }

    /// The token received when swapping along `direction`.
    fn token_out(&self, direction: Direction) -> &TokenId {
        match direction {
            Direction::XToY => self.y(),
            Direction::YToX => self.x(),
        }
    }
}

/// Discovers the adapter instances a venue family serves for a token
/// universe.
#[async_trait]
pub trait ExchangeFactory: Send + Sync {
    /// The venue family name used in labels and logs.
    fn name(&self) -> &str;

    /// Builds one adapter per pair the venue can serve out of `tokens`.
    ///
    /// # Errors
    ///
    /// Fails when the venue cannot enumerate its pairs at all; per-pair
    /// problems belong in `setup` instead.
    async fn discover(&self, tokens: &[Token]) -> Result<Vec<Arc<dyn Exchange>>>;
}

#[cfg(test)]
mod tests {
    use super::Direction;

    #[test]
    fn test_direction_opposite() {
        assert_eq!(Direction::XToY.opposite(), Direction::YToX);
        assert_eq!(Direction::YToX.opposite(), Direction::XToY);
    }

    #[test]
    fn test_direction_debug() {
        assert_eq!(format!("{:?}", Direction::XToY), "X>Y");
        assert_eq!(format!("{}", Direction::YToX), "Y>X");
    }
}
