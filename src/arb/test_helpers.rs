use std::sync::Arc;

use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use eyre::{bail, Result};

use super::amount::TokenAmount;
use super::graph::{RateEdge, RateGraph};
use super::token::{Token, TokenId};
use crate::exchange::{Direction, Exchange};

#[allow(dead_code)]
pub fn tid(id: &str) -> TokenId {
    TokenId::from(id)
}

#[allow(dead_code)]
pub fn token(id: &str, decimals: u8, usd_price: f64) -> Token {
    Token::new(id, Address::repeat_byte(id.as_bytes()[0]), decimals, usd_price)
}

#[allow(dead_code)]
pub fn amount(whole: u64, decimals: u8) -> TokenAmount {
    let units = U256::from(whole) * pow10(decimals);
    TokenAmount::from_units(units, decimals).unwrap()
}

#[allow(dead_code)]
pub fn edge(from: &Token, to: &Token, from_whole: u64, to_whole: u64) -> RateEdge {
    let venue = Arc::new(StubVenue::new(
        format!("stub({}/{})", from.id, to.id),
        from.clone(),
        to.clone(),
        u128::from(to_whole),
        u128::from(from_whole),
    ));
    observed(
        venue,
        Direction::XToY,
        amount(from_whole, from.decimals),
        amount(to_whole, to.decimals),
    )
}

#[allow(dead_code)]
pub fn observed(
    venue: Arc<StubVenue>,
    direction: Direction,
    from_amount: TokenAmount,
    to_amount: TokenAmount,
) -> RateEdge {
    RateEdge::observed(venue, direction, from_amount, to_amount).unwrap()
}

#[allow(dead_code)]
pub fn graph(edges: Vec<RateEdge>) -> RateGraph {
    let mut graph = RateGraph::new();
    for edge in edges {
        graph.add_edge(edge);
    }
    graph
}

/// In-memory venue with a fixed whole-token rate of `num / den`.
#[allow(dead_code)]
pub struct StubVenue {
    label: String,
    x: Token,
    y: Token,
    num: u128,
    den: u128,
    gas: u64,
    fail_setup: bool,
    fail_quotes: bool,
    fail_gas: bool,
}

#[allow(dead_code)]
impl StubVenue {
    pub fn new(label: impl Into<String>, x: Token, y: Token, num: u128, den: u128) -> Self {
        Self {
            label: label.into(),
            x,
            y,
            num,
            den,
            gas: 0,
            fail_setup: false,
            fail_quotes: false,
            fail_gas: false,
        }
    }

    pub fn failing_setup(mut self) -> Self {
        self.fail_setup = true;
        self
    }

    pub fn failing_quotes(mut self) -> Self {
        self.fail_quotes = true;
        self
    }

    pub fn failing_gas(mut self) -> Self {
        self.fail_gas = true;
        self
    }

    pub fn with_gas(mut self, gas: u64) -> Self {
        self.gas = gas;
        self
    }
}

#[async_trait]
impl Exchange for StubVenue {
    fn x(&self) -> &TokenId {
        &self.x.id
    }

    fn y(&self) -> &TokenId {
        &self.y.id
    }

    fn label(&self) -> String {
        self.label.clone()
    }

    async fn setup(&self) -> Result<()> {
        if self.fail_setup {
            bail!("Venue {} failed setup", self.label);
        }
        Ok(())
    }

    async fn quote(&self, absolute_in: U256, direction: Direction) -> Result<TokenAmount> {
        if self.fail_quotes {
            bail!("Venue {} is offline", self.label);
        }
        let (token_in, token_out) = match direction {
            Direction::XToY => (&self.x, &self.y),
            Direction::YToX => (&self.y, &self.x),
        };
        let (num, den) = match direction {
            Direction::XToY => (self.num, self.den),
            Direction::YToX => (self.den, self.num),
        };
        let units_in = TokenAmount::from_absolute(absolute_in, token_in.decimals)?.units();
        let units_out = units_in * U256::from(num) * pow10(token_out.decimals)
            / (U256::from(den) * pow10(token_in.decimals));
        TokenAmount::from_units(units_out, token_out.decimals)
    }

    async fn swap_gas(
        &self,
        _absolute_in: U256,
        _absolute_out: U256,
        _direction: Direction,
    ) -> Result<u64> {
        if self.fail_gas {
            bail!("Gas estimate unavailable from {}", self.label);
        }
        Ok(self.gas)
    }
}

fn pow10(decimals: u8) -> U256 {
    U256::from(10).pow(U256::from(u64::from(decimals)))
}
