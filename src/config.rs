//! Run configuration from the environment.
//!
//! Everything has a default: with no variables set, a run searches the
//! built-in demo market over the default token universe. Variables use
//! the `EDDY_` prefix; `EDDY_TOKENS` and `EDDY_MARKET` point at JSON
//! files, the rest are inline values.

use std::env;
use std::fs;
use std::str::FromStr;

use alloy::primitives::{address, Address};
use eyre::{bail, eyre, Result, WrapErr};
use serde::{Deserialize, Serialize};

use crate::arb::token::Token;
use crate::exchange::paper::{PaperMarket, PaperPool};

/// Venue calls allowed per one-second window when unconfigured.
const DEFAULT_MAX_CALLS: usize = 50;
/// Capitals probed when unconfigured, in dollars.
const DEFAULT_CAPITALS: &str = "100,1000,10000";
/// Pause between watch rounds when unconfigured.
const DEFAULT_WATCH_PERIOD_SECS: u64 = 3600;

/// Everything one run needs.
#[derive(Debug, Clone)]
pub struct Config {
    /// Token universe with decimals and dollar prices
    pub tokens: Vec<Token>,
    /// Capitals to sweep, in dollars
    pub capitals: Vec<f64>,
    /// Venue calls per one-second window, `None` for unbounded
    pub max_calls_per_window: Option<usize>,
    /// Pause between watch rounds
    pub watch_period_secs: u64,
    /// The market the paper venue factory serves
    pub market: PaperMarket,
}

impl Config {
    /// Reads the configuration from the environment.
    ///
    /// # Errors
    ///
    /// Fails on unparseable values and on unreadable or malformed token
    /// or market files.
    pub fn from_env() -> Result<Self> {
        let max_calls = match env::var("EDDY_MAX_CALLS") {
            Ok(raw) => raw
                .parse::<usize>()
                .map_err(|err| eyre!("Invalid EDDY_MAX_CALLS {raw}: {err}"))?,
            Err(_) => DEFAULT_MAX_CALLS,
        };

        let capitals = match env::var("EDDY_CAPITALS_USD") {
            Ok(raw) => parse_capitals(&raw)?,
            Err(_) => parse_capitals(DEFAULT_CAPITALS)?,
        };

        let watch_period_secs = match env::var("EDDY_WATCH_PERIOD_SECS") {
            Ok(raw) => raw
                .parse::<u64>()
                .map_err(|err| eyre!("Invalid EDDY_WATCH_PERIOD_SECS {raw}: {err}"))?,
            Err(_) => DEFAULT_WATCH_PERIOD_SECS,
        };

        let tokens = match env::var("EDDY_TOKENS") {
            Ok(path) => {
                let raw = fs::read_to_string(&path)
                    .wrap_err_with(|| format!("Cannot read token file {path}"))?;
                parse_tokens(&raw)?
            }
            Err(_) => default_universe(),
        };

        let market = match env::var("EDDY_MARKET") {
            Ok(path) => {
                let raw = fs::read_to_string(&path)
                    .wrap_err_with(|| format!("Cannot read market file {path}"))?;
                PaperMarket::from_json(&raw)?
            }
            Err(_) => demo_market(),
        };

        Ok(Self {
            tokens,
            capitals,
            max_calls_per_window: (max_calls > 0).then_some(max_calls),
            watch_period_secs,
            market,
        })
    }
}

/// One token as it appears in a token file.
#[derive(Debug, Serialize, Deserialize)]
struct TokenRow {
    /// Token key
    id: String,
    /// Contract address, `0x`-prefixed hex
    address: String,
    /// Native decimal count
    decimals: u8,
    /// Dollar price used for probes and ranking
    usd_price: f64,
}

fn parse_tokens(raw: &str) -> Result<Vec<Token>> {
    let rows: Vec<TokenRow> = serde_json::from_str(raw)?;
    if rows.is_empty() {
        bail!("Token file declares no tokens");
    }
    rows.into_iter()
        .map(|row| {
            let address = Address::from_str(&row.address)
                .map_err(|err| eyre!("Invalid address {} for {}: {err}", row.address, row.id))?;
            Ok(Token::new(row.id, address, row.decimals, row.usd_price))
        })
        .collect()
}

fn parse_capitals(raw: &str) -> Result<Vec<f64>> {
    let capitals = raw
        .split(',')
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .map(|piece| {
            let capital: f64 = piece
                .parse()
                .map_err(|err| eyre!("Invalid capital {piece}: {err}"))?;
            if !capital.is_finite() || capital <= 0.0 {
                bail!("Invalid capital {piece}: must be a positive amount");
            }
            Ok(capital)
        })
        .collect::<Result<Vec<f64>>>()?;
    if capitals.is_empty() {
        bail!("No capitals configured");
    }
    Ok(capitals)
}

/// The default token universe: mainnet majors with pinned prices.
#[must_use]
pub fn default_universe() -> Vec<Token> {
    vec![
        Token::new(
            "WETH",
            address!("0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2"),
            18,
            2000.0,
        ),
        Token::new(
            "USDC",
            address!("0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48"),
            6,
            1.0,
        ),
        Token::new(
            "DAI",
            address!("0x6B175474E89094C44Da98b954EedeAC495271d0F"),
            18,
            1.0,
        ),
        Token::new(
            "USDT",
            address!("0xdAC17F958D2ee523a2206206994597C13D831ec7"),
            6,
            1.0,
        ),
    ]
}

/// The built-in demo market.
///
/// The gamma pool prices WETH at 1900 DAI while alpha sells it for 2000
/// USDC, leaving a loop that survives three 30bps fees. USDT trades on a
/// single pool, so it can never close a loop.
#[must_use]
pub fn demo_market() -> PaperMarket {
    let pool = |venue: &str, x: &str, y: &str, reserve_x: u128, reserve_y: u128| PaperPool {
        venue: venue.to_string(),
        x: x.to_string(),
        y: y.to_string(),
        reserve_x,
        reserve_y,
        fee_bps: 30,
    };
    PaperMarket {
        pools: vec![
            pool(
                "alpha",
                "WETH",
                "USDC",
                1_000_000_000_000_000_000_000,
                2_000_000_000_000,
            ),
            pool(
                "beta",
                "USDC",
                "DAI",
                5_000_000_000_000,
                5_000_000_000_000_000_000_000_000,
            ),
            pool(
                "gamma",
                "DAI",
                "WETH",
                1_900_000_000_000_000_000_000_000,
                1_000_000_000_000_000_000_000,
            ),
            pool(
                "delta",
                "WETH",
                "USDT",
                500_000_000_000_000_000_000,
                995_000_000_000,
            ),
        ],
    }
}
