//! Token identity and the per-token configuration record a run is built on.

use std::fmt::{self, Debug};

use alloy::primitives::Address;
use derive_more::Display;

/// An opaque token key, unique within one configured universe.
///
/// The graph, the detector and the result records all key on this. Nothing in
/// the pipeline interprets the contents; ordering and rendering are the
/// string's own.
#[derive(Clone, Display, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct TokenId(String);

impl TokenId {
    /// Wraps a raw key.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw key.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TokenId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for TokenId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl Debug for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One entry of the configured token universe, immutable for a run.
#[derive(Clone, Debug)]
pub struct Token {
    /// Key the rate graph is built over
    pub id: TokenId,
    /// On-chain contract address of the token
    pub address: Address,
    /// Decimal count of the token's native amount convention
    pub decimals: u8,
    /// Dollar price, used only for probe normalization and result ranking
    pub usd_price: f64,
}

impl Token {
    /// Builds a universe entry.
    pub fn new(id: impl Into<TokenId>, address: Address, decimals: u8, usd_price: f64) -> Self {
        Self {
            id: id.into(),
            address,
            decimals,
            usd_price,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_id_display_and_order() {
        let ids = [TokenId::from("WETH"), TokenId::from("DAI")];
        assert_eq!(ids[0].to_string(), "WETH");
        assert_eq!(format!("{:?}", ids[1]), "DAI");
        assert!(ids[1] < ids[0]);
    }

    #[test]
    fn test_token_record() {
        let token = Token::new("USDC", Address::repeat_byte(3), 6, 1.0);
        assert_eq!(token.id, TokenId::from("USDC"));
        assert_eq!(token.decimals, 6);
    }
}
