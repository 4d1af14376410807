//! Search results and their presentation.

use std::fmt;

use serde_json::{json, Value};

use crate::arb::amount::TokenAmount;
use crate::arb::simulator::CycleReport;
use crate::arb::token::TokenId;

/// A profitable loop, simulated at one capital.
#[derive(Debug, Clone)]
pub struct FoundResult {
    /// The simulated strategy
    pub report: CycleReport,
    /// The probed capital in dollars
    pub capital_usd: f64,
    /// Simulated profit in dollars, negative when fees eat the edge
    pub profit_usd: f64,
}

/// A start token the sweep found no profitable loop for.
#[derive(Debug, Clone)]
pub struct NotFoundResult {
    /// Vertex the detection started from
    pub start_token: TokenId,
    /// The capital the sweep would have simulated with
    pub capital: TokenAmount,
    /// The probed capital in dollars
    pub capital_usd: f64,
}

/// One row of a search outcome.
#[derive(Debug, Clone)]
pub enum SearchResult {
    /// A cycle was detected and simulated
    Found(Box<FoundResult>),
    /// No cycle from this start token
    NotFound(NotFoundResult),
}

impl SearchResult {
    /// Whether this row carries a simulated strategy.
    #[must_use]
    pub const fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }

    /// Dollar profit used for ranking rows.
    ///
    /// A miss ranks at zero, so a simulated loop that loses money sorts
    /// below the tokens that simply had no loop.
    #[must_use]
    pub fn ranking_profit(&self) -> f64 {
        match self {
            Self::Found(found) => found.profit_usd,
            Self::NotFound(_) => 0.0,
        }
    }

    /// Machine-readable form of the row.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Found(found) => {
                let report = &found.report;
                let steps: Vec<Value> = report
                    .steps()
                    .iter()
                    .map(|step| {
                        json!({
                            "venue": step.edge().venue().label(),
                            "direction": step.edge().direction().to_string(),
                            "from": step.from_amount().to_string(),
                            "to": step.to_amount().to_string(),
                            "gas": step.gas(),
                        })
                    })
                    .collect();
                json!({
                    "status": "found",
                    "path": report.path(),
                    "start_token": report.cycle().first().map(ToString::to_string),
                    "capital": report.start_amount().to_string(),
                    "capital_usd": found.capital_usd,
                    "result": report.end_amount().to_string(),
                    "profit": report.profit_tokens(),
                    "profit_usd": found.profit_usd,
                    "profit_percent": report.profit_percent(),
                    "compounded_rate": report.compounded_rate(),
                    "real_rate": report.real_rate(),
                    "gas_total": report.gas_total(),
                    "steps": steps,
                })
            }
            Self::NotFound(miss) => json!({
                "status": "not_found",
                "start_token": miss.start_token.to_string(),
                "capital": miss.capital.to_string(),
                "capital_usd": miss.capital_usd,
            }),
        }
    }
}

impl fmt::Display for SearchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Found(found) => {
                let report = &found.report;
                let token = report
                    .cycle()
                    .first()
                    .map(ToString::to_string)
                    .unwrap_or_default();
                write!(
                    f,
                    "FOUND     {}: {} {token} -> {} {token} ({}, {:+.2}%, rate {:.6}, real {:.6})",
                    report.path(),
                    report.start_amount(),
                    report.end_amount(),
                    signed_usd(found.profit_usd),
                    report.profit_percent(),
                    report.compounded_rate(),
                    report.real_rate(),
                )?;
                for step in report.steps() {
                    let edge = step.edge();
                    write!(
                        f,
                        "\n          {} [{}]: {} {} -> {} {}",
                        edge.venue().label(),
                        edge.direction(),
                        step.from_amount(),
                        edge.from(),
                        step.to_amount(),
                        edge.to(),
                    )?;
                }
                Ok(())
            }
            Self::NotFound(miss) => write!(
                f,
                "NOT FOUND {}: probed {} {} ({})",
                miss.start_token,
                miss.capital,
                miss.start_token,
                usd(miss.capital_usd),
            ),
        }
    }
}

/// Dollar rendering, sign in front of the currency mark.
#[must_use]
pub fn usd(value: f64) -> String {
    if value < 0.0 {
        format!("-${:.2}", -value)
    } else {
        format!("${value:.2}")
    }
}

fn signed_usd(value: f64) -> String {
    if value >= 0.0 {
        format!("+{}", usd(value))
    } else {
        usd(value)
    }
}
