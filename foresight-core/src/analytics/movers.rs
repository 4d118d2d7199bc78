//! Top gainers and losers by latest day-over-day change.

use serde::Serialize;

use crate::domain::{PriceSeries, Symbol};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Mover {
    pub symbol: Symbol,
    pub price: f64,
    pub change_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Movers {
    /// Largest gains first.
    pub gainers: Vec<Mover>,
    /// Largest losses first.
    pub losers: Vec<Mover>,
}

/// Rank instruments by the percent change of their last close over the one
/// before. Series with a single point are skipped.
pub fn top_movers(universe: &[(Symbol, PriceSeries)], count: usize) -> Movers {
    let mut moves: Vec<Mover> = universe
        .iter()
        .filter(|(_, s)| s.len() >= 2)
        .map(|(symbol, s)| {
            let closes = s.closes();
            let prev = closes[closes.len() - 2];
            let last = closes[closes.len() - 1];
            Mover {
                symbol: symbol.clone(),
                price: last,
                change_pct: (last - prev) / prev * 100.0,
            }
        })
        .collect();
    moves.sort_by(|a, b| b.change_pct.total_cmp(&a.change_pct));

    let gainers: Vec<Mover> = moves.iter().take(count).cloned().collect();
    let losers: Vec<Mover> = moves.iter().rev().take(count).cloned().collect();
    Movers { gainers, losers }
}
