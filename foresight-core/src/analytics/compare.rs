//! Cross-company fundamental comparison.

use serde::Serialize;

use crate::domain::Symbol;
use crate::signals::{fundamental_signal, FundamentalRatios};

/// Which company leads on each headline ratio. A leader is `None` when no
/// company reports that ratio.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FundamentalComparison {
    pub companies: Vec<(Symbol, FundamentalRatios)>,
    pub highest_roe: Option<Symbol>,
    pub highest_margin: Option<Symbol>,
    pub lowest_debt: Option<Symbol>,
    /// Highest fundamental composite.
    pub strongest_overall: Option<Symbol>,
}

impl FundamentalComparison {
    /// `None` for fewer than two companies.
    pub fn build(companies: Vec<(Symbol, FundamentalRatios)>) -> Option<Self> {
        if companies.len() < 2 {
            return None;
        }
        let highest_roe = leader(&companies, |r| r.roe, Pick::Max);
        let highest_margin = leader(&companies, |r| r.profit_margin, Pick::Max);
        let lowest_debt = leader(&companies, |r| r.debt_to_equity, Pick::Min);
        let strongest_overall = leader(
            &companies,
            |r| {
                let s = fundamental_signal(r);
                s.available.then_some(s.value)
            },
            Pick::Max,
        );
        Some(Self {
            companies,
            highest_roe,
            highest_margin,
            lowest_debt,
            strongest_overall,
        })
    }
}

#[derive(Clone, Copy)]
enum Pick {
    Max,
    Min,
}

/// First company with the extreme value; ties go to the earlier entry.
fn leader<F>(companies: &[(Symbol, FundamentalRatios)], field: F, pick: Pick) -> Option<Symbol>
where
    F: Fn(&FundamentalRatios) -> Option<f64>,
{
    let mut best: Option<(&Symbol, f64)> = None;
    for (symbol, ratios) in companies {
        let Some(v) = field(ratios).filter(|v| v.is_finite()) else {
            continue;
        };
        let better = match (best, pick) {
            (None, _) => true,
            (Some((_, b)), Pick::Max) => v > b,
            (Some((_, b)), Pick::Min) => v < b,
        };
        if better {
            best = Some((symbol, v));
        }
    }
    best.map(|(s, _)| s.clone())
}
