//! Daily-return correlation between instruments, aligned on shared dates.

use serde::Serialize;

use crate::domain::{PriceSeries, Symbol};
use crate::stats::pearson;

/// Pearson correlation of simple returns over the dates both series share.
/// `None` with fewer than three shared dates or a zero-variance side.
pub fn return_correlation(a: &PriceSeries, b: &PriceSeries) -> Option<f64> {
    let (xa, xb) = aligned_closes(a, b);
    if xa.len() < 3 {
        return None;
    }
    let ra: Vec<f64> = xa.windows(2).map(|w| w[1] / w[0] - 1.0).collect();
    let rb: Vec<f64> = xb.windows(2).map(|w| w[1] / w[0] - 1.0).collect();
    pearson(&ra, &rb)
}

/// Closes of both series on the dates they have in common, in date order.
fn aligned_closes(a: &PriceSeries, b: &PriceSeries) -> (Vec<f64>, Vec<f64>) {
    let (da, ca) = (a.dates(), a.closes());
    let (db, cb) = (b.dates(), b.closes());
    let (mut i, mut j) = (0, 0);
    let mut xa = Vec::new();
    let mut xb = Vec::new();
    while i < da.len() && j < db.len() {
        match da[i].cmp(&db[j]) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                xa.push(ca[i]);
                xb.push(cb[j]);
                i += 1;
                j += 1;
            }
        }
    }
    (xa, xb)
}

/// Symmetric matrix of pairwise return correlations.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    pub symbols: Vec<Symbol>,
    /// `values[i][j]`; the diagonal is 1 and undefined pairs are `None`.
    pub values: Vec<Vec<Option<f64>>>,
}

impl CorrelationMatrix {
    /// `None` for fewer than two series.
    pub fn build(series: &[(Symbol, PriceSeries)]) -> Option<Self> {
        let n = series.len();
        if n < 2 {
            return None;
        }
        let mut values = vec![vec![None; n]; n];
        for i in 0..n {
            values[i][i] = Some(1.0);
            for j in (i + 1)..n {
                let c = return_correlation(&series[i].1, &series[j].1);
                values[i][j] = c;
                values[j][i] = c;
            }
        }
        Some(Self {
            symbols: series.iter().map(|(s, _)| s.clone()).collect(),
            values,
        })
    }

    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.symbols.iter().position(|s| s == a)?;
        let j = self.symbols.iter().position(|s| s == b)?;
        self.values[i][j]
    }
}
