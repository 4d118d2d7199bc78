//! Domain types for foresight

pub mod price;
pub mod recommendation;
pub mod signal;

pub use price::{PricePoint, PriceSeries, SeriesError};
pub use recommendation::{Action, Recommendation, ScoreBreakdown};
pub use signal::{Signal, SignalSource};

/// Symbol type alias
pub type Symbol = String;
