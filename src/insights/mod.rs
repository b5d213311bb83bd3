//! Insights pipeline
//!
//! Normalization of the analysis series, the session lifecycle, and chart
//! projection.

pub mod chart;
pub mod normalizer;
pub mod session;

pub use chart::{project, segments, value_range, SeriesColor, SeriesSpec, PALETTE};
pub use normalizer::{normalize, NormalizedSeries};
pub use session::{InsightsSession, LoadOutcome, LoadTicket, SessionSnapshot, SessionState};
