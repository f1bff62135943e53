//! Core data types, date helpers, and summary statistics for Skyloom
//!
//! Every provider translates its upstream payload into the canonical
//! [`WeatherDataPoint`] shape defined here, and every summary is reduced
//! from a series of those points.

pub mod dates;
pub mod summary;
pub mod types;

pub use dates::*;
pub use summary::*;
pub use types::*;
