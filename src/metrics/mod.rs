//! nginx status collection and metric derivation.
//!
//! This module fetches the stub_status page, parses it into a
//! [`RawReading`] and turns successive readings into [`MetricSnapshot`]s.

pub mod collector;
pub mod data;
pub mod deriver;
pub mod parser;
pub mod traits;

// Re-export commonly used items
pub use collector::HttpStatusSource;
pub use data::{MetricSnapshot, RawReading};
pub use deriver::{DerivationState, MetricDeriver};
pub use parser::parse_status;
pub use traits::StatusSource;
