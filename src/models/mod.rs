//! Core data models for the analytics engine.

mod dataset;
mod player;
mod score;
mod series;
mod snapshot;

pub use dataset::*;
pub use player::*;
pub use score::*;
pub use series::*;
pub use snapshot::*;
