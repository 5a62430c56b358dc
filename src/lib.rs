//! # Guild Metrics
//!
//! Turns periodic guild/player roster snapshots into comparative growth
//! metrics, a bounded composite performance score and Main/Wing/None tier
//! recommendations.
//!
//! ## Architecture
//!
//! - **models**: Core data structures (snapshots, series, scores, results)
//! - **engine**: The batch analytics pipeline ([`engine::compute_dataset`])
//! - **config**: Configuration loading, game-balance constants

pub mod config;
pub mod engine;
pub mod models;

pub use models::*;
