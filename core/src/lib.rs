//! FAIR risk quantification engine.
//!
//! Leaf-first:
//!   distribution → simulation → calculation → aggregation
//!   efficacy     ↗
//!
//! `engine::RiskEngine` is the entry point for callers; the lower modules
//! are public for direct use and testing.

pub mod aggregation;
pub mod calculation;
pub mod config;
pub mod distribution;
pub mod efficacy;
pub mod engine;
pub mod error;
pub mod params;
pub mod rng;
pub mod simulation;
pub mod snapshot;
pub mod types;
