//! Storm threat monitor: turns forecast cones and NWS alerts into a five-step
//! alert level and decides when to notify about it.

pub mod aggregator;
pub mod config;
pub mod cycle;
pub mod geometry;
pub mod ingest;
pub mod levels;
pub mod logging;
pub mod model;
pub mod notify;
pub mod resolver;
pub mod state;
