//! Compliance statistics over observation records.

pub mod aggregator;

pub use aggregator::*;
