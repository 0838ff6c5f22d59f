//! Shared records and wire bodies for the giveaway engine.
//!
//! The store, engine and HTTP crates all speak these types; row decoding
//! lives in `giveaway-db` so this crate stays free of storage concerns.

pub mod api;
pub mod models;
pub mod outcome;
