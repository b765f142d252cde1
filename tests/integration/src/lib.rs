//! Integration test utilities for the event bus
//!
//! This crate provides helpers for running scenarios across several buses
//! connected by a relay, in one process or through Redis.

pub mod fixtures;
pub mod helpers;

pub use fixtures::*;
pub use helpers::*;
