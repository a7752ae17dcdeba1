//! Lease-based distributed lock
//!
//! This module provides:
//! - Lease state model
//! - Acquire/release of a single lease
//! - Background renewal while a lease is held

mod lease;
mod model;
mod renewer;

pub use lease::*;
pub use model::*;
