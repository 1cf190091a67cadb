//! Canonical-store access for the collector
//!
//! Write paths take an explicit connection so callers control transaction
//! boundaries (one transaction per snapshot, one per aggregated minute);
//! read paths take the pool.

pub mod candidates;
pub mod entities;
pub mod queries;
pub mod raw;
pub mod results;
