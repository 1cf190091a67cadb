//! # Tally Collector
//!
//! Election snapshot collection pipeline: a fetch loop that discovers and
//! retrieves publisher snapshot documents, a parser turning each document
//! into typed facts, an ingestor normalizing those facts into the canonical
//! store, a minute aggregator maintaining the per-minute time series, and a
//! trend predictor on top of it.

pub mod aggregate;
pub mod collector;
pub mod db;
pub mod fetch;
pub mod ingest;
pub mod parser;
pub mod predict;
