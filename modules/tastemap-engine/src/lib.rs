//! Restaurant aggregation & semantic similarity engine.
//!
//! Pipeline: grid partition → bounded-parallel cell search → place dedup →
//! review cleaning → profile aggregation → similarity scoring → heatmap
//! weight mapping. The scan binary drives discovery and persists the
//! intermediate stores; the API service loads them and answers queries.

pub mod grid;
pub mod dedup;
pub mod reviews;
pub mod profile;
pub mod scorer;
pub mod heatmap;
pub mod retry;
pub mod scan;
pub mod store;
