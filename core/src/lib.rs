//! Collections performance report engine.
//!
//! Builds one specialist's performance report from five independently
//! fetched slices, substituting deterministic sample data for any slice
//! whose source fails. See `assembler` for the assembly order.

pub mod analysis;
pub mod assembler;
pub mod bucket;
pub mod clock;
pub mod communication;
pub mod config;
pub mod error;
pub mod event;
pub mod fallback;
pub mod filter;
pub mod guard;
pub mod kpi;
pub mod model;
pub mod promise;
pub mod rates;
pub mod report;
pub mod rng;
pub mod source;
pub mod store;
pub mod trend;
pub mod types;
