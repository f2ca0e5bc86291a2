pub mod analysis;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod history;
pub mod league;
pub mod metrics;
pub mod milestone;
pub mod politeness;
pub mod roster;
pub mod scan;
pub mod sink;
pub mod state;
pub mod types;
