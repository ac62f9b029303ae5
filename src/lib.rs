//! Filter line-oriented key/value records with a small boolean query language.

pub mod app;
pub mod config;
pub mod dsl;
pub mod mapping;
pub mod pipeline;
pub mod record;
pub mod sinks;
