//! services/api/src/lib.rs
//!
//! The library half of the `api` service: adapters, configuration, errors and
//! the web layer. The binaries in `src/bin` wire these together.

pub mod adapters;
pub mod config;
pub mod error;
pub mod web;
