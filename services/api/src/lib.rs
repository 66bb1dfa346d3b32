//! services/api/src/lib.rs
//!
//! The marketplace HTTP service: configuration, the persistence and storage
//! adapters behind the core ports, and the axum web layer.

pub mod adapters;
pub mod config;
pub mod error;
pub mod web;
