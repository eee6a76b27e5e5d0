//! Core library for playlist-snapshot-collector
pub mod api;
pub mod collect;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod logging;
pub mod models;
pub mod reconcile;
pub mod store;
