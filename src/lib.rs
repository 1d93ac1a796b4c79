//! trade-radar: subscription-driven stock alert engine
//!
//! This library provides the core components for:
//! - Subscription registry with per-symbol index
//! - Rule evaluation over quotes, news and subscription lifecycle
//! - Alert dispatch over a bounded channel with optional AI enrichment
//! - Periodic monitoring sweep and push-driven news handling
//! - Quote polling and WebSocket news ingest
//! - Alert capture to Parquet
//! - Structured logging and Prometheus metrics

pub mod analysis;
pub mod cli;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod ingest;
pub mod model;
pub mod registry;
pub mod rules;
pub mod store;
pub mod telemetry;
