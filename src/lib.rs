// src/lib.rs
pub mod config;
pub mod downstream;
pub mod metrics;
pub mod server;
pub mod telemetry;
