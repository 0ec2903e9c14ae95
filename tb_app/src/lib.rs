//! # tb_app
//!
//! Shared utilities for token bucket applications

pub mod cli;
pub mod config_loader;
pub mod shutdown_handler;
pub mod tracing_setup;
