//! Duskrooms simulation core.
//!
//! `domain` holds pure rules with no side effects, `sim` owns the world state
//! and the per-tick step, `config` loads `config.toml`. The terminal frontend
//! lives in the binary.

pub mod config;
pub mod domain;
pub mod sim;
