//! Control plane of a capture worker.
//!
//! - [`status`]: component states, aggregation and one-shot watchers
//! - [`session`]: capture jobs (web recording) over an automation backend
//! - [`webhooks`]: status fan-out to HTTP subscribers

pub mod app;
pub mod cli;
pub mod config;
pub mod global;
pub mod session;
pub mod status;
pub mod webhooks;
