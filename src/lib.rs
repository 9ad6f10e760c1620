//! # Dashboard Relay
//!
//! 只读运营看板与内部指标服务之间的信任链中继：
//! 验证浏览器凭证，签发短期内部令牌，并行聚合上游指标，并由内部网关在指标服务前做准入。

pub mod aggregator;
pub mod app;
pub mod auth;
pub mod config;
pub mod database;
pub mod edge;
pub mod error;
pub mod gatekeeper;
pub mod health;
pub mod logging;
pub mod session;
pub mod utils;

pub use config::AppConfig;
pub use error::{RelayError, Result};
