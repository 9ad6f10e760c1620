//! # 内部网关模块
//!
//! 运行在指标服务所在主机上的准入代理：只放行带有有效内部令牌的请求，
//! 并把令牌中的用户归属改写为请求头交给指标服务。

pub mod decision;
pub mod rules;
pub mod service;

pub use decision::{Decision, DenyReason, GatekeeperKeys, IdentityHeaders, decide};
pub use rules::render_nginx_rules;
pub use service::{
    GateOutcome, GatekeeperService, USER_EMAIL_HEADER, USER_ID_HEADER, deny_body, evaluate,
    run_gatekeeper,
};
