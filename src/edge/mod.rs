//! # 边缘路由模块
//!
//! 浏览器可达的 HTTP 接口：认证、统一看板、健康明细、单端点转发和会话遥测。

pub mod handlers;
pub mod middleware;
pub mod response;
pub mod routes;
pub mod server;

pub use response::ErrorBody;
pub use server::{AppState, EdgeServer, build_router};
