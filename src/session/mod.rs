//! # 会话遥测模块
//!
//! 即发即弃的会话事件记录、分页查询和导出。

pub mod export;
pub mod recorder;
pub mod store;

pub use export::{CSV_HEADER, ExportFormat, export_filename, render_export};
pub use recorder::{SessionRecorder, spawn_detached};
pub use store::{NewSessionEvent, SeaOrmSessionStore, SessionEvent, SessionEventFilter, SessionStore};

/// 聚合调用写入的事件类型
pub const DASHBOARD_FETCH_EVENT: &str = "dashboard_fetch";
