//! # 会话记录器
//!
//! 即发即弃：调用方立即返回，写入在独立任务中完成。失败只记 warn 日志，
//! 不重试、不上抛（最多一次）。

use serde_json::{Map, Value};
use std::sync::Arc;
use tokio::task::JoinHandle;

use super::store::{NewSessionEvent, SessionStore};
use crate::logging::{LogComponent, LogStage};
use crate::{ldebug, lwarn};

/// 派生一个独立任务：调用方不等待结果，但错误分支仍会执行
pub fn spawn_detached<F, E>(request_id: String, operation: &'static str, task: F) -> JoinHandle<()>
where
    F: Future<Output = Result<(), E>> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    tokio::spawn(async move {
        if let Err(err) = task.await {
            lwarn!(
                request_id,
                LogStage::Recording,
                LogComponent::SessionRecorder,
                operation,
                "后台任务失败，已丢弃",
                error = %err
            );
        }
    })
}

/// 会话记录器
#[derive(Clone, Default)]
pub struct SessionRecorder {
    store: Option<Arc<dyn SessionStore>>,
}

impl std::fmt::Debug for SessionRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRecorder")
            .field("enabled", &self.store.is_some())
            .finish()
    }
}

impl SessionRecorder {
    #[must_use]
    pub fn new(store: Option<Arc<dyn SessionStore>>) -> Self {
        Self { store }
    }

    /// 未配置存储的记录器
    #[must_use]
    pub fn disabled() -> Self {
        Self { store: None }
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.store.is_some()
    }

    /// 底层存储（读取接口使用）
    #[must_use]
    pub fn store(&self) -> Option<Arc<dyn SessionStore>> {
        self.store.clone()
    }

    /// 记录一条事件，立即返回
    ///
    /// 会话ID为空白或未配置存储时不做任何事并返回 `None`；
    /// 返回的句柄只用于测试等待，业务调用方直接丢弃。
    pub fn record(
        &self,
        request_id: &str,
        session_id: &str,
        user_id: &str,
        event_type: &str,
        payload: Map<String, Value>,
    ) -> Option<JoinHandle<()>> {
        let session_id = session_id.trim();
        if session_id.is_empty() {
            return None;
        }
        let store = Arc::clone(self.store.as_ref()?);

        let event = NewSessionEvent::new(session_id, user_id, event_type, payload);
        let request_id = request_id.to_string();
        let log_request_id = request_id.clone();

        Some(spawn_detached(request_id, "record_session_event", async move {
            let event_type = event.event_type.clone();
            let id = store.append(event).await?;
            ldebug!(
                log_request_id,
                LogStage::Recording,
                LogComponent::SessionRecorder,
                "record_session_event",
                "会话事件已写入",
                event_id = %id,
                event_type = %event_type
            );
            Ok::<(), crate::error::RelayError>(())
        }))
    }
}
