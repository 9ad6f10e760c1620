//! # 会话事件存储
//!
//! 记录器只依赖 [`SessionStore`] 的写入/读取契约，具体引擎可替换。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use entity::session_events::{self, Entity as SessionEvents};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::Result;

/// 待写入的会话事件
#[derive(Debug, Clone, PartialEq)]
pub struct NewSessionEvent {
    pub session_id: String,
    pub user_id: String,
    pub event_type: String,
    pub event_payload: Map<String, Value>,
    pub timestamp_utc: DateTime<Utc>,
}

impl NewSessionEvent {
    pub fn new(
        session_id: impl Into<String>,
        user_id: impl Into<String>,
        event_type: impl Into<String>,
        event_payload: Map<String, Value>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            user_id: user_id.into(),
            event_type: event_type.into(),
            event_payload,
            timestamp_utc: Utc::now(),
        }
    }
}

/// 已存储的会话事件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionEvent {
    pub id: String,
    pub session_id: String,
    pub user_id: String,
    pub event_type: String,
    pub event_payload: Value,
    pub timestamp_utc: DateTime<Utc>,
}

impl From<session_events::Model> for SessionEvent {
    fn from(model: session_events::Model) -> Self {
        Self {
            id: model.id,
            session_id: model.session_id,
            user_id: model.user_id,
            event_type: model.event_type,
            event_payload: model.event_payload,
            timestamp_utc: model.timestamp_utc,
        }
    }
}

/// 列表查询条件
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionEventFilter {
    pub session_id: Option<String>,
}

/// 会话事件存储契约
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// 追加一条事件，返回其ID
    async fn append(&self, event: NewSessionEvent) -> Result<String>;

    /// 分页列出事件（新的在前），同时返回总数
    async fn list(
        &self,
        filter: &SessionEventFilter,
        limit: u64,
        offset: u64,
    ) -> Result<(Vec<SessionEvent>, u64)>;

    /// 导出某个会话的全部事件（旧的在前）
    async fn export(&self, session_id: &str) -> Result<Vec<SessionEvent>>;
}

/// 基于 Sea-ORM 的存储实现
#[derive(Debug, Clone)]
pub struct SeaOrmSessionStore {
    db: DatabaseConnection,
}

impl SeaOrmSessionStore {
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SessionStore for SeaOrmSessionStore {
    async fn append(&self, event: NewSessionEvent) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        let model = session_events::ActiveModel {
            id: Set(id.clone()),
            session_id: Set(event.session_id),
            user_id: Set(event.user_id),
            event_type: Set(event.event_type),
            event_payload: Set(Value::Object(event.event_payload)),
            timestamp_utc: Set(event.timestamp_utc),
        };
        model.insert(&self.db).await?;
        Ok(id)
    }

    async fn list(
        &self,
        filter: &SessionEventFilter,
        limit: u64,
        offset: u64,
    ) -> Result<(Vec<SessionEvent>, u64)> {
        let mut query = SessionEvents::find();
        if let Some(session_id) = &filter.session_id {
            query = query.filter(session_events::Column::SessionId.eq(session_id.as_str()));
        }

        let total = query.clone().count(&self.db).await?;
        let events = query
            .order_by_desc(session_events::Column::TimestampUtc)
            .order_by_desc(session_events::Column::Id)
            .limit(limit)
            .offset(offset)
            .all(&self.db)
            .await?
            .into_iter()
            .map(SessionEvent::from)
            .collect();

        Ok((events, total))
    }

    async fn export(&self, session_id: &str) -> Result<Vec<SessionEvent>> {
        let events = SessionEvents::find()
            .filter(session_events::Column::SessionId.eq(session_id))
            .order_by_asc(session_events::Column::TimestampUtc)
            .order_by_asc(session_events::Column::Id)
            .all(&self.db)
            .await?
            .into_iter()
            .map(SessionEvent::from)
            .collect();
        Ok(events)
    }
}
