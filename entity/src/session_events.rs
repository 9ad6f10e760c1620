//! # 会话事件实体定义
//!
//! 仪表盘会话遥测事件表的 Sea-ORM 实体模型。事件只追加、不更新。

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// 会话事件实体
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "session_events")]
pub struct Model {
    /// 事件ID（UUID v4 文本）
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// 浏览器会话ID（来自 `X-Session-Id`）
    pub session_id: String,
    /// 已验证身份的用户ID
    pub user_id: String,
    /// 事件类型，例如 `dashboard_fetch`、`login`
    pub event_type: String,
    /// 事件负载（任意 JSON 对象）
    pub event_payload: Json,
    /// 事件发生时间（UTC）
    pub timestamp_utc: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
