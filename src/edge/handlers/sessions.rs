//! # 会话事件处理器

use axum::{
    Json,
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::edge::server::AppState;
use crate::error::{RelayError, Result};
use crate::session::{
    ExportFormat, SessionEvent, SessionEventFilter, SessionStore, export_filename, render_export,
};

pub const DEFAULT_EVENT_LIMIT: u64 = 50;
pub const MAX_EVENT_LIMIT: u64 = 200;

#[derive(Debug, Default, Deserialize)]
pub struct EventsQuery {
    pub limit: Option<String>,
    pub offset: Option<String>,
    pub session_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ExportQuery {
    pub session_id: Option<String>,
    pub format: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct EventsPage {
    pub events: Vec<SessionEvent>,
    pub total: u64,
    pub limit: u64,
    pub offset: u64,
}

fn parse_number(name: &str, raw: Option<&str>, default: u64) -> Result<u64> {
    match raw.map(str::trim).filter(|value| !value.is_empty()) {
        None => Ok(default),
        Some(value) => value.parse().map_err(|_| {
            RelayError::validation(format!("'{name}' must be a non-negative integer"))
        }),
    }
}

/// 解析分页参数：`limit` 默认 50，超过 200 截断为 200
pub fn page_bounds(query: &EventsQuery) -> Result<(u64, u64)> {
    let limit = parse_number("limit", query.limit.as_deref(), DEFAULT_EVENT_LIMIT)?
        .clamp(1, MAX_EVENT_LIMIT);
    let offset = parse_number("offset", query.offset.as_deref(), 0)?;
    Ok((limit, offset))
}

fn require_store(state: &AppState) -> Result<Arc<dyn SessionStore>> {
    state
        .session_store()
        .ok_or_else(|| RelayError::config("session storage is not configured"))
}

fn non_blank(value: Option<&String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

pub async fn list_events(
    State(state): State<AppState>,
    Query(query): Query<EventsQuery>,
) -> Result<Json<EventsPage>> {
    let (limit, offset) = page_bounds(&query)?;
    let store = require_store(&state)?;
    let filter = SessionEventFilter {
        session_id: non_blank(query.session_id.as_ref()),
    };

    let (events, total) = store.list(&filter, limit, offset).await?;
    Ok(Json(EventsPage {
        events,
        total,
        limit,
        offset,
    }))
}

pub async fn export_session(
    State(state): State<AppState>,
    Query(query): Query<ExportQuery>,
) -> Result<Response> {
    let session_id = non_blank(query.session_id.as_ref())
        .ok_or_else(|| RelayError::validation("'session_id' is required"))?;
    let format = match query.format.as_deref() {
        Some(raw) => raw.parse::<ExportFormat>()?,
        None => ExportFormat::default(),
    };
    let store = require_store(&state)?;

    let events = store.export(&session_id).await?;
    let body = render_export(&session_id, &events, format)?;
    let disposition = format!(
        "attachment; filename=\"{}\"",
        export_filename(&session_id, format)
    );

    Ok((
        [
            (header::CONTENT_TYPE, format.content_type().to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(limit: Option<&str>, offset: Option<&str>) -> EventsQuery {
        EventsQuery {
            limit: limit.map(str::to_string),
            offset: offset.map(str::to_string),
            session_id: None,
        }
    }

    #[test]
    fn limit_defaults_and_clamps() {
        assert_eq!(page_bounds(&query(None, None)).unwrap(), (50, 0));
        assert_eq!(page_bounds(&query(Some("500"), Some("10"))).unwrap(), (200, 10));
        assert_eq!(page_bounds(&query(Some("0"), None)).unwrap(), (1, 0));
    }

    #[test]
    fn non_numeric_limit_is_rejected() {
        let err = page_bounds(&query(Some("lots"), None)).unwrap_err();
        assert_eq!(err.error_label(), "invalid_request");
    }
}
