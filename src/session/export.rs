//! # 会话导出
//!
//! 把一个会话的事件渲染为 json / csv / text 附件。

use chrono::{SecondsFormat, Utc};
use serde_json::json;
use std::fmt::Write as _;
use std::str::FromStr;

use super::store::SessionEvent;
use crate::error::{RelayError, Result};

/// CSV 表头
pub const CSV_HEADER: &str = "id,session_id,event_type,timestamp,payload";

/// 导出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Json,
    Csv,
    Text,
}

impl ExportFormat {
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Csv => "csv",
            Self::Text => "txt",
        }
    }

    #[must_use]
    pub const fn content_type(self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::Csv => "text/csv; charset=utf-8",
            Self::Text => "text/plain; charset=utf-8",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = RelayError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            "text" | "txt" => Ok(Self::Text),
            other => Err(RelayError::validation(format!(
                "unsupported export format '{other}', expected json, csv or text"
            ))),
        }
    }
}

/// 附件文件名
#[must_use]
pub fn export_filename(session_id: &str, format: ExportFormat) -> String {
    let safe: String = session_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("session-{safe}.{}", format.extension())
}

fn timestamp(event: &SessionEvent) -> String {
    event
        .timestamp_utc
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// 含逗号、引号或换行时加引号，内部引号加倍
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        csv_quoted(value)
    } else {
        value.to_string()
    }
}

fn csv_quoted(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

/// 按格式渲染导出内容（事件需已按时间升序排列）
pub fn render_export(session_id: &str, events: &[SessionEvent], format: ExportFormat) -> Result<String> {
    match format {
        ExportFormat::Json => {
            let body = json!({
                "session_id": session_id,
                "exported_at": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
                "count": events.len(),
                "events": events,
            });
            Ok(serde_json::to_string_pretty(&body)?)
        }
        ExportFormat::Csv => {
            let mut out = String::from(CSV_HEADER);
            out.push('\n');
            for event in events {
                let payload = serde_json::to_string(&event.event_payload)?;
                let _ = writeln!(
                    out,
                    "{},{},{},{},{}",
                    csv_field(&event.id),
                    csv_field(&event.session_id),
                    csv_field(&event.event_type),
                    csv_field(&timestamp(event)),
                    csv_quoted(&payload)
                );
            }
            Ok(out)
        }
        ExportFormat::Text => {
            let mut out = format!("Session {session_id} ({} events)\n", events.len());
            for event in events {
                let payload = serde_json::to_string(&event.event_payload)?;
                let _ = writeln!(
                    out,
                    "[{}] {} user={} {}",
                    timestamp(event),
                    event.event_type,
                    event.user_id,
                    payload
                );
            }
            Ok(out)
        }
    }
}
