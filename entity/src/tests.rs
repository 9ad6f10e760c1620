//! # 实体定义测试

#[cfg(test)]
mod tests {
    use crate::session_events;
    use sea_orm::Set;

    #[tokio::test]
    async fn test_session_event_creation() {
        let now = chrono::Utc::now();
        let event = session_events::ActiveModel {
            id: Set("0b6f8a52-5b55-4c47-9d0e-4c1f0f1b2a11".to_string()),
            session_id: Set("sess-1".to_string()),
            user_id: Set("user-1".to_string()),
            event_type: Set("login".to_string()),
            event_payload: Set(serde_json::json!({})),
            timestamp_utc: Set(now),
        };

        assert_eq!(event.session_id.as_ref(), "sess-1");
        assert_eq!(event.event_type.as_ref(), "login");
        assert_eq!(event.event_payload.as_ref(), &serde_json::json!({}));
        assert_eq!(event.timestamp_utc.as_ref(), &now);
    }
}
