use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SessionEvents::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SessionEvents::Id)
                            .string_len(36)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(SessionEvents::SessionId)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SessionEvents::UserId)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SessionEvents::EventType)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(ColumnDef::new(SessionEvents::EventPayload).json().not_null())
                    .col(
                        ColumnDef::new(SessionEvents::TimestampUtc)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // 按会话过滤
        manager
            .create_index(
                Index::create()
                    .name("idx_session_events_session_id")
                    .table(SessionEvents::Table)
                    .col(SessionEvents::SessionId)
                    .to_owned(),
            )
            .await?;

        // 按时间排序（列表倒序、导出正序）
        manager
            .create_index(
                Index::create()
                    .name("idx_session_events_timestamp_utc")
                    .table(SessionEvents::Table)
                    .col(SessionEvents::TimestampUtc)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SessionEvents::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum SessionEvents {
    Table,
    Id,
    SessionId,
    UserId,
    EventType,
    EventPayload,
    TimestampUtc,
}
