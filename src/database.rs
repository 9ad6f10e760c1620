//! # 数据库模块
//!
//! 会话事件存储的连接和迁移管理

use sea_orm::{Database, DatabaseConnection, DbErr};
use sea_orm_migration::MigratorTrait;
use std::path::Path;

use crate::logging::{LogComponent, LogStage};
use crate::{ldebug, lerror, linfo, lwarn};

/// 从 SQLite URL 中取出文件路径；内存库返回 `None`
fn sqlite_file_path(database_url: &str) -> Option<&str> {
    let rest = database_url
        .strip_prefix("sqlite://")
        .or_else(|| database_url.strip_prefix("sqlite:"))?;
    let path = rest.split('?').next().unwrap_or(rest);
    if path.is_empty() || path.starts_with(":memory:") {
        None
    } else {
        Some(path)
    }
}

/// 初始化数据库连接
pub async fn init_database(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    linfo!(
        "system",
        LogStage::Startup,
        LogComponent::Database,
        "connect",
        "正在连接数据库",
        url = %database_url.split('?').next().unwrap_or(database_url)
    );

    // 对于SQLite数据库，确保数据库文件的目录和文件存在
    if let Some(db_path) = sqlite_file_path(database_url) {
        let db_file_path = Path::new(db_path);

        if let Some(parent_dir) = db_file_path.parent()
            && !parent_dir.as_os_str().is_empty()
            && !parent_dir.exists()
        {
            std::fs::create_dir_all(parent_dir).map_err(|e| {
                DbErr::Custom(format!("无法创建数据库目录 {}: {e}", parent_dir.display()))
            })?;
            ldebug!(
                "system",
                LogStage::Startup,
                LogComponent::Database,
                "create_dir",
                format!("数据库目录创建成功: {}", parent_dir.display())
            );
        }

        if !db_file_path.exists() {
            std::fs::File::create(db_file_path).map_err(|e| {
                DbErr::Custom(format!("无法创建数据库文件 {}: {e}", db_file_path.display()))
            })?;
            ldebug!(
                "system",
                LogStage::Startup,
                LogComponent::Database,
                "create_file",
                format!("数据库文件创建成功: {}", db_file_path.display())
            );
        }
    }

    let db = Database::connect(database_url).await?;

    linfo!(
        "system",
        LogStage::Startup,
        LogComponent::Database,
        "connect",
        "数据库连接成功"
    );
    Ok(db)
}

/// 运行数据库迁移
pub async fn run_migrations(db: &DatabaseConnection) -> Result<(), DbErr> {
    match ::migration::Migrator::up(db, None).await {
        Ok(()) => {
            linfo!(
                "system",
                LogStage::Startup,
                LogComponent::Database,
                "migrate",
                "数据库迁移完成"
            );
            Ok(())
        }
        Err(e) => {
            lerror!(
                "system",
                LogStage::Startup,
                LogComponent::Database,
                "migrate",
                "数据库迁移失败",
                error = %e
            );
            Err(e)
        }
    }
}

/// 检查是否有未应用的迁移
pub async fn check_database_status(db: &DatabaseConnection) -> Result<usize, DbErr> {
    let pending = ::migration::Migrator::get_pending_migrations(db).await?;
    if !pending.is_empty() {
        lwarn!(
            "system",
            LogStage::Startup,
            LogComponent::Database,
            "check_status",
            format!("有 {} 个待应用的迁移", pending.len())
        );
    }
    Ok(pending.len())
}
