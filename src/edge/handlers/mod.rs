//! # 边缘路由处理器

pub mod dashboard;
pub mod health;
pub mod relay;
pub mod sessions;
pub mod stub;
pub mod system;
