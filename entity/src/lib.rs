//! # Entity 模块
//!
//! 包含所有 Sea-ORM 实体定义

pub mod session_events;

pub use session_events::Entity as SessionEvents;

#[cfg(test)]
mod tests;
