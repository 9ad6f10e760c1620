//! # 通用工具

pub mod field_chain;

pub use field_chain::{FieldChain, json_path_lookup};
