//! # 字段回退链
//!
//! 上游 JSON 的字段名并不统一（`connected` / `is_connected` / `status.connected` …）。
//! 每个字段的候选路径声明一次，按顺序查找，`null` 视为缺失。

use serde_json::Value;

/// 按顺序尝试的点分路径列表，例如 `&["size", "quantity", "qty"]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldChain(pub &'static [&'static str]);

impl FieldChain {
    /// 第一个存在且非 `null` 的值
    #[must_use]
    pub fn resolve<'a>(&self, data: &'a Value) -> Option<&'a Value> {
        self.0
            .iter()
            .find_map(|path| json_path_lookup(data, path).filter(|value| !value.is_null()))
    }

    /// 布尔值；也接受 `"true"` / `1` 这类宽松写法
    #[must_use]
    pub fn bool(&self, data: &Value) -> Option<bool> {
        self.resolve(data).and_then(|value| match value {
            Value::Bool(flag) => Some(*flag),
            Value::Number(number) => number.as_f64().map(|n| n != 0.0),
            Value::String(text) => match text.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "1" => Some(true),
                "false" | "no" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        })
    }

    #[must_use]
    pub fn f64(&self, data: &Value) -> Option<f64> {
        self.resolve(data).and_then(|value| match value {
            Value::Number(number) => number.as_f64(),
            Value::String(text) => text.trim().parse().ok(),
            _ => None,
        })
    }

    #[must_use]
    pub fn u64(&self, data: &Value) -> Option<u64> {
        self.resolve(data).and_then(|value| match value {
            Value::Number(number) => number
                .as_u64()
                .or_else(|| number.as_f64().filter(|n| *n >= 0.0).map(|n| n as u64)),
            Value::String(text) => text.trim().parse().ok(),
            _ => None,
        })
    }

    /// 字符串；数字会被转成字符串（用户 id 可能是数字）
    #[must_use]
    pub fn string(&self, data: &Value) -> Option<String> {
        self.resolve(data).and_then(|value| match value {
            Value::String(text) if !text.trim().is_empty() => Some(text.clone()),
            Value::Number(number) => Some(number.to_string()),
            _ => None,
        })
    }

    /// 数组；缺失时为空切片
    #[must_use]
    pub fn array<'a>(&self, data: &'a Value) -> &'a [Value] {
        self.resolve(data)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

/// 点分路径查找，数字段按数组下标处理
#[must_use]
pub fn json_path_lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = value;
    for segment in path.split('.') {
        current = match current {
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => current.get(segment)?,
        };
    }
    Some(current)
}
