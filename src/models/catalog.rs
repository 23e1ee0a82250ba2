//! # 模型列表数据模型
//!
//! 远端的模型列表接口在不同版本中返回过两种形态：
//! - 扁平数组：`{"models": [{"id": "...", "name": "..."}]}`
//! - 按用途拆分：`{"models": {"chat": [...], "image": [...]}}`
//!
//! 面板统一为扁平形态（schema 版本 1），解码时兼容拆分形态并合并去重。

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 当前模型列表 schema 版本
pub const MODEL_CATALOG_SCHEMA_VERSION: u32 = 1;

/// 单个模型条目
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    /// 模型标识（如 "gpt-4o"）
    pub id: String,
    /// 展示名称，缺失时与 id 相同
    #[serde(default)]
    pub name: String,
}

/// 标准化后的模型列表
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelCatalog {
    pub schema_version: u32,
    /// 按 id 排序、去重后的模型列表
    pub models: Vec<ModelInfo>,
}

impl ModelCatalog {
    /// 从远端响应的 `models` 字段解码
    ///
    /// 接受扁平数组或 `{chat, image}` 拆分对象，其他形态返回错误描述。
    pub fn from_response(models: &Value) -> Result<Self, String> {
        let raw: Vec<Value> = match models {
            Value::Array(items) => items.clone(),
            Value::Object(groups) => groups
                .values()
                .filter_map(Value::as_array)
                .flat_map(|items| items.iter().cloned())
                .collect(),
            other => return Err(format!("无法识别的模型列表格式: {}", other)),
        };

        // BTreeMap 同时完成去重和按 id 排序
        let mut by_id: BTreeMap<String, ModelInfo> = BTreeMap::new();
        for item in raw {
            let mut info = match item {
                // 兼容仅返回模型 id 字符串的实现
                Value::String(id) => ModelInfo {
                    id,
                    name: String::new(),
                },
                other => serde_json::from_value::<ModelInfo>(other)
                    .map_err(|e| format!("解析模型条目失败: {}", e))?,
            };
            if info.name.is_empty() {
                info.name = info.id.clone();
            }
            by_id.entry(info.id.clone()).or_insert(info);
        }

        Ok(Self {
            schema_version: MODEL_CATALOG_SCHEMA_VERSION,
            models: by_id.into_values().collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flat_listing_is_sorted() {
        let catalog = ModelCatalog::from_response(&json!([
            {"id": "gpt-4o", "name": "GPT-4o"},
            {"id": "dall-e-3", "name": "DALL-E 3"}
        ]))
        .unwrap();

        assert_eq!(catalog.schema_version, 1);
        let ids: Vec<&str> = catalog.models.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["dall-e-3", "gpt-4o"]);
    }

    #[test]
    fn test_split_listing_is_flattened_and_deduplicated() {
        let catalog = ModelCatalog::from_response(&json!({
            "chat": [{"id": "gpt-4o"}, "gpt-4o-mini"],
            "image": [{"id": "dall-e-3", "name": "DALL-E 3"}, {"id": "gpt-4o"}]
        }))
        .unwrap();

        assert_eq!(catalog.models.len(), 3);
        assert_eq!(catalog.models[1].name, "gpt-4o");
        assert_eq!(catalog.models[2].id, "gpt-4o-mini");
    }

    #[test]
    fn test_unknown_shape_is_rejected() {
        assert!(ModelCatalog::from_response(&json!("gpt-4o")).is_err());
    }
}
