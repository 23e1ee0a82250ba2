//! # 状态快照数据模型
//!
//! 对应 `GET /status` 响应中的 `status` 字段。
//! 状态快照是只读视图：每次轮询整体替换，从不与配置树逐字段合并。

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// 机器人状态快照
///
/// 对应前端 TypeScript 接口：
/// ```typescript
/// interface StatusSnapshot {
///   features: Record<string, boolean>;
///   config_status: Record<string, boolean>;
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    /// 功能启用状态：功能名 → 是否启用（如 chat / drawing / search）
    #[serde(default)]
    pub features: BTreeMap<String, bool>,

    /// 凭据是否已配置：凭据名 → 是否存在（如 bot_token / openai_api_key）
    #[serde(default)]
    pub config_status: BTreeMap<String, bool>,
}

impl StatusSnapshot {
    /// 查询某个功能在快照中是否启用，缺失视为未启用
    pub fn feature_enabled(&self, feature: &str) -> bool {
        self.features.get(feature).copied().unwrap_or(false)
    }
}
