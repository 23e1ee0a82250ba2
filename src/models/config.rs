//! # 远端配置树数据模型
//!
//! 远端机器人的完整配置（功能开关、AI 服务、日志、Web 应用设置）是一棵任意嵌套的 JSON 树。
//! 面板不为整棵树定义强类型结构：
//! - 远端不同版本的字段集合并不一致，使用 `serde_json::Value` 可以完整保留所有字段
//! - 缺失的键一律视为"使用默认值"，默认值集中定义在本模块的 [`default_for`] 中

use serde_json::{Value, json};

/// 远端配置树
///
/// 对应 `GET /config` 响应中的 `config` 字段，结构示例：
/// ```json
/// {
///   "telegram": { "bot_token": "..." },
///   "ai_services": { "openai_configs": [...], "active_openai_config_index": 0, "drawing": {...} },
///   "features": { "chat": { "enabled": true }, ... },
///   "webapp": { "port": 5000 },
///   "logging": { "level": "INFO" }
/// }
/// ```
pub type ConfigurationTree = Value;

/// 配置组数组在配置树中的固定路径
pub const PROFILES_PATH: &str = "ai_services.openai_configs";

/// 激活配置组索引在配置树中的固定路径
pub const ACTIVE_INDEX_PATH: &str = "ai_services.active_openai_config_index";

/// 默认聊天模型
pub const DEFAULT_CHAT_MODEL: &str = "gpt-3.5-turbo";

/// 默认 API 基础地址
pub const DEFAULT_API_BASE_URL: &str = "https://api.openai.com/v1";

/// 默认温度参数
pub const DEFAULT_TEMPERATURE: f64 = 0.7;

/// 默认最大 token 数
pub const DEFAULT_MAX_TOKENS: i64 = 1000;

/// 查询点分路径对应的默认值
///
/// 缓存的 `get` 访问器在路径缺失时调用此函数。
/// 精确路径优先匹配；之后按末段字段名匹配，覆盖
/// `features.<name>.enabled`、配置组内的 `temperature` / `max_tokens` 等通配场景。
///
/// # 返回值
/// - `Some(value)` - 该路径有文档化的默认值
/// - `None` - 没有默认值，调用方应视为 `null`
pub fn default_for(path: &str) -> Option<Value> {
    let exact = match path {
        "features.chat.model" => Some(json!(DEFAULT_CHAT_MODEL)),
        "ai_services.drawing.model" => Some(json!("dall-e-3")),
        "ai_services.drawing.size" => Some(json!("1024x1024")),
        "ai_services.drawing.quality" => Some(json!("standard")),
        "features.drawing.daily_limit" => Some(json!(10)),
        "features.auto_summary.interval_hours" => Some(json!(24)),
        "features.auto_summary.min_messages" => Some(json!(50)),
        "features.chat.short_message_threshold" => Some(json!(50)),
        "features.chat.history_max_length" => Some(json!(10)),
        "features.hotspot_push.push_interval_minutes" => Some(json!(60)),
        "features.history.cleanup_retention_days" => Some(json!(30)),
        "logging.level" => Some(json!("INFO")),
        "webapp.port" => Some(json!(5000)),
        ACTIVE_INDEX_PATH => Some(json!(0)),
        _ => None,
    };
    if exact.is_some() {
        return exact;
    }

    // 末段字段名通配
    match path.rsplit('.').next() {
        Some("enabled") if path.starts_with("features.") => Some(json!(false)),
        Some("temperature") => Some(json!(DEFAULT_TEMPERATURE)),
        Some("max_tokens") => Some(json!(DEFAULT_MAX_TOKENS)),
        Some("model") => Some(json!(DEFAULT_CHAT_MODEL)),
        Some("api_base_url") => Some(json!(DEFAULT_API_BASE_URL)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_documented_defaults() {
        assert_eq!(default_for("ai_services.drawing.size"), Some(json!("1024x1024")));
        assert_eq!(default_for("logging.level"), Some(json!("INFO")));
        assert_eq!(default_for("webapp.port"), Some(json!(5000)));
        assert_eq!(default_for("features.history.cleanup_retention_days"), Some(json!(30)));
    }

    #[test]
    fn test_wildcard_defaults() {
        assert_eq!(default_for("features.search.enabled"), Some(json!(false)));
        assert_eq!(default_for("ai_services.openai_configs.temperature"), Some(json!(0.7)));
        assert_eq!(default_for("features.chat.model"), Some(json!("gpt-3.5-turbo")));
        assert_eq!(default_for("telegram.bot_token"), None);
    }
}
