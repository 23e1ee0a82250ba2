//! # AI 服务配置组数据模型
//!
//! 定义了配置组（Profile）、配置组字段更新（ProfileFields）、
//! 以及批量保存 AI 配置时发送给远端的请求体（AiConfigPayload）。
//!
//! 配置组存储在远端配置树的 `ai_services.openai_configs` 数组中，
//! 激活索引存储在 `ai_services.active_openai_config_index`。

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use super::config::{DEFAULT_API_BASE_URL, DEFAULT_CHAT_MODEL, DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE};

/// 配置组名称的默认前缀
///
/// 新增配置组时生成 `"<前缀> N"` 形式的名称，N 为新增后的配置组数量。
pub const DEFAULT_PROFILE_LABEL: &str = "配置";

/// AI 服务配置组
///
/// 一组命名的 AI 服务凭据和调参，用户可在多个配置组之间切换。
///
/// 已知字段缺失时回退到默认值；面板不认识的供应商字段保存在 `extra` 中，保存时原样写回。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    /// 配置组名称（如 "配置 1"）
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,

    /// API 密钥
    #[serde(default, deserialize_with = "lenient_string")]
    pub api_key: String,

    /// API 基础地址
    #[serde(default = "default_api_base_url", deserialize_with = "lenient_api_base_url")]
    pub api_base_url: String,

    /// 聊天模型标识
    #[serde(default = "default_model", deserialize_with = "lenient_model")]
    pub model: String,

    /// 最大 token 数
    #[serde(default = "default_max_tokens", deserialize_with = "lenient_max_tokens")]
    pub max_tokens: i64,

    /// 温度参数
    #[serde(default = "default_temperature", deserialize_with = "lenient_temperature")]
    pub temperature: f64,

    /// 面板不认识的供应商特定字段
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_model() -> String {
    DEFAULT_CHAT_MODEL.to_string()
}

fn default_max_tokens() -> i64 {
    DEFAULT_MAX_TOKENS
}

fn default_temperature() -> f64 {
    DEFAULT_TEMPERATURE
}

// 单个字段为 null 或类型不符时只回退该字段，不影响同一配置组的其他字段。
// 前端表单把空输入框提交为 null（`parseInt("")` 序列化后即为 null），
// 数字也可能以字符串形式保存。

fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(string_of(&value).unwrap_or_default())
}

fn lenient_api_base_url<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(string_of(&value).unwrap_or_else(default_api_base_url))
}

fn lenient_model<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(string_of(&value).unwrap_or_else(default_model))
}

fn lenient_max_tokens<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(number_of(&value)
        .map(|n| n as i64)
        .unwrap_or_else(default_max_tokens))
}

fn lenient_temperature<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(number_of(&value).unwrap_or_else(default_temperature))
}

fn string_of(value: &Value) -> Option<String> {
    value.as_str().map(str::to_string)
}

/// 数字或可解析为数字的字符串；NaN / 无穷视为缺失
fn number_of(value: &Value) -> Option<f64> {
    value
        .as_f64()
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
        .filter(|n| n.is_finite())
}

impl Profile {
    /// 以供应商默认值创建指定名称的配置组
    pub fn named(name: impl Into<String>, defaults: &ProfileDefaults) -> Self {
        Self {
            name: name.into(),
            api_key: defaults.api_key.clone(),
            api_base_url: defaults.api_base_url.clone(),
            model: defaults.model.clone(),
            max_tokens: defaults.max_tokens,
            temperature: defaults.temperature,
            extra: Map::new(),
        }
    }

    /// 用表单收集到的字段覆盖本配置组（仅覆盖提供了值的字段）
    pub fn apply(&mut self, fields: &ProfileFields) {
        if let Some(name) = &fields.name {
            self.name = name.clone();
        }
        if let Some(api_key) = &fields.api_key {
            self.api_key = api_key.clone();
        }
        if let Some(api_base_url) = &fields.api_base_url {
            self.api_base_url = api_base_url.clone();
        }
        if let Some(model) = &fields.model {
            self.model = model.clone();
        }
        if let Some(max_tokens) = fields.max_tokens {
            self.max_tokens = max_tokens;
        }
        if let Some(temperature) = fields.temperature {
            self.temperature = temperature;
        }
    }
}

/// 新增配置组时使用的供应商默认值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileDefaults {
    pub api_key: String,
    pub api_base_url: String,
    pub model: String,
    pub max_tokens: i64,
    pub temperature: f64,
}

impl Default for ProfileDefaults {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base_url: default_api_base_url(),
            model: default_model(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}

/// 激活配置组的字段更新
///
/// 由表单层收集，`None` 表示该字段未被编辑、保持原值。
///
/// 对应前端 TypeScript 接口：
/// ```typescript
/// interface ProfileFields {
///   name?: string;
///   apiKey?: string;
///   apiBaseUrl?: string;
///   model?: string;
///   maxTokens?: number;
///   temperature?: number;
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileFields {
    pub name: Option<String>,
    pub api_key: Option<String>,
    pub api_base_url: Option<String>,
    pub model: Option<String>,
    pub max_tokens: Option<i64>,
    pub temperature: Option<f64>,
}

/// 绘画设置（随 AI 配置一起保存）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawingSettings {
    pub model: String,
    pub size: String,
    pub quality: String,
    pub daily_limit: i64,
}

/// 聊天设置（随 AI 配置一起保存，写入 `features.chat.*`）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatSettings {
    pub history_enabled: bool,
    pub history_max_length: i64,
    pub auto_reply_private: bool,
    pub short_message_threshold: i64,
}

/// `POST /ai_config` 请求体
///
/// 一次性提交整个配置组集合、激活索引以及依赖于激活配置组的绘画/聊天设置，
/// 避免每次按键都产生一次网络往返。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiConfigPayload {
    pub openai_configs: Vec<Profile>,
    pub active_openai_config_index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drawing: Option<DrawingSettings>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat: Option<ChatSettings>,
}
