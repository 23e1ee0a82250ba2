//! # 面板本地设置数据模型
//!
//! 定义了面板自身的运行参数（PanelSettings）和保存后的缓存同步策略（ReloadPolicy）。
//! 这些设置只影响面板本身，存储在 `~/.mo/BotPanel/panel-settings.json`，
//! 与远端机器人的配置树完全无关。

use serde::{Deserialize, Serialize};

use super::profile::DEFAULT_PROFILE_LABEL;

/// 默认远端 API 基础地址
pub const DEFAULT_API_BASE: &str = "http://127.0.0.1:5000/api";

/// 覆盖远端 API 基础地址的环境变量名
pub const API_URL_ENV: &str = "BOT_PANEL_API_URL";

/// 保存成功后本地缓存的同步策略
///
/// 远端保存接口只返回成功与否，不返回保存后的配置，
/// 因此面板必须二选一地明确同步方式：
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReloadPolicy {
    /// 保存成功后重新拉取完整配置树（默认）
    #[default]
    Always,
    /// 保存成功后把本次提交的点分路径直接写入本地缓存，不发起额外请求
    ApplyLocally,
}

/// 面板本地设置
///
/// 对应前端 TypeScript 接口：
/// ```typescript
/// interface PanelSettings {
///   apiBaseUrl: string;
///   pollIntervalSecs: number;
///   requestTimeoutSecs: number;
///   reloadAfterSave: 'always' | 'applyLocally';
///   profileLabel: string;
///   restartWebhookUrl?: string;
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PanelSettings {
    /// 远端 API 基础地址（所有端点均相对于此地址）
    pub api_base_url: String,

    /// 状态轮询周期（秒）
    pub poll_interval_secs: u64,

    /// 单次网关请求超时（秒）
    pub request_timeout_secs: u64,

    /// 保存后的缓存同步策略
    pub reload_after_save: ReloadPolicy,

    /// 新增配置组时的名称前缀
    pub profile_label: String,

    /// 重启钩子地址（如 Render deploy hook），未配置时为 None
    pub restart_webhook_url: Option<String>,
}

impl Default for PanelSettings {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE.to_string(),
            poll_interval_secs: 30,
            request_timeout_secs: 30,
            reload_after_save: ReloadPolicy::Always,
            profile_label: DEFAULT_PROFILE_LABEL.to_string(),
            restart_webhook_url: None,
        }
    }
}

impl PanelSettings {
    /// 应用环境变量覆盖（目前只有 API 基础地址）
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var(API_URL_ENV) {
            let url = url.trim();
            if !url.is_empty() {
                self.api_base_url = url.to_string();
            }
        }
        self
    }
}
