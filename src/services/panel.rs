//! # 控制面板状态中心
//!
//! `ControlPanel` 是面板唯一的状态持有者，在启动时创建、关闭时销毁，
//! 以 `Arc<ControlPanel>` 的形式注入到每个需要它的组件（IPC commands、后台任务）。
//!
//! 它组合了：
//! - [`ConfigCache`] - 远端配置树的本地镜像
//! - [`ProfileManager`] - 配置组集合与激活索引
//! - [`OptimisticExecutor`] - 功能开关的乐观更新
//! - [`StatusPoller`] - 只读状态快照的后台轮询
//! - [`Notifier`] - 面向用户的通知出口
//!
//! ## 保存后的缓存同步
//! 远端保存接口只返回成功与否，保存成功后按 [`ReloadPolicy`] 同步缓存：
//! - `Always`（默认）：重新拉取完整配置树
//! - `ApplyLocally`：把本次提交的点分路径直接写入本地缓存
//!
//! ## 关闭
//! `shutdown()` 或 `Drop` 会取消共享的 `CancellationToken`：
//! 轮询循环随之结束，所有经由面板发出的在途网关请求以 `Cancelled` 结束且不再通知用户。

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::error::PanelError;
use crate::models::catalog::ModelCatalog;
use crate::models::config::{ACTIVE_INDEX_PATH, ConfigurationTree, PROFILES_PATH};
use crate::models::notification::Notification;
use crate::models::profile::{
    AiConfigPayload, ChatSettings, DrawingSettings, Profile, ProfileDefaults, ProfileFields,
};
use crate::models::settings::{PanelSettings, ReloadPolicy};
use crate::models::status::StatusSnapshot;
use crate::services::cache::ConfigCache;
use crate::services::gateway::{Gateway, GatewayError, HttpGateway, RemoteApi};
use crate::services::notify::Notifier;
use crate::services::optimistic::{OptimisticExecutor, Outcome};
use crate::services::poller::StatusPoller;
use crate::services::profiles::{ProfileCollection, ProfileManager};

/// 配置树中的重启钩子地址
const RESTART_WEBHOOK_PATH: &str = "webapp.render_webhook_url";

/// 控制面板
pub struct ControlPanel {
    settings: PanelSettings,
    remote: RemoteApi,
    cache: ConfigCache,
    profiles: ProfileManager,
    toggles: OptimisticExecutor<bool>,
    poller: Arc<StatusPoller>,
    notifier: Arc<dyn Notifier>,
    shutdown: CancellationToken,
}

impl ControlPanel {
    /// 使用给定的网关创建面板
    pub fn new(
        settings: PanelSettings,
        gateway: Arc<dyn Gateway>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let shutdown = CancellationToken::new();
        let remote = RemoteApi::new(gateway, shutdown.clone());
        let poller = Arc::new(StatusPoller::new(
            remote.clone(),
            Arc::clone(&notifier),
            Duration::from_secs(settings.poll_interval_secs.max(1)),
            &shutdown,
        ));

        Self {
            cache: ConfigCache::new(remote.clone()),
            profiles: ProfileManager::new(settings.profile_label.clone(), ProfileDefaults::default()),
            toggles: OptimisticExecutor::new(Arc::clone(&notifier)),
            poller,
            remote,
            notifier,
            shutdown,
            settings,
        }
    }

    /// 根据面板设置创建基于 HTTP 的面板
    ///
    /// # 错误
    /// HTTP 客户端创建失败时返回错误
    pub fn from_settings(
        settings: PanelSettings,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, PanelError> {
        let gateway = HttpGateway::new(
            &settings.api_base_url,
            Duration::from_secs(settings.request_timeout_secs),
        )?;
        log::info!("面板已连接到 {}", settings.api_base_url);
        Ok(Self::new(settings, Arc::new(gateway), notifier))
    }

    pub fn settings(&self) -> &PanelSettings {
        &self.settings
    }

    /// 面板启动：加载配置并启动状态轮询
    ///
    /// 配置加载失败不会阻止轮询启动，错误已通过通知呈现给用户。
    pub async fn startup(&self) {
        let _ = self.load_config().await;
        self.poller.start();
    }

    /// 关闭面板：取消在途请求并等待轮询结束
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        self.poller.stop().await;
        log::info!("面板已关闭");
    }

    pub fn is_shut_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    // ============ 配置缓存 ============

    /// 从远端加载配置树，并同步配置组和功能开关
    pub async fn load_config(&self) -> Result<ConfigurationTree, PanelError> {
        match self.cache.load().await {
            Ok(tree) => {
                self.profiles.hydrate(&tree);
                self.sync_feature_flags();
                Ok(tree)
            }
            Err(e) => {
                self.report("加载配置", &e);
                Err(e.into())
            }
        }
    }

    /// 按点分路径读取配置，缺失时返回默认值
    pub fn get(&self, dotted: &str) -> Value {
        self.cache.get(dotted)
    }

    /// 当前配置树副本；尚未加载成功时为 None
    pub fn config_snapshot(&self) -> Option<ConfigurationTree> {
        self.cache.snapshot()
    }

    /// 保存点分路径的部分更新
    ///
    /// 成功后按保存策略同步缓存。
    pub async fn save_config(&self, updates: BTreeMap<String, Value>) -> Result<(), PanelError> {
        if updates.is_empty() {
            return Ok(());
        }
        match self.cache.save(&updates).await {
            Ok(message) => {
                self.notifier
                    .notify(Notification::success(message.unwrap_or_else(|| "配置已保存".to_string())));
                self.after_save(&updates).await;
                Ok(())
            }
            Err(e) => {
                self.report("保存", &e);
                Err(e.into())
            }
        }
    }

    /// 让远端从环境变量重置配置，随后丢弃本地未保存的配置组修改并重新加载
    pub async fn reset_config(&self) -> Result<(), PanelError> {
        match self.remote.reset_config().await {
            Ok(message) => {
                self.notifier
                    .notify(Notification::success(message.unwrap_or_else(|| "配置已重置".to_string())));
                let tree = self.load_config().await?;
                self.profiles.discard_changes(&tree);
                Ok(())
            }
            Err(e) => {
                self.report("重置配置", &e);
                Err(e.into())
            }
        }
    }

    /// 更新欢迎消息模板
    pub async fn update_welcome_message(&self, message: &str) -> Result<(), PanelError> {
        match self.remote.update_welcome_message(message).await {
            Ok(reply) => {
                self.notifier
                    .notify(Notification::success(reply.unwrap_or_else(|| "欢迎消息已更新".to_string())));
                let mut updates = BTreeMap::new();
                updates.insert(
                    "features.welcome_message.message".to_string(),
                    Value::String(message.to_string()),
                );
                self.after_save(&updates).await;
                Ok(())
            }
            Err(e) => {
                self.report("更新欢迎消息", &e);
                Err(e.into())
            }
        }
    }

    // ============ 配置组 ============

    /// 当前配置组集合的副本
    pub fn profiles(&self) -> ProfileCollection {
        self.profiles.snapshot()
    }

    pub fn active_profile(&self) -> Profile {
        self.profiles.active()
    }

    /// 配置组是否有未保存的修改
    pub fn has_unsaved_profiles(&self) -> bool {
        self.profiles.is_dirty()
    }

    /// 追加并激活一个新配置组
    pub fn add_profile(&self) -> usize {
        self.profiles.add_profile()
    }

    /// 删除配置组，失败时发出警告
    pub fn remove_profile(&self, index: usize) -> Result<(), PanelError> {
        self.profiles.remove_profile(index).map_err(|e| {
            self.notifier.notify(Notification::warning(e.to_string()));
            e.into()
        })
    }

    /// 切换激活配置组，失败时发出警告
    pub fn select_profile(&self, index: usize) -> Result<(), PanelError> {
        self.profiles.select_profile(index).map_err(|e| {
            self.notifier.notify(Notification::warning(e.to_string()));
            e.into()
        })
    }

    /// 覆盖激活配置组的字段（仅本地，等待 `save_ai_config`）
    pub fn update_active_fields(&self, fields: &ProfileFields) {
        self.profiles.update_active_fields(fields);
    }

    /// 一次性保存配置组集合以及绘画/聊天设置
    ///
    /// 请求体在发请求的那一刻由当前状态构建。成功后同步缓存并刷新状态。
    pub async fn save_ai_config(
        &self,
        drawing: Option<DrawingSettings>,
        chat: Option<ChatSettings>,
    ) -> Result<(), PanelError> {
        let payload = self.profiles.build_payload(drawing, chat);
        match self.remote.post_ai_config(&payload).await {
            Ok(message) => {
                self.profiles.mark_saved(&payload);
                self.notifier
                    .notify(Notification::success(message.unwrap_or_else(|| "AI 配置已更新".to_string())));
                self.after_save(&ai_config_updates(&payload)).await;
                self.refresh_status_quietly().await;
                Ok(())
            }
            Err(e) => {
                self.report("保存 AI 配置", &e);
                Err(e.into())
            }
        }
    }

    /// 使用激活配置组的凭据获取供应商的模型列表
    ///
    /// 激活配置组没有 API Key 时不发请求，发出警告。
    pub async fn list_models(&self, provider: &str) -> Result<ModelCatalog, PanelError> {
        let active = self.profiles.active();
        if active.api_key.trim().is_empty() {
            let message = "请先填写 API Key".to_string();
            self.notifier.notify(Notification::warning(message.clone()));
            return Err(PanelError::MissingInput(message));
        }

        match self
            .remote
            .list_models(provider, &active.api_key, &active.api_base_url)
            .await
        {
            Ok(catalog) => {
                self.notifier.notify(Notification::success(format!(
                    "已获取 {} 个模型",
                    catalog.models.len()
                )));
                Ok(catalog)
            }
            Err(e) => {
                self.report("获取模型列表", &e);
                Err(e.into())
            }
        }
    }

    // ============ 功能开关 ============

    /// 功能开关当前的显示值
    pub fn feature_enabled(&self, feature: &str) -> bool {
        self.toggles
            .displayed(feature)
            .unwrap_or_else(|| self.cache.get_bool(&enabled_path(feature)))
    }

    /// 所有功能开关的显示值
    pub fn feature_flags(&self) -> BTreeMap<String, bool> {
        let mut flags = self.cache.feature_flags();
        flags.extend(self.toggles.displayed_all());
        flags
    }

    /// 乐观地切换功能开关
    ///
    /// 显示值在发出请求之前立即改为 `enabled`；远端确认后保留（以确认值为准）并刷新状态，
    /// 失败时回滚到最近一次确认的值。
    ///
    /// 远端接口是"取反"操作，因此显示值（包括在途修改的乐观值）已等于 `enabled` 时不发请求，
    /// 只有与当前显示值不同的请求才会发出并取代在途修改。
    pub async fn toggle_feature(&self, feature: &str, enabled: bool) -> Outcome<bool> {
        let confirmed = self.cache.get_bool(&enabled_path(feature));
        if self.feature_enabled(feature) == enabled {
            log::debug!("功能 {} 已处于目标状态 {}，跳过切换", feature, enabled);
            return Outcome::Committed(enabled);
        }

        let outcome = self
            .toggles
            .apply(feature, enabled, confirmed, || self.remote.toggle_feature(feature))
            .await;

        if let Outcome::Committed(value) = &outcome {
            log::info!("功能 {} 已切换为 {}", feature, value);
            self.refresh_status_quietly().await;
        }
        outcome
    }

    // ============ 状态 ============

    /// 最近一次成功拉取的状态快照
    pub fn status(&self) -> Option<StatusSnapshot> {
        self.poller.snapshot()
    }

    /// 立即刷新状态快照
    pub async fn refresh_status(&self) -> Result<bool, PanelError> {
        self.poller.refresh_now().await.map_err(|e| {
            self.report("更新状态", &e);
            e.into()
        })
    }

    pub fn is_polling(&self) -> bool {
        self.poller.is_running()
    }

    // ============ 部署 ============

    /// 触发重启钩子
    ///
    /// 钩子地址优先取配置树中的 `webapp.render_webhook_url`，其次取面板设置。
    pub fn trigger_restart(&self) -> Result<(), PanelError> {
        let from_tree = self.cache.get_str(RESTART_WEBHOOK_PATH);
        let url = Some(from_tree.trim().to_string())
            .filter(|url| !url.is_empty())
            .or_else(|| {
                self.settings
                    .restart_webhook_url
                    .as_deref()
                    .map(str::trim)
                    .filter(|url| !url.is_empty())
                    .map(str::to_string)
            });

        let Some(url) = url else {
            let message = "请先配置重启 Webhook URL".to_string();
            self.notifier.notify(Notification::warning(message.clone()));
            return Err(PanelError::MissingInput(message));
        };

        self.remote.fire_webhook(url);
        self.notifier.notify(Notification::success("重启请求已发送"));
        Ok(())
    }

    /// 触发远端服务重新部署（发出即不管）
    pub fn trigger_redeploy(&self) {
        self.remote.trigger_redeploy();
        self.notifier.notify(Notification::info("重新部署请求已发送"));
    }

    // ============ 内部 ============

    /// 保存成功后按策略同步缓存
    async fn after_save(&self, updates: &BTreeMap<String, Value>) {
        match self.settings.reload_after_save {
            ReloadPolicy::Always => {
                let _ = self.load_config().await;
            }
            ReloadPolicy::ApplyLocally => {
                self.cache.apply_local(updates);
                self.sync_feature_flags();
            }
        }
    }

    /// 用缓存中的真实值同步功能开关
    fn sync_feature_flags(&self) {
        for (feature, enabled) in self.cache.feature_flags() {
            self.toggles.sync(&feature, enabled);
        }
    }

    /// 刷新状态，失败只记录日志
    async fn refresh_status_quietly(&self) {
        if let Err(e) = self.poller.refresh_now().await {
            log::warn!("刷新状态失败: {}", e);
        }
    }

    /// 把网关错误呈现给用户；面板关闭导致的取消不打扰用户
    fn report(&self, action: &str, error: &GatewayError) {
        match error {
            GatewayError::Cancelled => log::debug!("{}已取消", action),
            _ => {
                log::warn!("{}失败: {}", action, error);
                self.notifier.notify(Notification::error(error.user_message(action)));
            }
        }
    }
}

impl Drop for ControlPanel {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// 功能开关在配置树中的路径
fn enabled_path(feature: &str) -> String {
    format!("features.{}.enabled", feature)
}

/// 把 AI 配置请求体展开为点分路径更新，与远端的写入位置一致
fn ai_config_updates(payload: &AiConfigPayload) -> BTreeMap<String, Value> {
    let mut updates = BTreeMap::new();
    if let Ok(profiles) = serde_json::to_value(&payload.openai_configs) {
        updates.insert(PROFILES_PATH.to_string(), profiles);
    }
    updates.insert(
        ACTIVE_INDEX_PATH.to_string(),
        Value::from(payload.active_openai_config_index),
    );

    let sections = [
        ("ai_services.drawing", payload.drawing.as_ref().and_then(|d| serde_json::to_value(d).ok())),
        ("features.chat", payload.chat.as_ref().and_then(|c| serde_json::to_value(c).ok())),
    ];
    for (prefix, section) in sections {
        if let Some(Value::Object(fields)) = section {
            for (key, value) in fields {
                updates.insert(format!("{}.{}", prefix, key), value);
            }
        }
    }
    updates
}
