//! # 本地配置缓存服务
//!
//! 远端配置树在面板内存中的镜像，是两次拉取之间界面读取配置的唯一来源：
//! - **加载**：整体替换（不合并），可重复调用
//! - **读取**：按点分路径读取，缺失路径回退到文档化默认值，永不失败
//! - **保存**：把点分路径的部分更新发给远端；本身不刷新缓存，刷新策略由面板决定
//!
//! ## 失败语义
//! 加载失败时保留上一次成功加载的内容，界面可以继续显示最后已知的正确状态。
//!
//! ## 并发加载
//! 每次加载在发出请求前领取一个递增序号，只有序号大于已应用序号的结果才会写入缓存，
//! 较早发出但较晚到达的响应不会覆盖较新的配置。
//!
//! ## 线程安全
//! 使用 `std::sync::RwLock` 保护配置树，锁从不跨越 `.await` 持有。

use std::collections::BTreeMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::{Map, Value};

use crate::models::config::{ConfigurationTree, default_for};
use crate::services::gateway::{GatewayError, RemoteApi};
use crate::utils::path;

/// 本地配置缓存
pub struct ConfigCache {
    remote: RemoteApi,
    /// 缓存条目：尚未成功加载过时为 None
    entry: RwLock<Option<CacheEntry>>,
    /// 下一次加载使用的序号
    next_seq: AtomicU64,
}

/// 缓存条目
struct CacheEntry {
    /// 配置树
    tree: ConfigurationTree,
    /// 产生该配置树的加载序号
    seq: u64,
}

impl ConfigCache {
    /// 创建尚未加载的空缓存
    pub fn new(remote: RemoteApi) -> Self {
        Self {
            remote,
            entry: RwLock::new(None),
            next_seq: AtomicU64::new(1),
        }
    }

    /// 从远端拉取完整配置树并整体替换缓存
    ///
    /// # 返回值
    /// 加载完成后缓存中的配置树；若本次响应被更新的加载取代，返回那份更新的配置树
    ///
    /// # 错误
    /// 网关错误原样返回，缓存内容保持不变
    pub async fn load(&self) -> Result<ConfigurationTree, GatewayError> {
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        let tree = self.remote.fetch_config().await?;

        let Ok(mut entry) = self.entry.write() else {
            return Ok(tree);
        };
        if let Some(current) = entry.as_ref().filter(|current| current.seq > seq) {
            log::debug!("丢弃过期的配置加载结果 (#{} < #{})", seq, current.seq);
            return Ok(current.tree.clone());
        }

        *entry = Some(CacheEntry {
            tree: tree.clone(),
            seq,
        });
        log::info!("配置已从远端加载 (#{})", seq);
        Ok(tree)
    }

    /// 缓存是否已成功加载过
    pub fn is_loaded(&self) -> bool {
        self.entry.read().map(|e| e.is_some()).unwrap_or(false)
    }

    /// 当前配置树的副本
    pub fn snapshot(&self) -> Option<ConfigurationTree> {
        let entry = self.entry.read().ok()?;
        entry.as_ref().map(|e| e.tree.clone())
    }

    /// 按点分路径读取配置
    ///
    /// 路径缺失或值为 `null` 时返回文档化的默认值；没有默认值的路径返回 `null`。
    pub fn get(&self, dotted: &str) -> Value {
        let found = self.entry.read().ok().and_then(|entry| {
            entry
                .as_ref()
                .and_then(|e| path::lookup(&e.tree, dotted))
                .filter(|value| !value.is_null())
                .cloned()
        });
        found
            .or_else(|| default_for(dotted))
            .unwrap_or(Value::Null)
    }

    /// 读取字符串配置，类型不符时回退到默认值或空字符串
    pub fn get_str(&self, dotted: &str) -> String {
        match self.get(dotted) {
            Value::String(s) => s,
            _ => default_for(dotted)
                .and_then(|v| v.as_str().map(str::to_string))
                .unwrap_or_default(),
        }
    }

    /// 读取整数配置，兼容以字符串保存的数字
    pub fn get_i64(&self, dotted: &str) -> i64 {
        let value = self.get(dotted);
        value
            .as_i64()
            .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
            .or_else(|| default_for(dotted).and_then(|v| v.as_i64()))
            .unwrap_or(0)
    }

    /// 读取浮点配置，兼容以字符串保存的数字
    pub fn get_f64(&self, dotted: &str) -> f64 {
        let value = self.get(dotted);
        value
            .as_f64()
            .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
            .or_else(|| default_for(dotted).and_then(|v| v.as_f64()))
            .unwrap_or(0.0)
    }

    /// 读取布尔配置
    pub fn get_bool(&self, dotted: &str) -> bool {
        self.get(dotted).as_bool().unwrap_or(false)
    }

    /// 读取 `features` 下每个功能的 `enabled` 状态
    pub fn feature_flags(&self) -> BTreeMap<String, bool> {
        let Some(tree) = self.snapshot() else {
            return BTreeMap::new();
        };
        path::lookup(&tree, "features")
            .and_then(Value::as_object)
            .map(|features| {
                features
                    .iter()
                    .map(|(name, settings)| {
                        let enabled = settings
                            .get("enabled")
                            .and_then(Value::as_bool)
                            .unwrap_or(false);
                        (name.clone(), enabled)
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// 把点分路径的部分更新提交到远端
    ///
    /// 不刷新本地缓存，调用方根据保存策略决定重新加载或 `apply_local`。
    ///
    /// # 返回值
    /// 远端返回的提示信息（如果有）
    pub async fn save(&self, updates: &BTreeMap<String, Value>) -> Result<Option<String>, GatewayError> {
        self.remote.post_config(updates).await
    }

    /// 把点分路径的更新直接写入本地配置树
    ///
    /// 缓存尚未加载时以空对象为根创建配置树。
    pub fn apply_local(&self, updates: &BTreeMap<String, Value>) {
        if let Ok(mut entry) = self.entry.write() {
            let entry = entry.get_or_insert_with(|| CacheEntry {
                tree: Value::Object(Map::new()),
                seq: 0,
            });
            for (dotted, value) in updates {
                path::assign(&mut entry.tree, dotted, value.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::ScriptedGateway;
    use serde_json::json;
    use std::sync::Arc;
    use tokio_util::sync::CancellationToken;

    fn cache_with(gateway: &Arc<ScriptedGateway>) -> ConfigCache {
        ConfigCache::new(RemoteApi::new(gateway.clone(), CancellationToken::new()))
    }

    fn config_reply(tree: Value) -> Result<Value, GatewayError> {
        Ok(json!({"success": true, "config": tree}))
    }

    #[tokio::test]
    async fn test_load_replaces_instead_of_merging() {
        let gateway = ScriptedGateway::new();
        gateway.push("/config", config_reply(json!({"logging": {"level": "DEBUG"}, "webapp": {"port": 8080}})));
        gateway.push("/config", config_reply(json!({"logging": {"level": "WARNING"}})));
        let cache = cache_with(&gateway);

        cache.load().await.unwrap();
        assert_eq!(cache.get_i64("webapp.port"), 8080);

        cache.load().await.unwrap();
        assert_eq!(cache.get_str("logging.level"), "WARNING");
        // 第二份配置没有 webapp，整体替换后回退到默认值
        assert_eq!(cache.get_i64("webapp.port"), 5000);
    }

    #[tokio::test]
    async fn test_failed_load_keeps_previous_contents_byte_for_byte() {
        let gateway = ScriptedGateway::new();
        let original = json!({"features": {"chat": {"enabled": true, "model": "gpt-4o"}}});
        gateway.push("/config", config_reply(original.clone()));
        gateway.push("/config", Err(GatewayError::Transport("connection refused".into())));
        gateway.push("/config", Err(GatewayError::Remote("redis down".into())));
        let cache = cache_with(&gateway);

        cache.load().await.unwrap();
        let before = serde_json::to_string(&cache.snapshot().unwrap()).unwrap();

        assert!(cache.load().await.is_err());
        assert!(cache.load().await.is_err());
        let after = serde_json::to_string(&cache.snapshot().unwrap()).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn test_get_never_fails_before_load() {
        let gateway = ScriptedGateway::new();
        let cache = cache_with(&gateway);

        assert_eq!(cache.get_f64("ai_services.openai_configs.temperature"), 0.7);
        assert_eq!(cache.get_i64("features.drawing.daily_limit"), 10);
        assert_eq!(cache.get_str("ai_services.drawing.quality"), "standard");
        assert_eq!(cache.get_i64("features.auto_summary.min_messages"), 50);
        assert!(!cache.get_bool("features.chat.enabled"));
        assert_eq!(cache.get("telegram.bot_token"), Value::Null);
    }

    #[tokio::test]
    async fn test_stale_load_does_not_overwrite_newer_tree() {
        let gateway = ScriptedGateway::new();
        let first = gateway.push_gated("/config");
        gateway.push("/config", config_reply(json!({"logging": {"level": "ERROR"}})));
        let cache = cache_with(&gateway);

        let (stale, fresh) = tokio::join!(cache.load(), async {
            let fresh = cache.load().await;
            first
                .send(config_reply(json!({"logging": {"level": "DEBUG"}})))
                .unwrap();
            fresh
        });

        assert_eq!(fresh.unwrap()["logging"]["level"], json!("ERROR"));
        assert_eq!(stale.unwrap()["logging"]["level"], json!("ERROR"));
        assert_eq!(cache.get_str("logging.level"), "ERROR");
    }

    #[test]
    fn test_apply_local_writes_dotted_paths() {
        let gateway = ScriptedGateway::new();
        let cache = cache_with(&gateway);

        let mut updates = BTreeMap::new();
        updates.insert("features.history.cleanup_retention_days".to_string(), json!(7));
        updates.insert("logging.level".to_string(), json!("DEBUG"));
        cache.apply_local(&updates);

        assert!(cache.is_loaded());
        assert_eq!(cache.get_i64("features.history.cleanup_retention_days"), 7);
        assert_eq!(cache.get_str("logging.level"), "DEBUG");
    }

    #[tokio::test]
    async fn test_feature_flags_read_enabled_only() {
        let gateway = ScriptedGateway::new();
        gateway.push(
            "/config",
            config_reply(json!({"features": {
                "chat": {"enabled": true},
                "drawing": {"enabled": false, "daily_limit": 3},
                "welcome_message": {"message": "hi"}
            }})),
        );
        let cache = cache_with(&gateway);
        cache.load().await.unwrap();

        let flags = cache.feature_flags();
        assert_eq!(flags.get("chat"), Some(&true));
        assert_eq!(flags.get("drawing"), Some(&false));
        assert_eq!(flags.get("welcome_message"), Some(&false));
    }
}
