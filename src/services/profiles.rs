//! # 配置组集合管理服务
//!
//! 管理配置树中 `ai_services.openai_configs` 数组和激活索引。
//! 增删选改全部在内存中同步完成，持久化是调用方显式触发的一次批量保存，
//! 避免每次按键都产生网络往返。
//!
//! ## 不变式（每次操作后都成立）
//! 1. 集合非空时 `0 <= active_index < len`
//! 2. `len >= 1`：会清空集合的删除操作被拒绝
//! 3. 有且只有一个激活配置组，它就是当前绑定到编辑表单的那一个
//!
//! ## 删除后的索引重排
//! | 被删除的位置 | 新的激活索引 |
//! |--------------|--------------|
//! | 等于激活索引 | 0 |
//! | 小于激活索引 | 激活索引 - 1 |
//! | 大于激活索引 | 不变 |

use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::config::{ACTIVE_INDEX_PATH, ConfigurationTree, PROFILES_PATH};
use crate::models::profile::{
    AiConfigPayload, ChatSettings, DrawingSettings, Profile, ProfileDefaults, ProfileFields,
};
use crate::utils::path;

/// 配置组操作错误
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProfileError {
    /// 操作会破坏集合的不变式（如删除最后一个配置组）
    #[error("{0}")]
    InvariantViolation(String),

    /// 选择或删除的索引越界
    #[error("配置组索引 {index} 超出范围（共 {len} 个）")]
    IndexOutOfRange { index: usize, len: usize },
}

/// 配置组集合
///
/// 对应前端 TypeScript 接口：
/// ```typescript
/// interface ProfileCollection {
///   profiles: Profile[];
///   activeIndex: number;
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileCollection {
    profiles: Vec<Profile>,
    active_index: usize,
}

impl ProfileCollection {
    /// 只包含一个默认配置组（`"<label> 1"`）的集合
    pub fn with_default(label: &str, defaults: &ProfileDefaults) -> Self {
        Self {
            profiles: vec![Profile::named(format!("{} 1", label), defaults)],
            active_index: 0,
        }
    }

    /// 从配置树中读取配置组集合
    ///
    /// - 数组缺失、为空或无法解析 → 一个默认配置组
    /// - 单个条目无法解析 → 以默认值替代该条目
    /// - 激活索引缺失或越界 → 0
    pub fn from_tree(tree: &ConfigurationTree, label: &str, defaults: &ProfileDefaults) -> Self {
        let profiles: Vec<Profile> = path::lookup(tree, PROFILES_PATH)
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| {
                        let mut profile = serde_json::from_value::<Profile>(item.clone())
                            .unwrap_or_else(|e| {
                                log::warn!("配置组 #{} 解析失败，使用默认值: {}", i, e);
                                Profile::named(String::new(), defaults)
                            });
                        if profile.name.is_empty() {
                            profile.name = format!("{} {}", label, i + 1);
                        }
                        profile
                    })
                    .collect()
            })
            .unwrap_or_default();

        if profiles.is_empty() {
            return Self::with_default(label, defaults);
        }

        let active_index = path::lookup(tree, ACTIVE_INDEX_PATH)
            .and_then(|v| v.as_u64().or_else(|| v.as_str().and_then(|s| s.parse().ok())))
            .map(|i| i as usize)
            .filter(|&i| i < profiles.len())
            .unwrap_or(0);

        Self {
            profiles,
            active_index,
        }
    }

    pub fn profiles(&self) -> &[Profile] {
        &self.profiles
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    pub fn active_index(&self) -> usize {
        self.active_index
    }

    /// 当前激活的配置组
    pub fn active(&self) -> &Profile {
        &self.profiles[self.active_index]
    }

    /// 追加一个新配置组并激活它
    ///
    /// 名称为 `"<label> N"`，N 为追加后的配置组数量。
    ///
    /// # 返回值
    /// 新配置组的索引
    pub fn add(&mut self, label: &str, defaults: &ProfileDefaults) -> usize {
        let name = format!("{} {}", label, self.profiles.len() + 1);
        self.profiles.push(Profile::named(name, defaults));
        self.active_index = self.profiles.len() - 1;
        self.active_index
    }

    /// 删除指定位置的配置组并重排激活索引
    ///
    /// # 错误
    /// - 只剩一个配置组时返回 `InvariantViolation`，集合不变
    /// - 索引越界时返回 `IndexOutOfRange`，集合不变
    pub fn remove(&mut self, index: usize) -> Result<(), ProfileError> {
        if self.profiles.len() <= 1 {
            return Err(ProfileError::InvariantViolation(
                "至少需要保留一个配置组".to_string(),
            ));
        }
        if index >= self.profiles.len() {
            return Err(ProfileError::IndexOutOfRange {
                index,
                len: self.profiles.len(),
            });
        }

        self.profiles.remove(index);
        if index == self.active_index {
            self.active_index = 0;
        } else if index < self.active_index {
            self.active_index -= 1;
        }
        Ok(())
    }

    /// 切换激活配置组
    ///
    /// # 错误
    /// 索引越界时返回 `IndexOutOfRange`，激活索引不变
    pub fn select(&mut self, index: usize) -> Result<(), ProfileError> {
        if index >= self.profiles.len() {
            return Err(ProfileError::IndexOutOfRange {
                index,
                len: self.profiles.len(),
            });
        }
        self.active_index = index;
        Ok(())
    }

    /// 用表单字段覆盖激活配置组
    pub fn update_active(&mut self, fields: &ProfileFields) {
        let active = self.active_index;
        self.profiles[active].apply(fields);
    }
}

/// 配置组管理器内部状态
struct ManagerState {
    collection: ProfileCollection,
    /// 是否有尚未保存到远端的本地修改
    dirty: bool,
}

/// 配置组集合管理器
///
/// 在 [`ProfileCollection`] 之上增加：
/// - 线程安全的内部可变性（`std::sync::Mutex`，锁从不跨越 `.await`）
/// - 未保存修改（dirty）标记
/// - 名称前缀和供应商默认值
pub struct ProfileManager {
    state: Mutex<ManagerState>,
    label: String,
    defaults: ProfileDefaults,
}

impl ProfileManager {
    pub fn new(label: impl Into<String>, defaults: ProfileDefaults) -> Self {
        let label = label.into();
        let collection = ProfileCollection::with_default(&label, &defaults);
        Self {
            state: Mutex::new(ManagerState {
                collection,
                dirty: false,
            }),
            label,
            defaults,
        }
    }

    /// 从配置树重新载入配置组集合
    ///
    /// 有未保存的本地修改时不覆盖，返回 false。
    pub fn hydrate(&self, tree: &ConfigurationTree) -> bool {
        let Ok(mut state) = self.state.lock() else {
            return false;
        };
        if state.dirty {
            log::info!("存在未保存的配置组修改，跳过从远端配置重新载入");
            return false;
        }
        state.collection = ProfileCollection::from_tree(tree, &self.label, &self.defaults);
        true
    }

    /// 强制从配置树重新载入，丢弃未保存的本地修改
    pub fn discard_changes(&self, tree: &ConfigurationTree) {
        if let Ok(mut state) = self.state.lock() {
            state.collection = ProfileCollection::from_tree(tree, &self.label, &self.defaults);
            state.dirty = false;
        }
    }

    /// 当前配置组集合的副本
    pub fn snapshot(&self) -> ProfileCollection {
        match self.state.lock() {
            Ok(state) => state.collection.clone(),
            Err(_) => ProfileCollection::with_default(&self.label, &self.defaults),
        }
    }

    /// 当前激活的配置组
    pub fn active(&self) -> Profile {
        self.snapshot().active().clone()
    }

    pub fn is_dirty(&self) -> bool {
        self.state.lock().map(|s| s.dirty).unwrap_or(false)
    }

    /// 追加并激活一个新配置组
    pub fn add_profile(&self) -> usize {
        self.mutate(|c| Ok(c.add(&self.label, &self.defaults)))
            .unwrap_or_default()
    }

    /// 删除配置组
    pub fn remove_profile(&self, index: usize) -> Result<(), ProfileError> {
        self.mutate(|c| c.remove(index))
    }

    /// 切换激活配置组
    pub fn select_profile(&self, index: usize) -> Result<(), ProfileError> {
        self.mutate(|c| c.select(index))
    }

    /// 覆盖激活配置组的字段（仅本地，等待显式保存）
    pub fn update_active_fields(&self, fields: &ProfileFields) {
        let _ = self.mutate(|c| {
            c.update_active(fields);
            Ok(())
        });
    }

    /// 以当前状态构建 `POST /ai_config` 请求体
    ///
    /// 必须在发请求的那一刻调用，读取的是当时最新的集合而非更早的快照。
    pub fn build_payload(
        &self,
        drawing: Option<DrawingSettings>,
        chat: Option<ChatSettings>,
    ) -> AiConfigPayload {
        let collection = self.snapshot();
        AiConfigPayload {
            active_openai_config_index: collection.active_index(),
            openai_configs: collection.profiles,
            drawing,
            chat,
        }
    }

    /// 保存成功后清除 dirty 标记
    ///
    /// 只有当前集合与已保存的请求体一致时才清除；
    /// 保存请求在途期间用户又做了修改的，保持 dirty。
    pub fn mark_saved(&self, payload: &AiConfigPayload) -> bool {
        let Ok(mut state) = self.state.lock() else {
            return false;
        };
        let unchanged = state.collection.profiles == payload.openai_configs
            && state.collection.active_index == payload.active_openai_config_index;
        if unchanged {
            state.dirty = false;
        }
        unchanged
    }

    /// 在锁内执行一次修改，成功时标记 dirty
    fn mutate<T>(
        &self,
        op: impl FnOnce(&mut ProfileCollection) -> Result<T, ProfileError>,
    ) -> Result<T, ProfileError> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| ProfileError::InvariantViolation("配置组状态不可用".to_string()))?;
        let result = op(&mut state.collection)?;
        state.dirty = true;
        Ok(result)
    }
}
