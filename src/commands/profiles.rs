//! # 配置组 Tauri Commands
//!
//! 增删选改都只修改本地集合并立即返回最新集合，
//! 由 `save_ai_config` 一次性提交到远端。

use std::sync::Arc;

use tauri::State;

use crate::models::catalog::ModelCatalog;
use crate::models::profile::{ChatSettings, DrawingSettings, ProfileFields};
use crate::services::panel::ControlPanel;
use crate::services::profiles::ProfileCollection;

#[tauri::command]
pub fn get_profiles(panel: State<'_, Arc<ControlPanel>>) -> ProfileCollection {
    panel.profiles()
}

/// 追加并激活一个新配置组
#[tauri::command]
pub fn add_profile(panel: State<'_, Arc<ControlPanel>>) -> ProfileCollection {
    panel.add_profile();
    panel.profiles()
}

/// 删除配置组
///
/// # 错误
/// 删除最后一个配置组或索引越界时返回错误文本，集合保持不变
#[tauri::command]
pub fn remove_profile(
    panel: State<'_, Arc<ControlPanel>>,
    index: usize,
) -> Result<ProfileCollection, String> {
    panel.remove_profile(index).map_err(|e| e.to_string())?;
    Ok(panel.profiles())
}

#[tauri::command]
pub fn select_profile(
    panel: State<'_, Arc<ControlPanel>>,
    index: usize,
) -> Result<ProfileCollection, String> {
    panel.select_profile(index).map_err(|e| e.to_string())?;
    Ok(panel.profiles())
}

/// 覆盖激活配置组的字段（仅本地）
#[tauri::command]
pub fn update_active_profile(
    panel: State<'_, Arc<ControlPanel>>,
    fields: ProfileFields,
) -> ProfileCollection {
    panel.update_active_fields(&fields);
    panel.profiles()
}

/// 保存配置组集合以及绘画/聊天设置
#[tauri::command]
pub async fn save_ai_config(
    panel: State<'_, Arc<ControlPanel>>,
    drawing: Option<DrawingSettings>,
    chat: Option<ChatSettings>,
) -> Result<ProfileCollection, String> {
    panel
        .save_ai_config(drawing, chat)
        .await
        .map_err(|e| e.to_string())?;
    Ok(panel.profiles())
}

/// 使用激活配置组的凭据获取模型列表
#[tauri::command]
pub async fn list_models(
    panel: State<'_, Arc<ControlPanel>>,
    provider: String,
) -> Result<ModelCatalog, String> {
    panel.list_models(&provider).await.map_err(|e| e.to_string())
}
