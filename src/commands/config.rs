//! # 配置缓存 Tauri Commands
//!
//! - `load_config` - 从远端重新加载配置树
//! - `get_config_value` - 按点分路径读取配置（缺失时返回默认值）
//! - `save_config` - 保存点分路径的部分更新
//! - `reset_config` - 让远端从环境变量重置配置
//! - `update_welcome_message` - 更新欢迎消息模板
//! - `read_panel_settings` / `save_panel_settings` - 读写面板本地设置

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use tauri::State;

use crate::models::settings::PanelSettings;
use crate::services::panel::ControlPanel;
use crate::services::settings as panel_settings;

/// 从远端重新加载配置树
///
/// # 返回值
/// 加载后的完整配置树
///
/// # 错误
/// 网关错误的文本（同一错误已通过通知事件呈现给用户）
#[tauri::command]
pub async fn load_config(panel: State<'_, Arc<ControlPanel>>) -> Result<Value, String> {
    panel.load_config().await.map_err(|e| e.to_string())
}

/// 按点分路径读取配置
#[tauri::command]
pub fn get_config_value(panel: State<'_, Arc<ControlPanel>>, path: String) -> Value {
    panel.get(&path)
}

/// 保存点分路径的部分更新
///
/// # 参数
/// - `updates` - 点分路径到新值的映射（如 `{"logging.level": "DEBUG"}`）
#[tauri::command]
pub async fn save_config(
    panel: State<'_, Arc<ControlPanel>>,
    updates: BTreeMap<String, Value>,
) -> Result<(), String> {
    panel.save_config(updates).await.map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn reset_config(panel: State<'_, Arc<ControlPanel>>) -> Result<(), String> {
    panel.reset_config().await.map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn update_welcome_message(
    panel: State<'_, Arc<ControlPanel>>,
    message: String,
) -> Result<(), String> {
    panel
        .update_welcome_message(&message)
        .await
        .map_err(|e| e.to_string())
}

/// 读取面板本地设置（文件不存在时返回默认设置）
#[tauri::command]
pub async fn read_panel_settings() -> Result<PanelSettings, String> {
    panel_settings::read_panel_settings()
        .await
        .map_err(|e| e.to_string())
}

/// 保存面板本地设置
///
/// 新设置在下次启动面板时生效。
#[tauri::command]
pub async fn save_panel_settings(settings: PanelSettings) -> Result<(), String> {
    panel_settings::save_panel_settings(&settings)
        .await
        .map_err(|e| e.to_string())
}
