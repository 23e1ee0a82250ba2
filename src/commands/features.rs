//! # 功能开关与状态 Tauri Commands
//!
//! - `toggle_feature` - 乐观切换功能开关，返回结算后的显示值
//! - `get_status` / `refresh_status` - 读取或立即刷新状态快照
//! - `trigger_restart` / `trigger_redeploy` - 部署相关的发出即不管操作

use std::collections::BTreeMap;
use std::sync::Arc;

use tauri::State;

use crate::models::status::StatusSnapshot;
use crate::services::panel::ControlPanel;

#[tauri::command]
pub fn get_feature_flags(panel: State<'_, Arc<ControlPanel>>) -> BTreeMap<String, bool> {
    panel.feature_flags()
}

/// 切换功能开关
///
/// 前端在调用前已把开关画成新值；返回值是结算后应显示的值
/// （成功时为远端确认值，失败时为回滚后的值，被后续切换取代时为当前显示值）。
#[tauri::command]
pub async fn toggle_feature(
    panel: State<'_, Arc<ControlPanel>>,
    feature: String,
    enabled: bool,
) -> Result<bool, String> {
    panel.toggle_feature(&feature, enabled).await;
    Ok(panel.feature_enabled(&feature))
}

#[tauri::command]
pub fn get_status(panel: State<'_, Arc<ControlPanel>>) -> Option<StatusSnapshot> {
    panel.status()
}

/// 立即刷新状态快照
#[tauri::command]
pub async fn refresh_status(
    panel: State<'_, Arc<ControlPanel>>,
) -> Result<Option<StatusSnapshot>, String> {
    panel.refresh_status().await.map_err(|e| e.to_string())?;
    Ok(panel.status())
}

#[tauri::command]
pub fn trigger_restart(panel: State<'_, Arc<ControlPanel>>) -> Result<(), String> {
    panel.trigger_restart().map_err(|e| e.to_string())
}

#[tauri::command]
pub fn trigger_redeploy(panel: State<'_, Arc<ControlPanel>>) {
    panel.trigger_redeploy();
}
