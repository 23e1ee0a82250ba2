//! # 面板本地设置持久化
//!
//! 面板自身的设置保存在 `~/.mo/BotPanel/panel-settings.json`：
//! - 文件不存在时返回默认设置（首次启动）
//! - 文件内容缺少的字段使用默认值
//! - 保存时使用 2 空格缩进的 JSON，目录不存在时自动创建

use std::path::{Path, PathBuf};

use crate::error::PanelError;
use crate::models::settings::PanelSettings;
use crate::utils::path;

/// 设置文件名
const SETTINGS_FILE: &str = "panel-settings.json";

/// 获取设置文件的绝对路径
pub fn settings_file_path() -> Result<PathBuf, PanelError> {
    let dir = path::get_panel_config_path().map_err(PanelError::Settings)?;
    Ok(dir.join(SETTINGS_FILE))
}

/// 读取面板设置并应用环境变量覆盖
///
/// # 错误
/// 文件存在但无法读取或 JSON 解析失败时返回错误
pub async fn read_panel_settings() -> Result<PanelSettings, PanelError> {
    let file = settings_file_path()?;
    Ok(read_settings_from(&file).await?.with_env_overrides())
}

/// 保存面板设置
pub async fn save_panel_settings(settings: &PanelSettings) -> Result<(), PanelError> {
    let file = settings_file_path()?;
    write_settings_to(&file, settings).await
}

/// 从指定文件读取设置，不应用环境变量覆盖
pub async fn read_settings_from(file: &Path) -> Result<PanelSettings, PanelError> {
    if !file.exists() {
        log::info!("面板设置文件不存在，使用默认设置: {}", file.display());
        return Ok(PanelSettings::default());
    }

    let content = tokio::fs::read_to_string(file)
        .await
        .map_err(|e| PanelError::Settings(format!("读取面板设置失败: {}", e)))?;

    serde_json::from_str(&content)
        .map_err(|e| PanelError::Settings(format!("解析面板设置失败: {}", e)))
}

/// 把设置写入指定文件，父目录不存在时自动创建
pub async fn write_settings_to(file: &Path, settings: &PanelSettings) -> Result<(), PanelError> {
    if let Some(parent) = file.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| PanelError::Settings(format!("创建设置目录失败: {}", e)))?;
    }

    let content = serde_json::to_string_pretty(settings)
        .map_err(|e| PanelError::Settings(format!("序列化面板设置失败: {}", e)))?;

    tokio::fs::write(file, content)
        .await
        .map_err(|e| PanelError::Settings(format!("写入面板设置失败: {}", e)))
}
