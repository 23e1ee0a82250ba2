//! # Bot Control Panel - 面板核心库
//!
//! 远端机器人的配置/功能开关控制面板。核心是：
//! - 远端配置树的本地缓存（编辑期间与远端保持一致）
//! - 多配置组集合（增删选改始终保持唯一且有效的激活索引）
//! - 带回滚的乐观功能开关，与固定周期的后台状态刷新并发运行
//!
//! ## 架构说明
//! 全部逻辑位于库中，`main.rs` 只负责启动。Tauri 外壳（窗口、IPC commands、日志插件）
//! 只在启用 `desktop` feature 时编译，核心库和测试不依赖 webview 工具链。
//!
//! ## 模块结构
//! - `commands/` - Tauri command 处理函数（IPC 接口层，`desktop`）
//! - `models/` - 数据模型（对应前端 TypeScript 类型与远端 JSON）
//! - `services/` - 核心业务逻辑（网关、缓存、配置组、乐观更新、轮询）
//! - `utils/` - 通用工具函数
//! - `error` - 面板错误类型

#[cfg(feature = "desktop")]
mod commands;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

pub use error::PanelError;
pub use services::gateway::{Gateway, GatewayError, HttpGateway};
pub use services::notify::{LogNotifier, Notifier, RecordingNotifier};
pub use services::panel::ControlPanel;

#[cfg(feature = "desktop")]
use std::sync::Arc;

#[cfg(feature = "desktop")]
use tauri::Manager;

// 移动端由运行时定位 `run()` 作为入口；桌面端由 `main.rs` 直接调用
#[cfg(feature = "desktop")]
#[cfg_attr(mobile, tauri::mobile_entry_point)]
/// Tauri 应用启动函数
///
/// 1. 在 `setup` 钩子中读取面板设置并创建 `ControlPanel`，注册为 managed state
/// 2. 后台加载配置并启动状态轮询（不阻塞窗口创建）
/// 3. 注册所有 IPC commands
/// 4. 应用退出时关闭面板：停止轮询、取消在途请求
///
/// # Panics
/// Tauri 应用启动失败（例如配置文件缺失或窗口创建失败）时触发 panic。
pub fn run() {
    tauri::Builder::default()
        .invoke_handler(tauri::generate_handler![
            // 配置缓存
            commands::config::load_config,
            commands::config::get_config_value,
            commands::config::save_config,
            commands::config::reset_config,
            commands::config::update_welcome_message,
            commands::config::read_panel_settings,
            commands::config::save_panel_settings,
            // 配置组
            commands::profiles::get_profiles,
            commands::profiles::add_profile,
            commands::profiles::remove_profile,
            commands::profiles::select_profile,
            commands::profiles::update_active_profile,
            commands::profiles::save_ai_config,
            commands::profiles::list_models,
            // 功能开关与状态
            commands::features::get_feature_flags,
            commands::features::toggle_feature,
            commands::features::get_status,
            commands::features::refresh_status,
            commands::features::trigger_restart,
            commands::features::trigger_redeploy,
        ])
        .setup(|app| {
            // 仅在开发调试模式下启用日志插件
            if cfg!(debug_assertions) {
                app.handle().plugin(
                    tauri_plugin_log::Builder::default()
                        .level(log::LevelFilter::Info)
                        .build(),
                )?;
            }

            let settings = tauri::async_runtime::block_on(services::settings::read_panel_settings())
                .unwrap_or_else(|e| {
                    log::warn!("{}，使用默认面板设置", e);
                    models::settings::PanelSettings::default().with_env_overrides()
                });
            let notifier = Arc::new(commands::events::TauriNotifier::new(app.handle().clone()));
            let panel = Arc::new(ControlPanel::from_settings(settings, notifier)?);
            app.manage(Arc::clone(&panel));

            tauri::async_runtime::spawn(async move { panel.startup().await });
            Ok(())
        })
        .build(tauri::generate_context!())
        .expect("error while building tauri application")
        .run(|app, event| {
            if let tauri::RunEvent::Exit = event {
                if let Some(panel) = app.try_state::<Arc<ControlPanel>>() {
                    tauri::async_runtime::block_on(panel.shutdown());
                }
            }
        });
}
