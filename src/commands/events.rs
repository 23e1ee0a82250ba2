//! # 前端事件通知
//!
//! 把面板核心发出的通知转发为 Tauri 事件，由前端的 toast 组件和状态卡片订阅：
//! - `panel://notification` - 一条用户通知（`Notification`）
//! - `panel://status` - 状态快照已被整体替换（`StatusSnapshot`）

use tauri::{AppHandle, Emitter};

use crate::models::notification::Notification;
use crate::models::status::StatusSnapshot;
use crate::services::notify::Notifier;

const NOTIFICATION_EVENT: &str = "panel://notification";
const STATUS_EVENT: &str = "panel://status";

/// 基于 Tauri 事件的通知实现
pub struct TauriNotifier {
    app: AppHandle,
}

impl TauriNotifier {
    pub fn new(app: AppHandle) -> Self {
        Self { app }
    }
}

impl Notifier for TauriNotifier {
    fn notify(&self, notification: Notification) {
        if let Err(e) = self.app.emit(NOTIFICATION_EVENT, &notification) {
            log::warn!("发送通知事件失败: {} ({})", e, notification.message);
        }
    }

    fn status_updated(&self, snapshot: &StatusSnapshot) {
        if let Err(e) = self.app.emit(STATUS_EVENT, snapshot) {
            log::warn!("发送状态事件失败: {}", e);
        }
    }
}
