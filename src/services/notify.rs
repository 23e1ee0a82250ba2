//! # 用户通知服务
//!
//! 面板核心不直接操作界面，所有需要让用户看到的信息都通过 [`Notifier`] trait 发出：
//! - `notify` - 成功/失败/警告 toast
//! - `status_updated` - 状态快照被替换，界面需要重绘状态卡片
//!
//! 实现：
//! - [`LogNotifier`] - 只写日志，适用于无界面环境
//! - [`RecordingNotifier`] - 在内存中记录所有通知，供调用方事后检查
//! - 桌面外壳中的 Tauri 事件实现位于 `commands::events`

use std::sync::Mutex;

use crate::models::notification::{Notification, NotificationLevel};
use crate::models::status::StatusSnapshot;

/// 通知出口
pub trait Notifier: Send + Sync {
    /// 发出一条用户通知
    fn notify(&self, notification: Notification);

    /// 状态快照已被整体替换
    fn status_updated(&self, _snapshot: &StatusSnapshot) {}
}

/// 只写日志的通知实现
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notification: Notification) {
        match notification.level {
            NotificationLevel::Error => log::error!("{}", notification.message),
            NotificationLevel::Warning => log::warn!("{}", notification.message),
            NotificationLevel::Success | NotificationLevel::Info => {
                log::info!("{}", notification.message)
            }
        }
    }
}

/// 在内存中记录通知的实现
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    notifications: Mutex<Vec<Notification>>,
    status_updates: Mutex<Vec<StatusSnapshot>>,
}

impl RecordingNotifier {
    /// 到目前为止收到的全部通知
    pub fn all(&self) -> Vec<Notification> {
        self.notifications
            .lock()
            .map(|list| list.clone())
            .unwrap_or_default()
    }

    /// 指定级别的通知
    pub fn with_level(&self, level: NotificationLevel) -> Vec<Notification> {
        self.all()
            .into_iter()
            .filter(|n| n.level == level)
            .collect()
    }

    /// 收到的状态快照更新次数
    pub fn status_update_count(&self) -> usize {
        self.status_updates.lock().map(|list| list.len()).unwrap_or(0)
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        if let Ok(mut list) = self.notifications.lock() {
            list.push(notification);
        }
    }

    fn status_updated(&self, snapshot: &StatusSnapshot) {
        if let Ok(mut list) = self.status_updates.lock() {
            list.push(snapshot.clone());
        }
    }
}
