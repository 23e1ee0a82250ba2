//! # 状态轮询服务
//!
//! 固定周期（默认 30 秒）拉取只读状态快照并整体替换：
//! - 成功：替换快照并通知界面重绘
//! - 失败：记录警告，保留旧快照，定时器继续运行
//!
//! ## 重叠策略
//! - 定时循环内联等待每次拉取，并使用 `MissedTickBehavior::Skip`：
//!   上一次拉取未完成时到期的 tick 直接跳过，不会出现两个 tick 同时在途
//! - 手动刷新（如功能开关切换成功后）可能与 tick 并发，
//!   因此每次拉取都带递增序号，晚于已应用序号的结果才会写入，乱序到达的旧结果被忽略
//!
//! ## 取消
//! 轮询任务持有父令牌派生的子令牌：`stop()` 或父令牌取消（`ControlPanel::shutdown` 及其 `Drop`）
//! 都会结束循环，同时中断正在进行的那一次拉取。
//! 后台任务自身持有 `Arc<StatusPoller>`，轮询器不会在循环运行期间被释放，因此结束循环只能依靠令牌。

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::models::status::StatusSnapshot;
use crate::services::gateway::{GatewayError, RemoteApi};
use crate::services::notify::Notifier;

/// 状态轮询器
pub struct StatusPoller {
    remote: RemoteApi,
    notifier: Arc<dyn Notifier>,
    period: Duration,
    cancel: CancellationToken,
    /// 最近一次应用的快照
    snapshot: RwLock<Option<StatusSnapshot>>,
    /// 已应用快照对应的序号
    applied_seq: Mutex<u64>,
    /// 下一次拉取使用的序号
    next_seq: AtomicU64,
    /// 后台轮询任务句柄
    task: Mutex<Option<JoinHandle<()>>>,
}

impl StatusPoller {
    /// 创建轮询器（不会自动启动）
    ///
    /// # 参数
    /// - `remote` - 远端 API
    /// - `notifier` - 快照替换后的通知出口
    /// - `period` - 轮询周期
    /// - `parent` - 面板关闭令牌，取消时轮询随之结束
    pub fn new(
        remote: RemoteApi,
        notifier: Arc<dyn Notifier>,
        period: Duration,
        parent: &CancellationToken,
    ) -> Self {
        Self {
            remote,
            notifier,
            period,
            cancel: parent.child_token(),
            snapshot: RwLock::new(None),
            applied_seq: Mutex::new(0),
            next_seq: AtomicU64::new(1),
            task: Mutex::new(None),
        }
    }

    /// 当前状态快照
    pub fn snapshot(&self) -> Option<StatusSnapshot> {
        self.snapshot.read().ok().and_then(|s| s.clone())
    }

    /// 轮询任务是否正在运行
    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .map(|task| task.as_ref().is_some_and(|t| !t.is_finished()))
            .unwrap_or(false)
    }

    /// 启动后台轮询；已在运行或已被取消时不做任何事
    ///
    /// 第一个 tick 立即触发，之后每个周期触发一次。
    pub fn start(self: &Arc<Self>) {
        if self.cancel.is_cancelled() {
            log::debug!("状态轮询已取消，不再启动");
            return;
        }
        let Ok(mut task) = self.task.lock() else {
            return;
        };
        if task.as_ref().is_some_and(|t| !t.is_finished()) {
            return;
        }

        let poller = Arc::clone(self);
        *task = Some(tokio::spawn(async move { poller.run().await }));
        log::info!("状态轮询已启动，周期 {:?}", self.period);
    }

    /// 停止后台轮询并等待任务结束
    pub async fn stop(&self) {
        self.cancel.cancel();
        let handle = self.task.lock().ok().and_then(|mut task| task.take());
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                log::warn!("状态轮询任务异常结束: {}", e);
            }
        }
    }

    /// 立即拉取一次状态（不等待下一个 tick）
    ///
    /// # 返回值
    /// - `Ok(true)` - 快照已替换
    /// - `Ok(false)` - 拉取成功，但已有更新的快照先被应用，本次结果被忽略
    ///
    /// # 错误
    /// 网关错误原样返回，快照保持不变
    pub async fn refresh_now(&self) -> Result<bool, GatewayError> {
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        let snapshot = self.remote.fetch_status().await?;
        Ok(self.apply(seq, snapshot))
    }

    async fn run(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = ticker.tick() => {
                    tokio::select! {
                        _ = self.cancel.cancelled() => break,
                        result = self.refresh_now() => match result {
                            Ok(_) => {}
                            Err(GatewayError::Cancelled) => break,
                            Err(e) => log::warn!("更新状态失败: {}", e),
                        },
                    }
                }
            }
        }
        log::info!("状态轮询已停止");
    }

    /// 按序号应用快照，旧序号的结果被忽略
    fn apply(&self, seq: u64, snapshot: StatusSnapshot) -> bool {
        let Ok(mut applied) = self.applied_seq.lock() else {
            return false;
        };
        if seq <= *applied {
            log::debug!("忽略乱序到达的状态快照 (#{} <= #{})", seq, *applied);
            return false;
        }
        *applied = seq;
        if let Ok(mut current) = self.snapshot.write() {
            *current = Some(snapshot.clone());
        }
        drop(applied);

        self.notifier.status_updated(&snapshot);
        true
    }
}
