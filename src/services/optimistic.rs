//! # 乐观更新执行器
//!
//! 用于功能开关这类"感知延迟很重要"的操作：
//! 1. 立即把界面可见的目标值改为新值（在任何 `.await` 之前完成）
//! 2. 调用提交操作（远端请求）
//! 3. 成功：保留新值（若远端返回了确认值则以确认值为准），记为已确认
//! 4. 失败：精确回滚到最近一次确认的值（不重新拉取），并向用户发出一次错误通知
//!
//! ## 同一目标的并发修改
//! 采用"最新者胜出 + 代数计数器"：每次 `begin` 都让目标的代数加一，
//! 结算时若代数已不是最新，说明已被后续操作取代（Superseded）：
//! - 不发通知
//! - 若成功，仍更新"已确认值"
//!
//! 每个目标另外记录在途修改数。最后一个在途修改结算后（无论代数），
//! 显示值一律对齐到已确认值，保证静止时"显示值 == 最近一次确认的值"。
//!
//! ## 线程安全
//! 目标表由 `std::sync::Mutex` 保护，锁从不跨越 `.await` 持有。

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::{Arc, Mutex};

use crate::models::notification::Notification;
use crate::services::gateway::GatewayError;
use crate::services::notify::Notifier;

/// 提交操作成功后的确认信息
#[derive(Debug, Clone, PartialEq)]
pub struct Confirmation<V> {
    /// 远端确认的最终值；为 None 时视为确认了乐观写入的新值
    pub value: Option<V>,
    /// 远端返回的提示信息
    pub message: Option<String>,
}

/// 单个目标的状态
#[derive(Debug, Clone)]
struct Slot<V> {
    /// 界面当前显示的值（可能是尚未确认的乐观值）
    displayed: V,
    /// 最近一次远端确认的值
    confirmed: V,
    /// 最新一次修改的代数
    generation: u64,
    /// 尚未结算的修改数
    pending: u32,
}

/// 一次乐观修改的凭据，由 `begin` 发放、交给 `settle` 结算
#[derive(Debug, Clone, PartialEq)]
pub struct MutationTicket<V> {
    pub target: String,
    pub generation: u64,
    pub new_value: V,
}

/// 一次乐观修改的结算结果
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<V> {
    /// 提交成功，界面保留该值
    Committed(V),
    /// 提交失败，界面已回滚到该值
    RolledBack { restored: V, error: GatewayError },
    /// 已被同一目标上更新的修改取代，不发通知
    Superseded,
}

/// 乐观更新执行器
pub struct OptimisticExecutor<V> {
    slots: Mutex<HashMap<String, Slot<V>>>,
    notifier: Arc<dyn Notifier>,
}

impl<V> OptimisticExecutor<V>
where
    V: Clone + PartialEq + Send,
{
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            notifier,
        }
    }

    /// 用远端的真实值同步目标（如配置加载完成后）
    ///
    /// 有修改在途的目标只更新已确认值，界面显示值留给在途修改结算时决定。
    pub fn sync(&self, target: &str, confirmed: V) {
        if let Ok(mut slots) = self.slots.lock() {
            match slots.get_mut(target) {
                Some(slot) => {
                    slot.confirmed = confirmed.clone();
                    if slot.pending == 0 {
                        slot.displayed = confirmed;
                    }
                }
                None => {
                    slots.insert(
                        target.to_string(),
                        Slot {
                            displayed: confirmed.clone(),
                            confirmed,
                            generation: 0,
                            pending: 0,
                        },
                    );
                }
            }
        }
    }

    /// 读取目标当前的界面显示值
    pub fn displayed(&self, target: &str) -> Option<V> {
        let slots = self.slots.lock().ok()?;
        slots.get(target).map(|slot| slot.displayed.clone())
    }

    /// 读取所有目标的界面显示值
    pub fn displayed_all(&self) -> BTreeMap<String, V> {
        match self.slots.lock() {
            Ok(slots) => slots
                .iter()
                .map(|(target, slot)| (target.clone(), slot.displayed.clone()))
                .collect(),
            Err(_) => BTreeMap::new(),
        }
    }

    /// 目标是否有修改在途
    pub fn in_flight(&self, target: &str) -> bool {
        match self.slots.lock() {
            Ok(slots) => slots
                .get(target)
                .is_some_and(|slot| slot.pending > 0),
            Err(_) => false,
        }
    }

    /// 第 1 步：同步写入乐观值
    ///
    /// # 参数
    /// - `target` - 目标名称（如功能名）
    /// - `new_value` - 乐观写入的新值
    /// - `fallback` - 目标从未被同步过时使用的"已确认值"
    pub fn begin(&self, target: &str, new_value: V, fallback: V) -> MutationTicket<V> {
        let mut generation = 0;
        if let Ok(mut slots) = self.slots.lock() {
            let slot = slots.entry(target.to_string()).or_insert_with(|| Slot {
                displayed: fallback.clone(),
                confirmed: fallback,
                generation: 0,
                pending: 0,
            });
            slot.generation += 1;
            slot.pending += 1;
            slot.displayed = new_value.clone();
            generation = slot.generation;
        }

        MutationTicket {
            target: target.to_string(),
            generation,
            new_value,
        }
    }

    /// 第 3/4 步：根据提交结果确认或回滚
    ///
    /// 成功和失败各只发出一次通知；被取代的结算和因面板关闭而取消的结算不发通知。
    /// 结算后目标上不再有在途修改时，显示值对齐到已确认值。
    pub fn settle(
        &self,
        ticket: MutationTicket<V>,
        result: Result<Confirmation<V>, GatewayError>,
    ) -> Outcome<V> {
        let mut notice = None;
        let outcome = {
            let Ok(mut slots) = self.slots.lock() else {
                return Outcome::Superseded;
            };
            let Some(slot) = slots.get_mut(&ticket.target) else {
                return Outcome::Superseded;
            };
            let latest = slot.generation == ticket.generation;
            slot.pending = slot.pending.saturating_sub(1);

            let outcome = match result {
                Ok(confirmation) => {
                    let value = confirmation.value.unwrap_or(ticket.new_value);
                    slot.confirmed = value.clone();
                    if latest {
                        slot.displayed = value.clone();
                        notice = Some(Notification::success(
                            confirmation.message.unwrap_or_else(|| "操作成功".to_string()),
                        ));
                        Outcome::Committed(value)
                    } else {
                        Outcome::Superseded
                    }
                }
                Err(error) => {
                    if latest {
                        slot.displayed = slot.confirmed.clone();
                        if error != GatewayError::Cancelled {
                            notice = Some(Notification::error(error.user_message("操作")));
                        }
                        Outcome::RolledBack {
                            restored: slot.confirmed.clone(),
                            error,
                        }
                    } else {
                        Outcome::Superseded
                    }
                }
            };

            if slot.pending == 0 {
                slot.displayed = slot.confirmed.clone();
            }
            outcome
        };

        if let Some(notification) = notice {
            self.notifier.notify(notification);
        }
        outcome
    }

    /// 完整的乐观更新流程：`begin` → 等待提交 → `settle`
    pub async fn apply<F, Fut>(&self, target: &str, new_value: V, fallback: V, commit: F) -> Outcome<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Confirmation<V>, GatewayError>>,
    {
        let ticket = self.begin(target, new_value, fallback);
        let target = ticket.target.clone();
        let result = commit().await;
        let outcome = self.settle(ticket, result);
        if let Outcome::RolledBack { error, .. } = &outcome {
            log::warn!("乐观更新回滚: {} ({})", target, error);
        }
        outcome
    }
}
