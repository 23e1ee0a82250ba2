//! # 业务逻辑服务模块
//!
//! 包含面板核心逻辑的实现，与 Tauri command 层解耦：
//! - `gateway` - 远端 API 的统一请求/结果契约（reqwest 实现 + 类型化端点）
//! - `cache` - 远端配置树的本地镜像
//! - `profiles` - 配置组集合管理（增删选改 + 激活索引不变式）
//! - `optimistic` - 乐观更新执行器（最新者胜出 + 代数计数器）
//! - `poller` - 状态快照的定时轮询
//! - `notify` - 用户通知出口
//! - `settings` - 面板本地设置文件的读写
//! - `panel` - 组合以上组件的面板状态中心

pub mod cache;
pub mod gateway;
pub mod notify;
pub mod optimistic;
pub mod panel;
pub mod poller;
pub mod profiles;
pub mod settings;

#[cfg(test)]
mod testing;
