//! # Tauri Command 处理模块
//!
//! 本模块包含所有注册到 Tauri 的 command 处理函数，以及把核心通知转发给前端的事件出口。
//! - `config` - 配置缓存读写、面板本地设置
//! - `profiles` - 配置组增删选改、AI 配置保存、模型列表
//! - `features` - 功能开关、状态快照、部署操作
//! - `events` - 通知 / 状态事件

pub mod config;
pub mod events;
pub mod features;
pub mod profiles;
