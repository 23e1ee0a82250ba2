//! # 数据模型模块
//!
//! 定义了与前端 TypeScript 类型一一对应的 Rust 数据结构。
//! 所有结构体均派生 `Serialize` 和 `Deserialize`，用于 IPC 传输和远端 API 的 JSON 编解码。
//! - `config` - 远端配置树及其默认值
//! - `profile` - AI 服务配置组与 AI 配置保存请求体
//! - `status` - 只读状态快照
//! - `catalog` - 标准化的模型列表
//! - `notification` - 用户通知
//! - `settings` - 面板本地设置

pub mod catalog;
pub mod config;
pub mod notification;
pub mod profile;
pub mod settings;
pub mod status;
