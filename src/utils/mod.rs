//! # 通用工具模块
//!
//! - `path` - 面板配置目录定位与配置树点分路径读写

pub mod path;
