//! # 面板错误类型
//!
//! 汇总面板各层可能产生的错误。所有错误都不是致命的：
//! 网关错误以错误通知呈现，配置组错误与缺少输入以警告通知呈现。
//! IPC 层把错误展平为 `String` 返回给前端。

use crate::services::gateway::GatewayError;
use crate::services::profiles::ProfileError;

/// 面板操作错误
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PanelError {
    /// 远端调用失败（传输失败 / 远端拒绝 / 已取消）
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// 配置组操作被拒绝
    #[error(transparent)]
    Profile(#[from] ProfileError),

    /// 发起操作前缺少必要的输入（如 API Key、重启钩子地址）
    #[error("{0}")]
    MissingInput(String),

    /// 面板本地设置文件读写失败
    #[error("{0}")]
    Settings(String),
}
