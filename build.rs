//! # Bot Control Panel - Cargo 构建脚本
//!
//! 仅在启用 `desktop` feature 时调用 Tauri 的构建前处理：
//! - 生成 Tauri 运行时所需的资源绑定代码
//! - 处理应用图标、权限清单等静态资源
//!
//! 核心库构建（默认 feature）不需要任何构建前处理。

/// 构建脚本入口函数
///
/// `desktop` 启用时调用 `tauri_build::build()`，
/// 根据 `tauri.conf.json` 中的配置生成相应的编译产物。
fn main() {
  #[cfg(feature = "desktop")]
  tauri_build::build();
}
