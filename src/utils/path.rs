//! # 路径工具函数
//!
//! 提供两类"路径"相关的工具函数：
//! - 文件系统路径：获取面板自身配置目录（`~/.mo/BotPanel/`）
//! - 配置树路径：按点分路径（如 `features.chat.enabled`）读写嵌套的 JSON 配置树

use std::path::PathBuf;

use serde_json::{Map, Value};

/// 获取面板自身配置目录的绝对路径
///
/// 面板的本地设置独立存储在 `~/.mo/BotPanel/` 目录下，
/// 与远端机器人的配置完全分离（远端配置只通过网关读写）。
///
/// # 错误
/// 如果无法确定用户主目录，返回错误信息。
pub fn get_panel_config_path() -> Result<PathBuf, String> {
    let home = dirs::home_dir().ok_or_else(|| "无法获取用户主目录".to_string())?;
    Ok(home.join(".mo").join("BotPanel"))
}

/// 按点分路径读取配置树中的值
///
/// 路径中任意一段不存在、或中间节点不是对象时返回 `None`，
/// 调用方据此回退到默认值，而不是报错。
///
/// # 示例
/// ```ignore
/// let tree = serde_json::json!({"features": {"chat": {"enabled": true}}});
/// assert_eq!(lookup(&tree, "features.chat.enabled"), Some(&serde_json::json!(true)));
/// ```
pub fn lookup<'a>(tree: &'a Value, dotted: &str) -> Option<&'a Value> {
    dotted
        .split('.')
        .try_fold(tree, |node, segment| node.as_object()?.get(segment))
}

/// 按点分路径写入配置树
///
/// 缺失的中间节点会被创建为空对象；中间节点若不是对象则被替换为对象，
/// 与远端 `config_manager.set(dotted, value)` 的语义保持一致。
pub fn assign(tree: &mut Value, dotted: &str, value: Value) {
    let mut segments: Vec<&str> = dotted.split('.').collect();
    let Some(leaf) = segments.pop() else {
        return;
    };

    let mut node = tree;
    for segment in segments {
        make_object(node);
        let Some(map) = node.as_object_mut() else {
            return;
        };
        node = map
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }
    make_object(node);
    if let Some(map) = node.as_object_mut() {
        map.insert(leaf.to_string(), value);
    }
}

/// 节点不是 JSON 对象时原地替换为空对象
fn make_object(node: &mut Value) {
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
}
