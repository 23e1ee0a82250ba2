//! # 远端网关服务
//!
//! 所有对远端配置/状态 API 的访问都经过本模块，统一为
//! `call(endpoint, method, payload?) -> Result<Value, GatewayError>` 的请求/结果契约：
//! - **传输失败**（网络不可达、超时、响应不是合法 JSON、缺少 success 标志）→ `GatewayError::Transport`
//! - **远端失败**（结构合法但 `success: false`）→ `GatewayError::Remote`，与 HTTP 状态码无关
//! - **成功** → 解析后的完整响应信封
//!
//! 网关内部不做任何重试，重试策略（如果需要）由调用方决定。
//!
//! ## 分层
//! - [`Gateway`] trait：最底层的传输抽象，`HttpGateway` 基于 reqwest 实现，测试中使用脚本化实现
//! - [`RemoteApi`]：在 trait 之上提供类型化的端点方法，并在面板关闭时统一取消在途请求

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

use crate::models::catalog::ModelCatalog;
use crate::models::config::ConfigurationTree;
use crate::models::profile::AiConfigPayload;
use crate::models::status::StatusSnapshot;
use crate::services::optimistic::Confirmation;

/// 网关错误
///
/// 对应错误分类中的 TransportError / RemoteError，
/// 另加面板关闭时在途请求被取消的情况。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    /// 网络或解析失败
    #[error("网络错误: {0}")]
    Transport(String),

    /// 远端返回了结构合法的失败响应
    #[error("{0}")]
    Remote(String),

    /// 面板关闭，请求被取消
    #[error("请求已取消")]
    Cancelled,
}

impl GatewayError {
    /// 生成面向用户的提示文本
    ///
    /// # 参数
    /// - `action` - 失败的操作名称（如 "保存"、"操作"）
    pub fn user_message(&self, action: &str) -> String {
        match self {
            GatewayError::Transport(_) | GatewayError::Cancelled => self.to_string(),
            GatewayError::Remote(message) => format!("{}失败: {}", action, message),
        }
    }
}

/// HTTP 方法（远端 API 只用到 GET 和 POST）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// 网关调用返回的 Future 类型
pub type GatewayFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, GatewayError>> + Send + 'a>>;

/// 远端传输抽象
///
/// 使用返回 `Pin<Box<dyn Future>>` 的方法签名而非 `async fn`，
/// 使 trait 可以作为 `Arc<dyn Gateway>` 在各组件之间共享。
pub trait Gateway: Send + Sync {
    /// 调用相对于 API 基础地址的端点，返回完整的响应信封
    fn call<'a>(
        &'a self,
        endpoint: &'a str,
        method: Method,
        payload: Option<Value>,
    ) -> GatewayFuture<'a, Value>;

    /// 向任意绝对地址发送一次 GET（重启钩子等），不检查响应内容
    fn ping<'a>(&'a self, url: &'a str) -> GatewayFuture<'a, ()>;
}

/// 解析远端响应信封
///
/// 远端所有接口都返回 `{success: bool, ...}` 形式的信封；
/// 失败时错误信息位于 `error` 字段（缺失时使用 `message`）。
///
/// # 参数
/// - `status` - HTTP 状态码（仅用于传输错误的提示信息）
/// - `body` - 响应体文本
pub fn parse_envelope(status: u16, body: &str) -> Result<Value, GatewayError> {
    let envelope: Value = serde_json::from_str(body).map_err(|e| {
        GatewayError::Transport(format!("响应解析失败 (HTTP {}): {}", status, e))
    })?;

    let success = envelope
        .get("success")
        .and_then(Value::as_bool)
        .ok_or_else(|| {
            GatewayError::Transport(format!("响应缺少 success 标志 (HTTP {})", status))
        })?;

    if success {
        return Ok(envelope);
    }

    let message = envelope
        .get("error")
        .or_else(|| envelope.get("message"))
        .and_then(Value::as_str)
        .unwrap_or("未知错误")
        .to_string();
    Err(GatewayError::Remote(message))
}

/// 基于 reqwest 的 HTTP 网关
pub struct HttpGateway {
    client: reqwest::Client,
    base_url: String,
}

impl HttpGateway {
    /// 创建 HTTP 网关
    ///
    /// # 参数
    /// - `base_url` - API 基础地址（如 `http://127.0.0.1:5000/api`）
    /// - `timeout` - 单次请求超时
    ///
    /// # 错误
    /// HTTP 客户端构建失败时返回 `Transport` 错误
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Transport(format!("创建 HTTP 客户端失败: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// 拼接端点的完整地址
    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'))
    }

    async fn send(
        &self,
        endpoint: &str,
        method: Method,
        payload: Option<Value>,
    ) -> Result<Value, GatewayError> {
        let url = self.url(endpoint);
        let request = match method {
            Method::Get => self.client.get(&url),
            // 远端 POST 接口统一要求 JSON 请求体，无载荷时发送空对象
            Method::Post => self.client.post(&url).json(&payload.unwrap_or_else(|| json!({}))),
        };

        let response = request
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| GatewayError::Transport(format!("读取响应失败: {}", e)))?;

        parse_envelope(status, &body)
    }
}

impl Gateway for HttpGateway {
    fn call<'a>(
        &'a self,
        endpoint: &'a str,
        method: Method,
        payload: Option<Value>,
    ) -> GatewayFuture<'a, Value> {
        Box::pin(self.send(endpoint, method, payload))
    }

    fn ping<'a>(&'a self, url: &'a str) -> GatewayFuture<'a, ()> {
        Box::pin(async move {
            self.client
                .get(url)
                .send()
                .await
                .map(|_| ())
                .map_err(|e| GatewayError::Transport(e.to_string()))
        })
    }
}

/// 类型化的远端 API
///
/// 包装 `Arc<dyn Gateway>` 和面板关闭令牌，可廉价克隆后分发给缓存、轮询器等组件。
/// 面板关闭（令牌取消）后，所有在途和新发起的调用立即以 `GatewayError::Cancelled` 结束。
#[derive(Clone)]
pub struct RemoteApi {
    gateway: Arc<dyn Gateway>,
    shutdown: CancellationToken,
}

impl RemoteApi {
    pub fn new(gateway: Arc<dyn Gateway>, shutdown: CancellationToken) -> Self {
        Self { gateway, shutdown }
    }

    /// 发起一次可被面板关闭取消的网关调用
    pub async fn call(
        &self,
        endpoint: &str,
        method: Method,
        payload: Option<Value>,
    ) -> Result<Value, GatewayError> {
        tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => Err(GatewayError::Cancelled),
            result = self.gateway.call(endpoint, method, payload) => result,
        }
    }

    /// `GET /config` - 拉取完整配置树
    pub async fn fetch_config(&self) -> Result<ConfigurationTree, GatewayError> {
        let envelope = self.call("/config", Method::Get, None).await?;
        match envelope.get("config") {
            Some(tree @ Value::Object(_)) => Ok(tree.clone()),
            _ => Err(GatewayError::Transport("配置响应缺少 config 对象".to_string())),
        }
    }

    /// `POST /config` - 按点分路径提交部分更新
    ///
    /// # 返回值
    /// 远端返回的提示信息（如果有）
    pub async fn post_config(
        &self,
        updates: &BTreeMap<String, Value>,
    ) -> Result<Option<String>, GatewayError> {
        let payload = serde_json::to_value(updates)
            .map_err(|e| GatewayError::Transport(format!("序列化配置失败: {}", e)))?;
        let envelope = self.call("/config", Method::Post, Some(payload)).await?;
        Ok(message_of(&envelope))
    }

    /// `POST /config/reset` - 让远端从环境变量重新加载配置
    pub async fn reset_config(&self) -> Result<Option<String>, GatewayError> {
        let envelope = self.call("/config/reset", Method::Post, None).await?;
        Ok(message_of(&envelope))
    }

    /// `GET /status` - 拉取只读状态快照
    pub async fn fetch_status(&self) -> Result<StatusSnapshot, GatewayError> {
        let envelope = self.call("/status", Method::Get, None).await?;
        let status = envelope.get("status").cloned().unwrap_or(Value::Null);
        serde_json::from_value(status)
            .map_err(|e| GatewayError::Transport(format!("解析状态失败: {}", e)))
    }

    /// `POST /features/{name}/toggle` - 切换功能开关
    ///
    /// 远端执行的是"取反"操作，成功时在 `enabled` 字段中返回切换后的真实状态。
    pub async fn toggle_feature(&self, feature: &str) -> Result<Confirmation<bool>, GatewayError> {
        let endpoint = format!("/features/{}/toggle", feature);
        let envelope = self.call(&endpoint, Method::Post, None).await?;
        Ok(Confirmation {
            value: envelope.get("enabled").and_then(Value::as_bool),
            message: message_of(&envelope),
        })
    }

    /// `POST /welcome_message` - 更新欢迎消息模板
    ///
    /// 空消息在本地直接拒绝，与远端的校验规则一致。
    pub async fn update_welcome_message(&self, message: &str) -> Result<Option<String>, GatewayError> {
        if message.trim().is_empty() {
            return Err(GatewayError::Remote("欢迎消息不能为空".to_string()));
        }
        let envelope = self
            .call("/welcome_message", Method::Post, Some(json!({ "message": message })))
            .await?;
        Ok(message_of(&envelope))
    }

    /// `POST /ai_config` - 整体替换 AI 服务配置
    pub async fn post_ai_config(&self, payload: &AiConfigPayload) -> Result<Option<String>, GatewayError> {
        let body = serde_json::to_value(payload)
            .map_err(|e| GatewayError::Transport(format!("序列化 AI 配置失败: {}", e)))?;
        let envelope = self.call("/ai_config", Method::Post, Some(body)).await?;
        Ok(message_of(&envelope))
    }

    /// `POST /{provider}/models` - 获取供应商的可用模型列表
    pub async fn list_models(
        &self,
        provider: &str,
        api_key: &str,
        api_base_url: &str,
    ) -> Result<ModelCatalog, GatewayError> {
        let endpoint = format!("/{}/models", provider);
        let payload = json!({ "api_key": api_key, "api_base_url": api_base_url });
        let envelope = self.call(&endpoint, Method::Post, Some(payload)).await?;
        let models = envelope.get("models").cloned().unwrap_or(Value::Null);
        ModelCatalog::from_response(&models).map_err(GatewayError::Transport)
    }

    /// `POST /koyeb/redeploy` - 触发远端服务重新部署（发出即不管）
    pub fn trigger_redeploy(&self) {
        let api = self.clone();
        tokio::spawn(async move {
            match api.call("/koyeb/redeploy", Method::Post, None).await {
                Ok(_) => log::info!("重新部署请求已发送"),
                Err(e) => log::warn!("重新部署请求未成功: {}", e),
            }
        });
    }

    /// 向重启钩子地址发送 GET（发出即不管，不检查响应）
    pub fn fire_webhook(&self, url: String) {
        let gateway = Arc::clone(&self.gateway);
        let shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = shutdown.cancelled() => {}
                result = gateway.ping(&url) => {
                    if let Err(e) = result {
                        log::warn!("重启钩子请求失败: {}", e);
                    }
                }
            }
        });
    }
}

/// 提取响应信封中的提示信息
fn message_of(envelope: &Value) -> Option<String> {
    envelope
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_string)
}
