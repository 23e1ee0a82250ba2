//! 测试用的脚本化网关：按端点排队预设响应，可挂起响应直到测试手动放行。

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use serde_json::Value;
use tokio::sync::oneshot;

use crate::services::gateway::{Gateway, GatewayError, GatewayFuture, Method};

type Reply = Result<Value, GatewayError>;

enum Scripted {
    Ready(Reply),
    Gated(oneshot::Receiver<Reply>),
}

#[derive(Default)]
pub(crate) struct ScriptedGateway {
    queues: Mutex<HashMap<String, VecDeque<Scripted>>>,
    defaults: Mutex<HashMap<String, Reply>>,
    calls: Mutex<Vec<(String, Method, Option<Value>)>>,
    pings: Mutex<Vec<String>>,
}

impl ScriptedGateway {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// 排队一个立即返回的响应
    pub(crate) fn push(&self, endpoint: &str, reply: Reply) {
        self.enqueue(endpoint, Scripted::Ready(reply));
    }

    /// 排队一个挂起的响应，返回放行用的 Sender
    pub(crate) fn push_gated(&self, endpoint: &str) -> oneshot::Sender<Reply> {
        let (tx, rx) = oneshot::channel();
        self.enqueue(endpoint, Scripted::Gated(rx));
        tx
    }

    /// 队列耗尽后使用的固定响应
    pub(crate) fn set_default(&self, endpoint: &str, reply: Reply) {
        self.defaults.lock().unwrap().insert(endpoint.to_string(), reply);
    }

    pub(crate) fn calls_to(&self, endpoint: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(called, _, _)| called == endpoint)
            .count()
    }

    pub(crate) fn last_payload(&self, endpoint: &str) -> Option<Value> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(called, _, _)| called == endpoint)
            .and_then(|(_, _, payload)| payload.clone())
    }

    pub(crate) fn pings(&self) -> Vec<String> {
        self.pings.lock().unwrap().clone()
    }

    fn enqueue(&self, endpoint: &str, scripted: Scripted) {
        self.queues
            .lock()
            .unwrap()
            .entry(endpoint.to_string())
            .or_default()
            .push_back(scripted);
    }
}

impl Gateway for ScriptedGateway {
    fn call<'a>(
        &'a self,
        endpoint: &'a str,
        method: Method,
        payload: Option<Value>,
    ) -> GatewayFuture<'a, Value> {
        self.calls
            .lock()
            .unwrap()
            .push((endpoint.to_string(), method, payload));
        let next = self
            .queues
            .lock()
            .unwrap()
            .get_mut(endpoint)
            .and_then(VecDeque::pop_front);
        let fallback = self.defaults.lock().unwrap().get(endpoint).cloned();

        Box::pin(async move {
            match next {
                Some(Scripted::Ready(reply)) => reply,
                Some(Scripted::Gated(rx)) => rx
                    .await
                    .unwrap_or_else(|_| Err(GatewayError::Transport("gate dropped".into()))),
                None => fallback.unwrap_or_else(|| {
                    Err(GatewayError::Transport(format!("no scripted reply for {}", endpoint)))
                }),
            }
        })
    }

    fn ping<'a>(&'a self, url: &'a str) -> GatewayFuture<'a, ()> {
        self.pings.lock().unwrap().push(url.to_string());
        Box::pin(async { Ok(()) })
    }
}
