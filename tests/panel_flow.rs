use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use panel_lib::models::notification::NotificationLevel;
use panel_lib::models::profile::ProfileFields;
use panel_lib::models::settings::PanelSettings;
use panel_lib::services::gateway::{Gateway, GatewayError, GatewayFuture, Method};
use panel_lib::services::optimistic::Outcome;
use panel_lib::utils::path;
use panel_lib::{ControlPanel, RecordingNotifier};
use serde_json::{Value, json};

/// 内存中的远端：持有配置树，按远端的规则处理请求
struct InMemoryRemote {
    tree: Mutex<Value>,
    /// 切换时返回 `success: false` 的功能
    locked_features: Mutex<BTreeSet<String>>,
    status_calls: Mutex<usize>,
}

impl InMemoryRemote {
    fn new(tree: Value) -> Arc<Self> {
        Arc::new(Self {
            tree: Mutex::new(tree),
            locked_features: Mutex::new(BTreeSet::new()),
            status_calls: Mutex::new(0),
        })
    }

    fn lock_feature(&self, feature: &str) {
        self.locked_features.lock().unwrap().insert(feature.to_string());
    }

    fn tree(&self) -> Value {
        self.tree.lock().unwrap().clone()
    }

    fn status_calls(&self) -> usize {
        *self.status_calls.lock().unwrap()
    }

    fn handle(&self, endpoint: &str, method: Method, payload: Option<Value>) -> Result<Value, GatewayError> {
        let mut tree = self.tree.lock().unwrap();
        match (method, endpoint) {
            (Method::Get, "/config") => Ok(json!({"success": true, "config": tree.clone()})),
            (Method::Post, "/config") => {
                if let Some(Value::Object(updates)) = payload {
                    for (dotted, value) in updates {
                        path::assign(&mut tree, &dotted, value);
                    }
                }
                Ok(json!({"success": true, "message": "配置已更新"}))
            }
            (Method::Get, "/status") => {
                *self.status_calls.lock().unwrap() += 1;
                let features: BTreeMap<String, bool> = tree["features"]
                    .as_object()
                    .map(|features| {
                        features
                            .iter()
                            .map(|(name, f)| (name.clone(), f["enabled"].as_bool().unwrap_or(false)))
                            .collect()
                    })
                    .unwrap_or_default();
                Ok(json!({"success": true, "status": {"features": features, "config_status": {}}}))
            }
            (Method::Post, "/ai_config") => {
                let body = payload.unwrap_or_default();
                path::assign(&mut tree, "ai_services.openai_configs", body["openai_configs"].clone());
                path::assign(
                    &mut tree,
                    "ai_services.active_openai_config_index",
                    body["active_openai_config_index"].clone(),
                );
                Ok(json!({"success": true, "message": "AI 配置已更新"}))
            }
            (Method::Post, toggle) if toggle.ends_with("/toggle") => {
                let feature = toggle
                    .trim_start_matches("/features/")
                    .trim_end_matches("/toggle")
                    .to_string();
                if self.locked_features.lock().unwrap().contains(&feature) {
                    return Err(GatewayError::Remote("disabled".to_string()));
                }
                let dotted = format!("features.{}.enabled", feature);
                let enabled = !path::lookup(&tree, &dotted).and_then(Value::as_bool).unwrap_or(false);
                path::assign(&mut tree, &dotted, json!(enabled));
                Ok(json!({"success": true, "enabled": enabled}))
            }
            _ => Err(GatewayError::Remote(format!("unknown endpoint {}", endpoint))),
        }
    }
}

impl Gateway for InMemoryRemote {
    fn call<'a>(&'a self, endpoint: &'a str, method: Method, payload: Option<Value>) -> GatewayFuture<'a, Value> {
        let reply = self.handle(endpoint, method, payload);
        Box::pin(async move { reply })
    }

    fn ping<'a>(&'a self, _url: &'a str) -> GatewayFuture<'a, ()> {
        Box::pin(async { Ok(()) })
    }
}

fn panel_for(remote: &Arc<InMemoryRemote>) -> (ControlPanel, Arc<RecordingNotifier>) {
    let notifier = Arc::new(RecordingNotifier::default());
    let panel = ControlPanel::new(PanelSettings::default(), remote.clone(), notifier.clone());
    (panel, notifier)
}

#[tokio::test]
async fn profile_edits_are_saved_in_one_batch_and_reloaded() {
    let remote = InMemoryRemote::new(json!({"ai_services": {"openai_configs": []}}));
    let (panel, _) = panel_for(&remote);
    panel.load_config().await.unwrap();

    assert_eq!(panel.profiles().len(), 1);
    assert_eq!(panel.active_profile().name, "配置 1");

    assert_eq!(panel.add_profile(), 1);
    assert_eq!(panel.active_profile().name, "配置 2");
    panel.update_active_fields(&ProfileFields {
        api_key: Some("sk-live".into()),
        model: Some("gpt-4o".into()),
        ..Default::default()
    });
    panel.remove_profile(0).unwrap();

    let profiles = panel.profiles();
    assert_eq!(profiles.active_index(), 0);
    assert_eq!(profiles.len(), 1);
    assert_eq!(profiles.active().name, "配置 2");
    // 本地编辑尚未到达远端
    assert_eq!(remote.tree()["ai_services"]["openai_configs"], json!([]));

    panel.save_ai_config(None, None).await.unwrap();

    let saved = remote.tree();
    assert_eq!(saved["ai_services"]["openai_configs"][0]["name"], json!("配置 2"));
    assert_eq!(saved["ai_services"]["openai_configs"][0]["api_key"], json!("sk-live"));
    assert!(!panel.has_unsaved_profiles());
    assert_eq!(panel.active_profile().model, "gpt-4o");
}

#[tokio::test]
async fn rejected_toggle_restores_flag_with_single_error() {
    let remote = InMemoryRemote::new(json!({"features": {
        "chat": {"enabled": true},
        "drawing": {"enabled": false}
    }}));
    remote.lock_feature("drawing");
    let (panel, notifier) = panel_for(&remote);
    panel.load_config().await.unwrap();

    let outcome = panel.toggle_feature("drawing", true).await;
    assert!(matches!(outcome, Outcome::RolledBack { restored: false, .. }));
    assert!(!panel.feature_enabled("drawing"));
    let errors = notifier.with_level(NotificationLevel::Error);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].message, "操作失败: disabled");

    assert_eq!(panel.toggle_feature("chat", false).await, Outcome::Committed(false));
    assert_eq!(remote.tree()["features"]["chat"]["enabled"], json!(false));
    assert!(!panel.status().unwrap().feature_enabled("chat"));
}

#[tokio::test(start_paused = true)]
async fn poller_runs_from_startup_until_shutdown() {
    let remote = InMemoryRemote::new(json!({"features": {"search": {"enabled": true}}}));
    let (panel, _) = panel_for(&remote);

    panel.startup().await;
    tokio::time::sleep(Duration::from_secs(95)).await;
    // t = 0, 30, 60, 90
    assert_eq!(remote.status_calls(), 4);
    assert!(panel.status().unwrap().feature_enabled("search"));
    assert!(panel.is_polling());

    panel.shutdown().await;
    assert!(!panel.is_polling());
    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(remote.status_calls(), 4);
}
