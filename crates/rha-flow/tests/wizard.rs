//! End-to-end walks through the config and options wizards.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

use rha_config_entries::{ConfigEntries, ConfigEntry};
use rha_core::conf::{DOMAIN, REMOTE_ID};
use rha_flow::{
    ConfigFlow, FlowDeps, FlowManager, FlowResult, FlowResultType, FormField, InputMap,
    OptionsFlow, RemoteExposure, ZeroconfServiceInfo,
};
use rha_rest::{JsonFetcher, JsonResponse, Sessions, TransportError};

/// Fetcher replaying scripted responses, shared across the whole wizard.
struct FakeFetcher {
    responses: Mutex<VecDeque<JsonResponse>>,
    calls: Mutex<usize>,
}

impl FakeFetcher {
    fn new(responses: Vec<JsonResponse>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            calls: Mutex::new(0),
        })
    }

    fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl JsonFetcher for FakeFetcher {
    async fn get_json(
        &self,
        _url: &str,
        _access_token: &str,
    ) -> Result<JsonResponse, TransportError> {
        *self.calls.lock().unwrap() += 1;
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| TransportError("script exhausted".into()))
    }
}

/// Fetcher that parks on a gate until the test releases it.
struct GatedFetcher {
    entered: Notify,
    release: Notify,
}

impl GatedFetcher {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            entered: Notify::new(),
            release: Notify::new(),
        })
    }
}

#[async_trait]
impl JsonFetcher for GatedFetcher {
    async fn get_json(
        &self,
        _url: &str,
        _access_token: &str,
    ) -> Result<JsonResponse, TransportError> {
        self.entered.notify_one();
        self.release.notified().await;
        Ok(ok(discovery_body("uuid-slow", "Cabin")))
    }
}

struct FakeSessions {
    fetcher: Arc<dyn JsonFetcher>,
}

impl Sessions for FakeSessions {
    fn client(&self, _verify_ssl: bool) -> Arc<dyn JsonFetcher> {
        self.fetcher.clone()
    }
}

struct FakeExposure {
    entities: Vec<String>,
    services: Vec<String>,
}

impl RemoteExposure for FakeExposure {
    fn entity_names(&self) -> Vec<String> {
        self.entities.clone()
    }

    fn service_names(&self) -> Vec<String> {
        self.services.clone()
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn deps_with(fetcher: Arc<dyn JsonFetcher>) -> (Arc<FlowDeps>, Arc<ConfigEntries>) {
    let entries = Arc::new(ConfigEntries::new());
    let deps = Arc::new(FlowDeps {
        entries: entries.clone(),
        sessions: Arc::new(FakeSessions { fetcher }),
        local_uuid: "local-uuid".to_owned(),
    });
    (deps, entries)
}

fn input(value: Value) -> InputMap {
    value.as_object().expect("input must be a mapping").clone()
}

fn ok(body: Value) -> JsonResponse {
    JsonResponse { status: 200, body }
}

fn status(code: u16) -> JsonResponse {
    JsonResponse {
        status: code,
        body: Value::Null,
    }
}

fn discovery_body(uuid: &str, location_name: &str) -> Value {
    json!({
        "uuid": uuid,
        "location_name": location_name,
        "ha_version": "2024.1.0",
        "installation_type": "Home Assistant OS",
    })
}

fn connection_input() -> InputMap {
    input(json!({
        "host": "10.0.0.2",
        "port": 8123,
        "access_token": "secret",
        "max_message_size": 16777216,
        "secure": false,
        "verify_ssl": false,
    }))
}

fn field<'a>(result: &'a FlowResult, name: &str) -> &'a FormField {
    result
        .data_schema
        .iter()
        .find(|f| f.name == name)
        .unwrap_or_else(|| panic!("schema has no field {name}"))
}

#[tokio::test]
async fn test_remote_node_registers_without_connection_details() {
    init_tracing();
    let fetcher = FakeFetcher::new(vec![]);
    let (deps, entries) = deps_with(fetcher.clone());
    let manager = FlowManager::new(deps);

    let form = manager.start_user_flow().await.unwrap();
    assert_eq!(form.result_type, FlowResultType::Form);
    assert_eq!(form.step_id.as_deref(), Some("user"));

    let result = manager
        .progress_flow(&form.flow_id, &input(json!({"type": "remote"})))
        .await
        .unwrap();

    assert_eq!(result.result_type, FlowResultType::CreateEntry);
    assert_eq!(result.title.as_deref(), Some("Remote instance"));
    // The connection-details step never rendered, so no HTTP was attempted.
    assert_eq!(fetcher.calls(), 0);
    assert!(entries.get_by_unique_id(DOMAIN, REMOTE_ID).is_some());
}

#[tokio::test]
async fn test_second_remote_node_aborts() {
    init_tracing();
    let (deps, _entries) = deps_with(FakeFetcher::new(vec![]));
    let manager = FlowManager::new(deps);

    let form = manager.start_user_flow().await.unwrap();
    manager
        .progress_flow(&form.flow_id, &input(json!({"type": "remote"})))
        .await
        .unwrap();

    let form = manager.start_user_flow().await.unwrap();
    let result = manager
        .progress_flow(&form.flow_id, &input(json!({"type": "remote"})))
        .await
        .unwrap();

    assert_eq!(result.result_type, FlowResultType::Abort);
    assert_eq!(result.reason.as_deref(), Some("already_configured"));
}

#[tokio::test]
async fn test_main_hub_registration() {
    init_tracing();
    let fetcher = FakeFetcher::new(vec![ok(discovery_body("uuid-1", "Cabin"))]);
    let (deps, entries) = deps_with(fetcher);
    let manager = FlowManager::new(deps);

    let form = manager.start_user_flow().await.unwrap();
    let form = manager
        .progress_flow(&form.flow_id, &input(json!({"type": "main"})))
        .await
        .unwrap();
    assert_eq!(form.step_id.as_deref(), Some("connection_details"));
    assert_eq!(form.last_step, None);
    assert_eq!(field(&form, "port").default, Some(json!(8123)));
    assert_eq!(field(&form, "secure").default, Some(json!(true)));

    let result = manager
        .progress_flow(&form.flow_id, &connection_input())
        .await
        .unwrap();

    assert_eq!(result.result_type, FlowResultType::CreateEntry);
    assert_eq!(result.title.as_deref(), Some("Cabin"));

    let entry = entries.get_by_unique_id(DOMAIN, "uuid-1").expect("entry registered");
    assert_eq!(entry.data.get("host"), Some(&json!("10.0.0.2")));
}

#[tokio::test]
async fn test_duplicate_uuid_aborts() {
    init_tracing();
    let fetcher = FakeFetcher::new(vec![ok(discovery_body("uuid-1", "Cabin"))]);
    let (deps, entries) = deps_with(fetcher);
    entries
        .add(ConfigEntry::new(DOMAIN, "Cabin").with_unique_id("uuid-1"))
        .unwrap();
    let manager = FlowManager::new(deps);

    let form = manager.start_user_flow().await.unwrap();
    let form = manager
        .progress_flow(&form.flow_id, &input(json!({"type": "main"})))
        .await
        .unwrap();
    let result = manager
        .progress_flow(&form.flow_id, &connection_input())
        .await
        .unwrap();

    assert_eq!(result.result_type, FlowResultType::Abort);
    assert_eq!(result.reason.as_deref(), Some("already_configured"));
    assert_eq!(entries.len(), 1);
}

#[tokio::test]
async fn test_invalid_auth_rerenders_with_error() {
    init_tracing();
    let fetcher = FakeFetcher::new(vec![status(401), ok(discovery_body("uuid-1", "Cabin"))]);
    let (deps, _entries) = deps_with(fetcher.clone());
    let manager = FlowManager::new(deps);

    let form = manager.start_user_flow().await.unwrap();
    let form = manager
        .progress_flow(&form.flow_id, &input(json!({"type": "main"})))
        .await
        .unwrap();

    let retry = manager
        .progress_flow(&form.flow_id, &connection_input())
        .await
        .unwrap();
    assert_eq!(retry.result_type, FlowResultType::Form);
    assert_eq!(retry.step_id.as_deref(), Some("connection_details"));
    assert_eq!(
        retry.errors.as_ref().and_then(|e| e.get("base")).map(String::as_str),
        Some("invalid_auth")
    );
    // Auth failures fail fast; one call only.
    assert_eq!(fetcher.calls(), 1);

    // The same flow can be resubmitted after fixing the token.
    let result = manager
        .progress_flow(&form.flow_id, &connection_input())
        .await
        .unwrap();
    assert_eq!(result.result_type, FlowResultType::CreateEntry);
}

#[tokio::test]
async fn test_slow_validation_does_not_block_other_sessions() {
    init_tracing();
    let gate = GatedFetcher::new();
    let (deps, entries) = deps_with(gate.clone());
    let manager = Arc::new(FlowManager::new(deps));

    let form = manager.start_user_flow().await.unwrap();
    let form = manager
        .progress_flow(&form.flow_id, &input(json!({"type": "main"})))
        .await
        .unwrap();

    let stuck = tokio::spawn({
        let manager = manager.clone();
        let flow_id = form.flow_id.clone();
        async move { manager.progress_flow(&flow_id, &connection_input()).await }
    });
    gate.entered.notified().await;

    // A second session runs start to finish while the first submission is
    // still waiting on the remote.
    let other = tokio::time::timeout(Duration::from_secs(5), async {
        let form = manager.start_user_flow().await.unwrap();
        let result = manager
            .progress_flow(&form.flow_id, &input(json!({"type": "remote"})))
            .await
            .unwrap();
        manager.list_flows().await;
        result
    })
    .await
    .expect("flow registry stayed responsive");
    assert_eq!(other.result_type, FlowResultType::CreateEntry);

    gate.release.notify_one();
    let result = stuck.await.unwrap().unwrap();
    assert_eq!(result.result_type, FlowResultType::CreateEntry);
    assert_eq!(result.title.as_deref(), Some("Cabin"));
    assert_eq!(entries.len(), 2);
}

#[tokio::test]
async fn test_zeroconf_prefills_connection_details() {
    init_tracing();
    let (deps, _entries) = deps_with(FakeFetcher::new(vec![]));
    let manager = FlowManager::new(deps);

    let info = ZeroconfServiceInfo {
        port: 8443,
        properties: HashMap::from([
            ("uuid".to_owned(), "uuid-zc".to_owned()),
            ("location_name".to_owned(), "Cabin".to_owned()),
            ("internal_url".to_owned(), "https://10.0.0.5:8443".to_owned()),
        ]),
    };

    let form = manager.start_zeroconf_flow(&info).await.unwrap();
    assert_eq!(form.result_type, FlowResultType::Form);
    assert_eq!(form.step_id.as_deref(), Some("connection_details"));
    assert_eq!(field(&form, "host").default, Some(json!("10.0.0.5")));
    assert_eq!(field(&form, "port").default, Some(json!(8443)));
    assert_eq!(field(&form, "secure").default, Some(json!(true)));
}

#[tokio::test]
async fn test_zeroconf_of_own_instance_aborts() {
    init_tracing();
    let (deps, _entries) = deps_with(FakeFetcher::new(vec![]));
    let manager = FlowManager::new(deps);

    let info = ZeroconfServiceInfo {
        port: 8123,
        properties: HashMap::from([("uuid".to_owned(), "local-uuid".to_owned())]),
    };

    let result = manager.start_zeroconf_flow(&info).await.unwrap();
    assert_eq!(result.result_type, FlowResultType::Abort);
    assert_eq!(result.reason.as_deref(), Some("already_configured"));
}

#[tokio::test]
async fn test_import_creates_entry_with_stashed_options() {
    init_tracing();
    let fetcher = FakeFetcher::new(vec![ok(discovery_body("uuid-yaml", "Cabin"))]);
    let (deps, entries) = deps_with(fetcher);
    let manager = FlowManager::new(deps);

    let result = manager
        .start_import_flow(&input(json!({
            "host": "10.0.0.2",
            "port": 8123,
            "access_token": "secret",
            "entity_prefix": "cabin_",
            "subscribe_events": ["state_changed"],
        })))
        .await
        .unwrap();

    assert_eq!(result.result_type, FlowResultType::CreateEntry);
    assert_eq!(result.title.as_deref(), Some("Cabin (YAML)"));

    let entry = entries.get_by_unique_id(DOMAIN, "uuid-yaml").unwrap();
    assert_eq!(entry.data.get("host"), Some(&json!("10.0.0.2")));
    let stashed = entry.data.get("options").and_then(Value::as_object).unwrap();
    assert_eq!(stashed.get("entity_prefix"), Some(&json!("cabin_")));
    assert!(!entry.data.contains_key("entity_prefix"));
}

#[tokio::test]
async fn test_failed_import_aborts() {
    init_tracing();
    // Discovery 404, then the generic API endpoint is down too.
    let fetcher = FakeFetcher::new(vec![status(404), status(500)]);
    let (deps, entries) = deps_with(fetcher);
    let manager = FlowManager::new(deps);

    let result = manager
        .start_import_flow(&input(json!({
            "host": "10.0.0.2",
            "access_token": "secret",
        })))
        .await
        .unwrap();

    assert_eq!(result.result_type, FlowResultType::Abort);
    assert_eq!(result.reason.as_deref(), Some("import_failed"));
    assert!(entries.is_empty());
}

fn seeded_entry() -> ConfigEntry {
    let mut options = HashMap::new();
    options.insert(
        "filter".to_owned(),
        json!([{
            "entity_id": "sensor.a",
            "unit_of_measurement": "C",
            "above": 10,
            "below": 20,
        }]),
    );
    options.insert("include_entities".to_owned(), json!(["sensor.a"]));
    ConfigEntry::new(DOMAIN, "Cabin Upstairs")
        .with_unique_id("uuid-1")
        .with_options(options)
}

fn exposure() -> Arc<dyn RemoteExposure> {
    Arc::new(FakeExposure {
        entities: vec!["sensor.a".to_owned(), "light.kitchen".to_owned()],
        services: vec!["light.turn_on".to_owned()],
    })
}

#[tokio::test]
async fn test_options_flow_not_supported_for_remote_node() {
    init_tracing();
    let (deps, entries) = deps_with(FakeFetcher::new(vec![]));
    let entry = entries
        .add(ConfigEntry::new(DOMAIN, "Remote instance").with_unique_id(REMOTE_ID))
        .unwrap();
    let manager = FlowManager::new(deps);

    let result = manager
        .start_options_flow(&entry.entry_id, None)
        .await
        .unwrap();
    assert_eq!(result.result_type, FlowResultType::Abort);
    assert_eq!(result.reason.as_deref(), Some("not_supported"));
}

#[tokio::test]
async fn test_options_flow_full_walk() {
    init_tracing();
    let (deps, entries) = deps_with(FakeFetcher::new(vec![]));
    let entry = entries.add(seeded_entry()).unwrap();
    let manager = FlowManager::new(deps);

    let form = manager
        .start_options_flow(&entry.entry_id, Some(exposure()))
        .await
        .unwrap();
    assert_eq!(form.step_id.as_deref(), Some("init"));
    assert_eq!(form.last_step, Some(false));
    // Service prefix defaults to the slugified entry title.
    assert_eq!(
        field(&form, "service_prefix").default,
        Some(json!("cabin_upstairs"))
    );

    let form = manager
        .progress_flow(&form.flow_id, &input(json!({"entity_prefix": "cabin_"})))
        .await
        .unwrap();
    assert_eq!(form.step_id.as_deref(), Some("domain_entity_filters"));

    let form = manager
        .progress_flow(&form.flow_id, &input(json!({"include_domains": ["sensor"]})))
        .await
        .unwrap();
    assert_eq!(form.step_id.as_deref(), Some("general_filters"));

    // The saved filter renders selected with its display label.
    let label = "1. sensor.a, unit: C, above: 10, below: 20";
    assert_eq!(field(&form, "filter").default, Some(json!([label])));

    // Add a second filter; the step re-renders instead of advancing.
    let form = manager
        .progress_flow(
            &form.flow_id,
            &input(json!({
                "action": "add_filter",
                "filter": [label],
                "entity_id": "sensor.b",
                "unit_of_measurement": "%",
                "above": 5,
                "below": 95,
            })),
        )
        .await
        .unwrap();
    assert_eq!(form.step_id.as_deref(), Some("general_filters"));
    let second = "2. sensor.b, unit: %, above: 5, below: 95";
    assert_eq!(field(&form, "filter").default, Some(json!([label, second])));

    // Keep both filters and continue.
    let form = manager
        .progress_flow(
            &form.flow_id,
            &input(json!({"action": "continue", "filter": [label, second]})),
        )
        .await
        .unwrap();
    assert_eq!(form.step_id.as_deref(), Some("events"));
    assert_eq!(form.last_step, Some(true));

    // Add an event, then finalize.
    let form = manager
        .progress_flow(
            &form.flow_id,
            &input(json!({"action": "add_event", "add_new_event": "custom_event"})),
        )
        .await
        .unwrap();
    assert_eq!(form.step_id.as_deref(), Some("events"));
    assert_eq!(
        field(&form, "subscribe_events").default,
        Some(json!(["custom_event"]))
    );

    let result = manager
        .progress_flow(
            &form.flow_id,
            &input(json!({"action": "continue", "subscribe_events": ["custom_event"]})),
        )
        .await
        .unwrap();
    assert_eq!(result.result_type, FlowResultType::CreateEntry);

    // One atomic options write at the terminal step.
    let updated = entries.get(&entry.entry_id).unwrap();
    assert_eq!(updated.options.get("entity_prefix"), Some(&json!("cabin_")));
    assert_eq!(
        updated.options.get("include_domains"),
        Some(&json!(["sensor"]))
    );
    assert_eq!(
        updated.options.get("subscribe_events"),
        Some(&json!(["custom_event"]))
    );
    let filters = updated
        .options
        .get("filter")
        .and_then(Value::as_array)
        .unwrap();
    assert_eq!(filters.len(), 2);
    assert_eq!(filters[1]["entity_id"], "sensor.b");
}

#[tokio::test]
async fn test_options_flow_dropped_filter_not_persisted() {
    init_tracing();
    let (deps, entries) = deps_with(FakeFetcher::new(vec![]));
    let entry = entries.add(seeded_entry()).unwrap();
    let manager = FlowManager::new(deps);

    let form = manager
        .start_options_flow(&entry.entry_id, Some(exposure()))
        .await
        .unwrap();
    let form = manager
        .progress_flow(&form.flow_id, &input(json!({})))
        .await
        .unwrap();
    let form = manager
        .progress_flow(&form.flow_id, &input(json!({})))
        .await
        .unwrap();
    assert_eq!(form.step_id.as_deref(), Some("general_filters"));

    // Deselect the saved filter and continue.
    let form = manager
        .progress_flow(&form.flow_id, &input(json!({"action": "continue", "filter": []})))
        .await
        .unwrap();
    assert_eq!(form.step_id.as_deref(), Some("events"));

    let result = manager
        .progress_flow(&form.flow_id, &input(json!({"action": "continue"})))
        .await
        .unwrap();
    assert_eq!(result.result_type, FlowResultType::CreateEntry);

    let updated = entries.get(&entry.entry_id).unwrap();
    assert_eq!(updated.options.get("filter"), Some(&json!([])));
}

#[tokio::test]
async fn test_unknown_flow_and_step_errors() {
    init_tracing();
    let (deps, _entries) = deps_with(FakeFetcher::new(vec![]));
    let manager = FlowManager::new(deps.clone());

    let err = manager
        .progress_flow("missing", &input(json!({})))
        .await
        .unwrap_err();
    assert!(matches!(err, rha_flow::FlowError::UnknownFlow(_)));

    let err = manager
        .start_options_flow("missing-entry", None)
        .await
        .unwrap_err();
    assert!(matches!(err, rha_flow::FlowError::UnknownEntry(_)));

    // Direct step calls keep working without the manager.
    let mut flow = ConfigFlow::new(deps.clone());
    let form = flow.step_user(None).await;
    assert_eq!(form.result_type, FlowResultType::Form);

    let mut options_flow = OptionsFlow::new(deps, "gone", None);
    let result = options_flow.step_init(None).await;
    assert_eq!(result.result_type, FlowResultType::Abort);
}
