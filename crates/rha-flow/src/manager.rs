//! Flow manager
//!
//! Owns active flow instances, dispatches user submissions to the current
//! step, and applies terminal results to the config entry registry. The
//! host drives one flow per user session strictly sequentially.

use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info};

use rha_config_entries::{ConfigEntriesError, ConfigEntry, ConfigEntryUpdate};
use rha_core::conf::DOMAIN;

use crate::config_flow::{ConfigFlow, FlowDeps, ZeroconfServiceInfo};
use crate::input::InputMap;
use crate::options_flow::{OptionsFlow, RemoteExposure};
use crate::schema::{FlowResult, FlowResultType};

/// Flow dispatch errors
#[derive(Debug, Error)]
pub enum FlowError {
    #[error("Unknown flow: {0}")]
    UnknownFlow(String),

    #[error("Unknown config entry: {0}")]
    UnknownEntry(String),

    #[error("Flow {flow_id} cannot handle step {step_id}")]
    UnknownStep { flow_id: String, step_id: String },

    #[error(transparent)]
    Entries(#[from] ConfigEntriesError),
}

enum ActiveFlow {
    Config(ConfigFlow),
    Options(OptionsFlow),
}

struct FlowState {
    flow: ActiveFlow,
    current_step: String,
}

/// Manager for config and options flows.
pub struct FlowManager {
    deps: Arc<FlowDeps>,
    flows: Mutex<HashMap<String, FlowState>>,
}

impl FlowManager {
    pub fn new(deps: Arc<FlowDeps>) -> Self {
        Self {
            deps,
            flows: Mutex::new(HashMap::new()),
        }
    }

    /// Start a user-initiated registration flow.
    pub async fn start_user_flow(&self) -> Result<FlowResult, FlowError> {
        let mut flow = ConfigFlow::new(self.deps.clone());
        debug!(flow_id = flow.flow_id(), "starting user flow");
        let result = flow.step_user(None).await;
        self.track(ActiveFlow::Config(flow), result).await
    }

    /// Start a flow from a zeroconf discovery broadcast.
    pub async fn start_zeroconf_flow(
        &self,
        discovery_info: &ZeroconfServiceInfo,
    ) -> Result<FlowResult, FlowError> {
        let mut flow = ConfigFlow::new(self.deps.clone());
        debug!(flow_id = flow.flow_id(), "starting zeroconf flow");
        let result = flow.step_zeroconf(discovery_info).await;
        self.track(ActiveFlow::Config(flow), result).await
    }

    /// Run a YAML import to completion.
    pub async fn start_import_flow(&self, user_input: &InputMap) -> Result<FlowResult, FlowError> {
        let mut flow = ConfigFlow::new(self.deps.clone());
        debug!(flow_id = flow.flow_id(), "starting import flow");
        let result = flow.step_import(user_input).await;
        // Import never renders a form; finalize immediately.
        self.finalize(ActiveFlow::Config(flow), result)
    }

    /// Start the options flow for an existing entry.
    pub async fn start_options_flow(
        &self,
        entry_id: &str,
        exposure: Option<Arc<dyn RemoteExposure>>,
    ) -> Result<FlowResult, FlowError> {
        if self.deps.entries.get(entry_id).is_none() {
            return Err(FlowError::UnknownEntry(entry_id.to_owned()));
        }
        let mut flow = OptionsFlow::new(self.deps.clone(), entry_id, exposure);
        debug!(flow_id = flow.flow_id(), entry_id, "starting options flow");
        let result = flow.step_init(None).await;
        self.track(ActiveFlow::Options(flow), result).await
    }

    /// Continue a flow with user input for its current step.
    ///
    /// The flow is taken out of the registry while its step runs, so a slow
    /// validation call (discovery against an unreachable remote) cannot
    /// block other sessions. The host drives each flow sequentially; a
    /// submission racing its own flow sees `UnknownFlow`.
    pub async fn progress_flow(
        &self,
        flow_id: &str,
        user_input: &InputMap,
    ) -> Result<FlowResult, FlowError> {
        let mut state = self
            .flows
            .lock()
            .await
            .remove(flow_id)
            .ok_or_else(|| FlowError::UnknownFlow(flow_id.to_owned()))?;

        let step = state.current_step.clone();
        let input = Some(user_input);
        let result = match (&mut state.flow, step.as_str()) {
            (ActiveFlow::Config(flow), "user") => Some(flow.step_user(input).await),
            (ActiveFlow::Config(flow), "connection_details") => {
                Some(flow.step_connection_details(input).await)
            }
            (ActiveFlow::Options(flow), "init") => Some(flow.step_init(input).await),
            (ActiveFlow::Options(flow), "domain_entity_filters") => {
                Some(flow.step_domain_entity_filters(input).await)
            }
            (ActiveFlow::Options(flow), "general_filters") => {
                Some(flow.step_general_filters(input).await)
            }
            (ActiveFlow::Options(flow), "events") => Some(flow.step_events(input).await),
            _ => None,
        };

        let Some(result) = result else {
            // Unknown step; put the flow back untouched.
            self.flows.lock().await.insert(flow_id.to_owned(), state);
            return Err(FlowError::UnknownStep {
                flow_id: flow_id.to_owned(),
                step_id: step,
            });
        };

        match result.result_type {
            FlowResultType::Form => {
                state.current_step = result.step_id.clone().unwrap_or(step);
                self.flows.lock().await.insert(flow_id.to_owned(), state);
                Ok(result)
            }
            _ => self.finalize(state.flow, result),
        }
    }

    /// List active flows for the host UI.
    pub async fn list_flows(&self) -> Vec<Value> {
        let flows = self.flows.lock().await;
        flows
            .iter()
            .map(|(flow_id, state)| {
                let (kind, placeholders) = match &state.flow {
                    ActiveFlow::Config(flow) => {
                        ("config", serde_json::to_value(flow.title_placeholders()).unwrap_or_default())
                    }
                    ActiveFlow::Options(flow) => ("options", json!({"entry_id": flow.entry_id()})),
                };
                json!({
                    "flow_id": flow_id,
                    "handler": DOMAIN,
                    "kind": kind,
                    "step_id": state.current_step,
                    "context": placeholders,
                })
            })
            .collect()
    }

    /// Keep a flow that rendered a form; finalize any terminal result.
    async fn track(&self, flow: ActiveFlow, result: FlowResult) -> Result<FlowResult, FlowError> {
        match result.result_type {
            FlowResultType::Form => {
                let step_id = result.step_id.clone().unwrap_or_default();
                let flow_id = result.flow_id.clone();
                self.flows.lock().await.insert(
                    flow_id,
                    FlowState {
                        flow,
                        current_step: step_id,
                    },
                );
                Ok(result)
            }
            _ => self.finalize(flow, result),
        }
    }

    /// Apply a terminal result to the registry.
    fn finalize(&self, flow: ActiveFlow, result: FlowResult) -> Result<FlowResult, FlowError> {
        if result.result_type != FlowResultType::CreateEntry {
            return Ok(result);
        }

        let data = result
            .result
            .as_ref()
            .and_then(Value::as_object)
            .map(|map| map.clone().into_iter().collect::<HashMap<_, _>>())
            .unwrap_or_default();

        match flow {
            ActiveFlow::Config(flow) => {
                let title = result.title.clone().unwrap_or_default();
                let mut entry = ConfigEntry::new(DOMAIN, title)
                    .with_data(data)
                    .with_source(flow.source());
                if let Some(unique_id) = flow.unique_id() {
                    entry = entry.with_unique_id(unique_id);
                }

                match self.deps.entries.add(entry) {
                    Ok(added) => {
                        info!(entry_id = %added.entry_id, "flow created config entry");
                        let mut result = result;
                        result.result = serde_json::to_value(&added).ok();
                        Ok(result)
                    }
                    // Lost a race for the unique id after validation.
                    Err(ConfigEntriesError::AlreadyExists { .. }) => Ok(FlowResult::abort(
                        "already_configured",
                    )
                    .for_flow(&result.flow_id, &result.handler)),
                    Err(err) => Err(err.into()),
                }
            }
            ActiveFlow::Options(flow) => {
                let update = ConfigEntryUpdate::new().options(data);
                self.deps.entries.update(flow.entry_id(), update)?;
                info!(entry_id = flow.entry_id(), "flow updated entry options");
                Ok(result)
            }
        }
    }
}
