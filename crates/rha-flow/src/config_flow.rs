//! Config flow for registering a remote instance
//!
//! `user → connection_details → create_entry`, where the "remote node"
//! instance type short-circuits to a terminal entry. The flow can also be
//! started from a zeroconf broadcast (pre-filling connection details) or a
//! YAML import (validating and finalizing in one step).

use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::error;
use url::Url;

use rha_config_entries::{ConfigEntries, ConfigEntrySource, ConfigEntryUpdate};
use rha_core::conf::{
    CONF_ACCESS_TOKEN, CONF_HOST, CONF_MAX_MSG_SIZE, CONF_OPTIONS, CONF_PORT, CONF_SECURE,
    CONF_TYPE, CONF_VERIFY_SSL, DEFAULT_MAX_MSG_SIZE, DEFAULT_PORT, DOMAIN, REMOTE_ID,
    TYPE_MAIN, TYPE_REMOTE,
};
use rha_rest::{get_discovery_info, RestApiError, Sessions};

use crate::import::yaml_to_config_entry;
use crate::input::{get_bool, get_port, get_str, get_string, get_u64, InputMap};
use crate::schema::{FieldType, FlowResult, FormField};
use crate::selector::SelectSelector;

/// Collaborators shared by every flow instance.
pub struct FlowDeps {
    /// Registry unique-id claims are checked against
    pub entries: Arc<ConfigEntries>,
    /// HTTP session provider for discovery calls
    pub sessions: Arc<dyn Sessions>,
    /// This installation's own instance uuid, so a zeroconf broadcast of
    /// ourselves is not offered for registration
    pub local_uuid: String,
}

/// Pre-filled connection details, seeded by zeroconf discovery.
#[derive(Debug, Clone)]
pub struct Prefill {
    pub host: Option<String>,
    pub port: u16,
    pub secure: bool,
    pub max_msg_size: u64,
}

impl Default for Prefill {
    fn default() -> Self {
        Self {
            host: None,
            port: DEFAULT_PORT,
            secure: true,
            max_msg_size: DEFAULT_MAX_MSG_SIZE,
        }
    }
}

/// Payload of a zeroconf discovery broadcast.
#[derive(Debug, Clone)]
pub struct ZeroconfServiceInfo {
    pub port: u16,
    pub properties: HashMap<String, String>,
}

/// Outcome of validating submitted connection details.
struct ValidatedInfo {
    title: String,
    uuid: String,
}

/// One in-flight registration wizard.
pub struct ConfigFlow {
    flow_id: String,
    deps: Arc<FlowDeps>,
    prefill: Prefill,
    unique_id: Option<String>,
    source: ConfigEntrySource,
    title_placeholders: HashMap<String, String>,
}

impl ConfigFlow {
    pub fn new(deps: Arc<FlowDeps>) -> Self {
        Self {
            flow_id: ulid::Ulid::new().to_string(),
            deps,
            prefill: Prefill::default(),
            unique_id: None,
            source: ConfigEntrySource::User,
            title_placeholders: HashMap::new(),
        }
    }

    pub fn flow_id(&self) -> &str {
        &self.flow_id
    }

    pub(crate) fn unique_id(&self) -> Option<&str> {
        self.unique_id.as_deref()
    }

    pub(crate) fn source(&self) -> ConfigEntrySource {
        self.source
    }

    pub(crate) fn title_placeholders(&self) -> &HashMap<String, String> {
        &self.title_placeholders
    }

    fn finish(&self, result: FlowResult) -> FlowResult {
        result.for_flow(&self.flow_id, DOMAIN)
    }

    fn unique_id_configured(&self, unique_id: &str) -> bool {
        self.deps
            .entries
            .get_by_unique_id(DOMAIN, unique_id)
            .is_some()
    }

    /// Validate that the submitted connection details allow us to connect.
    async fn validate_input(&self, input: &InputMap) -> Result<ValidatedInfo, RestApiError> {
        let host = get_str(input, CONF_HOST)
            .ok_or_else(|| RestApiError::BadResponse("missing host".into()))?;
        let port = get_port(input, CONF_PORT).unwrap_or(DEFAULT_PORT);
        let secure = get_bool(input, CONF_SECURE).unwrap_or(false);
        let access_token = get_str(input, CONF_ACCESS_TOKEN)
            .ok_or_else(|| RestApiError::BadResponse("missing access token".into()))?;
        let verify_ssl = get_bool(input, CONF_VERIFY_SSL).unwrap_or(false);

        let client = self.deps.sessions.client(verify_ssl);
        let info = get_discovery_info(client.as_ref(), host, port, secure, access_token).await?;
        Ok(ValidatedInfo {
            title: info.location_name,
            uuid: info.uuid,
        })
    }

    /// Handle the initial step: pick the instance type.
    pub async fn step_user(&mut self, user_input: Option<&InputMap>) -> FlowResult {
        let mut errors = HashMap::new();

        if let Some(input) = user_input {
            match get_str(input, CONF_TYPE) {
                Some(TYPE_REMOTE) => {
                    self.unique_id = Some(REMOTE_ID.to_owned());
                    if self.unique_id_configured(REMOTE_ID) {
                        return self.finish(FlowResult::abort("already_configured"));
                    }
                    return self.finish(FlowResult::create_entry(
                        "Remote instance",
                        Value::Object(input.clone()),
                    ));
                }
                Some(TYPE_MAIN) => return self.step_connection_details(None).await,
                _ => {
                    errors.insert("base".to_owned(), "unknown".to_owned());
                }
            }
        }

        let schema = vec![FormField::required(CONF_TYPE, FieldType::Select)
            .with_selector(SelectSelector::choices(&[TYPE_REMOTE, TYPE_MAIN]))];
        self.finish(FlowResult::form("user", schema).with_errors(errors))
    }

    /// Handle the connection details step.
    pub async fn step_connection_details(&mut self, user_input: Option<&InputMap>) -> FlowResult {
        let mut errors = HashMap::new();

        if let Some(input) = user_input {
            match self.validate_input(input).await {
                Ok(info) => {
                    self.unique_id = Some(info.uuid.clone());
                    if self.unique_id_configured(&info.uuid) {
                        return self.finish(FlowResult::abort("already_configured"));
                    }
                    return self.finish(FlowResult::create_entry(
                        info.title,
                        Value::Object(input.clone()),
                    ));
                }
                Err(err) => {
                    errors.insert("base".to_owned(), error_code(&err).to_owned());
                }
            }
        }

        let input = user_input.cloned().unwrap_or_default();
        let host = get_string(&input, CONF_HOST).or_else(|| self.prefill.host.clone());
        let port = get_u64(&input, CONF_PORT).unwrap_or(u64::from(self.prefill.port));
        let secure = get_bool(&input, CONF_SECURE).unwrap_or(self.prefill.secure);
        let max_msg_size = get_u64(&input, CONF_MAX_MSG_SIZE).unwrap_or(self.prefill.max_msg_size);
        let access_token = get_string(&input, CONF_ACCESS_TOKEN);
        let verify_ssl = get_bool(&input, CONF_VERIFY_SSL).unwrap_or(true);

        let schema = vec![
            FormField::required(CONF_HOST, FieldType::String).with_default_opt(host),
            FormField::required(CONF_PORT, FieldType::Integer).with_default(port),
            FormField::required(CONF_ACCESS_TOKEN, FieldType::String)
                .with_default_opt(access_token),
            FormField::required(CONF_MAX_MSG_SIZE, FieldType::Integer).with_default(max_msg_size),
            FormField::optional(CONF_SECURE, FieldType::Boolean).with_default(secure),
            FormField::optional(CONF_VERIFY_SSL, FieldType::Boolean).with_default(verify_ssl),
        ];
        self.finish(FlowResult::form("connection_details", schema).with_errors(errors))
    }

    /// Handle an instance discovered via zeroconf.
    pub async fn step_zeroconf(&mut self, discovery_info: &ZeroconfServiceInfo) -> FlowResult {
        self.source = ConfigEntrySource::Zeroconf;

        let Some(uuid) = discovery_info.properties.get("uuid") else {
            return self.finish(FlowResult::abort("unknown"));
        };

        self.unique_id = Some(uuid.clone());
        if self.unique_id_configured(uuid) || *uuid == self.deps.local_uuid {
            return self.finish(FlowResult::abort("already_configured"));
        }

        self.prefill.port = discovery_info.port;
        let raw_url = discovery_info
            .properties
            .get("internal_url")
            .or_else(|| discovery_info.properties.get("base_url"));
        if let Some(url) = raw_url.and_then(|raw| Url::parse(raw).ok()) {
            self.prefill.host = url.host_str().map(str::to_owned);
            self.prefill.secure = url.scheme() == "https";
        }

        if let Some(name) = discovery_info.properties.get("location_name") {
            self.title_placeholders
                .insert("name".to_owned(), name.clone());
        }

        self.step_connection_details(None).await
    }

    /// Handle import from YAML.
    ///
    /// Terminal in one step: any validation failure aborts the whole import.
    pub async fn step_import(&mut self, user_input: &InputMap) -> FlowResult {
        self.source = ConfigEntrySource::Import;

        let info = match self.validate_input(user_input).await {
            Ok(info) => info,
            Err(err) => {
                error!(
                    host = get_str(user_input, CONF_HOST).unwrap_or("?"),
                    %err,
                    "import failed"
                );
                return self.finish(FlowResult::abort("import_failed"));
            }
        };

        let (mut data, options) = yaml_to_config_entry(user_input);
        // Options cannot be set at entry creation; stash them in the data for
        // adoption when the entry is first set up.
        data.insert(CONF_OPTIONS.to_owned(), Value::Object(options));

        self.unique_id = Some(info.uuid.clone());
        if let Some(existing) = self.deps.entries.get_by_unique_id(DOMAIN, &info.uuid) {
            let update = ConfigEntryUpdate::new().data(data.into_iter().collect());
            if let Err(err) = self.deps.entries.update(&existing.entry_id, update) {
                error!(%err, "failed to refresh imported entry");
            }
            return self.finish(FlowResult::abort("already_configured"));
        }

        self.finish(FlowResult::create_entry(
            format!("{} (YAML)", info.title),
            Value::Object(data),
        ))
    }
}

/// Map a discovery error to the inline form error code shown to the user.
fn error_code(err: &RestApiError) -> &'static str {
    match err {
        RestApiError::ApiProblem(_) => "api_problem",
        RestApiError::CannotConnect(_) => "cannot_connect",
        RestApiError::InvalidAuth => "invalid_auth",
        RestApiError::UnsupportedVersion(_) => "unsupported_version",
        RestApiError::EndpointMissing => "missing_endpoint",
        RestApiError::BadResponse(_) => {
            error!(%err, "unexpected validation error");
            "unknown"
        }
    }
}
