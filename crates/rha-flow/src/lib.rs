//! Configuration flows for the remote Home Assistant integration
//!
//! Two multi-step wizards, rendered by the host platform:
//!
//! - the config flow registers a remote instance (instance type, connection
//!   details, discovery validation, unique-id claim), also reachable through
//!   a zeroconf broadcast or a YAML import;
//! - the options flow filters what the registered remote exposes (domains,
//!   entities, numeric thresholds, event subscriptions), accumulating one
//!   options mapping that is persisted atomically at the final step.
//!
//! Step handlers return declarative [`FlowResult`] form schemas; the
//! [`FlowManager`] owns active flows and applies terminal results to the
//! config entry registry.

mod config_flow;
mod import;
mod input;
mod manager;
mod options_flow;
mod schema;
mod selector;

pub use config_flow::{ConfigFlow, FlowDeps, Prefill, ZeroconfServiceInfo};
pub use import::{load_yaml_import, yaml_to_config_entry, ImportError};
pub use input::{InputMap, SubmitAction};
pub use manager::{FlowError, FlowManager};
pub use options_flow::{OptionsFlow, RemoteExposure};
pub use schema::{FieldType, FlowResult, FlowResultType, FormField};
pub use selector::{
    domain_search_selector, entity_search_selector, service_search_selector, SelectMode,
    SelectOption, SelectSelector,
};
