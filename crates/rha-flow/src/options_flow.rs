//! Options flow for a registered remote instance
//!
//! `init → domain_entity_filters → general_filters → events`. Each step
//! merges its submission into one accumulator; nothing is durable until the
//! terminal step hands the whole mapping back for persistence.

use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use rha_config_entries::ConfigEntry;
use rha_core::conf::{
    ACTION_ADD_EVENT, ACTION_ADD_FILTER, ACTION_CONTINUE, CONF_ABOVE, CONF_ACTION,
    CONF_ADD_NEW_EVENT, CONF_BELOW, CONF_ENTITY_FRIENDLY_NAME_PREFIX, CONF_ENTITY_ID,
    CONF_ENTITY_PREFIX, CONF_EXCLUDE_DOMAINS, CONF_EXCLUDE_ENTITIES, CONF_FILTER,
    CONF_INCLUDE_DOMAINS, CONF_INCLUDE_ENTITIES, CONF_LOAD_COMPONENTS, CONF_SERVICES,
    CONF_SERVICE_PREFIX, CONF_SUBSCRIBE_EVENTS, CONF_UNIT_OF_MEASUREMENT, DOMAIN, REMOTE_ID,
};
use rha_core::{domains_of, selected_filter_index, slugify, NumericFilter};

use crate::config_flow::FlowDeps;
use crate::input::{get_f64, get_str, get_str_list, get_string, InputMap, SubmitAction};
use crate::schema::{FieldType, FlowResult, FormField};
use crate::selector::{
    domain_search_selector, entity_counts, entity_search_selector, service_search_selector,
    SelectSelector,
};

/// View of what the live remote connection currently exposes.
///
/// The options flow only reads names; when no connection is up yet the
/// candidate lists fall back to the ids already present in saved options.
pub trait RemoteExposure: Send + Sync {
    fn entity_names(&self) -> Vec<String>;
    fn service_names(&self) -> Vec<String>;
}

/// One in-flight options wizard for an existing entry.
pub struct OptionsFlow {
    flow_id: String,
    deps: Arc<FlowDeps>,
    entry_id: String,
    exposure: Option<Arc<dyn RemoteExposure>>,

    /// Accumulated options, set on the first submission
    options: Option<HashMap<String, Value>>,
    /// Working filter list, loaded on first render of the filters step
    filters: Option<Vec<NumericFilter>>,
    /// Working event set, loaded on first render of the events step
    events: Option<BTreeSet<String>>,
}

impl OptionsFlow {
    pub fn new(
        deps: Arc<FlowDeps>,
        entry_id: impl Into<String>,
        exposure: Option<Arc<dyn RemoteExposure>>,
    ) -> Self {
        Self {
            flow_id: ulid::Ulid::new().to_string(),
            deps,
            entry_id: entry_id.into(),
            exposure,
            options: None,
            filters: None,
            events: None,
        }
    }

    pub fn flow_id(&self) -> &str {
        &self.flow_id
    }

    pub(crate) fn entry_id(&self) -> &str {
        &self.entry_id
    }

    fn finish(&self, result: FlowResult) -> FlowResult {
        result.for_flow(&self.flow_id, DOMAIN)
    }

    fn entry(&self) -> Option<ConfigEntry> {
        self.deps.entries.get(&self.entry_id)
    }

    fn saved_list(entry: &ConfigEntry, key: &str) -> Vec<String> {
        entry
            .options
            .get(key)
            .and_then(Value::as_array)
            .map(|values| {
                values
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default()
    }

    fn saved_value(entry: &ConfigEntry, key: &str) -> Option<Value> {
        entry.options.get(key).cloned()
    }

    /// All entities and domains exposed by the remote instance, including
    /// ids already referenced by saved options.
    fn domains_and_entities(&self, entry: &ConfigEntry) -> (Vec<String>, Vec<String>) {
        let mut all: BTreeSet<String> = Self::saved_list(entry, CONF_INCLUDE_ENTITIES)
            .into_iter()
            .chain(Self::saved_list(entry, CONF_EXCLUDE_ENTITIES))
            .collect();
        if let Some(exposure) = &self.exposure {
            all.extend(exposure.entity_names());
        }

        let entities: Vec<String> = all.into_iter().collect();
        let domains = domains_of(&entities);
        (domains, entities)
    }

    /// Manage basic options.
    pub async fn step_init(&mut self, user_input: Option<&InputMap>) -> FlowResult {
        let Some(entry) = self.entry() else {
            return self.finish(FlowResult::abort("unknown"));
        };
        if entry.unique_id.as_deref() == Some(REMOTE_ID) {
            return self.finish(FlowResult::abort("not_supported"));
        }

        if let Some(input) = user_input {
            self.options = Some(input.clone().into_iter().collect());
            return self.step_domain_entity_filters(None).await;
        }

        let (domains, entities) = self.domains_and_entities(&entry);
        let mut domain_set: BTreeSet<String> = domains.into_iter().collect();
        domain_set.extend(Self::saved_list(&entry, CONF_LOAD_COMPONENTS));
        let domain_list: Vec<String> = domain_set.into_iter().collect();

        let services = self
            .exposure
            .as_ref()
            .map(|exposure| exposure.service_names())
            .unwrap_or_default();

        let counts = entity_counts(&entities);
        let service_prefix = Self::saved_value(&entry, CONF_SERVICE_PREFIX)
            .unwrap_or_else(|| Value::from(slugify(&entry.title)));

        let schema = vec![
            FormField::optional(CONF_ENTITY_PREFIX, FieldType::String)
                .with_suggested_opt(Self::saved_value(&entry, CONF_ENTITY_PREFIX)),
            FormField::optional(CONF_ENTITY_FRIENDLY_NAME_PREFIX, FieldType::String)
                .with_suggested_opt(Self::saved_value(&entry, CONF_ENTITY_FRIENDLY_NAME_PREFIX)),
            FormField::optional(CONF_LOAD_COMPONENTS, FieldType::Select)
                .with_default_opt(Self::saved_value(&entry, CONF_LOAD_COMPONENTS))
                .with_selector(domain_search_selector(&domain_list, &counts)),
            FormField::required(CONF_SERVICE_PREFIX, FieldType::String)
                .with_default(service_prefix),
            FormField::optional(CONF_SERVICES, FieldType::Select)
                .with_default_opt(Self::saved_value(&entry, CONF_SERVICES))
                .with_selector(service_search_selector(&services)),
        ];

        let placeholders = HashMap::from([
            ("components_count".to_owned(), domain_list.len().to_string()),
            ("services_count".to_owned(), services.len().to_string()),
        ]);
        self.finish(
            FlowResult::form("init", schema)
                .with_last_step(false)
                .with_placeholders(placeholders),
        )
    }

    /// Manage domain and entity filters.
    pub async fn step_domain_entity_filters(
        &mut self,
        user_input: Option<&InputMap>,
    ) -> FlowResult {
        let Some(entry) = self.entry() else {
            return self.finish(FlowResult::abort("unknown"));
        };

        if let (Some(options), Some(input)) = (self.options.as_mut(), user_input) {
            options.extend(input.clone());
            return self.step_general_filters(None).await;
        }

        let (domains, entities) = self.domains_and_entities(&entry);
        let counts = entity_counts(&entities);

        let schema = vec![
            FormField::optional(CONF_INCLUDE_DOMAINS, FieldType::Select)
                .with_default_opt(Self::saved_value(&entry, CONF_INCLUDE_DOMAINS))
                .with_selector(domain_search_selector(&domains, &counts)),
            FormField::optional(CONF_INCLUDE_ENTITIES, FieldType::Select)
                .with_default_opt(Self::saved_value(&entry, CONF_INCLUDE_ENTITIES))
                .with_selector(entity_search_selector(&entities)),
            FormField::optional(CONF_EXCLUDE_DOMAINS, FieldType::Select)
                .with_default_opt(Self::saved_value(&entry, CONF_EXCLUDE_DOMAINS))
                .with_selector(domain_search_selector(&domains, &counts)),
            FormField::optional(CONF_EXCLUDE_ENTITIES, FieldType::Select)
                .with_default_opt(Self::saved_value(&entry, CONF_EXCLUDE_ENTITIES))
                .with_selector(entity_search_selector(&entities)),
        ];

        let placeholders = HashMap::from([
            ("total_entities".to_owned(), entities.len().to_string()),
            ("total_domains".to_owned(), domains.len().to_string()),
        ]);
        self.finish(
            FlowResult::form("domain_entity_filters", schema)
                .with_last_step(false)
                .with_placeholders(placeholders),
        )
    }

    /// Manage numeric threshold filters.
    pub async fn step_general_filters(&mut self, user_input: Option<&InputMap>) -> FlowResult {
        let mut selected: Vec<String>;

        if let Some(input) = user_input {
            match SubmitAction::from_input(input) {
                SubmitAction::AddFilter => {
                    let filters = self.filters.get_or_insert_with(Vec::new);
                    let new_filter = NumericFilter {
                        entity_id: get_string(input, CONF_ENTITY_ID).unwrap_or_default(),
                        unit_of_measurement: get_string(input, CONF_UNIT_OF_MEASUREMENT)
                            .unwrap_or_default(),
                        above: get_f64(input, CONF_ABOVE),
                        below: get_f64(input, CONF_BELOW),
                    };
                    selected = get_str_list(input, CONF_FILTER);
                    selected.push(new_filter.label(filters.len()));
                    filters.push(new_filter);
                }
                _ => {
                    let filters = self.filters.take().unwrap_or_default();
                    let chosen: Vec<NumericFilter> = get_str_list(input, CONF_FILTER)
                        .iter()
                        .filter_map(|label| selected_filter_index(label))
                        .filter_map(|index| filters.get(index).cloned())
                        .collect();
                    if let Some(options) = self.options.as_mut() {
                        options.insert(
                            CONF_FILTER.to_owned(),
                            serde_json::to_value(chosen).unwrap_or_default(),
                        );
                    }
                    return self.step_events(None).await;
                }
            }
        } else {
            let saved = self
                .entry()
                .and_then(|entry| Self::saved_value(&entry, CONF_FILTER))
                .and_then(|value| serde_json::from_value::<Vec<NumericFilter>>(value).ok())
                .unwrap_or_default();
            selected = saved
                .iter()
                .enumerate()
                .map(|(index, filter)| filter.label(index))
                .collect();
            self.filters = Some(saved);
        }

        let filters = self.filters.get_or_insert_with(Vec::new);
        let labels: Vec<String> = filters
            .iter()
            .enumerate()
            .map(|(index, filter)| filter.label(index))
            .collect();

        let schema = vec![
            FormField::optional(CONF_FILTER, FieldType::Select)
                .with_default(Value::from(selected))
                .with_selector(SelectSelector::multi(&labels)),
            FormField::optional(CONF_ENTITY_ID, FieldType::String),
            FormField::optional(CONF_UNIT_OF_MEASUREMENT, FieldType::String),
            FormField::optional(CONF_ABOVE, FieldType::Float),
            FormField::optional(CONF_BELOW, FieldType::Float),
            FormField::required(CONF_ACTION, FieldType::Select)
                .with_default(ACTION_CONTINUE)
                .with_selector(SelectSelector::choices(&[ACTION_CONTINUE, ACTION_ADD_FILTER])),
        ];
        self.finish(FlowResult::form("general_filters", schema).with_last_step(false))
    }

    /// Manage event subscriptions; terminal on continue.
    pub async fn step_events(&mut self, user_input: Option<&InputMap>) -> FlowResult {
        let mut selected: Vec<String>;

        if let Some(input) = user_input {
            match SubmitAction::from_input(input) {
                SubmitAction::AddEvent => {
                    let events = self.events.get_or_insert_with(BTreeSet::new);
                    selected = get_str_list(input, CONF_SUBSCRIBE_EVENTS);
                    if let Some(name) = get_str(input, CONF_ADD_NEW_EVENT) {
                        if !name.is_empty() {
                            events.insert(name.to_owned());
                            selected.push(name.to_owned());
                        }
                    }
                }
                _ => {
                    if let Some(mut options) = self.options.take() {
                        options.insert(
                            CONF_SUBSCRIBE_EVENTS.to_owned(),
                            Value::from(get_str_list(input, CONF_SUBSCRIBE_EVENTS)),
                        );
                        let data: InputMap = options.into_iter().collect();
                        return self.finish(FlowResult::create_entry("", Value::Object(data)));
                    }
                    selected = get_str_list(input, CONF_SUBSCRIBE_EVENTS);
                }
            }
        } else {
            let saved = self
                .entry()
                .map(|entry| Self::saved_list(&entry, CONF_SUBSCRIBE_EVENTS))
                .unwrap_or_default();
            self.events = Some(saved.iter().cloned().collect());
            selected = saved;
        }

        let events = self.events.get_or_insert_with(BTreeSet::new);
        let known: Vec<String> = events.iter().cloned().collect();

        let placeholders =
            HashMap::from([("events_count".to_owned(), events.len().to_string())]);
        let schema = vec![
            FormField::optional(CONF_SUBSCRIBE_EVENTS, FieldType::Select)
                .with_default(Value::from(selected))
                .with_selector(SelectSelector::multi(&known).with_custom_value()),
            FormField::optional(CONF_ADD_NEW_EVENT, FieldType::String),
            FormField::required(CONF_ACTION, FieldType::Select)
                .with_default(ACTION_CONTINUE)
                .with_selector(SelectSelector::choices(&[ACTION_CONTINUE, ACTION_ADD_EVENT])),
        ];
        self.finish(
            FlowResult::form("events", schema)
                .with_last_step(true)
                .with_placeholders(placeholders),
        )
    }
}
