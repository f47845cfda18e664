//! Typed access to user-submitted field maps.

use serde_json::{Map, Value};

use rha_core::conf::{ACTION_ADD_EVENT, ACTION_ADD_FILTER, CONF_ACTION};

/// A user-submitted form field map
pub type InputMap = Map<String, Value>;

/// Explicit submission intent, carried in the `action` field of steps that
/// maintain a working list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitAction {
    /// Accept the current selection and advance
    Continue,
    /// Append a new filter entry and re-render the same step
    AddFilter,
    /// Append a new event subscription and re-render the same step
    AddEvent,
}

impl SubmitAction {
    /// A missing or unrecognized action reads as [`SubmitAction::Continue`].
    pub fn from_input(input: &InputMap) -> Self {
        match get_str(input, CONF_ACTION) {
            Some(value) if value == ACTION_ADD_FILTER => SubmitAction::AddFilter,
            Some(value) if value == ACTION_ADD_EVENT => SubmitAction::AddEvent,
            _ => SubmitAction::Continue,
        }
    }
}

pub(crate) fn get_str<'a>(input: &'a InputMap, key: &str) -> Option<&'a str> {
    input.get(key).and_then(Value::as_str)
}

pub(crate) fn get_string(input: &InputMap, key: &str) -> Option<String> {
    get_str(input, key).map(str::to_owned)
}

pub(crate) fn get_bool(input: &InputMap, key: &str) -> Option<bool> {
    input.get(key).and_then(Value::as_bool)
}

pub(crate) fn get_u64(input: &InputMap, key: &str) -> Option<u64> {
    input.get(key).and_then(Value::as_u64)
}

pub(crate) fn get_port(input: &InputMap, key: &str) -> Option<u16> {
    get_u64(input, key).and_then(|port| u16::try_from(port).ok())
}

pub(crate) fn get_f64(input: &InputMap, key: &str) -> Option<f64> {
    input.get(key).and_then(Value::as_f64)
}

/// String-array field; anything else reads as empty.
pub(crate) fn get_str_list(input: &InputMap, key: &str) -> Vec<String> {
    input
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
