//! Flow results and form field schemas
//!
//! Step handlers return either "render this form schema", "finalize with
//! this data" or "abort with this reason code"; the host's renderer consumes
//! the serialized result.

use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;

use crate::selector::SelectSelector;

/// Result type of a flow step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowResultType {
    Form,
    CreateEntry,
    Abort,
}

/// Result of a config flow step
#[derive(Debug, Clone, Serialize)]
pub struct FlowResult {
    /// Flow ID
    pub flow_id: String,
    /// Handler (integration domain)
    pub handler: String,
    /// Result type
    #[serde(rename = "type")]
    pub result_type: FlowResultType,
    /// Current step ID (for form type)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_id: Option<String>,
    /// Data schema for the form; empty when not a form
    pub data_schema: Vec<FormField>,
    /// Whether this form is the wizard's final step, when known; drives the
    /// host renderer's submit-vs-next button
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_step: Option<bool>,
    /// Errors from the previous submission (None if none)
    pub errors: Option<HashMap<String, String>>,
    /// Description placeholders for the form (None if none)
    pub description_placeholders: Option<HashMap<String, String>>,
    /// Title (for create_entry type)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Abort reason (for abort type)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Result data (for create_entry)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
}

impl FlowResult {
    /// Render a form for the given step
    pub fn form(step_id: impl Into<String>, data_schema: Vec<FormField>) -> Self {
        Self {
            flow_id: String::new(),
            handler: String::new(),
            result_type: FlowResultType::Form,
            step_id: Some(step_id.into()),
            data_schema,
            last_step: None,
            errors: None,
            description_placeholders: None,
            title: None,
            reason: None,
            result: None,
        }
    }

    /// Finalize the flow with the accumulated data
    pub fn create_entry(title: impl Into<String>, result: Value) -> Self {
        Self {
            flow_id: String::new(),
            handler: String::new(),
            result_type: FlowResultType::CreateEntry,
            step_id: None,
            data_schema: Vec::new(),
            last_step: None,
            errors: None,
            description_placeholders: None,
            title: Some(title.into()),
            reason: None,
            result: Some(result),
        }
    }

    /// Abort the flow with a reason code
    pub fn abort(reason: impl Into<String>) -> Self {
        Self {
            flow_id: String::new(),
            handler: String::new(),
            result_type: FlowResultType::Abort,
            step_id: None,
            data_schema: Vec::new(),
            last_step: None,
            errors: None,
            description_placeholders: None,
            title: None,
            reason: Some(reason.into()),
            result: None,
        }
    }

    /// Mark whether this form is the wizard's final step
    pub fn with_last_step(mut self, last_step: bool) -> Self {
        self.last_step = Some(last_step);
        self
    }

    /// Attach inline error codes; an empty map means no errors
    pub fn with_errors(mut self, errors: HashMap<String, String>) -> Self {
        if !errors.is_empty() {
            self.errors = Some(errors);
        }
        self
    }

    /// Attach description placeholders
    pub fn with_placeholders(mut self, placeholders: HashMap<String, String>) -> Self {
        self.description_placeholders = Some(placeholders);
        self
    }

    /// Stamp the owning flow's identity onto the result
    pub(crate) fn for_flow(mut self, flow_id: &str, handler: &str) -> Self {
        self.flow_id = flow_id.to_owned();
        self.handler = handler.to_owned();
        self
    }
}

/// Form field value type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    String,
    Integer,
    Float,
    Boolean,
    Select,
}

/// Form field schema
#[derive(Debug, Clone, Serialize)]
pub struct FormField {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Pre-filled but editable value, distinct from a default
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_value: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selector: Option<SelectSelector>,
}

impl FormField {
    pub fn required(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            required: true,
            default: None,
            suggested_value: None,
            selector: None,
        }
    }

    pub fn optional(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            required: false,
            ..Self::required(name, field_type)
        }
    }

    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Set a default only when one is known
    pub fn with_default_opt(mut self, default: Option<impl Into<Value>>) -> Self {
        self.default = default.map(Into::into);
        self
    }

    pub fn with_suggested_opt(mut self, value: Option<impl Into<Value>>) -> Self {
        self.suggested_value = value.map(Into::into);
        self
    }

    pub fn with_selector(mut self, selector: SelectSelector) -> Self {
        self.field_type = FieldType::Select;
        self.selector = Some(selector);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_form_result_serialization() {
        let result = FlowResult::form(
            "user",
            vec![FormField::required("type", FieldType::String).with_default("main")],
        )
        .for_flow("flow-1", "remote_homeassistant");

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["type"], "form");
        assert_eq!(json["step_id"], "user");
        assert_eq!(json["flow_id"], "flow-1");
        assert_eq!(json["data_schema"][0]["name"], "type");
        assert_eq!(json["data_schema"][0]["default"], "main");
        assert!(json["errors"].is_null());
    }

    #[test]
    fn test_create_entry_serialization() {
        let result = FlowResult::create_entry("Cabin", json!({"host": "10.0.0.2"}));
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["type"], "create_entry");
        assert_eq!(json["title"], "Cabin");
        assert_eq!(json["result"]["host"], "10.0.0.2");
        assert!(json.get("step_id").is_none());
    }

    #[test]
    fn test_abort_serialization() {
        let json = serde_json::to_value(FlowResult::abort("already_configured")).unwrap();
        assert_eq!(json["type"], "abort");
        assert_eq!(json["reason"], "already_configured");
    }

    #[test]
    fn test_empty_errors_stay_none() {
        let result = FlowResult::form("user", Vec::new()).with_errors(HashMap::new());
        assert!(result.errors.is_none());
    }

    #[test]
    fn test_last_step_serialized_only_when_known() {
        let json = serde_json::to_value(FlowResult::form("user", Vec::new())).unwrap();
        assert!(json.get("last_step").is_none());

        let json =
            serde_json::to_value(FlowResult::form("events", Vec::new()).with_last_step(true))
                .unwrap();
        assert_eq!(json["last_step"], true);
    }
}
