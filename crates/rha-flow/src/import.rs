//! YAML import support
//!
//! A YAML-configured remote is registered through the same flow machinery:
//! the mapping is parsed, validated against the live remote, and split into
//! connection data and options.

use serde_json::Value;
use thiserror::Error;

use rha_core::conf::OPTION_KEYS;

use crate::input::InputMap;

/// Errors raised while reading a YAML import payload.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("YAML import must be a mapping")]
    NotAMapping,

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

/// Parse a YAML document into a flow input map.
pub fn load_yaml_import(text: &str) -> Result<InputMap, ImportError> {
    let value: Value = serde_yaml::from_str(text)?;
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(ImportError::NotAMapping),
    }
}

/// Split an imported mapping into entry data and entry options.
///
/// Keys the options flow manages move to options; everything else (host,
/// port, credentials, ...) stays in data.
pub fn yaml_to_config_entry(input: &InputMap) -> (InputMap, InputMap) {
    let mut data = InputMap::new();
    let mut options = InputMap::new();

    for (key, value) in input {
        if OPTION_KEYS.contains(&key.as_str()) {
            options.insert(key.clone(), value.clone());
        } else {
            data.insert(key.clone(), value.clone());
        }
    }

    (data, options)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_yaml_import() {
        let input = load_yaml_import(
            "host: 10.0.0.2\nport: 8123\naccess_token: secret\nsubscribe_events:\n  - state_changed\n",
        )
        .unwrap();

        assert_eq!(input["host"], "10.0.0.2");
        assert_eq!(input["port"], 8123);
        assert_eq!(input["subscribe_events"][0], "state_changed");
    }

    #[test]
    fn test_load_yaml_import_rejects_non_mapping() {
        assert!(matches!(
            load_yaml_import("- just\n- a\n- list\n"),
            Err(ImportError::NotAMapping)
        ));
    }

    #[test]
    fn test_yaml_to_config_entry_partition() {
        let input = load_yaml_import(
            "host: 10.0.0.2\naccess_token: secret\nentity_prefix: cabin_\nfilter:\n  - entity_id: sensor.a\n    unit_of_measurement: C\n    above: 10\n    below: 20\n",
        )
        .unwrap();

        let (data, options) = yaml_to_config_entry(&input);

        assert_eq!(data.len(), 2);
        assert!(data.contains_key("host"));
        assert!(data.contains_key("access_token"));

        assert_eq!(options.len(), 2);
        assert!(options.contains_key("entity_prefix"));
        assert!(options.contains_key("filter"));
    }
}
