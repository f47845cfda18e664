//! Configuration keys and defaults shared across the integration.

/// Integration domain
pub const DOMAIN: &str = "remote_homeassistant";

/// Fixed unique id claimed by a "remote node" entry. Only one such entry can
/// exist per installation.
pub const REMOTE_ID: &str = "remote_instance";

/// Default websocket message size limit (16 MiB)
pub const DEFAULT_MAX_MSG_SIZE: u64 = 16 * 1024 * 1024;

/// Default port of a remote instance
pub const DEFAULT_PORT: u16 = 8123;

// Connection data keys
pub const CONF_HOST: &str = "host";
pub const CONF_PORT: &str = "port";
pub const CONF_ACCESS_TOKEN: &str = "access_token";
pub const CONF_SECURE: &str = "secure";
pub const CONF_VERIFY_SSL: &str = "verify_ssl";
pub const CONF_MAX_MSG_SIZE: &str = "max_message_size";
pub const CONF_TYPE: &str = "type";

/// Instance type values for [`CONF_TYPE`]
pub const TYPE_REMOTE: &str = "remote";
pub const TYPE_MAIN: &str = "main";

// Option keys
pub const CONF_ENTITY_PREFIX: &str = "entity_prefix";
pub const CONF_ENTITY_FRIENDLY_NAME_PREFIX: &str = "entity_friendly_name_prefix";
pub const CONF_LOAD_COMPONENTS: &str = "load_components";
pub const CONF_SERVICE_PREFIX: &str = "service_prefix";
pub const CONF_SERVICES: &str = "services";
pub const CONF_INCLUDE_DOMAINS: &str = "include_domains";
pub const CONF_INCLUDE_ENTITIES: &str = "include_entities";
pub const CONF_EXCLUDE_DOMAINS: &str = "exclude_domains";
pub const CONF_EXCLUDE_ENTITIES: &str = "exclude_entities";
pub const CONF_FILTER: &str = "filter";
pub const CONF_SUBSCRIBE_EVENTS: &str = "subscribe_events";

/// Key under which YAML-imported options are stashed in entry data until the
/// entry is set up.
pub const CONF_OPTIONS: &str = "options";

// Filter entry fields
pub const CONF_ENTITY_ID: &str = "entity_id";
pub const CONF_UNIT_OF_MEASUREMENT: &str = "unit_of_measurement";
pub const CONF_ABOVE: &str = "above";
pub const CONF_BELOW: &str = "below";

// Free-text field for adding an event subscription
pub const CONF_ADD_NEW_EVENT: &str = "add_new_event";

// Explicit submission intent (replaces inferring intent from field absence)
pub const CONF_ACTION: &str = "action";
pub const ACTION_CONTINUE: &str = "continue";
pub const ACTION_ADD_FILTER: &str = "add_filter";
pub const ACTION_ADD_EVENT: &str = "add_event";

/// Keys that belong in entry options rather than entry data when importing
/// a YAML configuration.
pub const OPTION_KEYS: &[&str] = &[
    CONF_ENTITY_PREFIX,
    CONF_ENTITY_FRIENDLY_NAME_PREFIX,
    CONF_LOAD_COMPONENTS,
    CONF_SERVICE_PREFIX,
    CONF_SERVICES,
    CONF_INCLUDE_DOMAINS,
    CONF_INCLUDE_ENTITIES,
    CONF_EXCLUDE_DOMAINS,
    CONF_EXCLUDE_ENTITIES,
    CONF_FILTER,
    CONF_SUBSCRIBE_EVENTS,
];
