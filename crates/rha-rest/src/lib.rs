//! REST discovery client for remote Home Assistant instances
//!
//! Obtains the identity and metadata of a remote instance before it is
//! registered. A dedicated discovery endpoint is tried first; older remotes
//! that lack it are identified through the generic API endpoints instead,
//! with a digest-derived stand-in identifier.

mod discovery;
mod error;
mod fetch;

pub use discovery::{
    get_discovery_info, pseudo_uuid, DiscoveryInfo, API_PATH, CONFIG_PATH, DISCOVERY_PATH,
};
pub use error::{RestApiError, RestApiResult};
pub use fetch::{JsonFetcher, JsonResponse, ReqwestFetcher, ReqwestSessions, Sessions, TransportError};
