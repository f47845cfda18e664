//! Two-tier discovery of a remote instance's identity.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fmt::Write as _;
use tracing::{debug, info, warn};

use crate::error::{RestApiError, RestApiResult};
use crate::fetch::JsonFetcher;

/// Dedicated discovery endpoint served by the remote integration.
pub const DISCOVERY_PATH: &str = "/api/remote_homeassistant/discovery";
/// Generic API root, present on every remote.
pub const API_PATH: &str = "/api/";
/// Generic config endpoint, present on every remote.
pub const CONFIG_PATH: &str = "/api/config";

/// Identity and metadata of a remote instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryInfo {
    /// The remote's native identifier, or a digest-derived stand-in when
    /// discovery had to fall back to the generic endpoints.
    pub uuid: String,
    #[serde(default)]
    pub location_name: String,
    #[serde(default = "unknown")]
    pub ha_version: String,
    #[serde(default = "unknown")]
    pub installation_type: String,
    /// True when the identity was synthesized rather than self-reported.
    #[serde(default)]
    pub fallback_discovery: bool,
}

fn unknown() -> String {
    "unknown".to_owned()
}

/// Derive a stable stand-in identifier for a remote without a native uuid.
///
/// First 32 hex characters of `sha256("{host}:{port}:{location_name}")`.
/// Stable for a fixed triple; renaming the remote changes the identity.
pub fn pseudo_uuid(host: &str, port: u16, location_name: &str) -> String {
    let digest = Sha256::digest(format!("{host}:{port}:{location_name}").as_bytes());
    let mut hex = String::with_capacity(32);
    for byte in digest.iter().take(16) {
        let _ = write!(hex, "{byte:02x}");
    }
    hex
}

/// Get discovery information from a remote instance.
///
/// Tries the dedicated discovery endpoint first; if it is missing or broken
/// (anything but a 401), falls back to the generic `/api/` and `/api/config`
/// endpoints and synthesizes the identifier. A 401 anywhere fails with
/// [`RestApiError::InvalidAuth`] without further calls.
pub async fn get_discovery_info(
    fetcher: &dyn JsonFetcher,
    host: &str,
    port: u16,
    secure: bool,
    access_token: &str,
) -> RestApiResult<DiscoveryInfo> {
    let proto = if secure { "https" } else { "http" };
    let base = format!("{proto}://{host}:{port}");

    match fetcher
        .get_json(&format!("{base}{DISCOVERY_PATH}"), access_token)
        .await
    {
        Ok(resp) if resp.status == 401 => return Err(RestApiError::InvalidAuth),
        Ok(resp) if resp.status == 200 => {
            let has_uuid = resp
                .body
                .get("uuid")
                .and_then(Value::as_str)
                .is_some_and(|uuid| !uuid.is_empty());
            if has_uuid {
                match serde_json::from_value::<DiscoveryInfo>(resp.body) {
                    Ok(inf) => {
                        debug!("got discovery info from dedicated endpoint");
                        return Ok(inf);
                    }
                    Err(err) => debug!(%err, "undecodable discovery payload"),
                }
            } else {
                debug!("discovery payload carries no uuid");
            }
        }
        Ok(resp) if resp.status == 404 => {
            debug!("dedicated discovery endpoint not found, trying fallback")
        }
        Ok(resp) => debug!(status = resp.status, "unexpected discovery endpoint status"),
        Err(err) => debug!(%err, "failed to reach discovery endpoint"),
    }

    info!("using fallback discovery method");

    let api = fetcher
        .get_json(&format!("{base}{API_PATH}"), access_token)
        .await
        .map_err(|err| {
            warn!(%err, "failed to connect to remote API");
            RestApiError::CannotConnect(err.to_string())
        })?;
    match api.status {
        401 => return Err(RestApiError::InvalidAuth),
        200 => {}
        status => return Err(RestApiError::ApiProblem(format!("API returned {status}"))),
    }

    // A broken config endpoint is non-fatal; defaults are substituted.
    let config = match fetcher
        .get_json(&format!("{base}{CONFIG_PATH}"), access_token)
        .await
    {
        Ok(resp) if resp.status == 200 => resp.body,
        Ok(resp) => {
            warn!(status = resp.status, "config API unavailable, using defaults");
            Value::Null
        }
        Err(err) => {
            warn!(%err, "failed to get remote config, using defaults");
            Value::Null
        }
    };

    let location_name = config
        .get("location_name")
        .and_then(Value::as_str)
        .map(str::to_owned)
        .unwrap_or_else(|| format!("Remote HA at {host}"));
    let ha_version = config
        .get("version")
        .and_then(Value::as_str)
        .unwrap_or("unknown")
        .to_owned();

    info!(%location_name, "created fallback discovery info");
    Ok(DiscoveryInfo {
        uuid: pseudo_uuid(host, port, &location_name),
        location_name,
        ha_version,
        installation_type: "unknown".to_owned(),
        fallback_discovery: true,
    })
}
