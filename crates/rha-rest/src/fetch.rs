//! HTTP transport seam for the discovery client.
//!
//! The discovery sequence only needs authenticated JSON GETs, so it runs
//! against the [`JsonFetcher`] trait; production uses [`ReqwestFetcher`] and
//! tests drive the chain with a scripted fake.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

/// A connection-level or decode failure, before any HTTP status was usable.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct TransportError(pub String);

/// An HTTP response reduced to what discovery needs.
///
/// `body` is only parsed for 2xx responses; other statuses carry
/// `Value::Null`.
#[derive(Debug, Clone)]
pub struct JsonResponse {
    pub status: u16,
    pub body: Value,
}

/// Authenticated JSON GET.
#[async_trait]
pub trait JsonFetcher: Send + Sync {
    async fn get_json(&self, url: &str, access_token: &str)
        -> Result<JsonResponse, TransportError>;
}

/// Hands out a client for the requested TLS verification policy, mirroring
/// the host platform's shared-session helper.
pub trait Sessions: Send + Sync {
    fn client(&self, verify_ssl: bool) -> Arc<dyn JsonFetcher>;
}

/// [`JsonFetcher`] backed by a shared [`reqwest::Client`].
pub struct ReqwestFetcher {
    client: reqwest::Client,
}

impl ReqwestFetcher {
    pub fn new(verify_ssl: bool) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(!verify_ssl)
            .build()
            .map_err(|err| TransportError(err.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl JsonFetcher for ReqwestFetcher {
    async fn get_json(
        &self,
        url: &str,
        access_token: &str,
    ) -> Result<JsonResponse, TransportError> {
        let response = self
            .client
            .get(url)
            .bearer_auth(access_token)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .send()
            .await
            .map_err(|err| TransportError(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Ok(JsonResponse {
                status: status.as_u16(),
                body: Value::Null,
            });
        }

        let body = response
            .json()
            .await
            .map_err(|err| TransportError(err.to_string()))?;
        Ok(JsonResponse {
            status: status.as_u16(),
            body,
        })
    }
}

/// [`Sessions`] implementation keeping one client per verification policy.
pub struct ReqwestSessions {
    verified: Arc<ReqwestFetcher>,
    unverified: Arc<ReqwestFetcher>,
}

impl ReqwestSessions {
    pub fn new() -> Result<Self, TransportError> {
        Ok(Self {
            verified: Arc::new(ReqwestFetcher::new(true)?),
            unverified: Arc::new(ReqwestFetcher::new(false)?),
        })
    }
}

impl Sessions for ReqwestSessions {
    fn client(&self, verify_ssl: bool) -> Arc<dyn JsonFetcher> {
        if verify_ssl {
            self.verified.clone()
        } else {
            self.unverified.clone()
        }
    }
}
