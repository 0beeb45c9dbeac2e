//! HTTP client construction shared by readiness probes and report uploads

use anyhow::{Context, Result};
use reqwest::Client;
use std::time::Duration;

pub(crate) const HTTP_CONNECT_TIMEOUT_SECS: u64 = 10;
pub(crate) const HTTP_REQUEST_TIMEOUT_SECS: u64 = 60;

const USER_AGENT: &str = concat!("stagerun/", env!("CARGO_PKG_VERSION"));

/// Client for readiness probes
///
/// Probes target services on the build host, so proxies are bypassed.
pub(crate) fn create_probe_client() -> Result<Client> {
    Client::builder()
        .connect_timeout(Duration::from_secs(HTTP_CONNECT_TIMEOUT_SECS))
        .user_agent(USER_AGENT)
        .no_proxy()
        .build()
        .context("Failed to create readiness probe HTTP client")
}

/// Client for uploads to external reporting services
pub(crate) fn create_upload_client() -> Result<Client> {
    Client::builder()
        .connect_timeout(Duration::from_secs(HTTP_CONNECT_TIMEOUT_SECS))
        .timeout(Duration::from_secs(HTTP_REQUEST_TIMEOUT_SECS))
        .user_agent(USER_AGENT)
        .build()
        .context("Failed to create upload HTTP client")
}
