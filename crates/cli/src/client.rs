// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Thin `reqwest` wrapper over `incidentd`'s operator REST surface
//! . Every command module goes through this rather than
//! building requests inline, so the exit-code mapping (upstream
//! unavailable vs. a daemon-reported rejection) lives in one place.

use crate::exit_error::ExitError;
use anyhow::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;

pub struct DaemonClient {
 base_url: String,
 http: reqwest::Client,
}

fn default_base_url() -> String {
 std::env::var("INCIDENTCTL_DAEMON_ADDR").unwrap_or_else(|_| "http://127.0.0.1:8743".to_string())
}

impl DaemonClient {
 pub fn new() -> Self {
 Self { base_url: default_base_url(), http: reqwest::Client::new() }
 }

 fn url(&self, path: &str) -> String {
 format!("{}{}", self.base_url.trim_end_matches('/'), path)
 }

 pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
 let response = self
 .http
 .get(self.url(path))
 .send()
 .await
 .map_err(|err| ExitError::upstream_unavailable(format!("could not reach incidentd: {err}")))?;
 Self::decode(response).await
 }

 pub async fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
 let response = self
 .http
 .post(self.url(path))
 .json(body)
 .send()
 .await
 .map_err(|err| ExitError::upstream_unavailable(format!("could not reach incidentd: {err}")))?;
 Self::decode(response).await
 }

 /// Like `post`, but for endpoints that reply with a bare status code
 /// (`approve`/`cancel`) rather than a JSON body.
 pub async fn post_no_body<B: Serialize>(&self, path: &str, body: &B) -> Result<()> {
 let response = self
 .http
 .post(self.url(path))
 .json(body)
 .send()
 .await
 .map_err(|err| ExitError::upstream_unavailable(format!("could not reach incidentd: {err}")))?;
 Self::check_status(&response)?;
 Ok(())
 }

 fn check_status(response: &reqwest::Response) -> Result<()> {
 let status = response.status();
 if status.is_success() {
 return Ok(());
 }
 if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::NOT_FOUND {
 return Err(ExitError::rejected(format!("daemon rejected the request: {status}")).into());
 }
 Err(ExitError::new(1, format!("daemon returned {status}")).into())
 }

 async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
 Self::check_status(&response)?;
 response.json::<T>().await.map_err(|err| ExitError::new(1, format!("could not parse daemon response: {err}")).into())
 }
}

impl Default for DaemonClient {
 fn default() -> Self {
 Self::new()
 }
}
