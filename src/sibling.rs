//! Delegation of the portable-document render to a separately deployed service.

use log::debug;
use reqwest::blocking::Client as HttpClient;
use serde::Deserialize;
use std::time::Duration;

use crate::error::{ExportError, Result};
use crate::models::ExportRequest;

#[derive(Debug, Deserialize)]
struct RenderResponse {
    path: String,
}

#[derive(Debug, Clone)]
pub struct SiblingRenderer {
    pub endpoint: String,
    http: HttpClient,
}

impl SiblingRenderer {
    pub fn new(endpoint: impl Into<String>) -> Result<Self> {
        let http = HttpClient::builder()
            .timeout(Duration::from_secs(120))
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            endpoint: endpoint.into(),
            http,
        })
    }

    /// POST the request, then GET the URL the service answers with.
    pub fn render(&self, request: &ExportRequest) -> Result<Vec<u8>> {
        let resp = self.http.post(&self.endpoint).json(request).send()?;
        if !resp.status().is_success() {
            return Err(ExportError::RenderService(format!(
                "render service {} returned HTTP {}",
                self.endpoint,
                resp.status()
            )));
        }
        let RenderResponse { path } = resp.json()?;
        debug!("render service produced {path}");
        let file = self.http.get(&path).send()?;
        if !file.status().is_success() {
            return Err(ExportError::RenderService(format!(
                "rendered file {path} returned HTTP {}",
                file.status()
            )));
        }
        Ok(file.bytes()?.to_vec())
    }
}
