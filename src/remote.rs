//! # Remote Collaborators
//!
//! Clients for the metadata endpoints (function and struct descriptors per
//! import path) and the program storage endpoint.

use crate::error::{GoBlocksError, Result};
use reqwest::blocking::Client;

/// Source of raw descriptor JSON for an import path
pub trait DescriptorSource {
    fn fetch_functions(&self, import_path: &str) -> Result<String>;
    fn fetch_structs(&self, import_path: &str) -> Result<String>;
}

/// Shared program storage: saving returns a short key, retrieving a key
/// returns the serialized program.
pub trait ProgramStorage {
    fn save(&self, program_json: &str) -> Result<String>;
    fn retrieve(&self, key: &str) -> Result<String>;
}

fn endpoint(base_url: &str, path: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// Send a request and return its body, turning non-200 responses into
/// transport errors.
fn read_body(url: &str, request: reqwest::blocking::RequestBuilder) -> Result<String> {
    let response = request.send()?;
    let status = response.status();
    if status != reqwest::StatusCode::OK {
        tracing::warn!("[GOBLOCKS] {} answered with status {}", url, status);
        return Err(GoBlocksError::Transport {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }
    Ok(response.text()?)
}

/// `GET {base}/map?name=<path>` and `GET {base}/map_struct?name=<path>`
#[derive(Debug, Clone)]
pub struct HttpDescriptorSource {
    client: Client,
    base_url: String,
}

impl HttpDescriptorSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
        }
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn fetch(&self, path: &str, import_path: &str) -> Result<String> {
        let url = endpoint(&self.base_url, path);
        tracing::debug!("[GOBLOCKS] Fetching {}?name={}", url, import_path);
        read_body(&url, self.client.get(&url).query(&[("name", import_path)]))
    }
}

impl DescriptorSource for HttpDescriptorSource {
    fn fetch_functions(&self, import_path: &str) -> Result<String> {
        self.fetch("map", import_path)
    }

    fn fetch_structs(&self, import_path: &str) -> Result<String> {
        self.fetch("map_struct", import_path)
    }
}

/// Form-encoded `POST {base}/storage` with either `xml=<program>` or
/// `key=<key>`
#[derive(Debug, Clone)]
pub struct HttpProgramStorage {
    client: Client,
    url: String,
}

impl HttpProgramStorage {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            url: endpoint(base_url, "storage"),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn post(&self, name: &str, content: &str) -> Result<String> {
        let body = read_body(&self.url, self.client.post(&self.url).form(&[(name, content)]))?;
        Ok(body.trim().to_string())
    }
}

impl ProgramStorage for HttpProgramStorage {
    fn save(&self, program_json: &str) -> Result<String> {
        self.post("xml", program_json)
    }

    fn retrieve(&self, key: &str) -> Result<String> {
        let program = self.post("key", key)?;
        if program.is_empty() {
            return Err(GoBlocksError::UnknownStorageKey(key.to_string()));
        }
        Ok(program)
    }
}
