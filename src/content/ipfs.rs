// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! IPFS HTTP API client (`/api/v0/add`, `/api/v0/cat`).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;

use super::{ContentError, ContentResult, ContentStore};

#[derive(Debug, Deserialize)]
struct AddResponse {
    #[serde(rename = "Hash")]
    hash: String,
}

#[derive(Debug, Clone)]
pub struct IpfsClient {
    base_url: String,
    http: Client,
}

impl IpfsClient {
    pub fn new(base_url: &str) -> ContentResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ContentError::Request(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    fn add_url(&self, persist: bool) -> String {
        format!(
            "{}/api/v0/add?pin=false&raw-leaves=true&only-hash={}",
            self.base_url, !persist
        )
    }

    fn cat_url(&self, cid: &str) -> String {
        format!("{}/api/v0/cat?arg={cid}", self.base_url)
    }
}

#[async_trait]
impl ContentStore for IpfsClient {
    async fn put(&self, data: Vec<u8>, persist: bool) -> ContentResult<String> {
        let form = Form::new().part("file", Part::bytes(data).file_name("document"));

        let response = self
            .http
            .post(self.add_url(persist))
            .multipart(form)
            .send()
            .await
            .map_err(|e| ContentError::Request(format!("cannot submit document to IPFS: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ContentError::Request(format!(
                "IPFS add returned {status}: {body}"
            )));
        }

        let added: AddResponse = response
            .json()
            .await
            .map_err(|e| ContentError::InvalidResponse(format!("IPFS add invalid JSON: {e}")))?;
        Ok(added.hash)
    }

    async fn get(&self, cid: &str) -> ContentResult<Vec<u8>> {
        let response = self
            .http
            .post(self.cat_url(cid))
            .send()
            .await
            .map_err(|e| ContentError::Request(format!("IPFS cat {cid} failed: {e}")))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ContentError::NotFound(cid.to_string()));
        }
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ContentError::Request(format!(
                "IPFS cat {cid} returned {status}: {body}"
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ContentError::InvalidResponse(format!("IPFS cat {cid}: {e}")))?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_url_toggles_only_hash() {
        let client = IpfsClient::new("http://localhost:5001/").unwrap();
        assert_eq!(
            client.add_url(true),
            "http://localhost:5001/api/v0/add?pin=false&raw-leaves=true&only-hash=false"
        );
        assert!(client.add_url(false).ends_with("only-hash=true"));
    }

    #[test]
    fn cat_url_carries_the_cid() {
        let client = IpfsClient::new("http://ipfs:5001").unwrap();
        assert_eq!(client.cat_url("bafk"), "http://ipfs:5001/api/v0/cat?arg=bafk");
    }
}
